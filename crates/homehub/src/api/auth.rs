//! Signup, login and the bearer token extractor.

use std::sync::Arc;

use async_trait::async_trait;
use axum::extract::{FromRequestParts, State};
use axum::http::header::AUTHORIZATION;
use axum::http::request::Parts;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use super::error::{ApiError, ApiJson, INVALID_TOKEN};
use crate::auth::{CredentialError, User, UserId};
use crate::context::AppContext;

/// The authenticated caller, resolved from `Authorization: Bearer <token>`.
/// The scheme name is matched case-insensitively.
#[derive(Debug, Clone)]
pub struct CurrentUser(pub User);

impl CurrentUser {
    pub fn id(&self) -> UserId {
        self.0.id
    }
}

#[async_trait]
impl FromRequestParts<Arc<AppContext>> for CurrentUser {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        ctx: &Arc<AppContext>,
    ) -> Result<Self, Self::Rejection> {
        let token = parts
            .headers
            .get(AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .and_then(|value| value.split_once(' '))
            .filter(|(scheme, _)| scheme.eq_ignore_ascii_case("bearer"))
            .map(|(_, token)| token.trim())
            .filter(|token| !token.is_empty())
            .ok_or_else(|| {
                debug!("Request without a bearer token");
                ApiError::Unauthenticated(INVALID_TOKEN)
            })?;

        let username = ctx.tokens.verify(token).map_err(|e| {
            debug!("Rejected token: {}", e);
            ApiError::from(e)
        })?;

        // A valid token for a user that no longer resolves is still a bad token
        let user = ctx
            .credentials
            .find_by_username(&username)
            .await
            .ok_or_else(|| {
                debug!("Token subject {} has no account", username);
                ApiError::Unauthenticated(INVALID_TOKEN)
            })?;

        Ok(CurrentUser(user))
    }
}

/// Public view of a user. Never carries the password hash.
#[derive(Debug, Serialize)]
pub struct UserView {
    pub id: UserId,
    pub username: String,
    pub email: String,
}

impl From<User> for UserView {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            username: user.username,
            email: user.email,
        }
    }
}

#[derive(Deserialize)]
pub struct SignupRequest {
    username: String,
    email: String,
    password: String,
}

#[derive(Serialize)]
struct SignupResponse {
    user: UserView,
    access_token: String,
    token_type: &'static str,
}

#[derive(Deserialize)]
pub struct LoginRequest {
    #[serde(default)]
    username: Option<String>,
    #[serde(default)]
    password: Option<String>,
}

#[derive(Serialize)]
struct LoginResponse {
    access_token: String,
    token_type: &'static str,
    user: UserView,
}

/// Handler for POST /auth/signup
#[tracing::instrument(skip_all)]
pub async fn signup(
    State(ctx): State<Arc<AppContext>>,
    ApiJson(req): ApiJson<SignupRequest>,
) -> Result<impl IntoResponse, ApiError> {
    info!("Signup attempt for username {}", req.username);

    let user = ctx
        .credentials
        .create(&req.username, &req.email, &req.password)
        .await?;
    let access_token = ctx.tokens.issue(&user.username)?;

    Ok((
        StatusCode::OK,
        Json(SignupResponse {
            user: user.into(),
            access_token,
            token_type: "bearer",
        }),
    ))
}

/// Handler for POST /auth/login
#[tracing::instrument(skip_all)]
pub async fn login(
    State(ctx): State<Arc<AppContext>>,
    ApiJson(req): ApiJson<LoginRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let (Some(username), Some(password)) = (
        req.username.filter(|u| !u.is_empty()),
        req.password.filter(|p| !p.is_empty()),
    ) else {
        warn!("Login request without username or password");
        return Err(ApiError::Validation(
            "Username and password are required".to_string(),
        ));
    };

    let user = match ctx.credentials.authenticate(&username, &password).await {
        Ok(user) => user,
        Err(e @ (CredentialError::NotFound | CredentialError::BadPassword)) => {
            warn!("Failed login for username {}", username);
            return Err(e.into());
        }
        Err(e) => return Err(e.into()),
    };

    let access_token = ctx.tokens.issue(&user.username)?;
    info!("Successful login for {}", user.username);

    Ok(Json(LoginResponse {
        access_token,
        token_type: "bearer",
        user: user.into(),
    }))
}

/// Handler for GET /users/me
#[tracing::instrument(skip_all, fields(user = %user.0.username))]
pub async fn me(user: CurrentUser) -> Json<UserView> {
    Json(user.0.into())
}
