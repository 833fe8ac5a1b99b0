use axum::extract::rejection::JsonRejection;
use axum::extract::FromRequest;
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;

use crate::auth::{CredentialError, TokenError};
use crate::devices::DeviceError;
use crate::settings::SettingsError;
use crate::store::StoreError;

/// Returned for every token failure, whatever the cause
pub const INVALID_TOKEN: &str = "Could not validate credentials";

/// Returned for every failed login, whatever the cause
pub const INVALID_LOGIN: &str = "Incorrect username or password";

/// Body of every error response
#[derive(Serialize)]
struct ErrorBody {
    detail: String,
}

/// Errors as seen by HTTP clients.
///
/// Every domain error is translated here and nowhere else.
#[derive(Debug)]
pub enum ApiError {
    /// Malformed or out-of-range input, 400
    Validation(String),
    /// Missing or bad credentials, 401
    Unauthenticated(&'static str),
    /// Unknown id, or an id owned by someone else, 404
    NotFound(&'static str),
    /// Duplicate key, 409
    Conflict(String),
    /// Anything else, 500. The message is logged, never sent.
    Internal(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, detail) = match self {
            ApiError::Validation(msg) => (StatusCode::BAD_REQUEST, msg),
            ApiError::Unauthenticated(msg) => {
                let body = Json(ErrorBody {
                    detail: msg.to_string(),
                });
                return (
                    StatusCode::UNAUTHORIZED,
                    [(header::WWW_AUTHENTICATE, "Bearer")],
                    body,
                )
                    .into_response();
            }
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, msg.to_string()),
            ApiError::Conflict(msg) => (StatusCode::CONFLICT, msg),
            ApiError::Internal(msg) => {
                tracing::error!("Internal error: {}", msg);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "An unexpected error occurred".to_string(),
                )
            }
        };

        (status, Json(ErrorBody { detail })).into_response()
    }
}

impl From<CredentialError> for ApiError {
    fn from(e: CredentialError) -> Self {
        match e {
            CredentialError::InvalidUsername(_)
            | CredentialError::InvalidEmail
            | CredentialError::WeakPassword(_)
            | CredentialError::UsernameTaken
            | CredentialError::EmailTaken => ApiError::Validation(e.to_string()),
            CredentialError::NotFound | CredentialError::BadPassword => {
                ApiError::Unauthenticated(INVALID_LOGIN)
            }
            CredentialError::Hash(_) | CredentialError::Store(_) => {
                ApiError::Internal(e.to_string())
            }
        }
    }
}

impl From<TokenError> for ApiError {
    fn from(e: TokenError) -> Self {
        match e {
            TokenError::Signing(_) => ApiError::Internal(e.to_string()),
            TokenError::Expired | TokenError::Malformed | TokenError::BadSignature => {
                ApiError::Unauthenticated(INVALID_TOKEN)
            }
        }
    }
}

impl From<DeviceError> for ApiError {
    fn from(e: DeviceError) -> Self {
        match e {
            DeviceError::NotFound => ApiError::NotFound("Device not found"),
            DeviceError::DuplicateId(_) => ApiError::Conflict(e.to_string()),
            DeviceError::WrongDeviceType { .. } | DeviceError::InvalidValue { .. } => {
                ApiError::Validation(e.to_string())
            }
            DeviceError::Store(_) => ApiError::Internal(e.to_string()),
        }
    }
}

impl From<SettingsError> for ApiError {
    fn from(e: SettingsError) -> Self {
        match e {
            SettingsError::InvalidQuietHours { .. } => ApiError::Validation(e.to_string()),
            SettingsError::Store(_) => ApiError::Internal(e.to_string()),
        }
    }
}

impl From<StoreError> for ApiError {
    fn from(e: StoreError) -> Self {
        ApiError::Internal(e.to_string())
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::Validation(rejection.body_text())
    }
}

/// `axum::Json` with rejections reported as [`ApiError::Validation`]
#[derive(FromRequest)]
#[from_request(via(axum::Json), rejection(ApiError))]
pub struct ApiJson<T>(pub T);
