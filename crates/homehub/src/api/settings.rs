use std::sync::Arc;

use axum::extract::State;
use axum::Json;
use serde_json::{json, Value};

use super::auth::CurrentUser;
use super::error::{ApiError, ApiJson};
use crate::context::AppContext;
use crate::settings::UserSettings;

/// Handler for GET /settings
#[tracing::instrument(skip_all, fields(user = user.id()))]
pub async fn get(
    State(ctx): State<Arc<AppContext>>,
    user: CurrentUser,
) -> Result<Json<UserSettings>, ApiError> {
    Ok(Json(ctx.settings.get(user.id()).await?))
}

/// Handler for PUT /settings
#[tracing::instrument(skip_all, fields(user = user.id()))]
pub async fn put(
    State(ctx): State<Arc<AppContext>>,
    user: CurrentUser,
    ApiJson(settings): ApiJson<UserSettings>,
) -> Result<Json<Value>, ApiError> {
    ctx.settings.put(user.id(), settings).await?;
    Ok(Json(json!({ "message": "Settings updated successfully" })))
}
