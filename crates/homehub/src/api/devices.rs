use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::Json;
use serde::{Deserialize, Serialize};

use super::auth::CurrentUser;
use super::error::{ApiError, ApiJson};
use crate::context::AppContext;
use crate::devices::{
    lock_status, Device, DevicePatch, DeviceSettingsUpdate, DeviceStats, DeviceType, NewDevice,
    Properties, ScheduleUpdate,
};

/// A device as its owner sees it. The owner is implied by the token.
#[derive(Debug, Serialize)]
pub struct DeviceView {
    pub device_id: String,
    pub name: String,
    #[serde(rename = "type")]
    pub device_type: DeviceType,
    pub status: String,
    pub properties: Properties,
}

impl From<Device> for DeviceView {
    fn from(device: Device) -> Self {
        Self {
            device_id: device.device_id,
            name: device.name,
            device_type: device.device_type,
            status: device.status,
            properties: device.properties,
        }
    }
}

/// Acknowledgement for the typed setters
#[derive(Debug, Serialize)]
pub struct Ack {
    message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    status: Option<String>,
}

impl Ack {
    fn updated(what: &str) -> Json<Self> {
        Json(Self {
            message: format!("{} updated successfully", what),
            status: None,
        })
    }
}

#[derive(Debug, Deserialize)]
pub struct StatusQuery {
    status: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct StatusBody {
    status: String,
}

/// Handler for GET /devices
#[tracing::instrument(skip_all, fields(user = user.id()))]
pub async fn list(State(ctx): State<Arc<AppContext>>, user: CurrentUser) -> Json<Vec<DeviceView>> {
    let devices = ctx.devices.list(user.id()).await;
    Json(devices.into_iter().map(DeviceView::from).collect())
}

/// Handler for GET /devices/:device_id
#[tracing::instrument(skip(ctx, user), fields(user = user.id()))]
pub async fn get(
    State(ctx): State<Arc<AppContext>>,
    user: CurrentUser,
    Path(device_id): Path<String>,
) -> Result<Json<DeviceView>, ApiError> {
    Ok(Json(ctx.devices.get(user.id(), &device_id).await?.into()))
}

/// Handler for POST /devices
#[tracing::instrument(skip_all, fields(user = user.id(), device = %new.device_id))]
pub async fn create(
    State(ctx): State<Arc<AppContext>>,
    user: CurrentUser,
    ApiJson(new): ApiJson<NewDevice>,
) -> Result<Json<DeviceView>, ApiError> {
    Ok(Json(ctx.devices.create(user.id(), new).await?.into()))
}

/// Handler for PUT /devices/:device_id/status
///
/// The status comes from `?status=` or, failing that, a `{"status": ...}` body.
#[tracing::instrument(skip(ctx, user, query, body), fields(user = user.id()))]
pub async fn replace_status(
    State(ctx): State<Arc<AppContext>>,
    user: CurrentUser,
    Path(device_id): Path<String>,
    Query(query): Query<StatusQuery>,
    body: Option<ApiJson<StatusBody>>,
) -> Result<Json<DeviceView>, ApiError> {
    let status = query
        .status
        .or(body.map(|ApiJson(body)| body.status))
        .ok_or_else(|| ApiError::Validation("status is required".to_string()))?;

    let device = ctx
        .devices
        .replace_status(user.id(), &device_id, &status)
        .await?;
    Ok(Json(device.into()))
}

/// Handler for PUT /devices/:device_id
#[tracing::instrument(skip(ctx, user, patch), fields(user = user.id()))]
pub async fn patch(
    State(ctx): State<Arc<AppContext>>,
    user: CurrentUser,
    Path(device_id): Path<String>,
    ApiJson(patch): ApiJson<DevicePatch>,
) -> Result<Json<DeviceView>, ApiError> {
    Ok(Json(ctx.devices.patch(user.id(), &device_id, patch).await?.into()))
}

/// Handler for PUT /devices/:device_id/brightness
#[tracing::instrument(skip(ctx, user), fields(user = user.id()))]
pub async fn set_brightness(
    State(ctx): State<Arc<AppContext>>,
    user: CurrentUser,
    Path(device_id): Path<String>,
    ApiJson(brightness): ApiJson<i64>,
) -> Result<Json<Ack>, ApiError> {
    ctx.devices
        .set_brightness(user.id(), &device_id, brightness)
        .await?;
    Ok(Ack::updated("Brightness"))
}

/// Handler for PUT /devices/:device_id/temperature
#[tracing::instrument(skip(ctx, user), fields(user = user.id()))]
pub async fn set_temperature(
    State(ctx): State<Arc<AppContext>>,
    user: CurrentUser,
    Path(device_id): Path<String>,
    ApiJson(temperature): ApiJson<f64>,
) -> Result<Json<Ack>, ApiError> {
    ctx.devices
        .set_temperature(user.id(), &device_id, temperature)
        .await?;
    Ok(Ack::updated("Temperature"))
}

/// Handler for PUT /devices/:device_id/color
#[tracing::instrument(skip(ctx, user), fields(user = user.id()))]
pub async fn set_color(
    State(ctx): State<Arc<AppContext>>,
    user: CurrentUser,
    Path(device_id): Path<String>,
    ApiJson(color): ApiJson<String>,
) -> Result<Json<Ack>, ApiError> {
    ctx.devices.set_color(user.id(), &device_id, &color).await?;
    Ok(Ack::updated("Color"))
}

/// Handler for PUT /devices/:device_id/lock
#[tracing::instrument(skip(ctx, user), fields(user = user.id()))]
pub async fn set_lock(
    State(ctx): State<Arc<AppContext>>,
    user: CurrentUser,
    Path(device_id): Path<String>,
    ApiJson(locked): ApiJson<bool>,
) -> Result<Json<Ack>, ApiError> {
    let device = ctx.devices.set_lock(user.id(), &device_id, locked).await?;
    Ok(Json(Ack {
        message: format!("Lock {} successfully", lock_status(locked)),
        status: Some(device.status),
    }))
}

/// Handler for PUT /devices/:device_id/schedule
#[tracing::instrument(skip(ctx, user), fields(user = user.id()))]
pub async fn update_schedule(
    State(ctx): State<Arc<AppContext>>,
    user: CurrentUser,
    Path(device_id): Path<String>,
    ApiJson(schedule): ApiJson<ScheduleUpdate>,
) -> Result<Json<Ack>, ApiError> {
    ctx.devices
        .update_schedule(user.id(), &device_id, schedule)
        .await?;
    Ok(Ack::updated("Schedule"))
}

/// Handler for PUT /devices/:device_id/settings
#[tracing::instrument(skip(ctx, user), fields(user = user.id()))]
pub async fn update_settings(
    State(ctx): State<Arc<AppContext>>,
    user: CurrentUser,
    Path(device_id): Path<String>,
    ApiJson(settings): ApiJson<DeviceSettingsUpdate>,
) -> Result<Json<Ack>, ApiError> {
    ctx.devices
        .update_device_settings(user.id(), &device_id, settings)
        .await?;
    Ok(Ack::updated("Settings"))
}

/// Handler for GET /devices/:device_id/stats
#[tracing::instrument(skip(ctx, user), fields(user = user.id()))]
pub async fn stats(
    State(ctx): State<Arc<AppContext>>,
    user: CurrentUser,
    Path(device_id): Path<String>,
) -> Result<Json<DeviceStats>, ApiError> {
    Ok(Json(ctx.devices.get_stats(user.id(), &device_id).await?))
}
