use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::auth::UserId;

/// A device's open property bag
pub type Properties = Map<String, Value>;

/// Declared kind of a device. Decides which typed properties it accepts.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum DeviceType {
    Light,
    Thermostat,
    Lock,
    /// Any other kind, kept verbatim (e.g. "switch", "camera")
    Other(String),
}

impl DeviceType {
    pub fn as_str(&self) -> &str {
        match self {
            DeviceType::Light => "light",
            DeviceType::Thermostat => "thermostat",
            DeviceType::Lock => "lock",
            DeviceType::Other(name) => name,
        }
    }
}

impl From<String> for DeviceType {
    fn from(name: String) -> Self {
        match name.as_str() {
            "light" => DeviceType::Light,
            "thermostat" => DeviceType::Thermostat,
            "lock" => DeviceType::Lock,
            _ => DeviceType::Other(name),
        }
    }
}

impl From<&str> for DeviceType {
    fn from(name: &str) -> Self {
        DeviceType::from(name.to_string())
    }
}

impl From<DeviceType> for String {
    fn from(device_type: DeviceType) -> Self {
        match device_type {
            DeviceType::Other(name) => name,
            known => known.as_str().to_string(),
        }
    }
}

impl fmt::Display for DeviceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A device owned by one user
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Device {
    pub device_id: String,
    pub owner_id: UserId,
    pub name: String,
    #[serde(rename = "type")]
    pub device_type: DeviceType,
    pub status: String,
    #[serde(default)]
    pub properties: Properties,
}

/// Everything needed to register a device
#[derive(Debug, Clone, Deserialize)]
pub struct NewDevice {
    pub device_id: String,
    pub name: String,
    #[serde(rename = "type")]
    pub device_type: DeviceType,
    pub status: String,
    #[serde(default)]
    pub properties: Properties,
}

/// Generic partial update. Absent fields are left alone; `properties` merges.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct DevicePatch {
    pub name: Option<String>,
    #[serde(rename = "type")]
    pub device_type: Option<DeviceType>,
    pub status: Option<String>,
    pub properties: Option<Properties>,
}

/// Partial schedule. Only the given fields are written to `properties.schedule`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ScheduleUpdate {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub enabled: Option<bool>,

    /// 24h wall clock time, "HH:MM"
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time: Option<String>,

    /// Weekday names, e.g. ["Mon", "Fri"]
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub days: Option<Vec<String>>,

    /// What to do when the schedule fires, e.g. "on"
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub action: Option<String>,
}

/// Partial per-device settings
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeviceSettingsUpdate {
    /// Renames the device itself; never stored in the property bag
    #[serde(default, skip_serializing)]
    pub name: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub auto_off: Option<bool>,

    /// Seconds before an idle device switches itself off
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub auto_off_delay: Option<u64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notifications: Option<bool>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub motion_sensor: Option<bool>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub energy_saving: Option<bool>,
}

/// Simulated usage snapshot. Not real telemetry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeviceStats {
    /// Watts
    pub power_usage: u32,
    /// Hours
    pub runtime: u32,
    pub last_updated: DateTime<Utc>,
}
