//! Per-user preference documents.
//!
//! One [`UserSettings`] document per user, independent of devices. Reading a
//! user's settings for the first time creates the default document; writing
//! replaces the whole document.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};
use tracing::info;

use crate::auth::UserId;
use crate::devices::properties::is_clock_time;
use crate::store::{Database, Record, StoreError};

#[derive(Debug, thiserror::Error)]
pub enum SettingsError {
    #[error("invalid quietHours.{field}: '{value}' is not HH:MM")]
    InvalidQuietHours { field: &'static str, value: String },

    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Unit used when showing temperatures
#[derive(
    Debug, Default, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum TemperatureUnit {
    #[default]
    Celsius,
    Fahrenheit,
}

/// How often energy reports are sent
#[derive(
    Debug, Default, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum ReportCadence {
    Daily,
    #[default]
    Weekly,
    Monthly,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuietHours {
    pub enabled: bool,
    /// "HH:MM"
    pub start: String,
    /// "HH:MM", may be earlier than `start` to span midnight
    pub end: String,
}

impl Default for QuietHours {
    fn default() -> Self {
        Self {
            enabled: false,
            start: "22:00".to_string(),
            end: "07:00".to_string(),
        }
    }
}

/// A user's preference document. Every field is required on write.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserSettings {
    pub notifications: bool,
    pub email_alerts: bool,
    pub dark_mode: bool,
    pub temperature: TemperatureUnit,
    pub auto_lock: bool,
    pub energy_reports: ReportCadence,
    pub quiet_hours: QuietHours,
}

impl Default for UserSettings {
    fn default() -> Self {
        Self {
            notifications: true,
            email_alerts: true,
            dark_mode: false,
            temperature: TemperatureUnit::default(),
            auto_lock: true,
            energy_reports: ReportCadence::default(),
            quiet_hours: QuietHours::default(),
        }
    }
}

impl UserSettings {
    fn validate(&self) -> Result<(), SettingsError> {
        for (field, value) in [
            ("start", &self.quiet_hours.start),
            ("end", &self.quiet_hours.end),
        ] {
            if !is_clock_time(value) {
                return Err(SettingsError::InvalidQuietHours {
                    field,
                    value: value.clone(),
                });
            }
        }
        Ok(())
    }
}

pub struct SettingsStore {
    db: Arc<Database>,
}

impl SettingsStore {
    pub fn new(db: Arc<Database>) -> Self {
        Self { db }
    }

    /// The user's settings, created with defaults on first read
    pub async fn get(&self, owner: UserId) -> Result<UserSettings, SettingsError> {
        if let Some(settings) = self.db.settings.get(&owner).await {
            return Ok(settings);
        }

        let tx = self.db.begin().await;
        if let Some(settings) = self.db.settings.get(&owner).await {
            return Ok(settings);
        }

        let settings = UserSettings::default();
        tx.commit(Record::Settings(owner, settings.clone())).await?;
        info!("Created default settings for user {}", owner);
        Ok(settings)
    }

    /// Replace the user's whole settings document
    pub async fn put(&self, owner: UserId, settings: UserSettings) -> Result<(), SettingsError> {
        settings.validate()?;
        self.db
            .begin()
            .await
            .commit(Record::Settings(owner, settings))
            .await?;
        info!("Replaced settings for user {}", owner);
        Ok(())
    }
}
