use std::sync::Arc;

use chrono::Utc;
use serde_json::Value;
use tracing::{debug, info};

use super::error::DeviceError;
use super::model::{
    Device, DevicePatch, DeviceSettingsUpdate, DeviceStats, NewDevice, Properties,
    ScheduleUpdate,
};
use super::properties::{
    self, merge_properties, rule_for, validate_properties, validate_schedule,
};
use super::stats::RandomSource;
use crate::auth::UserId;
use crate::store::{Database, Record};

/// Power draw reported for a device that is on, in watts
const POWER_USAGE_RANGE: std::ops::RangeInclusive<u32> = 5..=100;

/// Runtime reported for a device that is on, in hours
const RUNTIME_RANGE: std::ops::RangeInclusive<u32> = 1..=24;

/// Owns every device and enforces the per-type property rules.
///
/// Every mutation runs inside one database write transaction on a copy of
/// the device: (1) resolve the id, (2) check ownership, (3) check the device
/// type, (4) validate the value, (5) commit. A failure in steps 1-4, or a
/// failed snapshot write in step 5, leaves the stored device untouched.
pub struct DeviceRegistry {
    db: Arc<Database>,
    random: Arc<dyn RandomSource>,
}

impl DeviceRegistry {
    pub fn new(db: Arc<Database>, random: Arc<dyn RandomSource>) -> Self {
        Self { db, random }
    }

    /// Devices owned by `owner`, ordered by device id
    pub async fn list(&self, owner: UserId) -> Vec<Device> {
        self.db.devices.scan(|d| d.owner_id == owner).await
    }

    /// A device owned by `owner`. Someone else's device is reported as not found.
    pub async fn get(&self, owner: UserId, device_id: &str) -> Result<Device, DeviceError> {
        self.db
            .devices
            .get(&device_id.to_string())
            .await
            .filter(|d| d.owner_id == owner)
            .ok_or(DeviceError::NotFound)
    }

    /// Register a new device. Device ids are unique across all users.
    pub async fn create(&self, owner: UserId, new: NewDevice) -> Result<Device, DeviceError> {
        let properties = validate_properties(&new.device_type, &new.properties)?;

        let tx = self.db.begin().await;
        if self.db.devices.contains(&new.device_id).await {
            return Err(DeviceError::DuplicateId(new.device_id));
        }

        let device = Device {
            device_id: new.device_id,
            owner_id: owner,
            name: new.name,
            device_type: new.device_type,
            status: new.status,
            properties,
        };
        tx.commit(Record::Device(device.clone())).await?;

        info!(
            "Registered {} device {} for user {}",
            device.device_type, device.device_id, owner
        );
        Ok(device)
    }

    /// Overwrite the status string. No type-specific validation.
    pub async fn replace_status(
        &self,
        owner: UserId,
        device_id: &str,
        status: &str,
    ) -> Result<Device, DeviceError> {
        self.mutate(owner, device_id, |device| {
            device.status = status.to_string();
            Ok(())
        })
        .await
    }

    /// Generic partial update.
    ///
    /// `name`, `type` and `status` overwrite when present. `properties` merges
    /// into the bag after being checked against the device's type (the new
    /// type if this patch changes it). When the type changes, the merged bag
    /// must also be valid for the new type, so typed keys left over from the
    /// old type reject the whole patch.
    pub async fn patch(
        &self,
        owner: UserId,
        device_id: &str,
        patch: DevicePatch,
    ) -> Result<Device, DeviceError> {
        self.mutate(owner, device_id, move |device| {
            let device_type = patch
                .device_type
                .clone()
                .unwrap_or_else(|| device.device_type.clone());

            let properties = patch
                .properties
                .as_ref()
                .map(|incoming| validate_properties(&device_type, incoming))
                .transpose()?;

            if let Some(properties) = properties {
                merge_properties(&mut device.properties, properties);
            }
            if device_type != device.device_type {
                validate_properties(&device_type, &device.properties)?;
                device.device_type = device_type;
            }
            if let Some(name) = patch.name {
                device.name = name;
            }
            if let Some(status) = patch.status {
                device.status = status;
            }
            Ok(())
        })
        .await
    }

    /// Set `properties.brightness` on a light (0-100)
    pub async fn set_brightness(
        &self,
        owner: UserId,
        device_id: &str,
        brightness: i64,
    ) -> Result<Device, DeviceError> {
        self.set_typed(owner, device_id, properties::BRIGHTNESS, Value::from(brightness), |_| {})
            .await
    }

    /// Set `properties.temperature` on a thermostat (10-32)
    pub async fn set_temperature(
        &self,
        owner: UserId,
        device_id: &str,
        temperature: f64,
    ) -> Result<Device, DeviceError> {
        let value = Value::from(temperature);
        self.set_typed(owner, device_id, properties::TEMPERATURE, value, |_| {})
            .await
    }

    /// Set `properties.color` on a light ("#RRGGBB")
    pub async fn set_color(
        &self,
        owner: UserId,
        device_id: &str,
        color: &str,
    ) -> Result<Device, DeviceError> {
        self.set_typed(owner, device_id, properties::COLOR, Value::from(color), |_| {})
            .await
    }

    /// Set `properties.locked` on a lock and derive its status
    pub async fn set_lock(
        &self,
        owner: UserId,
        device_id: &str,
        locked: bool,
    ) -> Result<Device, DeviceError> {
        self.set_typed(owner, device_id, properties::LOCKED, Value::from(locked), |device| {
            device.status = lock_status(locked).to_string();
        })
        .await
    }

    /// Merge the given schedule fields into `properties.schedule`
    pub async fn update_schedule(
        &self,
        owner: UserId,
        device_id: &str,
        schedule: ScheduleUpdate,
    ) -> Result<Device, DeviceError> {
        let fields = match serde_json::to_value(&schedule) {
            Ok(Value::Object(fields)) => fields,
            _ => Properties::new(),
        };

        let device = self
            .mutate(owner, device_id, |device| {
                validate_schedule(&schedule)?;
                let mut incoming = Properties::new();
                incoming.insert(properties::SCHEDULE.to_string(), Value::Object(fields));
                merge_properties(&mut device.properties, incoming);
                Ok(())
            })
            .await?;

        info!("Updated schedule for device {}", device_id);
        Ok(device)
    }

    /// Apply per-device settings: `name` renames the device, the rest merges
    /// into the property bag
    pub async fn update_device_settings(
        &self,
        owner: UserId,
        device_id: &str,
        settings: DeviceSettingsUpdate,
    ) -> Result<Device, DeviceError> {
        let fields = match serde_json::to_value(&settings) {
            Ok(Value::Object(fields)) => fields,
            _ => Properties::new(),
        };

        let device = self
            .mutate(owner, device_id, |device| {
                let fields = validate_properties(&device.device_type, &fields)?;
                if let Some(name) = settings.name {
                    device.name = name;
                }
                merge_properties(&mut device.properties, fields);
                Ok(())
            })
            .await?;

        info!("Updated settings for device {}", device_id);
        Ok(device)
    }

    /// Simulated usage snapshot, cached into `properties.stats`
    pub async fn get_stats(
        &self,
        owner: UserId,
        device_id: &str,
    ) -> Result<DeviceStats, DeviceError> {
        let random = self.random.clone();
        let mut stats = None;

        self.mutate(owner, device_id, |device| {
            let on = device.status == "on";
            let snapshot = DeviceStats {
                power_usage: if on { random.next_in(POWER_USAGE_RANGE) } else { 0 },
                runtime: if on { random.next_in(RUNTIME_RANGE) } else { 0 },
                last_updated: Utc::now(),
            };

            device.properties.insert(
                properties::STATS.to_string(),
                serde_json::to_value(&snapshot).unwrap_or_default(),
            );
            stats = Some(snapshot);
            Ok(())
        })
        .await?;

        stats.ok_or(DeviceError::NotFound)
    }

    /// Write one typed property through its rule, then apply `extra`
    async fn set_typed(
        &self,
        owner: UserId,
        device_id: &str,
        key: &'static str,
        value: Value,
        extra: impl FnOnce(&mut Device),
    ) -> Result<Device, DeviceError> {
        let Some(rule) = rule_for(key) else {
            return Err(DeviceError::InvalidValue {
                property: key.to_string(),
                reason: "not a typed property".to_string(),
            });
        };

        let device = self
            .mutate(owner, device_id, |device| {
                let value = rule.check(&device.device_type, &value)?;
                device.properties.insert(key.to_string(), value);
                extra(device);
                Ok(())
            })
            .await?;

        debug!("Set {} on device {}", key, device_id);
        Ok(device)
    }

    /// Apply `f` to a copy of a device owned by `owner`, then commit the copy.
    ///
    /// Runs inside one write transaction, so concurrent mutations of the same
    /// device see each other's results. Devices owned by other users are
    /// indistinguishable from missing ones.
    async fn mutate(
        &self,
        owner: UserId,
        device_id: &str,
        f: impl FnOnce(&mut Device) -> Result<(), DeviceError>,
    ) -> Result<Device, DeviceError> {
        let tx = self.db.begin().await;
        let mut device = self
            .db
            .devices
            .get(&device_id.to_string())
            .await
            .filter(|d| d.owner_id == owner)
            .ok_or(DeviceError::NotFound)?;

        f(&mut device)?;
        tx.commit(Record::Device(device.clone())).await?;
        Ok(device)
    }
}

/// Status text for a lock state
pub fn lock_status(locked: bool) -> &'static str {
    if locked {
        "locked"
    } else {
        "unlocked"
    }
}
