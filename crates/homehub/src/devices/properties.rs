//! Type-conditioned property rules and the property bag merge.
//!
//! Each row of [`PROPERTY_RULES`] ties one property key to the single device
//! type that may carry it and to the validator for its values. Keys without a
//! row are open: any device may store them. Supporting a new typed property
//! means adding a row here, not new control flow in the registry.

use chrono::{NaiveTime, Weekday};
use serde_json::Value;

use super::error::DeviceError;
use super::model::{DeviceType, Properties, ScheduleUpdate};

pub const BRIGHTNESS: &str = "brightness";
pub const COLOR: &str = "color";
pub const TEMPERATURE: &str = "temperature";
pub const LOCKED: &str = "locked";
pub const SCHEDULE: &str = "schedule";
pub const STATS: &str = "stats";

pub const BRIGHTNESS_RANGE: std::ops::RangeInclusive<i64> = 0..=100;
pub const TEMPERATURE_RANGE: std::ops::RangeInclusive<f64> = 10.0..=32.0;

/// One typed property: which device type owns it and what values are legal
pub struct PropertyRule {
    pub key: &'static str,
    pub device_type: DeviceType,
    /// Returns the normalized value, or a human readable reason
    pub validate: fn(&Value) -> Result<Value, String>,
}

pub static PROPERTY_RULES: &[PropertyRule] = &[
    PropertyRule {
        key: BRIGHTNESS,
        device_type: DeviceType::Light,
        validate: validate_brightness,
    },
    PropertyRule {
        key: COLOR,
        device_type: DeviceType::Light,
        validate: validate_color,
    },
    PropertyRule {
        key: TEMPERATURE,
        device_type: DeviceType::Thermostat,
        validate: validate_temperature,
    },
    PropertyRule {
        key: LOCKED,
        device_type: DeviceType::Lock,
        validate: validate_locked,
    },
];

/// The rule for a typed property, or `None` for an open key
pub fn rule_for(key: &str) -> Option<&'static PropertyRule> {
    PROPERTY_RULES.iter().find(|rule| rule.key == key)
}

impl PropertyRule {
    /// Check a write of `value` to a device of `device_type`.
    ///
    /// The type check comes first, so a value for the wrong kind of device is
    /// reported as a type mismatch whether or not it is in range.
    pub fn check(&self, device_type: &DeviceType, value: &Value) -> Result<Value, DeviceError> {
        self.check_type(device_type)?;
        self.check_value(value)
    }

    pub fn check_type(&self, device_type: &DeviceType) -> Result<(), DeviceError> {
        if *device_type != self.device_type {
            return Err(DeviceError::WrongDeviceType {
                expected: self.device_type.clone(),
                actual: device_type.clone(),
            });
        }
        Ok(())
    }

    pub fn check_value(&self, value: &Value) -> Result<Value, DeviceError> {
        (self.validate)(value).map_err(|reason| DeviceError::InvalidValue {
            property: self.key.to_string(),
            reason,
        })
    }
}

/// Validate every typed key in `incoming` for a device of `device_type`.
///
/// Every key is type-checked before any value is, so a bag holding both a
/// foreign key and a bad value is a type mismatch regardless of key order.
/// Returns the bag with normalized values. Open keys pass through untouched.
pub fn validate_properties(
    device_type: &DeviceType,
    incoming: &Properties,
) -> Result<Properties, DeviceError> {
    for key in incoming.keys() {
        if let Some(rule) = rule_for(key) {
            rule.check_type(device_type)?;
        }
    }

    incoming
        .iter()
        .map(|(key, value)| {
            let value = match rule_for(key) {
                Some(rule) => rule.check_value(value)?,
                None => value.clone(),
            };
            Ok((key.clone(), value))
        })
        .collect()
}

/// Merge `incoming` into `bag`.
///
/// Top-level keys overwrite. When both the stored and the incoming value are
/// objects (e.g. `schedule`), the incoming fields are merged into the stored
/// object one level deep so sibling fields survive.
pub fn merge_properties(bag: &mut Properties, incoming: Properties) {
    for (key, value) in incoming {
        match value {
            Value::Object(fields) if bag.get(&key).is_some_and(Value::is_object) => {
                if let Some(Value::Object(existing)) = bag.get_mut(&key) {
                    existing.extend(fields);
                }
            }
            value => {
                bag.insert(key, value);
            }
        }
    }
}

fn validate_brightness(value: &Value) -> Result<Value, String> {
    let level = value
        .as_i64()
        .ok_or_else(|| "brightness must be an integer".to_string())?;
    if !BRIGHTNESS_RANGE.contains(&level) {
        return Err(format!(
            "brightness must be between {} and {}",
            BRIGHTNESS_RANGE.start(),
            BRIGHTNESS_RANGE.end()
        ));
    }
    Ok(Value::from(level))
}

fn validate_temperature(value: &Value) -> Result<Value, String> {
    let degrees = value
        .as_f64()
        .ok_or_else(|| "temperature must be a number".to_string())?;
    if !TEMPERATURE_RANGE.contains(&degrees) {
        return Err(format!(
            "temperature must be between {} and {}",
            TEMPERATURE_RANGE.start(),
            TEMPERATURE_RANGE.end()
        ));
    }
    Ok(Value::from(degrees))
}

fn validate_color(value: &Value) -> Result<Value, String> {
    match value.as_str() {
        Some(color) if is_hex_color(color) => Ok(Value::from(color)),
        _ => Err("color must be a hex color like #ff8800".to_string()),
    }
}

fn validate_locked(value: &Value) -> Result<Value, String> {
    value
        .as_bool()
        .map(Value::from)
        .ok_or_else(|| "locked must be a boolean".to_string())
}

/// `#` followed by exactly six hex digits
pub fn is_hex_color(s: &str) -> bool {
    s.strip_prefix('#')
        .is_some_and(|hex| hex.len() == 6 && hex.chars().all(|c| c.is_ascii_hexdigit()))
}

/// 24h "HH:MM" wall clock time, two digits each side
pub fn is_clock_time(s: &str) -> bool {
    let bytes = s.as_bytes();
    bytes.len() == 5
        && bytes[2] == b':'
        && [0, 1, 3, 4].iter().all(|&i| bytes[i].is_ascii_digit())
        && NaiveTime::parse_from_str(s, "%H:%M").is_ok()
}

/// Check a partial schedule before it is merged
pub fn validate_schedule(schedule: &ScheduleUpdate) -> Result<(), DeviceError> {
    let invalid = |reason: String| DeviceError::InvalidValue {
        property: SCHEDULE.to_string(),
        reason,
    };

    if let Some(time) = &schedule.time {
        if !is_clock_time(time) {
            return Err(invalid(format!("time '{}' is not HH:MM", time)));
        }
    }

    if let Some(days) = &schedule.days {
        if let Some(bad) = days.iter().find(|day| day.parse::<Weekday>().is_err()) {
            return Err(invalid(format!("'{}' is not a day of the week", bad)));
        }
    }

    if let Some(action) = &schedule.action {
        if action.trim().is_empty() {
            return Err(invalid("action must not be empty".to_string()));
        }
    }

    Ok(())
}
