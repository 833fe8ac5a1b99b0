use super::model::DeviceType;
use crate::store::StoreError;

#[derive(Debug, thiserror::Error)]
pub enum DeviceError {
    /// Unknown device, or a device owned by someone else
    #[error("device not found")]
    NotFound,

    #[error("device id '{0}' is already registered")]
    DuplicateId(String),

    #[error("device is a {actual}, not a {expected}")]
    WrongDeviceType {
        expected: DeviceType,
        actual: DeviceType,
    },

    #[error("invalid {property}: {reason}")]
    InvalidValue { property: String, reason: String },

    #[error(transparent)]
    Store(#[from] StoreError),
}
