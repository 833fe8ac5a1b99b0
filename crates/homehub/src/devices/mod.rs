//! Device state model and registry.
//!
//! A device's legal properties depend on its declared [`DeviceType`]; the
//! rules live in a single table in [`properties`] and every write, typed or
//! generic, is checked against it before anything is stored.

mod error;
mod model;
pub mod properties;
mod registry;
pub mod stats;


pub use error::DeviceError;
pub use model::Device;
pub use model::DevicePatch;
pub use model::DeviceSettingsUpdate;
pub use model::DeviceStats;
pub use model::DeviceType;
pub use model::NewDevice;
pub use model::Properties;
pub use model::ScheduleUpdate;
pub use registry::lock_status;
pub use registry::DeviceRegistry;
pub use stats::RandomSource;
pub use stats::SeededRandom;
pub use stats::ThreadRandom;
