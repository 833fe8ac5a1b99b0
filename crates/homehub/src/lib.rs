pub mod api;
pub mod auth;
pub mod config;
pub mod context;
pub mod devices;
pub mod settings;
pub mod store;

pub use config::Config;
pub use config::LogLevel;
pub use context::AppContext;
pub use store::Database;
