use std::sync::Arc;

use chrono::Duration;

use crate::auth::{CredentialStore, TokenService};
use crate::config::AuthConfig;
use crate::devices::{DeviceRegistry, RandomSource};
use crate::settings::SettingsStore;
use crate::store::Database;

/// Everything a request handler needs, built once at startup and shared
/// behind an `Arc`
pub struct AppContext {
    pub credentials: CredentialStore,
    pub tokens: TokenService,
    pub devices: DeviceRegistry,
    pub settings: SettingsStore,
    pub version: &'static str,
}

impl AppContext {
    pub fn new(db: Arc<Database>, auth: &AuthConfig, random: Arc<dyn RandomSource>) -> Self {
        Self {
            credentials: CredentialStore::new(db.clone(), auth),
            tokens: TokenService::new(
                auth.secret.as_bytes(),
                Duration::minutes(auth.token_ttl_minutes),
            ),
            devices: DeviceRegistry::new(db.clone(), random),
            settings: SettingsStore::new(db),
            version: env!("CARGO_PKG_VERSION"),
        }
    }
}
