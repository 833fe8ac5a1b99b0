//! Record storage shared by every component.
//!
//! All state lives in [`Table`]s held by one [`Database`]. Writes go through
//! a [`Transaction`]. When a snapshot path is configured the whole database,
//! with the new record applied, is written to a JSON file before the record
//! becomes visible, and read back on startup.

mod table;

pub use table::Table;

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tokio::sync::{Mutex, MutexGuard};
use tracing::{debug, info};

use crate::auth::{User, UserId};
use crate::devices::Device;
use crate::settings::UserSettings;

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("snapshot I/O failed for {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("snapshot encoding failed: {0}")]
    Encoding(#[from] serde_json::Error),
}

/// On-disk layout of a snapshot
#[derive(Debug, Default, Serialize, Deserialize)]
struct Snapshot {
    #[serde(default)]
    users: BTreeMap<UserId, User>,
    #[serde(default)]
    devices: BTreeMap<String, Device>,
    #[serde(default)]
    settings: BTreeMap<UserId, UserSettings>,
}

/// The backing store: users by id, devices by device id, settings by user id
#[derive(Debug, Default)]
pub struct Database {
    pub users: Table<UserId, User>,
    pub devices: Table<String, Device>,
    pub settings: Table<UserId, UserSettings>,

    /// Snapshot file, if persistence is enabled
    snapshot_path: Option<PathBuf>,

    /// Held by the one open [`Transaction`]
    writer: Mutex<()>,
}

/// One record to insert or overwrite
#[derive(Debug, Clone)]
pub enum Record {
    User(User),
    Device(Device),
    Settings(UserId, UserSettings),
}

impl Record {
    fn stage(&self, snapshot: &mut Snapshot) {
        match self {
            Record::User(user) => {
                snapshot.users.insert(user.id, user.clone());
            }
            Record::Device(device) => {
                snapshot
                    .devices
                    .insert(device.device_id.clone(), device.clone());
            }
            Record::Settings(owner, settings) => {
                snapshot.settings.insert(*owner, settings.clone());
            }
        }
    }
}

/// Exclusive write access to the database.
///
/// Everything read through the tables while a transaction is open stays
/// current until it commits or is dropped, since no other writer can run.
/// Dropping it without committing changes nothing.
pub struct Transaction<'a> {
    db: &'a Database,
    _writer: MutexGuard<'a, ()>,
}

impl Transaction<'_> {
    /// Write `record` to the snapshot, then make it visible in memory.
    ///
    /// If the snapshot cannot be written the tables are left untouched.
    pub async fn commit(self, record: Record) -> Result<(), StoreError> {
        if let Some(path) = &self.db.snapshot_path {
            let mut snapshot = self.db.snapshot().await;
            record.stage(&mut snapshot);
            write_snapshot(path, &snapshot).await?;
        }

        match record {
            Record::User(user) => {
                self.db.users.upsert(user.id, user).await;
            }
            Record::Device(device) => {
                self.db.devices.upsert(device.device_id.clone(), device).await;
            }
            Record::Settings(owner, settings) => {
                self.db.settings.upsert(owner, settings).await;
            }
        }
        Ok(())
    }
}

impl Database {
    /// A database that never touches the filesystem
    pub fn in_memory() -> Self {
        Self::default()
    }

    /// Open a database backed by a snapshot file, loading it if it exists
    pub async fn open(path: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let path = path.into();

        let snapshot = match tokio::fs::read(&path).await {
            Ok(bytes) => serde_json::from_slice::<Snapshot>(&bytes)?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                info!("No snapshot at {}, starting empty", path.display());
                Snapshot::default()
            }
            Err(source) => return Err(StoreError::Io { path, source }),
        };

        info!(
            "Loaded snapshot {} ({} users, {} devices)",
            path.display(),
            snapshot.users.len(),
            snapshot.devices.len()
        );

        Ok(Self {
            users: Table::from_rows(snapshot.users),
            devices: Table::from_rows(snapshot.devices),
            settings: Table::from_rows(snapshot.settings),
            snapshot_path: Some(path),
            writer: Mutex::new(()),
        })
    }

    pub fn snapshot_path(&self) -> Option<&Path> {
        self.snapshot_path.as_deref()
    }

    /// Start a write. Waits for any other open transaction to finish.
    pub async fn begin(&self) -> Transaction<'_> {
        Transaction {
            db: self,
            _writer: self.writer.lock().await,
        }
    }

    async fn snapshot(&self) -> Snapshot {
        Snapshot {
            users: self.users.rows().await,
            devices: self.devices.rows().await,
            settings: self.settings.rows().await,
        }
    }
}

/// Write beside the target and rename so readers never see a torn file
async fn write_snapshot(path: &Path, snapshot: &Snapshot) -> Result<(), StoreError> {
    let bytes = serde_json::to_vec_pretty(snapshot)?;

    let tmp = path.with_extension("tmp");
    tokio::fs::write(&tmp, &bytes)
        .await
        .map_err(|source| StoreError::Io {
            path: tmp.clone(),
            source,
        })?;
    tokio::fs::rename(&tmp, path)
        .await
        .map_err(|source| StoreError::Io {
            path: path.to_path_buf(),
            source,
        })?;

    debug!("Wrote snapshot {} ({} bytes)", path.display(), bytes.len());
    Ok(())
}
