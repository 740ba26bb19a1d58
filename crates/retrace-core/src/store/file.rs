//! JSON-file implementation of the state store.

use std::path::{Path, PathBuf};

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use super::{StateStore, StoreResult};
use crate::models::SyncSettings;

/// File-backed state store.
///
/// Settings and watermark live in two separate JSON files so a watermark
/// write after every cycle never touches user configuration. Missing files
/// read back as defaults; parent directories are created on first write.
#[derive(Debug, Clone)]
pub struct JsonStateStore {
    settings_path: PathBuf,
    state_path: PathBuf,
}

/// On-disk shape of the state file. The key matches the extension's
/// storage key for the watermark.
#[derive(Debug, Default, Serialize, Deserialize)]
struct StateFile {
    #[serde(rename = "lastSyncTime", default)]
    last_sync_time: Option<i64>,
}

impl JsonStateStore {
    /// Create a store over the given settings and state file paths.
    #[must_use]
    pub fn new(settings_path: impl Into<PathBuf>, state_path: impl Into<PathBuf>) -> Self {
        Self {
            settings_path: settings_path.into(),
            state_path: state_path.into(),
        }
    }

    /// Path of the settings file.
    #[must_use]
    pub fn settings_path(&self) -> &Path {
        &self.settings_path
    }

    fn read_json<T: Default + DeserializeOwned>(path: &Path) -> StoreResult<T> {
        if !path.exists() {
            return Ok(T::default());
        }
        let raw = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&raw)?)
    }

    fn write_json<T: Serialize>(path: &Path, value: &T) -> StoreResult<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let serialized = serde_json::to_string_pretty(value)?;
        std::fs::write(path, serialized)?;
        Ok(())
    }
}

impl StateStore for JsonStateStore {
    async fn load_settings(&self) -> StoreResult<SyncSettings> {
        let mut settings: SyncSettings = Self::read_json(&self.settings_path)?;
        settings.normalize();
        Ok(settings)
    }

    async fn save_settings(&self, settings: &SyncSettings) -> StoreResult<()> {
        let mut normalized = settings.clone();
        normalized.normalize();
        Self::write_json(&self.settings_path, &normalized)
    }

    async fn load_watermark(&self) -> StoreResult<Option<i64>> {
        let state: StateFile = Self::read_json(&self.state_path)?;
        Ok(state.last_sync_time)
    }

    async fn save_watermark(&self, watermark_ms: i64) -> StoreResult<()> {
        Self::write_json(
            &self.state_path,
            &StateFile {
                last_sync_time: Some(watermark_ms),
            },
        )
    }
}
