//! Durable persistence for sync settings and the watermark.

mod file;

pub use file::JsonStateStore;

use thiserror::Error;

use crate::models::SyncSettings;

/// Errors raised by state persistence.
#[derive(Debug, Error)]
pub enum StoreError {
    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Result type alias for store operations
pub type StoreResult<T> = std::result::Result<T, StoreError>;

/// Trait for settings and watermark persistence (async)
///
/// Settings and the watermark are logically independent values; a
/// watermark write must never rewrite user configuration.
#[allow(async_fn_in_trait)]
pub trait StateStore {
    /// Load persisted settings, or defaults when none were saved yet
    async fn load_settings(&self) -> StoreResult<SyncSettings>;

    /// Persist settings
    async fn save_settings(&self, settings: &SyncSettings) -> StoreResult<()>;

    /// Completion timestamp (Unix ms) of the last successful sync cycle,
    /// `None` until a cycle has completed or the watermark was pinned
    async fn load_watermark(&self) -> StoreResult<Option<i64>>;

    /// Persist the watermark
    async fn save_watermark(&self, watermark_ms: i64) -> StoreResult<()>;
}

/// In-memory store used by engine and scheduler tests. Clones share state.
#[cfg(test)]
#[derive(Debug, Clone, Default)]
pub(crate) struct MemoryStateStore {
    inner: std::sync::Arc<std::sync::Mutex<MemoryState>>,
}

#[cfg(test)]
#[derive(Debug, Default)]
struct MemoryState {
    settings: SyncSettings,
    watermark: Option<i64>,
}

#[cfg(test)]
impl MemoryStateStore {
    pub(crate) fn with_settings(settings: SyncSettings) -> Self {
        let store = Self::default();
        store.inner.lock().unwrap().settings = settings;
        store
    }

    pub(crate) fn set_watermark(&self, watermark_ms: i64) {
        self.inner.lock().unwrap().watermark = Some(watermark_ms);
    }

    pub(crate) fn watermark(&self) -> Option<i64> {
        self.inner.lock().unwrap().watermark
    }
}

#[cfg(test)]
impl StateStore for MemoryStateStore {
    async fn load_settings(&self) -> StoreResult<SyncSettings> {
        Ok(self.inner.lock().unwrap().settings.clone())
    }

    async fn save_settings(&self, settings: &SyncSettings) -> StoreResult<()> {
        self.inner.lock().unwrap().settings = settings.clone();
        Ok(())
    }

    async fn load_watermark(&self) -> StoreResult<Option<i64>> {
        Ok(self.inner.lock().unwrap().watermark)
    }

    async fn save_watermark(&self, watermark_ms: i64) -> StoreResult<()> {
        self.inner.lock().unwrap().watermark = Some(watermark_ms);
        Ok(())
    }
}
