//! Data models for Retrace

mod history;
mod record;
mod settings;

pub use history::HistoryEntry;
pub use record::{StoredRecord, SyncRecord, DEFAULT_TITLE};
pub use settings::{SyncSettings, DEFAULT_COLLECTION};
