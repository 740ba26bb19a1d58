//! retrace-core - Core library for Retrace
//!
//! This crate contains the shared models, persisted sync state, browser
//! history sources, record transport, and the sync engine used by all
//! Retrace interfaces (daemon and one-shot CLI commands).

pub mod analytics;
pub mod engine;
pub mod error;
pub mod identity;
pub mod models;
pub mod scheduler;
pub mod source;
pub mod store;
pub mod transport;
pub mod util;

pub use engine::{CycleOutcome, SyncEngine};
pub use error::{Error, Result};
pub use models::{HistoryEntry, StoredRecord, SyncRecord, SyncSettings};
