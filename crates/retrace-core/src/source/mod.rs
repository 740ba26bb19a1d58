//! Browser history sources.

mod sqlite;

pub use sqlite::{ChromeHistorySource, FirefoxHistorySource};

use thiserror::Error;

use crate::models::HistoryEntry;

/// Errors raised while reading browser history.
#[derive(Debug, Error)]
pub enum SourceError {
    /// SQLite error
    #[error("History database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// History database missing
    #[error("History database not found at {0}")]
    NotFound(String),
}

/// Result type alias for source operations
pub type SourceResult<T> = std::result::Result<T, SourceError>;

/// Trait for queryable navigation history (async)
#[allow(async_fn_in_trait)]
pub trait HistorySource {
    /// Entries with a visit time at or after `start_time_ms` (Unix ms),
    /// capped at `max_results`, most recent first.
    async fn search(
        &self,
        start_time_ms: i64,
        max_results: usize,
    ) -> SourceResult<Vec<HistoryEntry>>;
}

/// In-memory source used by engine and scheduler tests. Clones share the
/// entry list; search calls are counted.
#[cfg(test)]
#[derive(Debug, Clone, Default)]
pub(crate) struct MemoryHistorySource {
    inner: std::sync::Arc<std::sync::Mutex<MemorySourceState>>,
}

#[cfg(test)]
#[derive(Debug, Default)]
struct MemorySourceState {
    entries: Vec<HistoryEntry>,
    search_calls: usize,
    fail_searches: bool,
}

#[cfg(test)]
impl MemoryHistorySource {
    pub(crate) fn with_entries(entries: Vec<HistoryEntry>) -> Self {
        let source = Self::default();
        source.inner.lock().unwrap().entries = entries;
        source
    }

    pub(crate) fn push_entry(&self, entry: HistoryEntry) {
        self.inner.lock().unwrap().entries.push(entry);
    }

    pub(crate) fn set_fail_searches(&self, fail: bool) {
        self.inner.lock().unwrap().fail_searches = fail;
    }

    pub(crate) fn search_calls(&self) -> usize {
        self.inner.lock().unwrap().search_calls
    }
}

#[cfg(test)]
impl HistorySource for MemoryHistorySource {
    async fn search(
        &self,
        start_time_ms: i64,
        max_results: usize,
    ) -> SourceResult<Vec<HistoryEntry>> {
        let mut state = self.inner.lock().unwrap();
        state.search_calls += 1;
        if state.fail_searches {
            return Err(SourceError::NotFound("scripted".to_string()));
        }
        let mut matches: Vec<HistoryEntry> = state
            .entries
            .iter()
            .filter(|entry| entry.last_visit_time >= start_time_ms)
            .cloned()
            .collect();
        matches.sort_by(|a, b| b.last_visit_time.cmp(&a.last_visit_time));
        matches.truncate(max_results);
        Ok(matches)
    }
}
