//! Record transport to the remote store.

mod pocketbase;

pub use pocketbase::{AuthSession, HealthStatus, PocketBaseClient, PocketBaseTransport};

use thiserror::Error;

use crate::models::{SyncRecord, SyncSettings};

/// Errors from a single record transmission.
#[derive(Debug, Error)]
pub enum TransmitError {
    /// Non-2xx response from the record store
    #[error("Record store rejected the write: {message}")]
    Rejected {
        /// HTTP status code of the rejection
        status: u16,
        /// Store-provided error message, status-suffixed
        message: String,
    },

    /// Network-level failure before a response arrived
    #[error("Record store request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// The configured endpoint is unusable
    #[error("Invalid record store endpoint: {0}")]
    InvalidEndpoint(String),
}

/// Result type alias for transmit operations
pub type TransmitResult<T> = std::result::Result<T, TransmitError>;

/// Trait for record transmission (async)
///
/// One network write per record, create semantics: the store always
/// inserts, so transmitting the same logical entry twice stores a
/// duplicate. No retries at this layer.
#[allow(async_fn_in_trait)]
pub trait RecordTransport {
    /// Transmit one record using the endpoint and collection in `settings`.
    async fn send(&self, record: &SyncRecord, settings: &SyncSettings) -> TransmitResult<()>;
}

/// Scriptable transport used by engine and scheduler tests. Clones share
/// state; sends can be failed per URL or delayed to hold a cycle open.
#[cfg(test)]
#[derive(Clone, Default)]
pub(crate) struct MockTransport {
    inner: std::sync::Arc<std::sync::Mutex<MockTransportState>>,
}

#[cfg(test)]
#[derive(Default)]
struct MockTransportState {
    sent: Vec<SyncRecord>,
    fail_urls: std::collections::HashSet<String>,
    delay: Option<std::time::Duration>,
}

#[cfg(test)]
impl MockTransport {
    pub(crate) fn fail_url(&self, url: &str) {
        self.inner.lock().unwrap().fail_urls.insert(url.to_string());
    }

    pub(crate) fn set_delay(&self, delay: std::time::Duration) {
        self.inner.lock().unwrap().delay = Some(delay);
    }

    pub(crate) fn sent(&self) -> Vec<SyncRecord> {
        self.inner.lock().unwrap().sent.clone()
    }

    pub(crate) fn sent_urls(&self) -> Vec<String> {
        self.inner
            .lock()
            .unwrap()
            .sent
            .iter()
            .map(|record| record.url.clone())
            .collect()
    }
}

#[cfg(test)]
impl RecordTransport for MockTransport {
    async fn send(&self, record: &SyncRecord, _settings: &SyncSettings) -> TransmitResult<()> {
        let delay = self.inner.lock().unwrap().delay;
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        let mut state = self.inner.lock().unwrap();
        if state.fail_urls.contains(&record.url) {
            return Err(TransmitError::Rejected {
                status: 500,
                message: "scripted failure (500)".to_string(),
            });
        }
        state.sent.push(record.clone());
        Ok(())
    }
}
