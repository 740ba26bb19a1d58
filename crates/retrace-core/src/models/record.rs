//! Wire-format record models

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};

use super::{HistoryEntry, SyncSettings};

/// Title used when the browser has no title for a page.
pub const DEFAULT_TITLE: &str = "Untitled";

/// The wire representation of one history entry, POSTed to the record
/// store and read back by the stats commands.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncRecord {
    /// Page URL
    pub url: String,
    /// Page title, never empty on the wire
    pub title: String,
    /// RFC 3339 visit timestamp with millisecond precision,
    /// e.g. `2024-01-01T00:00:00.000Z`
    pub visit_time: String,
    /// Visit count, defaulted to 1 when the source had none
    pub visit_count: i64,
    /// Email of the syncing user; empty when none is configured
    pub user_email: String,
    /// Install identifier of the syncing user
    pub user_id: String,
}

impl SyncRecord {
    /// Project a history entry onto the wire format, taking the identity
    /// fields from the given settings.
    #[must_use]
    pub fn from_entry(entry: &HistoryEntry, settings: &SyncSettings) -> Self {
        let title = entry
            .title
            .clone()
            .filter(|title| !title.is_empty())
            .unwrap_or_else(|| DEFAULT_TITLE.to_string());
        Self {
            url: entry.url.clone(),
            title,
            visit_time: format_visit_time(entry.last_visit_time),
            visit_count: entry.visit_count.filter(|&count| count != 0).unwrap_or(1),
            user_email: settings.user_email.clone(),
            user_id: settings.user_id.clone().unwrap_or_default(),
        }
    }
}

/// Render a Unix ms timestamp in the record store's visit time format.
fn format_visit_time(timestamp_ms: i64) -> String {
    chrono::DateTime::from_timestamp_millis(timestamp_ms).map_or_else(
        || timestamp_ms.to_string(),
        |date_time| date_time.to_rfc3339_opts(SecondsFormat::Millis, true),
    )
}

/// A record as returned by the record store's list API.
///
/// Every field except `url` is defaulted so records written by older
/// installs (or by hand) still deserialize.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredRecord {
    /// Store-assigned record id
    #[serde(default)]
    pub id: String,
    /// Page URL
    pub url: String,
    /// Page title
    #[serde(default)]
    pub title: String,
    /// RFC 3339 visit timestamp as written by the sync engine
    #[serde(default)]
    pub visit_time: String,
    /// Visit count as written, absent on malformed records
    #[serde(default)]
    pub visit_count: Option<i64>,
    /// Email of the syncing user
    #[serde(default)]
    pub user_email: String,
    /// Install identifier of the syncing user
    #[serde(default)]
    pub user_id: String,
}

impl StoredRecord {
    /// Visit count with the same defaulting the write side applies.
    #[must_use]
    pub fn effective_visit_count(&self) -> i64 {
        self.visit_count.filter(|&count| count != 0).unwrap_or(1)
    }

    /// Parsed visit timestamp, `None` when the stored value is malformed.
    #[must_use]
    pub fn visit_timestamp(&self) -> Option<DateTime<Utc>> {
        DateTime::parse_from_rfc3339(&self.visit_time)
            .ok()
            .map(|date_time| date_time.with_timezone(&Utc))
    }
}
