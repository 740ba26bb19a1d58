//! Browser history entry model

use serde::{Deserialize, Serialize};

/// A single navigation history entry as reported by a browser.
///
/// Browsers expose one row per URL, so an entry carries the most recent
/// visit time together with the accumulated visit count for that URL.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryEntry {
    /// Page URL
    pub url: String,
    /// Page title, when the browser recorded one
    pub title: Option<String>,
    /// Most recent visit timestamp (Unix ms)
    pub last_visit_time: i64,
    /// Accumulated visit count for this URL
    pub visit_count: Option<i64>,
}

impl HistoryEntry {
    /// Create an entry with just a URL and visit time.
    #[must_use]
    pub fn new(url: impl Into<String>, last_visit_time: i64) -> Self {
        Self {
            url: url.into(),
            title: None,
            last_visit_time,
            visit_count: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn new_entry_has_no_title_or_count() {
        let entry = HistoryEntry::new("https://a.test/page", 1_500);
        assert_eq!(entry.url, "https://a.test/page");
        assert_eq!(entry.last_visit_time, 1_500);
        assert_eq!(entry.title, None);
        assert_eq!(entry.visit_count, None);
    }
}
