//! SQLite readers for Chrome and Firefox history databases.
//!
//! Browsers keep their history databases locked while running, so every
//! search copies the database to a private temp file and queries the copy
//! read-only. The copy may trail uncheckpointed WAL writes.

use std::path::{Path, PathBuf};

use rusqlite::{params, Connection, OpenFlags};

use super::{HistorySource, SourceError, SourceResult};
use crate::models::HistoryEntry;

/// Microseconds between the WebKit epoch (1601-01-01) and the Unix epoch.
/// Chrome stores visit times as microseconds since 1601.
const WEBKIT_EPOCH_OFFSET_US: i64 = 11_644_473_600_000_000;

const CHROME_QUERY: &str = "SELECT url, title, last_visit_time, visit_count
     FROM urls
     WHERE last_visit_time >= ?1
     ORDER BY last_visit_time DESC
     LIMIT ?2";

const FIREFOX_QUERY: &str = "SELECT url, title, last_visit_date, visit_count
     FROM moz_places
     WHERE last_visit_date IS NOT NULL AND last_visit_date >= ?1
     ORDER BY last_visit_date DESC
     LIMIT ?2";

/// History reader for Chrome and Chromium-derived browsers (`History` file,
/// `urls` table, WebKit microsecond timestamps).
#[derive(Debug, Clone)]
pub struct ChromeHistorySource {
    db_path: PathBuf,
}

impl ChromeHistorySource {
    #[must_use]
    pub fn new(db_path: impl Into<PathBuf>) -> Self {
        Self {
            db_path: db_path.into(),
        }
    }
}

impl HistorySource for ChromeHistorySource {
    async fn search(
        &self,
        start_time_ms: i64,
        max_results: usize,
    ) -> SourceResult<Vec<HistoryEntry>> {
        let snapshot = HistorySnapshot::capture(&self.db_path)?;
        let conn = snapshot.open()?;
        collect_entries(
            &conn,
            CHROME_QUERY,
            unix_ms_to_webkit_us(start_time_ms),
            clamp_limit(max_results),
            webkit_us_to_unix_ms,
        )
    }
}

/// History reader for Firefox (`places.sqlite`, `moz_places` table, Unix
/// microsecond timestamps). Rows that were never visited carry a NULL
/// `last_visit_date` and are skipped.
#[derive(Debug, Clone)]
pub struct FirefoxHistorySource {
    db_path: PathBuf,
}

impl FirefoxHistorySource {
    #[must_use]
    pub fn new(db_path: impl Into<PathBuf>) -> Self {
        Self {
            db_path: db_path.into(),
        }
    }
}

impl HistorySource for FirefoxHistorySource {
    async fn search(
        &self,
        start_time_ms: i64,
        max_results: usize,
    ) -> SourceResult<Vec<HistoryEntry>> {
        let snapshot = HistorySnapshot::capture(&self.db_path)?;
        let conn = snapshot.open()?;
        collect_entries(
            &conn,
            FIREFOX_QUERY,
            start_time_ms.saturating_mul(1_000),
            clamp_limit(max_results),
            unix_us_to_unix_ms,
        )
    }
}

/// A private temp copy of a history database, removed on drop.
struct HistorySnapshot {
    path: PathBuf,
}

impl HistorySnapshot {
    fn capture(source: &Path) -> SourceResult<Self> {
        if !source.exists() {
            return Err(SourceError::NotFound(source.display().to_string()));
        }
        let path = snapshot_path();
        std::fs::copy(source, &path)?;
        Ok(Self { path })
    }

    fn open(&self) -> SourceResult<Connection> {
        Ok(Connection::open_with_flags(
            &self.path,
            OpenFlags::SQLITE_OPEN_READ_ONLY,
        )?)
    }
}

impl Drop for HistorySnapshot {
    fn drop(&mut self) {
        let _ = std::fs::remove_file(&self.path);
    }
}

fn snapshot_path() -> PathBuf {
    let nanos = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map_or(0, |elapsed| elapsed.as_nanos());
    std::env::temp_dir().join(format!(
        "retrace-history-{}-{nanos}.sqlite",
        std::process::id()
    ))
}

fn collect_entries(
    conn: &Connection,
    sql: &str,
    threshold: i64,
    limit: i64,
    to_unix_ms: fn(i64) -> i64,
) -> SourceResult<Vec<HistoryEntry>> {
    let mut statement = conn.prepare(sql)?;
    let rows = statement.query_map(params![threshold, limit], |row| {
        Ok(HistoryEntry {
            url: row.get(0)?,
            title: row
                .get::<_, Option<String>>(1)?
                .filter(|title| !title.is_empty()),
            last_visit_time: to_unix_ms(row.get(2)?),
            visit_count: row.get(3)?,
        })
    })?;

    let mut entries = Vec::new();
    for row in rows {
        entries.push(row?);
    }
    Ok(entries)
}

fn clamp_limit(max_results: usize) -> i64 {
    i64::try_from(max_results).unwrap_or(i64::MAX)
}

const fn webkit_us_to_unix_ms(webkit_us: i64) -> i64 {
    (webkit_us - WEBKIT_EPOCH_OFFSET_US) / 1_000
}

const fn unix_ms_to_webkit_us(unix_ms: i64) -> i64 {
    unix_ms.saturating_mul(1_000).saturating_add(WEBKIT_EPOCH_OFFSET_US)
}

const fn unix_us_to_unix_ms(unix_us: i64) -> i64 {
    unix_us / 1_000
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use tempfile::tempdir;

    use super::*;

    fn create_chrome_db(path: &Path, rows: &[(&str, Option<&str>, i64, i64)]) {
        let conn = Connection::open(path).unwrap();
        conn.execute_batch(
            "CREATE TABLE urls (
                id INTEGER PRIMARY KEY,
                url LONGVARCHAR,
                title LONGVARCHAR,
                visit_count INTEGER DEFAULT 0 NOT NULL,
                last_visit_time INTEGER NOT NULL
            )",
        )
        .unwrap();
        for (url, title, unix_ms, visits) in rows {
            conn.execute(
                "INSERT INTO urls (url, title, visit_count, last_visit_time)
                 VALUES (?1, ?2, ?3, ?4)",
                params![url, title, visits, unix_ms_to_webkit_us(*unix_ms)],
            )
            .unwrap();
        }
    }

    fn create_firefox_db(path: &Path, rows: &[(&str, Option<&str>, Option<i64>, i64)]) {
        let conn = Connection::open(path).unwrap();
        conn.execute_batch(
            "CREATE TABLE moz_places (
                id INTEGER PRIMARY KEY,
                url LONGVARCHAR,
                title LONGVARCHAR,
                visit_count INTEGER DEFAULT 0,
                last_visit_date INTEGER
            )",
        )
        .unwrap();
        for (url, title, unix_ms, visits) in rows {
            conn.execute(
                "INSERT INTO moz_places (url, title, visit_count, last_visit_date)
                 VALUES (?1, ?2, ?3, ?4)",
                params![url, title, visits, unix_ms.map(|ms| ms * 1_000)],
            )
            .unwrap();
        }
    }

    #[test]
    fn epoch_conversions_line_up() {
        assert_eq!(webkit_us_to_unix_ms(WEBKIT_EPOCH_OFFSET_US), 0);
        assert_eq!(unix_ms_to_webkit_us(0), WEBKIT_EPOCH_OFFSET_US);
        assert_eq!(
            webkit_us_to_unix_ms(13_348_540_800_000_000),
            1_704_067_200_000
        );
        assert_eq!(
            webkit_us_to_unix_ms(unix_ms_to_webkit_us(1_704_067_200_123)),
            1_704_067_200_123
        );
        assert_eq!(unix_us_to_unix_ms(1_704_067_200_000_000), 1_704_067_200_000);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn chrome_search_filters_and_sorts_descending() {
        let dir = tempdir().unwrap();
        let db = dir.path().join("History");
        create_chrome_db(
            &db,
            &[
                ("https://old.test/", Some("Old"), 1_000, 5),
                ("https://mid.test/", Some("Mid"), 2_000, 2),
                ("https://new.test/", Some("New"), 3_000, 1),
            ],
        );

        let source = ChromeHistorySource::new(&db);
        let entries = source.search(2_000, 10).await.unwrap();

        let urls: Vec<&str> = entries.iter().map(|entry| entry.url.as_str()).collect();
        assert_eq!(urls, vec!["https://new.test/", "https://mid.test/"]);
        assert_eq!(entries[0].last_visit_time, 3_000);
        assert_eq!(entries[1].last_visit_time, 2_000);
        assert_eq!(entries[1].visit_count, Some(2));
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn chrome_search_caps_results() {
        let dir = tempdir().unwrap();
        let db = dir.path().join("History");
        create_chrome_db(
            &db,
            &[
                ("https://a.test/", None, 1_000, 1),
                ("https://b.test/", None, 2_000, 1),
                ("https://c.test/", None, 3_000, 1),
            ],
        );

        let source = ChromeHistorySource::new(&db);
        let entries = source.search(0, 2).await.unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].url, "https://c.test/");
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn chrome_search_normalizes_empty_titles() {
        let dir = tempdir().unwrap();
        let db = dir.path().join("History");
        create_chrome_db(
            &db,
            &[
                ("https://a.test/", None, 1_000, 1),
                ("https://b.test/", Some(""), 2_000, 1),
            ],
        );

        let source = ChromeHistorySource::new(&db);
        let entries = source.search(0, 10).await.unwrap();
        assert!(entries.iter().all(|entry| entry.title.is_none()));
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn missing_database_is_reported() {
        let dir = tempdir().unwrap();
        let source = ChromeHistorySource::new(dir.path().join("nope"));
        let error = source.search(0, 10).await.unwrap_err();
        assert!(matches!(error, SourceError::NotFound(_)));
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn firefox_search_skips_never_visited_rows() {
        let dir = tempdir().unwrap();
        let db = dir.path().join("places.sqlite");
        create_firefox_db(
            &db,
            &[
                ("https://a.test/", Some("A"), Some(1_500), 2),
                ("https://bookmark.test/", Some("Saved"), None, 0),
                ("https://b.test/", Some("B"), Some(2_500), 1),
            ],
        );

        let source = FirefoxHistorySource::new(&db);
        let entries = source.search(1_000, 10).await.unwrap();

        let urls: Vec<&str> = entries.iter().map(|entry| entry.url.as_str()).collect();
        assert_eq!(urls, vec!["https://b.test/", "https://a.test/"]);
        assert_eq!(entries[1].last_visit_time, 1_500);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn firefox_threshold_is_inclusive() {
        let dir = tempdir().unwrap();
        let db = dir.path().join("places.sqlite");
        create_firefox_db(&db, &[("https://a.test/", Some("A"), Some(2_000), 1)]);

        let source = FirefoxHistorySource::new(&db);
        assert_eq!(source.search(2_000, 10).await.unwrap().len(), 1);
        assert_eq!(source.search(2_001, 10).await.unwrap().len(), 0);
    }
}
