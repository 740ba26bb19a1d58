//! The incremental sync engine.
//!
//! One cycle pulls history entries newer than the persisted watermark,
//! pushes each to the record store, then advances the watermark to the
//! wall clock at completion.

use std::sync::atomic::{AtomicBool, Ordering};

use crate::error::Result;
use crate::identity;
use crate::models::SyncRecord;
use crate::source::HistorySource;
use crate::store::StateStore;
use crate::transport::RecordTransport;
use crate::util::unix_timestamp_ms_now;

/// Most entries a single cycle pulls from the source.
const MAX_BATCH: usize = 1000;

/// What a single sync cycle did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CycleOutcome {
    /// Another cycle was already in flight; this trigger was dropped
    Busy,
    /// Settings lack an endpoint or collection; nothing ran
    NotConfigured,
    /// The window contained no new entries; the watermark is untouched
    Empty,
    /// Every entry in the window was attempted; the watermark advanced
    Completed {
        /// Records accepted by the store
        sent: usize,
        /// Records rejected or lost; they are not retried
        failed: usize,
        /// New watermark (Unix ms), wall clock at completion
        watermark_ms: i64,
    },
}

/// Drives sync cycles over a history source, a record transport, and a
/// state store.
///
/// At most one cycle runs at a time; overlapping triggers are dropped, not
/// queued. Entries are transmitted sequentially in source order, and a
/// per-record failure never aborts the rest of the batch.
pub struct SyncEngine<S, T, P> {
    source: S,
    transport: T,
    store: P,
    busy: AtomicBool,
}

impl<S: HistorySource, T: RecordTransport, P: StateStore> SyncEngine<S, T, P> {
    pub fn new(source: S, transport: T, store: P) -> Self {
        Self {
            source,
            transport,
            store,
            busy: AtomicBool::new(false),
        }
    }

    /// Run one sync cycle.
    ///
    /// Returns [`CycleOutcome::Busy`] without touching the source, the
    /// transport, or the store when a cycle is already in flight. Source
    /// and store errors abort the cycle and leave the watermark unchanged.
    pub async fn run_cycle(&self) -> Result<CycleOutcome> {
        if self.busy.swap(true, Ordering::SeqCst) {
            tracing::debug!("Sync cycle already in flight; trigger dropped");
            return Ok(CycleOutcome::Busy);
        }
        let outcome = self.cycle_inner().await;
        self.busy.store(false, Ordering::SeqCst);
        outcome
    }

    async fn cycle_inner(&self) -> Result<CycleOutcome> {
        let mut settings = self.store.load_settings().await?;
        if !settings.is_configured() {
            tracing::debug!("Record store not configured; skipping sync cycle");
            return Ok(CycleOutcome::NotConfigured);
        }
        if settings.user_id.as_deref().is_none_or(str::is_empty) {
            // A missing install id never blocks a cycle; the fallback id is
            // used for this run only and is not persisted.
            settings.user_id = Some(identity::generate_user_id());
        }

        // A fresh install starts the window at "now": pre-install history
        // is never backfilled.
        let since = match self.store.load_watermark().await? {
            Some(watermark) => watermark,
            None => unix_timestamp_ms_now(),
        };

        let entries = self.source.search(since, MAX_BATCH).await?;
        if entries.is_empty() {
            tracing::debug!("No history entries since {since}");
            return Ok(CycleOutcome::Empty);
        }

        let mut sent = 0usize;
        let mut failed = 0usize;
        for entry in &entries {
            let record = SyncRecord::from_entry(entry, &settings);
            match self.transport.send(&record, &settings).await {
                Ok(()) => sent += 1,
                Err(error) => {
                    failed += 1;
                    tracing::warn!("Failed to sync {}: {error}", record.url);
                }
            }
        }

        // Wall clock at completion, not the newest visit time. Entries that
        // failed above fall behind the watermark and are not retried.
        let watermark_ms = unix_timestamp_ms_now();
        self.store.save_watermark(watermark_ms).await?;
        tracing::info!(
            "Synced {sent} of {} history entries ({failed} failed)",
            entries.len()
        );
        Ok(CycleOutcome::Completed {
            sent,
            failed,
            watermark_ms,
        })
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::time::Duration;

    use pretty_assertions::assert_eq;

    use super::*;
    use crate::error::Error;
    use crate::models::{HistoryEntry, SyncSettings};
    use crate::source::MemoryHistorySource;
    use crate::store::MemoryStateStore;
    use crate::transport::MockTransport;

    fn configured_settings() -> SyncSettings {
        SyncSettings {
            api_url: Some("https://records.example".to_string()),
            collection_name: "history".to_string(),
            user_email: "person@example.com".to_string(),
            user_id: Some("user_1700000000000_abc123def".to_string()),
        }
    }

    fn entry(url: &str, visit_ms: i64, visits: i64) -> HistoryEntry {
        HistoryEntry {
            url: url.to_string(),
            title: Some(format!("{url} title")),
            last_visit_time: visit_ms,
            visit_count: Some(visits),
        }
    }

    fn engine_parts(
        settings: SyncSettings,
        entries: Vec<HistoryEntry>,
    ) -> (
        SyncEngine<MemoryHistorySource, MockTransport, MemoryStateStore>,
        MemoryHistorySource,
        MockTransport,
        MemoryStateStore,
    ) {
        let source = MemoryHistorySource::with_entries(entries);
        let transport = MockTransport::default();
        let store = MemoryStateStore::with_settings(settings);
        let engine = SyncEngine::new(source.clone(), transport.clone(), store.clone());
        (engine, source, transport, store)
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn unconfigured_engine_touches_nothing() {
        let (engine, source, transport, store) = engine_parts(
            SyncSettings::default(),
            vec![entry("https://a.test/", 1_500, 2)],
        );

        let outcome = engine.run_cycle().await.unwrap();
        assert_eq!(outcome, CycleOutcome::NotConfigured);
        assert_eq!(source.search_calls(), 0);
        assert!(transport.sent().is_empty());
        assert_eq!(store.watermark(), None);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn empty_window_leaves_watermark_untouched() {
        let (engine, _source, transport, store) = engine_parts(
            configured_settings(),
            vec![entry("https://stale.test/", 500, 1)],
        );
        store.set_watermark(1_000);

        let outcome = engine.run_cycle().await.unwrap();
        assert_eq!(outcome, CycleOutcome::Empty);
        assert!(transport.sent().is_empty());
        assert_eq!(store.watermark(), Some(1_000));
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn cycle_sends_window_and_advances_watermark_to_wall_clock() {
        let (engine, _source, transport, store) = engine_parts(
            configured_settings(),
            vec![
                entry("https://a.test/", 1_500, 2),
                entry("https://b.test/", 1_800, 1),
            ],
        );
        store.set_watermark(1_000);

        let before = unix_timestamp_ms_now();
        let outcome = engine.run_cycle().await.unwrap();
        let CycleOutcome::Completed {
            sent,
            failed,
            watermark_ms,
        } = outcome
        else {
            panic!("expected Completed, got {outcome:?}");
        };

        assert_eq!(sent, 2);
        assert_eq!(failed, 0);

        // Most recent first, transmitted sequentially in source order.
        assert_eq!(
            transport.sent_urls(),
            vec!["https://b.test/", "https://a.test/"]
        );
        let records = transport.sent();
        let a = records
            .iter()
            .find(|record| record.url == "https://a.test/")
            .unwrap();
        assert_eq!(a.visit_count, 2);
        assert_eq!(a.user_email, "person@example.com");
        let b = records
            .iter()
            .find(|record| record.url == "https://b.test/")
            .unwrap();
        assert_eq!(b.visit_count, 1);

        // Wall clock at completion, not the newest visit time (1800).
        assert!(watermark_ms >= before);
        assert_eq!(store.watermark(), Some(watermark_ms));
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn failed_record_is_counted_and_never_retried() {
        let (engine, _source, transport, store) = engine_parts(
            configured_settings(),
            vec![
                entry("https://a.test/", 1_500, 1),
                entry("https://b.test/", 1_600, 1),
                entry("https://c.test/", 1_700, 1),
            ],
        );
        store.set_watermark(1_000);
        transport.fail_url("https://b.test/");

        let outcome = engine.run_cycle().await.unwrap();
        let CycleOutcome::Completed { sent, failed, .. } = outcome else {
            panic!("expected Completed, got {outcome:?}");
        };
        assert_eq!(sent, 2);
        assert_eq!(failed, 1);
        assert_eq!(
            transport.sent_urls(),
            vec!["https://c.test/", "https://a.test/"]
        );

        // The watermark moved past the failed entry, so the next cycle
        // sees an empty window and b.test is gone for good.
        let second = engine.run_cycle().await.unwrap();
        assert_eq!(second, CycleOutcome::Empty);
        assert_eq!(transport.sent().len(), 2);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn overlapping_trigger_is_dropped_while_busy() {
        let (engine, source, transport, store) = engine_parts(
            configured_settings(),
            vec![entry("https://a.test/", 1_500, 1)],
        );
        store.set_watermark(1_000);
        transport.set_delay(Duration::from_millis(150));

        let engine = Arc::new(engine);
        let first = {
            let engine = Arc::clone(&engine);
            tokio::spawn(async move { engine.run_cycle().await })
        };
        tokio::time::sleep(Duration::from_millis(30)).await;

        let second = engine.run_cycle().await.unwrap();
        assert_eq!(second, CycleOutcome::Busy);

        let first = first.await.unwrap().unwrap();
        assert!(matches!(first, CycleOutcome::Completed { sent: 1, .. }));
        assert_eq!(transport.sent().len(), 1);
        assert_eq!(source.search_calls(), 1);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn watermark_is_monotonic_across_cycles() {
        let (engine, source, transport, store) =
            engine_parts(configured_settings(), vec![entry("https://a.test/", 1_500, 1)]);
        store.set_watermark(1_000);

        let CycleOutcome::Completed {
            watermark_ms: first,
            ..
        } = engine.run_cycle().await.unwrap()
        else {
            panic!("expected Completed");
        };

        source.push_entry(entry("https://b.test/", first + 60_000, 1));
        let CycleOutcome::Completed {
            watermark_ms: second,
            ..
        } = engine.run_cycle().await.unwrap()
        else {
            panic!("expected Completed");
        };

        assert!(second >= first);
        assert_eq!(transport.sent().len(), 2);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn fresh_install_window_starts_at_now() {
        // No watermark: entries older than "now" stay unsynced.
        let (engine, _source, transport, store) = engine_parts(
            configured_settings(),
            vec![entry("https://preinstall.test/", 1_500, 9)],
        );

        let outcome = engine.run_cycle().await.unwrap();
        assert_eq!(outcome, CycleOutcome::Empty);
        assert!(transport.sent().is_empty());
        assert_eq!(store.watermark(), None);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn source_error_aborts_cycle_and_clears_busy() {
        let (engine, source, transport, store) = engine_parts(
            configured_settings(),
            vec![entry("https://a.test/", 1_500, 1)],
        );
        store.set_watermark(1_000);
        source.set_fail_searches(true);

        let error = engine.run_cycle().await.unwrap_err();
        assert!(matches!(error, Error::Source(_)));
        assert!(transport.sent().is_empty());
        assert_eq!(store.watermark(), Some(1_000));

        // The busy flag was released on the error path.
        source.set_fail_searches(false);
        let outcome = engine.run_cycle().await.unwrap();
        assert!(matches!(outcome, CycleOutcome::Completed { sent: 1, .. }));
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn missing_user_id_gets_ephemeral_fallback() {
        let mut settings = configured_settings();
        settings.user_id = None;
        let (engine, _source, transport, store) =
            engine_parts(settings, vec![entry("https://a.test/", 1_500, 1)]);
        store.set_watermark(1_000);

        engine.run_cycle().await.unwrap();
        let records = transport.sent();
        assert!(records[0].user_id.starts_with("user_"));

        // The fallback id is per-run, never written back to settings.
        assert_eq!(store.load_settings().await.unwrap().user_id, None);
    }
}
