use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use retrace_core::scheduler::SyncScheduler;
use retrace_core::store::StateStore;
use retrace_core::transport::PocketBaseTransport;
use retrace_core::SyncEngine;
use tokio_util::sync::CancellationToken;

use crate::cli::BrowserKind;
use crate::commands::common::{build_state_store, resolve_source};
use crate::error::CliError;

pub async fn run_daemon(
    interval_secs: u64,
    browser: BrowserKind,
    history_db: Option<&Path>,
    no_initial_sync: bool,
) -> Result<(), CliError> {
    let store = build_state_store()?;
    let settings = store.load_settings().await?;
    if !settings.is_configured() {
        tracing::warn!(
            "Record store is not configured; cycles will no-op until `retrace config init` is run"
        );
    }

    let source = resolve_source(browser, history_db)?;
    let transport = PocketBaseTransport::new().map_err(retrace_core::Error::from)?;
    let engine = Arc::new(SyncEngine::new(source, transport, store));

    let scheduler = SyncScheduler::new(
        engine,
        Duration::from_secs(interval_secs),
        !no_initial_sync,
    );
    let cancel = CancellationToken::new();
    let task = tokio::spawn(scheduler.run(cancel.clone()));

    tokio::signal::ctrl_c().await?;
    tracing::info!("Shutting down");
    cancel.cancel();
    if let Err(error) = task.await {
        tracing::error!("Scheduler task failed: {error}");
    }
    Ok(())
}
