use std::path::Path;

use retrace_core::transport::PocketBaseTransport;
use retrace_core::{CycleOutcome, SyncEngine};

use crate::cli::BrowserKind;
use crate::commands::common::{build_state_store, format_timestamp, resolve_source};
use crate::error::CliError;

pub async fn run_sync(browser: BrowserKind, history_db: Option<&Path>) -> Result<(), CliError> {
    let store = build_state_store()?;
    let source = resolve_source(browser, history_db)?;
    let transport = PocketBaseTransport::new().map_err(retrace_core::Error::from)?;
    let engine = SyncEngine::new(source, transport, store);

    match engine.run_cycle().await? {
        CycleOutcome::NotConfigured => Err(CliError::NotConfigured),
        CycleOutcome::Busy => {
            println!("A sync cycle is already in progress.");
            Ok(())
        }
        CycleOutcome::Empty => {
            println!("No new history entries.");
            Ok(())
        }
        CycleOutcome::Completed {
            sent,
            failed,
            watermark_ms,
        } => {
            // Best effort: individual record failures are reported but do
            // not fail the command.
            if failed == 0 {
                println!("Synced {sent} entries.");
            } else {
                println!("Synced {sent} entries ({failed} failed; see logs).");
            }
            println!("Watermark advanced to {}.", format_timestamp(watermark_ms));
            Ok(())
        }
    }
}
