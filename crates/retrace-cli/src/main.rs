//! Retrace CLI - browser history sync from the command line
//!
//! Ships new browser history entries to a PocketBase record store, either
//! continuously (`retrace run`) or one cycle at a time (`retrace sync`),
//! and inspects what was synced.

mod cli;
mod commands;
mod error;
mod session;

use clap::Parser;

use crate::cli::{Cli, Commands};
use crate::error::CliError;

#[tokio::main]
async fn main() {
    if let Err(error) = run().await {
        eprintln!("Error: {error}");
        std::process::exit(1);
    }
}

async fn run() -> Result<(), CliError> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("retrace=info".parse().unwrap()),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Run {
            interval,
            browser,
            history_db,
            no_initial_sync,
        } => commands::run::run_daemon(interval, browser, history_db.as_deref(), no_initial_sync)
            .await,
        Commands::Sync {
            browser,
            history_db,
        } => commands::sync::run_sync(browser, history_db.as_deref()).await,
        Commands::Config { command } => commands::config::run_config(command).await,
        Commands::Status => commands::status::run_status().await,
        Commands::Stats {
            user,
            top,
            csv,
            output,
            identity,
            password,
        } => {
            commands::stats::run_stats(user, top, csv, output.as_deref(), identity, password).await
        }
        Commands::Auth { command } => commands::auth_cmd::run_auth(command).await,
        Commands::Completions { shell, output } => {
            commands::completions::run_completions(shell, output.as_deref())
        }
    }
}
