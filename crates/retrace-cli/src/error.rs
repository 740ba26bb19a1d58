use std::io;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum CliError {
    #[error(transparent)]
    Core(#[from] retrace_core::Error),
    #[error(transparent)]
    Store(#[from] retrace_core::store::StoreError),
    #[error(transparent)]
    Io(#[from] io::Error),
    #[error(transparent)]
    Serialization(#[from] serde_json::Error),
    #[error("Configuration error: {0}")]
    Config(String),
    #[error("Authentication error: {0}")]
    Auth(String),
    #[error(
        "Sync is not configured. Run `retrace config init --api-url <URL>` (or set RETRACE_API_URL) first."
    )]
    NotConfigured,
    #[error(
        "No credentials for the record store. Pass --identity/--password, set RETRACE_IDENTITY and RETRACE_PASSWORD, or run `retrace auth login`."
    )]
    MissingCredentials,
    #[error("No records found in the store for this query")]
    NoData,
}
