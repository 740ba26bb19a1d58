use retrace_core::store::StateStore;
use retrace_core::transport::PocketBaseClient;

use crate::commands::common::{build_state_store, format_timestamp};
use crate::error::CliError;

pub async fn run_status() -> Result<(), CliError> {
    let store = build_state_store()?;
    let settings = store.load_settings().await?;
    let watermark = store.load_watermark().await?;

    println!(
        "Configured: {}",
        if settings.is_configured() { "yes" } else { "no" }
    );
    println!(
        "Endpoint:   {}",
        settings.api_url.as_deref().unwrap_or("(unset)")
    );
    println!("Collection: {}", settings.collection_name);
    println!(
        "Last sync:  {}",
        watermark.map_or_else(|| "never".to_string(), format_timestamp)
    );

    // The probe reports reachability; an unreachable store is status
    // output, not a command failure.
    if let Some(api_url) = settings.api_url.as_deref() {
        match probe(api_url).await {
            Ok(message) => println!("Store:      reachable ({message})"),
            Err(error) => println!("Store:      unreachable ({error})"),
        }
    }
    Ok(())
}

async fn probe(api_url: &str) -> Result<String, CliError> {
    let client = PocketBaseClient::new(api_url)?;
    let health = client.health().await?;
    if health.message.is_empty() {
        Ok(format!("code {}", health.code))
    } else {
        Ok(health.message)
    }
}
