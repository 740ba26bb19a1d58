use std::env;

use retrace_core::identity;
use retrace_core::store::{JsonStateStore, StateStore};
use retrace_core::util::{is_http_url, normalize_text_option, unix_timestamp_ms_now};

use crate::cli::ConfigCommands;
use crate::commands::common::{build_state_store, format_timestamp};
use crate::error::CliError;

pub async fn run_config(command: ConfigCommands) -> Result<(), CliError> {
    match command {
        ConfigCommands::Init {
            api_url,
            collection,
            email,
        } => {
            let store = build_state_store()?;
            run_config_init(&store, api_url, collection, email).await
        }
        ConfigCommands::Show => run_config_show().await,
    }
}

/// Merge precedence per field: explicit flag, then environment, then the
/// existing file.
async fn run_config_init(
    store: &JsonStateStore,
    api_url: Option<String>,
    collection: Option<String>,
    email: Option<String>,
) -> Result<(), CliError> {
    let mut settings = store.load_settings().await?;

    if let Some(value) = normalize_text_option(api_url)
        .or_else(|| normalize_text_option(env::var("RETRACE_API_URL").ok()))
    {
        if !is_http_url(&value) {
            return Err(CliError::Config(
                "api_url must include http:// or https://".to_string(),
            ));
        }
        settings.api_url = Some(value);
    }
    if let Some(value) = normalize_text_option(collection)
        .or_else(|| normalize_text_option(env::var("RETRACE_COLLECTION").ok()))
    {
        settings.collection_name = value;
    }
    if let Some(value) = normalize_text_option(email)
        .or_else(|| normalize_text_option(env::var("RETRACE_EMAIL").ok()))
    {
        settings.user_email = value;
    }

    if settings.user_id.as_deref().is_none_or(str::is_empty) {
        let id = identity::get_or_create_user_id(store).await;
        println!("Generated install id {id}");
        settings.user_id = Some(id);
    }

    store.save_settings(&settings).await?;
    println!(
        "Configuration written to {}",
        store.settings_path().display()
    );

    // First run pins the watermark to "now" so pre-install history is
    // never backfilled.
    if store.load_watermark().await?.is_none() {
        let now_ms = unix_timestamp_ms_now();
        store.save_watermark(now_ms).await?;
        println!(
            "Watermark initialized to {}; only newer visits will sync.",
            format_timestamp(now_ms)
        );
    }

    if settings.is_configured() {
        println!("Sync is ready. Run `retrace sync` or `retrace run`.");
    } else {
        let mut missing = Vec::new();
        if settings.api_url.is_none() {
            missing.push("--api-url");
        }
        if settings.collection_name.trim().is_empty() {
            missing.push("--collection");
        }
        println!("Configuration is missing: {}", missing.join(", "));
    }
    Ok(())
}

async fn run_config_show() -> Result<(), CliError> {
    let store = build_state_store()?;
    let settings = store.load_settings().await?;

    println!("Config file: {}", store.settings_path().display());
    println!(
        "  api_url:    {}",
        settings.api_url.as_deref().unwrap_or("(unset)")
    );
    println!("  collection: {}", settings.collection_name);
    println!(
        "  email:      {}",
        if settings.user_email.is_empty() {
            "(unset)"
        } else {
            &settings.user_email
        }
    );
    println!(
        "  user_id:    {}",
        settings.user_id.as_deref().unwrap_or("(unset)")
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::path::Path;

    use pretty_assertions::assert_eq;
    use tempfile::tempdir;

    use super::*;

    fn store_in(dir: &Path) -> JsonStateStore {
        JsonStateStore::new(dir.join("config.json"), dir.join("state.json"))
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn init_resolves_install_id_through_the_store() {
        let dir = tempdir().unwrap();
        let store = store_in(dir.path());

        run_config_init(
            &store,
            Some("https://records.example".to_string()),
            None,
            None,
        )
        .await
        .unwrap();

        let settings = store.load_settings().await.unwrap();
        assert!(settings.is_configured());
        let id = settings.user_id.clone().unwrap();
        assert!(id.starts_with("user_"));

        // A second init reuses the persisted id instead of minting a new
        // one, and merges the new flag over the existing file.
        run_config_init(&store, None, Some("archive".to_string()), None)
            .await
            .unwrap();
        let settings = store.load_settings().await.unwrap();
        assert_eq!(settings.user_id.as_deref(), Some(id.as_str()));
        assert_eq!(settings.collection_name, "archive");
        assert_eq!(settings.api_url.as_deref(), Some("https://records.example"));
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn init_pins_the_watermark_only_once() {
        let dir = tempdir().unwrap();
        let store = store_in(dir.path());

        run_config_init(
            &store,
            Some("https://records.example".to_string()),
            None,
            None,
        )
        .await
        .unwrap();
        let pinned = store.load_watermark().await.unwrap().unwrap();
        assert!(pinned > 1_500_000_000_000);

        run_config_init(&store, None, None, Some("person@example.com".to_string()))
            .await
            .unwrap();
        assert_eq!(store.load_watermark().await.unwrap(), Some(pinned));
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn init_rejects_a_schemeless_endpoint() {
        let dir = tempdir().unwrap();
        let store = store_in(dir.path());

        let error = run_config_init(&store, Some("records.example".to_string()), None, None)
            .await
            .unwrap_err();
        assert!(matches!(error, CliError::Config(_)));
        assert!(!dir.path().join("config.json").exists());
    }
}
