use std::env;
use std::path::Path;

use retrace_core::analytics;
use retrace_core::store::StateStore;
use retrace_core::transport::PocketBaseClient;
use retrace_core::util::normalize_text_option;
use retrace_core::StoredRecord;

use crate::commands::common::build_state_store;
use crate::error::CliError;
use crate::session::SessionStore;

pub async fn run_stats(
    user: Option<String>,
    top: usize,
    csv: bool,
    output: Option<&Path>,
    identity: Option<String>,
    password: Option<String>,
) -> Result<(), CliError> {
    let store = build_state_store()?;
    let settings = store.load_settings().await?;
    let Some(api_url) = settings.api_url.as_deref().filter(|url| !url.is_empty()) else {
        return Err(CliError::NotConfigured);
    };

    let client = PocketBaseClient::new(api_url)?;
    let token = resolve_token(&client, identity, password).await?;
    let records = client
        .list_all_records(
            &settings.collection_name,
            Some(&token),
            user.as_deref().filter(|email| !email.is_empty()),
        )
        .await?;

    if csv {
        return write_csv(&records, output);
    }
    if records.is_empty() {
        return Err(CliError::NoData);
    }
    render_stats(&records, top);
    Ok(())
}

/// Credentials resolve from flags, then `RETRACE_IDENTITY` /
/// `RETRACE_PASSWORD`, then the stored session.
async fn resolve_token(
    client: &PocketBaseClient,
    identity: Option<String>,
    password: Option<String>,
) -> Result<String, CliError> {
    let identity = normalize_text_option(identity)
        .or_else(|| normalize_text_option(env::var("RETRACE_IDENTITY").ok()));
    let password = password.or_else(|| env::var("RETRACE_PASSWORD").ok());

    match (identity, password) {
        (Some(identity), Some(password)) => {
            let session = client.auth_with_password(&identity, &password).await?;
            Ok(session.token)
        }
        (None, None) => SessionStore::new()
            .load()?
            .map(|session| session.token)
            .ok_or(CliError::MissingCredentials),
        _ => Err(CliError::Auth(
            "--identity and --password must be provided together".to_string(),
        )),
    }
}

fn write_csv(records: &[StoredRecord], output: Option<&Path>) -> Result<(), CliError> {
    let rendered = analytics::render_csv(records);
    if let Some(path) = output {
        std::fs::write(path, rendered)?;
        println!("{}", path.display());
    } else {
        println!("{rendered}");
    }
    Ok(())
}

fn render_stats(records: &[StoredRecord], top: usize) {
    let stats = analytics::compute_stats(records);
    println!("History Stats");
    println!("  Total visits:     {}", stats.total_visits);
    println!("  Unique sites:     {}", stats.unique_sites);
    println!("  Active users:     {}", stats.active_users);
    println!("  Date range:       {} days", stats.date_range_days);
    println!("  Avg daily visits: {}", stats.avg_daily_visits);

    let insights = analytics::generate_insights(records);
    if !insights.is_empty() {
        println!();
        println!("Insights");
        for insight in &insights {
            println!("  {}: {}", insight.title, insight.description);
        }
    }

    let domains = analytics::visits_by_domain(records);
    if !domains.is_empty() {
        println!();
        println!("Top Domains");
        for (domain, visits) in domains.iter().take(5) {
            println!("  {domain:<30}  {visits} visits");
        }
    }

    let sites = analytics::top_sites(records, top);
    if !sites.is_empty() {
        println!();
        println!("Top Sites");
        for (rank, (url, visits)) in sites.iter().enumerate() {
            println!("  {:>3}. {url}  ({visits} visits)", rank + 1);
        }
    }
}
