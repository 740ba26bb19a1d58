use std::env;
use std::path::{Path, PathBuf};

use retrace_core::source::{
    ChromeHistorySource, FirefoxHistorySource, HistorySource, SourceResult,
};
use retrace_core::store::JsonStateStore;
use retrace_core::HistoryEntry;

use crate::cli::BrowserKind;
use crate::error::CliError;

/// Build the state store over the default file locations.
///
/// Settings live under the config directory, the watermark under the data
/// directory, each overridable through `RETRACE_CONFIG_PATH` and
/// `RETRACE_STATE_PATH`.
pub fn build_state_store() -> Result<JsonStateStore, CliError> {
    let settings_path = match env::var_os("RETRACE_CONFIG_PATH") {
        Some(path) => PathBuf::from(path),
        None => dirs::config_dir()
            .ok_or_else(|| CliError::Config("Failed to resolve config directory".to_string()))?
            .join("retrace")
            .join("config.json"),
    };
    let state_path = match env::var_os("RETRACE_STATE_PATH") {
        Some(path) => PathBuf::from(path),
        None => dirs::data_dir()
            .ok_or_else(|| CliError::Config("Failed to resolve data directory".to_string()))?
            .join("retrace")
            .join("state.json"),
    };
    Ok(JsonStateStore::new(settings_path, state_path))
}

/// A history source picked at runtime from the `--browser` flag.
#[derive(Debug, Clone)]
pub enum SelectedSource {
    Chrome(ChromeHistorySource),
    Firefox(FirefoxHistorySource),
}

impl HistorySource for SelectedSource {
    async fn search(
        &self,
        start_time_ms: i64,
        max_results: usize,
    ) -> SourceResult<Vec<HistoryEntry>> {
        match self {
            Self::Chrome(source) => source.search(start_time_ms, max_results).await,
            Self::Firefox(source) => source.search(start_time_ms, max_results).await,
        }
    }
}

/// Resolve the history database path (flag, then `RETRACE_HISTORY_DB`, then
/// the browser's default profile location) and wrap it in a source.
pub fn resolve_source(
    browser: BrowserKind,
    explicit_path: Option<&Path>,
) -> Result<SelectedSource, CliError> {
    let overridden = explicit_path
        .map(Path::to_path_buf)
        .or_else(|| env::var_os("RETRACE_HISTORY_DB").map(PathBuf::from));

    match browser {
        BrowserKind::Chrome => {
            let path = match overridden {
                Some(path) => path,
                None => default_chrome_db()?,
            };
            Ok(SelectedSource::Chrome(ChromeHistorySource::new(path)))
        }
        BrowserKind::Firefox => {
            let path = match overridden {
                Some(path) => path,
                None => default_firefox_db()?,
            };
            Ok(SelectedSource::Firefox(FirefoxHistorySource::new(path)))
        }
    }
}

fn default_chrome_db() -> Result<PathBuf, CliError> {
    let config_dir = dirs::config_dir()
        .ok_or_else(|| CliError::Config("Failed to resolve config directory".to_string()))?;
    Ok(pick_history_db(&chrome_candidates(&config_dir)))
}

/// Default profile locations for Chromium-family browsers, preferred
/// install first.
fn chrome_candidates(config_dir: &Path) -> Vec<PathBuf> {
    let families: &[&[&str]] = if cfg!(target_os = "macos") {
        &[
            &["Google", "Chrome"],
            &["Chromium"],
            &["BraveSoftware", "Brave-Browser"],
        ]
    } else {
        &[
            &["google-chrome"],
            &["chromium"],
            &["BraveSoftware", "Brave-Browser"],
        ]
    };
    families
        .iter()
        .map(|parts| {
            let mut path = config_dir.to_path_buf();
            for part in *parts {
                path.push(part);
            }
            path.join("Default").join("History")
        })
        .collect()
}

/// First candidate database that exists, or the primary location so the
/// source's not-found error names where the browser was expected.
fn pick_history_db(candidates: &[PathBuf]) -> PathBuf {
    candidates
        .iter()
        .find(|path| path.exists())
        .unwrap_or(&candidates[0])
        .clone()
}

/// Firefox profile directories carry a random prefix, so the default is
/// found by scanning the profiles root for a `places.sqlite`, preferring
/// the `.default-release` profile modern installs use.
fn default_firefox_db() -> Result<PathBuf, CliError> {
    let home = dirs::home_dir()
        .ok_or_else(|| CliError::Config("Failed to resolve home directory".to_string()))?;
    let root = if cfg!(target_os = "macos") {
        home.join("Library")
            .join("Application Support")
            .join("Firefox")
            .join("Profiles")
    } else {
        home.join(".mozilla").join("firefox")
    };

    let mut fallback = None;
    for entry in std::fs::read_dir(&root)
        .map_err(|error| {
            CliError::Config(format!(
                "Failed to read Firefox profiles at {}: {error}",
                root.display()
            ))
        })?
        .flatten()
    {
        let candidate = entry.path().join("places.sqlite");
        if !candidate.exists() {
            continue;
        }
        if entry.file_name().to_string_lossy().ends_with(".default-release") {
            return Ok(candidate);
        }
        if fallback.is_none() {
            fallback = Some(candidate);
        }
    }

    fallback.ok_or_else(|| {
        CliError::Config(format!(
            "No Firefox profile with a places.sqlite under {}",
            root.display()
        ))
    })
}

/// Render a Unix ms timestamp for terminal output.
pub fn format_timestamp(timestamp_ms: i64) -> String {
    chrono::DateTime::from_timestamp_millis(timestamp_ms).map_or_else(
        || timestamp_ms.to_string(),
        |date_time| date_time.format("%Y-%m-%d %H:%M:%S UTC").to_string(),
    )
}
