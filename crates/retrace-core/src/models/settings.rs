//! Sync settings model

use serde::{Deserialize, Serialize};

use crate::util::normalize_text_option;

/// Collection used when none is configured.
pub const DEFAULT_COLLECTION: &str = "history";

/// Record store endpoint and identity configuration for the sync engine.
///
/// Serialized field names keep the browser extension's storage keys, so a
/// config written by any Retrace install reads back everywhere.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SyncSettings {
    /// Record store base URL, e.g. `https://records.example:8001`
    #[serde(rename = "pocketbaseUrl")]
    pub api_url: Option<String>,
    /// Record collection written by the sync engine
    pub collection_name: String,
    /// Email attached to synced records; empty when unset
    pub user_email: String,
    /// Install identifier, generated on first `config init`
    pub user_id: Option<String>,
}

impl Default for SyncSettings {
    fn default() -> Self {
        Self {
            api_url: None,
            collection_name: DEFAULT_COLLECTION.to_string(),
            user_email: String::new(),
            user_id: None,
        }
    }
}

impl SyncSettings {
    /// Whether the sync engine has enough configuration to run a cycle.
    ///
    /// Requires a non-empty endpoint and a non-empty collection name.
    #[must_use]
    pub fn is_configured(&self) -> bool {
        self.api_url
            .as_deref()
            .is_some_and(|url| !url.trim().is_empty())
            && !self.collection_name.trim().is_empty()
    }

    /// Trim all fields and drop empty optionals. The endpoint also loses
    /// any trailing slash so request paths join cleanly.
    pub fn normalize(&mut self) {
        self.api_url = normalize_text_option(self.api_url.take())
            .map(|url| url.trim_end_matches('/').to_string());
        self.collection_name = self.collection_name.trim().to_string();
        self.user_email = self.user_email.trim().to_string();
        self.user_id = normalize_text_option(self.user_id.take());
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn default_settings_are_not_configured() {
        let settings = SyncSettings::default();
        assert_eq!(settings.collection_name, DEFAULT_COLLECTION);
        assert!(!settings.is_configured());
    }

    #[test]
    fn endpoint_and_collection_gate_configuration() {
        let mut settings = SyncSettings {
            api_url: Some("https://records.example".to_string()),
            ..SyncSettings::default()
        };
        assert!(settings.is_configured());

        settings.collection_name = "  ".to_string();
        assert!(!settings.is_configured());

        settings.collection_name = "history".to_string();
        settings.api_url = Some("   ".to_string());
        assert!(!settings.is_configured());
    }

    #[test]
    fn normalize_trims_and_drops_empties() {
        let mut settings = SyncSettings {
            api_url: Some(" https://records.example/ ".to_string()),
            collection_name: " history ".to_string(),
            user_email: " person@example.com ".to_string(),
            user_id: Some("   ".to_string()),
        };
        settings.normalize();
        assert_eq!(settings.api_url.as_deref(), Some("https://records.example"));
        assert_eq!(settings.collection_name, "history");
        assert_eq!(settings.user_email, "person@example.com");
        assert_eq!(settings.user_id, None);
    }

    #[test]
    fn serde_keys_match_extension_storage() {
        let settings = SyncSettings {
            api_url: Some("https://records.example".to_string()),
            collection_name: "history".to_string(),
            user_email: "person@example.com".to_string(),
            user_id: Some("user_1700000000000_abc123def".to_string()),
        };
        let raw = serde_json::to_string(&settings).unwrap();
        assert!(raw.contains("\"pocketbaseUrl\""));
        assert!(raw.contains("\"collectionName\""));
        assert!(raw.contains("\"userEmail\""));
        assert!(raw.contains("\"userId\""));

        let parsed: SyncSettings = serde_json::from_str(&raw).unwrap();
        assert_eq!(parsed, settings);
    }

    #[test]
    fn missing_fields_fall_back_to_defaults() {
        let parsed: SyncSettings =
            serde_json::from_str(r#"{"pocketbaseUrl": "https://records.example"}"#).unwrap();
        assert_eq!(parsed.collection_name, DEFAULT_COLLECTION);
        assert_eq!(parsed.user_email, "");
        assert_eq!(parsed.user_id, None);
        assert!(parsed.is_configured());
    }
}
