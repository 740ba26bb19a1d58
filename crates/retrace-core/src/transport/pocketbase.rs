//! PocketBase HTTP bindings: record writes, health probe, password auth,
//! and paginated record listing.

use reqwest::StatusCode;
use serde::{Deserialize, Serialize};

use super::{RecordTransport, TransmitError, TransmitResult};
use crate::error::{Error, Result};
use crate::models::{StoredRecord, SyncRecord, SyncSettings};
use crate::util::{compact_text, is_http_url, normalize_text_option};

/// Page size for list queries. PocketBase caps `perPage` at 500.
const LIST_PAGE_SIZE: u32 = 500;

/// Write-side transport, one `POST /api/collections/{name}/records` per
/// record.
///
/// The write path is unauthenticated; the collection is expected to accept
/// public creates.
#[derive(Debug, Clone)]
pub struct PocketBaseTransport {
    client: reqwest::Client,
}

impl PocketBaseTransport {
    pub fn new() -> TransmitResult<Self> {
        Ok(Self {
            client: reqwest::Client::builder().build()?,
        })
    }
}

impl RecordTransport for PocketBaseTransport {
    async fn send(&self, record: &SyncRecord, settings: &SyncSettings) -> TransmitResult<()> {
        let endpoint = normalize_base_url(settings.api_url.as_deref().unwrap_or_default())
            .map_err(TransmitError::InvalidEndpoint)?;
        let url = format!(
            "{endpoint}/api/collections/{}/records",
            settings.collection_name
        );

        let response = self.client.post(&url).json(record).send().await?;
        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(TransmitError::Rejected {
                status: status.as_u16(),
                message: parse_api_error(status, &body),
            });
        }
        Ok(())
    }
}

/// Read/auth client for the record store, used by the status and stats
/// commands. Kept apart from the write transport: the sync engine never
/// authenticates.
#[derive(Clone)]
pub struct PocketBaseClient {
    endpoint: String,
    client: reqwest::Client,
}

impl PocketBaseClient {
    pub fn new(endpoint: impl Into<String>) -> Result<Self> {
        let endpoint = normalize_base_url(&endpoint.into()).map_err(Error::InvalidInput)?;
        Ok(Self {
            endpoint,
            client: reqwest::Client::builder().build()?,
        })
    }

    /// `GET /api/health`, Ok for any 2xx response.
    pub async fn health(&self) -> Result<HealthStatus> {
        let response = self
            .client
            .get(format!("{}/api/health", self.endpoint))
            .header("Accept", "application/json")
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(Error::Api(parse_api_error(status, &body)));
        }

        Ok(response.json::<HealthStatus>().await?)
    }

    /// Exchange identity and password for a session token against the
    /// `users` auth collection.
    pub async fn auth_with_password(&self, identity: &str, password: &str) -> Result<AuthSession> {
        let identity = identity.trim();
        if identity.is_empty() {
            return Err(Error::InvalidInput(
                "identity must not be empty".to_string(),
            ));
        }

        let response = self
            .client
            .post(format!(
                "{}/api/collections/users/auth-with-password",
                self.endpoint
            ))
            .header("Accept", "application/json")
            .json(&serde_json::json!({
                "identity": identity,
                "password": password,
            }))
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(Error::Api(parse_api_error(status, &body)));
        }

        let payload = response.json::<AuthResponse>().await?;
        payload.try_into()
    }

    /// Fetch every record in `collection`, newest visit first, optionally
    /// filtered to one user's email. Pages of [`LIST_PAGE_SIZE`] are
    /// fetched until the store reports no further pages.
    pub async fn list_all_records(
        &self,
        collection: &str,
        token: Option<&str>,
        user_email: Option<&str>,
    ) -> Result<Vec<StoredRecord>> {
        let url = format!("{}/api/collections/{collection}/records", self.endpoint);
        let mut records = Vec::new();
        let mut page = 1u32;

        loop {
            let mut request = self.client.get(&url).query(&[
                ("page", page.to_string()),
                ("perPage", LIST_PAGE_SIZE.to_string()),
                ("sort", "-visit_time".to_string()),
            ]);
            if let Some(email) = user_email {
                request = request.query(&[("filter", format!("user_email=\"{email}\""))]);
            }
            if let Some(token) = token {
                request = request.header("Authorization", token);
            }

            let response = request.send().await?;
            if !response.status().is_success() {
                let status = response.status();
                let body = response.text().await.unwrap_or_default();
                return Err(Error::Api(parse_api_error(status, &body)));
            }

            let page_data = response.json::<ListPage>().await?;
            records.extend(page_data.items);
            if page >= page_data.total_pages {
                break;
            }
            page += 1;
        }

        Ok(records)
    }
}

/// Payload of `GET /api/health`.
#[derive(Debug, Clone, Deserialize)]
pub struct HealthStatus {
    /// Status code reported in the body
    #[serde(default)]
    pub code: i64,
    /// Human-readable status line
    #[serde(default)]
    pub message: String,
}

/// An authenticated session against the record store.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthSession {
    pub token: String,
    pub user_id: String,
    pub email: Option<String>,
}

impl std::fmt::Debug for AuthSession {
    fn fmt(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        formatter
            .debug_struct("AuthSession")
            .field("token", &"[REDACTED]")
            .field("user_id", &self.user_id)
            .field("email", &self.email)
            .finish()
    }
}

#[derive(Debug, Deserialize)]
struct AuthResponse {
    token: Option<String>,
    record: Option<AuthRecord>,
}

#[derive(Debug, Default, Deserialize)]
struct AuthRecord {
    id: Option<String>,
    email: Option<String>,
}

impl TryFrom<AuthResponse> for AuthSession {
    type Error = Error;

    fn try_from(value: AuthResponse) -> Result<Self> {
        let token = value
            .token
            .map(|token| token.trim().to_string())
            .filter(|token| !token.is_empty())
            .ok_or_else(|| Error::Api("auth response did not include a token".to_string()))?;

        let record = value.record.unwrap_or_default();
        Ok(Self {
            token,
            user_id: record.id.unwrap_or_default(),
            email: normalize_text_option(record.email),
        })
    }
}

#[derive(Debug, Deserialize)]
struct ListPage {
    #[serde(rename = "totalPages", default)]
    total_pages: u32,
    #[serde(default)]
    items: Vec<StoredRecord>,
}

#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    message: Option<String>,
}

fn parse_api_error(status: StatusCode, body: &str) -> String {
    if let Ok(payload) = serde_json::from_str::<ApiErrorBody>(body) {
        if let Some(message) = normalize_text_option(payload.message) {
            return format!("{message} ({})", status.as_u16());
        }
    }

    let trimmed = compact_text(body);
    if trimmed.is_empty() {
        format!("HTTP {}", status.as_u16())
    } else {
        format!("{trimmed} ({})", status.as_u16())
    }
}

fn normalize_base_url(raw: &str) -> std::result::Result<String, String> {
    let Some(url) = normalize_text_option(Some(raw.to_string())) else {
        return Err("endpoint must not be empty".to_string());
    };
    if is_http_url(&url) {
        Ok(url.trim_end_matches('/').to_string())
    } else {
        Err("endpoint must include http:// or https://".to_string())
    }
}
