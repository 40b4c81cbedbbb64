// # Cloudflare DNS Provider
//
// Live Provider Client for the ACME dns-01 bridge, backed by the
// Cloudflare API v4.
//
// ## Behaviour
//
// - One HTTP round trip per provider call; record listing follows
//   pagination up to a fixed page bound
// - Errors are propagated to the caller: no retry, no backoff and no
//   caching in this crate. Create and delete failures are reported as
//   `AddFailed` / `RemoveFailed` with the underlying message
// - The bearer token is fetched from a `CredentialSource` on every call
//
// ## Security Requirements
//
// - API token NEVER appears in logs or `Debug` output
// - An empty token is rejected at construction time
//
// ## API Reference
//
// - Cloudflare API v4: https://developers.cloudflare.com/api/
// - List Zones: GET `/zones?name=...`
// - List DNS Records: GET `/zones/:zone_id/dns_records?type=TXT&name=...`
// - Create DNS Record: POST `/zones/:zone_id/dns_records`
// - Delete DNS Record: DELETE `/zones/:zone_id/dns_records/:record_id`

use acme_dns_core::config::ProviderConfig;
use acme_dns_core::traits::{
    CredentialSource, ProviderClient, ProviderClientFactory, StaticCredential, TxtRecord, Zone,
};
use acme_dns_core::{Error, Result};
use async_trait::async_trait;
use reqwest::StatusCode;
use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;

/// Cloudflare API base URL
pub const CLOUDFLARE_API_BASE: &str = "https://api.cloudflare.com/client/v4";

/// Default HTTP timeout for API requests (30 seconds)
pub const DEFAULT_HTTP_TIMEOUT: Duration = Duration::from_secs(30);

/// Records requested per listing page
const RECORDS_PER_PAGE: u32 = 100;

/// Upper bound on listing pages followed for a single name
const MAX_RECORD_PAGES: u32 = 50;

const PROVIDER: &str = "cloudflare";

/// Response envelope shared by every Cloudflare v4 endpoint
#[derive(Debug, Deserialize)]
struct CloudflareResponse<T> {
    #[serde(default)]
    success: bool,
    result: Option<T>,
    #[serde(default)]
    errors: Vec<ApiMessage>,
    result_info: Option<ResultInfo>,
}

#[derive(Debug, Deserialize)]
struct ApiMessage {
    #[serde(default)]
    code: i64,
    #[serde(default)]
    message: String,
}

#[derive(Debug, Deserialize)]
struct ResultInfo {
    #[serde(default)]
    page: u32,
    #[serde(default)]
    total_pages: u32,
}

#[derive(Debug, Deserialize)]
struct ZoneResult {
    id: String,
    name: String,
}

/// A DNS record as returned by list and create calls
///
/// Only `id` is guaranteed; create responses may carry nothing else.
#[derive(Debug, Deserialize)]
struct DnsRecordResult {
    id: String,
    #[serde(default)]
    name: String,
    #[serde(default)]
    content: String,
    ttl: Option<u32>,
}

impl DnsRecordResult {
    /// Convert to a [`TxtRecord`], filling an absent name with the queried one
    fn into_txt_record(self, requested: &str) -> TxtRecord {
        let name = if self.name.is_empty() {
            requested.to_string()
        } else {
            self.name
        };
        TxtRecord {
            id: self.id,
            name,
            content: self.content,
            ttl: self.ttl,
        }
    }
}

/// Cloudflare DNS provider
///
/// Stateless apart from the HTTP connection pool. The Debug implementation
/// does NOT expose the credential.
pub struct CloudflareProvider {
    /// Source of the bearer token
    /// ⚠️ NEVER log the token
    credential: Arc<dyn CredentialSource>,

    /// API base URL, without trailing slash
    api_base: String,

    /// HTTP client for API requests
    client: reqwest::Client,
}

// Custom Debug implementation that hides the credential
impl std::fmt::Debug for CloudflareProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CloudflareProvider")
            .field("credential", &"<REDACTED>")
            .field("api_base", &self.api_base)
            .finish()
    }
}

impl CloudflareProvider {
    /// Create a new Cloudflare provider
    ///
    /// # Parameters
    ///
    /// - `credential`: Source of a token with Zone:Read and DNS:Edit permissions
    /// - `timeout`: Per-request HTTP timeout
    ///
    /// # Errors
    ///
    /// Returns a configuration error if the HTTP client cannot be built.
    pub fn new(credential: Arc<dyn CredentialSource>, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(concat!("acme-dns-bridge/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| Error::config(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            credential,
            api_base: CLOUDFLARE_API_BASE.to_string(),
            client,
        })
    }

    /// Create a provider for a fixed API token
    pub fn with_token(api_token: impl Into<String>) -> Result<Self> {
        let api_token = api_token.into();
        if api_token.is_empty() {
            return Err(Error::config("Cloudflare API token cannot be empty"));
        }
        Self::new(Arc::new(StaticCredential::new(api_token)), DEFAULT_HTTP_TIMEOUT)
    }

    /// Override the API base URL (test servers, API gateways)
    pub fn with_base_url(mut self, api_base: impl Into<String>) -> Self {
        self.api_base = api_base.into().trim_end_matches('/').to_string();
        self
    }

    pub fn api_base(&self) -> &str {
        &self.api_base
    }

    /// Authenticate, send and unwrap the response envelope
    ///
    /// Non-2xx statuses and `success=false` envelopes become errors.
    async fn send<T: DeserializeOwned>(
        &self,
        request: reqwest::RequestBuilder,
        context: &str,
    ) -> Result<CloudflareResponse<T>> {
        let token = self.credential.bearer_token().await?;

        let response = request
            .bearer_auth(token)
            .send()
            .await
            .map_err(|e| Error::transport(PROVIDER, format!("{}: HTTP request failed: {}", context, e)))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| Error::transport(PROVIDER, format!("{}: failed to read response: {}", context, e)))?;

        if !status.is_success() {
            return Err(status_error(status, &body, context));
        }

        let envelope: CloudflareResponse<T> = serde_json::from_str(&body).map_err(|e| {
            Error::provider(PROVIDER, None, format!("{}: failed to parse response: {}", context, e))
        })?;

        if !envelope.success {
            return Err(envelope_error(&envelope.errors, context));
        }

        Ok(envelope)
    }
}

/// Map a non-2xx HTTP status to an error
fn status_error(status: StatusCode, body: &str, context: &str) -> Error {
    let first = serde_json::from_str::<CloudflareResponse<Value>>(body)
        .ok()
        .and_then(|envelope| envelope.errors.into_iter().next());
    let code = first.as_ref().map(|e| e.code);
    let detail = match first {
        Some(e) => e.message,
        None if body.trim().is_empty() => "Unable to read error response".to_string(),
        None => body.trim().to_string(),
    };

    match status.as_u16() {
        401 | 403 => Error::auth(format!(
            "{}: invalid API token or insufficient permissions. Status: {}",
            context, status
        )),
        429 => Error::rate_limited(format!(
            "{}: rate limit exceeded, retry later. Status: {}",
            context, status
        )),
        // Cloudflare server error - transient
        500..=599 => Error::provider(
            PROVIDER,
            code,
            format!("{}: server error (transient): {} - {}", context, status, detail),
        ),
        _ => Error::provider(
            PROVIDER,
            code,
            format!("{} failed: {} - {}", context, status, detail),
        ),
    }
}

/// Map a `success=false` envelope to an error
fn envelope_error(errors: &[ApiMessage], context: &str) -> Error {
    if errors.is_empty() {
        return Error::provider(PROVIDER, None, format!("{}: request was not successful", context));
    }

    let detail = errors
        .iter()
        .map(|e| format!("[{}] {}", e.code, e.message))
        .collect::<Vec<_>>()
        .join("; ");
    Error::provider(PROVIDER, Some(errors[0].code), format!("{}: {}", context, detail))
}

#[async_trait]
impl ProviderClient for CloudflareProvider {
    /// ```http
    /// GET /zones?name=example.com
    /// ```
    async fn find_zone(&self, candidate: &str) -> Result<Option<Zone>> {
        tracing::debug!("Looking up Cloudflare zone: {}", candidate);

        let request = self
            .client
            .get(format!("{}/zones", self.api_base))
            .query(&[("name", candidate)]);
        let envelope: CloudflareResponse<Vec<ZoneResult>> = self.send(request, "Zone lookup").await?;

        let zone = envelope
            .result
            .unwrap_or_default()
            .into_iter()
            .next()
            .map(|z| Zone::new(z.id, z.name));

        if let Some(zone) = &zone {
            tracing::debug!("Found zone ID: {}", zone.id);
        }
        Ok(zone)
    }

    /// ```http
    /// GET /zones/:zone_id/dns_records?type=TXT&name=...&page=N&per_page=100
    /// ```
    async fn list_txt_records(&self, zone_id: &str, name: &str) -> Result<Vec<TxtRecord>> {
        let url = format!("{}/zones/{}/dns_records", self.api_base, zone_id);
        let per_page = RECORDS_PER_PAGE.to_string();
        let mut records = Vec::new();
        let mut page = 1u32;

        loop {
            let page_param = page.to_string();
            let request = self.client.get(&url).query(&[
                ("type", "TXT"),
                ("name", name),
                ("page", page_param.as_str()),
                ("per_page", per_page.as_str()),
            ]);
            let envelope: CloudflareResponse<Vec<DnsRecordResult>> =
                self.send(request, "Record lookup").await?;

            let batch = envelope.result.unwrap_or_default();
            let fetched = batch.len();
            records.extend(batch.into_iter().map(|r| r.into_txt_record(name)));

            let total_pages = envelope.result_info.map(|info| info.total_pages.max(info.page));
            match total_pages {
                Some(total) if page < total && fetched > 0 => {}
                _ => break,
            }

            if page >= MAX_RECORD_PAGES {
                tracing::warn!(
                    "Stopping TXT record listing for {} after {} pages",
                    name,
                    MAX_RECORD_PAGES
                );
                break;
            }
            page += 1;
        }

        tracing::debug!("Listed {} TXT record(s) for {}", records.len(), name);
        Ok(records)
    }

    /// ```http
    /// POST /zones/:zone_id/dns_records
    /// { "type": "TXT", "name": "...", "content": "...", "ttl": 120 }
    /// ```
    async fn create_txt_record(
        &self,
        zone_id: &str,
        name: &str,
        content: &str,
        ttl: u32,
    ) -> Result<TxtRecord> {
        tracing::debug!("Creating TXT record {} (TTL: {}s)", name, ttl);

        let payload = serde_json::json!({
            "type": "TXT",
            "name": name,
            "content": content,
            "ttl": ttl,
        });
        let request = self
            .client
            .post(format!("{}/zones/{}/dns_records", self.api_base, zone_id))
            .json(&payload);
        let envelope: CloudflareResponse<DnsRecordResult> = self
            .send(request, "Record creation")
            .await
            .map_err(|e| e.into_add_failed(name))?;

        envelope
            .result
            .map(|r| {
                let mut record = r.into_txt_record(name);
                if record.content.is_empty() {
                    record.content = content.to_string();
                }
                record.ttl.get_or_insert(ttl);
                record
            })
            .ok_or_else(|| Error::add_failed(name, "Record creation returned no record"))
    }

    /// ```http
    /// DELETE /zones/:zone_id/dns_records/:record_id
    /// ```
    async fn delete_txt_record(&self, zone_id: &str, record_id: &str) -> Result<()> {
        tracing::debug!("Deleting TXT record {}", record_id);

        let request = self.client.delete(format!(
            "{}/zones/{}/dns_records/{}",
            self.api_base, zone_id, record_id
        ));
        // Only the record id is known here; callers fold the failure under the record name
        let context = format!("Record deletion ({})", record_id);
        let _: CloudflareResponse<Value> = self.send(request, &context).await?;
        Ok(())
    }

    fn provider_name(&self) -> &'static str {
        PROVIDER
    }
}

/// Factory for creating Cloudflare providers
pub struct CloudflareFactory;

impl ProviderClientFactory for CloudflareFactory {
    fn create(&self, config: &ProviderConfig) -> Result<Box<dyn ProviderClient>> {
        match config {
            ProviderConfig::Cloudflare {
                api_token,
                api_base,
                timeout_secs,
            } => {
                if api_token.is_empty() {
                    return Err(Error::config("Cloudflare API token is required"));
                }

                let timeout = timeout_secs
                    .map(Duration::from_secs)
                    .unwrap_or(DEFAULT_HTTP_TIMEOUT);
                let mut provider = CloudflareProvider::new(
                    Arc::new(StaticCredential::new(api_token.clone())),
                    timeout,
                )?;
                if let Some(base) = api_base {
                    provider = provider.with_base_url(base.clone());
                }

                Ok(Box::new(provider))
            }
            _ => Err(Error::config("Invalid config for Cloudflare provider")),
        }
    }
}

/// Register the Cloudflare provider with a registry
///
/// # Example
///
/// ```rust
/// use acme_dns_core::ProviderRegistry;
///
/// let registry = ProviderRegistry::with_builtin();
/// acme_dns_provider_cloudflare::register(&registry);
/// assert!(registry.has_provider("cloudflare"));
/// ```
pub fn register(registry: &acme_dns_core::ProviderRegistry) {
    registry.register_provider(PROVIDER, Box::new(CloudflareFactory));
}
