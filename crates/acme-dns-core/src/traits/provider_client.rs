// # Provider Client Trait
//
// Defines the interface for reading and mutating TXT records through a DNS
// provider's API.
//
// ## Implementations
//
// - Cloudflare: `acme-dns-provider-cloudflare` crate
// - Manual (log-only dry run): `acme_dns_core::provider::ManualProvider`
//
// ## Usage
//
// ```rust,ignore
// use acme_dns_core::ProviderClient;
//
// #[tokio::main]
// async fn main() -> anyhow::Result<()> {
//     let provider = /* ProviderClient implementation */;
//
//     if let Some(zone) = provider.find_zone("example.com").await? {
//         let records = provider
//             .list_txt_records(&zone.id, "_acme-challenge.example.com")
//             .await?;
//         println!("{} record(s)", records.len());
//     }
//
//     Ok(())
// }
// ```

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// A DNS zone as the provider reports it
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Zone {
    /// Provider-assigned zone identifier
    pub id: String,
    /// Apex name the provider considers this zone to own
    pub name: String,
}

impl Zone {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
        }
    }
}

/// A TXT record within a zone
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TxtRecord {
    /// Provider-assigned record identifier
    pub id: String,
    /// Fully-qualified record name
    pub name: String,
    /// Record content (the challenge token)
    pub content: String,
    /// Time-to-live, when the provider reports one
    pub ttl: Option<u32>,
}

/// Trait for DNS provider clients
///
/// Implementations translate each operation into calls against one
/// provider's API. Implementations must be thread-safe and usable across
/// async tasks.
///
/// # Responsibilities
///
/// - One API round trip per call (or a bounded page-following loop for
///   [`ProviderClient::list_txt_records`])
/// - No retry or backoff: failures are returned to the caller
/// - No caching of zones or records between calls
/// - Never log credentials
///
/// Deciding *which* records to touch is owned by
/// [`RecordReconciler`](crate::reconciler::RecordReconciler), not the client.
#[async_trait]
pub trait ProviderClient: Send + Sync {
    /// Look up a zone whose name equals `candidate` exactly
    ///
    /// # Returns
    ///
    /// - `Ok(Some(Zone))`: the first zone the provider reports for that name
    /// - `Ok(None)`: the provider has no such zone
    /// - `Err(Error)`: transport or authentication failure
    async fn find_zone(&self, candidate: &str) -> Result<Option<Zone>, crate::Error>;

    /// List every TXT record named `name` in the zone
    ///
    /// Provider pagination is followed until the provider reports no
    /// further pages.
    async fn list_txt_records(
        &self,
        zone_id: &str,
        name: &str,
    ) -> Result<Vec<TxtRecord>, crate::Error>;

    /// Create a TXT record
    ///
    /// Fails with [`Error::AddFailed`](crate::Error::AddFailed) when the
    /// provider rejects the record.
    async fn create_txt_record(
        &self,
        zone_id: &str,
        name: &str,
        content: &str,
        ttl: u32,
    ) -> Result<TxtRecord, crate::Error>;

    /// Delete a record by id
    ///
    /// Fails with [`Error::RemoveFailed`](crate::Error::RemoveFailed) when
    /// the provider rejects the deletion.
    async fn delete_txt_record(&self, zone_id: &str, record_id: &str)
    -> Result<(), crate::Error>;

    /// Get the provider name (for logging/debugging)
    fn provider_name(&self) -> &'static str;
}

/// Helper trait for constructing provider clients from configuration
pub trait ProviderClientFactory: Send + Sync {
    /// Create a ProviderClient instance from configuration
    fn create(
        &self,
        config: &crate::config::ProviderConfig,
    ) -> Result<Box<dyn ProviderClient>, crate::Error>;
}
