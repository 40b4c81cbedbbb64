//! Log-only provider client
//!
//! Every operation logs what it would do and succeeds without touching any
//! DNS data. Useful for dry runs and for exercising the request pipeline
//! without provider credentials.
//!
//! ## Behavior
//!
//! - `find_zone` reports a synthetic zone for every candidate, so
//!   resolution always stops at the first candidate
//! - `list_txt_records` is always empty, so every add "creates"
//! - ids are derived from the names involved, so repeated runs log
//!   stable values

use crate::config::ProviderConfig;
use crate::error::{Error, Result};
use crate::traits::{ProviderClient, ProviderClientFactory, TxtRecord, Zone};
use async_trait::async_trait;
use tracing::info;

/// No-op provider client
#[derive(Debug, Clone, Default)]
pub struct ManualProvider;

impl ManualProvider {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl ProviderClient for ManualProvider {
    async fn find_zone(&self, candidate: &str) -> Result<Option<Zone>> {
        info!("[MANUAL] Would look up zone {}", candidate);
        Ok(Some(Zone::new(format!("manual:{}", candidate), candidate)))
    }

    async fn list_txt_records(&self, zone_id: &str, name: &str) -> Result<Vec<TxtRecord>> {
        info!("[MANUAL] Would list TXT records for {} in zone {}", name, zone_id);
        Ok(Vec::new())
    }

    async fn create_txt_record(
        &self,
        zone_id: &str,
        name: &str,
        content: &str,
        ttl: u32,
    ) -> Result<TxtRecord> {
        info!(
            "[MANUAL] Would create TXT record {} in zone {} (TTL: {}s)",
            name, zone_id, ttl
        );
        Ok(TxtRecord {
            id: format!("manual:{}", name),
            name: name.to_string(),
            content: content.to_string(),
            ttl: Some(ttl),
        })
    }

    async fn delete_txt_record(&self, zone_id: &str, record_id: &str) -> Result<()> {
        info!("[MANUAL] Would delete record {} from zone {}", record_id, zone_id);
        Ok(())
    }

    fn provider_name(&self) -> &'static str {
        "manual"
    }
}

/// Factory for creating manual providers
pub struct ManualProviderFactory;

impl ProviderClientFactory for ManualProviderFactory {
    fn create(&self, config: &ProviderConfig) -> Result<Box<dyn ProviderClient>> {
        match config {
            ProviderConfig::Manual => {
                tracing::warn!("Manual provider selected - no DNS changes will be made");
                Ok(Box::new(ManualProvider::new()))
            }
            _ => Err(Error::config("Invalid config for manual provider")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_find_zone_is_synthetic() {
        let zone = ManualProvider::new()
            .find_zone("example.com")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(zone.name, "example.com");
        assert_eq!(zone.id, "manual:example.com");
    }

    #[tokio::test]
    async fn test_create_echoes_record() {
        let record = ManualProvider::new()
            .create_txt_record("z", "_acme-challenge.example.com", "tok", 60)
            .await
            .unwrap();
        assert_eq!(record.content, "tok");
        assert_eq!(record.ttl, Some(60));
    }

    #[test]
    fn test_delete_and_list_are_noops() {
        let provider = ManualProvider::new();
        tokio_test::assert_ok!(tokio_test::block_on(provider.delete_txt_record("z", "r")));
        let records = tokio_test::block_on(provider.list_txt_records("z", "a.b.c")).unwrap();
        assert!(records.is_empty());
    }

    #[test]
    fn test_factory_rejects_other_configs() {
        let config = ProviderConfig::Cloudflare {
            api_token: "t".to_string(),
            api_base: None,
            timeout_secs: None,
        };
        assert!(ManualProviderFactory.create(&config).is_err());
        assert!(ManualProviderFactory.create(&ProviderConfig::Manual).is_ok());
    }
}
