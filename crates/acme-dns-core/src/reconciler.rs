//! TXT record reconciliation
//!
//! The reconciler makes the provider's record set agree with one
//! (name, value) pair, touching as few records as possible:
//!
//! - **add**: reuse a record whose content equals the value, otherwise
//!   create one. Repeating an add never creates a duplicate.
//! - **remove**: delete only records whose content equals the value.
//!   Records at the same name with other content belong to concurrent
//!   challenges and are left alone. Removing an absent value succeeds.
//!
//! Content is compared byte-for-byte. Challenge tokens are case-sensitive
//! opaque strings, so no trimming or case folding is applied.

use crate::error::Result;
use crate::traits::{ProviderClient, TxtRecord, Zone};
use std::collections::HashSet;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Outcome of a post-add verification pass
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RecordDiagnostics {
    /// Records the provider reports at the name
    pub records: Vec<TxtRecord>,
    /// Human-readable problems found
    pub issues: Vec<String>,
}

impl RecordDiagnostics {
    pub fn is_clean(&self) -> bool {
        self.issues.is_empty()
    }
}

/// Idempotent add/remove of TXT records within a resolved zone
pub struct RecordReconciler {
    provider: Arc<dyn ProviderClient>,
}

impl RecordReconciler {
    pub fn new(provider: Arc<dyn ProviderClient>) -> Self {
        Self { provider }
    }

    /// Ensure a TXT record `name` with content `value` exists
    ///
    /// # Returns
    ///
    /// The existing matching record, or the newly created one.
    ///
    /// # Errors
    ///
    /// [`Error::AddFailed`](crate::Error::AddFailed) for any listing or
    /// creation failure.
    pub async fn add_record(
        &self,
        zone: &Zone,
        name: &str,
        value: &str,
        ttl: u32,
    ) -> Result<TxtRecord> {
        let existing = self
            .provider
            .list_txt_records(&zone.id, name)
            .await
            .map_err(|e| e.into_add_failed(name))?;

        debug!("Found {} existing TXT record(s) for {}", existing.len(), name);

        if let Some(record) = existing.into_iter().find(|r| r.content == value) {
            info!("Reusing existing TXT record {} for {}", record.id, name);
            return Ok(record);
        }

        info!(
            "Creating TXT record {} in zone {} (TTL: {}s)",
            name, zone.name, ttl
        );
        let record = self
            .provider
            .create_txt_record(&zone.id, name, value, ttl)
            .await
            .map_err(|e| e.into_add_failed(name))?;

        info!("Created TXT record {} for {}", record.id, name);
        Ok(record)
    }

    /// Ensure no TXT record `name` with content `value` exists
    ///
    /// # Returns
    ///
    /// Ids of the deleted records, empty when nothing matched.
    ///
    /// # Errors
    ///
    /// [`Error::RemoveFailed`](crate::Error::RemoveFailed) for any listing
    /// or deletion failure. Deletion stops at the first failure.
    pub async fn remove_record(&self, zone: &Zone, name: &str, value: &str) -> Result<Vec<String>> {
        let existing = self
            .provider
            .list_txt_records(&zone.id, name)
            .await
            .map_err(|e| e.into_remove_failed(name))?;

        let targets: Vec<TxtRecord> = existing.into_iter().filter(|r| r.content == value).collect();

        if targets.is_empty() {
            info!("No TXT record for {} holds the value, nothing to remove", name);
            return Ok(Vec::new());
        }

        let mut removed = Vec::with_capacity(targets.len());
        for record in targets {
            info!("Removing TXT record {} from {}", record.id, name);
            self.provider
                .delete_txt_record(&zone.id, &record.id)
                .await
                .map_err(|e| e.into_remove_failed(name))?;
            removed.push(record.id);
        }

        Ok(removed)
    }

    /// Re-read the records at `name` and report inconsistencies
    ///
    /// Diagnostic only. Listing failures are reported as an issue rather
    /// than an error.
    pub async fn verify_record(&self, zone: &Zone, name: &str, value: &str) -> RecordDiagnostics {
        let records = match self.provider.list_txt_records(&zone.id, name).await {
            Ok(records) => records,
            Err(e) => {
                return RecordDiagnostics {
                    records: Vec::new(),
                    issues: vec![format!("Record verification failed: {}", e)],
                };
            }
        };

        let mut issues = Vec::new();
        if records.is_empty() {
            issues.push(format!("No TXT records found for {}", name));
        } else if !records.iter().any(|r| r.content == value) {
            issues.push("Expected value not found in provider records".to_string());
        }

        let distinct: HashSet<&str> = records.iter().map(|r| r.content.as_str()).collect();
        if distinct.len() > 1 {
            issues.push(format!(
                "Multiple conflicting TXT records found: {} distinct values",
                distinct.len()
            ));
        }

        for issue in &issues {
            warn!("Verification of {}: {}", name, issue);
        }

        RecordDiagnostics { records, issues }
    }
}
