//! Zone resolution
//!
//! Finds the provider zone that owns a challenge record name by probing
//! progressively shorter suffixes of the name. No public-suffix list is
//! consulted: the provider only reports zones the account owns, so the
//! first suffix it recognises is taken as the zone apex. Multi-label
//! registrable domains such as `example.co.uk` work without special cases.
//!
//! ```text
//! _acme-challenge.www.example.co.uk
//!                 www.example.co.uk   (probe 1)
//!                     example.co.uk   (probe 2)
//!                             co.uk   (probe 3)
//! ```
//!
//! The leftmost label is never probed on its own: for a challenge name it
//! is always `_acme-challenge` or a host label, never a zone apex.

use crate::error::{Error, Result};
use crate::traits::{ProviderClient, Zone};
use std::sync::Arc;
use tracing::{debug, warn};

/// Candidate zone names for `fqdn`, longest first
///
/// Drops the first label, then one more label per candidate, stopping
/// before the bare top-level label. A trailing root dot is ignored.
pub fn candidate_zones(fqdn: &str) -> Vec<String> {
    let labels: Vec<&str> = fqdn.trim().trim_end_matches('.').split('.').collect();
    if labels.len() < 3 {
        return Vec::new();
    }

    (1..labels.len() - 1)
        .map(|i| labels[i..].join("."))
        .collect()
}

/// Resolves record names to provider zones
///
/// Stateless: every call queries the provider afresh.
pub struct ZoneResolver {
    provider: Arc<dyn ProviderClient>,
}

impl ZoneResolver {
    pub fn new(provider: Arc<dyn ProviderClient>) -> Self {
        Self { provider }
    }

    /// Find the zone that owns `fqdn`
    ///
    /// A lookup that fails at the transport level is treated like an empty
    /// answer and the next candidate is tried.
    ///
    /// # Errors
    ///
    /// [`Error::ZoneNotFound`] carrying `fqdn` when no candidate matches.
    pub async fn resolve_zone(&self, fqdn: &str) -> Result<Zone> {
        for candidate in candidate_zones(fqdn) {
            debug!("Probing {} zone: {}", self.provider.provider_name(), candidate);

            match self.provider.find_zone(&candidate).await {
                Ok(Some(zone)) => {
                    debug!("Resolved {} to zone {} ({})", fqdn, zone.name, zone.id);
                    return Ok(zone);
                }
                Ok(None) => continue,
                Err(e) => {
                    warn!("Zone lookup for {} failed, trying next candidate: {}", candidate, e);
                    continue;
                }
            }
        }

        Err(Error::zone_not_found(fqdn))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_candidates_skip_first_label_and_tld() {
        assert_eq!(
            candidate_zones("_acme-challenge.www.example.co.uk"),
            vec!["www.example.co.uk", "example.co.uk", "co.uk"]
        );
    }

    #[test]
    fn test_candidates_simple_name() {
        assert_eq!(
            candidate_zones("_acme-challenge.example.com"),
            vec!["example.com"]
        );
    }

    #[test]
    fn test_candidates_trailing_dot() {
        assert_eq!(
            candidate_zones("_acme-challenge.example.com."),
            vec!["example.com"]
        );
    }

    #[test]
    fn test_candidates_too_short() {
        assert!(candidate_zones("example.com").is_empty());
        assert!(candidate_zones("localhost").is_empty());
        assert!(candidate_zones("").is_empty());
    }
}
