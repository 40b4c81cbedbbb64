//! DNS propagation diagnostics
//!
//! After a challenge record is created, the bridge can optionally resolve
//! the TXT name through several resolvers and report whether the value is
//! visible yet. The result is logged only; acknowledgments never depend on
//! it.

use crate::error::{Error, Result};
use async_trait::async_trait;
use hickory_resolver::config::{NameServerConfig, ResolverConfig, ResolverOpts};
use hickory_resolver::name_server::TokioConnectionProvider;
use hickory_resolver::proto::xfer::Protocol;
use hickory_resolver::{Resolver, TokioResolver};
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Delay before resolving, giving the provider time to publish
pub const DEFAULT_SETTLE_DELAY: Duration = Duration::from_secs(2);

/// Resolves the TXT values published at a name
#[async_trait]
pub trait TxtLookup: Send + Sync {
    /// All TXT values at `name`, with multi-string records joined
    async fn lookup_txt(&self, name: &str) -> Result<Vec<String>>;
}

/// [`TxtLookup`] backed by a hickory resolver
pub struct HickoryTxtLookup {
    resolver: TokioResolver,
}

impl HickoryTxtLookup {
    /// Query a single nameserver over UDP
    pub fn nameserver(ip: IpAddr) -> Self {
        let mut config = ResolverConfig::new();
        config.add_name_server(NameServerConfig::new(SocketAddr::new(ip, 53), Protocol::Udp));

        let resolver = Resolver::builder_with_config(config, TokioConnectionProvider::default())
            .with_options(uncached_options())
            .build();
        Self { resolver }
    }

    /// Use the host's resolver configuration
    pub fn system() -> Result<Self> {
        let resolver = TokioResolver::builder_tokio()
            .map_err(|e| Error::config(format!("Failed to read system resolver configuration: {}", e)))?
            .with_options(uncached_options())
            .build();
        Ok(Self { resolver })
    }
}

fn uncached_options() -> ResolverOpts {
    let mut opts = ResolverOpts::default();
    opts.timeout = Duration::from_secs(5);
    opts.attempts = 2;
    // A cached negative answer would hide a freshly created record
    opts.cache_size = 0;
    opts
}

#[async_trait]
impl TxtLookup for HickoryTxtLookup {
    async fn lookup_txt(&self, name: &str) -> Result<Vec<String>> {
        let lookup = self
            .resolver
            .txt_lookup(name)
            .await
            .map_err(|e| Error::transport("dns", format!("TXT lookup for {} failed: {}", name, e)))?;

        Ok(lookup
            .iter()
            .map(|txt| {
                txt.txt_data()
                    .iter()
                    .map(|data| String::from_utf8_lossy(data))
                    .collect::<String>()
            })
            .collect())
    }
}

/// What one resolver returned
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerResolution {
    /// Resolver label, e.g. `Cloudflare (1.1.1.1)`
    pub server: String,
    /// Values resolved, or the lookup error
    pub outcome: std::result::Result<Vec<String>, String>,
    /// Whether the expected value was among the resolved values
    pub has_expected: bool,
}

/// Outcome of a propagation check
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PropagationReport {
    pub resolutions: Vec<ServerResolution>,
    pub issues: Vec<String>,
}

impl PropagationReport {
    pub fn is_clean(&self) -> bool {
        self.issues.is_empty()
    }
}

/// Resolves a challenge name through a fixed set of resolvers
pub struct PropagationChecker {
    servers: Vec<(String, Arc<dyn TxtLookup>)>,
    settle_delay: Duration,
}

impl PropagationChecker {
    /// A checker without resolvers
    pub fn new(settle_delay: Duration) -> Self {
        Self {
            servers: Vec::new(),
            settle_delay,
        }
    }

    /// Cloudflare (1.1.1.1), Google (8.8.8.8) and the system resolver
    pub fn public_resolvers(settle_delay: Duration) -> Result<Self> {
        let checker = Self::new(settle_delay)
            .with_server(
                "Cloudflare (1.1.1.1)",
                Arc::new(HickoryTxtLookup::nameserver(IpAddr::V4(Ipv4Addr::new(1, 1, 1, 1)))),
            )
            .with_server(
                "Google (8.8.8.8)",
                Arc::new(HickoryTxtLookup::nameserver(IpAddr::V4(Ipv4Addr::new(8, 8, 8, 8)))),
            )
            .with_server("System", Arc::new(HickoryTxtLookup::system()?));
        Ok(checker)
    }

    /// Add a resolver under `label`
    pub fn with_server(mut self, label: impl Into<String>, lookup: Arc<dyn TxtLookup>) -> Self {
        self.servers.push((label.into(), lookup));
        self
    }

    pub fn settle_delay(&self) -> Duration {
        self.settle_delay
    }

    /// Wait for the settle delay, then resolve `name` through every resolver
    pub async fn check(&self, name: &str, expected: &str) -> PropagationReport {
        if self.servers.is_empty() {
            return PropagationReport::default();
        }

        if !self.settle_delay.is_zero() {
            debug!("Waiting {:?} before resolving {}", self.settle_delay, name);
            tokio::time::sleep(self.settle_delay).await;
        }

        let mut resolutions = Vec::with_capacity(self.servers.len());
        for (server, lookup) in &self.servers {
            let resolution = match lookup.lookup_txt(name).await {
                Ok(values) => {
                    let has_expected = values.iter().any(|v| v == expected);
                    if has_expected {
                        info!("{} DNS: found challenge value", server);
                    } else {
                        info!("{} DNS: challenge value missing", server);
                    }
                    ServerResolution {
                        server: server.clone(),
                        outcome: Ok(values),
                        has_expected,
                    }
                }
                Err(e) => {
                    warn!("{} DNS: resolution failed - {}", server, e);
                    ServerResolution {
                        server: server.clone(),
                        outcome: Err(e.to_string()),
                        has_expected: false,
                    }
                }
            };
            resolutions.push(resolution);
        }

        let resolved = resolutions.iter().filter(|r| r.outcome.is_ok()).count();
        let with_expected = resolutions.iter().filter(|r| r.has_expected).count();

        let mut issues = Vec::new();
        if with_expected == 0 {
            issues.push("Challenge value not resolved by any tested DNS server".to_string());
        } else if with_expected < resolved {
            issues.push("Challenge value not consistently resolved across DNS servers".to_string());
        }

        for issue in &issues {
            warn!("Propagation of {}: {}", name, issue);
        }

        PropagationReport {
            resolutions,
            issues,
        }
    }
}
