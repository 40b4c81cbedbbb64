//! Configuration types for the ACME DNS bridge
//!
//! This module defines all configuration structures used throughout the crate.

use serde::{Deserialize, Serialize};

/// Main bridge configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BridgeConfig {
    /// DNS provider configuration
    pub provider: ProviderConfig,

    /// Request dispatcher settings
    #[serde(default)]
    pub dispatcher: DispatcherConfig,
}

impl BridgeConfig {
    /// Create a new configuration with defaults
    pub fn new(provider: ProviderConfig) -> Self {
        Self {
            provider,
            dispatcher: DispatcherConfig::default(),
        }
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), crate::Error> {
        self.provider.validate()?;
        self.dispatcher.validate()?;
        Ok(())
    }
}

/// DNS provider configuration
#[derive(Clone, Default, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ProviderConfig {
    /// Cloudflare provider
    Cloudflare {
        /// Cloudflare API token
        api_token: String,
        /// API base URL (defaults to the public v4 endpoint)
        #[serde(default)]
        api_base: Option<String>,
        /// Per-call HTTP timeout in seconds
        #[serde(default)]
        timeout_secs: Option<u64>,
    },

    /// No-op provider that only logs what it would do
    #[default]
    Manual,
}

// Hides the API token
impl std::fmt::Debug for ProviderConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ProviderConfig::Cloudflare {
                api_base,
                timeout_secs,
                ..
            } => f
                .debug_struct("Cloudflare")
                .field("api_token", &"<REDACTED>")
                .field("api_base", api_base)
                .field("timeout_secs", timeout_secs)
                .finish(),
            ProviderConfig::Manual => f.write_str("Manual"),
        }
    }
}

impl ProviderConfig {
    /// Validate the provider configuration
    pub fn validate(&self) -> Result<(), crate::Error> {
        match self {
            ProviderConfig::Cloudflare {
                api_token,
                api_base,
                timeout_secs,
            } => {
                if api_token.is_empty() {
                    return Err(crate::Error::config("Cloudflare API token cannot be empty"));
                }
                if let Some(base) = api_base
                    && !base.starts_with("https://")
                    && !base.starts_with("http://")
                {
                    return Err(crate::Error::config(format!(
                        "Cloudflare API base must be an HTTP(S) URL. Got: {}",
                        base
                    )));
                }
                if *timeout_secs == Some(0) {
                    return Err(crate::Error::config("Cloudflare HTTP timeout must be > 0"));
                }
                Ok(())
            }
            ProviderConfig::Manual => Ok(()),
        }
    }

    /// Get the provider type name
    pub fn type_name(&self) -> &str {
        match self {
            ProviderConfig::Cloudflare { .. } => "cloudflare",
            ProviderConfig::Manual => "manual",
        }
    }
}

/// Request dispatcher configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DispatcherConfig {
    /// TTL applied when a request carries none
    #[serde(default = "default_ttl")]
    pub default_ttl: u32,

    /// Domains this instance is responsible for
    ///
    /// Empty means this instance handles every request.
    #[serde(default)]
    pub managed_domains: Vec<String>,

    /// After a successful add, re-read records and resolve the name, logging inconsistencies
    #[serde(default)]
    pub verify_records: bool,

    /// Capacity of the monitoring event channel
    ///
    /// When full, new events are dropped (with a warning log).
    #[serde(default = "default_event_channel_capacity")]
    pub event_channel_capacity: usize,
}

impl DispatcherConfig {
    /// Validate the dispatcher configuration
    pub fn validate(&self) -> Result<(), crate::Error> {
        if self.default_ttl == 0 {
            return Err(crate::Error::config("Default TTL must be > 0"));
        }
        if self.event_channel_capacity == 0 {
            return Err(crate::Error::config("Event channel capacity must be > 0"));
        }
        if self.managed_domains.iter().any(|d| d.trim().is_empty()) {
            return Err(crate::Error::config("Managed domains cannot contain empty entries"));
        }
        Ok(())
    }

    /// Set the managed domains
    pub fn with_managed_domains<I, S>(mut self, domains: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.managed_domains = domains.into_iter().map(Into::into).collect();
        self
    }

    /// Set the default TTL
    pub fn with_default_ttl(mut self, ttl: u32) -> Self {
        self.default_ttl = ttl;
        self
    }
}

impl Default for DispatcherConfig {
    fn default() -> Self {
        Self {
            default_ttl: default_ttl(),
            managed_domains: Vec::new(),
            verify_records: false,
            event_channel_capacity: default_event_channel_capacity(),
        }
    }
}

fn default_ttl() -> u32 {
    120
}

fn default_event_channel_capacity() -> usize {
    1000
}
