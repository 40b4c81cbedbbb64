//! Provider registry
//!
//! The registry maps provider type names to factories, so the daemon picks
//! a provider client from configuration once at startup without hardcoded
//! if-else chains.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use acme_dns_core::registry::ProviderRegistry;
//! use acme_dns_core::config::ProviderConfig;
//!
//! // Built-in "manual" provider is pre-registered
//! let registry = ProviderRegistry::with_builtin();
//!
//! // Provider crates add themselves
//! acme_dns_provider_cloudflare::register(&registry);
//!
//! let provider = registry.create_provider(&ProviderConfig::Manual)?;
//! ```

use crate::config::ProviderConfig;
use crate::error::{Error, Result};
use crate::provider::ManualProviderFactory;
use crate::traits::{ProviderClient, ProviderClientFactory};
use std::collections::HashMap;
use std::sync::RwLock;

/// Registry of provider client factories
///
/// ## Thread Safety
///
/// The registry uses interior mutability with RwLock, allowing concurrent
/// reads and exclusive writes.
#[derive(Default)]
pub struct ProviderRegistry {
    /// Registered provider factories
    providers: RwLock<HashMap<String, Box<dyn ProviderClientFactory>>>,
}

impl ProviderRegistry {
    /// Create a new empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a registry with the built-in providers registered
    pub fn with_builtin() -> Self {
        let registry = Self::new();
        registry.register_provider("manual", Box::new(ManualProviderFactory));
        registry
    }

    /// Register a provider factory
    ///
    /// Registering an existing name replaces the previous factory.
    ///
    /// # Parameters
    ///
    /// - `name`: Provider type name (e.g., "cloudflare", "manual")
    /// - `factory`: Factory object for creating provider instances
    pub fn register_provider(&self, name: impl Into<String>, factory: Box<dyn ProviderClientFactory>) {
        let name = name.into();
        let mut providers = self.providers.write().unwrap_or_else(|e| e.into_inner());
        providers.insert(name, factory);
    }

    /// Create a provider client from configuration
    ///
    /// # Returns
    ///
    /// - `Ok(Box<dyn ProviderClient>)`: Created provider instance
    /// - `Err(Error)`: If the provider type is not registered or creation fails
    pub fn create_provider(&self, config: &ProviderConfig) -> Result<Box<dyn ProviderClient>> {
        let provider_type = config.type_name();
        let providers = self.providers.read().unwrap_or_else(|e| e.into_inner());

        let factory = providers
            .get(provider_type)
            .ok_or_else(|| Error::config(format!("Unknown provider type: {}", provider_type)))?;

        factory.create(config)
    }

    /// List all registered provider types
    pub fn list_providers(&self) -> Vec<String> {
        let providers = self.providers.read().unwrap_or_else(|e| e.into_inner());
        let mut names: Vec<String> = providers.keys().cloned().collect();
        names.sort();
        names
    }

    /// Check if a provider type is registered
    pub fn has_provider(&self, name: &str) -> bool {
        let providers = self.providers.read().unwrap_or_else(|e| e.into_inner());
        providers.contains_key(name)
    }
}
