//! Provider registry for lookup by key.
//!
//! The registry maintains a collection of configured identity providers and
//! supports lookup by key or alias, plus auto-configuration from environment
//! variables (see [`crate::from_env`]).

use crate::provider::BoxedProvider;
use idlink_core::{LinkError, Result};
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;

/// Registry for looking up providers by key.
#[derive(Debug, Default)]
pub struct ProviderRegistry {
    providers: RwLock<HashMap<String, BoxedProvider>>,
}

impl ProviderRegistry {
    /// Create a new empty registry.
    pub fn new() -> Self {
        Self {
            providers: RwLock::new(HashMap::new()),
        }
    }

    /// Register a provider under its key and aliases.
    pub fn register(&self, provider: BoxedProvider) {
        let mut providers = self.providers.write();
        let key = provider.key().to_string();

        providers.insert(key, Arc::clone(&provider));

        for alias in provider.aliases() {
            providers.insert((*alias).to_string(), Arc::clone(&provider));
        }
    }

    /// Get a provider by key.
    pub fn get(&self, key: &str) -> Option<BoxedProvider> {
        let providers = self.providers.read();
        providers.get(key).cloned()
    }

    /// Get a provider by key, failing if it is unknown or unconfigured.
    pub fn require(&self, key: &str) -> Result<BoxedProvider> {
        let provider = self
            .get(key)
            .ok_or_else(|| LinkError::config(format!("unknown identity provider: {}", key)))?;
        if !provider.is_configured() {
            return Err(LinkError::config(format!(
                "identity provider not configured: {}",
                key
            )));
        }
        Ok(provider)
    }

    /// List all registered keys, aliases included.
    pub fn list(&self) -> Vec<String> {
        let providers = self.providers.read();
        let mut keys: Vec<String> = providers.keys().cloned().collect();
        keys.sort();
        keys
    }
}

/// Global default registry.
static GLOBAL_REGISTRY: std::sync::OnceLock<ProviderRegistry> = std::sync::OnceLock::new();

/// Get the global provider registry.
pub fn global_registry() -> &'static ProviderRegistry {
    GLOBAL_REGISTRY.get_or_init(ProviderRegistry::new)
}
