//! Circuit breaker registry for managing one breaker per resource key

use dashmap::DashMap;
use std::sync::Arc;

use super::breaker::CircuitBreaker;
use super::types::{BreakerConfig, BreakerStats};
use crate::settings::RegistrySettings;

/// Collection of circuit breakers keyed by resource
///
/// Keys are never removed. The config a breaker is created with is fixed for
/// its lifetime: passing a different config for an existing key has no effect.
pub struct CircuitBreakerRegistry {
    breakers: DashMap<String, Arc<CircuitBreaker>>,
    settings: RegistrySettings,
}

impl CircuitBreakerRegistry {
    /// Create a new registry with default config
    pub fn new() -> Self {
        Self::from_settings(RegistrySettings::default())
    }

    /// Create a registry with custom default config
    pub fn with_config(config: BreakerConfig) -> Self {
        Self::from_settings(RegistrySettings {
            defaults: config,
            ..RegistrySettings::default()
        })
    }

    /// Create a registry whose breakers take per-key configs from settings
    pub fn from_settings(settings: RegistrySettings) -> Self {
        Self {
            breakers: DashMap::new(),
            settings,
        }
    }

    /// Get or create the circuit breaker for a key.
    ///
    /// `config` only matters on first access; without one the settings entry
    /// for the key, or the registry default, is used.
    pub fn get_or_create(&self, key: &str, config: Option<BreakerConfig>) -> Arc<CircuitBreaker> {
        if let Some(existing) = self.breakers.get(key) {
            return Arc::clone(existing.value());
        }

        self.breakers
            .entry(key.to_string())
            .or_insert_with(|| {
                let config = config.unwrap_or_else(|| self.settings.config_for(key).clone());
                tracing::debug!(circuit = %key, ?config, "Creating circuit breaker");
                Arc::new(CircuitBreaker::with_config(key, config))
            })
            .clone()
    }

    /// Get or create with the configured default for the key
    pub fn get(&self, key: &str) -> Arc<CircuitBreaker> {
        self.get_or_create(key, None)
    }

    /// Look up an existing breaker without creating one
    pub fn lookup(&self, key: &str) -> Option<Arc<CircuitBreaker>> {
        self.breakers.get(key).map(|entry| Arc::clone(entry.value()))
    }

    /// Get all registered keys, sorted
    pub fn keys(&self) -> Vec<String> {
        let mut keys: Vec<String> = self.breakers.iter().map(|e| e.key().clone()).collect();
        keys.sort();
        keys
    }

    pub fn len(&self) -> usize {
        self.breakers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.breakers.is_empty()
    }

    pub fn settings(&self) -> &RegistrySettings {
        &self.settings
    }

    /// Get stats for all circuit breakers, sorted by key
    pub fn all_stats(&self) -> Vec<BreakerStats> {
        let mut stats: Vec<BreakerStats> = self.breakers.iter().map(|e| e.value().stats()).collect();
        stats.sort_by(|a, b| a.key.cmp(&b.key));
        stats
    }

    /// Reset all circuit breakers
    pub fn reset_all(&self) {
        for entry in self.breakers.iter() {
            entry.value().reset();
        }
    }
}

impl Default for CircuitBreakerRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for CircuitBreakerRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CircuitBreakerRegistry")
            .field("keys", &self.keys())
            .finish()
    }
}
