//! Registry settings types

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::PathBuf;
use std::time::Duration;

use crate::circuit_breaker::BreakerConfig;
use crate::error::FuseboxResult;

/// Source of settings data
#[derive(Debug, Clone)]
pub enum SettingsSource {
    /// Settings from a TOML, JSON or YAML file
    File(PathBuf),
    /// `FUSEBOX_*` environment variables
    Environment,
    /// Built-in defaults; the base every load starts from
    Default,
}

/// Breaker settings for a whole registry
///
/// ```toml
/// [defaults]
/// failure_threshold = 5
/// reset_timeout = "30s"
///
/// [breakers.payments-api]
/// failure_threshold = 3
/// half_open_max_probes = 1
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RegistrySettings {
    /// Config for keys without their own entry
    pub defaults: BreakerConfig,
    /// Per-key configs
    pub breakers: HashMap<String, BreakerConfig>,
}

impl RegistrySettings {
    /// Config a new breaker for `key` should be created with
    pub fn config_for(&self, key: &str) -> &BreakerConfig {
        self.breakers.get(key).unwrap_or(&self.defaults)
    }

    /// Add or replace the config for a key
    pub fn with_breaker(mut self, key: impl Into<String>, config: BreakerConfig) -> Self {
        self.breakers.insert(key.into(), config);
        self
    }

    /// Merge a later settings file (file takes precedence)
    ///
    /// Only the fields the file actually sets are overridden. A key seen for
    /// the first time starts from the built-in defaults.
    pub fn merge(&mut self, file: SettingsFile) {
        if let Some(defaults) = file.defaults {
            defaults.apply_to(&mut self.defaults);
        }

        for (key, patch) in file.breakers {
            let config = self.breakers.entry(key).or_default();
            patch.apply_to(config);
        }
    }

    /// Validate the defaults and every per-key config
    pub fn validate(&self) -> FuseboxResult<()> {
        self.defaults
            .validate()
            .map_err(|e| e.in_context("validating [defaults]"))?;

        for (key, config) in &self.breakers {
            config
                .validate()
                .map_err(|e| e.in_context(format!("validating [breakers.{}]", key)))?;
        }
        Ok(())
    }
}

/// Breaker config fields as written in a settings file
///
/// Unlike [`BreakerConfig`], a missing field stays `None` so that merging
/// leaves the earlier value alone.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct BreakerConfigPatch {
    pub failure_threshold: Option<u32>,
    pub success_threshold: Option<u32>,
    #[serde(with = "humantime_serde")]
    pub reset_timeout: Option<Duration>,
    pub half_open_max_probes: Option<u32>,
}

impl BreakerConfigPatch {
    /// Overwrite the fields of `config` this patch sets
    pub fn apply_to(self, config: &mut BreakerConfig) {
        if let Some(threshold) = self.failure_threshold {
            config.failure_threshold = threshold;
        }
        if let Some(threshold) = self.success_threshold {
            config.success_threshold = threshold;
        }
        if let Some(timeout) = self.reset_timeout {
            config.reset_timeout = timeout;
        }
        if self.half_open_max_probes.is_some() {
            config.half_open_max_probes = self.half_open_max_probes;
        }
    }
}

/// Contents of one settings file before it is merged
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct SettingsFile {
    /// `[defaults]`, if the file has the table
    pub defaults: Option<BreakerConfigPatch>,
    pub breakers: HashMap<String, BreakerConfigPatch>,
}
