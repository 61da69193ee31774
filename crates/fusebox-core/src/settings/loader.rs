//! Settings loading from files and environment

use std::fs;
use std::path::Path;

use humantime_serde::re::humantime;

use super::types::{RegistrySettings, SettingsFile, SettingsSource};
use crate::circuit_breaker::BreakerConfig;
use crate::error::{FuseboxError, FuseboxResult};

pub const ENV_FAILURE_THRESHOLD: &str = "FUSEBOX_FAILURE_THRESHOLD";
pub const ENV_SUCCESS_THRESHOLD: &str = "FUSEBOX_SUCCESS_THRESHOLD";
pub const ENV_RESET_TIMEOUT: &str = "FUSEBOX_RESET_TIMEOUT";
pub const ENV_HALF_OPEN_MAX_PROBES: &str = "FUSEBOX_HALF_OPEN_MAX_PROBES";

/// Settings loader with support for multiple sources
///
/// Sources apply in the order they were added; later sources override
/// earlier ones.
#[derive(Debug, Default)]
pub struct SettingsLoader {
    sources: Vec<SettingsSource>,
}

impl SettingsLoader {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a settings source
    pub fn add_source(mut self, source: SettingsSource) -> Self {
        self.sources.push(source);
        self
    }

    /// Add a file source
    pub fn with_file<P: AsRef<Path>>(self, path: P) -> Self {
        self.add_source(SettingsSource::File(path.as_ref().to_path_buf()))
    }

    /// Add environment variables source
    pub fn with_env(self) -> Self {
        self.add_source(SettingsSource::Environment)
    }

    /// Add default settings source
    pub fn with_defaults(self) -> Self {
        self.add_source(SettingsSource::Default)
    }

    /// Load settings from all sources and validate the result
    pub fn load(self) -> FuseboxResult<RegistrySettings> {
        let mut settings = RegistrySettings::default();

        for source in &self.sources {
            match source {
                SettingsSource::File(path) => {
                    tracing::debug!("Loading breaker settings from file: {}", path.display());
                    settings.merge(read_settings_file(path)?);
                }
                SettingsSource::Environment => {
                    tracing::debug!("Loading breaker settings from environment");
                    apply_env_overrides(&mut settings.defaults, |name| std::env::var(name).ok())?;
                }
                SettingsSource::Default => {
                    // Loading already starts from the built-in defaults
                    tracing::debug!("Using built-in breaker defaults as base");
                }
            }
        }

        settings.validate()?;
        Ok(settings)
    }
}

/// Load settings from a file
///
/// Supports JSON, TOML, and YAML formats based on file extension. Fields the
/// file omits take the built-in defaults.
/// Returns default settings if the file doesn't exist.
pub fn load_from_file(path: &Path) -> FuseboxResult<RegistrySettings> {
    let mut settings = RegistrySettings::default();
    settings.merge(read_settings_file(path)?);
    Ok(settings)
}

/// Read a settings file without filling in defaults
///
/// A missing file reads as empty.
pub fn read_settings_file(path: &Path) -> FuseboxResult<SettingsFile> {
    if !path.exists() {
        tracing::debug!("Settings file {} not found, skipping", path.display());
        return Ok(SettingsFile::default());
    }

    let content = fs::read_to_string(path).map_err(|e| FuseboxError::io(&e, path))?;

    match path.extension().and_then(|s| s.to_str()) {
        Some("toml") => toml::from_str(&content).map_err(|e| FuseboxError::parse("TOML", e)),
        Some("yaml") | Some("yml") => {
            serde_yaml::from_str(&content).map_err(|e| FuseboxError::parse("YAML", e))
        }
        _ => serde_json::from_str(&content).map_err(|e| FuseboxError::parse("JSON", e)),
    }
}

/// Override default breaker config fields from environment variables.
///
/// `lookup` resolves a variable name to its value; unset variables leave the
/// field untouched.
pub fn apply_env_overrides<F>(defaults: &mut BreakerConfig, lookup: F) -> FuseboxResult<()>
where
    F: Fn(&str) -> Option<String>,
{
    if let Some(value) = lookup(ENV_FAILURE_THRESHOLD) {
        defaults.failure_threshold = parse_u32(ENV_FAILURE_THRESHOLD, &value)?;
    }

    if let Some(value) = lookup(ENV_SUCCESS_THRESHOLD) {
        defaults.success_threshold = parse_u32(ENV_SUCCESS_THRESHOLD, &value)?;
    }

    if let Some(value) = lookup(ENV_RESET_TIMEOUT) {
        defaults.reset_timeout = humantime::parse_duration(value.trim()).map_err(|e| {
            FuseboxError::config(format!("Invalid {} value '{}': {}", ENV_RESET_TIMEOUT, value, e))
        })?;
    }

    if let Some(value) = lookup(ENV_HALF_OPEN_MAX_PROBES) {
        defaults.half_open_max_probes = match value.trim() {
            "" | "none" | "unlimited" => None,
            other => Some(parse_u32(ENV_HALF_OPEN_MAX_PROBES, other)?),
        };
    }

    Ok(())
}

fn parse_u32(name: &str, value: &str) -> FuseboxResult<u32> {
    value
        .trim()
        .parse()
        .map_err(|_| FuseboxError::config(format!("Invalid {} value '{}'", name, value)))
}
