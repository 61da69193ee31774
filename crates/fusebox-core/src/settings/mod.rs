//! Registry settings loading
//!
//! Breaker configs can come from:
//! - Settings files (JSON, TOML, YAML)
//! - `FUSEBOX_*` environment variables (override the defaults only)
//! - Built-in defaults

mod loader;
mod types;


pub use loader::{
    ENV_FAILURE_THRESHOLD, ENV_HALF_OPEN_MAX_PROBES, ENV_RESET_TIMEOUT, ENV_SUCCESS_THRESHOLD,
    SettingsLoader, apply_env_overrides, load_from_file, read_settings_file,
};
pub use types::{BreakerConfigPatch, RegistrySettings, SettingsFile, SettingsSource};
