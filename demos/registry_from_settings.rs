//! Build a registry from a settings file plus FUSEBOX_* overrides
//!
//! Run with: cargo run --example registry_from_settings -- fusebox.toml

use std::time::Duration;

use anyhow::{Context, Result};
use fusebox::prelude::*;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "fusebox.toml".to_string());

    let settings = SettingsLoader::new()
        .with_defaults()
        .with_file(&path)
        .with_env()
        .load()
        .with_context(|| format!("loading breaker settings from {}", path))?;

    let registry = CircuitBreakerRegistry::from_settings(settings);
    let mut keys: Vec<&String> = registry.settings().breakers.keys().collect();
    keys.sort();

    for key in keys {
        let breaker = registry.get(key);
        let _ = breaker
            .call(|| with_timeout(Duration::from_millis(100), async { Ok::<_, String>(()) }))
            .await;
    }

    for stats in registry.all_stats() {
        println!(
            "{:<24} state={:<9} calls={} failure_rate={:.1}%",
            stats.key,
            stats.state,
            stats.total_calls,
            stats.failure_rate()
        );
    }

    Ok(())
}
