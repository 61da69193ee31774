//! Fusebox
//!
//! Per-endpoint circuit breakers for async Rust services. Re-exports
//! [`fusebox_core`]; most callers only need the [`prelude`].

pub use fusebox_core::*;

/// Prelude module for convenient imports
pub mod prelude {
    pub use fusebox_core::{
        BreakerConfig, BreakerError, BreakerStats, CircuitBreaker, CircuitBreakerRegistry,
        CircuitOpenError, CircuitState, FuseboxError, FuseboxResult, RegistrySettings,
        SettingsLoader, TimeoutError, with_timeout,
    };
}
