//! Fusebox Core Library
//!
//! Circuit breakers for async call sites. A [`CircuitBreakerRegistry`] hands out
//! exactly one [`CircuitBreaker`] per resource key; each breaker wraps arbitrary
//! async operations and short-circuits them while its dependency is unhealthy.
//!
//! ```rust,ignore
//! use fusebox_core::{BreakerConfig, CircuitBreakerRegistry};
//!
//! let registry = CircuitBreakerRegistry::new();
//! let breaker = registry.get_or_create("billing-api", Some(BreakerConfig::aggressive()));
//!
//! let invoice = breaker.execute(|| client.fetch_invoice(id)).await?;
//! ```

pub mod circuit_breaker;
pub mod error;
pub mod settings;
pub mod timeout;

pub use circuit_breaker::{
    BreakerConfig, BreakerError, BreakerStats, CircuitBreaker, CircuitBreakerRegistry,
    CircuitOpenError, CircuitState,
};
pub use error::{FuseboxError, FuseboxResult};
pub use settings::{RegistrySettings, SettingsLoader, SettingsSource};
pub use timeout::{TimeoutError, with_timeout};
