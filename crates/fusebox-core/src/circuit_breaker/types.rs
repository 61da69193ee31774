//! Circuit breaker types and configuration

use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;
use thiserror::Error;
use tokio::time::Instant;

use crate::error::{FuseboxError, FuseboxResult};

/// Circuit breaker state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CircuitState {
    /// Circuit is closed, operations proceed normally
    #[default]
    Closed,
    /// Circuit is open, operations are rejected
    Open,
    /// Circuit is half-open, probe operations test recovery
    HalfOpen,
}

impl CircuitState {
    /// Lowercase name used in logs and stats
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Closed => "closed",
            Self::Open => "open",
            Self::HalfOpen => "half_open",
        }
    }
}

impl fmt::Display for CircuitState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Configuration for circuit breaker behavior
///
/// Fields omitted from a settings file take the values of
/// [`BreakerConfig::default`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BreakerConfig {
    /// Number of consecutive failures before opening the circuit
    pub failure_threshold: u32,
    /// Number of successes needed in half-open state to close
    pub success_threshold: u32,
    /// Time to wait before an open circuit admits a probe
    #[serde(with = "humantime_serde")]
    pub reset_timeout: Duration,
    /// Maximum concurrent in-flight probes in half-open state.
    ///
    /// `None` admits every caller while half-open.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub half_open_max_probes: Option<u32>,
}

impl Default for BreakerConfig {
    fn default() -> Self {
        Self {
            failure_threshold: 5,
            success_threshold: 2,
            reset_timeout: Duration::from_secs(30),
            half_open_max_probes: None,
        }
    }
}

impl BreakerConfig {
    /// Create a config with default values
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a config for aggressive circuit breaking
    pub fn aggressive() -> Self {
        Self {
            failure_threshold: 3,
            success_threshold: 2,
            reset_timeout: Duration::from_secs(15),
            half_open_max_probes: Some(1),
        }
    }

    /// Create a config for lenient circuit breaking
    pub fn lenient() -> Self {
        Self {
            failure_threshold: 10,
            success_threshold: 5,
            reset_timeout: Duration::from_secs(60),
            half_open_max_probes: None,
        }
    }

    pub fn with_failure_threshold(mut self, threshold: u32) -> Self {
        self.failure_threshold = threshold;
        self
    }

    pub fn with_success_threshold(mut self, threshold: u32) -> Self {
        self.success_threshold = threshold;
        self
    }

    pub fn with_reset_timeout(mut self, timeout: Duration) -> Self {
        self.reset_timeout = timeout;
        self
    }

    /// Limit half-open probing to `max` concurrent calls
    pub fn with_half_open_max_probes(mut self, max: u32) -> Self {
        self.half_open_max_probes = Some(max);
        self
    }

    /// Check that thresholds and timeout are usable
    pub fn validate(&self) -> FuseboxResult<()> {
        if self.failure_threshold == 0 {
            return Err(FuseboxError::config(
                "failure_threshold must be greater than 0",
            ));
        }
        if self.success_threshold == 0 {
            return Err(FuseboxError::config(
                "success_threshold must be greater than 0",
            ));
        }
        if self.reset_timeout.is_zero() {
            return Err(FuseboxError::config("reset_timeout must be greater than 0"));
        }
        if self.half_open_max_probes == Some(0) {
            return Err(FuseboxError::config(
                "half_open_max_probes must be greater than 0 when set",
            ));
        }
        Ok(())
    }
}

/// Rejection produced when the circuit does not admit a call
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Circuit breaker is open")]
pub struct CircuitOpenError {
    /// Key of the breaker that rejected the call
    pub key: String,
}

impl CircuitOpenError {
    pub fn new(key: impl Into<String>) -> Self {
        Self { key: key.into() }
    }
}

/// Error from [`CircuitBreaker::call`](super::CircuitBreaker::call)
#[derive(Debug)]
pub enum BreakerError<E> {
    /// Circuit rejected the call; the operation never ran
    Open(CircuitOpenError),
    /// Operation ran and failed with its own error
    Operation(E),
}

impl<E> BreakerError<E> {
    /// Whether the call was short-circuited
    pub fn is_open(&self) -> bool {
        matches!(self, Self::Open(_))
    }

    /// The operation's own error, if the operation ran
    pub fn operation_error(&self) -> Option<&E> {
        match self {
            Self::Operation(e) => Some(e),
            Self::Open(_) => None,
        }
    }

    /// Collapse into the caller's error type
    pub fn into_inner(self) -> E
    where
        E: From<CircuitOpenError>,
    {
        match self {
            Self::Open(open) => E::from(open),
            Self::Operation(e) => e,
        }
    }
}

impl<E> From<CircuitOpenError> for BreakerError<E> {
    fn from(err: CircuitOpenError) -> Self {
        Self::Open(err)
    }
}

impl<E: fmt::Display> fmt::Display for BreakerError<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Open(open) => write!(f, "{}", open),
            Self::Operation(e) => write!(f, "{}", e),
        }
    }
}

impl<E: std::error::Error + 'static> std::error::Error for BreakerError<E> {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Open(_) => None,
            Self::Operation(e) => Some(e),
        }
    }
}

/// Point-in-time statistics for a circuit breaker
///
/// `failures` and `successes` are current-window counts; the `total_*`
/// fields accumulate over the breaker's lifetime and survive state changes
/// but not [`reset`](super::CircuitBreaker::reset).
#[derive(Debug, Clone, PartialEq)]
pub struct BreakerStats {
    pub key: String,
    pub state: CircuitState,
    /// Failures counted toward opening while closed
    pub failures: u32,
    /// Consecutive successes while half-open
    pub successes: u32,
    pub opened_at: Option<Instant>,
    pub total_calls: u64,
    pub total_failures: u64,
    pub total_rejections: u64,
    pub times_opened: u64,
}

impl BreakerStats {
    /// Calculate failure rate of executed calls as a percentage
    pub fn failure_rate(&self) -> f64 {
        if self.total_calls == 0 {
            0.0
        } else {
            (self.total_failures as f64 / self.total_calls as f64) * 100.0
        }
    }
}
