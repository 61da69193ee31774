//! Circuit breaker pattern for fault tolerance
//!
//! Prevents cascading failures by short-circuiting calls to a dependency
//! that keeps failing, then probing it again after a cooldown.
//!
//! # State Transitions
//! ```text
//! Closed   --[failure_threshold failures]-->  Open
//! Open     --[call after reset_timeout]---->  HalfOpen (call runs as probe)
//! HalfOpen --[success_threshold successes]->  Closed
//! HalfOpen --[any failure]----------------->  Open
//! ```

mod breaker;
mod registry;
mod types;

#[cfg(test)]
mod tests;

// Re-export all public items
pub use breaker::CircuitBreaker;
pub use registry::CircuitBreakerRegistry;
pub use types::{BreakerConfig, BreakerError, BreakerStats, CircuitOpenError, CircuitState};
