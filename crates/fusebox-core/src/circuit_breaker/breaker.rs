//! Circuit breaker implementation

use parking_lot::Mutex;
use std::future::Future;
use tokio::time::Instant;

use super::types::{BreakerConfig, BreakerError, BreakerStats, CircuitOpenError, CircuitState};

/// Circuit breaker for protecting against a failing dependency
///
/// All state lives behind one mutex. The lock is taken to admit a call and
/// again to record its outcome, never across the wrapped operation.
pub struct CircuitBreaker {
    /// Resource key (for logging and registry identity)
    key: String,
    config: BreakerConfig,
    inner: Mutex<BreakerInner>,
}

#[derive(Debug, Default)]
struct BreakerInner {
    state: CircuitState,
    /// Failure count in the current closed window
    failure_count: u32,
    /// Consecutive successes while half-open
    success_count: u32,
    /// Set when the circuit opens, cleared when it closes
    opened_at: Option<Instant>,
    /// Probes admitted during the current half-open period and not yet settled
    in_flight_probes: u32,
    /// Bumped on every half-open entry so stale probes don't release new slots
    probe_epoch: u64,
    total_calls: u64,
    total_failures: u64,
    total_rejections: u64,
    times_opened: u64,
}

/// How an admitted call settled
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Outcome {
    Success,
    Failure,
}

/// Admission ticket for a single call.
///
/// Dropping an unsettled ticket (the caller's future was cancelled) records
/// nothing but frees the probe slot it may hold.
struct CallTicket<'a> {
    breaker: &'a CircuitBreaker,
    probe_epoch: Option<u64>,
    settled: bool,
}

impl CallTicket<'_> {
    fn settle(mut self, outcome: Outcome) {
        self.settled = true;
        let mut inner = self.breaker.inner.lock();
        if let Some(epoch) = self.probe_epoch {
            inner.release_probe(epoch);
        }
        match outcome {
            Outcome::Success => self.breaker.on_success(&mut inner),
            Outcome::Failure => self.breaker.on_failure(&mut inner),
        }
    }
}

impl Drop for CallTicket<'_> {
    fn drop(&mut self) {
        if self.settled {
            return;
        }
        if let Some(epoch) = self.probe_epoch {
            self.breaker.inner.lock().release_probe(epoch);
            tracing::debug!(circuit = %self.breaker.key, "Probe cancelled before settling");
        }
    }
}

impl BreakerInner {
    fn release_probe(&mut self, epoch: u64) {
        if self.state == CircuitState::HalfOpen && self.probe_epoch == epoch {
            self.in_flight_probes = self.in_flight_probes.saturating_sub(1);
        }
    }

    fn reset_window(&mut self) {
        self.failure_count = 0;
        self.success_count = 0;
        self.in_flight_probes = 0;
    }
}

impl CircuitBreaker {
    /// Create a new circuit breaker with default config
    pub fn new(key: impl Into<String>) -> Self {
        Self::with_config(key, BreakerConfig::default())
    }

    /// Create a new circuit breaker with custom config
    pub fn with_config(key: impl Into<String>, config: BreakerConfig) -> Self {
        Self {
            key: key.into(),
            config,
            inner: Mutex::new(BreakerInner::default()),
        }
    }

    /// Get the resource key
    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn config(&self) -> &BreakerConfig {
        &self.config
    }

    /// Get the current state.
    ///
    /// An open circuit whose reset timeout has elapsed still reports `Open`
    /// until a call arrives and moves it to half-open.
    pub fn state(&self) -> CircuitState {
        self.inner.lock().state
    }

    /// Get circuit breaker statistics
    pub fn stats(&self) -> BreakerStats {
        let inner = self.inner.lock();
        BreakerStats {
            key: self.key.clone(),
            state: inner.state,
            failures: inner.failure_count,
            successes: inner.success_count,
            opened_at: inner.opened_at,
            total_calls: inner.total_calls,
            total_failures: inner.total_failures,
            total_rejections: inner.total_rejections,
            times_opened: inner.times_opened,
        }
    }

    /// Execute an operation with circuit breaker protection.
    ///
    /// A rejected call surfaces as `E::from(CircuitOpenError)` without running
    /// the operation. Operation errors come back exactly as produced.
    pub async fn execute<T, E, F, Fut>(&self, operation: F) -> Result<T, E>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: From<CircuitOpenError>,
    {
        self.call(operation).await.map_err(BreakerError::into_inner)
    }

    /// Execute an operation, keeping rejection and operation errors apart
    pub async fn call<T, E, F, Fut>(&self, operation: F) -> Result<T, BreakerError<E>>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        let ticket = self.admit()?;

        match operation().await {
            Ok(value) => {
                ticket.settle(Outcome::Success);
                Ok(value)
            }
            Err(e) => {
                ticket.settle(Outcome::Failure);
                Err(BreakerError::Operation(e))
            }
        }
    }

    /// Manually reset the circuit breaker to closed state
    pub fn reset(&self) {
        let mut inner = self.inner.lock();
        let probe_epoch = inner.probe_epoch;
        *inner = BreakerInner {
            probe_epoch,
            ..BreakerInner::default()
        };

        tracing::info!(circuit = %self.key, "Circuit breaker reset");
    }

    /// Manually open the circuit breaker
    pub fn trip(&self) {
        let mut inner = self.inner.lock();
        self.transition_to_open(&mut inner);
    }

    fn admit(&self) -> Result<CallTicket<'_>, CircuitOpenError> {
        let mut inner = self.inner.lock();

        if inner.state == CircuitState::Open {
            let cooled_down = inner
                .opened_at
                .is_none_or(|opened_at| opened_at.elapsed() >= self.config.reset_timeout);
            if !cooled_down {
                return Err(self.reject(&mut inner));
            }
            self.transition_to_half_open(&mut inner);
        }

        let probe_epoch = if inner.state == CircuitState::HalfOpen {
            if let Some(max) = self.config.half_open_max_probes {
                if inner.in_flight_probes >= max {
                    return Err(self.reject(&mut inner));
                }
            }
            inner.in_flight_probes += 1;
            Some(inner.probe_epoch)
        } else {
            None
        };

        Ok(CallTicket {
            breaker: self,
            probe_epoch,
            settled: false,
        })
    }

    fn reject(&self, inner: &mut BreakerInner) -> CircuitOpenError {
        inner.total_rejections += 1;
        tracing::debug!(
            circuit = %self.key,
            state = %inner.state,
            "Circuit breaker rejected call"
        );
        CircuitOpenError::new(self.key.clone())
    }

    fn on_success(&self, inner: &mut BreakerInner) {
        inner.total_calls += 1;

        match inner.state {
            CircuitState::Closed => {
                inner.failure_count = 0;
            }
            CircuitState::HalfOpen => {
                inner.success_count += 1;
                if inner.success_count >= self.config.success_threshold {
                    self.transition_to_closed(inner);
                }
            }
            CircuitState::Open => {
                // Call was admitted before the circuit tripped
            }
        }
    }

    fn on_failure(&self, inner: &mut BreakerInner) {
        inner.total_calls += 1;
        inner.total_failures += 1;

        match inner.state {
            CircuitState::Closed => {
                if inner.failure_count + 1 >= self.config.failure_threshold {
                    self.transition_to_open(inner);
                } else {
                    inner.failure_count += 1;
                }
            }
            CircuitState::HalfOpen => {
                // Any failure in half-open state opens the circuit again
                self.transition_to_open(inner);
            }
            CircuitState::Open => {}
        }
    }

    fn transition_to_open(&self, inner: &mut BreakerInner) {
        let from = inner.state;
        inner.state = CircuitState::Open;
        inner.opened_at = Some(Instant::now());
        inner.times_opened += 1;
        inner.reset_window();

        tracing::warn!(
            circuit = %self.key,
            from = %from,
            reset_timeout = ?self.config.reset_timeout,
            "Circuit breaker opened"
        );
    }

    fn transition_to_half_open(&self, inner: &mut BreakerInner) {
        inner.state = CircuitState::HalfOpen;
        inner.reset_window();
        inner.probe_epoch += 1;

        tracing::info!(
            circuit = %self.key,
            "Circuit breaker transitioning to half-open"
        );
    }

    fn transition_to_closed(&self, inner: &mut BreakerInner) {
        inner.state = CircuitState::Closed;
        inner.opened_at = None;
        inner.reset_window();

        tracing::info!(
            circuit = %self.key,
            "Circuit breaker closed"
        );
    }
}

impl std::fmt::Debug for CircuitBreaker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CircuitBreaker")
            .field("key", &self.key)
            .field("state", &self.state())
            .field("config", &self.config)
            .finish()
    }
}
