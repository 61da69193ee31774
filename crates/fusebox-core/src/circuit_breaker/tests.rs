//! Tests for circuit breaker functionality

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use tokio::sync::oneshot;

use super::{
    BreakerConfig, BreakerError, CircuitBreaker, CircuitBreakerRegistry, CircuitOpenError,
    CircuitState,
};

#[derive(Debug, PartialEq)]
enum UpstreamError {
    Status(u16),
    Rejected,
}

impl From<CircuitOpenError> for UpstreamError {
    fn from(_: CircuitOpenError) -> Self {
        Self::Rejected
    }
}

async fn fail(breaker: &CircuitBreaker) {
    let result: Result<(), BreakerError<&str>> = breaker.call(|| async { Err("boom") }).await;
    assert!(matches!(result, Err(BreakerError::Operation("boom"))));
}

async fn succeed(breaker: &CircuitBreaker) {
    let result: Result<u32, BreakerError<&str>> = breaker.call(|| async { Ok(7) }).await;
    assert_eq!(result.unwrap(), 7);
}

#[tokio::test]
async fn test_circuit_starts_closed() {
    let cb = CircuitBreaker::new("test");
    assert_eq!(cb.state(), CircuitState::Closed);

    let stats = cb.stats();
    assert_eq!(stats.failures, 0);
    assert_eq!(stats.successes, 0);
    assert!(stats.opened_at.is_none());
}

#[tokio::test]
async fn test_circuit_opens_after_failures() {
    let cb = CircuitBreaker::with_config("test", BreakerConfig::new().with_failure_threshold(3));

    fail(&cb).await;
    fail(&cb).await;
    assert_eq!(cb.state(), CircuitState::Closed);
    assert_eq!(cb.stats().failures, 2);

    fail(&cb).await;
    assert_eq!(cb.state(), CircuitState::Open);

    let stats = cb.stats();
    assert_eq!(stats.failures, 0);
    assert!(stats.opened_at.is_some());
    assert_eq!(stats.times_opened, 1);
}

#[tokio::test]
async fn test_success_clears_failure_window() {
    let cb = CircuitBreaker::with_config("test", BreakerConfig::new().with_failure_threshold(3));

    fail(&cb).await;
    fail(&cb).await;
    succeed(&cb).await;
    fail(&cb).await;
    fail(&cb).await;

    assert_eq!(cb.state(), CircuitState::Closed);
    assert_eq!(cb.stats().failures, 2);
}

#[tokio::test]
async fn test_open_circuit_rejects_without_running() {
    let cb = CircuitBreaker::with_config("test", BreakerConfig::new().with_failure_threshold(3));
    for _ in 0..3 {
        fail(&cb).await;
    }
    assert_eq!(cb.state(), CircuitState::Open);

    let invocations = AtomicUsize::new(0);
    for _ in 0..5 {
        let result: Result<(), BreakerError<&str>> = cb
            .call(|| async {
                invocations.fetch_add(1, Ordering::SeqCst);
                Ok(())
            })
            .await;

        let err = result.unwrap_err();
        assert!(err.is_open());
        assert_eq!(err.to_string(), "Circuit breaker is open");
    }

    assert_eq!(invocations.load(Ordering::SeqCst), 0);
    assert_eq!(cb.stats().total_rejections, 5);
}

#[tokio::test(start_paused = true)]
async fn test_probe_runs_after_reset_timeout() {
    let config = BreakerConfig::new()
        .with_failure_threshold(1)
        .with_reset_timeout(Duration::from_millis(100));
    let cb = CircuitBreaker::with_config("test", config);

    fail(&cb).await;
    tokio::time::advance(Duration::from_millis(99)).await;
    let early: Result<(), BreakerError<&str>> = cb.call(|| async { Ok(()) }).await;
    assert!(early.unwrap_err().is_open());

    // Elapsed timeout alone does not move the state
    tokio::time::advance(Duration::from_millis(1)).await;
    assert_eq!(cb.state(), CircuitState::Open);

    let invocations = AtomicUsize::new(0);
    let result: Result<(), BreakerError<&str>> = cb
        .call(|| async {
            invocations.fetch_add(1, Ordering::SeqCst);
            Ok(())
        })
        .await;

    assert!(result.is_ok());
    assert_eq!(invocations.load(Ordering::SeqCst), 1);
    assert_eq!(cb.state(), CircuitState::HalfOpen);
    assert_eq!(cb.stats().successes, 1);
}

#[tokio::test(start_paused = true)]
async fn test_circuit_closes_after_successes() {
    let config = BreakerConfig::new()
        .with_failure_threshold(1)
        .with_success_threshold(2)
        .with_reset_timeout(Duration::from_millis(100));
    let cb = CircuitBreaker::with_config("test", config);

    fail(&cb).await;
    assert_eq!(cb.state(), CircuitState::Open);

    tokio::time::sleep(Duration::from_millis(100)).await;

    succeed(&cb).await;
    assert_eq!(cb.state(), CircuitState::HalfOpen);

    succeed(&cb).await;
    assert_eq!(cb.state(), CircuitState::Closed);

    let stats = cb.stats();
    assert_eq!(stats.failures, 0);
    assert_eq!(stats.successes, 0);
    assert!(stats.opened_at.is_none());
}

#[tokio::test(start_paused = true)]
async fn test_half_open_failure_reopens() {
    let config = BreakerConfig::new()
        .with_failure_threshold(1)
        .with_success_threshold(3)
        .with_reset_timeout(Duration::from_millis(50));
    let cb = CircuitBreaker::with_config("test", config);

    fail(&cb).await;
    let first_opened = cb.stats().opened_at.unwrap();

    tokio::time::advance(Duration::from_millis(60)).await;
    succeed(&cb).await;
    assert_eq!(cb.state(), CircuitState::HalfOpen);

    fail(&cb).await;
    assert_eq!(cb.state(), CircuitState::Open);

    let stats = cb.stats();
    assert!(stats.opened_at.unwrap() > first_opened);
    assert_eq!(stats.successes, 0);
    assert_eq!(stats.times_opened, 2);

    // Cooldown restarts from the re-open
    let result: Result<(), BreakerError<&str>> = cb.call(|| async { Ok(()) }).await;
    assert!(result.unwrap_err().is_open());
}

#[tokio::test]
async fn test_execute_returns_operation_error_unchanged() {
    let cb = CircuitBreaker::with_config("test", BreakerConfig::new().with_failure_threshold(2));

    let result: Result<(), UpstreamError> =
        cb.execute(|| async { Err(UpstreamError::Status(503)) }).await;
    assert_eq!(result, Err(UpstreamError::Status(503)));

    let result: Result<(), UpstreamError> =
        cb.execute(|| async { Err(UpstreamError::Status(502)) }).await;
    assert_eq!(result, Err(UpstreamError::Status(502)));

    let result: Result<(), UpstreamError> = cb.execute(|| async { Ok(()) }).await;
    assert_eq!(result, Err(UpstreamError::Rejected));
}

#[tokio::test]
async fn test_execute_returns_value_unchanged() {
    let cb = CircuitBreaker::new("test");
    let result: Result<String, UpstreamError> =
        cb.execute(|| async { Ok("payload".to_string()) }).await;
    assert_eq!(result.unwrap(), "payload");
}

#[tokio::test]
async fn test_reset_from_any_state() {
    let cb = CircuitBreaker::with_config("test", BreakerConfig::new().with_failure_threshold(1));
    fail(&cb).await;
    assert_eq!(cb.state(), CircuitState::Open);

    cb.reset();
    let stats = cb.stats();
    assert_eq!(stats.state, CircuitState::Closed);
    assert_eq!(stats.failures, 0);
    assert_eq!(stats.successes, 0);
    assert!(stats.opened_at.is_none());

    succeed(&cb).await;
    assert_eq!(cb.state(), CircuitState::Closed);
}

#[tokio::test]
async fn test_trip_opens_circuit() {
    let cb = CircuitBreaker::new("test");
    cb.trip();

    assert_eq!(cb.state(), CircuitState::Open);
    let result: Result<(), BreakerError<&str>> = cb.call(|| async { Ok(()) }).await;
    assert!(result.unwrap_err().is_open());
}

#[tokio::test]
async fn test_stats_track_lifetime_totals() {
    let cb = CircuitBreaker::new("test");

    succeed(&cb).await;
    succeed(&cb).await;
    fail(&cb).await;

    let stats = cb.stats();
    assert_eq!(stats.state, cb.state());
    assert_eq!(stats.total_calls, 3);
    assert_eq!(stats.total_failures, 1);
    assert!((stats.failure_rate() - 33.33).abs() < 0.1);
}

#[tokio::test(start_paused = true)]
async fn test_half_open_admits_concurrent_probes_by_default() {
    let config = BreakerConfig::new()
        .with_failure_threshold(1)
        .with_reset_timeout(Duration::from_millis(10));
    let cb = CircuitBreaker::with_config("test", config);
    fail(&cb).await;
    tokio::time::advance(Duration::from_millis(10)).await;

    let (tx, rx) = oneshot::channel::<()>();
    let slow_probe = cb.call(|| async move { rx.await.map_err(|_| "sender dropped") });
    tokio::pin!(slow_probe);
    assert!(futures::poll!(&mut slow_probe).is_pending());
    assert_eq!(cb.state(), CircuitState::HalfOpen);

    succeed(&cb).await;

    tx.send(()).unwrap();
    assert!(slow_probe.await.is_ok());
    assert_eq!(cb.state(), CircuitState::Closed);
}

#[tokio::test(start_paused = true)]
async fn test_exclusive_probe_rejects_concurrent_callers() {
    let config = BreakerConfig::new()
        .with_failure_threshold(1)
        .with_reset_timeout(Duration::from_millis(10))
        .with_half_open_max_probes(1);
    let cb = CircuitBreaker::with_config("test", config);
    fail(&cb).await;
    tokio::time::advance(Duration::from_millis(10)).await;

    let (tx, rx) = oneshot::channel::<()>();
    let probe = cb.call(|| async move { rx.await.map_err(|_| "sender dropped") });
    tokio::pin!(probe);
    assert!(futures::poll!(&mut probe).is_pending());

    let invocations = AtomicUsize::new(0);
    let second: Result<(), BreakerError<&str>> = cb
        .call(|| async {
            invocations.fetch_add(1, Ordering::SeqCst);
            Ok(())
        })
        .await;
    assert!(second.unwrap_err().is_open());
    assert_eq!(invocations.load(Ordering::SeqCst), 0);

    tx.send(()).unwrap();
    assert!(probe.await.is_ok());
    assert_eq!(cb.state(), CircuitState::HalfOpen);

    // Slot is free again once the probe settles
    succeed(&cb).await;
    assert_eq!(cb.state(), CircuitState::Closed);
}

#[tokio::test(start_paused = true)]
async fn test_cancelled_probe_releases_slot() {
    let config = BreakerConfig::new()
        .with_failure_threshold(1)
        .with_reset_timeout(Duration::from_millis(10))
        .with_half_open_max_probes(1);
    let cb = CircuitBreaker::with_config("test", config);
    fail(&cb).await;
    tokio::time::advance(Duration::from_millis(10)).await;

    {
        let (_tx, rx) = oneshot::channel::<()>();
        let probe = cb.call(|| async move { rx.await.map_err(|_| "sender dropped") });
        tokio::pin!(probe);
        assert!(futures::poll!(&mut probe).is_pending());
    }

    // Only the failure that opened the circuit has been recorded
    assert_eq!(cb.state(), CircuitState::HalfOpen);
    assert_eq!(cb.stats().total_calls, 1);
    succeed(&cb).await;
    assert_eq!(cb.stats().successes, 1);
}

#[tokio::test]
async fn test_outcome_settling_while_open_is_ignored() {
    let cb = CircuitBreaker::with_config("test", BreakerConfig::new().with_failure_threshold(1));

    let (tx, rx) = oneshot::channel::<()>();
    let slow = cb.call(|| async move {
        rx.await.map_err(|_| "sender dropped")?;
        Err::<(), _>("late failure")
    });
    tokio::pin!(slow);
    assert!(futures::poll!(&mut slow).is_pending());

    fail(&cb).await;
    let opened_at = cb.stats().opened_at;

    tx.send(()).unwrap();
    assert!(matches!(slow.await, Err(BreakerError::Operation("late failure"))));

    let stats = cb.stats();
    assert_eq!(stats.state, CircuitState::Open);
    assert_eq!(stats.opened_at, opened_at);
    assert_eq!(stats.times_opened, 1);
    assert_eq!(stats.total_failures, 2);
}

#[test]
fn test_config_validation() {
    assert!(BreakerConfig::default().validate().is_ok());
    assert!(BreakerConfig::aggressive().validate().is_ok());
    assert!(BreakerConfig::lenient().validate().is_ok());

    assert!(BreakerConfig::new().with_failure_threshold(0).validate().is_err());
    assert!(BreakerConfig::new().with_success_threshold(0).validate().is_err());
    assert!(
        BreakerConfig::new()
            .with_reset_timeout(Duration::ZERO)
            .validate()
            .is_err()
    );
    assert!(BreakerConfig::new().with_half_open_max_probes(0).validate().is_err());
}

#[test]
fn test_state_names() {
    assert_eq!(CircuitState::Closed.to_string(), "closed");
    assert_eq!(CircuitState::Open.to_string(), "open");
    assert_eq!(CircuitState::HalfOpen.to_string(), "half_open");
}

#[tokio::test]
async fn test_registry() {
    let registry = CircuitBreakerRegistry::new();

    let cb1 = registry.get("component_a");
    let cb2 = registry.get("component_b");
    let cb1_again = registry.get("component_a");

    // Should return same instance
    assert!(Arc::ptr_eq(&cb1, &cb1_again));
    assert!(!Arc::ptr_eq(&cb1, &cb2));

    assert_eq!(registry.keys(), vec!["component_a", "component_b"]);
    assert_eq!(registry.len(), 2);
    assert!(registry.lookup("component_c").is_none());
}

#[tokio::test]
async fn test_registry_first_config_wins() {
    let registry = CircuitBreakerRegistry::new();

    let first = registry.get_or_create("api", Some(BreakerConfig::new().with_failure_threshold(2)));
    let second =
        registry.get_or_create("api", Some(BreakerConfig::new().with_failure_threshold(9)));

    assert!(Arc::ptr_eq(&first, &second));
    assert_eq!(second.config().failure_threshold, 2);
}

#[tokio::test]
async fn test_registry_reset_all() {
    let registry = CircuitBreakerRegistry::with_config(BreakerConfig::new().with_failure_threshold(1));
    fail(&registry.get("a")).await;
    fail(&registry.get("b")).await;

    let stats = registry.all_stats();
    assert_eq!(stats.len(), 2);
    assert!(stats.iter().all(|s| s.state == CircuitState::Open));

    registry.reset_all();
    assert!(
        registry
            .all_stats()
            .iter()
            .all(|s| s.state == CircuitState::Closed)
    );
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_registry_concurrent_first_access() {
    let registry = Arc::new(CircuitBreakerRegistry::new());

    let handles: Vec<_> = (0..32)
        .map(|_| {
            let registry = Arc::clone(&registry);
            tokio::spawn(async move { registry.get("shared") })
        })
        .collect();

    let mut breakers = Vec::new();
    for handle in handles {
        breakers.push(handle.await.unwrap());
    }

    assert_eq!(registry.len(), 1);
    assert!(breakers.iter().all(|b| Arc::ptr_eq(b, &breakers[0])));
}
