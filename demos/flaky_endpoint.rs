//! Circuit breaker demo against a simulated flaky endpoint
//!
//! Run with: RUST_LOG=debug cargo run --example flaky_endpoint

use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;

use anyhow::Result;
use fusebox::prelude::*;

/// Endpoint that fails its first `outage` requests, then recovers
struct FlakyEndpoint {
    requests: AtomicU32,
    outage: u32,
}

impl FlakyEndpoint {
    async fn fetch(&self) -> Result<String, String> {
        let n = self.requests.fetch_add(1, Ordering::SeqCst) + 1;
        tokio::time::sleep(Duration::from_millis(20)).await;
        if n <= self.outage {
            Err(format!("request #{} failed: 503 Service Unavailable", n))
        } else {
            Ok(format!("request #{} ok", n))
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let registry = CircuitBreakerRegistry::new();
    let breaker = registry.get_or_create(
        "inventory-api",
        Some(
            BreakerConfig::new()
                .with_failure_threshold(3)
                .with_success_threshold(2)
                .with_reset_timeout(Duration::from_millis(500)),
        ),
    );

    let endpoint = FlakyEndpoint {
        requests: AtomicU32::new(0),
        outage: 4,
    };

    for i in 1..=12 {
        let outcome = breaker
            .call(|| with_timeout(Duration::from_secs(1), endpoint.fetch()))
            .await;

        match outcome {
            Ok(body) => println!("call {:>2}: {}", i, body),
            Err(BreakerError::Open(_)) => println!("call {:>2}: short-circuited", i),
            Err(BreakerError::Operation(e)) => println!("call {:>2}: {}", i, e),
        }

        let stats = breaker.stats();
        println!(
            "         state={} failures={} successes={} rejected={}",
            stats.state, stats.failures, stats.successes, stats.total_rejections
        );

        tokio::time::sleep(Duration::from_millis(150)).await;
    }

    Ok(())
}
