//! Timeout wrapper for operations run under a breaker
//!
//! Breakers never time out the operations they wrap. To bound latency, wrap
//! the operation before handing it over so an elapsed deadline counts as a
//! failure:
//!
//! ```rust,ignore
//! breaker
//!     .call(|| with_timeout(Duration::from_secs(2), client.get(url)))
//!     .await
//! ```

use std::fmt;
use std::future::Future;
use std::time::Duration;

/// Error from [`with_timeout`]
#[derive(Debug)]
pub enum TimeoutError<E> {
    /// Deadline passed before the operation settled
    Elapsed(Duration),
    /// Operation settled in time with its own error
    Inner(E),
}

impl<E> TimeoutError<E> {
    pub fn is_elapsed(&self) -> bool {
        matches!(self, Self::Elapsed(_))
    }
}

impl<E: fmt::Display> fmt::Display for TimeoutError<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Elapsed(limit) => write!(f, "Operation timed out after {:?}", limit),
            Self::Inner(e) => write!(f, "{}", e),
        }
    }
}

impl<E: std::error::Error + 'static> std::error::Error for TimeoutError<E> {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Elapsed(_) => None,
            Self::Inner(e) => Some(e),
        }
    }
}

/// Run `future` with a deadline; the future is dropped when it elapses
pub async fn with_timeout<T, E, Fut>(limit: Duration, future: Fut) -> Result<T, TimeoutError<E>>
where
    Fut: Future<Output = Result<T, E>>,
{
    match tokio::time::timeout(limit, future).await {
        Ok(result) => result.map_err(TimeoutError::Inner),
        Err(_) => {
            tracing::debug!(limit = ?limit, "Operation timed out");
            Err(TimeoutError::Elapsed(limit))
        }
    }
}
