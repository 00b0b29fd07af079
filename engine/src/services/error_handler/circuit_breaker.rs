//! Circuit breaker guarding a single operation.
//!
//! ```text
//! Closed    -> Open:      failure_count >= failure_threshold
//! Open      -> HalfOpen:  a call arrives after recovery_time since the last failure
//! HalfOpen  -> Closed:    the trial call succeeds (failure_count reset to 0)
//! HalfOpen  -> Open:      the trial call fails
//! ```
//!
//! Failures while closed are never decayed by intervening successes. The
//! state lock is not held while the operation runs, so concurrent callers of
//! one breaker may both slip through before it opens.

use super::ErrorHandler;
use parking_lot::Mutex;
use std::future::Future;
use std::time::Duration;
use thiserror::Error;
use tokio::time::Instant;

pub const DEFAULT_FAILURE_THRESHOLD: u32 = 5;
pub const DEFAULT_RECOVERY_TIME: Duration = Duration::from_millis(60_000);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CircuitState {
    Closed,
    Open,
    HalfOpen,
}

#[derive(Error, Debug)]
pub enum CircuitBreakerError<E> {
    /// Rejected without running the operation.
    #[error("Circuit breaker is open")]
    Open,

    /// The operation ran and failed; display and source come from `E`.
    #[error(transparent)]
    Operation(E),
}

impl<E> CircuitBreakerError<E> {
    pub fn is_open(&self) -> bool {
        matches!(self, CircuitBreakerError::Open)
    }

    pub fn into_operation_error(self) -> Option<E> {
        match self {
            CircuitBreakerError::Open => None,
            CircuitBreakerError::Operation(e) => Some(e),
        }
    }
}

#[derive(Debug)]
struct BreakerState {
    failure_count: u32,
    last_failure: Option<Instant>,
    state: CircuitState,
}

pub struct CircuitBreaker<F> {
    operation: F,
    failure_threshold: u32,
    recovery_time: Duration,
    inner: Mutex<BreakerState>,
}

/// Wraps `operation` in a fresh, closed breaker.
pub fn circuit_breaker<F>(operation: F, failure_threshold: u32, recovery_time: Duration) -> CircuitBreaker<F> {
    CircuitBreaker::new(operation, failure_threshold, recovery_time)
}

impl<F> CircuitBreaker<F> {
    pub fn new(operation: F, failure_threshold: u32, recovery_time: Duration) -> Self {
        CircuitBreaker {
            operation,
            failure_threshold,
            recovery_time,
            inner: Mutex::new(BreakerState {
                failure_count: 0,
                last_failure: None,
                state: CircuitState::Closed,
            }),
        }
    }

    pub fn with_defaults(operation: F) -> Self {
        Self::new(operation, DEFAULT_FAILURE_THRESHOLD, DEFAULT_RECOVERY_TIME)
    }

    pub fn state(&self) -> CircuitState {
        self.inner.lock().state
    }

    pub fn failure_count(&self) -> u32 {
        self.inner.lock().failure_count
    }

    /// Applies the open -> half-open transition and reports whether the call may proceed.
    fn admit(&self) -> bool {
        let mut inner = self.inner.lock();
        if inner.state != CircuitState::Open {
            return true;
        }
        let recovered = inner
            .last_failure
            .map_or(true, |at| at.elapsed() >= self.recovery_time);
        if recovered {
            inner.state = CircuitState::HalfOpen;
            tracing::debug!(failure_count = inner.failure_count, "Circuit breaker half-open, allowing trial call");
        }
        recovered
    }

    fn record_success(&self) {
        let mut inner = self.inner.lock();
        if inner.state == CircuitState::HalfOpen {
            inner.state = CircuitState::Closed;
            inner.failure_count = 0;
            tracing::info!("Circuit breaker closed after successful trial call");
        }
    }

    fn record_failure(&self) {
        let mut inner = self.inner.lock();
        inner.failure_count = inner.failure_count.saturating_add(1);
        inner.last_failure = Some(Instant::now());
        if inner.failure_count >= self.failure_threshold && inner.state != CircuitState::Open {
            inner.state = CircuitState::Open;
            tracing::warn!(
                failure_count = inner.failure_count,
                recovery_ms = self.recovery_time.as_millis() as u64,
                "Circuit breaker opened"
            );
        }
    }
}

impl<F, Fut, T, E> CircuitBreaker<F>
where
    F: Fn() -> Fut,
    Fut: Future<Output = Result<T, E>>,
{
    pub async fn call(&self) -> Result<T, CircuitBreakerError<E>> {
        if !self.admit() {
            tracing::debug!("Circuit breaker open, rejecting call");
            return Err(CircuitBreakerError::Open);
        }
        match (self.operation)().await {
            Ok(value) => {
                self.record_success();
                Ok(value)
            }
            Err(e) => {
                self.record_failure();
                Err(CircuitBreakerError::Operation(e))
            }
        }
    }
}

impl<F> std::fmt::Debug for CircuitBreaker<F> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let inner = self.inner.lock();
        f.debug_struct("CircuitBreaker")
            .field("state", &inner.state)
            .field("failure_count", &inner.failure_count)
            .field("failure_threshold", &self.failure_threshold)
            .field("recovery_time", &self.recovery_time)
            .finish_non_exhaustive()
    }
}

impl ErrorHandler {
    pub fn circuit_breaker<F>(&self, operation: F, failure_threshold: u32, recovery_time: Duration) -> CircuitBreaker<F> {
        circuit_breaker(operation, failure_threshold, recovery_time)
    }
}
