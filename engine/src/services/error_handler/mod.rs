// engine/src/services/error_handler/mod.rs
// Resilient operation executor: bounded retry, circuit breaking, and
// message-based error classification, all reporting through injected
// collaborators.

use crate::services::reporting::{
    report_best_effort, ErrorLogger, Notifier, TracingErrorLogger, TracingNotifier,
};
use shared::models::ErrorLogEntry;
use std::sync::Arc;

pub mod circuit_breaker;
pub mod classify;
pub mod retry;

pub use circuit_breaker::{circuit_breaker, CircuitBreaker, CircuitBreakerError, CircuitState};
pub use classify::{classify_severity, user_message, HandledError};
pub use retry::{with_retry, RetryPolicy};

#[derive(Clone)]
pub struct ErrorHandler {
    logger: Arc<dyn ErrorLogger>,
    notifier: Arc<dyn Notifier>,
}

impl ErrorHandler {
    pub fn new(logger: Arc<dyn ErrorLogger>, notifier: Arc<dyn Notifier>) -> Self {
        ErrorHandler { logger, notifier }
    }

    /// Handler that reports through `tracing` only.
    pub fn with_tracing() -> Self {
        ErrorHandler::new(Arc::new(TracingErrorLogger), Arc::new(TracingNotifier))
    }

    fn report(&self, entry: &ErrorLogEntry) {
        report_best_effort(self.logger.as_ref(), entry);
    }
}

impl std::fmt::Debug for ErrorHandler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ErrorHandler").finish_non_exhaustive()
    }
}
