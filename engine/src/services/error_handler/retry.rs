// Bounded exponential-backoff retry
use super::ErrorHandler;
use crate::services::reporting::{report_best_effort, ErrorLogger};
use serde_json::{json, Map};
use shared::models::{ErrorCategory, ErrorLogEntry, Severity};
use std::fmt::Display;
use std::future::Future;
use std::time::Duration;

#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    /// Retries allowed after the first attempt.
    pub max_retries: u32,
    pub base_delay: Duration,
    pub max_delay: Duration,
    pub exponential_base: f64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        RetryPolicy {
            max_retries: 3,
            base_delay: Duration::from_millis(1000),
            max_delay: Duration::from_millis(10_000),
            exponential_base: 2.0,
        }
    }
}

impl RetryPolicy {
    /// Delay slept before retry number `attempt` (1 for the first retry):
    /// `min(base_delay * exponential_base^(attempt - 1), max_delay)`.
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        if attempt == 0 || self.base_delay.is_zero() {
            return Duration::ZERO;
        }
        let exponent = i32::try_from(attempt - 1).unwrap_or(i32::MAX);
        let factor = self.exponential_base.max(0.0).powi(exponent);
        let delay = self.base_delay.as_secs_f64() * factor;
        if delay.is_nan() || delay <= 0.0 {
            return Duration::ZERO;
        }
        if delay >= self.max_delay.as_secs_f64() {
            return self.max_delay;
        }
        Duration::try_from_secs_f64(delay).unwrap_or(self.max_delay)
    }
}

/// Runs `operation` until it succeeds or `policy.max_retries` retries have
/// failed. The last error is returned unchanged and one `operation_failed`
/// entry is handed to `logger`.
pub async fn with_retry<T, E, F, Fut>(
    mut operation: F,
    policy: &RetryPolicy,
    logger: &dyn ErrorLogger,
) -> Result<T, E>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: Display,
{
    let mut attempt: u32 = 0;
    loop {
        match operation().await {
            Ok(value) => {
                if attempt > 0 {
                    tracing::debug!(attempt, "Operation succeeded after retry");
                }
                return Ok(value);
            }
            Err(err) if attempt < policy.max_retries => {
                attempt += 1;
                let delay = policy.delay_for_attempt(attempt);
                tracing::warn!(
                    attempt,
                    max_retries = policy.max_retries,
                    delay_ms = delay.as_millis() as u64,
                    error = %err,
                    "Operation failed, retrying"
                );
                tokio::time::sleep(delay).await;
            }
            Err(err) => {
                let attempts = attempt + 1;
                let mut context = Map::new();
                context.insert("attempts".to_string(), json!(attempts));
                context.insert("max_retries".to_string(), json!(policy.max_retries));
                let entry = ErrorLogEntry::new(
                    ErrorCategory::OperationFailed,
                    Severity::High,
                    format!("Operation failed after {} attempts: {}", attempts, err),
                )
                .with_context(context);
                report_best_effort(logger, &entry);
                return Err(err);
            }
        }
    }
}

impl ErrorHandler {
    pub async fn with_retry<T, E, F, Fut>(&self, operation: F, policy: &RetryPolicy) -> Result<T, E>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: Display,
    {
        with_retry(operation, policy, self.logger.as_ref()).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::reporting::testing::{RecordingLogger, RecordingNotifier};
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Arc;
    use tokio::time::Instant;

    fn fails_times(calls: &AtomicU32, failures: u32) -> impl FnMut() -> std::future::Ready<Result<u32, String>> + '_ {
        move || {
            let n = calls.fetch_add(1, Ordering::SeqCst);
            if n < failures {
                std::future::ready(Err(format!("transient failure #{}", n + 1)))
            } else {
                std::future::ready(Ok(42))
            }
        }
    }

    #[test]
    fn test_delay_sequence_is_capped() {
        let policy = RetryPolicy::default();
        let delays: Vec<u64> = (1..=6).map(|k| policy.delay_for_attempt(k).as_millis() as u64).collect();
        assert_eq!(delays, vec![1000, 2000, 4000, 8000, 10_000, 10_000]);
    }

    #[test]
    fn test_delay_edge_cases() {
        let policy = RetryPolicy { base_delay: Duration::ZERO, ..RetryPolicy::default() };
        assert_eq!(policy.delay_for_attempt(3), Duration::ZERO);

        let flat = RetryPolicy { exponential_base: 1.0, ..RetryPolicy::default() };
        assert_eq!(flat.delay_for_attempt(5), Duration::from_millis(1000));

        let huge = RetryPolicy { exponential_base: 10.0, ..RetryPolicy::default() };
        assert_eq!(huge.delay_for_attempt(u32::MAX), Duration::from_millis(10_000));
        assert_eq!(huge.delay_for_attempt(0), Duration::ZERO);
    }

    #[test]
    fn test_sub_millisecond_delays_are_kept() {
        let policy = RetryPolicy {
            base_delay: Duration::from_micros(250),
            max_delay: Duration::from_millis(1),
            ..RetryPolicy::default()
        };
        let micros = |k| policy.delay_for_attempt(k).as_secs_f64() * 1e6;
        assert!((micros(1) - 250.0).abs() < 0.01, "{}", micros(1));
        assert!((micros(2) - 500.0).abs() < 0.01, "{}", micros(2));
        assert_eq!(policy.delay_for_attempt(4), Duration::from_millis(1));
    }

    #[tokio::test(start_paused = true)]
    async fn test_succeeds_after_transient_failures() {
        let logger = RecordingLogger::default();
        let calls = AtomicU32::new(0);
        let policy = RetryPolicy::default();

        let result = with_retry(fails_times(&calls, 2), &policy, &logger).await;

        assert_eq!(result, Ok(42));
        assert_eq!(calls.load(Ordering::SeqCst), 3);
        assert!(logger.entries().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_succeeds_on_last_allowed_attempt() {
        let logger = RecordingLogger::default();
        let calls = AtomicU32::new(0);
        let policy = RetryPolicy { max_retries: 4, ..RetryPolicy::default() };

        let result = with_retry(fails_times(&calls, 4), &policy, &logger).await;

        assert_eq!(result, Ok(42));
        assert_eq!(calls.load(Ordering::SeqCst), 5);
        assert!(logger.entries().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_exhaustion_returns_last_error_and_logs_once() {
        let logger = RecordingLogger::default();
        let calls = AtomicU32::new(0);
        let policy = RetryPolicy::default();

        let result = with_retry(fails_times(&calls, u32::MAX), &policy, &logger).await;

        assert_eq!(result, Err("transient failure #4".to_string()));
        assert_eq!(calls.load(Ordering::SeqCst), 4);

        let entries = logger.entries();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].category, ErrorCategory::OperationFailed);
        assert_eq!(entries[0].severity, Severity::High);
        assert_eq!(entries[0].context["attempts"], json!(4));
        assert!(entries[0].message.contains("transient failure #4"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_zero_retries_runs_once() {
        let logger = RecordingLogger::default();
        let calls = AtomicU32::new(0);
        let policy = RetryPolicy { max_retries: 0, ..RetryPolicy::default() };

        let started = Instant::now();
        let result = with_retry(fails_times(&calls, 1), &policy, &logger).await;

        assert!(result.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(started.elapsed(), Duration::ZERO);
        assert_eq!(logger.entries().len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_backoff_sleeps_follow_policy() {
        let logger = RecordingLogger::default();
        let calls = AtomicU32::new(0);
        let policy = RetryPolicy { max_retries: 5, ..RetryPolicy::default() };

        let started = Instant::now();
        let _ = with_retry(fails_times(&calls, u32::MAX), &policy, &logger).await;
        let elapsed = started.elapsed();

        // 1000 + 2000 + 4000 + 8000 + 10000 (capped)
        assert!(elapsed >= Duration::from_millis(25_000), "elapsed {:?}", elapsed);
        assert!(elapsed < Duration::from_millis(25_100), "elapsed {:?}", elapsed);
        assert_eq!(calls.load(Ordering::SeqCst), 6);
    }

    #[tokio::test(start_paused = true)]
    async fn test_logger_failure_does_not_mask_error() {
        let logger = RecordingLogger::failing();
        let calls = AtomicU32::new(0);
        let policy = RetryPolicy { max_retries: 1, ..RetryPolicy::default() };

        let result = with_retry(fails_times(&calls, u32::MAX), &policy, &logger).await;

        assert_eq!(result, Err("transient failure #2".to_string()));
        assert_eq!(logger.entries().len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_handler_delegates_to_its_logger() {
        let logger = Arc::new(RecordingLogger::default());
        let handler = ErrorHandler::new(logger.clone(), Arc::new(RecordingNotifier::default()));
        let calls = AtomicU32::new(0);
        let policy = RetryPolicy { max_retries: 2, ..RetryPolicy::default() };

        let result = handler.with_retry(fails_times(&calls, u32::MAX), &policy).await;

        assert!(result.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 3);
        assert_eq!(logger.entries().len(), 1);
    }
}
