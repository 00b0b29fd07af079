// Engine settings, loaded from a JSON file or falling back to defaults
use crate::error::EngineError;
use crate::services::error_handler::{circuit_breaker, CircuitBreaker, RetryPolicy};
use serde::Deserialize;
use std::path::Path;
use std::time::Duration;

#[derive(Debug, Deserialize, Clone, PartialEq)]
#[serde(default)]
pub struct EngineSettings {
    /// Default tracing filter; `RUST_LOG` takes precedence when set.
    pub log_level: String,
    pub retry: RetrySettings,
    pub circuit_breaker: CircuitBreakerSettings,
    pub import: ImportSettings,
}

#[derive(Debug, Deserialize, Clone, PartialEq)]
#[serde(default)]
pub struct RetrySettings {
    pub max_retries: u32,
    pub base_delay_ms: u64,
    pub max_delay_ms: u64,
    pub exponential_base: f64,
}

#[derive(Debug, Deserialize, Clone, PartialEq, Eq)]
#[serde(default)]
pub struct CircuitBreakerSettings {
    pub failure_threshold: u32,
    pub recovery_time_ms: u64,
}

#[derive(Debug, Deserialize, Clone, PartialEq, Eq)]
#[serde(default)]
pub struct ImportSettings {
    pub delimiter: char,
}

impl Default for EngineSettings {
    fn default() -> Self {
        EngineSettings {
            log_level: "info".to_string(),
            retry: RetrySettings::default(),
            circuit_breaker: CircuitBreakerSettings::default(),
            import: ImportSettings::default(),
        }
    }
}

impl Default for RetrySettings {
    fn default() -> Self {
        RetrySettings {
            max_retries: 3,
            base_delay_ms: 1000,
            max_delay_ms: 10_000,
            exponential_base: 2.0,
        }
    }
}

impl Default for CircuitBreakerSettings {
    fn default() -> Self {
        CircuitBreakerSettings {
            failure_threshold: 5,
            recovery_time_ms: 60_000,
        }
    }
}

impl Default for ImportSettings {
    fn default() -> Self {
        ImportSettings { delimiter: ',' }
    }
}

impl EngineSettings {
    /// Reads settings from a JSON file. Missing sections and keys keep their defaults.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, EngineError> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path)?;
        let settings: EngineSettings = serde_json::from_str(&raw)?;
        settings.validate()?;
        tracing::debug!(path = %path.display(), "Loaded engine settings");
        Ok(settings)
    }

    pub fn validate(&self) -> Result<(), EngineError> {
        if !self.retry.exponential_base.is_finite() || self.retry.exponential_base < 0.0 {
            return Err(EngineError::ConfigError(format!(
                "retry.exponential_base must be a non-negative number, got {}",
                self.retry.exponential_base
            )));
        }
        if self.retry.max_delay_ms < self.retry.base_delay_ms {
            return Err(EngineError::ConfigError(format!(
                "retry.max_delay_ms ({}) is smaller than retry.base_delay_ms ({})",
                self.retry.max_delay_ms, self.retry.base_delay_ms
            )));
        }
        if self.circuit_breaker.failure_threshold == 0 {
            return Err(EngineError::ConfigError(
                "circuit_breaker.failure_threshold must be greater than 0".to_string(),
            ));
        }
        if !self.import.delimiter.is_ascii() {
            return Err(EngineError::ConfigError(format!(
                "import.delimiter must be a single ASCII character, got '{}'",
                self.import.delimiter
            )));
        }
        Ok(())
    }
}

impl From<&RetrySettings> for RetryPolicy {
    fn from(settings: &RetrySettings) -> Self {
        RetryPolicy {
            max_retries: settings.max_retries,
            base_delay: Duration::from_millis(settings.base_delay_ms),
            max_delay: Duration::from_millis(settings.max_delay_ms),
            exponential_base: settings.exponential_base,
        }
    }
}

impl CircuitBreakerSettings {
    pub fn recovery_time(&self) -> Duration {
        Duration::from_millis(self.recovery_time_ms)
    }

    /// Guards `operation` with a breaker configured from these settings.
    /// Build it once and share it; a per-call breaker never sees enough failures to open.
    pub fn breaker<F>(&self, operation: F) -> CircuitBreaker<F> {
        circuit_breaker(operation, self.failure_threshold, self.recovery_time())
    }
}
