// Collaborator seams for error reporting and user notifications.
//
// The executor never talks to a log sink or a toast surface directly; it is
// handed implementations of these traits so the control flow can be exercised
// without any I/O.
use shared::models::{ErrorLogEntry, Notification, NotificationVariant, Severity};

/// Receives failure records for external reporting. Delivery is best-effort:
/// callers swallow the returned error.
pub trait ErrorLogger: Send + Sync {
    fn log_error(&self, entry: &ErrorLogEntry) -> anyhow::Result<()>;
}

/// Surfaces a short message to the user (toast, status bar, terminal line).
pub trait Notifier: Send + Sync {
    fn notify(&self, notification: Notification);
}

/// Hands `entry` to `logger`, tracing (never propagating) a delivery failure.
pub fn report_best_effort(logger: &dyn ErrorLogger, entry: &ErrorLogEntry) {
    if let Err(e) = logger.log_error(entry) {
        tracing::warn!(entry_id = %entry.id, error = %e, "Failed to deliver error log entry");
    }
}

/// Emits entries as tracing events with the serialized record attached.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingErrorLogger;

impl ErrorLogger for TracingErrorLogger {
    fn log_error(&self, entry: &ErrorLogEntry) -> anyhow::Result<()> {
        let record = serde_json::to_string(entry)?;
        match entry.severity {
            Severity::Critical | Severity::High => tracing::error!(
                category = entry.category.as_str(),
                severity = entry.severity.as_str(),
                record = %record,
                "{}", entry.message
            ),
            Severity::Medium | Severity::Low => tracing::warn!(
                category = entry.category.as_str(),
                severity = entry.severity.as_str(),
                record = %record,
                "{}", entry.message
            ),
        }
        Ok(())
    }
}

#[derive(Debug, Default, Clone, Copy)]
pub struct TracingNotifier;

impl Notifier for TracingNotifier {
    fn notify(&self, notification: Notification) {
        match notification.variant {
            NotificationVariant::Destructive => {
                tracing::error!(title = %notification.title, "{}", notification.description)
            }
            NotificationVariant::Default | NotificationVariant::Success => {
                tracing::info!(title = %notification.title, "{}", notification.description)
            }
        }
    }
}
