// Message-based error classification and user messaging
use super::ErrorHandler;
use serde_json::{Map, Value};
use shared::models::{ErrorCategory, ErrorLogEntry, Notification, NotificationVariant, Severity};

pub const NETWORK_MESSAGE: &str = "Network error. Please check your internet connection and try again.";
pub const TIMEOUT_MESSAGE: &str = "The request timed out. Please try again.";
pub const UNAUTHORIZED_MESSAGE: &str = "You don't have permission to perform this action.";
pub const NOT_FOUND_MESSAGE: &str = "The requested resource was not found.";
pub const GENERIC_MESSAGE: &str = "Something went wrong. Please try again later.";

const ERROR_TITLE: &str = "Error";

/// Outcome of `ErrorHandler::handle_error`.
#[derive(Debug, Clone, PartialEq)]
pub struct HandledError {
    pub entry: ErrorLogEntry,
    pub user_message: &'static str,
}

pub fn classify_severity(message: &str) -> Severity {
    let lower = message.to_lowercase();
    if lower.contains("auth") {
        Severity::Critical
    } else if lower.contains("network") || lower.contains("database") {
        Severity::High
    } else {
        Severity::Medium
    }
}

/// First matching rule wins, so "network timeout" is reported as a network problem.
pub fn user_message(message: &str) -> &'static str {
    let lower = message.to_lowercase();
    if lower.contains("network") {
        NETWORK_MESSAGE
    } else if lower.contains("timeout") {
        TIMEOUT_MESSAGE
    } else if lower.contains("unauthorized") {
        UNAUTHORIZED_MESSAGE
    } else if lower.contains("not found") {
        NOT_FOUND_MESSAGE
    } else {
        GENERIC_MESSAGE
    }
}

fn trace_of(error: &anyhow::Error) -> Option<String> {
    let causes: Vec<String> = error.chain().skip(1).map(ToString::to_string).collect();
    if causes.is_empty() {
        None
    } else {
        Some(causes.join("\ncaused by: "))
    }
}

impl ErrorHandler {
    /// Logs `error` and, when `show_toast` is set, tells the user what went wrong.
    pub fn handle_error(&self, error: &anyhow::Error, context: Map<String, Value>, show_toast: bool) -> HandledError {
        let message = error.to_string();
        let severity = classify_severity(&message);
        let entry = ErrorLogEntry::new(ErrorCategory::Application, severity, message.clone())
            .with_trace(trace_of(error))
            .with_context(context);
        self.report(&entry);

        let user_message = user_message(&message);
        if show_toast {
            self.notifier.notify(Notification {
                title: ERROR_TITLE.to_string(),
                description: user_message.to_string(),
                variant: NotificationVariant::Destructive,
            });
        }

        HandledError { entry, user_message }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::reporting::testing::{RecordingLogger, RecordingNotifier};
    use anyhow::anyhow;
    use serde_json::json;
    use std::sync::Arc;

    fn handler() -> (ErrorHandler, Arc<RecordingLogger>, Arc<RecordingNotifier>) {
        let logger = Arc::new(RecordingLogger::default());
        let notifier = Arc::new(RecordingNotifier::default());
        (ErrorHandler::new(logger.clone(), notifier.clone()), logger, notifier)
    }

    #[test]
    fn test_classify_severity() {
        assert_eq!(classify_severity("Auth token expired"), Severity::Critical);
        assert_eq!(classify_severity("Unauthorized"), Severity::Critical);
        assert_eq!(classify_severity("NETWORK unreachable"), Severity::High);
        assert_eq!(classify_severity("database deadlock"), Severity::High);
        assert_eq!(classify_severity("value out of range"), Severity::Medium);
    }

    #[test]
    fn test_user_message_priority() {
        assert_eq!(user_message("network timeout"), NETWORK_MESSAGE);
        assert_eq!(user_message("Request Timeout"), TIMEOUT_MESSAGE);
        assert_eq!(user_message("401 Unauthorized"), UNAUTHORIZED_MESSAGE);
        assert_eq!(user_message("Item not found"), NOT_FOUND_MESSAGE);
        assert_eq!(user_message("constraint violated"), GENERIC_MESSAGE);
    }

    #[test]
    fn test_handle_error_logs_and_notifies() {
        let (handler, logger, notifier) = handler();
        let mut context = Map::new();
        context.insert("screen".to_string(), json!("grn_entry"));

        let handled = handler.handle_error(&anyhow!("Network request failed"), context, true);

        assert_eq!(handled.user_message, NETWORK_MESSAGE);
        assert_eq!(handled.entry.severity, Severity::High);
        assert_eq!(handled.entry.category, ErrorCategory::Application);

        let entries = logger.entries();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].message, "Network request failed");
        assert_eq!(entries[0].context["screen"], json!("grn_entry"));

        let notifications = notifier.notifications();
        assert_eq!(notifications.len(), 1);
        assert_eq!(notifications[0].title, "Error");
        assert_eq!(notifications[0].description, NETWORK_MESSAGE);
        assert_eq!(notifications[0].variant, NotificationVariant::Destructive);
    }

    #[test]
    fn test_handle_error_without_toast_still_logs() {
        let (handler, logger, notifier) = handler();
        let handled = handler.handle_error(&anyhow!("auth session missing"), Map::new(), false);

        assert_eq!(handled.entry.severity, Severity::Critical);
        assert_eq!(logger.entries().len(), 1);
        assert!(notifier.notifications().is_empty());
    }

    #[test]
    fn test_handle_error_records_cause_chain() {
        let (handler, logger, _) = handler();
        let error = anyhow!("connection reset").context("stock sync failed");

        let handled = handler.handle_error(&error, Map::new(), true);

        assert_eq!(handled.entry.message, "stock sync failed");
        assert_eq!(handled.entry.trace.as_deref(), Some("connection reset"));
        assert_eq!(handled.user_message, GENERIC_MESSAGE);
        assert_eq!(logger.entries()[0].trace.as_deref(), Some("connection reset"));
    }

    #[test]
    fn test_handle_error_survives_failing_logger() {
        let logger = Arc::new(RecordingLogger::failing());
        let notifier = Arc::new(RecordingNotifier::default());
        let handler = ErrorHandler::new(logger, notifier.clone());

        let handled = handler.handle_error(&anyhow!("Record not found"), Map::new(), true);

        assert_eq!(handled.user_message, NOT_FOUND_MESSAGE);
        assert_eq!(notifier.notifications().len(), 1);
    }
}
