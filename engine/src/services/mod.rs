pub mod error_handler;
pub mod reporting;

pub use error_handler::ErrorHandler;
pub use reporting::{ErrorLogger, Notifier, TracingErrorLogger, TracingNotifier};
