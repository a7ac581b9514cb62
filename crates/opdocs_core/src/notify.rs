//! User-facing notifications.
//!
//! Core never renders UI; it hands short messages plus a severity to a `Notifier`.

use crate::client::ClientError;
use crate::service::save::{SaveFailure, SaveResult};
use log::{error, info, warn};

pub const CONFLICT_MESSAGE: &str = "Update conflict: please reload the task.";
pub const RATE_LIMITED_MESSAGE: &str = "Too many requests. Please wait 60 seconds.";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Info,
    Success,
    Warning,
    Error,
}

impl Severity {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Info => "info",
            Self::Success => "success",
            Self::Warning => "warning",
            Self::Error => "error",
        }
    }
}

/// Sink for user-facing messages.
pub trait Notifier {
    fn notify(&self, message: &str, severity: Severity);
}

impl<N: Notifier + ?Sized> Notifier for &N {
    fn notify(&self, message: &str, severity: Severity) {
        (**self).notify(message, severity);
    }
}

/// Forwards notifications to the log facade.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogNotifier;

impl Notifier for LogNotifier {
    fn notify(&self, message: &str, severity: Severity) {
        match severity {
            Severity::Info | Severity::Success => info!(
                "event=notify module=notify severity={} message={message}",
                severity.as_str()
            ),
            Severity::Warning => warn!("event=notify module=notify severity=warning message={message}"),
            Severity::Error => error!("event=notify module=notify severity=error message={message}"),
        }
    }
}

/// Message and severity for a failed remote call.
pub fn client_error_message(err: &ClientError) -> (String, Severity) {
    match err {
        ClientError::Conflict(_) => (CONFLICT_MESSAGE.to_string(), Severity::Warning),
        ClientError::RateLimited => (RATE_LIMITED_MESSAGE.to_string(), Severity::Error),
        other => (format!("Failed to save task: {other}"), Severity::Error),
    }
}

pub fn notify_client_error(notifier: &impl Notifier, err: &ClientError) {
    let (message, severity) = client_error_message(err);
    notifier.notify(&message, severity);
}

/// Reports a save outcome. Successful updates stay silent.
pub fn notify_save_result(notifier: &impl Notifier, result: &SaveResult) {
    match result {
        SaveResult::Created { id, .. } => {
            notifier.notify(&format!("Task #{id} created."), Severity::Success)
        }
        SaveResult::Updated { .. } => {}
        SaveResult::Conflict => notifier.notify(CONFLICT_MESSAGE, Severity::Warning),
        SaveResult::Failed(SaveFailure::Client(err)) => notify_client_error(notifier, err),
        SaveResult::Failed(failure) => notifier.notify(
            &format!("Failed to save task: {failure}"),
            Severity::Error,
        ),
    }
}
