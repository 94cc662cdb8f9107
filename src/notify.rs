//! Outbound ports for user-visible side effects.
//!
//! The gateway never talks to a UI toolkit directly. The embedding
//! application registers a [`NotificationSink`] and a [`Navigator`] at
//! construction; without them, notifications and redirects are logged.

use std::time::Duration;

use tracing::{info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Error,
    Warning,
    Info,
    Success,
}

impl Severity {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Error => "error",
            Self::Warning => "warning",
            Self::Info => "info",
            Self::Success => "success",
        }
    }
}

/// A transient user-facing message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    pub message: String,
    pub severity: Severity,
    pub duration: Duration,
}

/// Receives notifications, e.g. a toast system.
pub trait NotificationSink: Send + Sync {
    fn notify(&self, notification: Notification);
}

/// Browser-style navigation.
pub trait Navigator: Send + Sync {
    /// Path of the current location, without query string.
    fn current_path(&self) -> String;

    /// Navigate to `target` (path plus query).
    fn navigate(&self, target: &str);
}

/// Fallback sink: emits the notification as a log warning.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogSink;

impl NotificationSink for LogSink {
    fn notify(&self, notification: Notification) {
        warn!(
            severity = notification.severity.as_str(),
            duration_ms = u64::try_from(notification.duration.as_millis()).unwrap_or(u64::MAX),
            "{}",
            notification.message
        );
    }
}

/// Fallback navigator for headless embedders: never on the sign-in page,
/// logs every navigation target.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogNavigator;

impl Navigator for LogNavigator {
    fn current_path(&self) -> String {
        String::new()
    }

    fn navigate(&self, target: &str) {
        info!(%target, "navigation requested");
    }
}

/// Why the session was ended; rendered as the sign-in `reason` parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogoutReason {
    RoleChanged,
    SessionExpired,
    AuthFailed,
}

impl LogoutReason {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::RoleChanged => "role_changed",
            Self::SessionExpired => "session_expired",
            Self::AuthFailed => "auth_failed",
        }
    }
}

/// `<sign_in_path>?reason=<reason>`.
#[must_use]
pub fn sign_in_target(sign_in_path: &str, reason: LogoutReason) -> String {
    format!("{sign_in_path}?reason={}", reason.as_str())
}
