//! Session policy: what to do about a 401.
//!
//! DESIGN
//! ======
//! Classification is a pure function over the request path, the response
//! body, and the stored tokens, so every precedence rule is unit-testable.
//! `SessionPolicy` carries out the side effects: clearing the session,
//! notifying, and redirecting to sign-in.
//!
//! PRECEDENCE
//! ==========
//! First match wins:
//! 1. registration endpoint   -> pass through
//! 2. login endpoint          -> pass through
//! 3. guest on public endpoint -> pass through
//! 4. role-change body        -> forced logout (`role_changed`)
//! 5. auth-subsystem endpoint -> forced logout (`auth_failed`)
//! 6. anything else           -> refresh
//!
//! The role-change markers are substring matches against backend wording.
//! They are a contract with the backend; changing either side breaks it.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use serde_json::Value;
use tracing::{debug, info};

use crate::config::GatewayConfig;
use crate::notify::{LogoutReason, Navigator, Notification, NotificationSink, Severity, sign_in_target};
use crate::token_store::{StoredTokens, TokenStore};
use crate::types::ResponseBody;

pub const PUBLIC_ENDPOINT_PATTERNS: [&str; 3] = ["/transport-service/public", "/common-service/categories", "/search"];
// Login paths are matched by `LOGIN_PATTERN` before these are consulted.
pub const AUTH_ENDPOINT_PATTERNS: [&str; 4] = ["/refresh", "/verify", "/auth", "-auth/"];
pub const ROLE_CHANGE_MARKERS: [&str; 3] = ["role change", "Session expired due to role change", "Token invalidated"];

const REGISTRATION_PATTERN: &str = "/register";
const LOGIN_PATTERN: &str = "/login";

// =============================================================================
// CLASSIFICATION
// =============================================================================

/// Outcome of classifying a single 401.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnauthorizedPolicy {
    /// Registration owns its errors; never logout.
    RegistrationEndpoint,
    /// Bad credentials on login; the form shows them inline.
    LoginEndpoint,
    /// Unauthenticated visitor probing public data.
    GuestOnPublicEndpoint,
    /// Backend invalidated the session because the user's role changed.
    RoleChanged,
    /// The auth subsystem itself rejected the call; unrecoverable.
    AuthEndpointFailure,
    /// Ordinary expiry; refresh and replay.
    RefreshEligible,
}

impl UnauthorizedPolicy {
    /// Policies that hand the 401 back to the caller untouched.
    #[must_use]
    pub fn passes_through(self) -> bool {
        matches!(self, Self::RegistrationEndpoint | Self::LoginEndpoint | Self::GuestOnPublicEndpoint)
    }
}

#[must_use]
pub fn classify_unauthorized(path: &str, body: &ResponseBody, tokens: &StoredTokens) -> UnauthorizedPolicy {
    let path = path_only(path);

    if is_registration_endpoint(path) {
        UnauthorizedPolicy::RegistrationEndpoint
    } else if path.contains(LOGIN_PATTERN) {
        UnauthorizedPolicy::LoginEndpoint
    } else if tokens.is_empty() && is_public_endpoint(path) {
        UnauthorizedPolicy::GuestOnPublicEndpoint
    } else if is_role_change(body) {
        UnauthorizedPolicy::RoleChanged
    } else if is_auth_endpoint(path) {
        UnauthorizedPolicy::AuthEndpointFailure
    } else {
        UnauthorizedPolicy::RefreshEligible
    }
}

/// Re-check for a 401 that survived the whole pipeline: only registration and
/// guest/public calls may still pass through.
#[must_use]
pub fn fallback_passes_through(path: &str, tokens: &StoredTokens) -> bool {
    let path = path_only(path);
    is_registration_endpoint(path) || (tokens.is_empty() && is_public_endpoint(path))
}

#[must_use]
pub fn is_public_endpoint(path: &str) -> bool {
    PUBLIC_ENDPOINT_PATTERNS.iter().any(|p| path.contains(p))
}

#[must_use]
pub fn is_registration_endpoint(path: &str) -> bool {
    path.contains(REGISTRATION_PATTERN)
}

#[must_use]
pub fn is_auth_endpoint(path: &str) -> bool {
    AUTH_ENDPOINT_PATTERNS.iter().any(|p| path.contains(p))
}

#[must_use]
pub fn is_role_change(body: &ResponseBody) -> bool {
    let Some(json) = body.as_json() else {
        return false;
    };
    if json.get("roleChanged") == Some(&Value::Bool(true)) {
        return true;
    }
    body.message()
        .is_some_and(|message| ROLE_CHANGE_MARKERS.iter().any(|m| message.contains(m)))
}

fn path_only(path: &str) -> &str {
    path.split_once('?').map_or(path, |(p, _)| p)
}

// =============================================================================
// SIDE EFFECTS
// =============================================================================

/// Executes forced logouts: clear, notify, redirect.
#[derive(Clone)]
pub struct SessionPolicy {
    tokens: TokenStore,
    sink: Arc<dyn NotificationSink>,
    navigator: Arc<dyn Navigator>,
    sign_in_path: String,
    redirect_delay: Duration,
    notification_duration: Duration,
    /// Set while a notified redirect is waiting to fire.
    redirect_pending: Arc<AtomicBool>,
}

impl SessionPolicy {
    #[must_use]
    pub fn new(
        config: &GatewayConfig,
        tokens: TokenStore,
        sink: Arc<dyn NotificationSink>,
        navigator: Arc<dyn Navigator>,
    ) -> Self {
        Self {
            tokens,
            sink,
            navigator,
            sign_in_path: config.sign_in_path.clone(),
            redirect_delay: config.redirect_delay,
            notification_duration: config.notification_duration,
            redirect_pending: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn handle_role_change(&self) {
        self.force_logout(
            LogoutReason::RoleChanged,
            Severity::Warning,
            "Your role has been updated. Please log in again to continue.".to_string(),
        );
    }

    pub fn handle_auth_failure(&self, detail: &str) {
        self.force_logout(
            LogoutReason::AuthFailed,
            Severity::Error,
            format!("Authentication failed: {detail}. Please sign in again."),
        );
    }

    pub fn handle_unhandled_unauthorized(&self) {
        self.force_logout(
            LogoutReason::SessionExpired,
            Severity::Error,
            "Your session has ended (unhandled authentication error). Please sign in again.".to_string(),
        );
    }

    #[must_use]
    pub fn redirect_pending(&self) -> bool {
        self.redirect_pending.load(Ordering::SeqCst)
    }

    fn force_logout(&self, reason: LogoutReason, severity: Severity, message: String) {
        self.tokens.clear();
        let target = sign_in_target(&self.sign_in_path, reason);
        info!(reason = reason.as_str(), "session cleared; redirecting to sign-in");

        if self.on_sign_in_page() {
            self.navigator.navigate(&target);
            return;
        }

        if self.redirect_pending.swap(true, Ordering::SeqCst) {
            debug!(reason = reason.as_str(), "redirect already pending; skipping duplicate notification");
            return;
        }

        self.sink.notify(Notification { message, severity, duration: self.notification_duration });

        if self.redirect_delay.is_zero() {
            self.navigator.navigate(&target);
            self.redirect_pending.store(false, Ordering::SeqCst);
            return;
        }

        let navigator = Arc::clone(&self.navigator);
        let pending = Arc::clone(&self.redirect_pending);
        let delay = self.redirect_delay;
        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            navigator.navigate(&target);
            pending.store(false, Ordering::SeqCst);
        });
    }

    fn on_sign_in_page(&self) -> bool {
        let current = self.navigator.current_path();
        path_only(&current).trim_end_matches('/') == self.sign_in_path.trim_end_matches('/')
    }
}

#[cfg(test)]
#[path = "policy_test.rs"]
mod tests;
