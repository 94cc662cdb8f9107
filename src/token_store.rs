//! Token store: single source of truth for the current session.
//!
//! Reads never fail: a broken storage backend looks like a guest session and
//! is logged, so one unreadable file cannot take every request down with it.

use std::sync::Arc;

use tracing::warn;

use crate::error::GatewayError;
use crate::headers::{AUTHORIZATION, HeaderStore};
use crate::storage::SessionStorage;
use crate::types::SessionUser;

pub const ACCESS_TOKEN_KEY: &str = "jwt_access_token";
pub const REFRESH_TOKEN_KEY: &str = "jwt_refresh_token";
pub const USER_KEY: &str = "user";
pub const USER_ROLE_KEY: &str = "userRole";

/// Tokens as currently stored. Either side may be missing.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StoredTokens {
    pub access_token: Option<String>,
    pub refresh_token: Option<String>,
}

/// Authentication state derived from [`StoredTokens`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// Both tokens present.
    Authenticated,
    /// Anything less: a lone access token cannot be refreshed.
    Guest,
}

impl StoredTokens {
    #[must_use]
    pub fn state(&self) -> SessionState {
        if self.access_token.is_some() && self.refresh_token.is_some() {
            SessionState::Authenticated
        } else {
            SessionState::Guest
        }
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.access_token.is_none() && self.refresh_token.is_none()
    }
}

#[derive(Clone)]
pub struct TokenStore {
    storage: Arc<dyn SessionStorage>,
    headers: HeaderStore,
}

impl TokenStore {
    #[must_use]
    pub fn new(storage: Arc<dyn SessionStorage>, headers: HeaderStore) -> Self {
        Self { storage, headers }
    }

    /// Current tokens. Empty strings count as absent.
    #[must_use]
    pub fn get(&self) -> StoredTokens {
        StoredTokens {
            access_token: self.read(ACCESS_TOKEN_KEY),
            refresh_token: self.read(REFRESH_TOKEN_KEY),
        }
    }

    /// Persist a new token pair.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::Storage`] if either write fails. A failure on
    /// the second write can leave the first one applied.
    pub fn set(&self, access_token: &str, refresh_token: &str) -> Result<(), GatewayError> {
        self.storage.set_item(ACCESS_TOKEN_KEY, access_token)?;
        self.storage.set_item(REFRESH_TOKEN_KEY, refresh_token)
    }

    /// Remove tokens, the user snapshot, and the global `Authorization` header.
    pub fn clear(&self) {
        for key in [ACCESS_TOKEN_KEY, REFRESH_TOKEN_KEY, USER_KEY, USER_ROLE_KEY] {
            if let Err(e) = self.storage.remove_item(key) {
                warn!(error = %e, key, "failed to remove session entry");
            }
        }
        self.headers.remove(AUTHORIZATION);
    }

    /// Persist the user snapshot and its role.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::Storage`] if a write fails.
    pub fn set_user(&self, user: &SessionUser) -> Result<(), GatewayError> {
        let raw = serde_json::to_string(user).map_err(|e| GatewayError::Storage(e.to_string()))?;
        self.storage.set_item(USER_KEY, &raw)?;
        self.storage.set_item(USER_ROLE_KEY, &user.role)
    }

    /// Last-known user, if one is stored and decodes.
    #[must_use]
    pub fn user(&self) -> Option<SessionUser> {
        let raw = self.read(USER_KEY)?;
        match serde_json::from_str(&raw) {
            Ok(user) => Some(user),
            Err(e) => {
                warn!(error = %e, "stored user snapshot is not valid JSON");
                None
            }
        }
    }

    #[must_use]
    pub fn role(&self) -> Option<String> {
        self.read(USER_ROLE_KEY)
    }

    #[must_use]
    pub fn session_state(&self) -> SessionState {
        self.get().state()
    }

    fn read(&self, key: &str) -> Option<String> {
        match self.storage.get_item(key) {
            Ok(value) => value.filter(|v| !v.is_empty()),
            Err(e) => {
                warn!(error = %e, key, "session storage read failed; treating as absent");
                None
            }
        }
    }
}

#[cfg(test)]
#[path = "token_store_test.rs"]
mod tests;
