//! Global header set and per-request header injection.
//!
//! DESIGN
//! ======
//! `HeaderStore` is the process-wide header set, but as an explicit value: the
//! application root creates one and hands clones of it to the gateway. Clones
//! share the same underlying map.

use std::sync::{Arc, PoisonError, RwLock};

use crate::token_store::TokenStore;
use crate::types::{Headers, remove_header, set_header};

pub const AUTHORIZATION: &str = "Authorization";
pub const X_AUTH_TOKEN: &str = "X-Auth-Token";

/// Shared, mutable set of headers applied to every request.
#[derive(Clone, Debug, Default)]
pub struct HeaderStore {
    inner: Arc<RwLock<Headers>>,
}

impl HeaderStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add or replace a global header.
    pub fn add(&self, name: &str, value: &str) {
        let mut headers = self.inner.write().unwrap_or_else(PoisonError::into_inner);
        set_header(&mut headers, name, value);
    }

    /// Remove a global header in any casing.
    pub fn remove(&self, name: &str) {
        let mut headers = self.inner.write().unwrap_or_else(PoisonError::into_inner);
        remove_header(&mut headers, name);
    }

    #[must_use]
    pub fn get(&self, name: &str) -> Option<String> {
        let headers = self.inner.read().unwrap_or_else(PoisonError::into_inner);
        crate::types::header_value(&headers, name).map(str::to_string)
    }

    /// Copy of the current header set.
    #[must_use]
    pub fn snapshot(&self) -> Headers {
        self.inner.read().unwrap_or_else(PoisonError::into_inner).clone()
    }
}

/// Header values that are stringified `undefined`/`null` leaks, not data.
fn is_usable_value(value: &str) -> bool {
    !value.is_empty() && value != "undefined" && value != "null"
}

/// Build the final header set for an outgoing request.
///
/// Request headers first, then every usable global header on top, then the
/// auth pair when a non-blank access token is stored.
#[must_use]
pub fn build_headers(request: &Headers, globals: &HeaderStore, tokens: &TokenStore) -> Headers {
    let mut headers = request.clone();

    for (name, value) in globals.snapshot() {
        if is_usable_value(&value) {
            set_header(&mut headers, &name, &value);
        }
    }

    if let Some(token) = tokens.get().access_token.filter(|t| !t.trim().is_empty()) {
        set_header(&mut headers, AUTHORIZATION, &bearer(&token));
        set_header(&mut headers, X_AUTH_TOKEN, &token);
    }

    headers
}

/// Headers for the refresh call: globals only, never a stale access token.
#[must_use]
pub fn build_refresh_headers(globals: &HeaderStore) -> Headers {
    let mut headers = Headers::new();
    for (name, value) in globals.snapshot() {
        if is_usable_value(&value) {
            set_header(&mut headers, &name, &value);
        }
    }
    remove_header(&mut headers, AUTHORIZATION);
    remove_header(&mut headers, X_AUTH_TOKEN);
    headers
}

#[must_use]
pub fn bearer(token: &str) -> String {
    format!("Bearer {token}")
}

#[cfg(test)]
#[path = "headers_test.rs"]
mod tests;
