//! Refresh coordinator: at most one token refresh in flight.
//!
//! ARCHITECTURE
//! ============
//! `RefreshState` is `Idle` or `Refreshing(handle)`. The first caller to see
//! `Idle` spawns the refresh on a tokio task and stores a `Shared` handle to
//! its result; every later caller clones that handle and awaits the same
//! outcome. The Idle check and the transition to `Refreshing` happen under one
//! lock acquisition with no `.await` in between.
//!
//! The refresh runs on its own task so that it settles, and the state returns
//! to `Idle`, even if every waiting caller is dropped. A drop guard inside the
//! task resets the state on panic as well.

use std::sync::{Arc, Mutex, PoisonError};

use futures::FutureExt;
use futures::future::{BoxFuture, Shared};
use serde::Deserialize;
use serde_json::json;
use tracing::{info, warn};

use crate::error::{GatewayError, RefreshFailure};
use crate::headers::{AUTHORIZATION, HeaderStore, bearer, build_refresh_headers};
use crate::token_store::TokenStore;
use crate::transport::HttpTransport;
use crate::types::{ApiRequest, ApiResponse, Envelope, TokenPair};

type RefreshHandle = Shared<BoxFuture<'static, Result<TokenPair, RefreshFailure>>>;

enum RefreshState {
    Idle,
    Refreshing(RefreshHandle),
}

/// What a caller learns from asking for a refreshed token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RefreshOutcome {
    /// New tokens are stored and installed.
    Refreshed(TokenPair),
    /// No refresh token is stored; nothing was attempted.
    NoRefreshToken,
    /// The refresh failed. `joined` is true when this caller waited on a
    /// refresh another request had started.
    Failed { failure: RefreshFailure, joined: bool },
}

#[derive(Clone)]
pub struct RefreshCoordinator {
    state: Arc<Mutex<RefreshState>>,
    transport: Arc<dyn HttpTransport>,
    tokens: TokenStore,
    headers: HeaderStore,
    refresh_path: String,
}

impl RefreshCoordinator {
    #[must_use]
    pub fn new(
        transport: Arc<dyn HttpTransport>,
        tokens: TokenStore,
        headers: HeaderStore,
        refresh_path: impl Into<String>,
    ) -> Self {
        Self {
            state: Arc::new(Mutex::new(RefreshState::Idle)),
            transport,
            tokens,
            headers,
            refresh_path: refresh_path.into(),
        }
    }

    /// Whether a refresh is currently outstanding.
    #[must_use]
    pub fn is_refreshing(&self) -> bool {
        matches!(*self.state.lock().unwrap_or_else(PoisonError::into_inner), RefreshState::Refreshing(_))
    }

    /// Join the in-flight refresh, or start one if a refresh token exists.
    pub async fn refresh(&self) -> RefreshOutcome {
        let (handle, joined) = {
            let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
            match &*state {
                RefreshState::Refreshing(handle) => (handle.clone(), true),
                RefreshState::Idle => {
                    let Some(refresh_token) = self.tokens.get().refresh_token else {
                        return RefreshOutcome::NoRefreshToken;
                    };
                    let handle = self.spawn_refresh(refresh_token);
                    *state = RefreshState::Refreshing(handle.clone());
                    (handle, false)
                }
            }
        };

        match handle.await {
            Ok(pair) => RefreshOutcome::Refreshed(pair),
            Err(failure) => RefreshOutcome::Failed { failure, joined },
        }
    }

    fn spawn_refresh(&self, refresh_token: String) -> RefreshHandle {
        let state = Arc::clone(&self.state);
        let transport = Arc::clone(&self.transport);
        let tokens = self.tokens.clone();
        let headers = self.headers.clone();
        let request = ApiRequest::post(self.refresh_path.clone(), json!({ "refreshToken": refresh_token }));

        let task = tokio::spawn(async move {
            let _idle = IdleOnDrop(state);
            info!(path = %request.path, "refreshing access token");

            let mut request = request;
            request.headers = build_refresh_headers(&headers);
            let result = match transport.send(&request).await {
                Ok(response) => parse_refresh_response(&response),
                Err(e) => Err(transport_failure(&e)),
            };

            let result = result.and_then(|pair| {
                tokens
                    .set(&pair.access_token, &pair.refresh_token)
                    .map_err(|e| RefreshFailure::Storage(e.to_string()))?;
                headers.add(AUTHORIZATION, &bearer(&pair.access_token));
                Ok(pair)
            });

            match &result {
                Ok(_) => info!("access token refreshed"),
                Err(failure) => warn!(error = %failure, "token refresh failed"),
            }
            result
        });

        task.map(|joined| joined.unwrap_or_else(|e| Err(RefreshFailure::Aborted(e.to_string()))))
            .boxed()
            .shared()
    }
}

/// Returns the coordinator to `Idle` when the refresh task ends, however it ends.
struct IdleOnDrop(Arc<Mutex<RefreshState>>);

impl Drop for IdleOnDrop {
    fn drop(&mut self) {
        *self.0.lock().unwrap_or_else(PoisonError::into_inner) = RefreshState::Idle;
    }
}

fn transport_failure(err: &GatewayError) -> RefreshFailure {
    match err {
        GatewayError::Transport(message) => RefreshFailure::Transport(message.clone()),
        other => RefreshFailure::Transport(other.to_string()),
    }
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RefreshData {
    access_token: Option<String>,
    refresh_token: Option<String>,
}

/// Accept only a classified success whose envelope says `success: true` and
/// carries both new tokens.
fn parse_refresh_response(response: &ApiResponse) -> Result<TokenPair, RefreshFailure> {
    let rejected = || RefreshFailure::Rejected { status: response.status, message: response.failure_message() };

    if !response.is_success() {
        return Err(rejected());
    }
    let Some(json) = response.body.as_json() else {
        return Err(RefreshFailure::MalformedBody("expected a JSON body".into()));
    };
    let envelope: Envelope<RefreshData> =
        serde_json::from_value(json.clone()).map_err(|e| RefreshFailure::MalformedBody(e.to_string()))?;
    if !envelope.success {
        return Err(rejected());
    }

    let data = envelope
        .data
        .ok_or_else(|| RefreshFailure::MalformedBody("missing data".into()))?;
    match (data.access_token, data.refresh_token) {
        (Some(access_token), Some(refresh_token)) if !access_token.is_empty() && !refresh_token.is_empty() => {
            Ok(TokenPair { access_token, refresh_token })
        }
        _ => Err(RefreshFailure::MalformedBody("missing accessToken or refreshToken".into())),
    }
}

#[cfg(test)]
#[path = "refresh_test.rs"]
mod tests;
