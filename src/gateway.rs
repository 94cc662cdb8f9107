//! Authenticated request gateway.
//!
//! ARCHITECTURE
//! ============
//! Every request goes through `execute`:
//!
//! ```text
//! build_headers -> transport.send -> non-401? return
//!                                 -> 401: classify_unauthorized
//!                                      pass through | force logout | refresh
//!                                      refresh -> replay once -> 401 again? fallback
//! ```
//!
//! ERROR HANDLING
//! ==============
//! Only transport failures are `Err`. Every HTTP response, including a 401
//! that ended the session, comes back as `Ok(ApiResponse)`; logout and
//! redirect happen alongside returning it. The typed helpers
//! (`request_json` and friends) turn a classifier failure into
//! [`GatewayError::Api`].

use std::sync::Arc;

use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::{Instrument, debug, info_span};
use uuid::Uuid;

use crate::config::GatewayConfig;
use crate::error::GatewayError;
use crate::headers::{HeaderStore, build_headers};
use crate::notify::{LogNavigator, LogSink, Navigator, NotificationSink};
use crate::policy::{SessionPolicy, UnauthorizedPolicy, classify_unauthorized, fallback_passes_through};
use crate::refresh::{RefreshCoordinator, RefreshOutcome};
use crate::storage::{MemoryStorage, SessionStorage};
use crate::token_store::TokenStore;
use crate::transport::{HttpTransport, ReqwestTransport};
use crate::types::{ApiRequest, ApiResponse, Envelope};

// =============================================================================
// BUILDER
// =============================================================================

/// Assembles an [`ApiGateway`] from its ports. Unset ports fall back to
/// in-memory storage, a fresh header set, and logging sink/navigator.
#[derive(Default)]
pub struct GatewayBuilder {
    config: GatewayConfig,
    transport: Option<Arc<dyn HttpTransport>>,
    storage: Option<Arc<dyn SessionStorage>>,
    headers: Option<HeaderStore>,
    sink: Option<Arc<dyn NotificationSink>>,
    navigator: Option<Arc<dyn Navigator>>,
}

impl GatewayBuilder {
    #[must_use]
    pub fn new(config: GatewayConfig) -> Self {
        Self { config, ..Self::default() }
    }

    #[must_use]
    pub fn transport(mut self, transport: Arc<dyn HttpTransport>) -> Self {
        self.transport = Some(transport);
        self
    }

    #[must_use]
    pub fn storage(mut self, storage: Arc<dyn SessionStorage>) -> Self {
        self.storage = Some(storage);
        self
    }

    #[must_use]
    pub fn headers(mut self, headers: HeaderStore) -> Self {
        self.headers = Some(headers);
        self
    }

    #[must_use]
    pub fn notification_sink(mut self, sink: Arc<dyn NotificationSink>) -> Self {
        self.sink = Some(sink);
        self
    }

    #[must_use]
    pub fn navigator(mut self, navigator: Arc<dyn Navigator>) -> Self {
        self.navigator = Some(navigator);
        self
    }

    /// # Errors
    ///
    /// Returns [`GatewayError::HttpClientBuild`] if no transport was given and
    /// the default `reqwest` transport cannot be built.
    pub fn build(self) -> Result<ApiGateway, GatewayError> {
        let transport = match self.transport {
            Some(transport) => transport,
            None => Arc::new(ReqwestTransport::new(self.config.api_base_url.clone(), self.config.timeouts)?),
        };
        let storage = self.storage.unwrap_or_else(|| Arc::new(MemoryStorage::new()));
        let headers = self.headers.unwrap_or_default();
        let sink = self.sink.unwrap_or_else(|| Arc::new(LogSink));
        let navigator = self.navigator.unwrap_or_else(|| Arc::new(LogNavigator));

        let tokens = TokenStore::new(storage, headers.clone());
        let policy = SessionPolicy::new(&self.config, tokens.clone(), sink, navigator);
        let refresh = RefreshCoordinator::new(
            Arc::clone(&transport),
            tokens.clone(),
            headers.clone(),
            self.config.refresh_path.clone(),
        );

        Ok(ApiGateway { inner: Arc::new(GatewayInner { config: self.config, transport, tokens, headers, policy, refresh }) })
    }
}

// =============================================================================
// GATEWAY
// =============================================================================

/// The one request gateway per application. Cheap to clone; clones share
/// tokens, headers, and refresh state.
#[derive(Clone)]
pub struct ApiGateway {
    inner: Arc<GatewayInner>,
}

struct GatewayInner {
    config: GatewayConfig,
    transport: Arc<dyn HttpTransport>,
    tokens: TokenStore,
    headers: HeaderStore,
    policy: SessionPolicy,
    refresh: RefreshCoordinator,
}

impl ApiGateway {
    #[must_use]
    pub fn builder(config: GatewayConfig) -> GatewayBuilder {
        GatewayBuilder::new(config)
    }

    #[must_use]
    pub fn config(&self) -> &GatewayConfig {
        &self.inner.config
    }

    #[must_use]
    pub fn tokens(&self) -> &TokenStore {
        &self.inner.tokens
    }

    /// Global header set; add/remove here to affect every later request.
    #[must_use]
    pub fn headers(&self) -> &HeaderStore {
        &self.inner.headers
    }

    #[must_use]
    pub fn session_policy(&self) -> &SessionPolicy {
        &self.inner.policy
    }

    /// Send a request through the full auth pipeline.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::Transport`] only when no response was received.
    pub async fn request(&self, request: ApiRequest) -> Result<ApiResponse, GatewayError> {
        let span = info_span!("api_request", request_id = %Uuid::new_v4(), method = %request.method, path = %request.path);
        self.execute(request).instrument(span).await
    }

    /// # Errors
    ///
    /// See [`ApiGateway::request`].
    pub async fn get(&self, path: &str) -> Result<ApiResponse, GatewayError> {
        self.request(ApiRequest::get(path)).await
    }

    /// # Errors
    ///
    /// See [`ApiGateway::request`].
    pub async fn post<B: Serialize>(&self, path: &str, body: &B) -> Result<ApiResponse, GatewayError> {
        self.request(ApiRequest::post(path, to_json(body)?)).await
    }

    /// # Errors
    ///
    /// See [`ApiGateway::request`].
    pub async fn put<B: Serialize>(&self, path: &str, body: &B) -> Result<ApiResponse, GatewayError> {
        self.request(ApiRequest::put(path, to_json(body)?)).await
    }

    /// # Errors
    ///
    /// See [`ApiGateway::request`].
    pub async fn patch<B: Serialize>(&self, path: &str, body: &B) -> Result<ApiResponse, GatewayError> {
        self.request(ApiRequest::patch(path, to_json(body)?)).await
    }

    /// # Errors
    ///
    /// See [`ApiGateway::request`].
    pub async fn delete(&self, path: &str) -> Result<ApiResponse, GatewayError> {
        self.request(ApiRequest::delete(path)).await
    }

    /// Send a request and decode the `{success, data}` envelope.
    ///
    /// # Errors
    ///
    /// [`GatewayError::Transport`] when no response arrived,
    /// [`GatewayError::Api`] when the response classified as a failure, and
    /// [`GatewayError::Decode`] when the body is not the expected envelope.
    pub async fn request_json<T: DeserializeOwned>(&self, request: ApiRequest) -> Result<Envelope<T>, GatewayError> {
        let response = self.request(request).await?;
        decode_envelope(&response)
    }

    /// Rotate tokens now, sharing any refresh already in flight.
    pub async fn refresh_session(&self) -> RefreshOutcome {
        self.inner.refresh.refresh().await
    }

    async fn execute(&self, request: ApiRequest) -> Result<ApiResponse, GatewayError> {
        let response = self.send_once(&request).await?;
        debug!(status = response.status, "response received");

        if !response.is_unauthorized() {
            return Ok(response);
        }

        let tokens = self.inner.tokens.get();
        let policy = classify_unauthorized(&request.path, &response.body, &tokens);
        debug!(?policy, "classified 401");

        match policy {
            UnauthorizedPolicy::RegistrationEndpoint
            | UnauthorizedPolicy::LoginEndpoint
            | UnauthorizedPolicy::GuestOnPublicEndpoint => Ok(response),
            UnauthorizedPolicy::RoleChanged => {
                self.inner.policy.handle_role_change();
                Ok(response)
            }
            UnauthorizedPolicy::AuthEndpointFailure => {
                self.inner.policy.handle_auth_failure(&response.failure_message());
                Ok(response)
            }
            UnauthorizedPolicy::RefreshEligible => self.refresh_and_replay(&request, response).await,
        }
    }

    /// Inject headers against the current tokens and send once.
    async fn send_once(&self, request: &ApiRequest) -> Result<ApiResponse, GatewayError> {
        let mut prepared = request.clone();
        prepared.headers = build_headers(&request.headers, &self.inner.headers, &self.inner.tokens);
        self.inner.transport.send(&prepared).await
    }

    async fn refresh_and_replay(&self, request: &ApiRequest, original: ApiResponse) -> Result<ApiResponse, GatewayError> {
        match self.inner.refresh.refresh().await {
            RefreshOutcome::Refreshed(_) => {
                let replayed = self.send_once(request).await?;
                debug!(status = replayed.status, "replayed after refresh");
                if replayed.is_unauthorized() {
                    self.handle_unhandled(request, &replayed);
                }
                Ok(replayed)
            }
            RefreshOutcome::NoRefreshToken => {
                debug!("no refresh token stored; returning 401 unchanged");
                Ok(original)
            }
            RefreshOutcome::Failed { joined: false, .. } => {
                self.inner.policy.handle_auth_failure("Token refresh failed");
                Ok(original)
            }
            RefreshOutcome::Failed { joined: true, .. } => {
                self.inner.policy.handle_auth_failure("token refresh failed during concurrent request");
                Ok(original)
            }
        }
    }

    /// A 401 that made it through refresh and replay. Nothing is ever
    /// silently dropped: either it is a known pass-through or it ends the
    /// session.
    fn handle_unhandled(&self, request: &ApiRequest, response: &ApiResponse) {
        if fallback_passes_through(&request.path, &self.inner.tokens.get()) {
            debug!(status = response.status, "replayed 401 passes through");
            return;
        }
        self.inner.policy.handle_unhandled_unauthorized();
    }
}

fn to_json<B: Serialize>(body: &B) -> Result<serde_json::Value, GatewayError> {
    serde_json::to_value(body).map_err(|e| GatewayError::InvalidRequest(format!("failed to encode request body: {e}")))
}

/// Decode a response into its envelope, mapping classifier failures to
/// [`GatewayError::Api`].
///
/// # Errors
///
/// [`GatewayError::Api`] for failed responses, [`GatewayError::Decode`] for
/// bodies that are not a JSON envelope of `T`.
pub fn decode_envelope<T: DeserializeOwned>(response: &ApiResponse) -> Result<Envelope<T>, GatewayError> {
    if !response.is_success() {
        return Err(GatewayError::Api { status: response.status, message: response.failure_message() });
    }
    let json = response
        .body
        .as_json()
        .ok_or_else(|| GatewayError::Decode(format!("expected JSON body (status {})", response.status)))?;
    serde_json::from_value(json.clone()).map_err(|e| GatewayError::Decode(e.to_string()))
}

#[cfg(test)]
#[path = "gateway_test.rs"]
mod tests;
