//! Mocks for the gateway's ports, shared by unit tests.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use serde_json::{Value, json};

use crate::config::GatewayConfig;
use crate::error::GatewayError;
use crate::gateway::ApiGateway;
use crate::headers::{AUTHORIZATION, HeaderStore};
use crate::notify::{Navigator, Notification, NotificationSink};
use crate::storage::{MemoryStorage, SessionStorage};
use crate::transport::HttpTransport;
use crate::types::{ApiRequest, ApiResponse, header_value};

// =========================================================================
// FailingStorage
// =========================================================================

/// Storage whose every operation fails.
pub struct FailingStorage;

impl SessionStorage for FailingStorage {
    fn get_item(&self, _key: &str) -> Result<Option<String>, GatewayError> {
        Err(GatewayError::Storage("disk on fire".into()))
    }

    fn set_item(&self, _key: &str, _value: &str) -> Result<(), GatewayError> {
        Err(GatewayError::Storage("disk on fire".into()))
    }

    fn remove_item(&self, _key: &str) -> Result<(), GatewayError> {
        Err(GatewayError::Storage("disk on fire".into()))
    }
}

// =========================================================================
// MockTransport
// =========================================================================

/// What a mock route answers with.
pub enum MockReply {
    Respond { status: u16, body: Value, delay: Option<Duration> },
    Fail(String),
}

impl MockReply {
    pub fn json(status: u16, body: Value) -> Self {
        Self::Respond { status, body, delay: None }
    }

    pub fn delayed(status: u16, body: Value, delay: Duration) -> Self {
        Self::Respond { status, body, delay: Some(delay) }
    }
}

type Handler = Box<dyn Fn(&ApiRequest) -> MockReply + Send + Sync>;

/// Transport that answers from per-path handlers and records every request
/// it was given (with final headers).
#[derive(Default)]
pub struct MockTransport {
    routes: Mutex<HashMap<String, Handler>>,
    calls: Mutex<Vec<ApiRequest>>,
}

impl MockTransport {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn route(&self, path: &str, handler: impl Fn(&ApiRequest) -> MockReply + Send + Sync + 'static) {
        self.routes.lock().unwrap_or_else(PoisonError::into_inner).insert(path.to_string(), Box::new(handler));
    }

    pub fn calls(&self) -> Vec<ApiRequest> {
        self.calls.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }

    pub fn calls_to(&self, path: &str) -> usize {
        self.calls.lock().unwrap_or_else(PoisonError::into_inner).iter().filter(|r| r.path == path).count()
    }
}

#[async_trait::async_trait]
impl HttpTransport for MockTransport {
    async fn send(&self, request: &ApiRequest) -> Result<ApiResponse, GatewayError> {
        self.calls.lock().unwrap_or_else(PoisonError::into_inner).push(request.clone());
        let reply = {
            let routes = self.routes.lock().unwrap_or_else(PoisonError::into_inner);
            match routes.get(&request.path) {
                Some(handler) => handler(request),
                None => MockReply::json(404, json!({ "success": false, "message": "no mock route" })),
            }
        };
        match reply {
            MockReply::Respond { status, body, delay } => {
                if let Some(delay) = delay {
                    tokio::time::sleep(delay).await;
                }
                Ok(ApiResponse::json(status, body))
            }
            MockReply::Fail(message) => Err(GatewayError::Transport(message)),
        }
    }
}

/// The bearer token a request carried, if any.
pub fn bearer_of(request: &ApiRequest) -> Option<String> {
    header_value(&request.headers, AUTHORIZATION)
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(str::to_string)
}

// =========================================================================
// Recording ports
// =========================================================================

#[derive(Default)]
pub struct RecordingSink {
    pub notifications: Mutex<Vec<Notification>>,
}

impl RecordingSink {
    pub fn taken(&self) -> Vec<Notification> {
        self.notifications.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }
}

impl NotificationSink for RecordingSink {
    fn notify(&self, notification: Notification) {
        self.notifications.lock().unwrap_or_else(PoisonError::into_inner).push(notification);
    }
}

pub struct RecordingNavigator {
    pub current: Mutex<String>,
    pub targets: Mutex<Vec<String>>,
}

impl RecordingNavigator {
    pub fn at(path: &str) -> Self {
        Self { current: Mutex::new(path.to_string()), targets: Mutex::new(Vec::new()) }
    }

    pub fn targets(&self) -> Vec<String> {
        self.targets.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }
}

impl Navigator for RecordingNavigator {
    fn current_path(&self) -> String {
        self.current.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }

    fn navigate(&self, target: &str) {
        self.targets.lock().unwrap_or_else(PoisonError::into_inner).push(target.to_string());
        *self.current.lock().unwrap_or_else(PoisonError::into_inner) = target.to_string();
    }
}

// =========================================================================
// Gateway harness
// =========================================================================

pub struct Harness {
    pub gateway: ApiGateway,
    pub transport: Arc<MockTransport>,
    pub storage: Arc<MemoryStorage>,
    pub headers: HeaderStore,
    pub sink: Arc<RecordingSink>,
    pub navigator: Arc<RecordingNavigator>,
}

/// Config used by harnesses: short redirect delay, everything else default.
pub fn test_config() -> GatewayConfig {
    GatewayConfig { redirect_delay: Duration::from_millis(100), ..GatewayConfig::default() }
}

/// A gateway wired to mocks, with the navigator on the dashboard.
pub fn harness() -> Harness {
    harness_at("/dashboard")
}

pub fn harness_at(current_path: &str) -> Harness {
    let transport = MockTransport::new();
    let storage = Arc::new(MemoryStorage::new());
    let headers = HeaderStore::new();
    let sink = Arc::new(RecordingSink::default());
    let navigator = Arc::new(RecordingNavigator::at(current_path));

    let gateway = ApiGateway::builder(test_config())
        .transport(transport.clone())
        .storage(storage.clone())
        .headers(headers.clone())
        .notification_sink(sink.clone())
        .navigator(navigator.clone())
        .build()
        .unwrap();

    Harness { gateway, transport, storage, headers, sink, navigator }
}

impl Harness {
    /// Seed an authenticated session.
    pub fn login_as(&self, access: &str, refresh: &str) {
        self.gateway.tokens().set(access, refresh).unwrap();
    }

    /// Let delayed redirects fire (time is paused in these tests).
    pub async fn settle(&self) {
        tokio::time::sleep(test_config().redirect_delay + Duration::from_millis(1)).await;
    }
}
