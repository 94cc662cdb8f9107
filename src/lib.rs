//! Authenticated API gateway for the logistics service-provider dashboard.
//!
//! Every backend call goes through one [`ApiGateway`], which injects auth
//! headers, classifies 401s, refreshes expired tokens at most once at a time,
//! and forces a logout when the session cannot be recovered.
//!
//! ARCHITECTURE
//! ============
//!
//! ```text
//! AuthApi / ResourceClient / callers
//!            |
//!        ApiGateway ----> HttpTransport (reqwest)
//!        |    |    \
//!        |    |     RefreshCoordinator (single flight)
//!        |    SessionPolicy ----> NotificationSink, Navigator
//!        TokenStore + HeaderStore ----> SessionStorage
//! ```
//!
//! The UI-facing side effects (toasts, redirects) and persistence are ports,
//! so the crate runs the same way under a CLI, a desktop shell, or tests.

pub mod auth;
pub mod classify;
pub mod config;
pub mod error;
pub mod gateway;
pub mod headers;
pub mod notify;
pub mod policy;
pub mod refresh;
pub mod resources;
pub mod storage;
pub mod token_store;
pub mod transport;
pub mod types;

#[cfg(test)]
pub(crate) mod test_helpers;

pub use auth::{AuthApi, Credentials};
pub use config::GatewayConfig;
pub use error::{GatewayError, RefreshFailure};
pub use gateway::{ApiGateway, GatewayBuilder};
pub use headers::HeaderStore;
pub use notify::{Navigator, Notification, NotificationSink, Severity};
pub use refresh::RefreshOutcome;
pub use resources::{ResourceClient, ResourceGroup};
pub use storage::{FileStorage, MemoryStorage, SessionStorage};
pub use token_store::TokenStore;
pub use transport::HttpTransport;
pub use types::{ApiRequest, ApiResponse, Envelope};
