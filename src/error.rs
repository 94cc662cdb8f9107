//! Gateway error types.
//!
//! `GatewayError` is what callers see. HTTP failures that the gateway handled
//! (including 401s that ended in a forced logout) are NOT errors at this layer;
//! they come back as `Ok(ApiResponse)` and only the typed helpers turn a
//! classifier failure into [`GatewayError::Api`].

/// Errors produced by gateway operations.
#[derive(Debug, thiserror::Error)]
pub enum GatewayError {
    /// A configuration value could not be parsed.
    #[error("config parse failed: {0}")]
    ConfigParse(String),

    /// The underlying HTTP client could not be constructed.
    #[error("HTTP client build failed: {0}")]
    HttpClientBuild(String),

    /// The request never produced a response (connect, timeout, TLS, ...).
    #[error("transport error: {0}")]
    Transport(String),

    /// Durable session storage could not be read or written.
    #[error("session storage error: {0}")]
    Storage(String),

    /// The caller's request could not be built (bad id, unencodable body).
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// A response body could not be decoded into the expected shape.
    #[error("response decode failed: {0}")]
    Decode(String),

    /// The backend answered and the response classified as a failure.
    #[error("API error: status {status}: {message}")]
    Api { status: u16, message: String },
}

impl GatewayError {
    /// Stable machine-readable code for logs and CLI output.
    #[must_use]
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::ConfigParse(_) => "E_CONFIG_PARSE",
            Self::HttpClientBuild(_) => "E_HTTP_CLIENT_BUILD",
            Self::Transport(_) => "E_TRANSPORT",
            Self::Storage(_) => "E_STORAGE",
            Self::InvalidRequest(_) => "E_INVALID_REQUEST",
            Self::Decode(_) => "E_DECODE",
            Self::Api { .. } => "E_API",
        }
    }

    /// Whether retrying the same call later could reasonably succeed.
    #[must_use]
    pub fn retryable(&self) -> bool {
        matches!(self, Self::Transport(_) | Self::Api { status: 429 | 500..=599, .. })
    }
}

/// Why a token refresh did not produce a new token pair.
///
/// Cloned to every request waiting on the same in-flight refresh.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RefreshFailure {
    #[error("refresh request failed: {0}")]
    Transport(String),

    #[error("refresh rejected with status {status}: {message}")]
    Rejected { status: u16, message: String },

    #[error("refresh response malformed: {0}")]
    MalformedBody(String),

    #[error("could not persist refreshed tokens: {0}")]
    Storage(String),

    #[error("refresh task ended unexpectedly: {0}")]
    Aborted(String),
}

#[cfg(test)]
#[path = "error_test.rs"]
mod tests;
