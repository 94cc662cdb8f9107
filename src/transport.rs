//! HTTP transport port and its `reqwest` implementation.
//!
//! The gateway only ever sees `ApiRequest` in and `ApiResponse` out. Any HTTP
//! status, including 401 and 5xx, is a successful send; only failures that
//! produce no response at all become [`GatewayError::Transport`].

use std::time::Duration;

use reqwest::header::{CONTENT_TYPE, HeaderMap, HeaderName, HeaderValue};
use tracing::warn;

use crate::config::{HttpTimeouts, join_url};
use crate::error::GatewayError;
use crate::types::{ApiRequest, ApiResponse, Headers, ResponseBody};

/// Sends fully prepared requests. Enables mocking in tests.
#[async_trait::async_trait]
pub trait HttpTransport: Send + Sync {
    /// Send `request` exactly as given; headers are already final.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::Transport`] when no response was received.
    async fn send(&self, request: &ApiRequest) -> Result<ApiResponse, GatewayError>;
}

// =============================================================================
// REQWEST
// =============================================================================

pub struct ReqwestTransport {
    http: reqwest::Client,
    base_url: String,
}

impl ReqwestTransport {
    /// # Errors
    ///
    /// Returns [`GatewayError::HttpClientBuild`] if the client cannot be built.
    pub fn new(base_url: impl Into<String>, timeouts: HttpTimeouts) -> Result<Self, GatewayError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeouts.request_secs))
            .connect_timeout(Duration::from_secs(timeouts.connect_secs))
            .build()
            .map_err(|e| GatewayError::HttpClientBuild(e.to_string()))?;
        Ok(Self { http, base_url: base_url.into() })
    }
}

#[async_trait::async_trait]
impl HttpTransport for ReqwestTransport {
    async fn send(&self, request: &ApiRequest) -> Result<ApiResponse, GatewayError> {
        let url = join_url(&self.base_url, &request.path);
        let mut builder = self
            .http
            .request(request.method.clone(), url)
            .headers(to_header_map(&request.headers));

        if !request.query.is_empty() {
            builder = builder.query(&request.query);
        }
        if let Some(body) = &request.body {
            builder = builder.json(body);
        }

        let response = builder
            .send()
            .await
            .map_err(|e| GatewayError::Transport(describe_request_error(&e)))?;

        let status = response.status().as_u16();
        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        let bytes = response
            .bytes()
            .await
            .map_err(|e| GatewayError::Transport(e.to_string()))?;

        Ok(ApiResponse::new(status, ResponseBody::from_bytes(content_type.as_deref(), bytes.to_vec())))
    }
}

/// Convert to a `reqwest` header map, dropping entries that are not valid
/// HTTP header names or values.
fn to_header_map(headers: &Headers) -> HeaderMap {
    let mut map = HeaderMap::with_capacity(headers.len());
    for (name, value) in headers {
        match (HeaderName::from_bytes(name.as_bytes()), HeaderValue::from_str(value)) {
            (Ok(name), Ok(value)) => {
                map.insert(name, value);
            }
            _ => warn!(header = %name, "dropping invalid header"),
        }
    }
    map
}

fn describe_request_error(err: &reqwest::Error) -> String {
    if err.is_timeout() {
        format!("request timed out: {err}")
    } else if err.is_connect() {
        format!("unable to reach the server: {err}")
    } else {
        err.to_string()
    }
}

#[cfg(test)]
#[path = "transport_test.rs"]
mod tests;
