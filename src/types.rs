//! Request, response, and envelope types shared by every gateway layer.

use std::collections::BTreeMap;

use reqwest::Method;
use serde::{Deserialize, Serialize};
use serde_json::Value;

// =============================================================================
// HEADERS
// =============================================================================

/// Header name → value. Names keep the casing they were inserted with;
/// [`set_header`] and [`header_value`] compare names case-insensitively.
pub type Headers = BTreeMap<String, String>;

/// Insert `name: value`, replacing any existing entry with the same name in
/// any casing.
pub fn set_header(headers: &mut Headers, name: &str, value: &str) {
    remove_header(headers, name);
    headers.insert(name.to_string(), value.to_string());
}

/// Remove every entry named `name`, ignoring case.
pub fn remove_header(headers: &mut Headers, name: &str) {
    headers.retain(|existing, _| !existing.eq_ignore_ascii_case(name));
}

/// Look up a header value, ignoring case.
#[must_use]
pub fn header_value<'a>(headers: &'a Headers, name: &str) -> Option<&'a str> {
    headers
        .iter()
        .find(|(existing, _)| existing.eq_ignore_ascii_case(name))
        .map(|(_, value)| value.as_str())
}

// =============================================================================
// REQUEST
// =============================================================================

/// One outgoing API call. `path` is relative to the configured base URL.
#[derive(Debug, Clone, PartialEq)]
pub struct ApiRequest {
    pub method: Method,
    pub path: String,
    pub query: Vec<(String, String)>,
    pub headers: Headers,
    pub body: Option<Value>,
}

impl ApiRequest {
    #[must_use]
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self { method, path: path.into(), query: Vec::new(), headers: Headers::new(), body: None }
    }

    #[must_use]
    pub fn get(path: impl Into<String>) -> Self {
        Self::new(Method::GET, path)
    }

    #[must_use]
    pub fn post(path: impl Into<String>, body: Value) -> Self {
        Self::new(Method::POST, path).with_body(body)
    }

    #[must_use]
    pub fn put(path: impl Into<String>, body: Value) -> Self {
        Self::new(Method::PUT, path).with_body(body)
    }

    #[must_use]
    pub fn patch(path: impl Into<String>, body: Value) -> Self {
        Self::new(Method::PATCH, path).with_body(body)
    }

    #[must_use]
    pub fn delete(path: impl Into<String>) -> Self {
        Self::new(Method::DELETE, path)
    }

    #[must_use]
    pub fn with_body(mut self, body: Value) -> Self {
        self.body = Some(body);
        self
    }

    #[must_use]
    pub fn with_header(mut self, name: &str, value: &str) -> Self {
        set_header(&mut self.headers, name, value);
        self
    }

    #[must_use]
    pub fn with_query(mut self, name: &str, value: impl ToString) -> Self {
        self.query.push((name.to_string(), value.to_string()));
        self
    }
}

// =============================================================================
// RESPONSE
// =============================================================================

/// Decoded response body. JSON is parsed eagerly so the classifier and the
/// session policy can inspect `success`, `message`, and `roleChanged`.
#[derive(Debug, Clone, PartialEq)]
pub enum ResponseBody {
    Empty,
    Json(Value),
    Text(String),
    Binary(Vec<u8>),
}

impl ResponseBody {
    /// Decode raw bytes. JSON is attempted for `application/json` (and
    /// `+json`) content types and for untyped bodies that look like JSON.
    #[must_use]
    pub fn from_bytes(content_type: Option<&str>, bytes: Vec<u8>) -> Self {
        if bytes.is_empty() {
            return Self::Empty;
        }

        let content_type = content_type.unwrap_or_default().to_ascii_lowercase();
        let declared_json = content_type.contains("application/json") || content_type.contains("+json");
        let declared_text = content_type.starts_with("text/");

        if declared_json || content_type.is_empty() {
            if let Ok(value) = serde_json::from_slice::<Value>(&bytes) {
                return Self::Json(value);
            }
        }

        if declared_json || declared_text || content_type.is_empty() {
            return match String::from_utf8(bytes) {
                Ok(text) => Self::Text(text),
                Err(err) => Self::Binary(err.into_bytes()),
            };
        }

        Self::Binary(bytes)
    }

    #[must_use]
    pub fn as_json(&self) -> Option<&Value> {
        match self {
            Self::Json(value) => Some(value),
            _ => None,
        }
    }

    /// The body's `message` string, if it is a JSON object carrying one.
    #[must_use]
    pub fn message(&self) -> Option<&str> {
        self.as_json()?.get("message")?.as_str()
    }
}

/// A completed HTTP exchange.
#[derive(Debug, Clone, PartialEq)]
pub struct ApiResponse {
    pub status: u16,
    pub body: ResponseBody,
}

impl ApiResponse {
    #[must_use]
    pub fn new(status: u16, body: ResponseBody) -> Self {
        Self { status, body }
    }

    #[must_use]
    pub fn json(status: u16, body: Value) -> Self {
        Self::new(status, ResponseBody::Json(body))
    }

    /// Classifier verdict, see [`crate::classify::is_success`].
    #[must_use]
    pub fn is_success(&self) -> bool {
        crate::classify::is_success(self.status, &self.body)
    }

    #[must_use]
    pub fn is_unauthorized(&self) -> bool {
        self.status == 401
    }

    /// Best human-readable failure message for this response.
    #[must_use]
    pub fn failure_message(&self) -> String {
        match &self.body {
            ResponseBody::Json(value) => value
                .get("message")
                .or_else(|| value.get("error"))
                .and_then(Value::as_str)
                .map_or_else(|| format!("request failed with status {}", self.status), str::to_string),
            ResponseBody::Text(text) if !text.trim().is_empty() => {
                text.trim().chars().take(MAX_ERROR_CHARS).collect()
            }
            _ => format!("request failed with status {}", self.status),
        }
    }
}

/// Maximum number of text body characters surfaced in error messages.
const MAX_ERROR_CHARS: usize = 200;

// =============================================================================
// ENVELOPE
// =============================================================================

/// The backend's `{success, message, data, pagination}` response envelope.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Envelope<T> {
    #[serde(default)]
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(default = "Option::default", skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pagination: Option<Pagination>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Pagination {
    #[serde(default)]
    pub page: u64,
    #[serde(default)]
    pub limit: u64,
    #[serde(default)]
    pub total: u64,
    #[serde(default)]
    pub total_pages: u64,
}

// =============================================================================
// SESSION VALUES
// =============================================================================

/// Last-known identity snapshot returned by login/registration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionUser {
    #[serde(deserialize_with = "string_or_number")]
    pub id: String,
    #[serde(default)]
    pub role: String,
    /// Remaining profile fields, kept verbatim.
    #[serde(flatten)]
    pub extra: serde_json::Map<String, Value>,
}

/// Some backends emit numeric ids; both forms are kept as a string.
fn string_or_number<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: serde::Deserializer<'de>,
{
    match Value::deserialize(deserializer)? {
        Value::String(s) => Ok(s),
        Value::Number(n) => Ok(n.to_string()),
        other => Err(serde::de::Error::custom(format!("expected string or number id, got {other}"))),
    }
}

/// A freshly issued access/refresh token pair.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenPair {
    pub access_token: String,
    pub refresh_token: String,
}

#[cfg(test)]
#[path = "types_test.rs"]
mod tests;
