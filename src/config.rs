//! Gateway configuration parsed from environment variables.

use std::time::Duration;

use crate::error::GatewayError;

pub const DEFAULT_API_BASE_URL: &str = "http://localhost:3030";
pub const DEFAULT_SIGN_IN_PATH: &str = "/sign-in";
pub const DEFAULT_REFRESH_PATH: &str = "/auth/refresh";
pub const DEFAULT_REDIRECT_DELAY_MS: u64 = 2000;
pub const DEFAULT_NOTIFICATION_DURATION_MS: u64 = 5000;
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;
pub const DEFAULT_CONNECT_TIMEOUT_SECS: u64 = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HttpTimeouts {
    pub request_secs: u64,
    pub connect_secs: u64,
}

impl Default for HttpTimeouts {
    fn default() -> Self {
        Self { request_secs: DEFAULT_REQUEST_TIMEOUT_SECS, connect_secs: DEFAULT_CONNECT_TIMEOUT_SECS }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GatewayConfig {
    /// Base URL every request path is joined onto. No trailing slash.
    pub api_base_url: String,
    /// Location of the sign-in page used for forced-logout redirects.
    pub sign_in_path: String,
    /// Path of the token refresh endpoint.
    pub refresh_path: String,
    /// Delay between a forced-logout notification and the redirect.
    pub redirect_delay: Duration,
    /// How long a forced-logout notification stays visible.
    pub notification_duration: Duration,
    pub timeouts: HttpTimeouts,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            api_base_url: DEFAULT_API_BASE_URL.to_string(),
            sign_in_path: DEFAULT_SIGN_IN_PATH.to_string(),
            refresh_path: DEFAULT_REFRESH_PATH.to_string(),
            redirect_delay: Duration::from_millis(DEFAULT_REDIRECT_DELAY_MS),
            notification_duration: Duration::from_millis(DEFAULT_NOTIFICATION_DURATION_MS),
            timeouts: HttpTimeouts::default(),
        }
    }
}

impl GatewayConfig {
    /// Build typed gateway config from environment variables.
    ///
    /// All optional:
    /// - `COMMON_API_URL`: API base URL; falls back to `VITE_COMMON_API_URL`,
    ///   then `http://localhost:3030`
    /// - `GATEWAY_SIGN_IN_PATH`: default `/sign-in`
    /// - `GATEWAY_REFRESH_PATH`: default `/auth/refresh`
    /// - `GATEWAY_REDIRECT_DELAY_MS`: default 2000
    /// - `GATEWAY_NOTIFICATION_DURATION_MS`: default 5000
    /// - `GATEWAY_REQUEST_TIMEOUT_SECS`: default 30
    /// - `GATEWAY_CONNECT_TIMEOUT_SECS`: default 10
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::ConfigParse`] if the base URL is not an
    /// `http(s)` URL or a path setting does not start with `/`.
    pub fn from_env() -> Result<Self, GatewayError> {
        let raw_base = std::env::var("COMMON_API_URL")
            .or_else(|_| std::env::var("VITE_COMMON_API_URL"))
            .unwrap_or_else(|_| DEFAULT_API_BASE_URL.to_string());
        let api_base_url = parse_base_url(&raw_base)?;

        let sign_in_path = parse_path("GATEWAY_SIGN_IN_PATH", DEFAULT_SIGN_IN_PATH)?;
        let refresh_path = parse_path("GATEWAY_REFRESH_PATH", DEFAULT_REFRESH_PATH)?;

        let timeouts = HttpTimeouts {
            request_secs: env_parse_u64("GATEWAY_REQUEST_TIMEOUT_SECS", DEFAULT_REQUEST_TIMEOUT_SECS),
            connect_secs: env_parse_u64("GATEWAY_CONNECT_TIMEOUT_SECS", DEFAULT_CONNECT_TIMEOUT_SECS),
        };

        Ok(Self {
            api_base_url,
            sign_in_path,
            refresh_path,
            redirect_delay: Duration::from_millis(env_parse_u64(
                "GATEWAY_REDIRECT_DELAY_MS",
                DEFAULT_REDIRECT_DELAY_MS,
            )),
            notification_duration: Duration::from_millis(env_parse_u64(
                "GATEWAY_NOTIFICATION_DURATION_MS",
                DEFAULT_NOTIFICATION_DURATION_MS,
            )),
            timeouts,
        })
    }

    /// Override the base URL, e.g. from a CLI flag.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::ConfigParse`] if `raw` is not an `http(s)` URL.
    pub fn with_base_url(mut self, raw: &str) -> Result<Self, GatewayError> {
        self.api_base_url = parse_base_url(raw)?;
        Ok(self)
    }

    /// Join a request path onto the configured base URL.
    #[must_use]
    pub fn url_for(&self, path: &str) -> String {
        join_url(&self.api_base_url, path)
    }
}

pub(crate) fn join_url(base_url: &str, path: &str) -> String {
    let base = base_url.trim().trim_end_matches('/');
    let path = path.trim();

    if base.is_empty() {
        path.to_string()
    } else {
        format!("{}/{}", base, path.trim_start_matches('/'))
    }
}

fn parse_base_url(raw: &str) -> Result<String, GatewayError> {
    let trimmed = raw.trim().trim_end_matches('/');
    if !(trimmed.starts_with("http://") || trimmed.starts_with("https://")) {
        return Err(GatewayError::ConfigParse(format!("API base URL must be http(s): {raw}")));
    }
    Ok(trimmed.to_string())
}

fn parse_path(key: &str, default: &str) -> Result<String, GatewayError> {
    let value = std::env::var(key).unwrap_or_else(|_| default.to_string());
    if !value.starts_with('/') {
        return Err(GatewayError::ConfigParse(format!("{key} must start with '/': {value}")));
    }
    Ok(value)
}

fn env_parse_u64(key: &str, default: u64) -> u64 {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse::<u64>().ok())
        .unwrap_or(default)
}

#[cfg(test)]
#[path = "config_test.rs"]
mod tests;
