//! Session lifecycle calls: login, registration, logout, identity checks.
//!
//! Login and registration persist whatever session the backend issues into
//! the gateway's token store. Failures surface as [`GatewayError::Api`] with
//! the backend's `message`, so forms can show them inline.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::info;

use crate::error::GatewayError;
use crate::gateway::{ApiGateway, decode_envelope};
use crate::types::{ApiRequest, SessionUser, TokenPair};

pub const LOGIN_PATH: &str = "/service-provider/users/login";
pub const REGISTER_PATH: &str = "/service-provider/users/register";
pub const ME_PATH: &str = "/api/v1/auth/me";
pub const CHECK_USER_PATH: &str = "/api/v1/auth/check-user";

#[derive(Debug, Clone, Serialize)]
pub struct Credentials {
    pub email: String,
    pub password: String,
}

/// `data` of a successful login.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginData {
    pub user: SessionUser,
    pub access_token: String,
    pub refresh_token: String,
    /// Backend-defined lifetime hint (seconds or a duration string).
    #[serde(default)]
    pub expires_in: Option<Value>,
}

/// `data` of a registration; tokens are issued only when the account is
/// usable immediately.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterData {
    #[serde(default)]
    pub user: Option<SessionUser>,
    #[serde(default)]
    pub access_token: Option<String>,
    #[serde(default)]
    pub refresh_token: Option<String>,
}

impl RegisterData {
    /// Both tokens, if the backend issued a complete pair.
    #[must_use]
    pub fn tokens(&self) -> Option<TokenPair> {
        match (&self.access_token, &self.refresh_token) {
            (Some(access), Some(refresh)) if !access.is_empty() && !refresh.is_empty() => {
                Some(TokenPair { access_token: access.clone(), refresh_token: refresh.clone() })
            }
            _ => None,
        }
    }
}

#[derive(Clone)]
pub struct AuthApi {
    gateway: ApiGateway,
}

impl AuthApi {
    #[must_use]
    pub fn new(gateway: ApiGateway) -> Self {
        Self { gateway }
    }

    /// Sign in and persist the issued session.
    ///
    /// # Errors
    ///
    /// [`GatewayError::Api`] for rejected credentials, [`GatewayError::Decode`]
    /// when the success body lacks the user or tokens, and
    /// [`GatewayError::Storage`] when the session cannot be persisted.
    pub async fn login(&self, credentials: &Credentials) -> Result<LoginData, GatewayError> {
        let body = serde_json::to_value(credentials).map_err(|e| GatewayError::InvalidRequest(e.to_string()))?;
        let response = self.gateway.request(ApiRequest::post(LOGIN_PATH, body)).await?;
        let data: LoginData = decode_envelope(&response)?
            .data
            .ok_or_else(|| GatewayError::Decode("login response has no data".into()))?;
        if data.access_token.is_empty() || data.refresh_token.is_empty() {
            return Err(GatewayError::Decode("login response is missing tokens".into()));
        }

        let tokens = self.gateway.tokens();
        tokens.set(&data.access_token, &data.refresh_token)?;
        tokens.set_user(&data.user)?;
        info!(user_id = %data.user.id, role = %data.user.role, "signed in");
        Ok(data)
    }

    /// Register a provider account. A session is stored only when the
    /// backend returns both tokens.
    ///
    /// # Errors
    ///
    /// As for [`AuthApi::login`].
    pub async fn register<B: Serialize>(&self, profile: &B) -> Result<RegisterData, GatewayError> {
        let body = serde_json::to_value(profile).map_err(|e| GatewayError::InvalidRequest(e.to_string()))?;
        let response = self.gateway.request(ApiRequest::post(REGISTER_PATH, body)).await?;
        let data = decode_envelope::<RegisterData>(&response)?.data.unwrap_or_default();

        let tokens = self.gateway.tokens();
        if let Some(pair) = data.tokens() {
            tokens.set(&pair.access_token, &pair.refresh_token)?;
            info!("registered with immediate session");
        } else {
            info!("registered; sign-in required");
        }
        if let Some(user) = &data.user {
            tokens.set_user(user)?;
        }
        Ok(data)
    }

    /// Drop the local session. The backend keeps no session to end.
    pub fn logout(&self) {
        self.gateway.tokens().clear();
        info!("signed out");
    }

    /// Current identity according to the backend.
    ///
    /// # Errors
    ///
    /// [`GatewayError::Api`] when the session is not accepted (the gateway has
    /// already ended it), [`GatewayError::Transport`] when unreachable.
    pub async fn me(&self) -> Result<Value, GatewayError> {
        self.fetch(ME_PATH).await
    }

    /// Lightweight session probe.
    ///
    /// # Errors
    ///
    /// As for [`AuthApi::me`].
    pub async fn check_user(&self) -> Result<Value, GatewayError> {
        self.fetch(CHECK_USER_PATH).await
    }

    async fn fetch(&self, path: &str) -> Result<Value, GatewayError> {
        let envelope = self.gateway.request_json::<Value>(ApiRequest::get(path)).await?;
        Ok(envelope.data.unwrap_or(Value::Null))
    }
}

#[cfg(test)]
#[path = "auth_test.rs"]
mod tests;
