//! Typed clients for the dashboard's provider resource groups.
//!
//! Every group exposes the same REST shape under `/service-provider/<group>`:
//!
//! ```text
//! GET    /            list (page, limit)
//! GET    /{id}        fetch one
//! POST   /            create
//! PUT    /{id}        replace
//! DELETE /{id}        remove
//! PATCH  /{id}/status change status
//! ```
//!
//! All calls go through [`ApiGateway`], so they share token refresh and the
//! logout policy with every other request.

use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::{Value, json};
use tracing::debug;

use crate::error::GatewayError;
use crate::gateway::ApiGateway;
use crate::types::{ApiRequest, Pagination};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResourceGroup {
    Trips,
    Vehicles,
    Warehouses,
    Freight,
    Cha,
}

impl ResourceGroup {
    pub const ALL: [Self; 5] = [Self::Trips, Self::Vehicles, Self::Warehouses, Self::Freight, Self::Cha];

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Trips => "trips",
            Self::Vehicles => "vehicles",
            Self::Warehouses => "warehouses",
            Self::Freight => "freight",
            Self::Cha => "cha",
        }
    }

    #[must_use]
    pub fn base_path(self) -> &'static str {
        match self {
            Self::Trips => "/service-provider/trips",
            Self::Vehicles => "/service-provider/vehicles",
            Self::Warehouses => "/service-provider/warehouses",
            Self::Freight => "/service-provider/freight",
            Self::Cha => "/service-provider/cha",
        }
    }
}

/// One page of a list call.
#[derive(Debug, Clone, PartialEq)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub pagination: Option<Pagination>,
}

#[derive(Clone)]
pub struct ResourceClient {
    gateway: ApiGateway,
    group: ResourceGroup,
}

impl ResourceClient {
    #[must_use]
    pub fn new(gateway: ApiGateway, group: ResourceGroup) -> Self {
        Self { gateway, group }
    }

    #[must_use]
    pub fn group(&self) -> ResourceGroup {
        self.group
    }

    /// # Errors
    ///
    /// [`GatewayError::Api`] when the backend rejects the call,
    /// [`GatewayError::Decode`] when items do not decode as `T`.
    pub async fn list<T: DeserializeOwned>(&self, page: Option<u32>, limit: Option<u32>) -> Result<Page<T>, GatewayError> {
        let mut request = ApiRequest::get(self.group.base_path());
        if let Some(page) = page {
            request = request.with_query("page", page);
        }
        if let Some(limit) = limit {
            request = request.with_query("limit", limit);
        }

        let envelope = self.gateway.request_json::<Vec<T>>(request).await?;
        let items = envelope.data.unwrap_or_default();
        debug!(group = self.group.as_str(), count = items.len(), "listed resources");
        Ok(Page { items, pagination: envelope.pagination })
    }

    /// # Errors
    ///
    /// As for [`ResourceClient::list`]; a success without `data` is a
    /// [`GatewayError::Decode`].
    pub async fn get<T: DeserializeOwned>(&self, id: &str) -> Result<T, GatewayError> {
        let path = self.item_path(id)?;
        self.expect_data(ApiRequest::get(path)).await
    }

    /// # Errors
    ///
    /// As for [`ResourceClient::get`].
    pub async fn create<B: Serialize, T: DeserializeOwned>(&self, body: &B) -> Result<T, GatewayError> {
        let request = ApiRequest::post(self.group.base_path(), encode(body)?);
        self.expect_data(request).await
    }

    /// # Errors
    ///
    /// As for [`ResourceClient::get`].
    pub async fn update<B: Serialize, T: DeserializeOwned>(&self, id: &str, body: &B) -> Result<T, GatewayError> {
        let request = ApiRequest::put(self.item_path(id)?, encode(body)?);
        self.expect_data(request).await
    }

    /// # Errors
    ///
    /// [`GatewayError::Api`] when the backend rejects the delete.
    pub async fn delete(&self, id: &str) -> Result<(), GatewayError> {
        let request = ApiRequest::delete(self.item_path(id)?);
        self.gateway.request_json::<Value>(request).await?;
        Ok(())
    }

    /// # Errors
    ///
    /// As for [`ResourceClient::get`].
    pub async fn update_status<T: DeserializeOwned>(&self, id: &str, status: &str) -> Result<T, GatewayError> {
        let path = format!("{}/status", self.item_path(id)?);
        self.expect_data(ApiRequest::patch(path, json!({ "status": status }))).await
    }

    async fn expect_data<T: DeserializeOwned>(&self, request: ApiRequest) -> Result<T, GatewayError> {
        let path = request.path.clone();
        self.gateway
            .request_json::<T>(request)
            .await?
            .data
            .ok_or_else(|| GatewayError::Decode(format!("response from {path} has no data")))
    }

    fn item_path(&self, id: &str) -> Result<String, GatewayError> {
        let id = id.trim();
        if id.is_empty() || id.contains(['/', '?', '#']) {
            return Err(GatewayError::InvalidRequest(format!("invalid {} id: {id:?}", self.group.as_str())));
        }
        Ok(format!("{}/{id}", self.group.base_path()))
    }
}

fn encode<B: Serialize>(body: &B) -> Result<Value, GatewayError> {
    serde_json::to_value(body).map_err(|e| GatewayError::InvalidRequest(format!("failed to encode request body: {e}")))
}

#[cfg(test)]
#[path = "resources_test.rs"]
mod tests;
