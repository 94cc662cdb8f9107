use super::*;
use crate::test_helpers::{MockReply, bearer_of, harness};
use serde::Deserialize;

#[derive(Debug, Deserialize, PartialEq)]
struct Trip {
    id: String,
    status: String,
}

#[test]
fn every_group_lives_under_service_provider() {
    for group in ResourceGroup::ALL {
        assert_eq!(group.base_path(), format!("/service-provider/{}", group.as_str()));
    }
}

#[tokio::test]
async fn list_sends_paging_and_decodes_page() {
    let h = harness();
    h.login_as("AT1", "RT1");
    h.transport.route("/service-provider/trips", |_| {
        MockReply::json(
            200,
            json!({
                "success": true,
                "data": [{ "id": "t1", "status": "in_transit" }, { "id": "t2", "status": "delivered" }],
                "pagination": { "page": 2, "limit": 2, "total": 7, "totalPages": 4 }
            }),
        )
    });
    let trips = ResourceClient::new(h.gateway.clone(), ResourceGroup::Trips);

    let page: Page<Trip> = trips.list(Some(2), Some(2)).await.unwrap();

    assert_eq!(page.items[1], Trip { id: "t2".into(), status: "delivered".into() });
    assert_eq!(page.pagination.unwrap().total_pages, 4);
    let call = &h.transport.calls()[0];
    assert_eq!(call.query, vec![("page".to_string(), "2".to_string()), ("limit".to_string(), "2".to_string())]);
    assert_eq!(bearer_of(call).as_deref(), Some("AT1"));
}

#[tokio::test]
async fn list_without_data_is_empty() {
    let h = harness();
    h.transport.route("/service-provider/cha", |_| MockReply::json(200, json!({ "success": true })));
    let cha = ResourceClient::new(h.gateway.clone(), ResourceGroup::Cha);

    let page: Page<Value> = cha.list(None, None).await.unwrap();

    assert!(page.items.is_empty());
    assert!(page.pagination.is_none());
    assert!(h.transport.calls()[0].query.is_empty());
}

#[tokio::test]
async fn get_fetches_by_id() {
    let h = harness();
    h.transport.route("/service-provider/vehicles/v7", |_| {
        MockReply::json(200, json!({ "success": true, "data": { "id": "v7", "number": "MH12AB1234" } }))
    });
    let vehicles = ResourceClient::new(h.gateway.clone(), ResourceGroup::Vehicles);

    let vehicle: Value = vehicles.get("v7").await.unwrap();
    assert_eq!(vehicle["number"], "MH12AB1234");
}

#[tokio::test]
async fn get_without_data_is_decode_error() {
    let h = harness();
    h.transport.route("/service-provider/vehicles/v7", |_| MockReply::json(200, json!({ "success": true })));
    let vehicles = ResourceClient::new(h.gateway.clone(), ResourceGroup::Vehicles);

    let err = vehicles.get::<Value>("v7").await.unwrap_err();
    assert!(matches!(err, GatewayError::Decode(_)));
}

#[tokio::test]
async fn create_and_update_send_bodies() {
    let h = harness();
    h.transport.route("/service-provider/warehouses", |req| {
        MockReply::json(201, json!({ "success": true, "data": req.body.clone() }))
    });
    h.transport.route("/service-provider/warehouses/w1", |req| {
        MockReply::json(200, json!({ "success": true, "data": req.body.clone() }))
    });
    let warehouses = ResourceClient::new(h.gateway.clone(), ResourceGroup::Warehouses);

    let created: Value = warehouses.create(&json!({ "name": "Bhiwandi DC" })).await.unwrap();
    let updated: Value = warehouses.update("w1", &json!({ "name": "Bhiwandi DC 2" })).await.unwrap();

    assert_eq!(created["name"], "Bhiwandi DC");
    assert_eq!(updated["name"], "Bhiwandi DC 2");
    let calls = h.transport.calls();
    assert_eq!(calls[0].method, reqwest::Method::POST);
    assert_eq!(calls[1].method, reqwest::Method::PUT);
}

#[tokio::test]
async fn update_status_patches_status_path() {
    let h = harness();
    h.transport.route("/service-provider/freight/f3/status", |_| {
        MockReply::json(200, json!({ "success": true, "data": { "id": "f3", "status": "approved" } }))
    });
    let freight = ResourceClient::new(h.gateway.clone(), ResourceGroup::Freight);

    let _: Value = freight.update_status("f3", "approved").await.unwrap();

    let call = &h.transport.calls()[0];
    assert_eq!(call.method, reqwest::Method::PATCH);
    assert_eq!(call.body, Some(json!({ "status": "approved" })));
}

#[tokio::test]
async fn delete_surfaces_backend_rejection() {
    let h = harness();
    h.transport.route("/service-provider/trips/t1", |_| {
        MockReply::json(409, json!({ "success": false, "message": "trip already dispatched" }))
    });
    let trips = ResourceClient::new(h.gateway.clone(), ResourceGroup::Trips);

    let err = trips.delete("t1").await.unwrap_err();

    assert_eq!(err.to_string(), "API error: status 409: trip already dispatched");
    assert_eq!(h.transport.calls()[0].method, reqwest::Method::DELETE);
}

#[tokio::test]
async fn invalid_ids_never_reach_the_transport() {
    let h = harness();
    let trips = ResourceClient::new(h.gateway.clone(), ResourceGroup::Trips);

    for id in ["", "  ", "t1/../admin", "t1?x=1"] {
        let err = trips.get::<Value>(id).await.unwrap_err();
        assert!(matches!(err, GatewayError::InvalidRequest(_)), "{id:?}");
    }
    assert!(h.transport.calls().is_empty());
}

#[tokio::test]
async fn expired_token_is_refreshed_for_resource_calls() {
    let h = harness();
    h.login_as("AT1", "RT1");
    h.transport.route("/auth/refresh", |_| {
        MockReply::json(200, json!({ "success": true, "data": { "accessToken": "AT2", "refreshToken": "RT2" } }))
    });
    h.transport.route("/service-provider/trips/t1", |req| {
        if bearer_of(req).as_deref() == Some("AT2") {
            MockReply::json(200, json!({ "success": true, "data": { "id": "t1", "status": "in_transit" } }))
        } else {
            MockReply::json(401, json!({ "message": "jwt expired" }))
        }
    });
    let trips = ResourceClient::new(h.gateway.clone(), ResourceGroup::Trips);

    let trip: Trip = trips.get("t1").await.unwrap();

    assert_eq!(trip.id, "t1");
    assert_eq!(h.transport.calls_to("/auth/refresh"), 1);
}
