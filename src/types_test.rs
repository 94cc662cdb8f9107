use super::*;
use serde_json::json;

// =============================================================================
// headers
// =============================================================================

#[test]
fn set_header_replaces_case_insensitively() {
    let mut headers = Headers::new();
    set_header(&mut headers, "authorization", "Bearer old");
    set_header(&mut headers, "Authorization", "Bearer new");
    assert_eq!(headers.len(), 1);
    assert_eq!(header_value(&headers, "AUTHORIZATION"), Some("Bearer new"));
}

#[test]
fn remove_header_ignores_case() {
    let mut headers = Headers::new();
    set_header(&mut headers, "X-Auth-Token", "abc");
    remove_header(&mut headers, "x-auth-token");
    assert!(headers.is_empty());
}

// =============================================================================
// ApiRequest
// =============================================================================

#[test]
fn request_builders_set_method_and_body() {
    let req = ApiRequest::post("/service-provider/trips", json!({ "origin": "BOM" }));
    assert_eq!(req.method, Method::POST);
    assert_eq!(req.body, Some(json!({ "origin": "BOM" })));

    let req = ApiRequest::get("/service-provider/trips").with_query("page", 2).with_header("X-Tenant", "t1");
    assert_eq!(req.query, vec![("page".to_string(), "2".to_string())]);
    assert_eq!(header_value(&req.headers, "x-tenant"), Some("t1"));
    assert!(req.body.is_none());
}

// =============================================================================
// ResponseBody
// =============================================================================

#[test]
fn body_empty_bytes_is_empty() {
    assert_eq!(ResponseBody::from_bytes(Some("application/json"), Vec::new()), ResponseBody::Empty);
}

#[test]
fn body_json_content_type_parses() {
    let body = ResponseBody::from_bytes(Some("application/json; charset=utf-8"), br#"{"success":true}"#.to_vec());
    assert_eq!(body, ResponseBody::Json(json!({ "success": true })));
}

#[test]
fn body_invalid_json_falls_back_to_text() {
    let body = ResponseBody::from_bytes(Some("application/json"), b"Bad Gateway".to_vec());
    assert_eq!(body, ResponseBody::Text("Bad Gateway".into()));
}

#[test]
fn body_untyped_json_is_sniffed() {
    let body = ResponseBody::from_bytes(None, br#"{"message":"jwt expired"}"#.to_vec());
    assert_eq!(body.message(), Some("jwt expired"));
}

#[test]
fn body_binary_content_type_stays_binary() {
    let body = ResponseBody::from_bytes(Some("application/pdf"), vec![0x25, 0x50, 0x44, 0x46]);
    assert!(matches!(body, ResponseBody::Binary(bytes) if bytes.len() == 4));
}

// =============================================================================
// ApiResponse
// =============================================================================

#[test]
fn failure_message_prefers_body_message() {
    let resp = ApiResponse::json(400, json!({ "success": false, "message": "vehicle number taken" }));
    assert_eq!(resp.failure_message(), "vehicle number taken");
}

#[test]
fn failure_message_uses_error_field() {
    let resp = ApiResponse::json(403, json!({ "error": "forbidden" }));
    assert_eq!(resp.failure_message(), "forbidden");
}

#[test]
fn failure_message_defaults_to_status() {
    let resp = ApiResponse::new(502, ResponseBody::Empty);
    assert_eq!(resp.failure_message(), "request failed with status 502");
}

#[test]
fn failure_message_truncates_text() {
    let resp = ApiResponse::new(500, ResponseBody::Text("x".repeat(500)));
    assert_eq!(resp.failure_message().len(), 200);
}

// =============================================================================
// Envelope / SessionUser
// =============================================================================

#[test]
fn envelope_decodes_pagination() {
    let env: Envelope<Vec<Value>> = serde_json::from_value(json!({
        "success": true,
        "data": [{ "id": "t1" }],
        "pagination": { "page": 1, "limit": 20, "total": 1, "totalPages": 1 }
    }))
    .unwrap();
    assert!(env.success);
    assert_eq!(env.data.unwrap().len(), 1);
    assert_eq!(env.pagination.unwrap().total_pages, 1);
}

#[test]
fn envelope_without_data_decodes() {
    let env: Envelope<Value> = serde_json::from_value(json!({ "success": false, "message": "nope" })).unwrap();
    assert!(!env.success);
    assert!(env.data.is_none());
    assert_eq!(env.message.as_deref(), Some("nope"));
}

#[test]
fn session_user_keeps_extra_fields() {
    let user: SessionUser =
        serde_json::from_value(json!({ "id": "1", "role": "provider", "email": "a@b.com" })).unwrap();
    assert_eq!(user.role, "provider");
    assert_eq!(user.extra.get("email"), Some(&json!("a@b.com")));

    let round = serde_json::to_value(&user).unwrap();
    assert_eq!(round["email"], "a@b.com");
}

#[test]
fn session_user_accepts_numeric_id() {
    let user: SessionUser = serde_json::from_value(json!({ "id": 42, "role": "provider" })).unwrap();
    assert_eq!(user.id, "42");
    assert!(user.extra.is_empty());

    assert_eq!(serde_json::to_value(&user).unwrap()["id"], "42");
}

#[test]
fn session_user_rejects_structured_id() {
    assert!(serde_json::from_value::<SessionUser>(json!({ "id": { "value": 1 }, "role": "provider" })).is_err());
}
