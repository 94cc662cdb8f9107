use super::*;

#[test]
fn error_codes_are_stable() {
    assert_eq!(GatewayError::Transport("x".into()).error_code(), "E_TRANSPORT");
    assert_eq!(GatewayError::Storage("x".into()).error_code(), "E_STORAGE");
    assert_eq!(GatewayError::InvalidRequest("x".into()).error_code(), "E_INVALID_REQUEST");
    assert_eq!(GatewayError::Api { status: 404, message: "nope".into() }.error_code(), "E_API");
}

#[test]
fn transport_and_server_errors_are_retryable() {
    assert!(GatewayError::Transport("reset".into()).retryable());
    assert!(GatewayError::Api { status: 503, message: String::new() }.retryable());
    assert!(GatewayError::Api { status: 429, message: String::new() }.retryable());
}

#[test]
fn client_errors_are_not_retryable() {
    assert!(!GatewayError::Api { status: 401, message: String::new() }.retryable());
    assert!(!GatewayError::Decode("bad".into()).retryable());
    assert!(!GatewayError::ConfigParse("bad".into()).retryable());
}

#[test]
fn api_error_display_includes_status_and_message() {
    let err = GatewayError::Api { status: 409, message: "duplicate trip".into() };
    assert_eq!(err.to_string(), "API error: status 409: duplicate trip");
}
