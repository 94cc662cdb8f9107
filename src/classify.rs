//! Response classification.
//!
//! The backend sometimes reports a business success with a non-2xx status.
//! A body-level `success: true` therefore overrides the transport status;
//! everything else falls back to the status code alone.

use serde_json::Value;

use crate::types::ResponseBody;

/// Returns `true` if the exchange counts as a success.
///
/// Success when the status is 2xx, or when the body is a JSON object whose
/// `success` field is exactly boolean `true`.
#[must_use]
pub fn is_success(status: u16, body: &ResponseBody) -> bool {
    (200..300).contains(&status) || has_success_flag(body)
}

fn has_success_flag(body: &ResponseBody) -> bool {
    match body {
        ResponseBody::Json(Value::Object(map)) => map.get("success") == Some(&Value::Bool(true)),
        _ => false,
    }
}

#[cfg(test)]
#[path = "classify_test.rs"]
mod tests;
