//! Envelope test helpers
//!
//! Assertions over the gateway's `{success, message, data?, error?, timestamp,
//! request_id}` response envelope that don't depend on gateway types.

use actix_web::http::header::HeaderMap;
use actix_web::http::StatusCode;
use serde::Deserialize;
use serde_json::Value;

#[derive(Debug, Deserialize)]
struct ErrorBodyLike {
    code: String,
    message: String,
}

#[derive(Debug, Deserialize)]
struct EnvelopeLike {
    success: bool,
    message: String,
    #[serde(default)]
    data: Option<Value>,
    #[serde(default)]
    error: Option<ErrorBodyLike>,
    timestamp: String,
    request_id: String,
}

/// Assert that response parts form a well-shaped error envelope.
///
/// Checks the status, the `success=false` flag, the error code, that
/// `request_id` matches the `x-request-id` header, and optionally that the
/// error message contains `expected_message`.
pub fn assert_error_envelope(
    status: StatusCode,
    headers: &HeaderMap,
    body: &[u8],
    expected_status: StatusCode,
    expected_code: &str,
    expected_message: Option<&str>,
) {
    assert_eq!(status, expected_status, "unexpected status");

    let envelope: EnvelopeLike =
        serde_json::from_slice(body).expect("body should be a JSON envelope");

    assert!(!envelope.success, "error envelope must have success=false");
    assert!(envelope.data.is_none(), "error envelope must not carry data");
    assert!(!envelope.timestamp.is_empty(), "timestamp should be set");

    let error = envelope.error.expect("error envelope must carry an error object");
    assert_eq!(error.code, expected_code);
    assert_eq!(envelope.message, error.message);

    let header_id = headers
        .get("x-request-id")
        .expect("x-request-id header should be present")
        .to_str()
        .expect("x-request-id header should be valid UTF-8");
    assert_eq!(
        envelope.request_id, header_id,
        "request_id in body should match x-request-id header"
    );

    if let Some(expected) = expected_message {
        assert!(
            error.message.contains(expected),
            "expected message to contain '{expected}', got '{}'",
            error.message
        );
    }
}

/// Assert a success envelope and return its `data` payload.
pub fn success_data(body: &[u8]) -> Value {
    let envelope: EnvelopeLike =
        serde_json::from_slice(body).expect("body should be a JSON envelope");
    assert!(envelope.success, "expected success=true, got {}", envelope.message);
    assert!(envelope.error.is_none());
    assert!(!envelope.request_id.is_empty());
    envelope.data.unwrap_or(Value::Null)
}
