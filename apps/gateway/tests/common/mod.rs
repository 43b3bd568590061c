#![allow(dead_code)]

// tests/common/mod.rs
use actix_web::body::MessageBody;
use actix_web::dev::ServiceResponse;
use actix_web::http::StatusCode;
use actix_web::test;
use serde_json::Value;

// Logging is auto-installed for every test binary
#[ctor::ctor]
fn init_logging() {
    gateway_test_support::logging::init();
}

/// Consume `resp` and assert it is an error envelope with `expected_code`.
pub async fn assert_error<B: MessageBody>(
    resp: ServiceResponse<B>,
    expected_status: u16,
    expected_code: &str,
) -> Value {
    let status = resp.status();
    let headers = resp.headers().clone();
    let body = test::read_body(resp).await;
    gateway_test_support::envelope::assert_error_envelope(
        status,
        &headers,
        &body,
        StatusCode::from_u16(expected_status).unwrap(),
        expected_code,
        None,
    );
    serde_json::from_slice(&body).unwrap()
}

/// Consume `resp`, assert `200` with a success envelope, and return `data`.
pub async fn success_data<B: MessageBody>(resp: ServiceResponse<B>) -> Value {
    assert_eq!(resp.status(), StatusCode::OK, "expected 200");
    let body = test::read_body(resp).await;
    gateway_test_support::envelope::success_data(&body)
}
