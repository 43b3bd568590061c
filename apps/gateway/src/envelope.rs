//! Response envelope shared by every gateway-generated response.
//!
//! Proxied responses are relayed verbatim and never wrapped.

use actix_web::http::StatusCode;
use actix_web::HttpResponse;
use serde::Serialize;
use time::format_description::well_known::Rfc3339;
use time::OffsetDateTime;

use crate::trace_ctx;

#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub code: String,
    pub message: String,
}

#[derive(Debug, Serialize)]
pub struct Envelope<T: Serialize> {
    pub success: bool,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<ErrorBody>,
    pub timestamp: String,
    pub request_id: String,
}

impl<T: Serialize> Envelope<T> {
    pub fn success(message: impl Into<String>, data: Option<T>) -> Self {
        Self {
            success: true,
            message: message.into(),
            data,
            error: None,
            timestamp: now_rfc3339(),
            request_id: trace_ctx::request_id(),
        }
    }
}

impl Envelope<()> {
    pub fn failure(code: &str, message: impl Into<String>) -> Self {
        let message = message.into();
        Self {
            success: false,
            message: message.clone(),
            data: None,
            error: Some(ErrorBody {
                code: code.to_string(),
                message,
            }),
            timestamp: now_rfc3339(),
            request_id: trace_ctx::request_id(),
        }
    }
}

/// `200 OK` with a success envelope around `data`.
pub fn ok<T: Serialize>(message: &str, data: T) -> HttpResponse {
    respond(StatusCode::OK, message, Some(data))
}

/// `200 OK` with a success envelope and no payload.
pub fn ok_empty(message: &str) -> HttpResponse {
    respond::<()>(StatusCode::OK, message, None)
}

fn respond<T: Serialize>(status: StatusCode, message: &str, data: Option<T>) -> HttpResponse {
    let envelope = Envelope::success(message, data);
    HttpResponse::build(status)
        .insert_header(("x-request-id", envelope.request_id.clone()))
        .json(envelope)
}

pub fn now_rfc3339() -> String {
    OffsetDateTime::now_utc()
        .format(&Rfc3339)
        .unwrap_or_else(|_| "unknown".to_string())
}
