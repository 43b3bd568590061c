//! Catch-all handler: relays an authorized request to its downstream.

use actix_web::http::header::{self as actix_header, HOST};
use actix_web::http::StatusCode;
use actix_web::{web, HttpMessage, HttpRequest, HttpResponse};
use bytes::BytesMut;
use futures_util::StreamExt;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use tracing::warn;

use crate::context::RequestContext;
use crate::error::AppError;
use crate::errors::ErrorCode;
use crate::proxy::routes::ResolvedRoute;
use crate::proxy::{ProxyRequest, ProxyResponse};
use crate::state::app_state::AppState;

async fn read_body(mut payload: web::Payload, limit: usize) -> Result<bytes::Bytes, AppError> {
    let mut body = BytesMut::new();
    while let Some(chunk) = payload.next().await {
        let chunk = chunk.map_err(|e| {
            warn!(error = %e, "Failed to read request body chunk");
            AppError::bad_request(ErrorCode::BadRequest, "Failed to read request body")
        })?;
        if body.len() + chunk.len() > limit {
            return Err(AppError::bad_request(
                ErrorCode::BadRequest,
                "Request body is too large",
            ));
        }
        body.extend_from_slice(&chunk);
    }
    Ok(body.freeze())
}

/// actix and reqwest sit on different `http` majors, so headers cross over
/// by name and bytes.
fn to_outbound_headers(inbound: &actix_header::HeaderMap) -> HeaderMap {
    let mut out = HeaderMap::with_capacity(inbound.len());
    for (name, value) in inbound.iter() {
        if let (Ok(name), Ok(value)) = (
            HeaderName::from_bytes(name.as_str().as_bytes()),
            HeaderValue::from_bytes(value.as_bytes()),
        ) {
            out.append(name, value);
        }
    }
    out
}

fn into_http_response(upstream: ProxyResponse) -> HttpResponse {
    let status =
        StatusCode::from_u16(upstream.status.as_u16()).unwrap_or(StatusCode::BAD_GATEWAY);
    let mut builder = HttpResponse::build(status);
    for (name, value) in upstream.headers.iter() {
        if let (Ok(name), Ok(value)) = (
            actix_header::HeaderName::from_bytes(name.as_str().as_bytes()),
            actix_header::HeaderValue::from_bytes(value.as_bytes()),
        ) {
            builder.append_header((name, value));
        }
    }
    builder.body(upstream.body)
}

pub async fn forward(
    req: HttpRequest,
    payload: web::Payload,
    app_state: web::Data<AppState>,
) -> Result<HttpResponse, AppError> {
    let route = req
        .extensions()
        .get::<ResolvedRoute>()
        .cloned()
        .ok_or_else(|| AppError::internal("proxy handler reached without a route rule"))?;
    let ctx = req
        .extensions()
        .get::<RequestContext>()
        .cloned()
        .ok_or_else(|| AppError::internal("RequestContext not available"))?;

    let method = reqwest::Method::from_bytes(req.method().as_str().as_bytes())
        .map_err(|_| AppError::bad_request(ErrorCode::BadRequest, "Unsupported HTTP method"))?;

    let body = read_body(payload, app_state.proxy.max_body_bytes).await?;

    let inbound = ProxyRequest {
        method,
        path: route.path,
        query: Some(req.query_string().to_string()).filter(|q| !q.is_empty()),
        headers: to_outbound_headers(req.headers()),
        body,
        client_addr: req.peer_addr().map(|addr| addr.ip().to_string()),
        host: req
            .headers()
            .get(HOST)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string),
        scheme: if req.app_config().secure() {
            "https".to_string()
        } else {
            "http".to_string()
        },
        request_id: ctx.request_id.clone(),
        identity: ctx.identity.clone(),
        deadline: Some(ctx.deadline(app_state.proxy.request_timeout)),
    };

    let upstream = app_state.forwarder.forward(inbound, &route.rule.target).await?;
    Ok(into_http_response(upstream))
}
