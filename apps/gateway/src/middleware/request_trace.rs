//! Outermost middleware: correlation id, typed request context and the
//! task-local scope every later stage logs and renders errors under.
//!
//! Inner stages render their own rejections; the inner future is polled
//! inside the scope, so those envelopes carry the request id too.

use actix_web::dev::{forward_ready, Service, ServiceRequest, ServiceResponse, Transform};
use actix_web::http::header::{HeaderName, HeaderValue};
use actix_web::{web, HttpMessage};
use futures_util::future::{ready, LocalBoxFuture, Ready};

use crate::context::{resolve_client_id, resolve_request_id, RequestContext};
use crate::proxy::headers::{X_FORWARDED_FOR, X_REQUEST_ID};
use crate::state::app_state::AppState;
use crate::trace_ctx;

pub struct RequestTrace;

impl<S, B> Transform<S, ServiceRequest> for RequestTrace
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = actix_web::Error>,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = actix_web::Error;
    type InitError = ();
    type Transform = RequestTraceMiddleware<S>;
    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        ready(Ok(RequestTraceMiddleware { service }))
    }
}

pub struct RequestTraceMiddleware<S> {
    service: S,
}

impl<S, B> Service<ServiceRequest> for RequestTraceMiddleware<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = actix_web::Error>,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = actix_web::Error;
    type Future = LocalBoxFuture<'static, Result<Self::Response, Self::Error>>;

    forward_ready!(service);

    fn call(&self, req: ServiceRequest) -> Self::Future {
        let trust_forwarded_for = req
            .app_data::<web::Data<AppState>>()
            .is_some_and(|state| state.trust_forwarded_for);

        let request_id = resolve_request_id(
            req.headers()
                .get(X_REQUEST_ID)
                .and_then(|v| v.to_str().ok()),
        );
        let peer_ip = req.peer_addr().map(|addr| addr.ip().to_string());
        let client_id = resolve_client_id(
            peer_ip.as_deref(),
            req.headers()
                .get(X_FORWARDED_FOR)
                .and_then(|v| v.to_str().ok()),
            trust_forwarded_for,
        );

        req.extensions_mut()
            .insert(RequestContext::new(request_id.clone(), client_id));

        let fut = trace_ctx::sync_with_request_id(request_id.clone(), || self.service.call(req));

        let header_value = HeaderValue::from_str(&request_id)
            .unwrap_or_else(|_| HeaderValue::from_static("invalid-request-id"));

        Box::pin(trace_ctx::with_request_id(request_id, async move {
            let mut res = fut.await?;
            res.headers_mut()
                .insert(HeaderName::from_static(X_REQUEST_ID), header_value);

            Ok(res)
        }))
    }
}
