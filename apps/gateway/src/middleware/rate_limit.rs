//! Per-client admission control. `/health` is exempt.

use std::future::{ready, Ready};

use actix_web::body::EitherBody;
use actix_web::dev::{forward_ready, Service, ServiceRequest, ServiceResponse, Transform};
use actix_web::{web, Error, HttpMessage};
use futures_util::future::LocalBoxFuture;

use crate::context::RequestContext;
use crate::error::AppError;
use crate::logging::security;
use crate::rate_limit::RateDecision;
use crate::state::app_state::AppState;

const EXEMPT_PATHS: &[&str] = &["/health"];

pub struct RateLimit;

impl<S, B> Transform<S, ServiceRequest> for RateLimit
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error>,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<EitherBody<B>>;
    type Error = Error;
    type InitError = ();
    type Transform = RateLimitMiddleware<S>;
    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        ready(Ok(RateLimitMiddleware { service }))
    }
}

pub struct RateLimitMiddleware<S> {
    service: S,
}

impl<S, B> Service<ServiceRequest> for RateLimitMiddleware<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error>,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<EitherBody<B>>;
    type Error = Error;
    type Future = LocalBoxFuture<'static, Result<Self::Response, Self::Error>>;

    forward_ready!(service);

    fn call(&self, req: ServiceRequest) -> Self::Future {
        let limiter = req
            .app_data::<web::Data<AppState>>()
            .map(|state| state.rate_limiter.clone());

        let decision = match limiter {
            Some(limiter) if !EXEMPT_PATHS.contains(&req.path()) => {
                let client_id = req
                    .extensions()
                    .get::<RequestContext>()
                    .map(|ctx| ctx.client_id.clone())
                    .unwrap_or_else(|| "unknown".to_string());
                Some((limiter.check(&client_id), client_id))
            }
            _ => None,
        };

        match decision {
            Some((RateDecision::Denied { retry_after_secs }, client_id)) => Box::pin(async move {
                security::rate_limit_hit(&client_id, req.path());
                let res = req.error_response(AppError::rate_limited(retry_after_secs));
                Ok(res.map_into_right_body())
            }),
            _ => {
                let fut = self.service.call(req);
                Box::pin(async move { fut.await.map(ServiceResponse::map_into_left_body) })
            }
        }
    }
}
