//! Route-table authorization for proxied paths.
//!
//! Normalizes the path, resolves its `RouteRule`, verifies the bearer token
//! and enforces role requirements. On success a `ResolvedRoute` is stored in
//! request extensions and the verified claims land on
//! `RequestContext::identity`. Failures are rendered here as responses.

use actix_web::body::EitherBody;
use actix_web::dev::{forward_ready, Service, ServiceRequest, ServiceResponse, Transform};
use actix_web::http::header;
use actix_web::{web, Error, HttpMessage};
use futures_util::future::{ready, LocalBoxFuture, Ready};

use crate::auth::claims::Claims;
use crate::context::RequestContext;
use crate::error::AppError;
use crate::errors::ErrorCode;
use crate::extractors::bearer::parse_bearer;
use crate::logging::security;
use crate::proxy::routes::{normalize_path, AuthRequirement, ResolvedRoute};
use crate::state::app_state::AppState;

pub struct Authorize;

impl<S, B> Transform<S, ServiceRequest> for Authorize
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error>,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<EitherBody<B>>;
    type Error = Error;
    type InitError = ();
    type Transform = AuthorizeMiddleware<S>;
    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        ready(Ok(AuthorizeMiddleware { service }))
    }
}

pub struct AuthorizeMiddleware<S> {
    service: S,
}

impl<S, B> Service<ServiceRequest> for AuthorizeMiddleware<S>
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
        let outcome = match req.app_data::<web::Data<AppState>>() {
            Some(state) => authorize(state, &req),
            None => Err(AppError::internal("AppState not available")),
        };

        match outcome {
            Ok((route, identity)) => {
                {
                    let mut extensions = req.extensions_mut();
                    if let Some(ctx) = extensions.get_mut::<RequestContext>() {
                        ctx.identity = identity;
                    }
                    extensions.insert(route);
                }
                let fut = self.service.call(req);
                Box::pin(async move { fut.await.map(ServiceResponse::map_into_left_body) })
            }
            Err(err) => {
                Box::pin(async move { Ok(req.error_response(err).map_into_right_body()) })
            }
        }
    }
}

fn authorize(
    state: &AppState,
    req: &ServiceRequest,
) -> Result<(ResolvedRoute, Option<Claims>), AppError> {
    let method = req.method().as_str();
    let path = normalize_path(req.path()).ok_or_else(|| {
        security::token_rejected("path_escapes_root", req.path());
        AppError::bad_request(ErrorCode::BadRequest, "Invalid request path")
    })?;
    let path = path.as_str();

    let rule = state.routes.match_route(method, path).cloned().ok_or_else(|| {
        AppError::not_found(ErrorCode::RouteNotFound, format!("No route for {method} {path}"))
    })?;

    let token = parse_bearer(req.headers().get(header::AUTHORIZATION)).inspect_err(|_| {
        security::token_rejected("malformed_auth_header", path);
    })?;

    let identity = match token {
        Some(token) => {
            let claims = state.auth.validate_access(&token).inspect_err(|e| {
                security::token_rejected(e.code().as_str(), path);
            })?;
            Some(claims)
        }
        None if rule.auth == AuthRequirement::Required || rule.roles.is_some() => {
            security::token_rejected("missing_auth_header", path);
            return Err(AppError::missing_auth_header());
        }
        None => None,
    };

    if let Some(claims) = &identity {
        if !rule.permits(claims.role) {
            security::access_denied(path, claims.role.as_str());
            return Err(AppError::insufficient_role());
        }
    }

    Ok((
        ResolvedRoute {
            rule,
            path: path.to_string(),
        },
        identity,
    ))
}
