use actix_web::dev::Payload;
use actix_web::http::header::AUTHORIZATION;
use actix_web::{web, FromRequest, HttpMessage, HttpRequest};
use futures_util::future::{ready, Ready};

use crate::auth::claims::Claims;
use crate::context::RequestContext;
use crate::error::AppError;
use crate::extractors::bearer::parse_bearer;
use crate::state::app_state::AppState;

/// Verified caller identity.
///
/// Reuses claims already verified by `Authorize`; otherwise validates the
/// bearer token itself.
#[derive(Debug, Clone)]
pub struct Identity(pub Claims);

fn extract_identity(req: &HttpRequest) -> Result<Identity, AppError> {
    if let Some(claims) = req
        .extensions()
        .get::<RequestContext>()
        .and_then(|ctx| ctx.identity.clone())
    {
        return Ok(Identity(claims));
    }

    let token = parse_bearer(req.headers().get(AUTHORIZATION))?
        .ok_or_else(AppError::missing_auth_header)?;

    let state = req
        .app_data::<web::Data<AppState>>()
        .ok_or_else(|| AppError::internal("AppState not available"))?;

    state.auth.validate_access(&token).map(Identity)
}

impl FromRequest for Identity {
    type Error = AppError;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _payload: &mut Payload) -> Self::Future {
        ready(extract_identity(req))
    }
}
