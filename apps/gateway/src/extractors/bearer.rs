use actix_web::dev::Payload;
use actix_web::http::header::{HeaderValue, AUTHORIZATION};
use actix_web::{FromRequest, HttpRequest};
use futures_util::future::{ready, Ready};

use crate::error::AppError;

/// Parse an `Authorization` header value.
///
/// - absent → `Ok(None)`
/// - anything but `Bearer <token>` → `INVALID_AUTH_HEADER`
pub fn parse_bearer(header: Option<&HeaderValue>) -> Result<Option<String>, AppError> {
    let Some(value) = header else {
        return Ok(None);
    };

    let raw = value.to_str().map_err(|_| AppError::invalid_auth_header())?;
    let mut parts = raw.split_whitespace();
    match (parts.next(), parts.next(), parts.next()) {
        (Some(scheme), Some(token), None) if scheme.eq_ignore_ascii_case("bearer") => {
            Ok(Some(token.to_string()))
        }
        _ => Err(AppError::invalid_auth_header()),
    }
}

/// Bearer token that must be present and well-formed.
#[derive(Debug, Clone)]
pub struct BearerToken(pub String);

impl FromRequest for BearerToken {
    type Error = AppError;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _payload: &mut Payload) -> Self::Future {
        let result = match parse_bearer(req.headers().get(AUTHORIZATION)) {
            Ok(Some(token)) => Ok(BearerToken(token)),
            Ok(None) => Err(AppError::missing_auth_header()),
            Err(e) => Err(e),
        };
        ready(result)
    }
}

/// Bearer token that may be absent; a malformed header is still an error.
#[derive(Debug, Clone)]
pub struct OptionalBearer(pub Option<String>);

impl FromRequest for OptionalBearer {
    type Error = AppError;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _payload: &mut Payload) -> Self::Future {
        ready(parse_bearer(req.headers().get(AUTHORIZATION)).map(OptionalBearer))
    }
}
