use actix_web::error::ResponseError;
use actix_web::http::header::{self, HeaderValue};
use actix_web::http::StatusCode;
use actix_web::HttpResponse;
use thiserror::Error;
use tracing::{error, warn};

use crate::envelope::Envelope;
use crate::errors::domain::{DomainError, InfraErrorKind};
use crate::errors::ErrorCode;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Validation error: {detail}")]
    Validation { code: ErrorCode, detail: String },
    #[error("Bad request: {detail}")]
    BadRequest { code: ErrorCode, detail: String },
    #[error("Unauthorized: {code}")]
    Unauthorized { code: ErrorCode },
    #[error("Forbidden: {code}")]
    Forbidden { code: ErrorCode },
    #[error("Not found: {detail}")]
    NotFound { code: ErrorCode, detail: String },
    #[error("Conflict: {detail}")]
    Conflict { code: ErrorCode, detail: String },
    #[error("Rate limit exceeded")]
    RateLimited { retry_after_secs: u64 },
    #[error("Bad gateway: {detail}")]
    BadGateway { detail: String },
    #[error("Service unavailable: {detail}")]
    ServiceUnavailable { detail: String },
    #[error("Internal error: {detail}")]
    Internal { detail: String },
    #[error("Configuration error: {detail}")]
    Config { detail: String },
    #[error("Database error: {detail}")]
    Db { detail: String },
    #[error("Database unavailable: {detail}")]
    DbUnavailable { detail: String },
}

impl AppError {
    /// Machine-readable code carried in `error.code`.
    pub fn code(&self) -> ErrorCode {
        match self {
            AppError::Validation { code, .. } => *code,
            AppError::BadRequest { code, .. } => *code,
            AppError::Unauthorized { code } => *code,
            AppError::Forbidden { code } => *code,
            AppError::NotFound { code, .. } => *code,
            AppError::Conflict { code, .. } => *code,
            AppError::RateLimited { .. } => ErrorCode::RateLimitExceeded,
            AppError::BadGateway { .. } => ErrorCode::BadGateway,
            AppError::ServiceUnavailable { .. } => ErrorCode::ServiceUnavailable,
            AppError::Internal { .. } => ErrorCode::InternalError,
            AppError::Config { .. } => ErrorCode::ConfigError,
            AppError::Db { .. } => ErrorCode::DbError,
            AppError::DbUnavailable { .. } => ErrorCode::DbUnavailable,
        }
    }

    /// Get the HTTP status code for this error
    pub fn status(&self) -> StatusCode {
        match self {
            AppError::Validation { .. } => StatusCode::BAD_REQUEST,
            AppError::BadRequest { .. } => StatusCode::BAD_REQUEST,
            AppError::Unauthorized { .. } => StatusCode::UNAUTHORIZED,
            AppError::Forbidden { .. } => StatusCode::FORBIDDEN,
            AppError::NotFound { .. } => StatusCode::NOT_FOUND,
            AppError::Conflict { .. } => StatusCode::CONFLICT,
            AppError::RateLimited { .. } => StatusCode::TOO_MANY_REQUESTS,
            AppError::BadGateway { .. } => StatusCode::BAD_GATEWAY,
            AppError::ServiceUnavailable { .. } => StatusCode::SERVICE_UNAVAILABLE,
            AppError::Internal { .. } => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::Config { .. } => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::Db { .. } => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::DbUnavailable { .. } => StatusCode::SERVICE_UNAVAILABLE,
        }
    }

    /// Human-readable message sent to the client. Internal causes stay in logs.
    pub fn public_message(&self) -> String {
        match self {
            AppError::Validation { detail, .. } => detail.clone(),
            AppError::BadRequest { detail, .. } => detail.clone(),
            AppError::NotFound { detail, .. } => detail.clone(),
            AppError::Conflict { detail, .. } => detail.clone(),
            AppError::Unauthorized { code } => match code {
                ErrorCode::MissingAuthHeader => "Authorization header is required",
                ErrorCode::InvalidAuthHeader => "Authorization header must be 'Bearer <token>'",
                ErrorCode::TokenExpired => "Token has expired",
                ErrorCode::InvalidToken => "Invalid token",
                ErrorCode::InvalidCredentials => "Invalid email or password",
                ErrorCode::InvalidRefreshToken => "Invalid or expired refresh token",
                _ => "Authentication required",
            }
            .to_string(),
            AppError::Forbidden { code } => match code {
                ErrorCode::InsufficientRole => "Insufficient permissions for this resource",
                _ => "Access denied",
            }
            .to_string(),
            AppError::RateLimited { .. } => "Too many requests, please slow down".to_string(),
            AppError::BadGateway { .. } => "Upstream service is unavailable".to_string(),
            AppError::ServiceUnavailable { .. } => {
                "Upstream service did not respond in time".to_string()
            }
            AppError::DbUnavailable { .. } => "Service temporarily unavailable".to_string(),
            AppError::Internal { .. } | AppError::Config { .. } | AppError::Db { .. } => {
                "Internal server error".to_string()
            }
        }
    }

    pub fn invalid(detail: impl Into<String>) -> Self {
        Self::Validation {
            code: ErrorCode::ValidationError,
            detail: detail.into(),
        }
    }

    pub fn bad_request(code: ErrorCode, detail: impl Into<String>) -> Self {
        Self::BadRequest {
            code,
            detail: detail.into(),
        }
    }

    pub fn unauthorized() -> Self {
        Self::Unauthorized {
            code: ErrorCode::Unauthorized,
        }
    }

    pub fn missing_auth_header() -> Self {
        Self::Unauthorized {
            code: ErrorCode::MissingAuthHeader,
        }
    }

    pub fn invalid_auth_header() -> Self {
        Self::Unauthorized {
            code: ErrorCode::InvalidAuthHeader,
        }
    }

    pub fn token_expired() -> Self {
        Self::Unauthorized {
            code: ErrorCode::TokenExpired,
        }
    }

    pub fn invalid_token() -> Self {
        Self::Unauthorized {
            code: ErrorCode::InvalidToken,
        }
    }

    pub fn invalid_credentials() -> Self {
        Self::Unauthorized {
            code: ErrorCode::InvalidCredentials,
        }
    }

    pub fn invalid_refresh_token() -> Self {
        Self::Unauthorized {
            code: ErrorCode::InvalidRefreshToken,
        }
    }

    pub fn forbidden() -> Self {
        Self::Forbidden {
            code: ErrorCode::Forbidden,
        }
    }

    pub fn insufficient_role() -> Self {
        Self::Forbidden {
            code: ErrorCode::InsufficientRole,
        }
    }

    pub fn not_found(code: ErrorCode, detail: impl Into<String>) -> Self {
        Self::NotFound {
            code,
            detail: detail.into(),
        }
    }

    pub fn conflict(code: ErrorCode, detail: impl Into<String>) -> Self {
        Self::Conflict {
            code,
            detail: detail.into(),
        }
    }

    pub fn rate_limited(retry_after_secs: u64) -> Self {
        Self::RateLimited { retry_after_secs }
    }

    pub fn bad_gateway(detail: impl Into<String>) -> Self {
        Self::BadGateway {
            detail: detail.into(),
        }
    }

    pub fn service_unavailable(detail: impl Into<String>) -> Self {
        Self::ServiceUnavailable {
            detail: detail.into(),
        }
    }

    pub fn internal(detail: impl Into<String>) -> Self {
        Self::Internal {
            detail: detail.into(),
        }
    }

    pub fn config(detail: impl Into<String>) -> Self {
        Self::Config {
            detail: detail.into(),
        }
    }

    pub fn db(detail: impl Into<String>) -> Self {
        Self::Db {
            detail: detail.into(),
        }
    }

    pub fn db_unavailable(detail: impl Into<String>) -> Self {
        Self::DbUnavailable {
            detail: detail.into(),
        }
    }
}

impl From<DomainError> for AppError {
    fn from(e: DomainError) -> Self {
        match e {
            DomainError::Validation(detail) => AppError::invalid(detail),
            DomainError::Conflict { detail, .. } => AppError::conflict(ErrorCode::Conflict, detail),
            DomainError::NotFound(detail) => AppError::not_found(ErrorCode::NotFound, detail),
            DomainError::Infra {
                kind: InfraErrorKind::DbUnavailable,
                detail,
            } => AppError::db_unavailable(detail),
            DomainError::Infra {
                kind: InfraErrorKind::Timeout,
                detail,
            } => AppError::db_unavailable(format!("timeout: {detail}")),
            DomainError::Infra { detail, .. } => AppError::db(detail),
        }
    }
}

impl From<sea_orm::DbErr> for AppError {
    fn from(e: sea_orm::DbErr) -> Self {
        AppError::from(crate::infra::db_errors::map_db_err(e))
    }
}

impl ResponseError for AppError {
    fn status_code(&self) -> StatusCode {
        self.status()
    }

    fn error_response(&self) -> HttpResponse {
        let status = self.status();
        let code = self.code();
        let envelope = Envelope::failure(code.as_str(), self.public_message());

        if status.is_server_error() {
            error!(
                code = %code,
                status = status.as_u16(),
                request_id = %envelope.request_id,
                detail = %self,
                "request failed"
            );
        } else {
            warn!(
                code = %code,
                status = status.as_u16(),
                request_id = %envelope.request_id,
                "request rejected"
            );
        }

        let mut builder = HttpResponse::build(status);
        builder.insert_header(("x-request-id", envelope.request_id.clone()));
        if let AppError::RateLimited { retry_after_secs } = self {
            builder.insert_header((
                header::RETRY_AFTER,
                HeaderValue::from(*retry_after_secs),
            ));
        }
        builder.json(envelope)
    }
}
