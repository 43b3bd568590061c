//! Error codes for the gateway API.
//!
//! Add new codes here; never pass ad-hoc strings as error codes.
//!
//! All error codes are SCREAMING_SNAKE_CASE and map 1:1 to the strings
//! that appear in the `error.code` field of response envelopes.

use core::fmt;

/// Centralized error codes for the gateway API.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCode {
    // Request Validation
    /// General validation error
    ValidationError,
    /// Malformed request (unparseable body, bad header)
    BadRequest,

    // Authentication & Authorization
    /// Authentication required
    Unauthorized,
    /// Email/password pair rejected (never says which part)
    InvalidCredentials,
    /// No Authorization header on a route that requires one
    MissingAuthHeader,
    /// Authorization header present but not `Bearer <token>`
    InvalidAuthHeader,
    /// Token is past its expiry
    TokenExpired,
    /// Token signature, structure, algorithm or kind is wrong
    InvalidToken,
    /// Refresh token unknown, revoked or expired
    InvalidRefreshToken,
    /// Access denied
    Forbidden,
    /// Caller's role is not in the route's allowed set
    InsufficientRole,

    // Resource Not Found
    /// General not found error
    NotFound,
    /// No gateway route matches the request
    RouteNotFound,

    // Conflicts
    /// Generic conflict
    Conflict,

    // Throttling
    /// Per-client token bucket exhausted
    RateLimitExceeded,

    // Downstream
    /// Downstream unreachable or returned an unusable response
    BadGateway,
    /// Downstream timed out or the request deadline ran out
    ServiceUnavailable,

    // System Errors
    /// Internal server error
    InternalError,
    /// Configuration error
    ConfigError,
    /// Database error
    DbError,
    /// Database unavailable
    DbUnavailable,
}

impl ErrorCode {
    /// Returns the canonical SCREAMING_SNAKE_CASE string for this error code.
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::ValidationError => "VALIDATION_ERROR",
            Self::BadRequest => "BAD_REQUEST",

            Self::Unauthorized => "UNAUTHORIZED",
            Self::InvalidCredentials => "INVALID_CREDENTIALS",
            Self::MissingAuthHeader => "MISSING_AUTH_HEADER",
            Self::InvalidAuthHeader => "INVALID_AUTH_HEADER",
            Self::TokenExpired => "TOKEN_EXPIRED",
            Self::InvalidToken => "INVALID_TOKEN",
            Self::InvalidRefreshToken => "INVALID_REFRESH_TOKEN",
            Self::Forbidden => "FORBIDDEN",
            Self::InsufficientRole => "INSUFFICIENT_ROLE",

            Self::NotFound => "NOT_FOUND",
            Self::RouteNotFound => "ROUTE_NOT_FOUND",

            Self::Conflict => "CONFLICT",

            Self::RateLimitExceeded => "RATE_LIMIT_EXCEEDED",

            Self::BadGateway => "BAD_GATEWAY",
            Self::ServiceUnavailable => "SERVICE_UNAVAILABLE",

            Self::InternalError => "INTERNAL_ERROR",
            Self::ConfigError => "CONFIG_ERROR",
            Self::DbError => "DB_ERROR",
            Self::DbUnavailable => "DB_UNAVAILABLE",
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_code_strings() {
        assert_eq!(ErrorCode::ValidationError.as_str(), "VALIDATION_ERROR");
        assert_eq!(ErrorCode::Unauthorized.as_str(), "UNAUTHORIZED");
        assert_eq!(
            ErrorCode::InvalidCredentials.as_str(),
            "INVALID_CREDENTIALS"
        );
        assert_eq!(ErrorCode::MissingAuthHeader.as_str(), "MISSING_AUTH_HEADER");
        assert_eq!(ErrorCode::InvalidAuthHeader.as_str(), "INVALID_AUTH_HEADER");
        assert_eq!(ErrorCode::TokenExpired.as_str(), "TOKEN_EXPIRED");
        assert_eq!(ErrorCode::InvalidToken.as_str(), "INVALID_TOKEN");
        assert_eq!(
            ErrorCode::InvalidRefreshToken.as_str(),
            "INVALID_REFRESH_TOKEN"
        );
        assert_eq!(ErrorCode::InsufficientRole.as_str(), "INSUFFICIENT_ROLE");
        assert_eq!(ErrorCode::RouteNotFound.as_str(), "ROUTE_NOT_FOUND");
        assert_eq!(ErrorCode::RateLimitExceeded.as_str(), "RATE_LIMIT_EXCEEDED");
        assert_eq!(ErrorCode::BadGateway.as_str(), "BAD_GATEWAY");
        assert_eq!(ErrorCode::ServiceUnavailable.as_str(), "SERVICE_UNAVAILABLE");
        assert_eq!(ErrorCode::InternalError.as_str(), "INTERNAL_ERROR");
    }

    #[test]
    fn test_display_trait() {
        assert_eq!(format!("{}", ErrorCode::TokenExpired), "TOKEN_EXPIRED");
        assert_eq!(
            format!("{}", ErrorCode::RateLimitExceeded),
            "RATE_LIMIT_EXCEEDED"
        );
    }
}
