//! `SECURITY_*` audit events. Callers pass raw values; anything sensitive is
//! redacted here.

use tracing::warn;

use crate::logging::pii::Redacted;
use crate::trace_ctx;

pub fn login_failed(reason: &str, email: &str) {
    let request_id = trace_ctx::request_id();

    warn!(
        event = "SECURITY_LOGIN_FAILED",
        %request_id,
        email = %Redacted(email),
        reason,
        "Authentication failure"
    );
}

pub fn token_rejected(reason: &str, path: &str) {
    let request_id = trace_ctx::request_id();

    warn!(
        event = "SECURITY_TOKEN_REJECTED",
        %request_id,
        path,
        reason,
        "Bearer token rejected"
    );
}

pub fn refresh_rejected(reason: &str) {
    let request_id = trace_ctx::request_id();

    warn!(
        event = "SECURITY_REFRESH_REJECTED",
        %request_id,
        reason,
        "Refresh token rejected"
    );
}

pub fn access_denied(path: &str, role: &str) {
    let request_id = trace_ctx::request_id();

    warn!(
        event = "SECURITY_ACCESS_DENIED",
        %request_id,
        path,
        role,
        "Role not permitted for route"
    );
}

/// Log a security-relevant rate-limit event.
pub fn rate_limit_hit(client_id: &str, path: &str) {
    let request_id = trace_ctx::request_id();

    warn!(
        event = "SECURITY_RATE_LIMIT_HIT",
        %request_id,
        client_id,
        path,
        "Rate limit exceeded"
    );
}
