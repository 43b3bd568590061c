//! SeaORM -> DomainError translation helpers.
//!
//! Adapters return `sea_orm::DbErr`; repos convert it here so that higher
//! layers only ever see `DomainError`.

use tracing::{error, warn};

use crate::errors::domain::{ConflictKind, DomainError, InfraErrorKind};
use crate::logging::pii::Redacted;
use crate::trace_ctx;

fn mentions_sqlstate(msg: &str, code: &str) -> bool {
    msg.contains(code) || msg.contains(&format!("SQLSTATE({code})"))
}

/// Map a unique-constraint message (SQLite `table.column` or Postgres
/// constraint name) to a conflict kind.
fn unique_conflict(error_msg: &str) -> (ConflictKind, &'static str) {
    if error_msg.contains("users.email") || error_msg.contains("users_email_key") {
        return (ConflictKind::Email, "Email already registered");
    }
    if error_msg.contains("refresh_tokens.token") || error_msg.contains("refresh_tokens_token_key")
    {
        return (ConflictKind::RefreshToken, "Refresh token already stored");
    }
    (ConflictKind::Unique, "Unique constraint violation")
}

/// Translate a `DbErr` into a `DomainError` with sanitized, PII-safe detail.
pub fn map_db_err(e: sea_orm::DbErr) -> DomainError {
    let error_msg = e.to_string();
    let request_id = trace_ctx::request_id();

    match &e {
        sea_orm::DbErr::RecordNotFound(_) => {
            return DomainError::not_found("Record not found");
        }
        sea_orm::DbErr::ConnectionAcquire(_) | sea_orm::DbErr::Conn(_) => {
            warn!(%request_id, raw_error = %Redacted(&error_msg), "Database unavailable");
            return DomainError::infra(InfraErrorKind::DbUnavailable, "Database unavailable");
        }
        _ => {}
    }

    if mentions_sqlstate(&error_msg, "23505")
        || error_msg.contains("duplicate key value violates unique constraint")
        || error_msg.contains("UNIQUE constraint failed")
    {
        warn!(%request_id, raw_error = %Redacted(&error_msg), "Unique constraint violation");
        let (kind, detail) = unique_conflict(&error_msg);
        return DomainError::conflict(kind, detail);
    }

    if mentions_sqlstate(&error_msg, "23503") || error_msg.contains("FOREIGN KEY constraint failed")
    {
        warn!(%request_id, raw_error = %Redacted(&error_msg), "Foreign key constraint violation");
        return DomainError::validation("Foreign key constraint violation");
    }

    if error_msg.contains("timeout") || error_msg.contains("pool") {
        warn!(%request_id, raw_error = %Redacted(&error_msg), "Database timeout or pool issue");
        return DomainError::infra(InfraErrorKind::Timeout, "Database timeout");
    }

    error!(%request_id, raw_error = %Redacted(&error_msg), "Unhandled database error");
    DomainError::infra(InfraErrorKind::Db, "Database operation failed")
}

impl From<sea_orm::DbErr> for DomainError {
    fn from(e: sea_orm::DbErr) -> Self {
        map_db_err(e)
    }
}
