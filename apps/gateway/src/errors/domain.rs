//! Storage-facing error type for repos, adapters and stores.
//!
//! Carries no HTTP status; `AppError` decides how each variant is rendered.

use thiserror::Error;

/// Which uniqueness rule a write ran into.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConflictKind {
    Email,
    RefreshToken,
    Unique,
}

/// Operational failures below the domain.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InfraErrorKind {
    Timeout,
    DbUnavailable,
    /// A stored row could not be turned into a domain value
    DataCorruption,
    /// A blocking task panicked or was cancelled
    Task,
    Db,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DomainError {
    #[error("validation error: {0}")]
    Validation(String),
    #[error("conflict ({kind:?}): {detail}")]
    Conflict { kind: ConflictKind, detail: String },
    #[error("not found: {0}")]
    NotFound(String),
    #[error("infra ({kind:?}): {detail}")]
    Infra { kind: InfraErrorKind, detail: String },
}

impl DomainError {
    pub fn validation(detail: impl Into<String>) -> Self {
        Self::Validation(detail.into())
    }

    pub fn conflict(kind: ConflictKind, detail: impl Into<String>) -> Self {
        Self::Conflict {
            kind,
            detail: detail.into(),
        }
    }

    pub fn not_found(detail: impl Into<String>) -> Self {
        Self::NotFound(detail.into())
    }

    pub fn infra(kind: InfraErrorKind, detail: impl Into<String>) -> Self {
        Self::Infra {
            kind,
            detail: detail.into(),
        }
    }
}
