//! Credential lookup and verification.

use std::sync::LazyLock;

use async_trait::async_trait;
use sea_orm::DatabaseConnection;
use tracing::warn;
use uuid::Uuid;

use crate::errors::domain::{DomainError, InfraErrorKind};
use crate::repos::users::{self, User};

#[async_trait]
pub trait UserStore: Send + Sync {
    async fn find_by_id(&self, id: Uuid) -> Result<Option<User>, DomainError>;

    /// Returns the user only when the email exists, the password matches and
    /// the account is active.
    async fn verify_credentials(
        &self,
        email: &str,
        password: &str,
    ) -> Result<Option<User>, DomainError>;
}

// Verified against when the email is unknown so both failure paths pay for
// one bcrypt check. Only touched from the blocking pool: the first access
// runs a full-cost `bcrypt::hash`.
static DUMMY_HASH: LazyLock<Option<String>> =
    LazyLock::new(|| bcrypt::hash("gateway-dummy-password", bcrypt::DEFAULT_COST).ok());

/// Check `password` against `hash`, or against the dummy hash when `None`.
async fn verify_password(password: &str, hash: Option<&str>) -> Result<bool, DomainError> {
    let password = password.to_string();
    let hash = hash.map(str::to_string);

    let outcome = tokio::task::spawn_blocking(move || match hash {
        Some(hash) => bcrypt::verify(password, &hash),
        None => match DUMMY_HASH.as_deref() {
            Some(dummy) => bcrypt::verify(password, dummy),
            None => Ok(false),
        },
    })
    .await
    .map_err(|e| {
        DomainError::infra(
            InfraErrorKind::Task,
            format!("password verification task failed: {e}"),
        )
    })?;

    match outcome {
        Ok(matches) => Ok(matches),
        Err(e) => {
            warn!(error = %e, "stored password hash could not be verified");
            Ok(false)
        }
    }
}

#[derive(Debug, Clone)]
pub struct SeaUserStore {
    db: DatabaseConnection,
}

impl SeaUserStore {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }
}

#[async_trait]
impl UserStore for SeaUserStore {
    async fn find_by_id(&self, id: Uuid) -> Result<Option<User>, DomainError> {
        users::find_user_by_id(&self.db, id).await
    }

    async fn verify_credentials(
        &self,
        email: &str,
        password: &str,
    ) -> Result<Option<User>, DomainError> {
        let Some(user) = users::find_user_by_email(&self.db, email).await? else {
            verify_password(password, None).await?;
            return Ok(None);
        };

        if !verify_password(password, Some(&user.password_hash)).await? {
            return Ok(None);
        }
        if !user.is_active {
            return Ok(None);
        }
        Ok(Some(user))
    }
}
