//! User repository functions for the domain layer (generic over ConnectionTrait).

use sea_orm::ConnectionTrait;
use tracing::error;
use uuid::Uuid;

use crate::adapters::users_sea as users_adapter;
use crate::auth::claims::Role;
use crate::entities::users;
use crate::errors::domain::{DomainError, InfraErrorKind};

/// User domain model
#[derive(Debug, Clone, PartialEq)]
pub struct User {
    pub id: Uuid,
    pub email: String,
    pub password_hash: String,
    pub role: Role,
    pub is_active: bool,
    pub created_at: time::OffsetDateTime,
    pub updated_at: time::OffsetDateTime,
}

impl TryFrom<users::Model> for User {
    type Error = DomainError;

    fn try_from(model: users::Model) -> Result<Self, Self::Error> {
        let role = model.role.parse::<Role>().map_err(|e| {
            error!(user_id = %model.id, error = %e, "stored user role is not recognised");
            DomainError::infra(InfraErrorKind::DataCorruption, "Stored user role is invalid")
        })?;

        Ok(Self {
            id: model.id,
            email: model.email,
            password_hash: model.password_hash,
            role,
            is_active: model.is_active,
            created_at: model.created_at,
            updated_at: model.updated_at,
        })
    }
}

/// Emails are stored and looked up in normalized form.
pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

pub async fn find_user_by_email<C: ConnectionTrait + Send + Sync>(
    conn: &C,
    email: &str,
) -> Result<Option<User>, DomainError> {
    let user = users_adapter::find_by_email(conn, &normalize_email(email)).await?;
    user.map(User::try_from).transpose()
}

pub async fn find_user_by_id<C: ConnectionTrait + Send + Sync>(
    conn: &C,
    id: Uuid,
) -> Result<Option<User>, DomainError> {
    let user = users_adapter::find_by_id(conn, id).await?;
    user.map(User::try_from).transpose()
}

pub async fn create_user<C: ConnectionTrait + Send + Sync>(
    conn: &C,
    email: &str,
    password_hash: &str,
    role: Role,
    is_active: bool,
) -> Result<User, DomainError> {
    let email = normalize_email(email);
    if email.is_empty() {
        return Err(DomainError::validation("Email must not be empty"));
    }

    let user = users_adapter::create_user(
        conn,
        users_adapter::UserCreate {
            email,
            password_hash: password_hash.to_string(),
            role: role.as_str().to_string(),
            is_active,
        },
    )
    .await?;
    User::try_from(user)
}

pub async fn set_user_active<C: ConnectionTrait + Send + Sync>(
    conn: &C,
    id: Uuid,
    is_active: bool,
) -> Result<User, DomainError> {
    let user = users_adapter::set_active(conn, id, is_active).await?;
    User::try_from(user)
}
