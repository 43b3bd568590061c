//! Refresh token repository functions (generic over ConnectionTrait).

use sea_orm::ConnectionTrait;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::adapters::refresh_tokens_sea as tokens_adapter;
use crate::entities::refresh_tokens;
use crate::errors::domain::DomainError;

/// Refresh token domain model
#[derive(Debug, Clone, PartialEq)]
pub struct RefreshToken {
    pub id: Uuid,
    pub user_id: Uuid,
    pub token_value: String,
    pub expires_at: OffsetDateTime,
    pub created_at: OffsetDateTime,
    pub updated_at: OffsetDateTime,
}

impl RefreshToken {
    pub fn is_expired_at(&self, now: OffsetDateTime) -> bool {
        self.expires_at <= now
    }
}

impl From<refresh_tokens::Model> for RefreshToken {
    fn from(model: refresh_tokens::Model) -> Self {
        Self {
            id: model.id,
            user_id: model.user_id,
            token_value: model.token,
            expires_at: model.expires_at,
            created_at: model.created_at,
            updated_at: model.updated_at,
        }
    }
}

pub async fn create<C: ConnectionTrait + Send + Sync>(
    conn: &C,
    user_id: Uuid,
    token_value: &str,
    expires_at: OffsetDateTime,
) -> Result<RefreshToken, DomainError> {
    let row = tokens_adapter::insert(
        conn,
        tokens_adapter::RefreshTokenCreate {
            user_id,
            token: token_value.to_string(),
            expires_at,
        },
    )
    .await?;
    Ok(RefreshToken::from(row))
}

pub async fn find<C: ConnectionTrait + Send + Sync>(
    conn: &C,
    user_id: Uuid,
    token_value: &str,
) -> Result<Option<RefreshToken>, DomainError> {
    let row = tokens_adapter::find_by_user_and_token(conn, user_id, token_value).await?;
    Ok(row.map(RefreshToken::from))
}

pub async fn delete<C: ConnectionTrait + Send + Sync>(
    conn: &C,
    user_id: Uuid,
    token_value: &str,
) -> Result<u64, DomainError> {
    Ok(tokens_adapter::delete_by_user_and_token(conn, user_id, token_value).await?)
}

pub async fn delete_all_for_user<C: ConnectionTrait + Send + Sync>(
    conn: &C,
    user_id: Uuid,
) -> Result<u64, DomainError> {
    Ok(tokens_adapter::delete_by_user(conn, user_id).await?)
}

pub async fn delete_expired<C: ConnectionTrait + Send + Sync>(
    conn: &C,
    now: OffsetDateTime,
) -> Result<u64, DomainError> {
    Ok(tokens_adapter::delete_expired(conn, now).await?)
}

pub async fn count_for_user<C: ConnectionTrait + Send + Sync>(
    conn: &C,
    user_id: Uuid,
) -> Result<u64, DomainError> {
    Ok(tokens_adapter::count_for_user(conn, user_id).await?)
}
