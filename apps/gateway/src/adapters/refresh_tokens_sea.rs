//! SeaORM adapter for the refresh_tokens table.

use sea_orm::{ActiveModelTrait, ColumnTrait, ConnectionTrait, EntityTrait, QueryFilter, Set};
use time::OffsetDateTime;
use uuid::Uuid;

use crate::entities::refresh_tokens;

#[derive(Debug, Clone)]
pub struct RefreshTokenCreate {
    pub user_id: Uuid,
    pub token: String,
    pub expires_at: OffsetDateTime,
}

pub async fn insert<C: ConnectionTrait + Send + Sync>(
    conn: &C,
    dto: RefreshTokenCreate,
) -> Result<refresh_tokens::Model, sea_orm::DbErr> {
    let now = OffsetDateTime::now_utc();
    let row = refresh_tokens::ActiveModel {
        id: Set(Uuid::new_v4()),
        user_id: Set(dto.user_id),
        token: Set(dto.token),
        expires_at: Set(dto.expires_at),
        created_at: Set(now),
        updated_at: Set(now),
    };

    row.insert(conn).await
}

pub async fn find_by_user_and_token<C: ConnectionTrait + Send + Sync>(
    conn: &C,
    user_id: Uuid,
    token: &str,
) -> Result<Option<refresh_tokens::Model>, sea_orm::DbErr> {
    refresh_tokens::Entity::find()
        .filter(refresh_tokens::Column::UserId.eq(user_id))
        .filter(refresh_tokens::Column::Token.eq(token))
        .one(conn)
        .await
}

pub async fn delete_by_user_and_token<C: ConnectionTrait + Send + Sync>(
    conn: &C,
    user_id: Uuid,
    token: &str,
) -> Result<u64, sea_orm::DbErr> {
    let res = refresh_tokens::Entity::delete_many()
        .filter(refresh_tokens::Column::UserId.eq(user_id))
        .filter(refresh_tokens::Column::Token.eq(token))
        .exec(conn)
        .await?;
    Ok(res.rows_affected)
}

pub async fn delete_by_user<C: ConnectionTrait + Send + Sync>(
    conn: &C,
    user_id: Uuid,
) -> Result<u64, sea_orm::DbErr> {
    let res = refresh_tokens::Entity::delete_many()
        .filter(refresh_tokens::Column::UserId.eq(user_id))
        .exec(conn)
        .await?;
    Ok(res.rows_affected)
}

pub async fn delete_expired<C: ConnectionTrait + Send + Sync>(
    conn: &C,
    now: OffsetDateTime,
) -> Result<u64, sea_orm::DbErr> {
    let res = refresh_tokens::Entity::delete_many()
        .filter(refresh_tokens::Column::ExpiresAt.lte(now))
        .exec(conn)
        .await?;
    Ok(res.rows_affected)
}

pub async fn count_for_user<C: ConnectionTrait + Send + Sync>(
    conn: &C,
    user_id: Uuid,
) -> Result<u64, sea_orm::DbErr> {
    use sea_orm::PaginatorTrait;

    refresh_tokens::Entity::find()
        .filter(refresh_tokens::Column::UserId.eq(user_id))
        .count(conn)
        .await
}
