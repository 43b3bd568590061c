//! SeaORM adapter for the users table.

use sea_orm::{ActiveModelTrait, ColumnTrait, ConnectionTrait, EntityTrait, QueryFilter, Set};
use time::OffsetDateTime;
use uuid::Uuid;

use crate::entities::users;

#[derive(Debug, Clone)]
pub struct UserCreate {
    pub email: String,
    pub password_hash: String,
    pub role: String,
    pub is_active: bool,
}

pub async fn find_by_email<C: ConnectionTrait + Send + Sync>(
    conn: &C,
    email: &str,
) -> Result<Option<users::Model>, sea_orm::DbErr> {
    users::Entity::find()
        .filter(users::Column::Email.eq(email))
        .one(conn)
        .await
}

pub async fn find_by_id<C: ConnectionTrait + Send + Sync>(
    conn: &C,
    id: Uuid,
) -> Result<Option<users::Model>, sea_orm::DbErr> {
    users::Entity::find_by_id(id).one(conn).await
}

pub async fn create_user<C: ConnectionTrait + Send + Sync>(
    conn: &C,
    dto: UserCreate,
) -> Result<users::Model, sea_orm::DbErr> {
    let now = OffsetDateTime::now_utc();
    let user = users::ActiveModel {
        id: Set(Uuid::new_v4()),
        email: Set(dto.email),
        password_hash: Set(dto.password_hash),
        role: Set(dto.role),
        is_active: Set(dto.is_active),
        created_at: Set(now),
        updated_at: Set(now),
    };

    user.insert(conn).await
}

pub async fn set_active<C: ConnectionTrait + Send + Sync>(
    conn: &C,
    id: Uuid,
    is_active: bool,
) -> Result<users::Model, sea_orm::DbErr> {
    let existing = users::Entity::find_by_id(id)
        .one(conn)
        .await?
        .ok_or_else(|| sea_orm::DbErr::RecordNotFound(format!("users.id {id} not found")))?;

    let mut user: users::ActiveModel = existing.into();
    user.is_active = Set(is_active);
    user.updated_at = Set(OffsetDateTime::now_utc());
    user.update(conn).await
}
