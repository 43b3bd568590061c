//! Durable record of issued refresh tokens.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use sea_orm::DatabaseConnection;
use time::OffsetDateTime;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::errors::domain::DomainError;
use crate::repos::refresh_tokens::{self, RefreshToken};

/// A refresh token about to be persisted; timestamps are assigned on store.
#[derive(Debug, Clone)]
pub struct NewRefreshToken {
    pub user_id: Uuid,
    pub token_value: String,
    pub expires_at: OffsetDateTime,
}

#[async_trait]
pub trait RefreshTokenStore: Send + Sync {
    async fn store(&self, token: NewRefreshToken) -> Result<RefreshToken, DomainError>;

    /// True iff a row matches both `user_id` and `token_value` and has not expired.
    async fn is_valid(&self, user_id: Uuid, token_value: &str) -> Result<bool, DomainError>;

    /// Delete the matching row. Revoking an unknown token is not an error.
    async fn revoke(&self, user_id: Uuid, token_value: &str) -> Result<(), DomainError>;

    /// Delete every row for `user_id`, returning how many were removed.
    async fn revoke_all(&self, user_id: Uuid) -> Result<u64, DomainError>;

    /// Delete expired rows, returning how many were removed.
    async fn sweep(&self) -> Result<u64, DomainError>;
}

#[derive(Debug, Clone)]
pub struct SeaRefreshTokenStore {
    db: DatabaseConnection,
}

impl SeaRefreshTokenStore {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }
}

#[async_trait]
impl RefreshTokenStore for SeaRefreshTokenStore {
    async fn store(&self, token: NewRefreshToken) -> Result<RefreshToken, DomainError> {
        refresh_tokens::create(&self.db, token.user_id, &token.token_value, token.expires_at).await
    }

    async fn is_valid(&self, user_id: Uuid, token_value: &str) -> Result<bool, DomainError> {
        let row = refresh_tokens::find(&self.db, user_id, token_value).await?;
        Ok(row.is_some_and(|t| !t.is_expired_at(OffsetDateTime::now_utc())))
    }

    async fn revoke(&self, user_id: Uuid, token_value: &str) -> Result<(), DomainError> {
        let removed = refresh_tokens::delete(&self.db, user_id, token_value).await?;
        debug!(%user_id, removed, "refresh token revoked");
        Ok(())
    }

    async fn revoke_all(&self, user_id: Uuid) -> Result<u64, DomainError> {
        refresh_tokens::delete_all_for_user(&self.db, user_id).await
    }

    async fn sweep(&self) -> Result<u64, DomainError> {
        refresh_tokens::delete_expired(&self.db, OffsetDateTime::now_utc()).await
    }
}

/// Sweep expired refresh tokens every `interval` until `shutdown` fires.
pub fn spawn_refresh_sweeper(
    store: Arc<dyn RefreshTokenStore>,
    interval: Duration,
    shutdown: CancellationToken,
) -> JoinHandle<()> {
    let period = interval.max(Duration::from_millis(1));

    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(period);
        ticker.tick().await;

        loop {
            tokio::select! {
                _ = shutdown.cancelled() => {
                    info!("refresh token sweeper stopped");
                    break;
                }
                _ = ticker.tick() => match store.sweep().await {
                    Ok(0) => {}
                    Ok(removed) => info!(removed, "swept expired refresh tokens"),
                    Err(e) => warn!(error = %e, "refresh token sweep failed"),
                },
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use time::Duration as TimeDuration;

    use super::*;
    use crate::auth::claims::Role;
    use crate::config::db::DbProfile;
    use crate::infra::db::bootstrap_db;
    use crate::repos::users;

    async fn store_with_user() -> (SeaRefreshTokenStore, Uuid) {
        let db = bootstrap_db(DbProfile::InMemory).await.unwrap();
        let user = users::create_user(&db, "rt@example.com", "x", Role::User, true)
            .await
            .unwrap();
        (SeaRefreshTokenStore::new(db), user.id)
    }

    fn new_token(user_id: Uuid, value: &str, ttl: TimeDuration) -> NewRefreshToken {
        NewRefreshToken {
            user_id,
            token_value: value.to_string(),
            expires_at: OffsetDateTime::now_utc() + ttl,
        }
    }

    #[tokio::test]
    async fn store_assigns_timestamps_and_validates() {
        let (store, user_id) = store_with_user().await;

        let row = store
            .store(new_token(user_id, "tok-1", TimeDuration::days(7)))
            .await
            .unwrap();
        assert_eq!(row.created_at, row.updated_at);
        assert!(store.is_valid(user_id, "tok-1").await.unwrap());
        assert!(!store.is_valid(user_id, "tok-2").await.unwrap());
        assert!(!store.is_valid(Uuid::new_v4(), "tok-1").await.unwrap());
    }

    #[tokio::test]
    async fn expired_row_is_not_valid() {
        let (store, user_id) = store_with_user().await;
        store
            .store(new_token(user_id, "old", TimeDuration::hours(-1)))
            .await
            .unwrap();
        assert!(!store.is_valid(user_id, "old").await.unwrap());
    }

    #[tokio::test]
    async fn revoke_is_idempotent() {
        let (store, user_id) = store_with_user().await;
        store
            .store(new_token(user_id, "tok", TimeDuration::days(1)))
            .await
            .unwrap();

        store.revoke(user_id, "tok").await.unwrap();
        assert!(!store.is_valid(user_id, "tok").await.unwrap());
        store.revoke(user_id, "tok").await.unwrap();
    }

    #[tokio::test]
    async fn revoke_all_and_sweep() {
        let (store, user_id) = store_with_user().await;
        for (value, ttl) in [
            ("a", TimeDuration::days(1)),
            ("b", TimeDuration::days(1)),
            ("c", TimeDuration::hours(-2)),
        ] {
            store.store(new_token(user_id, value, ttl)).await.unwrap();
        }

        assert_eq!(store.sweep().await.unwrap(), 1);
        assert_eq!(store.sweep().await.unwrap(), 0);
        assert_eq!(store.revoke_all(user_id).await.unwrap(), 2);
        assert!(!store.is_valid(user_id, "a").await.unwrap());
    }

    #[tokio::test]
    async fn duplicate_token_is_conflict() {
        let (store, user_id) = store_with_user().await;
        store
            .store(new_token(user_id, "dup", TimeDuration::days(1)))
            .await
            .unwrap();
        let err = store
            .store(new_token(user_id, "dup", TimeDuration::days(1)))
            .await
            .unwrap_err();
        assert!(matches!(err, DomainError::Conflict { .. }));
    }
}
