//! Issue, validate, refresh and revoke gateway tokens.

use std::sync::Arc;

use serde::Serialize;
use time::{Duration, OffsetDateTime};
use tracing::{info, warn};
use uuid::Uuid;

use crate::auth::claims::{Claims, Role, TokenKind};
use crate::auth::jwt::{TokenCodec, TokenError};
use crate::auth::refresh_store::{NewRefreshToken, RefreshTokenStore};
use crate::auth::user_store::UserStore;
use crate::error::AppError;
use crate::logging::security;
use crate::state::security_config::SecurityConfig;

/// Public view of the authenticated user returned on login.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UserSummary {
    pub id: Uuid,
    pub email: String,
    pub role: Role,
}

#[derive(Debug, Clone, Serialize)]
pub struct LoginOutcome {
    pub access_token: String,
    pub refresh_token: String,
    /// Access token lifetime in seconds
    pub expires_in: i64,
    pub user: UserSummary,
}

#[derive(Debug, Clone, Serialize)]
pub struct RefreshOutcome {
    pub access_token: String,
    /// Present only when refresh rotation is enabled
    #[serde(skip_serializing_if = "Option::is_none")]
    pub refresh_token: Option<String>,
    pub expires_in: i64,
}

pub(crate) fn token_error_to_app(e: TokenError) -> AppError {
    match e {
        TokenError::Expired => AppError::token_expired(),
        TokenError::Invalid(_) => AppError::invalid_token(),
        TokenError::Config => AppError::config("token signing secret is not configured"),
        TokenError::Encode(detail) => AppError::internal(detail),
    }
}

pub struct AuthManager {
    codec: TokenCodec,
    users: Arc<dyn UserStore>,
    refresh_tokens: Arc<dyn RefreshTokenStore>,
    access_ttl: Duration,
    refresh_ttl: Duration,
    rotate_refresh_tokens: bool,
}

impl AuthManager {
    pub fn new(
        security: &SecurityConfig,
        users: Arc<dyn UserStore>,
        refresh_tokens: Arc<dyn RefreshTokenStore>,
    ) -> Self {
        Self {
            codec: TokenCodec::new(security),
            users,
            refresh_tokens,
            access_ttl: security.access_ttl,
            refresh_ttl: security.refresh_ttl,
            rotate_refresh_tokens: security.rotate_refresh_tokens,
        }
    }

    pub fn codec(&self) -> &TokenCodec {
        &self.codec
    }

    pub fn refresh_store(&self) -> Arc<dyn RefreshTokenStore> {
        Arc::clone(&self.refresh_tokens)
    }

    /// Verify credentials and issue an access/refresh pair. The refresh token
    /// is persisted before it is returned.
    pub async fn login(&self, email: &str, password: &str) -> Result<LoginOutcome, AppError> {
        if email.trim().is_empty() || password.is_empty() {
            security::login_failed("empty_credentials", email);
            return Err(AppError::invalid_credentials());
        }

        let Some(user) = self.users.verify_credentials(email, password).await? else {
            security::login_failed("invalid_credentials", email);
            return Err(AppError::invalid_credentials());
        };

        let now = OffsetDateTime::now_utc();
        let access_token = self.issue(user.id, &user.email, user.role, TokenKind::Access, now)?;
        let refresh_token =
            self.issue_and_store_refresh(user.id, &user.email, user.role, now).await?;

        info!(user_id = %user.id, role = %user.role, "login succeeded");

        Ok(LoginOutcome {
            access_token,
            refresh_token,
            expires_in: self.access_ttl.whole_seconds(),
            user: UserSummary {
                id: user.id,
                email: user.email,
                role: user.role,
            },
        })
    }

    /// Stateless access-token check. Never consults the store.
    pub fn validate_access(&self, token: &str) -> Result<Claims, AppError> {
        self.codec
            .decode(token, TokenKind::Access)
            .map_err(token_error_to_app)
    }

    /// Mint a new access token from a stored, unexpired refresh token.
    pub async fn refresh(&self, refresh_token: &str) -> Result<RefreshOutcome, AppError> {
        let claims = match self.codec.decode(refresh_token, TokenKind::Refresh) {
            Ok(claims) => claims,
            Err(TokenError::Config) => return Err(token_error_to_app(TokenError::Config)),
            Err(e) => {
                security::refresh_rejected(&e.to_string());
                return Err(AppError::invalid_refresh_token());
            }
        };

        if !self.refresh_tokens.is_valid(claims.sub, refresh_token).await? {
            security::refresh_rejected("not_in_store");
            return Err(AppError::invalid_refresh_token());
        }

        match self.users.find_by_id(claims.sub).await? {
            Some(user) if user.is_active => {}
            _ => {
                security::refresh_rejected("inactive_user");
                return Err(AppError::invalid_refresh_token());
            }
        }

        let now = OffsetDateTime::now_utc();
        let access_token =
            self.issue(claims.sub, &claims.email, claims.role, TokenKind::Access, now)?;

        let rotated = if self.rotate_refresh_tokens {
            let next = self
                .issue_and_store_refresh(claims.sub, &claims.email, claims.role, now)
                .await?;
            self.refresh_tokens.revoke(claims.sub, refresh_token).await?;
            Some(next)
        } else {
            None
        };

        info!(user_id = %claims.sub, rotated = rotated.is_some(), "access token refreshed");

        Ok(RefreshOutcome {
            access_token,
            refresh_token: rotated,
            expires_in: self.access_ttl.whole_seconds(),
        })
    }

    /// Revoke `refresh_token`. The subject comes from the refresh token when
    /// it verifies, else from the access token; either may be expired.
    pub async fn logout(
        &self,
        access_token: Option<&str>,
        refresh_token: &str,
    ) -> Result<(), AppError> {
        let subject = self
            .codec
            .decode_ignoring_expiry(refresh_token)
            .or_else(|e| match access_token {
                Some(access) => self.codec.decode_ignoring_expiry(access),
                None => Err(e),
            })
            .map(|claims| claims.sub);

        let user_id = match subject {
            Ok(user_id) => user_id,
            Err(TokenError::Config) => return Err(token_error_to_app(TokenError::Config)),
            Err(e) => {
                warn!(error = %e, "logout without a verifiable token");
                return Err(AppError::invalid_token());
            }
        };

        self.refresh_tokens.revoke(user_id, refresh_token).await?;
        info!(%user_id, "logout completed");
        Ok(())
    }

    /// Revoke every refresh token held by `user_id`.
    pub async fn logout_everywhere(&self, user_id: Uuid) -> Result<u64, AppError> {
        let revoked = self.refresh_tokens.revoke_all(user_id).await?;
        info!(%user_id, revoked, "all sessions revoked");
        Ok(revoked)
    }

    fn issue(
        &self,
        sub: Uuid,
        email: &str,
        role: Role,
        kind: TokenKind,
        now: OffsetDateTime,
    ) -> Result<String, AppError> {
        let ttl = match kind {
            TokenKind::Access => self.access_ttl,
            TokenKind::Refresh => self.refresh_ttl,
        };
        self.codec
            .issue(sub, email, role, kind, ttl, now)
            .map_err(token_error_to_app)
    }

    async fn issue_and_store_refresh(
        &self,
        sub: Uuid,
        email: &str,
        role: Role,
        now: OffsetDateTime,
    ) -> Result<String, AppError> {
        let token = self.issue(sub, email, role, TokenKind::Refresh, now)?;
        self.refresh_tokens
            .store(NewRefreshToken {
                user_id: sub,
                token_value: token.clone(),
                expires_at: now + self.refresh_ttl,
            })
            .await?;
        Ok(token)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::refresh_store::SeaRefreshTokenStore;
    use crate::auth::user_store::SeaUserStore;
    use crate::config::db::DbProfile;
    use crate::errors::ErrorCode;
    use crate::infra::db::bootstrap_db;
    use crate::repos::users;

    const PASSWORD: &str = "s3cret-pass";

    async fn manager_with(security: SecurityConfig) -> (AuthManager, Uuid) {
        let db = bootstrap_db(DbProfile::InMemory).await.unwrap();
        let hash = bcrypt::hash(PASSWORD, 4).unwrap();
        let user = users::create_user(&db, "carol@example.com", &hash, Role::User, true)
            .await
            .unwrap();
        let manager = AuthManager::new(
            &security,
            Arc::new(SeaUserStore::new(db.clone())),
            Arc::new(SeaRefreshTokenStore::new(db)),
        );
        (manager, user.id)
    }

    async fn manager() -> (AuthManager, Uuid) {
        manager_with(SecurityConfig::new(b"manager_test_secret".to_vec())).await
    }

    fn code(err: &AppError) -> ErrorCode {
        err.code()
    }

    #[tokio::test]
    async fn login_issues_pair_and_persists_refresh() {
        let (manager, user_id) = manager().await;
        let out = manager.login("carol@example.com", PASSWORD).await.unwrap();

        assert_eq!(out.user.id, user_id);
        assert_eq!(out.expires_in, 3600);
        let claims = manager.validate_access(&out.access_token).unwrap();
        assert_eq!(claims.sub, user_id);
        assert!(manager
            .refresh_store()
            .is_valid(user_id, &out.refresh_token)
            .await
            .unwrap());
    }

    #[tokio::test]
    async fn login_failures_are_indistinguishable() {
        let (manager, _) = manager().await;
        let bad_password = manager.login("carol@example.com", "wrong").await.unwrap_err();
        let bad_email = manager.login("nobody@example.com", PASSWORD).await.unwrap_err();

        assert_eq!(code(&bad_password), ErrorCode::InvalidCredentials);
        assert_eq!(code(&bad_email), ErrorCode::InvalidCredentials);
        assert_eq!(bad_password.public_message(), bad_email.public_message());
    }

    #[tokio::test]
    async fn refresh_keeps_identity_and_does_not_rotate_by_default() {
        let (manager, user_id) = manager().await;
        let login = manager.login("carol@example.com", PASSWORD).await.unwrap();

        let out = manager.refresh(&login.refresh_token).await.unwrap();
        assert!(out.refresh_token.is_none());
        let claims = manager.validate_access(&out.access_token).unwrap();
        assert_eq!(claims.sub, user_id);
        assert_eq!(claims.role, Role::User);

        // the same refresh token keeps working
        assert!(manager.refresh(&login.refresh_token).await.is_ok());
    }

    #[tokio::test]
    async fn refresh_rotation_revokes_presented_token() {
        let (manager, _) =
            manager_with(SecurityConfig::new(b"manager_test_secret".to_vec()).with_rotation(true))
                .await;
        let login = manager.login("carol@example.com", PASSWORD).await.unwrap();

        let out = manager.refresh(&login.refresh_token).await.unwrap();
        let next = out.refresh_token.unwrap();
        assert_ne!(next, login.refresh_token);

        let reused = manager.refresh(&login.refresh_token).await.unwrap_err();
        assert_eq!(code(&reused), ErrorCode::InvalidRefreshToken);
        assert!(manager.refresh(&next).await.is_ok());
    }

    #[tokio::test]
    async fn refresh_rejects_access_tokens_and_revoked_tokens() {
        let (manager, _) = manager().await;
        let login = manager.login("carol@example.com", PASSWORD).await.unwrap();

        let err = manager.refresh(&login.access_token).await.unwrap_err();
        assert_eq!(code(&err), ErrorCode::InvalidRefreshToken);

        manager.logout(None, &login.refresh_token).await.unwrap();
        let err = manager.refresh(&login.refresh_token).await.unwrap_err();
        assert_eq!(code(&err), ErrorCode::InvalidRefreshToken);
    }

    #[tokio::test]
    async fn refresh_rejects_deactivated_user() {
        let db = bootstrap_db(DbProfile::InMemory).await.unwrap();
        let hash = bcrypt::hash(PASSWORD, 4).unwrap();
        let user = users::create_user(&db, "dave@example.com", &hash, Role::User, true)
            .await
            .unwrap();
        let manager = AuthManager::new(
            &SecurityConfig::new(b"manager_test_secret".to_vec()),
            Arc::new(SeaUserStore::new(db.clone())),
            Arc::new(SeaRefreshTokenStore::new(db.clone())),
        );
        let login = manager.login("dave@example.com", PASSWORD).await.unwrap();
        manager.refresh(&login.refresh_token).await.unwrap();

        users::set_user_active(&db, user.id, false).await.unwrap();
        let err = manager.refresh(&login.refresh_token).await.unwrap_err();
        assert_eq!(code(&err), ErrorCode::InvalidRefreshToken);
    }

    #[tokio::test]
    async fn logout_accepts_expired_access_token_as_subject_source() {
        let (manager, user_id) = manager().await;
        let login = manager.login("carol@example.com", PASSWORD).await.unwrap();

        let expired_access = manager
            .codec()
            .issue(
                user_id,
                "carol@example.com",
                Role::User,
                TokenKind::Access,
                Duration::hours(-1),
                OffsetDateTime::now_utc(),
            )
            .unwrap();

        manager
            .logout(Some(&expired_access), &login.refresh_token)
            .await
            .unwrap();
        assert!(!manager
            .refresh_store()
            .is_valid(user_id, &login.refresh_token)
            .await
            .unwrap());

        // idempotent
        manager
            .logout(Some(&expired_access), &login.refresh_token)
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn logout_without_verifiable_token_is_rejected() {
        let (manager, _) = manager().await;
        let err = manager.logout(None, "garbage").await.unwrap_err();
        assert_eq!(code(&err), ErrorCode::InvalidToken);
    }

    #[tokio::test]
    async fn logout_everywhere_revokes_all_sessions() {
        let (manager, user_id) = manager().await;
        let first = manager.login("carol@example.com", PASSWORD).await.unwrap();
        let second = manager.login("carol@example.com", PASSWORD).await.unwrap();

        assert_eq!(manager.logout_everywhere(user_id).await.unwrap(), 2);
        assert!(manager.refresh(&first.refresh_token).await.is_err());
        assert!(manager.refresh(&second.refresh_token).await.is_err());
    }

    #[tokio::test]
    async fn validate_access_reports_expiry() {
        let (manager, user_id) = manager().await;
        let expired = manager
            .codec()
            .issue(
                user_id,
                "carol@example.com",
                Role::User,
                TokenKind::Access,
                Duration::seconds(-1),
                OffsetDateTime::now_utc(),
            )
            .unwrap();
        let err = manager.validate_access(&expired).unwrap_err();
        assert_eq!(code(&err), ErrorCode::TokenExpired);
    }
}
