use std::sync::Arc;

use sea_orm::DatabaseConnection;
use tokio_util::sync::CancellationToken;

use crate::auth::manager::AuthManager;
use crate::auth::refresh_store::{RefreshTokenStore, SeaRefreshTokenStore};
use crate::auth::user_store::{SeaUserStore, UserStore};
use crate::config::db::DbProfile;
use crate::config::gateway::GatewayConfig;
use crate::error::AppError;
use crate::infra::db::bootstrap_db;
use crate::proxy::{ProxyConfig, ProxyForwarder, RouteTable};
use crate::rate_limit::{RateLimitConfig, RateLimiter};
use crate::state::app_state::AppState;
use crate::state::security_config::SecurityConfig;

const DEFAULT_USER_SERVICE_URL: &str = "http://127.0.0.1:8081";

/// Builder for creating AppState instances (used in both tests and main)
pub struct StateBuilder {
    security_config: SecurityConfig,
    db_profile: Option<DbProfile>,
    db: Option<DatabaseConnection>,
    user_store: Option<Arc<dyn UserStore>>,
    refresh_store: Option<Arc<dyn RefreshTokenStore>>,
    rate_limit: RateLimitConfig,
    proxy: ProxyConfig,
    routes: Option<RouteTable>,
    trust_forwarded_for: bool,
}

impl StateBuilder {
    pub fn new() -> Self {
        Self {
            security_config: SecurityConfig::default(),
            db_profile: None,
            db: None,
            user_store: None,
            refresh_store: None,
            rate_limit: RateLimitConfig::default(),
            proxy: ProxyConfig::new(DEFAULT_USER_SERVICE_URL),
            routes: None,
            trust_forwarded_for: false,
        }
    }

    /// Apply everything `GatewayConfig` carries.
    pub fn with_config(self, config: &GatewayConfig) -> Self {
        self.with_security(config.security.clone())
            .with_rate_limit(config.rate_limit.clone())
            .with_proxy(config.proxy.clone())
            .with_trust_forwarded_for(config.trust_forwarded_for)
    }

    /// Connect (and migrate) a database for `profile` at build time.
    pub fn with_db(mut self, profile: DbProfile) -> Self {
        self.db_profile = Some(profile);
        self
    }

    /// Use an already-open connection.
    pub fn with_connection(mut self, db: DatabaseConnection) -> Self {
        self.db = Some(db);
        self
    }

    pub fn with_security(mut self, security_config: SecurityConfig) -> Self {
        self.security_config = security_config;
        self
    }

    pub fn with_user_store(mut self, store: Arc<dyn UserStore>) -> Self {
        self.user_store = Some(store);
        self
    }

    pub fn with_refresh_store(mut self, store: Arc<dyn RefreshTokenStore>) -> Self {
        self.refresh_store = Some(store);
        self
    }

    pub fn with_rate_limit(mut self, rate_limit: RateLimitConfig) -> Self {
        self.rate_limit = rate_limit;
        self
    }

    pub fn with_proxy(mut self, proxy: ProxyConfig) -> Self {
        self.proxy = proxy;
        self
    }

    /// Replace the default `/users` route table.
    pub fn with_routes(mut self, routes: RouteTable) -> Self {
        self.routes = Some(routes);
        self
    }

    pub fn with_trust_forwarded_for(mut self, trust: bool) -> Self {
        self.trust_forwarded_for = trust;
        self
    }

    pub async fn build(self) -> Result<AppState, AppError> {
        let db = match (self.db, self.db_profile) {
            (Some(db), _) => Some(db),
            (None, Some(profile)) => Some(bootstrap_db(profile).await?),
            (None, None) => None,
        };

        let user_store: Arc<dyn UserStore> = match (self.user_store, &db) {
            (Some(store), _) => store,
            (None, Some(db)) => Arc::new(SeaUserStore::new(db.clone())),
            (None, None) => {
                return Err(AppError::config(
                    "a database or an explicit user store is required",
                ))
            }
        };
        let refresh_store: Arc<dyn RefreshTokenStore> = match (self.refresh_store, &db) {
            (Some(store), _) => store,
            (None, Some(db)) => Arc::new(SeaRefreshTokenStore::new(db.clone())),
            (None, None) => {
                return Err(AppError::config(
                    "a database or an explicit refresh token store is required",
                ))
            }
        };

        let auth = AuthManager::new(&self.security_config, user_store, refresh_store);
        let forwarder = ProxyForwarder::new(self.proxy.timeout)?;
        let routes = self
            .routes
            .unwrap_or_else(|| RouteTable::default_for(&self.proxy.user_service_url));

        Ok(AppState {
            db,
            security: self.security_config,
            auth: Arc::new(auth),
            rate_limiter: Arc::new(RateLimiter::new(self.rate_limit)),
            forwarder,
            routes: Arc::new(routes),
            proxy: self.proxy,
            trust_forwarded_for: self.trust_forwarded_for,
            shutdown: CancellationToken::new(),
        })
    }
}

impl Default for StateBuilder {
    fn default() -> Self {
        Self::new()
    }
}

pub fn build_state() -> StateBuilder {
    StateBuilder::new()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn build_without_db_or_stores_fails() {
        let err = build_state().build().await.err().unwrap();
        assert_eq!(err.code().as_str(), "CONFIG_ERROR");
    }

    #[tokio::test]
    async fn build_with_in_memory_db_uses_default_routes() {
        let state = build_state()
            .with_db(DbProfile::InMemory)
            .with_proxy(ProxyConfig::new("http://users.internal"))
            .build()
            .await
            .unwrap();

        assert!(state.db().is_some());
        let rule = state.routes.match_route("GET", "/users/1").unwrap();
        assert_eq!(rule.target, "http://users.internal");
    }

    #[tokio::test]
    async fn background_tasks_stop_on_shutdown() {
        let state = build_state()
            .with_db(DbProfile::InMemory)
            .build()
            .await
            .unwrap();

        let handles = state.spawn_background_tasks(std::time::Duration::from_secs(3600));
        state.shutdown.cancel();
        for handle in handles {
            handle.await.unwrap();
        }
    }
}
