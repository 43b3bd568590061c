use std::sync::Arc;
use std::time::Duration;

use sea_orm::DatabaseConnection;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use super::security_config::SecurityConfig;
use crate::auth::manager::AuthManager;
use crate::auth::refresh_store::spawn_refresh_sweeper;
use crate::proxy::{ProxyConfig, ProxyForwarder, RouteTable};
use crate::rate_limit::RateLimiter;

/// Shared resources handed to every worker.
#[derive(Clone)]
pub struct AppState {
    /// Database connection (absent when stores are injected directly)
    pub db: Option<DatabaseConnection>,
    pub security: SecurityConfig,
    pub auth: Arc<AuthManager>,
    pub rate_limiter: Arc<RateLimiter>,
    pub forwarder: ProxyForwarder,
    pub routes: Arc<RouteTable>,
    pub proxy: ProxyConfig,
    pub trust_forwarded_for: bool,
    /// Cancelled on shutdown to stop background tasks
    pub shutdown: CancellationToken,
}

impl AppState {
    pub fn db(&self) -> Option<&DatabaseConnection> {
        self.db.as_ref()
    }

    /// Start the rate-limiter evictor and the refresh-token sweeper. Both stop
    /// when `self.shutdown` is cancelled.
    pub fn spawn_background_tasks(&self, refresh_sweep_interval: Duration) -> Vec<JoinHandle<()>> {
        vec![
            self.rate_limiter.spawn_evictor(self.shutdown.clone()),
            spawn_refresh_sweeper(
                self.auth.refresh_store(),
                refresh_sweep_interval,
                self.shutdown.clone(),
            ),
        ]
    }
}
