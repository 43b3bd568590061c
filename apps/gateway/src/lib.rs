#![deny(clippy::wildcard_imports)]
#![cfg_attr(test, allow(clippy::wildcard_imports))]

pub mod adapters;
pub mod auth;
pub mod config;
pub mod context;
pub mod entities;
pub mod envelope;
pub mod error;
pub mod errors;
pub mod extractors;
pub mod infra;
pub mod logging;
pub mod middleware;
pub mod proxy;
pub mod rate_limit;
pub mod repos;
pub mod routes;
pub mod state;
pub mod trace_ctx;

// Re-exports for public API
pub use auth::{AuthManager, Claims, RefreshTokenStore, Role, TokenCodec, TokenKind, UserStore};
pub use config::db::{db_url, DbProfile};
pub use config::gateway::GatewayConfig;
pub use context::RequestContext;
pub use error::AppError;
pub use errors::ErrorCode;
pub use extractors::{BearerToken, Identity, OptionalBearer, ValidatedJson};
pub use infra::db::connect_db;
pub use infra::state::build_state;
pub use middleware::{
    cors_middleware, Authorize, RateLimit, RequestTrace, StructuredLogger, TraceSpan,
};
pub use proxy::{ProxyConfig, ProxyForwarder, RouteRule, RouteTable};
pub use rate_limit::{RateLimitConfig, RateLimiter};
pub use state::app_state::AppState;
pub use state::security_config::SecurityConfig;

// Auto-initialize logging for unit tests
#[cfg(test)]
#[ctor::ctor]
fn init_test_logging() {
    gateway_test_support::logging::init();
}
