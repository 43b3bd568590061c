pub mod forwarder;
pub mod headers;
pub mod routes;

use std::time::Duration;

pub use forwarder::{target_url, ProxyForwarder, ProxyRequest, ProxyResponse};
pub use routes::{normalize_path, AuthRequirement, ResolvedRoute, RouteRule, RouteTable};

#[derive(Debug, Clone)]
pub struct ProxyConfig {
    pub user_service_url: String,
    /// Upper bound for a single downstream call
    pub timeout: Duration,
    /// Overall budget for an inbound request; the downstream call never
    /// outlives it
    pub request_timeout: Duration,
    pub max_body_bytes: usize,
}

impl ProxyConfig {
    pub fn new(user_service_url: impl Into<String>) -> Self {
        Self {
            user_service_url: user_service_url.into(),
            timeout: Duration::from_secs(10),
            request_timeout: Duration::from_secs(30),
            max_body_bytes: 10 * 1024 * 1024,
        }
    }
}
