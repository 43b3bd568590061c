//! Typed per-request context stored in request extensions.

use std::time::{Duration, Instant};

use uuid::Uuid;

use crate::auth::claims::Claims;

const MAX_REQUEST_ID_LEN: usize = 128;

#[derive(Debug, Clone)]
pub struct RequestContext {
    pub request_id: String,
    /// Rate-limit key: peer IP, or the last `X-Forwarded-For` hop when trusted
    pub client_id: String,
    pub started_at: Instant,
    /// Set by `Authorize` once a bearer token verifies
    pub identity: Option<Claims>,
}

impl RequestContext {
    pub fn new(request_id: String, client_id: String) -> Self {
        Self {
            request_id,
            client_id,
            started_at: Instant::now(),
            identity: None,
        }
    }

    pub fn deadline(&self, budget: Duration) -> Instant {
        self.started_at + budget
    }
}

/// Keep a caller-supplied correlation id when it is short and plain;
/// otherwise mint a fresh one.
pub fn resolve_request_id(inbound: Option<&str>) -> String {
    inbound
        .map(str::trim)
        .filter(|id| {
            !id.is_empty()
                && id.len() <= MAX_REQUEST_ID_LEN
                && id
                    .chars()
                    .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.' | ':'))
        })
        .map(str::to_string)
        .unwrap_or_else(|| Uuid::new_v4().to_string())
}

/// Identify the client for rate limiting.
///
/// With `trust_forwarded_for` the right-most `X-Forwarded-For` entry is used:
/// it is the one appended by the trusted proxy in front of the gateway. Any
/// entries to its left come from the client.
pub fn resolve_client_id(
    peer_ip: Option<&str>,
    forwarded_for: Option<&str>,
    trust_forwarded_for: bool,
) -> String {
    if trust_forwarded_for {
        if let Some(last) = forwarded_for
            .and_then(|chain| chain.rsplit(',').next())
            .map(str::trim)
            .filter(|s| !s.is_empty())
        {
            return last.to_string();
        }
    }
    peer_ip.unwrap_or("unknown").to_string()
}
