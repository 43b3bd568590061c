//! Mirror an inbound request to a downstream service.

use std::time::{Duration, Instant};

use bytes::Bytes;
use reqwest::header::HeaderMap;
use reqwest::{redirect, Client, Method, StatusCode};
use tracing::{debug, error, warn};

use crate::auth::claims::Claims;
use crate::error::AppError;
use crate::proxy::headers::{
    inject_identity, sanitize_request_headers, sanitize_response_headers, set_forwarding,
};

/// Everything the forwarder needs from the inbound request.
#[derive(Debug, Clone)]
pub struct ProxyRequest {
    pub method: Method,
    pub path: String,
    pub query: Option<String>,
    pub headers: HeaderMap,
    pub body: Bytes,
    /// Address of the immediate peer (or resolved client when trusted)
    pub client_addr: Option<String>,
    pub host: Option<String>,
    pub scheme: String,
    pub request_id: String,
    /// Verified caller identity; `None` forwards anonymously
    pub identity: Option<Claims>,
    /// Point in time after which the inbound request has given up
    pub deadline: Option<Instant>,
}

#[derive(Debug)]
pub struct ProxyResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Bytes,
}

/// `base + path (+ "?" + query)`
pub fn target_url(base_url: &str, path: &str, query: Option<&str>) -> String {
    let base = base_url.trim_end_matches('/');
    match query.filter(|q| !q.is_empty()) {
        Some(q) => format!("{base}{path}?{q}"),
        None => format!("{base}{path}"),
    }
}

#[derive(Debug, Clone)]
pub struct ProxyForwarder {
    client: Client,
    timeout: Duration,
}

impl ProxyForwarder {
    pub fn new(timeout: Duration) -> Result<Self, AppError> {
        let client = Client::builder()
            .redirect(redirect::Policy::none())
            .tcp_keepalive(Duration::from_secs(30))
            .pool_max_idle_per_host(10)
            .pool_idle_timeout(Duration::from_secs(90))
            .build()
            .map_err(|e| AppError::config(format!("failed to build HTTP client: {e}")))?;

        Ok(Self { client, timeout })
    }

    fn effective_timeout(&self, deadline: Option<Instant>) -> Duration {
        match deadline {
            Some(d) => self.timeout.min(d.saturating_duration_since(Instant::now())),
            None => self.timeout,
        }
    }

    /// Forward `inbound` to `base_url` and relay the downstream response.
    ///
    /// Transport failures are never retried. A timeout maps to
    /// `SERVICE_UNAVAILABLE`, any other transport error to `BAD_GATEWAY`.
    pub async fn forward(
        &self,
        inbound: ProxyRequest,
        base_url: &str,
    ) -> Result<ProxyResponse, AppError> {
        let url = target_url(base_url, &inbound.path, inbound.query.as_deref());

        let timeout = self.effective_timeout(inbound.deadline);
        if timeout.is_zero() {
            warn!(%url, "request deadline exhausted before forwarding");
            return Err(AppError::service_unavailable("request deadline exhausted"));
        }

        let mut headers = sanitize_request_headers(&inbound.headers);
        if let Some(claims) = &inbound.identity {
            inject_identity(&mut headers, claims);
        }
        set_forwarding(
            &mut headers,
            &inbound.headers,
            inbound.client_addr.as_deref(),
            inbound.host.as_deref(),
            &inbound.scheme,
            &inbound.request_id,
        );

        let mut request = self
            .client
            .request(inbound.method.clone(), &url)
            .headers(headers)
            .timeout(timeout);
        if !inbound.body.is_empty() {
            request = request.body(inbound.body);
        }

        let started = Instant::now();
        let response = request
            .send()
            .await
            .map_err(|e| transport_error(&url, e))?;

        let status = response.status();
        let headers = sanitize_response_headers(response.headers());
        let body = response
            .bytes()
            .await
            .map_err(|e| transport_error(&url, e))?;

        debug!(
            %url,
            method = %inbound.method,
            status = status.as_u16(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "downstream responded"
        );

        Ok(ProxyResponse {
            status,
            headers,
            body,
        })
    }
}

fn transport_error(url: &str, e: reqwest::Error) -> AppError {
    if e.is_timeout() {
        warn!(%url, error = %e, "downstream timed out");
        AppError::service_unavailable(format!("downstream timeout: {e}"))
    } else {
        error!(%url, error = %e, "downstream request failed");
        AppError::bad_gateway(format!("downstream transport error: {e}"))
    }
}
