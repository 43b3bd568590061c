//! Header sanitation for proxied requests and responses.

use reqwest::header::{HeaderMap, HeaderName, HeaderValue, CONNECTION};

use crate::auth::claims::Claims;

/// Hop-by-hop headers (RFC 7230 §6.1). Never forwarded in either direction.
pub const HOP_BY_HOP: &[&str] = &[
    "connection",
    "keep-alive",
    "proxy-authenticate",
    "proxy-authorization",
    "te",
    "trailer",
    "trailers",
    "transfer-encoding",
    "upgrade",
];

pub const X_USER_ID: &str = "x-user-id";
pub const X_USER_EMAIL: &str = "x-user-email";
pub const X_USER_ROLE: &str = "x-user-role";
pub const X_FORWARDED_FOR: &str = "x-forwarded-for";
pub const X_FORWARDED_HOST: &str = "x-forwarded-host";
pub const X_FORWARDED_PROTO: &str = "x-forwarded-proto";
pub const X_REQUEST_ID: &str = "x-request-id";

const IDENTITY_PREFIX: &str = "x-user-";

pub fn is_hop_by_hop(name: &str) -> bool {
    HOP_BY_HOP.iter().any(|h| name.eq_ignore_ascii_case(h))
}

/// Header names listed in `Connection` are hop-by-hop for this message.
fn connection_listed(headers: &HeaderMap) -> Vec<String> {
    headers
        .get_all(CONNECTION)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|v| v.split(','))
        .map(|t| t.trim().to_ascii_lowercase())
        .filter(|t| !t.is_empty())
        .collect()
}

fn copy_filtered(source: &HeaderMap, mut drop: impl FnMut(&str) -> bool) -> HeaderMap {
    let listed = connection_listed(source);
    let mut out = HeaderMap::with_capacity(source.len());
    for (name, value) in source.iter() {
        let n = name.as_str();
        if is_hop_by_hop(n) || listed.iter().any(|l| l == n) || drop(n) {
            continue;
        }
        out.append(name.clone(), value.clone());
    }
    out
}

/// Headers to send downstream. Drops hop-by-hop headers, `Host`,
/// `Content-Length`, any inbound identity headers, and the forwarding
/// headers the gateway sets itself.
pub fn sanitize_request_headers(inbound: &HeaderMap) -> HeaderMap {
    copy_filtered(inbound, |n| {
        n == "host"
            || n == "content-length"
            || n.starts_with(IDENTITY_PREFIX)
            || n == X_FORWARDED_FOR
            || n == X_FORWARDED_HOST
            || n == X_FORWARDED_PROTO
            || n == X_REQUEST_ID
    })
}

/// Headers to relay back to the client.
pub fn sanitize_response_headers(upstream: &HeaderMap) -> HeaderMap {
    copy_filtered(upstream, |n| n == "content-length")
}

/// Append `client` to an existing `X-Forwarded-For` chain.
pub fn forwarded_for(existing: Option<&str>, client: &str) -> String {
    match existing.map(str::trim).filter(|s| !s.is_empty()) {
        Some(chain) => format!("{chain}, {client}"),
        None => client.to_string(),
    }
}

fn insert_str(headers: &mut HeaderMap, name: &'static str, value: &str) {
    if let Ok(value) = HeaderValue::from_str(value) {
        headers.insert(HeaderName::from_static(name), value);
    }
}

/// Set `X-User-Id`, `X-User-Email` and `X-User-Role` from verified claims.
pub fn inject_identity(headers: &mut HeaderMap, claims: &Claims) {
    insert_str(headers, X_USER_ID, &claims.sub.to_string());
    insert_str(headers, X_USER_EMAIL, &claims.email);
    insert_str(headers, X_USER_ROLE, claims.role.as_str());
}

pub(crate) fn set_forwarding(
    headers: &mut HeaderMap,
    inbound: &HeaderMap,
    client_addr: Option<&str>,
    host: Option<&str>,
    scheme: &str,
    request_id: &str,
) {
    let existing = inbound
        .get(X_FORWARDED_FOR)
        .and_then(|v| v.to_str().ok());
    match client_addr {
        Some(client) => insert_str(headers, X_FORWARDED_FOR, &forwarded_for(existing, client)),
        None => {
            if let Some(chain) = existing {
                insert_str(headers, X_FORWARDED_FOR, chain);
            }
        }
    }
    if let Some(host) = host {
        insert_str(headers, X_FORWARDED_HOST, host);
    }
    insert_str(headers, X_FORWARDED_PROTO, scheme);
    insert_str(headers, X_REQUEST_ID, request_id);
}
