//! Which downstream each path goes to, and what it takes to get there.
//!
//! Patterns are `/`-separated: a literal segment matches itself, `*` matches
//! exactly one segment and `**` matches whatever remains (including nothing).
//! Rules are tried in order; the first match wins.
//!
//! Paths are normalized with `normalize_path` before matching, and the
//! normalized path is the one forwarded.

use crate::auth::claims::Role;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthRequirement {
    /// Bearer optional; a supplied token must still be valid.
    Public,
    Required,
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    Literal(String),
    One,
    Rest,
}

fn parse_pattern(pattern: &str) -> Vec<Segment> {
    pattern
        .split('/')
        .filter(|s| !s.is_empty())
        .map(|s| match s {
            "*" => Segment::One,
            "**" => Segment::Rest,
            lit => Segment::Literal(lit.to_string()),
        })
        .collect()
}

#[derive(Debug, Clone)]
pub struct RouteRule {
    pub method: Option<String>,
    pub pattern: String,
    segments: Vec<Segment>,
    pub target: String,
    pub auth: AuthRequirement,
    pub roles: Option<Vec<Role>>,
}

impl RouteRule {
    /// Authenticated rule for any method.
    pub fn new(pattern: &str, target: impl Into<String>) -> Self {
        Self {
            method: None,
            pattern: pattern.to_string(),
            segments: parse_pattern(pattern),
            target: target.into(),
            auth: AuthRequirement::Required,
            roles: None,
        }
    }

    pub fn method(mut self, method: &str) -> Self {
        self.method = Some(method.to_ascii_uppercase());
        self
    }

    pub fn public(mut self) -> Self {
        self.auth = AuthRequirement::Public;
        self
    }

    pub fn roles(mut self, roles: &[Role]) -> Self {
        self.roles = Some(roles.to_vec());
        self
    }

    pub fn matches(&self, method: &str, path: &str) -> bool {
        if let Some(m) = &self.method {
            if !m.eq_ignore_ascii_case(method) {
                return false;
            }
        }

        let mut parts = path.split('/').filter(|s| !s.is_empty());
        for segment in &self.segments {
            match segment {
                Segment::Rest => return true,
                Segment::One => {
                    if parts.next().is_none() {
                        return false;
                    }
                }
                Segment::Literal(lit) => match parts.next() {
                    Some(part) if part == lit => {}
                    _ => return false,
                },
            }
        }
        parts.next().is_none()
    }

    /// Whether `role` may use this route. Rules without a role list admit anyone.
    pub fn permits(&self, role: Role) -> bool {
        match &self.roles {
            Some(allowed) => allowed.contains(&role),
            None => true,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Dot {
    Current,
    Parent,
}

/// `.` and `..`, plain or with either dot percent-encoded.
fn dot_segment(segment: &str) -> Option<Dot> {
    match segment.to_ascii_lowercase().as_str() {
        "." | "%2e" => Some(Dot::Current),
        ".." | ".%2e" | "%2e." | "%2e%2e" => Some(Dot::Parent),
        _ => None,
    }
}

/// Resolve dot segments the way an HTTP client would before sending, so the
/// path a rule is matched against is the path the downstream receives.
/// Backslashes count as separators. `None` when `..` climbs above `/`.
pub fn normalize_path(raw: &str) -> Option<String> {
    let mut kept: Vec<&str> = Vec::new();
    let mut trailing_slash = false;

    for segment in raw.split(['/', '\\']).filter(|s| !s.is_empty()) {
        match dot_segment(segment) {
            Some(Dot::Current) => trailing_slash = true,
            Some(Dot::Parent) => {
                kept.pop()?;
                trailing_slash = true;
            }
            None => {
                kept.push(segment);
                trailing_slash = false;
            }
        }
    }
    trailing_slash |= raw.ends_with('/') || raw.ends_with('\\');

    let mut path = format!("/{}", kept.join("/"));
    if trailing_slash && !kept.is_empty() {
        path.push('/');
    }
    Some(path)
}

/// What `Authorize` leaves in request extensions for the proxy handler.
#[derive(Debug, Clone)]
pub struct ResolvedRoute {
    pub rule: RouteRule,
    /// Normalized request path, forwarded as is
    pub path: String,
}

#[derive(Debug, Clone, Default)]
pub struct RouteTable {
    rules: Vec<RouteRule>,
}

impl RouteTable {
    pub fn new(rules: Vec<RouteRule>) -> Self {
        Self { rules }
    }

    /// `/users` routes for the user service. Listing users and deleting a
    /// user are admin-only; everything else under `/users` needs any role.
    pub fn default_for(user_service_url: &str) -> Self {
        Self::new(vec![
            RouteRule::new("/users", user_service_url)
                .method("GET")
                .roles(&[Role::Admin]),
            RouteRule::new("/users/*", user_service_url)
                .method("DELETE")
                .roles(&[Role::Admin]),
            RouteRule::new("/users/**", user_service_url).roles(&[Role::User, Role::Admin]),
        ])
    }

    pub fn push(&mut self, rule: RouteRule) {
        self.rules.push(rule);
    }

    pub fn match_route(&self, method: &str, path: &str) -> Option<&RouteRule> {
        self.rules.iter().find(|r| r.matches(method, path))
    }
}
