use jsonwebtoken::Algorithm;
use time::Duration;

pub const DEFAULT_ISSUER: &str = "gateway";

/// Configuration for JWT security settings
#[derive(Debug, Clone)]
pub struct SecurityConfig {
    /// Secret for signing and verifying tokens
    pub jwt_secret: Vec<u8>,
    /// Pinned signing algorithm (HS256)
    pub algorithm: Algorithm,
    /// Value for the `iss` claim; tokens from any other issuer are rejected
    pub issuer: String,
    pub access_ttl: Duration,
    pub refresh_ttl: Duration,
    /// Issue a fresh refresh token (and revoke the presented one) on refresh
    pub rotate_refresh_tokens: bool,
}

impl SecurityConfig {
    /// Create a new SecurityConfig with the given JWT secret
    pub fn new(jwt_secret: impl Into<Vec<u8>>) -> Self {
        Self {
            jwt_secret: jwt_secret.into(),
            algorithm: Algorithm::HS256,
            issuer: DEFAULT_ISSUER.to_string(),
            access_ttl: Duration::hours(1),
            refresh_ttl: Duration::days(7),
            rotate_refresh_tokens: false,
        }
    }

    pub fn with_issuer(mut self, issuer: impl Into<String>) -> Self {
        self.issuer = issuer.into();
        self
    }

    pub fn with_access_ttl(mut self, ttl: Duration) -> Self {
        self.access_ttl = ttl;
        self
    }

    pub fn with_refresh_ttl(mut self, ttl: Duration) -> Self {
        self.refresh_ttl = ttl;
        self
    }

    pub fn with_rotation(mut self, rotate: bool) -> Self {
        self.rotate_refresh_tokens = rotate;
        self
    }
}

impl Default for SecurityConfig {
    fn default() -> Self {
        Self::new(b"default_secret_for_tests_only".to_vec())
    }
}
