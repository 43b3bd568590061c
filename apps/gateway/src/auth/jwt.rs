//! Signing and verification of gateway bearer tokens.

use std::fmt;

use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use thiserror::Error;
use time::{Duration, OffsetDateTime};
use uuid::Uuid;

use crate::auth::claims::{Claims, Role, TokenKind};
use crate::state::security_config::SecurityConfig;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TokenError {
    #[error("token signing secret is not configured")]
    Config,
    #[error("token has expired")]
    Expired,
    #[error("invalid token: {0}")]
    Invalid(String),
    #[error("failed to encode token: {0}")]
    Encode(String),
}

/// Stateless HMAC token codec. Cheap to clone and safe to share across tasks.
#[derive(Clone)]
pub struct TokenCodec {
    encoding: EncodingKey,
    decoding: DecodingKey,
    algorithm: Algorithm,
    issuer: String,
    has_secret: bool,
}

impl fmt::Debug for TokenCodec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokenCodec")
            .field("algorithm", &self.algorithm)
            .field("issuer", &self.issuer)
            .field("has_secret", &self.has_secret)
            .finish_non_exhaustive()
    }
}

impl TokenCodec {
    pub fn new(security: &SecurityConfig) -> Self {
        Self {
            encoding: EncodingKey::from_secret(&security.jwt_secret),
            decoding: DecodingKey::from_secret(&security.jwt_secret),
            algorithm: security.algorithm,
            issuer: security.issuer.clone(),
            has_secret: !security.jwt_secret.is_empty(),
        }
    }

    /// Sign a token for `sub` valid from `now` until `now + ttl`.
    ///
    /// A negative `ttl` yields an already-expired token.
    pub fn issue(
        &self,
        sub: Uuid,
        email: &str,
        role: Role,
        kind: TokenKind,
        ttl: Duration,
        now: OffsetDateTime,
    ) -> Result<String, TokenError> {
        if !self.has_secret {
            return Err(TokenError::Config);
        }

        let iat = now.unix_timestamp();
        let claims = Claims {
            sub,
            email: email.to_string(),
            role,
            iat,
            exp: (now + ttl).unix_timestamp(),
            nbf: iat,
            iss: self.issuer.clone(),
            jti: Uuid::new_v4(),
            typ: kind,
        };

        encode(&Header::new(self.algorithm), &claims, &self.encoding)
            .map_err(|e| TokenError::Encode(e.to_string()))
    }

    /// Verify signature, pinned algorithm, issuer, `exp` and `nbf`, then
    /// require the token to be of `expected` kind.
    pub fn decode(&self, token: &str, expected: TokenKind) -> Result<Claims, TokenError> {
        if !self.has_secret {
            return Err(TokenError::Config);
        }

        let mut validation = Validation::new(self.algorithm);
        validation.leeway = 0;
        validation.validate_nbf = true;
        validation.set_issuer(&[&self.issuer]);
        validation.set_required_spec_claims(&["exp", "nbf", "iss", "sub"]);

        let claims = self.decode_with(token, &validation)?;
        if claims.typ != expected {
            return Err(TokenError::Invalid("token kind mismatch".to_string()));
        }
        Ok(claims)
    }

    /// Verify signature, algorithm and issuer but accept expired tokens.
    ///
    /// Only used to recover the subject of a token being revoked.
    pub fn decode_ignoring_expiry(&self, token: &str) -> Result<Claims, TokenError> {
        if !self.has_secret {
            return Err(TokenError::Config);
        }

        let mut validation = Validation::new(self.algorithm);
        validation.validate_exp = false;
        validation.validate_nbf = false;
        validation.set_issuer(&[&self.issuer]);
        validation.set_required_spec_claims(&["iss", "sub"]);

        self.decode_with(token, &validation)
    }

    fn decode_with(&self, token: &str, validation: &Validation) -> Result<Claims, TokenError> {
        decode::<Claims>(token, &self.decoding, validation)
            .map(|data| data.claims)
            .map_err(|e| match e.kind() {
                ErrorKind::ExpiredSignature => TokenError::Expired,
                ErrorKind::InvalidSignature => TokenError::Invalid("signature mismatch".into()),
                ErrorKind::InvalidAlgorithm => TokenError::Invalid("algorithm mismatch".into()),
                ErrorKind::ImmatureSignature => TokenError::Invalid("token not yet valid".into()),
                ErrorKind::InvalidIssuer => TokenError::Invalid("issuer mismatch".into()),
                _ => TokenError::Invalid("malformed token".into()),
            })
    }
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;

    use super::*;

    const SECRET: &[u8] = b"test_secret_key_for_testing_purposes_only";

    fn codec() -> TokenCodec {
        TokenCodec::new(&SecurityConfig::new(SECRET))
    }

    fn issue(codec: &TokenCodec, kind: TokenKind, ttl: Duration) -> String {
        codec
            .issue(
                Uuid::new_v4(),
                "user@example.com",
                Role::User,
                kind,
                ttl,
                OffsetDateTime::now_utc(),
            )
            .unwrap()
    }

    #[test]
    fn test_issue_sets_time_claims() {
        let codec = codec();
        let sub = Uuid::new_v4();
        let now = OffsetDateTime::now_utc();

        let token = codec
            .issue(sub, "a@b.io", Role::Admin, TokenKind::Access, Duration::hours(1), now)
            .unwrap();
        let claims = codec.decode(&token, TokenKind::Access).unwrap();

        assert_eq!(claims.sub, sub);
        assert_eq!(claims.role, Role::Admin);
        assert_eq!(claims.iat, now.unix_timestamp());
        assert_eq!(claims.nbf, claims.iat);
        assert_eq!(claims.exp, claims.iat + 3600);
        assert_eq!(claims.iss, "gateway");
    }

    #[test]
    fn test_negative_ttl_is_expired() {
        let codec = codec();
        let token = issue(&codec, TokenKind::Access, Duration::seconds(-1));
        assert_eq!(
            codec.decode(&token, TokenKind::Access),
            Err(TokenError::Expired)
        );
    }

    #[test]
    fn test_algorithm_confusion_rejected() {
        let codec = codec();
        let now = OffsetDateTime::now_utc().unix_timestamp();
        let claims = Claims {
            sub: Uuid::new_v4(),
            email: "user@example.com".into(),
            role: Role::Admin,
            iat: now,
            exp: now + 3600,
            nbf: now,
            iss: "gateway".into(),
            jti: Uuid::new_v4(),
            typ: TokenKind::Access,
        };
        let forged = encode(
            &Header::new(Algorithm::HS512),
            &claims,
            &EncodingKey::from_secret(SECRET),
        )
        .unwrap();

        assert!(matches!(
            codec.decode(&forged, TokenKind::Access),
            Err(TokenError::Invalid(_))
        ));
    }

    #[test]
    fn test_wrong_secret_rejected() {
        let other = TokenCodec::new(&SecurityConfig::new(b"another_secret_entirely".to_vec()));
        let token = issue(&other, TokenKind::Access, Duration::hours(1));
        assert!(matches!(
            codec().decode(&token, TokenKind::Access),
            Err(TokenError::Invalid(_))
        ));
    }

    #[test]
    fn test_tampered_payload_rejected() {
        let codec = codec();
        let token = issue(&codec, TokenKind::Access, Duration::hours(1));
        let mut parts: Vec<String> = token.split('.').map(str::to_string).collect();
        parts[1] = format!("{}A", parts[1]);
        let tampered = parts.join(".");

        assert!(matches!(
            codec.decode(&tampered, TokenKind::Access),
            Err(TokenError::Invalid(_))
        ));
        assert!(matches!(
            codec.decode("not-a-jwt", TokenKind::Access),
            Err(TokenError::Invalid(_))
        ));
    }

    #[test]
    fn test_foreign_issuer_rejected() {
        let foreign = TokenCodec::new(&SecurityConfig::new(SECRET).with_issuer("someone-else"));
        let token = issue(&foreign, TokenKind::Access, Duration::hours(1));
        assert!(matches!(
            codec().decode(&token, TokenKind::Access),
            Err(TokenError::Invalid(_))
        ));
    }

    #[test]
    fn test_kind_mismatch_rejected() {
        let codec = codec();
        let refresh = issue(&codec, TokenKind::Refresh, Duration::days(7));
        assert!(matches!(
            codec.decode(&refresh, TokenKind::Access),
            Err(TokenError::Invalid(_))
        ));
        assert!(codec.decode(&refresh, TokenKind::Refresh).is_ok());
    }

    #[test]
    fn test_empty_secret_is_config_error() {
        let codec = TokenCodec::new(&SecurityConfig::new(Vec::new()));
        let result = codec.issue(
            Uuid::new_v4(),
            "a@b.io",
            Role::User,
            TokenKind::Access,
            Duration::hours(1),
            OffsetDateTime::now_utc(),
        );
        assert_eq!(result, Err(TokenError::Config));
    }

    #[test]
    fn test_decode_ignoring_expiry_recovers_subject() {
        let codec = codec();
        let sub = Uuid::new_v4();
        let token = codec
            .issue(
                sub,
                "a@b.io",
                Role::User,
                TokenKind::Access,
                Duration::hours(-2),
                OffsetDateTime::now_utc(),
            )
            .unwrap();

        assert_eq!(codec.decode(&token, TokenKind::Access), Err(TokenError::Expired));
        assert_eq!(codec.decode_ignoring_expiry(&token).unwrap().sub, sub);
    }

    #[test]
    fn test_tokens_are_unique_within_a_second() {
        let codec = codec();
        let sub = Uuid::new_v4();
        let now = OffsetDateTime::now_utc();
        let a = codec
            .issue(sub, "a@b.io", Role::User, TokenKind::Refresh, Duration::days(1), now)
            .unwrap();
        let b = codec
            .issue(sub, "a@b.io", Role::User, TokenKind::Refresh, Duration::days(1), now)
            .unwrap();
        assert_ne!(a, b);
    }

    proptest! {
        #[test]
        fn prop_round_trip_preserves_identity(
            local in "[a-z][a-z0-9._]{0,15}",
            domain in "[a-z]{1,10}\\.(com|org|io)",
            admin in any::<bool>(),
            ttl_secs in 60i64..86_400,
        ) {
            let codec = codec();
            let sub = Uuid::new_v4();
            let email = format!("{local}@{domain}");
            let role = if admin { Role::Admin } else { Role::User };
            let now = OffsetDateTime::now_utc();

            let token = codec
                .issue(sub, &email, role, TokenKind::Access, Duration::seconds(ttl_secs), now)
                .unwrap();
            let claims = codec.decode(&token, TokenKind::Access).unwrap();

            prop_assert_eq!(claims.sub, sub);
            prop_assert_eq!(claims.email, email);
            prop_assert_eq!(claims.role, role);
            prop_assert_eq!(claims.iat, now.unix_timestamp());
            prop_assert_eq!(claims.exp, now.unix_timestamp() + ttl_secs);
        }
    }
}
