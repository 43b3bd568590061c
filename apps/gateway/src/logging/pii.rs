use std::fmt;
use std::sync::LazyLock;

use regex::Regex;

/// Regex patterns used for PII and credential redaction in log fields.
pub struct PiiRegexRegistry;

impl PiiRegexRegistry {
    /// Compact JWS: three base64url segments, header always starts with `eyJ`.
    /// SAFETY: This regex pattern is a vetted literal that compiles successfully
    pub fn jwt() -> &'static Regex {
        static JWT_REGEX: LazyLock<Regex> = LazyLock::new(|| {
            #[allow(clippy::unwrap_used)]
            Regex::new(r"\beyJ[A-Za-z0-9_-]*\.[A-Za-z0-9_-]*\.[A-Za-z0-9_-]*").unwrap()
        });
        &JWT_REGEX
    }

    /// Email pattern: matches standard email addresses
    /// SAFETY: This regex pattern is a vetted literal that compiles successfully
    pub fn email() -> &'static Regex {
        static EMAIL_REGEX: LazyLock<Regex> = LazyLock::new(|| {
            #[allow(clippy::unwrap_used)]
            Regex::new(r"\b[A-Za-z0-9._%+-]+@[A-Za-z0-9.-]+\.[A-Za-z]{1,}\b").unwrap()
        });
        &EMAIL_REGEX
    }

    /// Opaque token pattern: base64-like runs of 24 or more characters
    /// SAFETY: This regex pattern is a vetted literal that compiles successfully
    pub fn opaque_token() -> &'static Regex {
        static OPAQUE_TOKEN_REGEX: LazyLock<Regex> = LazyLock::new(|| {
            #[allow(clippy::unwrap_used)]
            Regex::new(r"\b[A-Za-z0-9+/_]{24,}={0,2}").unwrap()
        });
        &OPAQUE_TOKEN_REGEX
    }
}

/// Redacts sensitive information from a string.
///
/// - JWTs become `[REDACTED_JWT]`
/// - Emails keep the first character of the local part and the full domain
/// - Other long opaque runs become `[REDACTED_TOKEN]`
pub fn redact(input: &str) -> String {
    let jwt_redacted = PiiRegexRegistry::jwt().replace_all(input, "[REDACTED_JWT]");

    let email_redacted =
        PiiRegexRegistry::email().replace_all(&jwt_redacted, |caps: &regex::Captures| {
            let full_match = &caps[0];
            match full_match.find('@') {
                Some(0) | None => full_match.to_string(),
                Some(at_pos) => {
                    let first = &full_match[..1];
                    let domain = &full_match[at_pos..];
                    format!("{first}***{domain}")
                }
            }
        });

    PiiRegexRegistry::opaque_token()
        .replace_all(&email_redacted, "[REDACTED_TOKEN]")
        .to_string()
}

/// A wrapper that redacts sensitive strings when displayed.
pub struct Redacted<'a>(pub &'a str);

impl fmt::Display for Redacted<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", redact(self.0))
    }
}

impl fmt::Debug for Redacted<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", redact(self.0))
    }
}
