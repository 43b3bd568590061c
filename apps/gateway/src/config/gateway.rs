//! Gateway settings read from the process environment.

use std::env;
use std::str::FromStr;
use std::time::Duration;

use crate::config::db::must_var;
use crate::error::AppError;
use crate::proxy::ProxyConfig;
use crate::rate_limit::RateLimitConfig;
use crate::state::security_config::{SecurityConfig, DEFAULT_ISSUER};

#[derive(Debug, Clone)]
pub struct GatewayConfig {
    pub host: String,
    pub port: u16,
    pub security: SecurityConfig,
    pub rate_limit: RateLimitConfig,
    pub proxy: ProxyConfig,
    /// Use the right-most `X-Forwarded-For` entry as the client identity
    pub trust_forwarded_for: bool,
    pub refresh_sweep_interval: Duration,
    pub cors_allowed_origins: Vec<String>,
}

fn optional_var(name: &str) -> Option<String> {
    env::var(name).ok().filter(|v| !v.trim().is_empty())
}

fn parse_var<T: FromStr>(name: &str, default: T) -> Result<T, AppError> {
    match optional_var(name) {
        None => Ok(default),
        Some(raw) => raw.trim().parse::<T>().map_err(|_| {
            AppError::config(format!("Environment variable '{name}' has an invalid value: '{raw}'"))
        }),
    }
}

fn parse_bool(name: &str, default: bool) -> Result<bool, AppError> {
    match optional_var(name) {
        None => Ok(default),
        Some(raw) => match raw.trim().to_ascii_lowercase().as_str() {
            "1" | "true" | "yes" | "on" => Ok(true),
            "0" | "false" | "no" | "off" => Ok(false),
            _ => Err(AppError::config(format!(
                "Environment variable '{name}' must be a boolean, got '{raw}'"
            ))),
        },
    }
}

fn positive<T: PartialOrd + Default>(name: &str, value: T) -> Result<T, AppError> {
    if value > T::default() {
        Ok(value)
    } else {
        Err(AppError::config(format!(
            "Environment variable '{name}' must be greater than zero"
        )))
    }
}

/// Split a comma-separated origin list, keeping only `http(s)://` entries.
pub fn parse_origins(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty() && *s != "null")
        .filter(|s| s.starts_with("http://") || s.starts_with("https://"))
        .map(str::to_string)
        .collect()
}

impl GatewayConfig {
    pub fn from_env() -> Result<Self, AppError> {
        let host = optional_var("GATEWAY_HOST").unwrap_or_else(|| "0.0.0.0".to_string());
        let port = parse_var::<u16>("GATEWAY_PORT", 8080)?;

        let secret = must_var("GATEWAY_JWT_SECRET")?;
        if secret.is_empty() {
            return Err(AppError::config("GATEWAY_JWT_SECRET must not be empty"));
        }
        let issuer =
            optional_var("GATEWAY_JWT_ISSUER").unwrap_or_else(|| DEFAULT_ISSUER.to_string());
        let access_hours = positive(
            "ACCESS_TOKEN_TTL_HOURS",
            parse_var::<i64>("ACCESS_TOKEN_TTL_HOURS", 1)?,
        )?;
        let refresh_days = positive(
            "REFRESH_TOKEN_TTL_DAYS",
            parse_var::<i64>("REFRESH_TOKEN_TTL_DAYS", 7)?,
        )?;
        let security = SecurityConfig::new(secret.into_bytes())
            .with_issuer(issuer)
            .with_access_ttl(time::Duration::hours(access_hours))
            .with_refresh_ttl(time::Duration::days(refresh_days))
            .with_rotation(parse_bool("ROTATE_REFRESH_TOKENS", false)?);

        let rate_limit = RateLimitConfig {
            rate: positive("RATE_LIMIT_RPS", parse_var::<f64>("RATE_LIMIT_RPS", 10.0)?)?,
            burst: positive("RATE_LIMIT_BURST", parse_var::<u32>("RATE_LIMIT_BURST", 20)?)?,
            cleanup_interval: Duration::from_secs(positive(
                "RATE_LIMIT_CLEANUP_SECS",
                parse_var::<u64>("RATE_LIMIT_CLEANUP_SECS", 60)?,
            )?),
        };

        let user_service_url = must_var("USER_SERVICE_URL")?;
        if !(user_service_url.starts_with("http://") || user_service_url.starts_with("https://"))
        {
            return Err(AppError::config(format!(
                "USER_SERVICE_URL must be an http(s) URL, got '{user_service_url}'"
            )));
        }
        let proxy = ProxyConfig {
            user_service_url,
            timeout: Duration::from_secs(positive(
                "PROXY_TIMEOUT_SECS",
                parse_var::<u64>("PROXY_TIMEOUT_SECS", 10)?,
            )?),
            request_timeout: Duration::from_secs(positive(
                "REQUEST_TIMEOUT_SECS",
                parse_var::<u64>("REQUEST_TIMEOUT_SECS", 30)?,
            )?),
            max_body_bytes: positive(
                "MAX_BODY_BYTES",
                parse_var::<usize>("MAX_BODY_BYTES", 10 * 1024 * 1024)?,
            )?,
        };

        Ok(Self {
            host,
            port,
            security,
            rate_limit,
            proxy,
            trust_forwarded_for: parse_bool("TRUST_FORWARDED_FOR", false)?,
            refresh_sweep_interval: Duration::from_secs(positive(
                "REFRESH_SWEEP_SECS",
                parse_var::<u64>("REFRESH_SWEEP_SECS", 3600)?,
            )?),
            cors_allowed_origins: parse_origins(
                &optional_var("CORS_ALLOWED_ORIGINS").unwrap_or_default(),
            ),
        })
    }
}
