use actix_web::{web, HttpResponse, Result};
use serde::{Deserialize, Serialize};
use time::format_description::well_known::Rfc3339;
use time::OffsetDateTime;

use crate::auth::manager::UserSummary;
use crate::envelope;
use crate::error::AppError;
use crate::extractors::{Identity, OptionalBearer, Validate, ValidatedJson};
use crate::state::app_state::AppState;

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
}

impl Validate for LoginRequest {
    fn validate(&self) -> Result<(), AppError> {
        if self.email.trim().is_empty() {
            return Err(AppError::invalid("Email cannot be empty"));
        }
        if self.password.is_empty() {
            return Err(AppError::invalid("Password cannot be empty"));
        }
        Ok(())
    }
}

#[derive(Debug, Deserialize)]
pub struct RefreshRequest {
    #[serde(default)]
    pub refresh_token: String,
}

impl Validate for RefreshRequest {
    fn validate(&self) -> Result<(), AppError> {
        if self.refresh_token.trim().is_empty() {
            return Err(AppError::invalid("refresh_token is required"));
        }
        Ok(())
    }
}

#[derive(Debug, Deserialize)]
pub struct LogoutRequest {
    pub access_token: Option<String>,
    #[serde(default)]
    pub refresh_token: String,
}

impl Validate for LogoutRequest {
    fn validate(&self) -> Result<(), AppError> {
        if self.refresh_token.trim().is_empty() {
            return Err(AppError::invalid("refresh_token is required"));
        }
        Ok(())
    }
}

#[derive(Debug, Deserialize)]
pub struct ValidateRequest {
    #[serde(default)]
    pub token: String,
}

impl Validate for ValidateRequest {
    fn validate(&self) -> Result<(), AppError> {
        if self.token.trim().is_empty() {
            return Err(AppError::invalid("token is required"));
        }
        Ok(())
    }
}

#[derive(Debug, Serialize)]
pub struct ValidateResponse {
    pub valid: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user: Option<UserSummary>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<String>,
    /// Error code explaining why the token is not valid
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

#[derive(Debug, Serialize)]
struct LogoutAllResponse {
    revoked: u64,
}

/// Exchange credentials for an access/refresh token pair.
async fn login(
    req: ValidatedJson<LoginRequest>,
    app_state: web::Data<AppState>,
) -> Result<HttpResponse, AppError> {
    let outcome = app_state.auth.login(&req.email, &req.password).await?;
    Ok(envelope::ok("Login successful", outcome))
}

async fn refresh(
    req: ValidatedJson<RefreshRequest>,
    app_state: web::Data<AppState>,
) -> Result<HttpResponse, AppError> {
    let outcome = app_state.auth.refresh(&req.refresh_token).await?;
    Ok(envelope::ok("Token refreshed", outcome))
}

/// The access token may come from the body or the `Authorization` header;
/// the body wins when both are present.
async fn logout(
    bearer: OptionalBearer,
    req: ValidatedJson<LogoutRequest>,
    app_state: web::Data<AppState>,
) -> Result<HttpResponse, AppError> {
    let req = req.into_inner();
    let access_token = req
        .access_token
        .filter(|t| !t.trim().is_empty())
        .or(bearer.0);

    app_state
        .auth
        .logout(access_token.as_deref(), &req.refresh_token)
        .await?;
    Ok(envelope::ok_empty("Logged out"))
}

/// Report whether an access token is currently valid. Always `200`; an
/// invalid token yields `valid: false` with the rejection code.
async fn validate(
    req: ValidatedJson<ValidateRequest>,
    app_state: web::Data<AppState>,
) -> Result<HttpResponse, AppError> {
    let response = match app_state.auth.validate_access(&req.token) {
        Ok(claims) => ValidateResponse {
            valid: true,
            expires_at: OffsetDateTime::from_unix_timestamp(claims.exp)
                .ok()
                .and_then(|t| t.format(&Rfc3339).ok()),
            user: Some(UserSummary {
                id: claims.sub,
                email: claims.email,
                role: claims.role,
            }),
            reason: None,
        },
        Err(err @ AppError::Config { .. }) => return Err(err),
        Err(e) => ValidateResponse {
            valid: false,
            user: None,
            expires_at: None,
            reason: Some(e.code().as_str().to_string()),
        },
    };

    Ok(envelope::ok("Token checked", response))
}

/// Revoke every refresh token held by the caller.
async fn logout_all(
    identity: Identity,
    app_state: web::Data<AppState>,
) -> Result<HttpResponse, AppError> {
    let revoked = app_state.auth.logout_everywhere(identity.0.sub).await?;
    Ok(envelope::ok("All sessions revoked", LogoutAllResponse { revoked }))
}

pub fn configure_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(web::resource("/auth/login").route(web::post().to(login)))
        .service(web::resource("/auth/refresh").route(web::post().to(refresh)))
        .service(web::resource("/auth/logout").route(web::post().to(logout)))
        .service(web::resource("/auth/validate").route(web::post().to(validate)))
        .service(web::resource("/auth/logout-all").route(web::post().to(logout_all)));
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn login_request_rules() {
        let ok = LoginRequest {
            email: "a@b.c".into(),
            password: "pw".into(),
        };
        assert!(ok.validate().is_ok());

        let blank = LoginRequest {
            email: "  ".into(),
            password: "pw".into(),
        };
        assert_eq!(
            blank.validate().unwrap_err().code().as_str(),
            "VALIDATION_ERROR"
        );

        let no_pw = LoginRequest {
            email: "a@b.c".into(),
            password: String::new(),
        };
        assert!(no_pw.validate().is_err());
    }

    #[test]
    fn logout_requires_refresh_token() {
        let req: LogoutRequest = serde_json::from_str(r#"{"access_token":"x"}"#).unwrap();
        assert!(req.validate().is_err());
    }
}
