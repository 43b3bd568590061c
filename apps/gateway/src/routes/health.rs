use actix_web::{web, HttpResponse};
use migration::get_latest_migration_version;
use sea_orm::ConnectionTrait;
use serde::Serialize;

use crate::envelope::{self, now_rfc3339};
use crate::error::AppError;
use crate::state::app_state::AppState;

#[derive(Debug, Serialize)]
struct HealthResponse {
    status: String,
    app_version: String,
    db: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    db_error: Option<String>,
    migrations: String,
    time: String,
}

async fn health(app_state: web::Data<AppState>) -> Result<HttpResponse, AppError> {
    let app_version = env!("CARGO_PKG_VERSION").to_string();

    let (db_status, db_error, migrations) = match app_state.db() {
        Some(db) => {
            match db
                .query_one(sea_orm::Statement::from_string(
                    db.get_database_backend(),
                    "SELECT 1 as health_check".to_string(),
                ))
                .await
            {
                Ok(_) => {
                    let migration_version = match get_latest_migration_version(db).await {
                        Ok(Some(version)) => version,
                        Ok(None) => "no_migrations".to_string(),
                        Err(_) => "unknown".to_string(),
                    };
                    ("ok".to_string(), None, migration_version)
                }
                Err(e) => {
                    tracing::warn!(error = %e, "health check query failed");
                    (
                        "error".to_string(),
                        Some("DB query failed".to_string()),
                        "unknown".to_string(),
                    )
                }
            }
        }
        None => (
            "not_configured".to_string(),
            None,
            "unknown".to_string(),
        ),
    };

    let response = HealthResponse {
        status: "ok".to_string(),
        app_version,
        db: db_status,
        db_error,
        migrations,
        time: now_rfc3339(),
    };

    Ok(envelope::ok("Service is healthy", response))
}

pub fn configure_routes(cfg: &mut web::ServiceConfig) {
    cfg.route("/health", web::get().to(health));
}

#[cfg(test)]
mod tests {
    use actix_web::{test, App};

    use super::*;
    use crate::config::db::DbProfile;
    use crate::infra::state::build_state;

    #[actix_web::test]
    async fn reports_db_and_migration_status() {
        let state = build_state()
            .with_db(DbProfile::InMemory)
            .build()
            .await
            .unwrap();
        let app = test::init_service(
            App::new()
                .app_data(web::Data::new(state))
                .configure(configure_routes),
        )
        .await;

        let resp = test::call_service(&app, test::TestRequest::get().uri("/health").to_request()).await;
        assert!(resp.status().is_success());
        let body: serde_json::Value = test::read_body_json(resp).await;
        assert_eq!(body["success"], true);
        assert_eq!(body["data"]["status"], "ok");
        assert_eq!(body["data"]["db"], "ok");
        assert_ne!(body["data"]["migrations"], "unknown");
        assert_eq!(body["data"]["app_version"], env!("CARGO_PKG_VERSION"));
    }
}
