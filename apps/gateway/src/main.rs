use actix_web::{web, App, HttpServer};
use gateway::config::db::DbProfile;
use gateway::config::gateway::GatewayConfig;
use gateway::infra::state::build_state;
use gateway::middleware::cors::cors_middleware;
use gateway::middleware::rate_limit::RateLimit;
use gateway::middleware::request_trace::RequestTrace;
use gateway::middleware::structured_logger::StructuredLogger;
use gateway::middleware::trace_span::TraceSpan;
use gateway::routes;
use tracing::{error, info};

mod telemetry;

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    telemetry::init_tracing();

    // Environment variables must be set by the runtime environment:
    // - Docker: Set via docker-compose env_file or docker run --env-file
    // - Local dev: Source env files manually (e.g., set -a; . ./.env; set +a)
    let config = match GatewayConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            error!(error = %e, "invalid gateway configuration");
            std::process::exit(1);
        }
    };

    let app_state = match build_state()
        .with_config(&config)
        .with_db(DbProfile::Prod)
        .build()
        .await
    {
        Ok(state) => state,
        Err(e) => {
            error!(error = %e, "failed to build application state");
            std::process::exit(1);
        }
    };

    info!(
        host = %config.host,
        port = config.port,
        user_service = %config.proxy.user_service_url,
        "starting gateway"
    );

    let background = app_state.spawn_background_tasks(config.refresh_sweep_interval);
    let shutdown = app_state.shutdown.clone();

    // Wrap AppState with web::Data before passing to HttpServer
    let data = web::Data::new(app_state);
    let cors_origins = config.cors_allowed_origins.clone();

    let result = HttpServer::new(move || {
        App::new()
            .wrap(RateLimit)
            .wrap(cors_middleware(&cors_origins))
            .wrap(StructuredLogger)
            .wrap(TraceSpan)
            .wrap(RequestTrace)
            .app_data(data.clone())
            .configure(routes::configure)
    })
    .bind((config.host.as_str(), config.port))?
    .run()
    .await;

    shutdown.cancel();
    for handle in background {
        let _ = handle.await;
    }
    info!("gateway stopped");

    result
}
