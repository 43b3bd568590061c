#![allow(dead_code)]

use std::time::Duration;

use actix_http::Request;
use actix_web::body::MessageBody;
use actix_web::dev::{Service, ServiceResponse};
use actix_web::http::StatusCode;
use actix_web::{test, web, App, Error, HttpRequest, HttpResponse, HttpServer};
use gateway::auth::claims::{Role, TokenKind};
use gateway::config::db::DbProfile;
use gateway::infra::state::{build_state, StateBuilder};
use gateway::middleware::{
    cors_middleware, RateLimit, RequestTrace, StructuredLogger, TraceSpan,
};
use gateway::proxy::ProxyConfig;
use gateway::repos::users::{create_user, User};
use gateway::routes;
use gateway::state::app_state::AppState;
use gateway::state::security_config::SecurityConfig;
use serde_json::{json, Map, Value};
use time::OffsetDateTime;

pub const TEST_SECRET: &[u8] = b"integration-test-secret-0123456789";
pub const PASSWORD: &str = "correct horse battery staple";

/// In-memory database, a fixed signing secret and `downstream` as the user
/// service.
pub fn state_builder(downstream: &str) -> StateBuilder {
    build_state()
        .with_db(DbProfile::InMemory)
        .with_security(SecurityConfig::new(TEST_SECRET.to_vec()))
        .with_proxy(ProxyConfig::new(downstream))
}

pub async fn seed_user(state: &AppState, email: &str, role: Role, is_active: bool) -> User {
    let hash = bcrypt::hash(PASSWORD, 4).unwrap();
    create_user(state.db().unwrap(), email, &hash, role, is_active)
        .await
        .unwrap()
}

/// Mint an access token directly, bypassing login.
pub fn access_token(state: &AppState, user: &User, ttl: time::Duration) -> String {
    state
        .auth
        .codec()
        .issue(
            user.id,
            &user.email,
            user.role,
            TokenKind::Access,
            ttl,
            OffsetDateTime::now_utc(),
        )
        .unwrap()
}

/// The full production pipeline around `state`.
pub async fn create_test_app(
    state: &AppState,
) -> impl Service<Request, Response = ServiceResponse<impl MessageBody>, Error = Error> {
    let data = web::Data::new(state.clone());
    test::init_service(
        App::new()
            .wrap(RateLimit)
            .wrap(cors_middleware(&[]))
            .wrap(StructuredLogger)
            .wrap(TraceSpan)
            .wrap(RequestTrace)
            .app_data(data)
            .configure(routes::configure),
    )
    .await
}

async fn echo(req: HttpRequest, body: web::Bytes) -> HttpResponse {
    let headers: Map<String, Value> = req
        .headers()
        .iter()
        .map(|(name, value)| {
            (
                name.as_str().to_string(),
                Value::String(value.to_str().unwrap_or_default().to_string()),
            )
        })
        .collect();

    HttpResponse::Ok()
        .insert_header(("x-downstream", "echo"))
        .insert_header(("proxy-authenticate", "Basic realm=\"users\""))
        .json(json!({
            "method": req.method().as_str(),
            "path": req.path(),
            "query": req.query_string(),
            "headers": headers,
            "body": String::from_utf8_lossy(&body),
        }))
}

async fn slow() -> HttpResponse {
    tokio::time::sleep(Duration::from_secs(2)).await;
    HttpResponse::Ok().body("too late")
}

async fn status(path: web::Path<u16>) -> HttpResponse {
    let code = StatusCode::from_u16(path.into_inner()).unwrap_or(StatusCode::IM_A_TEAPOT);
    HttpResponse::build(code).body("downstream says no")
}

/// Start an echo server on an ephemeral port and return its base URL.
///
/// `/users/slow` sleeps for two seconds and `/users/status/{code}` answers
/// with that status; every other path echoes the request as JSON.
pub fn spawn_downstream() -> String {
    let server = HttpServer::new(|| {
        App::new()
            .route("/users/slow", web::get().to(slow))
            .route("/users/status/{code}", web::get().to(status))
            .default_service(web::to(echo))
    })
    .workers(1)
    .disable_signals()
    .bind(("127.0.0.1", 0))
    .unwrap();

    let addr = server.addrs()[0];
    actix_web::rt::spawn(server.run());
    format!("http://{addr}")
}

/// A base URL nothing is listening on.
pub fn closed_port_url() -> String {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    format!("http://{addr}")
}
