use actix_web::web;

use crate::middleware::authorize::Authorize;

pub mod auth;
pub mod health;
pub mod proxy;

/// Register every gateway route.
///
/// `/health` and `/auth/*` are served locally. Anything else falls through to
/// the catch-all scope, where `Authorize` resolves the route table entry and
/// the proxy handler forwards the request downstream.
pub fn configure(cfg: &mut web::ServiceConfig) {
    // Health check: /health
    cfg.configure(health::configure_routes);

    // Auth routes: /auth/**
    cfg.configure(auth::configure_routes);

    // Everything else is proxied
    cfg.service(
        web::scope("")
            .wrap(Authorize)
            .default_service(web::to(proxy::forward)),
    );
}
