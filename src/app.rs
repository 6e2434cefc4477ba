//! Application assembly: shared state, routes and middleware stack.

use std::sync::Arc;

use axum::{
    Router,
    extract::DefaultBodyLimit,
    middleware as axum_middleware,
    routing::{get, post},
};
use tower_http::{services::ServeDir, set_header::SetResponseHeaderLayer, trace::TraceLayer};

use crate::{config::Settings, db::DbPool, handlers, middleware, tasks::TaskQueue};

/// State shared with every handler.
#[derive(Clone)]
pub struct AppState {
    pub pool: DbPool,
    pub settings: Arc<Settings>,
    pub tasks: TaskQueue,
}

/// Build the HTTP application.
///
/// Layers run outermost first: tracing, allowed hosts, HTTPS redirect,
/// security headers, debug error detail (when enabled), body limit, then
/// (for protected routes) the session check.
pub fn build_router(state: AppState) -> Router {
    let settings = Arc::clone(&state.settings);

    // Routes that require a logged-in user
    let authenticated_routes = Router::new()
        .route("/accounts/logout", post(handlers::accounts::logout))
        .route("/accounts/me", get(handlers::accounts::me))
        .route(
            "/transactions/deposit",
            post(handlers::transactions::deposit),
        )
        .route(
            "/transactions/withdraw",
            post(handlers::transactions::withdraw),
        )
        .route(
            "/transactions/report",
            get(handlers::transactions::report),
        )
        .route_layer(axum_middleware::from_fn_with_state(
            state.clone(),
            middleware::auth::session_middleware,
        ));

    let mut app = Router::new()
        // Public routes
        .route("/health", get(handlers::health::health_check))
        .route("/accounts/register", post(handlers::accounts::register))
        .route("/accounts/login", post(handlers::accounts::login))
        .merge(authenticated_routes)
        .nest_service(
            settings.static_files.url_prefix,
            ServeDir::new(&settings.static_files.root),
        )
        .layer(DefaultBodyLimit::max(settings.max_body_bytes));

    if settings.debug {
        app = app.layer(axum_middleware::map_response(
            middleware::debug::expose_error_detail,
        ));
    }

    for (name, value) in middleware::security::security_headers(&settings.security) {
        app = app.layer(SetResponseHeaderLayer::if_not_present(name, value));
    }

    app.layer(axum_middleware::from_fn_with_state(
        state.clone(),
        middleware::security::ssl_redirect_middleware,
    ))
    .layer(axum_middleware::from_fn_with_state(
        state.clone(),
        middleware::hosts::allowed_hosts_middleware,
    ))
    .layer(TraceLayer::new_for_http())
    .with_state(state)
}
