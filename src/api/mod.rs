//! HTTP router for amocrm-bridge.
//!
//! - /contacts — contact form submission → amoCRM lead
//! - /status   — health check
//! - anything else is served from the public directory (the form page)

pub mod routes;

use crate::SharedState;
use axum::Router;
use tower_http::cors::{Any, CorsLayer};
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;

pub fn router(state: SharedState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let public = ServeDir::new(&state.config.public_dir);

    routes::router(state)
        .fallback_service(public)
        .layer(cors)
        .layer(TraceLayer::new_for_http())
}
