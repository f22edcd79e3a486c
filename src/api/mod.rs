//! REST API module using Axum
//!
//! Status and operator endpoints for the hydrate monitor. Every response
//! uses the envelope from [`envelope`].

pub mod envelope;
pub mod handlers;
mod routes;

pub use handlers::ApiState;

use axum::extract::DefaultBodyLimit;
use axum::http::{header, Method};
use axum::Router;
use tower_http::cors::CorsLayer;
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::trace::TraceLayer;

use crate::config::defaults::UPLOAD_BODY_HEADROOM_BYTES;

/// Build a CORS layer that is restrictive by default (same-origin only).
///
/// Set `HYDRAWATCH_CORS_ORIGINS` to a comma-separated list of allowed
/// origins for development (e.g., `http://localhost:5173`).
fn build_cors_layer() -> CorsLayer {
    let base = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION]);
    match std::env::var("HYDRAWATCH_CORS_ORIGINS") {
        Ok(origins) => {
            let allowed: Vec<_> = origins
                .split(',')
                .filter_map(|o| o.trim().parse().ok())
                .collect();
            tracing::info!(origins = %origins, "CORS: allowing configured origins");
            base.allow_origin(allowed)
        }
        Err(_) => base,
    }
}

/// Largest request body accepted. Files between the configured upload limit
/// and this ceiling reach the simulation pipeline and get a precise
/// rejection; anything larger is cut off with 413.
fn body_limit(state: &ApiState) -> usize {
    let ceiling = state
        .monitor
        .simulation()
        .limits()
        .max_file_bytes
        .saturating_add(UPLOAD_BODY_HEADROOM_BYTES);
    usize::try_from(ceiling).unwrap_or(usize::MAX)
}

/// Create the complete application router.
pub fn create_app(state: ApiState) -> Router {
    let cors = build_cors_layer();
    let limit = body_limit(&state);

    Router::new()
        .nest("/api/v1", routes::api_routes(state.clone()))
        .merge(routes::root_routes(state))
        .layer(DefaultBodyLimit::disable())
        .layer(RequestBodyLimitLayer::new(limit))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
}
