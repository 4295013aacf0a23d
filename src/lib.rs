//! Status Monitor Library
//!
//! Tracks TCP reachability of configured players and serves the latest
//! results over HTTP.

pub mod api;
pub mod config;
pub mod error;
pub mod models;
pub mod monitor;

use axum::http::{header, HeaderValue, Method};
use axum::{
    routing::{get, put},
    Router,
};
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::trace::TraceLayer;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use crate::api::openapi::ApiDoc;
use crate::api::AppState;

/// Create the application router with the given state
pub fn create_router(state: AppState) -> Router {
    let cors = cors_layer(&state.config.allowed_origins());

    Router::new()
        // Health check
        .route("/health", get(api::health::health_check))
        // UI
        .route("/", get(api::players::index))
        .route("/players", get(api::players::page))
        // Players
        .route(
            "/api/players",
            get(api::players::status).post(api::players::create),
        )
        .route("/api/players/config", get(api::players::list_config))
        .route(
            "/api/players/:ip_port",
            put(api::players::update).delete(api::players::delete),
        )
        // OpenAPI / Swagger UI
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .with_state(state)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
}

/// Create CORS layer from the configured origin list
fn cors_layer(allowed_origins: &[String]) -> CorsLayer {
    let origins: Vec<HeaderValue> = allowed_origins
        .iter()
        .filter_map(|s| s.parse().ok())
        .collect();

    CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([header::CONTENT_TYPE, header::ACCEPT])
}
