//! OpenAPI documentation for the Status Monitor API

use utoipa::OpenApi;

/// API Documentation
#[derive(OpenApi)]
#[openapi(
    info(
        title = "Status Monitor API",
        version = "1.0.0",
        description = "Reachability of configured players.\n\n## Features\n- Background TCP probing with per-probe timeout\n- Latest status snapshot as JSON\n- Add, edit and remove players in the persisted YAML list",
        license(name = "MIT"),
        contact(name = "Status Monitor Team")
    ),
    servers(
        (url = "http://localhost:8080", description = "Local development server")
    ),
    tags(
        (name = "players", description = "Player status and management"),
        (name = "health", description = "Service health")
    ),
    paths(
        crate::api::players::status,
        crate::api::players::list_config,
        crate::api::players::create,
        crate::api::players::update,
        crate::api::players::delete,
        crate::api::health::health_check,
    ),
    components(schemas(
        crate::models::Endpoint,
        crate::models::CreatePlayerRequest,
        crate::models::UpdatePlayerRequest,
        crate::models::ProbeStatus,
        crate::models::ProbeResult,
        crate::models::StatusReport,
        crate::api::response::ApiError,
        crate::api::health::HealthResponse,
    ))
)]
pub struct ApiDoc;
