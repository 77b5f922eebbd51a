//! Route configuration and setup

use axum::{
    extract::DefaultBodyLimit,
    http::{HeaderValue, Method},
    routing::{get, post},
    Json, Router,
};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use utoipa::OpenApi;
use utoipa_rapidoc::RapiDoc;

use atelier_core::Config;

use crate::api_doc::ApiDoc;
use crate::handlers;
use crate::state::AppState;

/// Setup all application routes
pub fn setup_routes(config: &Config, state: AppState) -> Result<Router, anyhow::Error> {
    let cors = setup_cors(config)?;

    // Headroom over the inline limit for multipart framing and the optional
    // companion thumbnail; the handler enforces the real per-file limit.
    let body_limit = (config.inline_upload_max_bytes as usize)
        .saturating_mul(2)
        .saturating_add(1024 * 1024);

    let app = Router::new()
        .route("/health", get(handlers::health::health))
        .route("/upload", post(handlers::upload::upload))
        .route("/uploads/direct", post(handlers::direct_upload::direct_upload))
        .route(
            "/uploads/direct/complete",
            post(handlers::direct_upload::complete_direct_upload),
        )
        .route("/api/openapi.json", get(openapi_spec))
        .with_state(state)
        .merge(RapiDoc::new("/api/openapi.json").path("/docs"))
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(cors)
        .layer(TraceLayer::new_for_http());

    Ok(app)
}

async fn openapi_spec() -> Json<utoipa::openapi::OpenApi> {
    Json(ApiDoc::openapi())
}

fn setup_cors(config: &Config) -> Result<CorsLayer, anyhow::Error> {
    let cors = if config.cors_origins.iter().any(|o| o == "*") {
        // Config::validate rejects the wildcard in production.
        CorsLayer::new()
            .allow_origin(Any)
            .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
            .allow_headers(Any)
    } else {
        let origins = config
            .cors_origins
            .iter()
            .map(|origin| {
                origin
                    .parse::<HeaderValue>()
                    .map_err(|e| anyhow::anyhow!("Invalid CORS origin '{}': {}", origin, e))
            })
            .collect::<Result<Vec<_>, _>>()?;
        CorsLayer::new()
            .allow_origin(origins)
            .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
            .allow_headers(Any)
    };
    Ok(cors)
}
