pub mod auth;
pub mod config;
pub mod error;
pub mod handlers;
pub mod middleware;
pub mod routes;
pub mod state;

use axum::{
    middleware as axum_middleware,
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use std::time::Duration;
use tower_http::{
    compression::CompressionLayer,
    cors::{Any, CorsLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use crate::{
    config::Config,
    handlers::assistant,
    middleware::logging,
    routes::health,
    state::AppState,
};

#[derive(OpenApi)]
#[openapi(
    paths(health::health_check, assistant::send_message),
    components(schemas(health::HealthResponse, assistant::AssistantRequest)),
    tags(
        (name = "assistant", description = "Relay user turns to the hosted assistant"),
        (name = "health", description = "Service status")
    )
)]
pub struct ApiDoc;

pub fn build_router(state: Arc<AppState>) -> Router {
    let api_routes = Router::new()
        .route("/health", get(health::health_check))
        .route("/api/assistant", post(assistant::send_message));

    // Runs finish on their own timeout; the layer only bounds time-to-headers
    let timeout = Duration::from_secs(state.config.assistant.request_timeout_secs.saturating_add(5));

    Router::new()
        .merge(api_routes)
        .layer(axum_middleware::from_fn(logging::log_request))
        .layer(TimeoutLayer::new(timeout))
        .layer(CompressionLayer::new())
        .layer(build_cors_layer(&state.config))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
        .merge(SwaggerUi::new("/api/docs").url("/api/openapi.json", ApiDoc::openapi()))
}

fn build_cors_layer(config: &Config) -> CorsLayer {
    if config.cors.enabled {
        let mut cors = CorsLayer::new()
            .allow_methods([
                axum::http::Method::GET,
                axum::http::Method::POST,
                axum::http::Method::OPTIONS,
            ])
            .allow_headers(Any);

        if config.cors.origins.iter().any(|o| o == "*") {
            cors = cors.allow_origin(Any);
        } else {
            let origins: Vec<axum::http::HeaderValue> = config
                .cors
                .origins
                .iter()
                .filter_map(|origin| origin.parse().ok())
                .collect();
            cors = cors.allow_origin(origins);
        }

        cors
    } else {
        CorsLayer::permissive()
    }
}
