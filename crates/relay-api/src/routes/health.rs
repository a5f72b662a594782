use axum::{extract::State, Json};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use utoipa::ToSchema;

use crate::{config::StorageBackend, state::AppState};

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub services: HashMap<String, String>,
}

/// Health check endpoint
///
/// Reports the configured storage backend and the number of local tools
#[utoipa::path(
    get,
    path = "/health",
    responses(
        (status = 200, description = "Service is healthy", body = HealthResponse)
    ),
    tag = "health"
)]
pub async fn health_check(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    let mut services = HashMap::new();

    let storage = match state.config.storage.backend {
        StorageBackend::Memory => "memory",
        StorageBackend::Mongodb => "mongodb",
    };
    services.insert("storage".to_string(), storage.to_string());
    services.insert(
        "tools".to_string(),
        format!("{} registered", state.relay.tools().names().len()),
    );

    Json(HealthResponse {
        status: "healthy".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        services,
    })
}
