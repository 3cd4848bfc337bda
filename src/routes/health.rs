//! Health and debug endpoints.

use axum::{Json, extract::State, response::IntoResponse};
use serde_json::json;

use crate::state::AppState;

/// Liveness plus a shape summary of the loaded configuration.
pub async fn handle_health(State(state): State<AppState>) -> impl IntoResponse {
    let snap = state.snapshot();
    let config = &snap.config;

    Json(json!({
        "status": "ok",
        "basic_count": config.basic_auth.len(),
        "bearer_count": config.bearer_token.len(),
        "apikey_count": config.api_key.len(),
        "jwt_enabled": config.jwt_enabled(),
        "policy_count": config.route_policy.len(),
    }))
}

/// Sanitized configuration summary. Mounted only when
/// `server.enable_debug` is set; never contains secrets, only the
/// configured NAMES.
pub async fn handle_debug(State(state): State<AppState>) -> impl IntoResponse {
    let snap = state.snapshot();
    let config = &snap.config;

    let basic_names: Vec<&str> = config.basic_auth.iter().map(|c| c.name.as_str()).collect();
    let bearer_names: Vec<&str> = config.bearer_token.iter().map(|c| c.name.as_str()).collect();
    let api_key_names: Vec<&str> = config.api_key.iter().map(|c| c.name.as_str()).collect();
    let policy_names: Vec<&str> = config.route_policy.iter().map(|p| p.name.as_str()).collect();

    Json(json!({
        "server": {
            "port": config.server.port,
            "auth_path": config.server.auth_path,
            "health_path": config.server.health_path,
        },
        "authentication": {
            "basic_auth": basic_names,
            "bearer_tokens": bearer_names,
            "api_keys": api_key_names,
            "jwt_enabled": config.jwt_enabled(),
        },
        "policies": policy_names,
    }))
}
