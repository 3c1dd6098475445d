use axum::{extract::State, response::IntoResponse, Json};
use serde::Serialize;
use serde_json::json;

use crate::state::AppState;

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
}

pub async fn health() -> impl IntoResponse {
    Json(HealthResponse { status: "ok" })
}

#[derive(Serialize)]
struct VersionResponse {
    version: String,
    commit: Option<String>,
}

pub async fn version(State(state): State<AppState>) -> impl IntoResponse {
    Json(VersionResponse {
        version: state.version.version.clone(),
        commit: state.version.commit.clone(),
    })
}

pub async fn metrics(State(state): State<AppState>) -> impl IntoResponse {
    let gateway = state.metrics.snapshot().await;
    Json(json!({
        "gateway": gateway,
        "contextCache": state.context_cache.stats().snapshot(),
        "outbound": state.net_metrics.snapshot(),
    }))
}
