use axum::{
    body::Bytes,
    middleware::{from_fn, from_fn_with_state},
    routing::{get, post},
    Router,
};
use serde_json::Value;

use crate::errors::ApiError;
use crate::metrics::metrics_middleware;
use crate::middleware::{catch_panic_middleware, request_id_middleware};
use crate::state::AppState;

mod confirm;
mod proxy;
mod query;
mod service;
mod stream;
mod user;

pub use proxy::is_valid_tool_name;

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(service::health))
        .route("/version", get(service::version))
        .route("/metrics", get(service::metrics))
        .route("/api/user", get(user::profile))
        .route("/api/mcp/tools", get(user::catalogue))
        .route("/api/ai/query", post(query::ai_query))
        .route("/api/query", get(stream::stream_get).post(stream::stream_post))
        .route(
            "/api/mcp/:server_name/:tool_name",
            get(proxy::proxy_get).post(proxy::proxy_post),
        )
        .route("/api/confirm/:confirmation_id", post(confirm::confirm))
        .route_layer(from_fn_with_state(state.clone(), metrics_middleware))
        .layer(from_fn(catch_panic_middleware))
        .layer(from_fn(request_id_middleware))
        .with_state(state)
}

/// Bodies are parsed by hand so malformed JSON maps onto `INVALID_REQUEST`
/// instead of the extractor's own rejection.
fn parse_body(body: &Bytes) -> Result<Value, ApiError> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(Value::Object(Default::default()));
    }
    let value: Value = serde_json::from_slice(body)
        .map_err(|err| ApiError::invalid_request(&format!("Request body is not valid JSON: {err}")))?;
    if !value.is_object() {
        return Err(ApiError::invalid_request("Request body must be a JSON object."));
    }
    Ok(value)
}
