use std::collections::HashMap;

use axum::{
    body::Bytes,
    extract::{Query, State},
    http::HeaderValue,
    response::{IntoResponse, Response},
};
use serde_json::Value;
use tracing::warn;

use crate::errors::ApiError;
use crate::middleware::{Caller, RequestId};
use crate::routes::parse_body;
use crate::state::AppState;
use crate::streaming::{sse_response, StreamRequest};

fn non_empty(value: Option<&str>) -> Option<String> {
    value.map(str::trim).filter(|v| !v.is_empty()).map(str::to_string)
}

/// Legacy query-string form, kept for older clients.
pub async fn stream_get(
    State(state): State<AppState>,
    RequestId(request_id): RequestId,
    Caller(caller): Caller,
    Query(params): Query<HashMap<String, String>>,
) -> Result<Response, ApiError> {
    let query = non_empty(params.get("q").map(String::as_str))
        .ok_or_else(|| ApiError::invalid_request("Query parameter 'q' is required."))?;
    warn!(target: "tamshai::stream", user_id = %caller.user_id, "deprecated GET /api/query used");
    let request = StreamRequest {
        query,
        cursor: non_empty(params.get("cursor").map(String::as_str)),
        request_id,
    };
    let mut response = sse_response(state, caller, request).into_response();
    response
        .headers_mut()
        .insert("deprecation", HeaderValue::from_static("true"));
    Ok(response)
}

pub async fn stream_post(
    State(state): State<AppState>,
    RequestId(request_id): RequestId,
    Caller(caller): Caller,
    body: Bytes,
) -> Result<Response, ApiError> {
    let body = parse_body(&body)?;
    let query = non_empty(body.get("query").and_then(Value::as_str))
        .ok_or_else(|| ApiError::invalid_request("Field 'query' is required and must be a non-empty string."))?;
    let request = StreamRequest {
        query,
        cursor: non_empty(body.get("cursor").and_then(Value::as_str)),
        request_id,
    };
    Ok(sse_response(state, caller, request).into_response())
}
