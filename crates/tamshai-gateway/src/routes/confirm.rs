use axum::{
    body::Bytes,
    extract::{Path, State},
    Json,
};
use serde_json::Value;

use crate::confirm::resolve;
use crate::errors::ApiError;
use crate::middleware::{Caller, RequestId};
use crate::routes::parse_body;
use crate::state::AppState;

pub async fn confirm(
    State(state): State<AppState>,
    RequestId(request_id): RequestId,
    Caller(caller): Caller,
    Path(confirmation_id): Path<String>,
    body: Bytes,
) -> Result<Json<Value>, ApiError> {
    let approved = parse_body(&body)?
        .get("approved")
        .and_then(Value::as_bool)
        .ok_or_else(|| ApiError::invalid_request("Field 'approved' is required and must be a boolean."))?;
    let resolution = resolve(&state, &confirmation_id, approved, &caller, &request_id).await?;
    Ok(Json(resolution.to_value()))
}
