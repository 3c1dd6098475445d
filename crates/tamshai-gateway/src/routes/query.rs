use axum::{body::Bytes, extract::State, Json};

use crate::errors::ApiError;
use crate::middleware::{Caller, RequestId};
use crate::orchestrator::{orchestrate, AiQueryResponse, QueryInput};
use crate::routes::parse_body;
use crate::state::AppState;

pub async fn ai_query(
    State(state): State<AppState>,
    RequestId(request_id): RequestId,
    Caller(caller): Caller,
    body: Bytes,
) -> Result<Json<AiQueryResponse>, ApiError> {
    let input = QueryInput::from_body(&parse_body(&body)?)?;
    let response = orchestrate(&state, &caller, input, &request_id).await?;
    Ok(Json(response))
}
