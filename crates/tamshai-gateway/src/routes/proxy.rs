use axum::{
    body::Bytes,
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use once_cell::sync::Lazy;
use regex::Regex;
use tamshai_auth::prelude::authorize;
use tamshai_net::prelude::{ToolCall, ToolMethod};
use tamshai_types::prelude::{CallerIdentity, ResponseEnvelope};
use tracing::debug;

use crate::confirm::register_pending;
use crate::errors::ApiError;
use crate::middleware::{Caller, RequestId};
use crate::orchestrator::PendingIntent;
use crate::routes::parse_body;
use crate::state::AppState;

static TOOL_NAME: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[A-Za-z][A-Za-z0-9_-]{0,63}$").expect("tool name regex must compile")
});

pub fn is_valid_tool_name(tool: &str) -> bool {
    TOOL_NAME.is_match(tool)
}

pub async fn proxy_get(
    State(state): State<AppState>,
    RequestId(request_id): RequestId,
    Caller(caller): Caller,
    Path((server_name, tool_name)): Path<(String, String)>,
    Query(params): Query<Vec<(String, String)>>,
) -> Result<Response, ApiError> {
    let call = ToolCall::get(tool_name, params);
    forward(&state, &caller, &server_name, call, &request_id).await
}

pub async fn proxy_post(
    State(state): State<AppState>,
    RequestId(request_id): RequestId,
    Caller(caller): Caller,
    Path((server_name, tool_name)): Path<(String, String)>,
    body: Bytes,
) -> Result<Response, ApiError> {
    let body = parse_body(&body)?;
    let call = ToolCall::post(tool_name, body);
    forward(&state, &caller, &server_name, call, &request_id).await
}

/// Single-target call: errors propagate as the response instead of being
/// folded into warnings. Only POST replies can open a pending confirmation;
/// a GET reply is relayed as is.
async fn forward(
    state: &AppState,
    caller: &CallerIdentity,
    server_name: &str,
    call: ToolCall,
    request_id: &str,
) -> Result<Response, ApiError> {
    if !is_valid_tool_name(&call.tool) {
        return Err(ApiError::invalid_tool_name(&call.tool));
    }
    let server = authorize(caller, server_name, &state.registry)?;
    let tool = call.tool.clone();
    let is_write = matches!(call.method, ToolMethod::Post(_));
    let reply = state.client.call_tool(server, caller, call).await?;
    debug!(target: "tamshai::proxy", server = %server.name, tool = %tool, status = reply.status, "tool relayed");

    let mut body = reply.body;
    if is_write && (200..300).contains(&reply.status) {
        if let Some(ResponseEnvelope::PendingConfirmation {
            confirmation_id,
            message,
            confirmation_data,
        }) = ResponseEnvelope::from_value(&body)
        {
            let intent = PendingIntent {
                server: server.name.clone(),
                confirmation_id,
                message,
                data: confirmation_data,
            };
            body = register_pending(state, caller, &intent, request_id).await?;
        }
    }
    let status = StatusCode::from_u16(reply.status).unwrap_or(StatusCode::BAD_GATEWAY);
    Ok((status, Json(body)).into_response())
}

#[cfg(test)]
mod tests {
    use serde_json::json;
    use tamshai_errors::prelude::codes;
    use tamshai_net::prelude::ToolResponse;

    use super::*;
    use crate::testing::{alice, TestHarness};

    #[test]
    fn tool_names_are_restricted() {
        let too_long = "a".repeat(65);
        let longest = "a".repeat(64);
        for bad in ["../etc/passwd", "1bad", "bad name", "bad$name", "", too_long.as_str()] {
            assert!(!is_valid_tool_name(bad), "{bad} accepted");
        }
        for good in ["list_employees", "get-employee", "A", longest.as_str()] {
            assert!(is_valid_tool_name(good), "{good} rejected");
        }
    }

    #[tokio::test]
    async fn invalid_tool_is_rejected_before_lookup() {
        let harness = TestHarness::new();
        let err = forward(&harness.state, &alice(), "nowhere", ToolCall::get("bad$name", vec![]), "req-t")
            .await
            .unwrap_err();
        assert_eq!(err.0.code, codes::INVALID_TOOL_NAME);
        assert!(harness.client.tool_calls().is_empty());
    }

    #[tokio::test]
    async fn unknown_server_then_role_check() {
        let harness = TestHarness::new();
        let err = forward(&harness.state, &alice(), "nowhere", ToolCall::get("list", vec![]), "req-t")
            .await
            .unwrap_err();
        assert_eq!(err.0.code, codes::SERVER_NOT_FOUND);

        let err = forward(&harness.state, &alice(), "finance", ToolCall::get("list", vec![]), "req-t")
            .await
            .unwrap_err();
        assert_eq!(err.0.code, codes::ACCESS_DENIED);
        assert!(harness.client.tool_calls().is_empty());
    }

    #[tokio::test]
    async fn upstream_status_and_body_are_relayed() {
        let harness = TestHarness::new();
        *harness.client.tool_reply.lock().unwrap() = Some(Ok(ToolResponse {
            status: 404,
            body: json!({"status": "error", "code": "NOT_FOUND", "message": "no such employee"}),
        }));
        let response = forward(&harness.state, &alice(), "hr", ToolCall::get("get_employee", vec![("id".into(), "9".into())]), "req-t")
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        let calls = harness.client.tool_calls();
        assert_eq!(calls[0].0, "hr");
        assert_eq!(calls[0].1.method, ToolMethod::Get(vec![("id".into(), "9".into())]));
    }

    #[tokio::test]
    async fn transport_failure_is_service_unavailable() {
        let harness = TestHarness::new();
        *harness.client.tool_reply.lock().unwrap() = Some(Err(()));
        let err = forward(&harness.state, &alice(), "hr", ToolCall::get("list", vec![]), "req-t")
            .await
            .unwrap_err();
        assert_eq!(err.status(), StatusCode::SERVICE_UNAVAILABLE);
    }

    #[tokio::test]
    async fn pending_write_is_registered_for_the_caller() {
        let harness = TestHarness::new();
        *harness.client.tool_reply.lock().unwrap() = Some(Ok(ToolResponse {
            status: 200,
            body: json!({
                "status": "pending_confirmation",
                "confirmationId": "conf-p",
                "message": "Delete?",
                "confirmationData": {"action": "delete_employee", "targetServer": "hr", "employeeId": "e1"}
            }),
        }));
        let response = forward(&harness.state, &alice(), "hr", ToolCall::post("delete_employee", json!({"employeeId": "e1"})), "req-t")
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let record = harness.state.confirmations.get("conf-p").await.unwrap().unwrap();
        assert_eq!(record.user_id, alice().user_id);
        assert_eq!(record.payload, json!({"employeeId": "e1"}));
    }

    #[tokio::test]
    async fn pending_body_on_get_is_relayed_unregistered() {
        let harness = TestHarness::new();
        *harness.client.tool_reply.lock().unwrap() = Some(Ok(ToolResponse {
            status: 200,
            body: json!({
                "status": "pending_confirmation",
                "confirmationId": "conf-g",
                "message": "Delete?",
                "confirmationData": {"action": "delete_employee", "employeeId": "e1"}
            }),
        }));
        let response = forward(&harness.state, &alice(), "hr", ToolCall::get("delete_employee", vec![]), "req-t")
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert!(harness.state.confirmations.get("conf-g").await.unwrap().is_none());
    }
}
