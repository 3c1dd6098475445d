use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use tamshai_auth::AuthError;
use tamshai_cache::CacheError;
use tamshai_errors::prelude::*;
use tamshai_llm::LlmError;
use tamshai_net::NetError;
use tracing::{error, warn};

/// Error leaving an HTTP handler. Renders the public error envelope with the
/// status carried by the error code.
#[derive(Debug)]
pub struct ApiError(pub Box<ErrorObj>);

impl ApiError {
    pub fn new(obj: ErrorObj) -> Self {
        ApiError(Box::new(obj))
    }

    pub fn invalid_request(message: &str) -> Self {
        Self::new(
            ErrorBuilder::new(codes::INVALID_REQUEST)
                .user_msg(message)
                .suggested_action("Fix the request body and try again.")
                .build(),
        )
    }

    pub fn invalid_tool_name(tool: &str) -> Self {
        Self::new(
            ErrorBuilder::new(codes::INVALID_TOOL_NAME)
                .user_msg(format!("'{tool}' is not a valid tool name."))
                .suggested_action(
                    "Tool names start with a letter and contain only letters, digits, '_' or '-' (max 64).",
                )
                .build(),
        )
    }

    pub fn confirmation_not_found(confirmation_id: &str) -> Self {
        Self::new(
            ErrorBuilder::new(codes::CONFIRMATION_NOT_FOUND)
                .user_msg("Confirmation not found or expired.")
                .dev_msg(format!("no pending action under {confirmation_id}"))
                .suggested_action("Repeat the original request to get a new confirmation.")
                .build(),
        )
    }

    pub fn confirmation_forbidden() -> Self {
        Self::new(
            ErrorBuilder::new(codes::ACCESS_DENIED)
                .user_msg("This confirmation belongs to a different user.")
                .suggested_action("Only the user who started the action can approve or reject it.")
                .build(),
        )
    }

    pub fn integrity(detail: &str) -> Self {
        Self::new(
            ErrorBuilder::new(codes::INTEGRITY_VIOLATION)
                .user_msg("Invalid MCP server in pending action")
                .dev_msg(detail)
                .build(),
        )
    }

    pub fn internal(detail: &str, correlation_id: &str) -> Self {
        Self::new(
            ErrorBuilder::new(codes::INTERNAL_ERROR)
                .user_msg("An unexpected error occurred.")
                .dev_msg(detail)
                .suggested_action(format!("Quote request id {correlation_id} when reporting this."))
                .details(serde_json::json!({ "requestId": correlation_id }))
                .build(),
        )
    }

    /// Store failures keep their own code, except records the store cannot
    /// decode, which surface as an internal error tied to `request_id`.
    pub fn from_store(err: CacheError, request_id: &str) -> Self {
        let obj = err.into_inner();
        if obj.kind() == ErrorKind::Internal {
            let detail = obj.message_dev.as_deref().unwrap_or(&obj.message_user);
            return Self::internal(detail, request_id);
        }
        Self::new(obj)
    }

    pub fn status(&self) -> StatusCode {
        StatusCode::from_u16(self.0.http_status()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR)
    }
}

impl std::fmt::Display for ApiError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        match self.0.kind() {
            ErrorKind::Integrity => warn!(target: "tamshai::gateway", code = %self.0.code, "integrity anomaly: {}", self.0),
            ErrorKind::Internal => error!(target: "tamshai::gateway", code = %self.0.code, "internal error: {}", self.0),
            _ => {}
        }
        (status, Json(self.0.to_public())).into_response()
    }
}

macro_rules! impl_from_crate_error {
    ($($ty:ty),*) => {
        $(impl From<$ty> for ApiError {
            fn from(err: $ty) -> Self {
                ApiError::new(err.into_inner())
            }
        })*
    };
}

impl_from_crate_error!(AuthError, CacheError, LlmError, NetError);
