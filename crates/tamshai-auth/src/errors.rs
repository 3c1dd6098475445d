use serde_json::json;
use tamshai_errors::prelude::*;
use thiserror::Error;

#[derive(Debug, Error)]
#[error("{0}")]
pub struct AuthError(pub Box<ErrorObj>);

impl AuthError {
    pub fn into_inner(self) -> ErrorObj {
        *self.0
    }

    pub fn unauthenticated(detail: &str) -> Self {
        AuthError(Box::new(
            ErrorBuilder::new(codes::UNAUTHENTICATED)
                .user_msg("Caller identity is missing.")
                .dev_msg(detail)
                .suggested_action("Sign in again; the request did not carry an authenticated user.")
                .build(),
        ))
    }

    pub fn server_not_found(name: &str, known: &[&str]) -> Self {
        AuthError(Box::new(
            ErrorBuilder::new(codes::SERVER_NOT_FOUND)
                .user_msg(format!("MCP server '{name}' does not exist."))
                .suggested_action(format!("Use one of: {}", known.join(", ")))
                .details(json!({ "availableServers": known }))
                .build(),
        ))
    }

    pub fn access_denied(name: &str, required: &[String]) -> Self {
        AuthError(Box::new(
            ErrorBuilder::new(codes::ACCESS_DENIED)
                .user_msg(format!("You do not have access to the '{name}' data source."))
                .suggested_action(format!(
                    "Ask an administrator for one of these roles: {}",
                    required.join(", ")
                ))
                .details(json!({ "requiredRoles": required }))
                .build(),
        ))
    }

    pub fn config(detail: &str) -> Self {
        AuthError(Box::new(
            ErrorBuilder::new(codes::INTERNAL_ERROR)
                .user_msg("Server registry configuration is invalid.")
                .dev_msg(detail)
                .build(),
        ))
    }
}

impl From<AuthError> for ErrorObj {
    fn from(err: AuthError) -> Self {
        err.into_inner()
    }
}
