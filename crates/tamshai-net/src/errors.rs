use serde_json::{json, Value};
use tamshai_errors::prelude::*;
use thiserror::Error;

#[derive(Debug, Error)]
#[error("{0}")]
pub struct NetError(pub Box<ErrorObj>);

impl NetError {
    pub fn into_inner(self) -> ErrorObj {
        *self.0
    }

    pub fn is_timeout(&self) -> bool {
        self.0.kind() == ErrorKind::Timeout
    }

    pub fn timeout(server: &str, after_ms: u64) -> Self {
        NetError(Box::new(
            ErrorBuilder::new(codes::UPSTREAM_TIMEOUT)
                .user_msg(format!("The '{server}' data source did not respond in time."))
                .dev_msg(format!("no response from {server} within {after_ms}ms"))
                .suggested_action("Retry shortly, or narrow the query so it completes faster.")
                .build(),
        ))
    }

    pub fn unavailable(server: &str, detail: &str) -> Self {
        NetError(Box::new(
            ErrorBuilder::new(codes::SERVICE_UNAVAILABLE)
                .user_msg(format!("The '{server}' data source is unavailable."))
                .dev_msg(detail)
                .suggested_action("Try again later; the service may be restarting.")
                .build(),
        ))
    }

    pub fn upstream(server: &str, detail: &str) -> Self {
        NetError(Box::new(
            ErrorBuilder::new(codes::UPSTREAM_ERROR)
                .user_msg(format!("The '{server}' data source returned an error."))
                .dev_msg(detail)
                .build(),
        ))
    }

    pub fn upstream_status(server: &str, status: u16, body: Value) -> Self {
        NetError(Box::new(
            ErrorBuilder::new(codes::UPSTREAM_ERROR)
                .user_msg(format!("The '{server}' data source returned an error."))
                .dev_msg(format!("{server} answered with status {status}"))
                .details(json!({ "upstreamStatus": status, "body": body }))
                .build(),
        ))
    }

    pub fn schema(detail: &str) -> Self {
        NetError(Box::new(
            ErrorBuilder::new(codes::INTERNAL_ERROR)
                .user_msg("Outbound request could not be built.")
                .dev_msg(detail)
                .build(),
        ))
    }
}

impl From<NetError> for ErrorObj {
    fn from(err: NetError) -> Self {
        err.into_inner()
    }
}
