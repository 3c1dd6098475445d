use serde::Serialize;
use serde_json::Value;

use crate::code::{codes, ErrorCode};
use crate::kind::ErrorKind;
use crate::retry::RetryClass;

/// Canonical error carried across crate boundaries.
///
/// `message_user` and `suggested_action` are safe to show to the calling
/// assistant; `message_dev` only ever reaches the logs.
#[derive(Clone, Debug)]
pub struct ErrorObj {
    pub code: ErrorCode,
    pub message_user: String,
    pub message_dev: Option<String>,
    pub suggested_action: Option<String>,
    pub details: Option<Value>,
}

impl ErrorObj {
    pub fn kind(&self) -> ErrorKind {
        self.code.kind
    }

    pub fn http_status(&self) -> u16 {
        self.code.http_status
    }

    pub fn retry_class(&self) -> RetryClass {
        self.code.kind.retry_class()
    }

    pub fn to_public(&self) -> PublicErrorView {
        PublicErrorView {
            status: "error",
            code: self.code.id,
            message: self.message_user.clone(),
            suggested_action: self.suggested_action.clone(),
            details: self.details.clone(),
        }
    }
}

impl std::fmt::Display for ErrorObj {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.message_dev {
            Some(dev) => write!(f, "{}: {} ({dev})", self.code, self.message_user),
            None => write!(f, "{}: {}", self.code, self.message_user),
        }
    }
}

#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PublicErrorView {
    pub status: &'static str,
    pub code: &'static str,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub suggested_action: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<Value>,
}

pub struct ErrorBuilder {
    code: ErrorCode,
    message_user: Option<String>,
    message_dev: Option<String>,
    suggested_action: Option<String>,
    details: Option<Value>,
}

impl ErrorBuilder {
    pub fn new(code: ErrorCode) -> Self {
        Self {
            code,
            message_user: None,
            message_dev: None,
            suggested_action: None,
            details: None,
        }
    }

    pub fn user_msg(mut self, msg: impl Into<String>) -> Self {
        self.message_user = Some(msg.into());
        self
    }

    pub fn dev_msg(mut self, msg: impl Into<String>) -> Self {
        self.message_dev = Some(msg.into());
        self
    }

    pub fn suggested_action(mut self, action: impl Into<String>) -> Self {
        self.suggested_action = Some(action.into());
        self
    }

    pub fn details(mut self, details: Value) -> Self {
        self.details = Some(details);
        self
    }

    pub fn build(self) -> ErrorObj {
        let message_user = self
            .message_user
            .unwrap_or_else(|| default_user_message(&self.code).to_string());
        ErrorObj {
            code: self.code,
            message_user,
            message_dev: self.message_dev,
            suggested_action: self.suggested_action,
            details: self.details,
        }
    }
}

fn default_user_message(code: &ErrorCode) -> &'static str {
    match code.kind {
        ErrorKind::Validation => "The request is invalid.",
        ErrorKind::Authentication => "Authentication is required.",
        ErrorKind::Authorization => "You do not have access to this resource.",
        ErrorKind::NotFound => "The requested resource was not found.",
        ErrorKind::Timeout => "The upstream service did not respond in time.",
        ErrorKind::Backend => "The upstream service returned an error.",
        ErrorKind::Unavailable => "The service is temporarily unavailable.",
        ErrorKind::Integrity | ErrorKind::Internal => "An internal error occurred.",
    }
}

impl From<ErrorCode> for ErrorObj {
    fn from(code: ErrorCode) -> Self {
        ErrorBuilder::new(code).build()
    }
}

impl Default for ErrorObj {
    fn default() -> Self {
        codes::INTERNAL_ERROR.into()
    }
}
