use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::envelope::ResponseEnvelope;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QueryStatus {
    Success,
    Timeout,
    Error,
}

impl QueryStatus {
    pub const fn as_str(self) -> &'static str {
        match self {
            QueryStatus::Success => "success",
            QueryStatus::Timeout => "timeout",
            QueryStatus::Error => "error",
        }
    }
}

/// Result of one logical query against one domain server.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueryOutcome {
    pub server: String,
    pub status: QueryStatus,
    #[serde(default)]
    pub data: Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub duration_ms: u64,
}

impl QueryOutcome {
    pub fn success(server: impl Into<String>, data: Value, duration_ms: u64) -> Self {
        Self {
            server: server.into(),
            status: QueryStatus::Success,
            data,
            error: None,
            duration_ms,
        }
    }

    pub fn timeout(server: impl Into<String>, error: impl Into<String>, duration_ms: u64) -> Self {
        Self {
            server: server.into(),
            status: QueryStatus::Timeout,
            data: Value::Null,
            error: Some(error.into()),
            duration_ms,
        }
    }

    pub fn error(server: impl Into<String>, error: impl Into<String>, duration_ms: u64) -> Self {
        Self {
            server: server.into(),
            status: QueryStatus::Error,
            data: Value::Null,
            error: Some(error.into()),
            duration_ms,
        }
    }

    pub fn is_success(&self) -> bool {
        self.status == QueryStatus::Success
    }

    pub fn envelope(&self) -> Option<ResponseEnvelope> {
        ResponseEnvelope::from_value(&self.data)
    }
}
