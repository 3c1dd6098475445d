use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::confirm::ConfirmationData;

/// Discriminated response returned by domain servers and by the gateway's
/// single-target paths. The `status` field carries the variant tag.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case", rename_all_fields = "camelCase")]
pub enum ResponseEnvelope {
    Success {
        #[serde(default)]
        data: Value,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        metadata: Option<ResponseMetadata>,
    },
    Error {
        code: String,
        message: String,
        #[serde(default)]
        suggested_action: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        details: Option<Value>,
    },
    PendingConfirmation {
        confirmation_id: String,
        #[serde(default)]
        message: String,
        confirmation_data: ConfirmationData,
    },
}

impl ResponseEnvelope {
    pub fn success(data: Value) -> Self {
        ResponseEnvelope::Success {
            data,
            metadata: None,
        }
    }

    pub fn paginated(data: Value, metadata: PaginationMetadata) -> Self {
        ResponseEnvelope::Success {
            data,
            metadata: Some(ResponseMetadata::Pagination(metadata)),
        }
    }

    pub fn error(
        code: impl Into<String>,
        message: impl Into<String>,
        suggested_action: impl Into<String>,
    ) -> Self {
        ResponseEnvelope::Error {
            code: code.into(),
            message: message.into(),
            suggested_action: suggested_action.into(),
            details: None,
        }
    }

    pub fn pending_confirmation(
        confirmation_id: impl Into<String>,
        message: impl Into<String>,
        confirmation_data: ConfirmationData,
    ) -> Self {
        ResponseEnvelope::PendingConfirmation {
            confirmation_id: confirmation_id.into(),
            message: message.into(),
            confirmation_data,
        }
    }

    /// Narrows an arbitrary upstream JSON body. Returns `None` when the body
    /// does not carry a recognised `status` discriminant.
    pub fn from_value(value: &Value) -> Option<Self> {
        value.get("status")?.as_str()?;
        serde_json::from_value(value.clone()).ok()
    }

    pub fn is_success(&self) -> bool {
        matches!(self, ResponseEnvelope::Success { .. })
    }

    pub fn is_error(&self) -> bool {
        matches!(self, ResponseEnvelope::Error { .. })
    }

    pub fn is_pending_confirmation(&self) -> bool {
        matches!(self, ResponseEnvelope::PendingConfirmation { .. })
    }

    pub fn pagination(&self) -> Option<&PaginationMetadata> {
        match self {
            ResponseEnvelope::Success {
                metadata: Some(ResponseMetadata::Pagination(meta)),
                ..
            } => Some(meta),
            _ => None,
        }
    }

    pub fn truncation(&self) -> Option<&TruncationMetadata> {
        match self {
            ResponseEnvelope::Success {
                metadata: Some(ResponseMetadata::Truncation(meta)),
                ..
            } => Some(meta),
            _ => None,
        }
    }

    pub fn to_value(&self) -> Value {
        serde_json::to_value(self).unwrap_or(Value::Null)
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ResponseMetadata {
    Pagination(PaginationMetadata),
    Truncation(TruncationMetadata),
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaginationMetadata {
    pub has_more: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub next_cursor: Option<String>,
    #[serde(default)]
    pub returned_count: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total_estimate: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hint: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pages_retrieved: Option<u32>,
}

impl PaginationMetadata {
    /// Cursor for the next page. `hasMore` without a cursor ends pagination.
    pub fn next_page(&self) -> Option<&str> {
        if self.has_more {
            self.next_cursor.as_deref().filter(|c| !c.is_empty())
        } else {
            None
        }
    }
}

/// Older domain servers cap results and flag it instead of paginating.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TruncationMetadata {
    pub truncated: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total_count: Option<Value>,
    #[serde(default)]
    pub returned_count: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub warning: Option<String>,
}
