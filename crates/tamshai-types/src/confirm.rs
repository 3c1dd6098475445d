use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::identity::CallerIdentity;
use crate::time::Timestamp;

/// Descriptor a domain server attaches to a write intent.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfirmationData {
    pub action: String,
    #[serde(default, alias = "mcpServer")]
    pub target_server: String,
    #[serde(default)]
    pub user_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<Value>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Stored form of a deferred write action, keyed by `confirmation_id`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PendingConfirmation {
    pub confirmation_id: String,
    pub user_id: String,
    pub action: String,
    pub target_server: String,
    #[serde(default)]
    pub payload: Value,
    pub created_at: Timestamp,
}

impl PendingConfirmation {
    /// Builds the record for `owner`. The target is the server that actually
    /// answered, not whatever the descriptor claims.
    pub fn from_descriptor(
        confirmation_id: impl Into<String>,
        data: &ConfirmationData,
        owner: &CallerIdentity,
        target_server: impl Into<String>,
    ) -> Self {
        Self {
            confirmation_id: confirmation_id.into(),
            user_id: owner.user_id.clone(),
            action: data.action.clone(),
            target_server: target_server.into(),
            payload: Value::Object(data.extra.clone()),
            created_at: Timestamp::now(),
        }
    }

    pub fn is_owned_by(&self, caller: &CallerIdentity) -> bool {
        self.user_id == caller.user_id
    }
}
