use serde_json::Value;
use tamshai_types::prelude::{CallerIdentity, CorrelationId, PendingConfirmation, ResponseEnvelope};
use tracing::{info, warn};

use crate::errors::ApiError;
use crate::orchestrator::PendingIntent;
use crate::state::AppState;

/// Stores the intent for the caller and returns the envelope to surface.
/// The record's target is the server that produced the intent.
pub async fn register_pending(
    state: &AppState,
    caller: &CallerIdentity,
    intent: &PendingIntent,
    request_id: &str,
) -> Result<Value, ApiError> {
    let confirmation_id = if intent.confirmation_id.trim().is_empty() {
        CorrelationId::new_random().0
    } else {
        intent.confirmation_id.clone()
    };
    let record =
        PendingConfirmation::from_descriptor(&confirmation_id, &intent.data, caller, &intent.server);
    state
        .confirmations
        .put(&record)
        .await
        .map_err(|err| ApiError::from_store(err, request_id))?;
    info!(
        target: "tamshai::confirm",
        user_id = %caller.user_id,
        server = %intent.server,
        action = %record.action,
        "pending confirmation registered"
    );

    let mut data = intent.data.clone();
    data.user_id = caller.user_id.clone();
    Ok(
        ResponseEnvelope::pending_confirmation(confirmation_id, intent.message.clone(), data)
            .to_value(),
    )
}

#[derive(Debug, PartialEq)]
pub enum Resolution {
    Cancelled,
    Executed(Value),
}

impl Resolution {
    pub fn to_value(&self) -> Value {
        match self {
            Resolution::Cancelled => serde_json::json!({ "status": "cancelled" }),
            Resolution::Executed(result) => serde_json::json!({ "status": "success", "result": result }),
        }
    }
}

/// Resolves a pending action. Ownership is checked before the record is
/// consumed, so a stranger cannot burn someone else's confirmation.
pub async fn resolve(
    state: &AppState,
    confirmation_id: &str,
    approved: bool,
    caller: &CallerIdentity,
    request_id: &str,
) -> Result<Resolution, ApiError> {
    let record = state
        .confirmations
        .get(confirmation_id)
        .await
        .map_err(|err| ApiError::from_store(err, request_id))?
        .ok_or_else(|| ApiError::confirmation_not_found(confirmation_id))?;
    if !record.is_owned_by(caller) {
        warn!(
            target: "tamshai::confirm",
            user_id = %caller.user_id,
            owner = %record.user_id,
            "confirmation resolved by a different user"
        );
        return Err(ApiError::confirmation_forbidden());
    }

    let record = state
        .confirmations
        .take(confirmation_id)
        .await
        .map_err(|err| ApiError::from_store(err, request_id))?
        .ok_or_else(|| ApiError::confirmation_not_found(confirmation_id))?;

    if !approved {
        info!(target: "tamshai::confirm", user_id = %caller.user_id, action = %record.action, "confirmation rejected");
        return Ok(Resolution::Cancelled);
    }

    let server = state.registry.get(&record.target_server).ok_or_else(|| {
        ApiError::integrity(&format!(
            "confirmation {confirmation_id} targets unknown server '{}'",
            record.target_server
        ))
    })?;
    let result = state
        .client
        .execute(server, caller, &record.action, &record.payload)
        .await?;
    info!(
        target: "tamshai::confirm",
        user_id = %caller.user_id,
        server = %server.name,
        action = %record.action,
        "confirmed action executed"
    );
    Ok(Resolution::Executed(result))
}
