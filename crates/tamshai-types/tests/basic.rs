use serde_json::json;
use tamshai_types::prelude::*;

#[test]
fn pending_confirmation_descriptor_becomes_owned_record() {
    let raw = json!({
        "status": "pending_confirmation",
        "confirmationId": "conf-123",
        "message": "Delete employee Marcus Johnson?",
        "confirmationData": {
            "action": "delete_employee",
            "mcpServer": "hr",
            "userId": "someone-else",
            "timestamp": 1_726_000_000_000_i64,
            "employeeId": "emp-42"
        }
    });

    let envelope = ResponseEnvelope::from_value(&raw).expect("envelope");
    let ResponseEnvelope::PendingConfirmation {
        confirmation_id,
        confirmation_data,
        ..
    } = envelope
    else {
        panic!("expected pending confirmation");
    };
    assert_eq!(confirmation_data.target_server, "hr");
    assert_eq!(confirmation_data.extra["employeeId"], "emp-42");

    let caller = CallerIdentity::new("u-1", "alice.chen").with_roles(["hr-write"]);
    let record =
        PendingConfirmation::from_descriptor(confirmation_id, &confirmation_data, &caller, "hr");
    assert_eq!(record.user_id, "u-1");
    assert_eq!(record.payload["employeeId"], "emp-42");
    assert!(record.is_owned_by(&caller));
    assert!(!record.is_owned_by(&CallerIdentity::new("u-2", "bob")));
}

#[test]
fn descriptor_without_target_is_still_pending() {
    let raw = json!({
        "status": "pending_confirmation",
        "confirmationId": "conf-x",
        "confirmationData": {
            "action": "delete_employee",
            "employeeId": "emp-42"
        }
    });

    let envelope = ResponseEnvelope::from_value(&raw).expect("envelope");
    assert!(envelope.is_pending_confirmation());
    let ResponseEnvelope::PendingConfirmation {
        confirmation_data, ..
    } = envelope
    else {
        panic!("expected pending confirmation");
    };
    assert_eq!(confirmation_data.target_server, "");

    let caller = CallerIdentity::new("u-1", "alice.chen");
    let record = PendingConfirmation::from_descriptor("conf-x", &confirmation_data, &caller, "hr");
    assert_eq!(record.target_server, "hr");
}

#[test]
fn outcome_exposes_upstream_envelope() {
    let outcome = QueryOutcome::success("hr", json!({"status": "success", "data": [1]}), 12);
    assert!(outcome.is_success());
    assert!(outcome.envelope().expect("envelope").is_success());

    let failed = QueryOutcome::timeout("finance", "timed out after 5000ms", 5001);
    assert_eq!(failed.status.as_str(), "timeout");
    assert!(failed.envelope().is_none());
}
