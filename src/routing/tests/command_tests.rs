//! Tests for processing commands

use crate::routing::api::*;
use chrono::NaiveDate;
use std::collections::BTreeMap;

fn validation_payload() -> CommandPayload {
    let mut data = BTreeMap::new();
    data.insert("threshold".to_string(), serde_json::json!(0.95));
    CommandPayload::Validation {
        rule_set: "PriceValidation".to_string(),
        validation_data: data,
        severity: ValidationSeverity::Warning,
    }
}

#[test]
fn test_new_command_matches_context() {
    let context = RoutingContext::new("FirmA", "Client7", ProcessType::Validation).unwrap();
    let command = ProcessingCommand::new(context.clone(), validation_payload())
        .unwrap()
        .with_metadata("producer", "unit-test");

    assert_eq!(command.context(), &context);
    assert_eq!(command.process_type(), ProcessType::Validation);
    assert_eq!(command.message_type(), "ValidationCommand");
    assert_eq!(command.metadata()["producer"], "unit-test");
}

#[test]
fn test_payload_context_mismatch_is_invalid_context() {
    let context =
        RoutingContext::new("FirmA", "Client7", ProcessType::SecurityAggregation).unwrap();
    let result = ProcessingCommand::new(context, validation_payload());

    assert!(matches!(result, Err(RoutingError::InvalidContext { .. })));
}

#[test]
fn test_commands_get_distinct_ids() {
    let context = RoutingContext::new("f", "c", ProcessType::Validation).unwrap();
    let a = ProcessingCommand::new(context.clone(), validation_payload()).unwrap();
    let b = ProcessingCommand::new(context, validation_payload()).unwrap();

    assert_ne!(a.command_id(), b.command_id());
}

#[test]
fn test_decode_preserves_command() {
    let context = RoutingContext::new("FirmB", "Client2", ProcessType::SecurityAggregation)
        .unwrap()
        .with_subscope("EquityUniverse1")
        .unwrap();
    let payload = CommandPayload::SecurityAggregation {
        security_id: "AAPL".to_string(),
        processing_date: NaiveDate::from_ymd_opt(2025, 10, 1).unwrap(),
        security_groups: vec!["Group1".to_string()],
    };
    let command = ProcessingCommand::new(context, payload).unwrap();

    let body = serde_json::to_vec(&command).unwrap();
    let decoded = ProcessingCommand::from_slice(&body).unwrap();

    assert_eq!(decoded, command);
}

#[test]
fn test_decode_rejects_mismatched_body() {
    let body = serde_json::json!({
        "command_id": "7d7bd8a4-3c0f-4f6f-a2bb-2d4c7b0f0c11",
        "context": {"firm": "f", "client": "c", "process_type": "securitymapping"},
        "created_at": "2025-10-01T00:00:00Z",
        "payload": {
            "command_type": "validation",
            "rule_set": "r",
            "validation_data": {}
        }
    });
    let bytes = serde_json::to_vec(&body).unwrap();

    assert!(matches!(
        ProcessingCommand::from_slice(&bytes),
        Err(RoutingError::InvalidContext { .. })
    ));
    assert!(ProcessingCommand::from_slice(b"not json").is_err());
}

#[test]
fn test_validation_severity_defaults_to_error() {
    assert_eq!(ValidationSeverity::default(), ValidationSeverity::Error);
}
