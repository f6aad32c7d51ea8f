//! Unit tests for API types serialization/deserialization.

// Allow unwrap and panic in tests - these are standard for test code
#![allow(clippy::unwrap_used, clippy::panic)]

use workbench::api::{
    DeleteRequest, DeleteResponse, ExportRequest, HealthResponse, MarkingRequest, RetypeRequest,
    StatusResponse, UpsertResponse,
};
use workbench_core::ObjectId;

// =============================================================================
// HEALTH RESPONSE TESTS
// =============================================================================

#[test]
fn test_health_response_default() {
    let health = HealthResponse::default();
    assert_eq!(health.status, "ok");
    assert!(!health.version.is_empty());
}

#[test]
fn test_health_response_serialization() {
    let health = HealthResponse {
        status: "ok".to_string(),
        version: "0.6.0".to_string(),
    };

    let json = serde_json::to_string(&health).unwrap();
    assert!(json.contains("\"status\":\"ok\""));
    assert!(json.contains("\"version\":\"0.6.0\""));
}

// =============================================================================
// STATUS RESPONSE TESTS
// =============================================================================

#[test]
fn test_status_response_serialization() {
    let status = StatusResponse {
        domain_objects: 4,
        observables: 3,
        relationships: 2,
        containers: 1,
        total: 10,
    };

    let json = serde_json::to_string(&status).unwrap();
    assert!(json.contains("\"domain_objects\":4"));
    assert!(json.contains("\"observables\":3"));
    assert!(json.contains("\"relationships\":2"));
    assert!(json.contains("\"containers\":1"));
    assert!(json.contains("\"total\":10"));
}

// =============================================================================
// UPSERT RESPONSE TESTS
// =============================================================================

#[test]
fn test_upsert_response_success() {
    let response = UpsertResponse::success(ObjectId::new("threat-actor--a1"));
    assert!(response.success);
    assert_eq!(response.id.unwrap().as_str(), "threat-actor--a1");
    assert!(response.error.is_none());
}

#[test]
fn test_upsert_response_error() {
    let response = UpsertResponse::error("missing fields");
    assert!(!response.success);
    assert!(response.id.is_none());
    assert_eq!(response.error.as_deref(), Some("missing fields"));
}

// =============================================================================
// REQUEST DESERIALIZATION TESTS
// =============================================================================

#[test]
fn test_delete_request_deserialization() {
    let json = r#"{"ids": ["threat-actor--a1", "report--c1"]}"#;
    let request: DeleteRequest = serde_json::from_str(json).unwrap();

    assert_eq!(request.ids.len(), 2);
    assert_eq!(request.ids[0].as_str(), "threat-actor--a1");
}

#[test]
fn test_retype_request_deserialization() {
    let json = r#"{"id": "ipv4-addr--o1", "new_type": "Domain-Name"}"#;
    let request: RetypeRequest = serde_json::from_str(json).unwrap();

    assert_eq!(request.id.as_str(), "ipv4-addr--o1");
    assert_eq!(request.new_type, "Domain-Name");
}

#[test]
fn test_marking_request_deserialization() {
    let json = r#"{
        "markings": [{"id": "marking-definition--m1", "definition": "TLP:RED"}],
        "target_ids": ["malware--e2"]
    }"#;
    let request: MarkingRequest = serde_json::from_str(json).unwrap();

    assert_eq!(request.markings.len(), 1);
    assert_eq!(request.markings[0].definition, "TLP:RED");
    assert_eq!(request.target_ids.len(), 1);
}

#[test]
fn test_marking_request_without_marking_ids() {
    // Markings picked from a form may not exist yet: no id supplied.
    let json = r#"{"markings": [{"definition": "TLP:GREEN"}], "target_ids": []}"#;
    let request: MarkingRequest = serde_json::from_str(json).unwrap();

    assert!(request.markings[0].id.is_none());
}

#[test]
fn test_export_request_empty_body_defaults() {
    let request: ExportRequest = serde_json::from_str("{}").unwrap();
    assert!(request.connected_id.is_none());
}

// =============================================================================
// DELETE RESPONSE TESTS
// =============================================================================

#[test]
fn test_delete_response_roundtrip() {
    let response = DeleteResponse {
        success: true,
        removed: 3,
        remaining: 7,
    };

    let json = serde_json::to_string(&response).unwrap();
    let parsed: DeleteResponse = serde_json::from_str(&json).unwrap();

    assert!(parsed.success);
    assert_eq!(parsed.removed, 3);
    assert_eq!(parsed.remaining, 7);
}
