//! Integration tests for the Workbench HTTP API.
//!
//! Uses axum-test to test the API handlers without starting a real server.

// Allow unwrap and panic in tests - these are standard for test code
// Allow holding MutexGuard across await in auth tests - tests are serialized
// intentionally to avoid env var conflicts
#![allow(clippy::unwrap_used, clippy::panic, clippy::await_holding_lock)]

use axum_test::TestServer;
use serde_json::json;
use std::sync::Mutex;
use workbench::api::{
    AppState, ContextResponse, DeleteResponse, ExportResponse, HealthResponse, LoadResponse,
    MarkingResponse, RetypeResponse, StatusResponse, UpsertResponse, create_router,
};
use workbench_core::{Bundle, BundleDocument, ObjectId, RawObject, TypeSchema};

/// Mutex to serialize auth tests since they modify env vars.
static AUTH_TEST_MUTEX: Mutex<()> = Mutex::new(());

// =============================================================================
// HELPER FUNCTIONS
// =============================================================================

/// Guard wrapper that holds the mutex and ensures cleanup on drop.
struct TestGuard {
    _guard: std::sync::MutexGuard<'static, ()>,
}

impl Drop for TestGuard {
    fn drop(&mut self) {
        // SAFETY: Tests run sequentially under AUTH_TEST_MUTEX, so no concurrent env access.
        unsafe { std::env::remove_var("WORKBENCH_API_KEY") };
    }
}

/// Create a test server with a fresh empty bundle.
/// Returns a guard that must be kept alive during the test.
fn create_test_server() -> (TestServer, TestGuard) {
    let guard = AUTH_TEST_MUTEX.lock().unwrap_or_else(|e| e.into_inner());
    // SAFETY: Tests run sequentially under AUTH_TEST_MUTEX, so no concurrent env access.
    unsafe { std::env::remove_var("WORKBENCH_API_KEY") };
    let state = AppState::new(Bundle::new(), TypeSchema::builtin());
    let router = create_router(state);
    (
        TestServer::new(router).unwrap(),
        TestGuard { _guard: guard },
    )
}

/// Create a test server pre-populated with a small connected bundle.
/// Returns a guard that must be kept alive during the test.
fn create_populated_test_server() -> (TestServer, TestGuard) {
    let guard = AUTH_TEST_MUTEX.lock().unwrap_or_else(|e| e.into_inner());
    // SAFETY: Tests run sequentially under AUTH_TEST_MUTEX, so no concurrent env access.
    unsafe { std::env::remove_var("WORKBENCH_API_KEY") };

    let mut actor = RawObject::bare(ObjectId::new("threat-actor--e1"), "threat-actor");
    actor.name = Some("APT-Example".to_string());
    let mut malware = RawObject::bare(ObjectId::new("malware--e2"), "malware");
    malware.name = Some("Dropper".to_string());
    let mut address = RawObject::bare(ObjectId::new("ipv4-addr--o1"), "ipv4-addr");
    address.value = Some("198.51.100.7".to_string());
    let mut relationship = RawObject::bare(ObjectId::new("relationship--r1"), "relationship");
    relationship.source_ref = Some(ObjectId::new("threat-actor--e1"));
    relationship.target_ref = Some(ObjectId::new("malware--e2"));
    relationship.relationship_type = Some("uses".to_string());
    let mut report = RawObject::bare(ObjectId::new("report--c1"), "report");
    report.object_refs = Some(vec![
        ObjectId::new("threat-actor--e1"),
        ObjectId::new("relationship--r1"),
    ]);

    let document =
        BundleDocument::envelope(vec![actor, malware, address, relationship, report]);
    let (bundle, skipped) = Bundle::from_document(document, &TypeSchema::builtin());
    assert_eq!(skipped, 0);

    let state = AppState::new(bundle, TypeSchema::builtin());
    let router = create_router(state);
    (
        TestServer::new(router).unwrap(),
        TestGuard { _guard: guard },
    )
}

// =============================================================================
// HEALTH ENDPOINT TESTS
// =============================================================================

#[tokio::test]
async fn test_health_endpoint() {
    let (server, _guard) = create_test_server();

    let response = server.get("/health").await;

    response.assert_status_ok();
    let health: HealthResponse = response.json();
    assert_eq!(health.status, "ok");
    assert_eq!(health.version, env!("CARGO_PKG_VERSION"));
}

// =============================================================================
// STATUS ENDPOINT TESTS
// =============================================================================

#[tokio::test]
async fn test_status_empty_bundle() {
    let (server, _guard) = create_test_server();

    let response = server.get("/status").await;

    response.assert_status_ok();
    let status: StatusResponse = response.json();
    assert_eq!(status.total, 0);
}

#[tokio::test]
async fn test_status_populated_bundle() {
    let (server, _guard) = create_populated_test_server();

    let response = server.get("/status").await;

    let status: StatusResponse = response.json();
    assert_eq!(status.domain_objects, 2);
    assert_eq!(status.observables, 1);
    assert_eq!(status.relationships, 1);
    assert_eq!(status.containers, 1);
    assert_eq!(status.total, 5);
}

// =============================================================================
// UPSERT ENDPOINT TESTS
// =============================================================================

#[tokio::test]
async fn test_upsert_entity_creates_domain_object() {
    let (server, _guard) = create_test_server();

    let response = server
        .post("/objects")
        .json(&json!({
            "type": "threat-actor",
            "name": "APT-Example"
        }))
        .await;

    response.assert_status_ok();
    let upsert: UpsertResponse = response.json();
    assert!(upsert.success);
    assert!(upsert.id.unwrap().as_str().starts_with("threat-actor--"));

    let status: StatusResponse = server.get("/status").await.json();
    assert_eq!(status.domain_objects, 1);
}

#[tokio::test]
async fn test_upsert_entity_twice_collapses() {
    let (server, _guard) = create_test_server();
    let payload = json!({"type": "campaign", "name": "Campaign-1"});

    server.post("/objects").json(&payload).await.assert_status_ok();
    server.post("/objects").json(&payload).await.assert_status_ok();

    let status: StatusResponse = server.get("/status").await.json();
    assert_eq!(status.domain_objects, 1);
}

#[tokio::test]
async fn test_upsert_entity_synthesizes_created_by() {
    let (server, _guard) = create_test_server();

    let response = server
        .post("/objects")
        .json(&json!({
            "type": "indicator",
            "name": "ioc-1",
            "created_by": {"name": "ACME CTI", "role": "Organization"}
        }))
        .await;

    response.assert_status_ok();
    let status: StatusResponse = server.get("/status").await.json();
    // Indicator plus the synthesized identity.
    assert_eq!(status.domain_objects, 2);
}

#[tokio::test]
async fn test_upsert_relationship_requires_fields() {
    let (server, _guard) = create_test_server();

    let response = server
        .post("/relationships")
        .json(&json!({
            "type": "relationship",
            "source_ref": "threat-actor--a"
        }))
        .await;

    response.assert_status_bad_request();
    let upsert: UpsertResponse = response.json();
    assert!(!upsert.success);
}

#[tokio::test]
async fn test_upsert_relationship_success() {
    let (server, _guard) = create_populated_test_server();

    let response = server
        .post("/relationships")
        .json(&json!({
            "type": "relationship",
            "source_ref": "threat-actor--e1",
            "target_ref": "ipv4-addr--o1",
            "relationship_type": "related-to"
        }))
        .await;

    response.assert_status_ok();
    let status: StatusResponse = server.get("/status").await.json();
    assert_eq!(status.relationships, 2);
}

#[tokio::test]
async fn test_upsert_container_with_members() {
    let (server, _guard) = create_populated_test_server();

    let response = server
        .post("/containers")
        .json(&json!({
            "type": "grouping",
            "name": "Cluster",
            "object_refs": ["threat-actor--e1", "malware--e2"]
        }))
        .await;

    response.assert_status_ok();
    let status: StatusResponse = server.get("/status").await.json();
    assert_eq!(status.containers, 2);
}

// =============================================================================
// DELETE ENDPOINT TESTS
// =============================================================================

#[tokio::test]
async fn test_delete_cascades() {
    let (server, _guard) = create_populated_test_server();

    let response = server
        .post("/delete")
        .json(&json!({"ids": ["threat-actor--e1"]}))
        .await;

    response.assert_status_ok();
    let delete: DeleteResponse = response.json();
    assert!(delete.success);
    // The entity and its relationship are both gone.
    assert_eq!(delete.removed, 2);

    let status: StatusResponse = server.get("/status").await.json();
    assert_eq!(status.relationships, 0);
}

#[tokio::test]
async fn test_delete_missing_ids_is_noop() {
    let (server, _guard) = create_populated_test_server();

    let response = server
        .post("/delete")
        .json(&json!({"ids": ["threat-actor--ghost"]}))
        .await;

    let delete: DeleteResponse = response.json();
    assert_eq!(delete.removed, 0);
    assert_eq!(delete.remaining, 5);
}

// =============================================================================
// RETYPE ENDPOINT TESTS
// =============================================================================

#[tokio::test]
async fn test_retype_observable() {
    let (server, _guard) = create_populated_test_server();

    let response = server
        .post("/retype")
        .json(&json!({"id": "ipv4-addr--o1", "new_type": "Domain-Name"}))
        .await;

    response.assert_status_ok();
    let retype: RetypeResponse = response.json();
    assert!(retype.success);
    assert!(
        retype
            .new_id
            .unwrap()
            .as_str()
            .starts_with("domain-name--")
    );
}

#[tokio::test]
async fn test_retype_unknown_id_not_found() {
    let (server, _guard) = create_test_server();

    let response = server
        .post("/retype")
        .json(&json!({"id": "ipv4-addr--ghost", "new_type": "Domain-Name"}))
        .await;

    response.assert_status_not_found();
}

// =============================================================================
// MARKING ENDPOINT TESTS
// =============================================================================

#[tokio::test]
async fn test_markings_applied_to_selection() {
    let (server, _guard) = create_populated_test_server();

    let response = server
        .post("/markings")
        .json(&json!({
            "markings": [{"definition": "TLP:AMBER"}],
            "target_ids": ["threat-actor--e1", "malware--e2"]
        }))
        .await;

    response.assert_status_ok();
    let marking: MarkingResponse = response.json();
    assert!(marking.success);
    assert_eq!(marking.applied.len(), 1);

    // The marking definition was synthesized as a domain object.
    let status: StatusResponse = server.get("/status").await.json();
    assert_eq!(status.domain_objects, 3);
}

// =============================================================================
// CONTEXT ENDPOINT TESTS
// =============================================================================

#[tokio::test]
async fn test_context_reconciliation_rebuilds_kind() {
    let (server, _guard) = create_populated_test_server();

    // Replace the existing `uses` relationship with one to a new tool.
    let response = server
        .post("/context")
        .json(&json!({
            "anchor_id": "threat-actor--e1",
            "selections": {
                "uses_from": [
                    {"id": "tool--t1", "type": "Tool", "name": "PsExec"}
                ]
            }
        }))
        .await;

    response.assert_status_ok();
    let context: ContextResponse = response.json();
    assert!(context.success);
    assert_eq!(context.relationships, 1);

    // The deselected malware lost its only relationship and was purged;
    // the tool counterpart was synthesized.
    let export: ExportResponse = server.post("/export").await.json();
    let objects = export.bundle.unwrap().objects;
    assert!(objects.iter().any(|o| o.id.as_str() == "tool--t1"));
    assert!(!objects.iter().any(|o| o.id.as_str() == "malware--e2"));
}

// =============================================================================
// LOAD ENDPOINT TESTS
// =============================================================================

#[tokio::test]
async fn test_load_merges_document() {
    let (server, _guard) = create_test_server();

    let response = server
        .post("/load")
        .json(&json!({
            "id": "bundle--upload",
            "type": "bundle",
            "objects": [
                {"id": "identity--a1", "type": "identity", "name": "ACME"},
                {"id": "widget--w1", "type": "widget"}
            ]
        }))
        .await;

    response.assert_status_ok();
    let load: LoadResponse = response.json();
    assert!(load.success);
    assert_eq!(load.merged, 1);
    assert_eq!(load.skipped, 1);
    assert_eq!(load.total, 1);
}

#[tokio::test]
async fn test_load_rejects_non_bundle() {
    let (server, _guard) = create_test_server();

    let response = server
        .post("/load")
        .json(&json!({"id": "report--x", "type": "report", "objects": []}))
        .await;

    response.assert_status_bad_request();
}

// =============================================================================
// EXPORT ENDPOINT TESTS
// =============================================================================

#[tokio::test]
async fn test_export_returns_document() {
    let (server, _guard) = create_populated_test_server();

    let response = server.post("/export").await;

    response.assert_status_ok();
    let export: ExportResponse = response.json();
    assert!(export.success);
    let bundle = export.bundle.unwrap();
    assert_eq!(bundle.type_name, "bundle");
    assert_eq!(bundle.objects.len(), 5);
    // Partition order: domain objects first, containers last.
    assert_eq!(bundle.objects[0].type_name, "threat-actor");
    assert_eq!(bundle.objects[4].type_name, "report");
}

#[tokio::test]
async fn test_export_ids_fresh_per_call() {
    let (server, _guard) = create_test_server();

    let first: ExportResponse = server.post("/export").await.json();
    let second: ExportResponse = server.post("/export").await.json();

    assert_ne!(first.bundle.unwrap().id, second.bundle.unwrap().id);
}

#[tokio::test]
async fn test_export_with_connected_id() {
    let (server, _guard) = create_populated_test_server();

    let response = server
        .post("/export")
        .json(&json!({"connected_id": "threat-actor--e1"}))
        .await;

    response.assert_status_ok();
    let export: ExportResponse = response.json();
    assert!(export.success);
}

// =============================================================================
// AUTHENTICATION TESTS
// =============================================================================

#[tokio::test]
async fn test_auth_rejects_missing_key() {
    let guard = AUTH_TEST_MUTEX.lock().unwrap_or_else(|e| e.into_inner());
    // SAFETY: Tests run sequentially under AUTH_TEST_MUTEX, so no concurrent env access.
    unsafe { std::env::set_var("WORKBENCH_API_KEY", "secret-key") };
    let _cleanup = TestGuard { _guard: guard };

    let state = AppState::new(Bundle::new(), TypeSchema::builtin());
    let server = TestServer::new(create_router(state)).unwrap();

    let response = server.get("/status").await;
    response.assert_status_unauthorized();
}

#[tokio::test]
async fn test_auth_allows_health_without_key() {
    let guard = AUTH_TEST_MUTEX.lock().unwrap_or_else(|e| e.into_inner());
    // SAFETY: Tests run sequentially under AUTH_TEST_MUTEX, so no concurrent env access.
    unsafe { std::env::set_var("WORKBENCH_API_KEY", "secret-key") };
    let _cleanup = TestGuard { _guard: guard };

    let state = AppState::new(Bundle::new(), TypeSchema::builtin());
    let server = TestServer::new(create_router(state)).unwrap();

    let response = server.get("/health").await;
    response.assert_status_ok();
}

#[tokio::test]
async fn test_auth_accepts_bearer_token() {
    let guard = AUTH_TEST_MUTEX.lock().unwrap_or_else(|e| e.into_inner());
    // SAFETY: Tests run sequentially under AUTH_TEST_MUTEX, so no concurrent env access.
    unsafe { std::env::set_var("WORKBENCH_API_KEY", "secret-key") };
    let _cleanup = TestGuard { _guard: guard };

    let state = AppState::new(Bundle::new(), TypeSchema::builtin());
    let server = TestServer::new(create_router(state)).unwrap();

    let response = server
        .get("/status")
        .add_header("authorization", "Bearer secret-key")
        .await;
    response.assert_status_ok();
}
