//! # API Endpoint Handlers
//!
//! This module implements the actual HTTP endpoint handlers.
//!
//! Every mutation handler takes the write lock for its full duration:
//! engine entry points read and write across all four partitions, so
//! they require exclusive access to the whole bundle.

use super::{
    AppState,
    types::{
        ContextRequest, ContextResponse, DeleteRequest, DeleteResponse, ExportRequest,
        ExportResponse, HealthResponse, LoadResponse, MarkingRequest, MarkingResponse,
        RetypeRequest, RetypeResponse, StatusResponse, UpsertResponse,
    },
};
use axum::{Json, extract::State, http::StatusCode, response::IntoResponse};
use std::collections::BTreeSet;
use workbench_core::{
    BundleDocument, ObjectId, UpsertPayload,
    primitives::{BUNDLE_TYPE, MAX_BUNDLE_OBJECTS},
};

// =============================================================================
// HEALTH HANDLER
// =============================================================================

/// Health check endpoint.
pub async fn health_handler() -> impl IntoResponse {
    Json(HealthResponse::default())
}

// =============================================================================
// STATUS HANDLER
// =============================================================================

/// Get bundle status.
pub async fn status_handler(State(state): State<AppState>) -> impl IntoResponse {
    let bundle = state.bundle.read().await;
    (StatusCode::OK, Json(StatusResponse::from(bundle.counts())))
}

// =============================================================================
// UPSERT HANDLERS
// =============================================================================

/// Upsert a domain object or observable.
pub async fn upsert_entity_handler(
    State(state): State<AppState>,
    Json(payload): Json<UpsertPayload>,
) -> impl IntoResponse {
    let mut bundle = state.bundle.write().await;
    let id = bundle.upsert_entity(payload, &state.schema);
    (StatusCode::OK, Json(UpsertResponse::success(id)))
}

/// Upsert a core relationship.
pub async fn upsert_relationship_handler(
    State(state): State<AppState>,
    Json(payload): Json<UpsertPayload>,
) -> impl IntoResponse {
    let mut bundle = state.bundle.write().await;
    match bundle.upsert_relationship(payload) {
        Some(id) => (StatusCode::OK, Json(UpsertResponse::success(id))),
        None => (
            StatusCode::BAD_REQUEST,
            Json(UpsertResponse::error(
                "source_ref, target_ref and relationship_type are required",
            )),
        ),
    }
}

/// Upsert a container.
pub async fn upsert_container_handler(
    State(state): State<AppState>,
    Json(payload): Json<UpsertPayload>,
) -> impl IntoResponse {
    let mut bundle = state.bundle.write().await;
    let id = bundle.upsert_container(payload);
    (StatusCode::OK, Json(UpsertResponse::success(id)))
}

// =============================================================================
// DELETE HANDLER
// =============================================================================

/// Cascade-delete a selection of objects.
pub async fn delete_handler(
    State(state): State<AppState>,
    Json(request): Json<DeleteRequest>,
) -> impl IntoResponse {
    let mut bundle = state.bundle.write().await;
    let before = bundle.len();

    let targets: BTreeSet<ObjectId> = request.ids.into_iter().collect();
    bundle.delete_objects(&targets);

    let remaining = bundle.len();
    (
        StatusCode::OK,
        Json(DeleteResponse {
            success: true,
            removed: before - remaining,
            remaining,
        }),
    )
}

// =============================================================================
// RETYPE HANDLER
// =============================================================================

/// Change an observable's concrete type.
pub async fn retype_handler(
    State(state): State<AppState>,
    Json(request): Json<RetypeRequest>,
) -> impl IntoResponse {
    let mut bundle = state.bundle.write().await;
    match bundle.retype_observable(&request.id, &request.new_type) {
        Some(new_id) => (StatusCode::OK, Json(RetypeResponse::success(new_id))),
        None => (
            StatusCode::NOT_FOUND,
            Json(RetypeResponse::error(format!(
                "No observable with id {}",
                request.id
            ))),
        ),
    }
}

// =============================================================================
// MARKING HANDLER
// =============================================================================

/// Apply markings to a selection of objects.
pub async fn markings_handler(
    State(state): State<AppState>,
    Json(request): Json<MarkingRequest>,
) -> impl IntoResponse {
    let mut bundle = state.bundle.write().await;
    let targets: BTreeSet<ObjectId> = request.target_ids.into_iter().collect();
    let applied = bundle.apply_marking(&request.markings, &targets);
    (
        StatusCode::OK,
        Json(MarkingResponse {
            success: true,
            applied,
        }),
    )
}

// =============================================================================
// CONTEXT HANDLER
// =============================================================================

/// Reconcile an anchor object's context relationships.
pub async fn context_handler(
    State(state): State<AppState>,
    Json(request): Json<ContextRequest>,
) -> impl IntoResponse {
    let mut bundle = state.bundle.write().await;
    bundle.reconcile_context(&request.anchor_id, &request.selections);
    (
        StatusCode::OK,
        Json(ContextResponse {
            success: true,
            relationships: bundle.relationships().len(),
            total: bundle.len(),
        }),
    )
}

// =============================================================================
// LOAD HANDLER
// =============================================================================

/// Classify and merge an external bundle document.
pub async fn load_handler(
    State(state): State<AppState>,
    Json(document): Json<BundleDocument>,
) -> impl IntoResponse {
    if document.type_name != BUNDLE_TYPE {
        return (
            StatusCode::BAD_REQUEST,
            Json(LoadResponse {
                success: false,
                merged: 0,
                skipped: 0,
                total: 0,
            }),
        );
    }
    if document.objects.len() > MAX_BUNDLE_OBJECTS {
        return (
            StatusCode::PAYLOAD_TOO_LARGE,
            Json(LoadResponse {
                success: false,
                merged: 0,
                skipped: 0,
                total: 0,
            }),
        );
    }

    let incoming = document.objects.len();
    let mut bundle = state.bundle.write().await;
    let skipped = bundle.merge_document(document, &state.schema);
    (
        StatusCode::OK,
        Json(LoadResponse {
            success: true,
            merged: incoming - skipped,
            skipped,
            total: bundle.len(),
        }),
    )
}

// =============================================================================
// EXPORT HANDLER
// =============================================================================

/// Export the bundle document for the transport collaborator.
///
/// The optional `connected_id` is the target entity the transport
/// associates the upload with; the engine itself only logs it.
pub async fn export_handler(
    State(state): State<AppState>,
    payload: Option<Json<ExportRequest>>,
) -> impl IntoResponse {
    let connected_id = payload.and_then(|Json(request)| request.connected_id);
    if let Some(id) = &connected_id {
        tracing::info!("Export associated with entity {}", id);
    }

    let bundle = state.bundle.read().await;
    let document = bundle.to_document();
    (StatusCode::OK, Json(ExportResponse::success(document)))
}
