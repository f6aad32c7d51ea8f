//! # API Request/Response Types
//!
//! This module defines the JSON structures for the HTTP API.
//!
//! Mutation payloads reuse the engine's own form-payload and selection
//! types; the structures here add the envelope the handlers answer with.

use serde::{Deserialize, Serialize};
use workbench_core::{BundleCounts, BundleDocument, ContextSelections, MarkingRef, ObjectId};

// =============================================================================
// HEALTH RESPONSE
// =============================================================================

/// Health check response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
}

impl Default for HealthResponse {
    fn default() -> Self {
        Self {
            status: "ok".to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }
}

// =============================================================================
// STATUS RESPONSE
// =============================================================================

/// Bundle status response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatusResponse {
    pub domain_objects: usize,
    pub observables: usize,
    pub relationships: usize,
    pub containers: usize,
    pub total: usize,
}

impl From<BundleCounts> for StatusResponse {
    fn from(counts: BundleCounts) -> Self {
        Self {
            domain_objects: counts.domain_objects,
            observables: counts.observables,
            relationships: counts.relationships,
            containers: counts.containers,
            total: counts.total(),
        }
    }
}

// =============================================================================
// UPSERT RESPONSE
// =============================================================================

/// Response to the three upsert endpoints.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpsertResponse {
    pub success: bool,
    pub id: Option<ObjectId>,
    pub error: Option<String>,
}

impl UpsertResponse {
    pub fn success(id: ObjectId) -> Self {
        Self {
            success: true,
            id: Some(id),
            error: None,
        }
    }

    pub fn error(msg: impl Into<String>) -> Self {
        Self {
            success: false,
            id: None,
            error: Some(msg.into()),
        }
    }
}

// =============================================================================
// DELETE REQUEST/RESPONSE
// =============================================================================

/// Bulk delete request: ids drawn from any partition.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeleteRequest {
    pub ids: Vec<ObjectId>,
}

/// Bulk delete response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeleteResponse {
    pub success: bool,
    /// Objects removed, cascaded relationships included.
    pub removed: usize,
    pub remaining: usize,
}

// =============================================================================
// RETYPE REQUEST/RESPONSE
// =============================================================================

/// Observable retype request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetypeRequest {
    pub id: ObjectId,
    pub new_type: String,
}

/// Observable retype response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetypeResponse {
    pub success: bool,
    pub new_id: Option<ObjectId>,
    pub error: Option<String>,
}

impl RetypeResponse {
    pub fn success(new_id: ObjectId) -> Self {
        Self {
            success: true,
            new_id: Some(new_id),
            error: None,
        }
    }

    pub fn error(msg: impl Into<String>) -> Self {
        Self {
            success: false,
            new_id: None,
            error: Some(msg.into()),
        }
    }
}

// =============================================================================
// MARKING REQUEST/RESPONSE
// =============================================================================

/// Bulk marking application request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MarkingRequest {
    pub markings: Vec<MarkingRef>,
    pub target_ids: Vec<ObjectId>,
}

/// Bulk marking application response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MarkingResponse {
    pub success: bool,
    /// Resolved marking-definition ids that were applied.
    pub applied: Vec<ObjectId>,
}

// =============================================================================
// CONTEXT REQUEST/RESPONSE
// =============================================================================

/// Context reconciliation request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContextRequest {
    pub anchor_id: ObjectId,
    pub selections: ContextSelections,
}

/// Context reconciliation response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContextResponse {
    pub success: bool,
    pub relationships: usize,
    pub total: usize,
}

// =============================================================================
// LOAD RESPONSE
// =============================================================================

/// Document merge response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoadResponse {
    pub success: bool,
    pub merged: usize,
    pub skipped: usize,
    pub total: usize,
}

// =============================================================================
// EXPORT REQUEST/RESPONSE
// =============================================================================

/// Export request: optional target entity the transport collaborator
/// associates the uploaded document with.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ExportRequest {
    #[serde(default)]
    pub connected_id: Option<ObjectId>,
}

/// Export response carrying the full bundle document.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExportResponse {
    pub success: bool,
    pub bundle: Option<BundleDocument>,
    pub error: Option<String>,
}

impl ExportResponse {
    pub fn success(bundle: BundleDocument) -> Self {
        Self {
            success: true,
            bundle: Some(bundle),
            error: None,
        }
    }

    pub fn error(msg: impl Into<String>) -> Self {
        Self {
            success: false,
            bundle: None,
            error: Some(msg.into()),
        }
    }
}
