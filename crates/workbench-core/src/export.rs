//! # Snapshot Exporter
//!
//! The bundle envelope exchanged with the transport collaborator.
//!
//! Export flattens the four partitions into one ordered list — domain
//! objects, observables, relationships, containers, each in its current
//! internal order — and wraps it with a freshly minted envelope id.
//! Envelope ids are NOT stable across exports.
//!
//! The parser validates size limits BEFORE deserialization to keep
//! oversized uploads from allocating.

use crate::bundle::Bundle;
use crate::primitives::{BUNDLE_TYPE, MAX_BUNDLE_OBJECTS, MAX_DOCUMENT_SIZE};
use crate::types::{BundleObject, ObjectId, RawObject, WorkbenchError};
use serde::{Deserialize, Serialize};

// =============================================================================
// BUNDLE DOCUMENT
// =============================================================================

/// The externally exchanged document shape:
/// `{ id, type: "bundle", objects: [...] }`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BundleDocument {
    pub id: ObjectId,
    #[serde(rename = "type")]
    pub type_name: String,
    #[serde(default)]
    pub objects: Vec<RawObject>,
}

impl BundleDocument {
    /// Wrap a flattened object list in a fresh envelope.
    #[must_use]
    pub fn envelope(objects: Vec<RawObject>) -> Self {
        Self {
            id: ObjectId::mint(BUNDLE_TYPE),
            type_name: BUNDLE_TYPE.to_string(),
            objects,
        }
    }

    /// Parse a document from JSON bytes.
    ///
    /// Rejects payloads over [`MAX_DOCUMENT_SIZE`], documents whose
    /// `type` is not `bundle`, and object lists over
    /// [`MAX_BUNDLE_OBJECTS`].
    pub fn from_json_slice(data: &[u8]) -> Result<Self, WorkbenchError> {
        if data.len() > MAX_DOCUMENT_SIZE {
            return Err(WorkbenchError::InvalidDocument(format!(
                "document size {} exceeds maximum {} bytes",
                data.len(),
                MAX_DOCUMENT_SIZE
            )));
        }
        let document: Self = serde_json::from_slice(data)
            .map_err(|e| WorkbenchError::SerializationError(e.to_string()))?;
        if document.type_name != BUNDLE_TYPE {
            return Err(WorkbenchError::InvalidDocument(format!(
                "expected type \"{}\", got \"{}\"",
                BUNDLE_TYPE, document.type_name
            )));
        }
        if document.objects.len() > MAX_BUNDLE_OBJECTS {
            return Err(WorkbenchError::InvalidDocument(format!(
                "object count {} exceeds maximum {}",
                document.objects.len(),
                MAX_BUNDLE_OBJECTS
            )));
        }
        Ok(document)
    }

    /// Serialize to pretty JSON bytes.
    pub fn to_json_vec(&self) -> Result<Vec<u8>, WorkbenchError> {
        serde_json::to_vec_pretty(self)
            .map_err(|e| WorkbenchError::SerializationError(e.to_string()))
    }
}

// =============================================================================
// EXPORT
// =============================================================================

impl Bundle {
    /// Flatten the current state into a bundle document.
    ///
    /// Objects appear as `domainObjects ++ observables ++ relationships
    /// ++ containers` in each partition's internal order; the envelope id
    /// is minted per call.
    #[must_use]
    pub fn to_document(&self) -> BundleDocument {
        let objects = self
            .domain_objects()
            .iter()
            .map(|o| BundleObject::Domain(o.clone()).to_raw())
            .chain(
                self.observables()
                    .iter()
                    .map(|o| BundleObject::Observable(o.clone()).to_raw()),
            )
            .chain(
                self.relationships()
                    .iter()
                    .map(|o| BundleObject::Relationship(o.clone()).to_raw()),
            )
            .chain(
                self.containers()
                    .iter()
                    .map(|o| BundleObject::Container(o.clone()).to_raw()),
            )
            .collect();
        BundleDocument::envelope(objects)
    }
}

// =============================================================================
// TESTS
// =============================================================================
