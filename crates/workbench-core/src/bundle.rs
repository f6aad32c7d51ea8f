//! # Bundle Store
//!
//! The four partitioned collections plus lookup utilities.
//!
//! Partitions are `Vec`-backed because list order is semantic: the dedup
//! passes break ties toward the FIRST occurrence, type migration replaces
//! in place, and export emits each partition in its current internal
//! order. All mutation entry points live in the sibling operation modules
//! as further `impl Bundle` blocks.

use crate::export::BundleDocument;
use crate::schema::TypeSchema;
use crate::types::{BundleObject, CommonFields, Container, DomainObject, ObjectId, Observable, Relationship};

// =============================================================================
// BUNDLE
// =============================================================================

/// The in-memory bundle: four disjoint, id-unique partitions.
///
/// An id appears in exactly one partition. Creator and marking
/// references name domain objects. Dangling references are pruned by
/// the cascade engine after deletions, never rejected at creation.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Bundle {
    pub(crate) domain_objects: Vec<DomainObject>,
    pub(crate) observables: Vec<Observable>,
    pub(crate) relationships: Vec<Relationship>,
    pub(crate) containers: Vec<Container>,
}

/// Per-partition object counts.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BundleCounts {
    pub domain_objects: usize,
    pub observables: usize,
    pub relationships: usize,
    pub containers: usize,
}

impl BundleCounts {
    /// Total object count across all partitions.
    #[must_use]
    pub fn total(&self) -> usize {
        self.domain_objects + self.observables + self.relationships + self.containers
    }
}

impl Bundle {
    /// Create a new empty bundle.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuild a bundle from an external document, classifying and
    /// partitioning its objects in order. Objects whose type is in
    /// neither injected list (or relationships missing required fields)
    /// are skipped; the second value is the skip count.
    #[must_use]
    pub fn from_document(document: BundleDocument, schema: &TypeSchema) -> (Self, usize) {
        let mut bundle = Self::new();
        let skipped = bundle.merge_document(document, schema);
        (bundle, skipped)
    }

    /// Classify and append a document's objects onto this bundle.
    ///
    /// Existing objects win on id collision (identity collapse prefers
    /// the first occurrence, and existing objects come first). Returns
    /// the number of skipped objects.
    pub fn merge_document(&mut self, document: BundleDocument, schema: &TypeSchema) -> usize {
        let mut skipped = 0usize;
        for raw in document.objects {
            let classified = schema
                .classify_raw(&raw)
                .and_then(|category| BundleObject::from_raw(raw, category));
            match classified {
                Some(object) => self.push(object),
                None => skipped += 1,
            }
        }
        self.dedup_identity();
        skipped
    }

    /// Append a classified object to the end of its partition.
    ///
    /// Does not collapse duplicates; callers sequence a dedup pass after
    /// the batch (placement controls which version wins).
    pub fn push(&mut self, object: BundleObject) {
        match object {
            BundleObject::Domain(o) => self.domain_objects.push(o),
            BundleObject::Observable(o) => self.observables.push(o),
            BundleObject::Relationship(o) => self.relationships.push(o),
            BundleObject::Container(o) => self.containers.push(o),
        }
    }

    // =========================================================================
    // ACCESSORS
    // =========================================================================

    /// Domain objects in partition order.
    #[must_use]
    pub fn domain_objects(&self) -> &[DomainObject] {
        &self.domain_objects
    }

    /// Observables in partition order.
    #[must_use]
    pub fn observables(&self) -> &[Observable] {
        &self.observables
    }

    /// Relationships in partition order.
    #[must_use]
    pub fn relationships(&self) -> &[Relationship] {
        &self.relationships
    }

    /// Containers in partition order.
    #[must_use]
    pub fn containers(&self) -> &[Container] {
        &self.containers
    }

    /// Per-partition counts.
    #[must_use]
    pub fn counts(&self) -> BundleCounts {
        BundleCounts {
            domain_objects: self.domain_objects.len(),
            observables: self.observables.len(),
            relationships: self.relationships.len(),
            containers: self.containers.len(),
        }
    }

    /// Total object count.
    #[must_use]
    pub fn len(&self) -> usize {
        self.counts().total()
    }

    /// True when every partition is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    // =========================================================================
    // LOOKUP
    // =========================================================================

    /// Check whether any partition holds the id.
    #[must_use]
    pub fn contains(&self, id: &ObjectId) -> bool {
        self.object_ids().any(|existing| existing == id)
    }

    /// All ids across the four partitions, in export order.
    pub fn object_ids(&self) -> impl Iterator<Item = &ObjectId> {
        self.commons().map(|common| &common.id)
    }

    /// Entity lookup over the first two partitions: the type tag of the
    /// domain object or observable with this id. Relationship and
    /// container resolution goes through this index.
    #[must_use]
    pub fn entity_type(&self, id: &ObjectId) -> Option<&str> {
        self.domain_objects
            .iter()
            .find(|o| &o.common.id == id)
            .map(|o| o.common.type_name.as_str())
            .or_else(|| {
                self.observables
                    .iter()
                    .find(|o| &o.common.id == id)
                    .map(|o| o.common.type_name.as_str())
            })
    }

    /// Check whether the id names a domain object or observable.
    #[must_use]
    pub fn entity_exists(&self, id: &ObjectId) -> bool {
        self.entity_type(id).is_some()
    }

    /// Shared base fields of every object, in export order.
    pub(crate) fn commons(&self) -> impl Iterator<Item = &CommonFields> {
        self.domain_objects
            .iter()
            .map(|o| &o.common)
            .chain(self.observables.iter().map(|o| &o.common))
            .chain(self.relationships.iter().map(|o| &o.common))
            .chain(self.containers.iter().map(|o| &o.common))
    }

    /// Shared base fields of every object, mutable.
    pub(crate) fn commons_mut(&mut self) -> impl Iterator<Item = &mut CommonFields> {
        self.domain_objects
            .iter_mut()
            .map(|o| &mut o.common)
            .chain(self.observables.iter_mut().map(|o| &mut o.common))
            .chain(self.relationships.iter_mut().map(|o| &mut o.common))
            .chain(self.containers.iter_mut().map(|o| &mut o.common))
    }
}

// =============================================================================
// TESTS
// =============================================================================
