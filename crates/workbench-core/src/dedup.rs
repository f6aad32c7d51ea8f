//! # Dedup Engine
//!
//! Two composable collapse passes applied after every operation that may
//! introduce duplicates, always identity first, field-set second.
//!
//! Both passes are order-sensitive and deterministic: the FIRST
//! occurrence in list order wins. Callers control precedence by placing
//! the winning version first — an edited object is prepended before the
//! pass, a synthesized stub is appended after existing objects.

use crate::bundle::Bundle;
use std::collections::BTreeSet;

/// Keep the first item per distinct key, preserving list order.
fn collapse_first<T, K: Ord>(items: &mut Vec<T>, mut key: impl FnMut(&T) -> K) {
    let mut seen = BTreeSet::new();
    items.retain(|item| seen.insert(key(item)));
}

impl Bundle {
    // =========================================================================
    // IDENTITY COLLAPSE
    // =========================================================================

    /// Keep one object per distinct id.
    ///
    /// The seen-set is shared across the four partitions in export order,
    /// so a cross-partition id collision also collapses to the first
    /// occurrence — an id lives in exactly one partition afterwards.
    pub fn dedup_identity(&mut self) {
        let mut seen: BTreeSet<crate::types::ObjectId> = BTreeSet::new();
        self.domain_objects
            .retain(|o| seen.insert(o.common.id.clone()));
        self.observables.retain(|o| seen.insert(o.common.id.clone()));
        self.relationships
            .retain(|o| seen.insert(o.common.id.clone()));
        self.containers.retain(|o| seen.insert(o.common.id.clone()));
    }

    // =========================================================================
    // FIELD-SET COLLAPSE
    // =========================================================================

    /// Keep one object per distinct dedup field tuple in every partition.
    ///
    /// Tuples: Domain `(name, type)`, Observable `(value, type)`,
    /// Relationship `(source_ref, target_ref, relationship_type)`,
    /// Container `(name, type)`. Two objects with different ids but equal
    /// tuples collapse to the first — a form-entered identity that
    /// duplicates one already in the store is the canonical case.
    pub fn dedup_fields(&mut self) {
        self.dedup_domain_fields();
        self.dedup_observable_fields();
        self.dedup_relationship_fields();
        self.dedup_container_fields();
    }

    /// Domain-object field collapse on the standard `(name, type)` tuple.
    pub(crate) fn dedup_domain_fields(&mut self) {
        collapse_first(&mut self.domain_objects, |o| {
            (o.name.clone(), o.common.type_name.clone())
        });
    }

    /// Container field collapse on `(name, type)`.
    pub(crate) fn dedup_container_fields(&mut self) {
        collapse_first(&mut self.containers, |o| {
            (o.name.clone(), o.common.type_name.clone())
        });
    }

    /// Domain-object field collapse on the extended tuple
    /// `(name, type, identity_class, x_opencti_location_type)`.
    ///
    /// Context-reconciliation paths use this wider key so two identities
    /// sharing a name but differing in class survive side by side.
    pub(crate) fn dedup_domain_extended(&mut self) {
        collapse_first(&mut self.domain_objects, |o| {
            (
                o.name.clone(),
                o.common.type_name.clone(),
                o.identity_class.clone(),
                o.location_type.clone(),
            )
        });
    }

    /// Observable field collapse on `(value, type)`.
    pub(crate) fn dedup_observable_fields(&mut self) {
        collapse_first(&mut self.observables, |o| {
            (o.value.clone(), o.common.type_name.clone())
        });
    }

    /// Relationship field collapse on the endpoint/type triple.
    pub(crate) fn dedup_relationship_fields(&mut self) {
        collapse_first(&mut self.relationships, |o| {
            (
                o.source_ref.clone(),
                o.target_ref.clone(),
                o.relationship_type.clone(),
            )
        });
    }

    /// Both passes in contract order: identity, then field-set.
    pub fn dedup(&mut self) {
        self.dedup_identity();
        self.dedup_fields();
    }
}

// =============================================================================
// TESTS
// =============================================================================
