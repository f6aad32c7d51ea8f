//! # Context Reconciler
//!
//! Rebuilds an anchor object's relationships for a set of directional
//! kinds from the currently selected counterparts.
//!
//! The reconciler never diffs against a previous selection: for every
//! kind present in the input it deletes ALL matching relationships
//! through the cascade engine, then recreates one per selected
//! counterpart. Counterparts orphaned by the rebuild are purged, but
//! only those touched by THIS call — an object orphaned as a side effect
//! of reconciling a different anchor stays until it is itself reconciled
//! or explicitly deleted. The scenario tests lock this scoping in.

use crate::bundle::Bundle;
use crate::schema::allowed_context_kinds;
use crate::types::{ObjectId, Relationship};
use crate::upsert::entity_stub;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

// =============================================================================
// SELECTION TYPES
// =============================================================================

/// One selected counterpart of a directional kind.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Counterpart {
    pub id: ObjectId,
    /// Role-derived type of the counterpart ("Organization", "Country",
    /// "Malware", ...), used to synthesize a stub when the id is new.
    #[serde(rename = "type")]
    pub entity_type: String,
    pub name: String,
}

/// Desired counterpart lists keyed by directional kind
/// (`<relationship-type>_<from|to>`).
pub type ContextSelections = BTreeMap<String, Vec<Counterpart>>;

/// Direction of a kind relative to the anchor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Direction {
    /// Anchor is `source_ref`.
    From,
    /// Anchor is `target_ref`.
    To,
}

/// Split a directional kind key into relationship type and direction.
///
/// Relationship types contain hyphens, never underscores, so the LAST
/// underscore separates the direction suffix.
fn parse_kind(key: &str) -> Option<(&str, Direction)> {
    let (relationship_type, suffix) = key.rsplit_once('_')?;
    match suffix {
        "from" => Some((relationship_type, Direction::From)),
        "to" => Some((relationship_type, Direction::To)),
        _ => None,
    }
}

// =============================================================================
// RECONCILIATION
// =============================================================================

impl Bundle {
    /// Reconcile the anchor's relationships against the selected
    /// counterparts, kind by kind.
    ///
    /// Kinds the anchor's concrete type does not support and keys with
    /// no valid direction suffix are silently ignored. An unknown anchor
    /// id is a no-op.
    pub fn reconcile_context(&mut self, anchor_id: &ObjectId, selections: &ContextSelections) {
        let Some(anchor_type) = self.entity_type(anchor_id).map(str::to_lowercase) else {
            return;
        };
        let allowed = allowed_context_kinds(&anchor_type);

        let mut touched: BTreeSet<ObjectId> = BTreeSet::new();

        for (key, counterparts) in selections {
            if !allowed.contains(&key.as_str()) {
                continue;
            }
            let Some((relationship_type, direction)) = parse_kind(key) else {
                continue;
            };

            // Existing relationships of this kind, rebuilt from scratch.
            let mut existing = BTreeSet::new();
            for relationship in &self.relationships {
                if relationship.relationship_type != relationship_type {
                    continue;
                }
                let (fixed, other) = match direction {
                    Direction::From => (&relationship.source_ref, &relationship.target_ref),
                    Direction::To => (&relationship.target_ref, &relationship.source_ref),
                };
                if fixed == anchor_id {
                    existing.insert(relationship.common.id.clone());
                    touched.insert(other.clone());
                }
            }
            self.delete_objects(&existing);

            for counterpart in counterparts {
                if !self.contains(&counterpart.id) {
                    self.domain_objects.push(entity_stub(
                        counterpart.id.clone(),
                        &counterpart.entity_type,
                        &counterpart.name,
                    ));
                }
                let relationship = match direction {
                    Direction::From => Relationship::link(
                        relationship_type,
                        anchor_id.clone(),
                        counterpart.id.clone(),
                    ),
                    Direction::To => Relationship::link(
                        relationship_type,
                        counterpart.id.clone(),
                        anchor_id.clone(),
                    ),
                };
                self.relationships.push(relationship);
            }
        }

        touched.remove(anchor_id);
        self.purge_orphaned(&touched);

        self.dedup_identity();
        self.dedup_domain_extended();
        self.dedup_relationship_fields();
    }

    /// Scoped orphan purge: delete each touched counterpart that no
    /// longer participates in ANY relationship in the bundle (a full
    /// scan, not view-scoped).
    fn purge_orphaned(&mut self, touched: &BTreeSet<ObjectId>) {
        let orphans: BTreeSet<ObjectId> = touched
            .iter()
            .filter(|id| self.contains(id) && !self.participates_in_relationship(id))
            .cloned()
            .collect();
        self.delete_objects(&orphans);
    }

    fn participates_in_relationship(&self, id: &ObjectId) -> bool {
        self.relationships
            .iter()
            .any(|r| &r.source_ref == id || &r.target_ref == id)
    }
}

// =============================================================================
// TESTS
// =============================================================================
