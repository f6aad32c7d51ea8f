//! # Cascade Engine
//!
//! Ripple effects of removing a set of ids from the bundle.
//!
//! `delete_objects` is the single deletion entry point, used identically
//! for single-object delete and for bulk delete over a view selection.
//! After it returns, no reference reachable from the call points at a
//! removed id — the one invariant this engine hard-fails a test on.

use crate::bundle::Bundle;
use crate::types::ObjectId;
use std::collections::BTreeSet;

impl Bundle {
    /// Remove every object named in `targets` and repair all references.
    ///
    /// Steps over the four partitions:
    /// 1. drop targeted objects from their partitions,
    /// 2. clear `created_by_ref` fields naming a target,
    /// 3. filter targets out of every `object_marking_refs` set,
    /// 4. drop relationships left with a deleted endpoint,
    /// 5. prune container membership of targets AND of relationships
    ///    dropped in step 4 (containers may reference a relationship
    ///    directly as a member).
    ///
    /// Deleting a non-existent id is a no-op for that id, so the
    /// operation is idempotent and safe over a stale selection.
    pub fn delete_objects(&mut self, targets: &BTreeSet<ObjectId>) {
        if targets.is_empty() {
            return;
        }

        // Step 1: remove targeted objects.
        self.domain_objects.retain(|o| !targets.contains(&o.common.id));
        self.observables.retain(|o| !targets.contains(&o.common.id));
        self.relationships.retain(|o| !targets.contains(&o.common.id));
        self.containers.retain(|o| !targets.contains(&o.common.id));

        // Steps 2 + 3: strip creator and marking references on survivors.
        for common in self.commons_mut() {
            if common
                .created_by_ref
                .as_ref()
                .is_some_and(|id| targets.contains(id))
            {
                common.created_by_ref = None;
            }
            common.object_marking_refs.retain(|id| !targets.contains(id));
        }

        // Step 4: cascade relationships whose endpoint was deleted.
        let rels_to_drop: BTreeSet<ObjectId> = self
            .relationships
            .iter()
            .filter(|r| targets.contains(&r.source_ref) || targets.contains(&r.target_ref))
            .map(|r| r.common.id.clone())
            .collect();
        self.relationships
            .retain(|r| !rels_to_drop.contains(&r.common.id));

        // Step 5: prune container membership.
        for container in &mut self.containers {
            container
                .object_refs
                .retain(|id| !targets.contains(id) && !rels_to_drop.contains(id));
        }
    }

    /// Delete a single object by id.
    pub fn delete_object(&mut self, id: &ObjectId) {
        self.delete_objects(&BTreeSet::from([id.clone()]));
    }
}

// =============================================================================
// TESTS
// =============================================================================
