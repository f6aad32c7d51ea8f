//! # Type Migrator
//!
//! In-place type change for observables.
//!
//! The concrete type is baked into the id prefix, so changing the type
//! re-mints the identifier and propagates it to every referencing
//! relationship and container membership. This is a pure rename: no
//! cascade delete occurs.

use crate::bundle::Bundle;
use crate::types::ObjectId;

impl Bundle {
    /// Change an observable's concrete type, re-minting its id.
    ///
    /// The observable keeps its partition position and all editable
    /// fields; relationships and container membership lists referencing
    /// the old id are rewritten in place. A final `(value, type)`
    /// field-set pass absorbs any duplicate the migration created.
    ///
    /// Returns the new id, or `None` when `old_id` names no observable
    /// (silent no-op, consistent with the rest of the engine).
    pub fn retype_observable(&mut self, old_id: &ObjectId, new_type: &str) -> Option<ObjectId> {
        let position = self
            .observables
            .iter()
            .position(|o| &o.common.id == old_id)?;

        let new_id = ObjectId::mint(new_type);
        {
            let observable = &mut self.observables[position];
            observable.common.id = new_id.clone();
            observable.common.type_name = new_type.to_string();
        }

        for relationship in &mut self.relationships {
            if &relationship.source_ref == old_id {
                relationship.source_ref = new_id.clone();
            }
            if &relationship.target_ref == old_id {
                relationship.target_ref = new_id.clone();
            }
        }

        // Position-preserving: membership entries are replaced where they
        // stand, never moved to the end.
        for container in &mut self.containers {
            for member in &mut container.object_refs {
                if member == old_id {
                    *member = new_id.clone();
                }
            }
        }

        self.dedup_observable_fields();
        Some(new_id)
    }
}

// =============================================================================
// TESTS
// =============================================================================
