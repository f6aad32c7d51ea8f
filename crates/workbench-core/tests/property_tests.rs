//! # Property-Based Tests
//!
//! Engine invariants checked over generated bundles:
//! - no reference survives a delete pointing at a deleted id
//! - delete is idempotent
//! - every id appears in exactly one partition
//! - both dedup passes break ties toward the first occurrence

use proptest::collection::vec;
use proptest::prelude::*;
use std::collections::BTreeSet;
use workbench_core::{Bundle, BundleDocument, ObjectId, RawObject, TypeSchema, UpsertPayload};

// =============================================================================
// GENERATORS
// =============================================================================

fn entity_id(index: u8) -> ObjectId {
    if index % 3 == 0 {
        ObjectId::new(format!("identity--{index}"))
    } else if index % 3 == 1 {
        ObjectId::new(format!("threat-actor--{index}"))
    } else {
        ObjectId::new(format!("ipv4-addr--{index}"))
    }
}

fn entity_raw(index: u8) -> RawObject {
    let id = entity_id(index);
    if index % 3 == 2 {
        let mut raw = RawObject::bare(id, "ipv4-addr");
        raw.value = Some(format!("10.0.0.{index}"));
        raw
    } else if index % 3 == 0 {
        let mut raw = RawObject::bare(id, "identity");
        raw.name = Some(format!("identity-{index}"));
        raw
    } else {
        let mut raw = RawObject::bare(id, "threat-actor");
        raw.name = Some(format!("actor-{index}"));
        raw
    }
}

/// A generated bundle: entities indexed 0..n, relationships and one
/// container wired between them, creator/marking references sprinkled in.
fn arb_bundle() -> impl Strategy<Value = Bundle> {
    (
        2u8..20,
        vec((any::<u8>(), any::<u8>()), 0..16),
        vec(any::<u8>(), 0..8),
    )
        .prop_map(|(entity_count, edges, members)| {
            let mut objects: Vec<RawObject> = (0..entity_count).map(entity_raw).collect();

            // Creator and marking references onto a known identity.
            let creator = entity_id(0);
            for raw in objects.iter_mut().skip(1) {
                raw.created_by_ref = Some(creator.clone());
                raw.object_marking_refs = vec![creator.clone()];
            }

            for (index, (a, b)) in edges.iter().enumerate() {
                let mut raw = RawObject::bare(
                    ObjectId::new(format!("relationship--{index}")),
                    "relationship",
                );
                raw.source_ref = Some(entity_id(a % entity_count));
                raw.target_ref = Some(entity_id(b % entity_count));
                raw.relationship_type = Some("related-to".to_string());
                objects.push(raw);
            }

            let mut container = RawObject::bare(ObjectId::new("report--c0"), "report");
            container.object_refs = Some(
                members
                    .iter()
                    .map(|m| entity_id(m % entity_count))
                    .collect(),
            );
            objects.push(container);

            let (bundle, _) =
                Bundle::from_document(BundleDocument::envelope(objects), &TypeSchema::builtin());
            bundle
        })
}

fn arb_targets() -> impl Strategy<Value = BTreeSet<ObjectId>> {
    vec(any::<u8>(), 1..8).prop_map(|picks| {
        picks
            .into_iter()
            .map(|p| entity_id(p % 24))
            .collect::<BTreeSet<_>>()
    })
}

/// Every id referenced anywhere in the bundle.
fn referenced_ids(bundle: &Bundle) -> BTreeSet<ObjectId> {
    let mut refs = BTreeSet::new();
    let commons = bundle
        .domain_objects()
        .iter()
        .map(|o| &o.common)
        .chain(bundle.observables().iter().map(|o| &o.common))
        .chain(bundle.relationships().iter().map(|o| &o.common))
        .chain(bundle.containers().iter().map(|o| &o.common));
    for common in commons {
        if let Some(creator) = &common.created_by_ref {
            refs.insert(creator.clone());
        }
        refs.extend(common.object_marking_refs.iter().cloned());
    }
    for relationship in bundle.relationships() {
        refs.insert(relationship.source_ref.clone());
        refs.insert(relationship.target_ref.clone());
    }
    for container in bundle.containers() {
        refs.extend(container.object_refs.iter().cloned());
    }
    refs
}

// =============================================================================
// PROPERTY TESTS
// =============================================================================

proptest! {
    /// After a delete, nothing references a deleted id.
    #[test]
    fn delete_leaves_no_dangling_reference(
        bundle in arb_bundle(),
        targets in arb_targets()
    ) {
        let mut bundle = bundle;
        bundle.delete_objects(&targets);

        let refs = referenced_ids(&bundle);
        for target in &targets {
            prop_assert!(!refs.contains(target), "dangling reference to {target}");
        }
    }

    /// Deleting the same set twice equals deleting it once.
    #[test]
    fn delete_is_idempotent(
        bundle in arb_bundle(),
        targets in arb_targets()
    ) {
        let mut once = bundle.clone();
        once.delete_objects(&targets);
        let mut twice = once.clone();
        twice.delete_objects(&targets);

        prop_assert_eq!(once, twice);
    }

    /// Every id appears in exactly one partition, and stays unique
    /// through delete and dedup.
    #[test]
    fn ids_unique_across_partitions(
        bundle in arb_bundle(),
        targets in arb_targets()
    ) {
        let mut bundle = bundle;
        bundle.delete_objects(&targets);
        bundle.dedup();

        let ids: Vec<&ObjectId> = bundle.object_ids().collect();
        let unique: BTreeSet<&ObjectId> = ids.iter().copied().collect();
        prop_assert_eq!(ids.len(), unique.len());
    }

    /// Identity pass: [A, B] with equal ids collapses to A.
    #[test]
    fn identity_collapse_prefers_first(name_a in "[a-z]{1,12}", name_b in "[a-z]{1,12}") {
        let id = ObjectId::new("threat-actor--shared");
        let mut first = RawObject::bare(id.clone(), "threat-actor");
        first.name = Some(name_a.clone());
        let mut second = RawObject::bare(id, "threat-actor");
        second.name = Some(name_b);

        let (mut bundle, _) = Bundle::from_document(
            BundleDocument::envelope(vec![first, second]),
            &TypeSchema::builtin(),
        );
        bundle.dedup_identity();

        prop_assert_eq!(bundle.domain_objects().len(), 1);
        prop_assert_eq!(bundle.domain_objects()[0].name.as_deref(), Some(name_a.as_str()));
    }

    /// Field-set pass: [A, B] with equal (name, type) but different
    /// ids collapses to A.
    #[test]
    fn field_collapse_prefers_first(name in "[a-z]{1,12}") {
        let mut first = RawObject::bare(ObjectId::new("threat-actor--a"), "threat-actor");
        first.name = Some(name.clone());
        let mut second = RawObject::bare(ObjectId::new("threat-actor--b"), "threat-actor");
        second.name = Some(name);

        let (mut bundle, _) = Bundle::from_document(
            BundleDocument::envelope(vec![first, second]),
            &TypeSchema::builtin(),
        );
        bundle.dedup();

        prop_assert_eq!(bundle.domain_objects().len(), 1);
        prop_assert_eq!(bundle.domain_objects()[0].common.id.as_str(), "threat-actor--a");
    }

    /// Upsert is idempotent at the store level: repeating the same
    /// payload leaves exactly one target object.
    #[test]
    fn repeated_upsert_yields_single_object(name in "[a-z]{1,12}", repeats in 2usize..5) {
        let schema = TypeSchema::builtin();
        let mut bundle = Bundle::new();
        let payload = UpsertPayload {
            type_name: "campaign".to_string(),
            name: Some(name),
            ..UpsertPayload::default()
        };

        for _ in 0..repeats {
            bundle.upsert_entity(payload.clone(), &schema);
        }

        prop_assert_eq!(bundle.domain_objects().len(), 1);
    }
}
