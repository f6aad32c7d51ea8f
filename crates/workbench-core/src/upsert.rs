//! # Upsert Operations
//!
//! Form-style create/update entry points plus the marking bulk-apply.
//!
//! Shared shape: a payload carries core attributes plus three auxiliary
//! reference groups (`created_by`, `object_marking`,
//! `external_references`). Auxiliaries are synthesized as first-class
//! Domain Objects when their id is new, then the target object is built
//! or merged and re-inserted through identity collapse (edited version
//! first) and field-set collapse.
//!
//! No operation raises an error: malformed payload fields are stored
//! as-is, validation is an external concern.

use crate::bundle::Bundle;
use crate::schema::{AttributeCatalog, AttributeKind, Category, TypeSchema};
use crate::types::{
    CommonFields, Container, DomainObject, ExternalReference, ObjectId, Observable, Relationship,
};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeSet;

// =============================================================================
// AUXILIARY REFERENCE GROUPS
// =============================================================================

/// The zero-or-one identity selected in a form's created-by group.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IdentityRef {
    /// Existing object id; a fresh `identity--` id is minted when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<ObjectId>,
    pub name: String,
    /// Role hint used to derive `identity_class` on a synthesized stub.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
}

/// One marking selected in a form's marking group.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MarkingRef {
    /// Existing object id; a fresh `marking-definition--` id is minted
    /// when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<ObjectId>,
    pub definition: String,
}

// =============================================================================
// UPSERT PAYLOAD
// =============================================================================

/// A form-style mutation payload.
///
/// Only the fields relevant to the target category are read; the rest
/// are ignored by the receiving operation. `attributes` carries every
/// editable attribute the engine does not interpret, merged into the
/// object's `extra` map as-is.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct UpsertPayload {
    pub id: Option<ObjectId>,
    #[serde(rename = "type")]
    pub type_name: String,
    pub name: Option<String>,
    pub value: Option<String>,
    /// Role hint for derived sub-type fields on new identity/location
    /// objects.
    pub role: Option<String>,
    pub source_ref: Option<ObjectId>,
    pub target_ref: Option<ObjectId>,
    pub relationship_type: Option<String>,
    pub object_refs: Vec<ObjectId>,
    pub created_by: Option<IdentityRef>,
    pub object_marking: Vec<MarkingRef>,
    pub external_references: Vec<ExternalReference>,
    pub attributes: Map<String, Value>,
}

impl UpsertPayload {
    /// Start a payload for the given type tag.
    #[must_use]
    pub fn new(type_name: impl Into<String>) -> Self {
        Self {
            type_name: type_name.into(),
            ..Self::default()
        }
    }

    /// Add an editable attribute, coercing the raw form string through
    /// the attribute catalog. Unparseable numeric/boolean input is kept
    /// as the raw string rather than rejected.
    #[must_use]
    pub fn attribute(
        mut self,
        catalog: &impl AttributeCatalog,
        name: &str,
        raw_value: &str,
    ) -> Self {
        let coerced = match catalog.kind_of(&self.type_name, name) {
            AttributeKind::Numeric => raw_value
                .trim()
                .parse::<i64>()
                .map(Value::from)
                .unwrap_or_else(|_| Value::String(raw_value.to_string())),
            AttributeKind::Boolean => raw_value
                .trim()
                .parse::<bool>()
                .map(Value::Bool)
                .unwrap_or_else(|_| Value::String(raw_value.to_string())),
            AttributeKind::Text | AttributeKind::Date | AttributeKind::Markdown => {
                Value::String(raw_value.to_string())
            }
        };
        self.attributes.insert(name.to_string(), coerced);
        self
    }
}

// =============================================================================
// STUB SYNTHESIS
// =============================================================================

/// Build a stub Domain Object for a counterpart or created-by reference
/// known only by id, role and name.
///
/// Identity roles map to `identity` with a derived `identity_class`;
/// location roles map to `location` with a derived
/// `x_opencti_location_type`; any other role is taken as the type tag
/// itself.
pub(crate) fn entity_stub(id: ObjectId, role: &str, name: &str) -> DomainObject {
    let (type_name, identity_class, location_type) = derive_stub_type(role);
    DomainObject {
        common: CommonFields {
            id,
            type_name,
            ..CommonFields::default()
        },
        name: Some(name.to_string()),
        identity_class,
        location_type,
    }
}

fn derive_stub_type(role: &str) -> (String, Option<String>, Option<String>) {
    let lowered = role.to_lowercase();
    match lowered.as_str() {
        "individual" | "organization" | "group" | "sector" | "system" => {
            ("identity".to_string(), Some(lowered), None)
        }
        "country" | "city" | "region" | "position" | "administrative-area" => {
            let canonical = canonical_location_type(&lowered);
            ("location".to_string(), None, Some(canonical))
        }
        _ => (lowered, None, None),
    }
}

/// Canonical capitalized form of a location role ("administrative-area"
/// becomes "Administrative-Area").
fn canonical_location_type(role: &str) -> String {
    role.split('-')
        .map(|segment| {
            let mut chars = segment.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect::<String>(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join("-")
}

/// Derived sub-type fields for a freshly created identity/location
/// target.
fn derive_subtype(type_name: &str, role: Option<&str>) -> (Option<String>, Option<String>) {
    match (type_name.to_lowercase().as_str(), role) {
        ("identity", Some(role)) => (Some(role.to_lowercase()), None),
        ("location", Some(role)) => (None, Some(canonical_location_type(&role.to_lowercase()))),
        _ => (None, None),
    }
}

// =============================================================================
// OPERATIONS
// =============================================================================

impl Bundle {
    /// Create or update a domain object / observable from a form payload.
    ///
    /// Idempotent on repeated application with the same payload: the
    /// field-set collapse absorbs the duplicate a repeat produces.
    /// Returns the id of the surviving target object.
    pub fn upsert_entity(&mut self, payload: UpsertPayload, schema: &TypeSchema) -> ObjectId {
        let creator = self.absorb_created_by(payload.created_by.as_ref());
        let markings = self.absorb_markings(&payload.object_marking);
        if schema.classify(&payload.type_name) == Some(Category::Observable) {
            self.upsert_observable_inner(&payload, creator, markings)
        } else {
            self.upsert_domain_inner(&payload, creator, markings)
        }
    }

    /// Create or update a core relationship from a form payload.
    ///
    /// Returns `None` without touching the partitions when any of the
    /// three required relationship fields is missing.
    pub fn upsert_relationship(&mut self, payload: UpsertPayload) -> Option<ObjectId> {
        let (Some(source_ref), Some(target_ref), Some(relationship_type)) = (
            payload.source_ref.clone(),
            payload.target_ref.clone(),
            payload.relationship_type.clone(),
        ) else {
            return None;
        };

        let creator = self.absorb_created_by(payload.created_by.as_ref());
        let markings = self.absorb_markings(&payload.object_marking);

        let mut object = match self.take_relationship(payload.id.as_ref()) {
            Some(existing) => existing,
            None => Relationship {
                common: CommonFields {
                    id: payload
                        .id
                        .clone()
                        .unwrap_or_else(|| ObjectId::mint(crate::primitives::RELATIONSHIP_TYPE)),
                    type_name: crate::primitives::RELATIONSHIP_TYPE.to_string(),
                    ..CommonFields::default()
                },
                source_ref: source_ref.clone(),
                target_ref: target_ref.clone(),
                relationship_type: relationship_type.clone(),
            },
        };
        object.source_ref = source_ref;
        object.target_ref = target_ref;
        object.relationship_type = relationship_type;
        apply_common(&mut object.common, &payload, creator, markings);
        let id = object.common.id.clone();

        // Edited version first: it wins both collapse passes.
        self.relationships.insert(0, object);
        self.dedup_identity();
        self.dedup_relationship_fields();
        Some(id)
    }

    /// Create or update a container from a form payload.
    ///
    /// The payload carries the full membership list; `object_refs` is
    /// replaced, not merged.
    pub fn upsert_container(&mut self, payload: UpsertPayload) -> ObjectId {
        let creator = self.absorb_created_by(payload.created_by.as_ref());
        let markings = self.absorb_markings(&payload.object_marking);

        let mut object = match self.take_container(payload.id.as_ref()) {
            Some(existing) => existing,
            None => Container {
                common: CommonFields {
                    id: payload
                        .id
                        .clone()
                        .unwrap_or_else(|| ObjectId::mint(&payload.type_name)),
                    type_name: payload.type_name.clone(),
                    ..CommonFields::default()
                },
                name: None,
                object_refs: Vec::new(),
            },
        };
        if payload.name.is_some() {
            object.name = payload.name.clone();
        }
        object.object_refs = payload.object_refs.clone();
        apply_common(&mut object.common, &payload, creator, markings);
        let id = object.common.id.clone();

        // Edited version first: it wins both collapse passes.
        self.containers.insert(0, object);
        self.dedup_identity();
        self.dedup_container_fields();
        id
    }

    /// Add the union of `markings` to every object in `targets`.
    ///
    /// Missing marking definitions are synthesized into the
    /// domain-object partition first. Pure append: existing markings are
    /// never removed, duplicates are never introduced. Returns the
    /// resolved marking ids.
    pub fn apply_marking(
        &mut self,
        markings: &[MarkingRef],
        targets: &BTreeSet<ObjectId>,
    ) -> Vec<ObjectId> {
        let ids = self.absorb_markings(markings);
        for common in self.commons_mut() {
            if targets.contains(&common.id) {
                for marking in &ids {
                    if !common.object_marking_refs.contains(marking) {
                        common.object_marking_refs.push(marking.clone());
                    }
                }
            }
        }
        ids
    }

    // =========================================================================
    // INTERNALS
    // =========================================================================

    fn upsert_domain_inner(
        &mut self,
        payload: &UpsertPayload,
        creator: Option<ObjectId>,
        markings: Vec<ObjectId>,
    ) -> ObjectId {
        let existing = payload.id.as_ref().and_then(|id| {
            self.domain_objects
                .iter()
                .position(|o| &o.common.id == id)
                .map(|pos| self.domain_objects.remove(pos))
        });
        let mut object = match existing {
            Some(existing) => existing,
            None => {
                let (identity_class, location_type) =
                    derive_subtype(&payload.type_name, payload.role.as_deref());
                DomainObject {
                    common: CommonFields {
                        id: payload
                            .id
                            .clone()
                            .unwrap_or_else(|| ObjectId::mint(&payload.type_name)),
                        type_name: payload.type_name.clone(),
                        ..CommonFields::default()
                    },
                    name: None,
                    identity_class,
                    location_type,
                }
            }
        };
        if payload.name.is_some() {
            object.name = payload.name.clone();
        }
        apply_common(&mut object.common, payload, creator, markings);
        let id = object.common.id.clone();

        // Edited version first: it wins both collapse passes.
        self.domain_objects.insert(0, object);
        self.dedup_identity();
        self.dedup_domain_fields();
        id
    }

    fn upsert_observable_inner(
        &mut self,
        payload: &UpsertPayload,
        creator: Option<ObjectId>,
        markings: Vec<ObjectId>,
    ) -> ObjectId {
        let existing = payload.id.as_ref().and_then(|id| {
            self.observables
                .iter()
                .position(|o| &o.common.id == id)
                .map(|pos| self.observables.remove(pos))
        });
        let mut object = match existing {
            Some(existing) => existing,
            None => Observable {
                common: CommonFields {
                    id: payload
                        .id
                        .clone()
                        .unwrap_or_else(|| ObjectId::mint(&payload.type_name)),
                    type_name: payload.type_name.clone(),
                    ..CommonFields::default()
                },
                value: None,
            },
        };
        if payload.value.is_some() {
            object.value = payload.value.clone();
        }
        apply_common(&mut object.common, payload, creator, markings);
        let id = object.common.id.clone();

        // Edited version first: it wins both collapse passes.
        self.observables.insert(0, object);
        self.dedup_identity();
        self.dedup_observable_fields();
        id
    }

    /// Synthesize the created-by identity when needed; returns its id.
    fn absorb_created_by(&mut self, created_by: Option<&IdentityRef>) -> Option<ObjectId> {
        let reference = created_by?;
        let id = reference
            .id
            .clone()
            .unwrap_or_else(|| ObjectId::mint("identity"));
        if !self.contains(&id) {
            let role = reference.role.as_deref().unwrap_or("organization");
            self.domain_objects
                .push(entity_stub(id.clone(), role, &reference.name));
        }
        Some(id)
    }

    /// Synthesize missing marking definitions; returns the resolved ids.
    fn absorb_markings(&mut self, markings: &[MarkingRef]) -> Vec<ObjectId> {
        markings
            .iter()
            .map(|marking| {
                let id = marking
                    .id
                    .clone()
                    .unwrap_or_else(|| ObjectId::mint("marking-definition"));
                if !self.contains(&id) {
                    self.domain_objects.push(DomainObject {
                        common: CommonFields {
                            id: id.clone(),
                            type_name: "marking-definition".to_string(),
                            ..CommonFields::default()
                        },
                        name: Some(marking.definition.clone()),
                        identity_class: None,
                        location_type: None,
                    });
                }
                id
            })
            .collect()
    }

    fn take_relationship(&mut self, id: Option<&ObjectId>) -> Option<Relationship> {
        let id = id?;
        self.relationships
            .iter()
            .position(|o| &o.common.id == id)
            .map(|pos| self.relationships.remove(pos))
    }

    fn take_container(&mut self, id: Option<&ObjectId>) -> Option<Container> {
        let id = id?;
        self.containers
            .iter()
            .position(|o| &o.common.id == id)
            .map(|pos| self.containers.remove(pos))
    }
}

/// Shallow overwrite of the shared base fields present in the payload.
fn apply_common(
    common: &mut CommonFields,
    payload: &UpsertPayload,
    creator: Option<ObjectId>,
    markings: Vec<ObjectId>,
) {
    if creator.is_some() {
        common.created_by_ref = creator;
    }
    if !markings.is_empty() {
        common.object_marking_refs = markings;
    }
    if !payload.external_references.is_empty() {
        common.external_references = payload.external_references.clone();
    }
    for (key, value) in &payload.attributes {
        common.extra.insert(key.clone(), value.clone());
    }
}

// =============================================================================
// TESTS
// =============================================================================
