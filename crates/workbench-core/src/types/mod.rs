//! # Core Type Definitions
//!
//! This module contains all core types for the Workbench bundle engine:
//! - Object identifiers (`ObjectId`)
//! - The wire representation of a bundle member (`RawObject`)
//! - The classified tagged union over the four categories (`BundleObject`)
//! - Error types (`WorkbenchError`)
//!
//! ## Reference Model
//!
//! Every cross-object reference in the bundle is a plain string id looked
//! up through the store, never an owning pointer. Cascade and purge logic
//! depend on being able to delete a referent while reference values to it
//! still exist transiently.

use crate::schema::Category;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;
use uuid::Uuid;

// =============================================================================
// OBJECT IDENTIFIERS
// =============================================================================

/// Unique identifier of a bundle member, format `<type>--<uuid>`.
///
/// The type prefix is minted lowercase and must match the object's actual
/// type tag. Ids are globally unique across all four partitions.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ObjectId(pub String);

impl ObjectId {
    /// Create an id from an existing string (loaded documents preserve ids).
    #[must_use]
    pub fn new(s: impl Into<String>) -> Self {
        Self(s.into())
    }

    /// Mint a fresh id for the given type tag.
    #[must_use]
    pub fn mint(type_name: &str) -> Self {
        Self(format!("{}--{}", type_name.to_lowercase(), Uuid::new_v4()))
    }

    /// Get the id as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The type prefix before the `--` separator, if present.
    #[must_use]
    pub fn type_prefix(&self) -> Option<&str> {
        self.0.split_once("--").map(|(prefix, _)| prefix)
    }

    /// Check whether the id prefix matches a type tag (case-insensitive).
    #[must_use]
    pub fn matches_type(&self, type_name: &str) -> bool {
        self.type_prefix()
            .is_some_and(|prefix| prefix.eq_ignore_ascii_case(type_name))
    }
}

impl std::fmt::Display for ObjectId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl Default for ObjectId {
    fn default() -> Self {
        Self(String::new())
    }
}

// =============================================================================
// EXTERNAL REFERENCES
// =============================================================================

/// An embedded reference record. Not a graph edge: deleting the referenced
/// source never ripples into the bundle.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExternalReference {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub external_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

// =============================================================================
// RAW OBJECT (WIRE FORM)
// =============================================================================

/// A bundle member as it appears in an external document, before
/// classification. Unknown fields round-trip untouched through `extra`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawObject {
    pub id: ObjectId,

    #[serde(rename = "type")]
    pub type_name: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_by_ref: Option<ObjectId>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub object_marking_refs: Vec<ObjectId>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub labels: Vec<String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub external_references: Vec<ExternalReference>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub identity_class: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub x_opencti_location_type: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_ref: Option<ObjectId>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_ref: Option<ObjectId>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub relationship_type: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub object_refs: Option<Vec<ObjectId>>,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl RawObject {
    /// Create a bare wire object with only id and type set.
    #[must_use]
    pub fn bare(id: ObjectId, type_name: impl Into<String>) -> Self {
        Self {
            id,
            type_name: type_name.into(),
            created_by_ref: None,
            object_marking_refs: Vec::new(),
            labels: Vec::new(),
            external_references: Vec::new(),
            name: None,
            value: None,
            identity_class: None,
            x_opencti_location_type: None,
            source_ref: None,
            target_ref: None,
            relationship_type: None,
            object_refs: None,
            extra: Map::new(),
        }
    }
}

// =============================================================================
// SHARED BASE FIELDS
// =============================================================================

/// The base-field set shared by every category.
///
/// `created_by_ref` and `object_marking_refs` are weak references into the
/// domain-object partition. `extra` holds every attribute
/// the engine does not interpret; it is merged and exported as-is.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CommonFields {
    pub id: ObjectId,
    pub type_name: String,
    pub created_by_ref: Option<ObjectId>,
    pub object_marking_refs: Vec<ObjectId>,
    pub labels: Vec<String>,
    pub external_references: Vec<ExternalReference>,
    pub extra: Map<String, Value>,
}

impl CommonFields {
    /// Base fields for a freshly minted object of the given type.
    #[must_use]
    pub fn minted(type_name: &str) -> Self {
        Self {
            id: ObjectId::mint(type_name),
            type_name: type_name.to_string(),
            ..Self::default()
        }
    }
}

// =============================================================================
// CATEGORY STRUCTS
// =============================================================================

/// A conceptual entity: threat actor, identity, location, marking
/// definition and the rest of the injected domain-type list.
#[derive(Debug, Clone, PartialEq)]
pub struct DomainObject {
    pub common: CommonFields,
    pub name: Option<String>,
    pub identity_class: Option<String>,
    /// Serialized as `x_opencti_location_type`.
    pub location_type: Option<String>,
}

/// A technical artifact: IP address, domain name, file hash, ...
#[derive(Debug, Clone, PartialEq)]
pub struct Observable {
    pub common: CommonFields,
    pub value: Option<String>,
}

/// A directed, typed edge between two bundle members. Both endpoint
/// references are weak; existence is not enforced at creation time.
#[derive(Debug, Clone, PartialEq)]
pub struct Relationship {
    pub common: CommonFields,
    pub source_ref: ObjectId,
    pub target_ref: ObjectId,
    pub relationship_type: String,
}

impl Relationship {
    /// Mint a new relationship linking `source` to `target`.
    #[must_use]
    pub fn link(relationship_type: &str, source: ObjectId, target: ObjectId) -> Self {
        Self {
            common: CommonFields::minted(crate::primitives::RELATIONSHIP_TYPE),
            source_ref: source,
            target_ref: target,
            relationship_type: relationship_type.to_string(),
        }
    }
}

/// A bundle member that groups other members by an ordered membership
/// list (`object_refs`), not by graph edges.
#[derive(Debug, Clone, PartialEq)]
pub struct Container {
    pub common: CommonFields,
    pub name: Option<String>,
    pub object_refs: Vec<ObjectId>,
}

// =============================================================================
// BUNDLE OBJECT (TAGGED UNION)
// =============================================================================

/// A classified bundle member. The four categories are disjoint; an object
/// lives in exactly one partition of the store.
#[derive(Debug, Clone, PartialEq)]
pub enum BundleObject {
    Domain(DomainObject),
    Observable(Observable),
    Relationship(Relationship),
    Container(Container),
}

impl BundleObject {
    /// The object's id.
    #[must_use]
    pub fn id(&self) -> &ObjectId {
        &self.common().id
    }

    /// The object's type tag.
    #[must_use]
    pub fn type_name(&self) -> &str {
        &self.common().type_name
    }

    /// The category this object is classified under.
    #[must_use]
    pub fn category(&self) -> Category {
        match self {
            Self::Domain(_) => Category::Domain,
            Self::Observable(_) => Category::Observable,
            Self::Relationship(_) => Category::Relationship,
            Self::Container(_) => Category::Container,
        }
    }

    /// Shared base fields.
    #[must_use]
    pub fn common(&self) -> &CommonFields {
        match self {
            Self::Domain(o) => &o.common,
            Self::Observable(o) => &o.common,
            Self::Relationship(o) => &o.common,
            Self::Container(o) => &o.common,
        }
    }

    /// Shared base fields, mutable.
    pub fn common_mut(&mut self) -> &mut CommonFields {
        match self {
            Self::Domain(o) => &mut o.common,
            Self::Observable(o) => &mut o.common,
            Self::Relationship(o) => &mut o.common,
            Self::Container(o) => &mut o.common,
        }
    }

    /// Classify a wire object into its category struct.
    ///
    /// Returns `None` for a relationship missing one of its three required
    /// fields; such objects cannot participate in the graph and are skipped
    /// by the loader.
    #[must_use]
    pub fn from_raw(raw: RawObject, category: Category) -> Option<Self> {
        let RawObject {
            id,
            type_name,
            created_by_ref,
            object_marking_refs,
            labels,
            external_references,
            name,
            value,
            identity_class,
            x_opencti_location_type,
            source_ref,
            target_ref,
            relationship_type,
            object_refs,
            mut extra,
        } = raw;

        // Typed fields that do not belong to the target category are folded
        // back into `extra` so nothing is lost across load -> export.
        let mut keep = |key: &str, val: Option<Value>| {
            if let Some(v) = val {
                extra.insert(key.to_string(), v);
            }
        };

        let object = match category {
            Category::Domain => {
                keep("value", value.map(Value::String));
                keep("object_refs", object_refs.map(refs_to_value));
                Self::Domain(DomainObject {
                    common: CommonFields {
                        id,
                        type_name,
                        created_by_ref,
                        object_marking_refs,
                        labels,
                        external_references,
                        extra,
                    },
                    name,
                    identity_class,
                    location_type: x_opencti_location_type,
                })
            }
            Category::Observable => {
                keep("name", name.map(Value::String));
                Self::Observable(Observable {
                    common: CommonFields {
                        id,
                        type_name,
                        created_by_ref,
                        object_marking_refs,
                        labels,
                        external_references,
                        extra,
                    },
                    value,
                })
            }
            Category::Relationship => {
                keep("name", name.map(Value::String));
                Self::Relationship(Relationship {
                    common: CommonFields {
                        id,
                        type_name,
                        created_by_ref,
                        object_marking_refs,
                        labels,
                        external_references,
                        extra,
                    },
                    source_ref: source_ref?,
                    target_ref: target_ref?,
                    relationship_type: relationship_type?,
                })
            }
            Category::Container => {
                keep("value", value.map(Value::String));
                Self::Container(Container {
                    common: CommonFields {
                        id,
                        type_name,
                        created_by_ref,
                        object_marking_refs,
                        labels,
                        external_references,
                        extra,
                    },
                    name,
                    object_refs: object_refs.unwrap_or_default(),
                })
            }
        };
        Some(object)
    }

    /// Flatten back to the wire form for export.
    #[must_use]
    pub fn to_raw(&self) -> RawObject {
        let common = self.common().clone();
        let mut raw = RawObject::bare(common.id, common.type_name);
        raw.created_by_ref = common.created_by_ref;
        raw.object_marking_refs = common.object_marking_refs;
        raw.labels = common.labels;
        raw.external_references = common.external_references;
        raw.extra = common.extra;

        match self {
            Self::Domain(o) => {
                raw.name = o.name.clone();
                raw.identity_class = o.identity_class.clone();
                raw.x_opencti_location_type = o.location_type.clone();
            }
            Self::Observable(o) => {
                raw.value = o.value.clone();
            }
            Self::Relationship(o) => {
                raw.source_ref = Some(o.source_ref.clone());
                raw.target_ref = Some(o.target_ref.clone());
                raw.relationship_type = Some(o.relationship_type.clone());
            }
            Self::Container(o) => {
                raw.name = o.name.clone();
                raw.object_refs = Some(o.object_refs.clone());
            }
        }
        raw
    }
}

fn refs_to_value(refs: Vec<ObjectId>) -> Value {
    Value::Array(refs.into_iter().map(|r| Value::String(r.0)).collect())
}

// =============================================================================
// ERROR TYPES
// =============================================================================

/// Errors at the document boundary.
///
/// Engine mutations never fail: deleting a missing id is a no-op, unknown
/// payload fields are stored as-is, duplicates collapse rather than reject.
/// Errors exist only where external documents enter or leave the engine.
#[derive(Debug, Error)]
pub enum WorkbenchError {
    /// The supplied document is not a well-formed bundle.
    #[error("Invalid bundle document: {0}")]
    InvalidDocument(String),

    /// A serialization or deserialization error occurred.
    #[error("Serialization error: {0}")]
    SerializationError(String),

    /// An I/O error occurred (app layer only).
    #[error("I/O error: {0}")]
    IoError(String),
}

// =============================================================================
// TESTS
// =============================================================================
