//! # Type Classifier
//!
//! Pure classification of raw type tags into the four bundle categories.
//!
//! The two ordinary type-name lists (domain-object subtypes, observable
//! subtypes) are injected by the schema collaborator; the engine never
//! fetches or caches them itself. The container-type set and the pseudo
//! domain types are fixed in [`crate::primitives`].
//!
//! Also hosts the two small, type-indexed tables consumed by the outer
//! layers: the allowed directional context kinds per concrete type, and
//! the attribute catalog used by the upsert payload builder.

use crate::primitives::{CONTAINER_TYPES, PSEUDO_DOMAIN_TYPES, RELATIONSHIP_TYPE};
use crate::types::RawObject;
use std::collections::BTreeSet;

// =============================================================================
// CATEGORY
// =============================================================================

/// The four disjoint bundle categories.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Category {
    /// A conceptual entity (threat actor, identity, location, ...).
    Domain,
    /// A technical artifact (IP address, file hash, ...).
    Observable,
    /// A directed, typed edge between two bundle members.
    Relationship,
    /// A member grouping other members by membership list.
    Container,
}

// =============================================================================
// FIXED PREDICATES
// =============================================================================

/// Check whether a type tag belongs to the fixed container-type set.
#[must_use]
pub fn is_container_type(type_name: &str) -> bool {
    CONTAINER_TYPES
        .iter()
        .any(|t| t.eq_ignore_ascii_case(type_name))
}

/// Check whether a type tag is one of the fixed pseudo domain types.
#[must_use]
pub fn is_pseudo_domain_type(type_name: &str) -> bool {
    PSEUDO_DOMAIN_TYPES
        .iter()
        .any(|t| t.eq_ignore_ascii_case(type_name))
}

// =============================================================================
// TYPE SCHEMA
// =============================================================================

/// The injected classification table.
///
/// Holds the two externally supplied type-name lists, normalized to
/// lowercase. Swappable for tests; [`TypeSchema::builtin`] carries the
/// stock lists shipped with the application.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TypeSchema {
    domain_types: BTreeSet<String>,
    observable_types: BTreeSet<String>,
}

impl TypeSchema {
    /// Build a schema from the two injected lists.
    #[must_use]
    pub fn new<D, O>(domain_types: D, observable_types: O) -> Self
    where
        D: IntoIterator,
        D::Item: AsRef<str>,
        O: IntoIterator,
        O::Item: AsRef<str>,
    {
        Self {
            domain_types: domain_types
                .into_iter()
                .map(|t| t.as_ref().to_lowercase())
                .collect(),
            observable_types: observable_types
                .into_iter()
                .map(|t| t.as_ref().to_lowercase())
                .collect(),
        }
    }

    /// The stock type lists.
    #[must_use]
    pub fn builtin() -> Self {
        Self::new(
            [
                "attack-pattern",
                "campaign",
                "channel",
                "course-of-action",
                "data-component",
                "data-source",
                "event",
                "identity",
                "incident",
                "indicator",
                "infrastructure",
                "intrusion-set",
                "location",
                "malware",
                "malware-analysis",
                "narrative",
                "threat-actor",
                "tool",
                "vulnerability",
            ],
            [
                "artifact",
                "autonomous-system",
                "bank-account",
                "cryptocurrency-wallet",
                "directory",
                "domain-name",
                "email-addr",
                "email-message",
                "file",
                "hostname",
                "ipv4-addr",
                "ipv6-addr",
                "mac-addr",
                "mutex",
                "network-traffic",
                "payment-card",
                "phone-number",
                "process",
                "software",
                "text",
                "url",
                "user-account",
                "windows-registry-key",
            ],
        )
    }

    /// Number of injected type names (both lists).
    #[must_use]
    pub fn len(&self) -> usize {
        self.domain_types.len() + self.observable_types.len()
    }

    /// True when both injected lists are empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.domain_types.is_empty() && self.observable_types.is_empty()
    }

    /// Classify a type tag into its category.
    ///
    /// Precedence: relationship, then the fixed container set, then the
    /// observable list, then the domain list plus pseudo types. The
    /// container carve-out means a type present in both the domain list
    /// and the container set classifies as Container. Returns `None` for
    /// a tag in neither list; the loader skips and counts such objects.
    #[must_use]
    pub fn classify(&self, type_name: &str) -> Option<Category> {
        let lowered = type_name.to_lowercase();
        if lowered == RELATIONSHIP_TYPE {
            Some(Category::Relationship)
        } else if is_container_type(&lowered) {
            Some(Category::Container)
        } else if self.observable_types.contains(&lowered) {
            Some(Category::Observable)
        } else if self.domain_types.contains(&lowered) || is_pseudo_domain_type(&lowered) {
            Some(Category::Domain)
        } else {
            None
        }
    }

    /// Classify a wire object by its type tag.
    #[must_use]
    pub fn classify_raw(&self, raw: &RawObject) -> Option<Category> {
        self.classify(&raw.type_name)
    }
}

// =============================================================================
// CONTEXT RELATIONSHIP KINDS
// =============================================================================

/// Directional relationship kinds every entity type supports.
const COMMON_KINDS: &[&str] = &["related-to_from", "related-to_to"];

/// The fixed, type-indexed table of directional relationship kinds an
/// anchor's concrete type supports in context reconciliation.
///
/// Keys are `<relationship-type>_<from|to>`: `from` means the anchor is
/// the relationship source, `to` means it is the target. Kinds absent
/// from the anchor's row are ignored by the reconciler.
#[must_use]
pub fn allowed_context_kinds(anchor_type: &str) -> &'static [&'static str] {
    match anchor_type.to_lowercase().as_str() {
        "threat-actor" => &[
            "targets_from",
            "uses_from",
            "attributed-to_from",
            "located-at_from",
            "impersonates_from",
            "compromises_from",
            "hosts_from",
            "participates-in_from",
            "attributed-to_to",
            "targets_to",
            "related-to_from",
            "related-to_to",
        ],
        "intrusion-set" | "campaign" => &[
            "targets_from",
            "uses_from",
            "attributed-to_from",
            "originates-from_from",
            "compromises_from",
            "attributed-to_to",
            "related-to_from",
            "related-to_to",
        ],
        "incident" => &[
            "targets_from",
            "uses_from",
            "attributed-to_from",
            "located-at_from",
            "related-to_from",
            "related-to_to",
        ],
        "malware" => &[
            "targets_from",
            "uses_from",
            "exploits_from",
            "communicates-with_from",
            "downloads_from",
            "drops_from",
            "originates-from_from",
            "uses_to",
            "delivers_to",
            "indicates_to",
            "related-to_from",
            "related-to_to",
        ],
        "tool" => &[
            "targets_from",
            "uses_from",
            "delivers_from",
            "drops_from",
            "uses_to",
            "related-to_from",
            "related-to_to",
        ],
        "attack-pattern" => &[
            "targets_from",
            "uses_from",
            "subtechnique-of_from",
            "uses_to",
            "indicates_to",
            "related-to_from",
            "related-to_to",
        ],
        "indicator" => &[
            "indicates_from",
            "based-on_from",
            "related-to_from",
            "related-to_to",
        ],
        "infrastructure" => &[
            "communicates-with_from",
            "consists-of_from",
            "controls_from",
            "delivers_from",
            "hosts_from",
            "uses_from",
            "uses_to",
            "related-to_from",
            "related-to_to",
        ],
        "identity" | "location" => &[
            "located-at_from",
            "targets_to",
            "attributed-to_to",
            "located-at_to",
            "related-to_from",
            "related-to_to",
        ],
        _ => COMMON_KINDS,
    }
}

// =============================================================================
// ATTRIBUTE CATALOG
// =============================================================================

/// Widget/coercion kind of an editable attribute.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttributeKind {
    Text,
    Date,
    Boolean,
    Numeric,
    Markdown,
}

/// The attribute-schema collaborator: which kind each editable attribute
/// has for a concrete type. Consumed only by the upsert payload builder,
/// never by the core invariants.
pub trait AttributeCatalog {
    /// Coercion kind for `attribute` on objects of type `type_name`.
    fn kind_of(&self, type_name: &str, attribute: &str) -> AttributeKind;
}

/// The stock catalog: kind by attribute name, uniform across types.
#[derive(Debug, Clone, Copy, Default)]
pub struct StandardCatalog;

impl AttributeCatalog for StandardCatalog {
    fn kind_of(&self, _type_name: &str, attribute: &str) -> AttributeKind {
        match attribute {
            "created" | "modified" | "published" | "first_seen" | "last_seen" | "valid_from"
            | "valid_until" | "start_time" | "stop_time" => AttributeKind::Date,
            "revoked" | "is_family" | "x_opencti_detection" => AttributeKind::Boolean,
            "confidence" | "number_observed" | "number" | "x_opencti_score" => {
                AttributeKind::Numeric
            }
            "description" | "content" | "objective" | "x_opencti_description" => {
                AttributeKind::Markdown
            }
            _ => AttributeKind::Text,
        }
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classify_relationship_tag() {
        let schema = TypeSchema::builtin();
        assert_eq!(schema.classify("relationship"), Some(Category::Relationship));
    }

    #[test]
    fn classify_container_wins_over_domain_list() {
        // "report" in the domain list must still classify as a container.
        let schema = TypeSchema::new(["report", "threat-actor"], ["ipv4-addr"]);
        assert_eq!(schema.classify("report"), Some(Category::Container));
        assert_eq!(schema.classify("threat-actor"), Some(Category::Domain));
    }

    #[test]
    fn classify_pseudo_types_without_domain_list() {
        let schema = TypeSchema::new(Vec::<String>::new(), Vec::<String>::new());
        assert_eq!(schema.classify("marking-definition"), Some(Category::Domain));
        assert_eq!(schema.classify("identity"), Some(Category::Domain));
        assert_eq!(schema.classify("location"), Some(Category::Domain));
    }

    #[test]
    fn classify_is_case_insensitive() {
        let schema = TypeSchema::builtin();
        assert_eq!(schema.classify("IPv4-Addr"), Some(Category::Observable));
        assert_eq!(schema.classify("Threat-Actor"), Some(Category::Domain));
    }

    #[test]
    fn classify_unknown_type_is_none() {
        let schema = TypeSchema::builtin();
        assert_eq!(schema.classify("flux-capacitor"), None);
    }

    #[test]
    fn context_kinds_indexed_by_type() {
        assert!(allowed_context_kinds("threat-actor").contains(&"uses_from"));
        assert!(allowed_context_kinds("Threat-Actor").contains(&"targets_to"));
        // Unlisted types fall back to the generic kinds only.
        assert_eq!(allowed_context_kinds("vulnerability"), COMMON_KINDS);
    }

    #[test]
    fn standard_catalog_kinds() {
        let catalog = StandardCatalog;
        assert_eq!(
            catalog.kind_of("report", "published"),
            AttributeKind::Date
        );
        assert_eq!(
            catalog.kind_of("indicator", "confidence"),
            AttributeKind::Numeric
        );
        assert_eq!(
            catalog.kind_of("malware", "is_family"),
            AttributeKind::Boolean
        );
        assert_eq!(catalog.kind_of("malware", "name"), AttributeKind::Text);
    }
}
