//! # Fixed Primitives
//!
//! Hardcoded constants for the Workbench bundle engine.
//!
//! The container-type set and the pseudo domain types are fixed by the
//! data model; the two ordinary type-name lists are injected through
//! [`crate::schema::TypeSchema`] and never hardcoded outside it.

/// Type tag of the bundle envelope produced by export and consumed by load.
pub const BUNDLE_TYPE: &str = "bundle";

/// Type tag of core relationships.
pub const RELATIONSHIP_TYPE: &str = "relationship";

/// The fixed container-type set (report/note/grouping/case family).
///
/// A type in this set is a Container even when it also appears in the
/// injected domain-type list.
pub const CONTAINER_TYPES: &[&str] = &[
    "report",
    "grouping",
    "note",
    "opinion",
    "observed-data",
    "case-incident",
    "case-rfi",
    "case-rft",
    "task",
    "feedback",
];

/// Pseudo domain types classified as Domain Objects even when the injected
/// domain-type list omits them.
pub const PSEUDO_DOMAIN_TYPES: &[&str] = &["marking-definition", "identity", "location"];

// =============================================================================
// INPUT VALIDATION LIMITS
// =============================================================================

/// Maximum byte size of a bundle document accepted by the parser.
///
/// Validated BEFORE deserialization to prevent allocation-based DoS from
/// oversized uploads.
pub const MAX_DOCUMENT_SIZE: usize = 50 * 1024 * 1024;

/// Maximum number of objects in a single bundle document.
pub const MAX_BUNDLE_OBJECTS: usize = 100_000;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn container_set_covers_case_family() {
        assert!(CONTAINER_TYPES.contains(&"report"));
        assert!(CONTAINER_TYPES.contains(&"case-incident"));
        assert!(!CONTAINER_TYPES.contains(&"threat-actor"));
    }

    #[test]
    fn pseudo_domain_types_fixed() {
        assert_eq!(
            PSEUDO_DOMAIN_TYPES,
            &["marking-definition", "identity", "location"]
        );
    }
}
