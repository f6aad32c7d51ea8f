//! # workbench-core
//!
//! The in-memory bundle graph engine for Workbench - THE ENGINE.
//!
//! This crate keeps a staged, not-yet-imported collection of
//! threat-intelligence objects internally consistent while a user adds,
//! edits, retypes, deletes or bulk-selects them — with no backing
//! database, no server-side transaction, and no schema enforcement
//! beyond what the engine itself performs.
//!
//! ## Architecture
//!
//! - Four disjoint partitions (domain objects, observables,
//!   relationships, containers), classified by an injected type schema
//! - Every mutation entry point is a synchronous state transition over
//!   the owned [`Bundle`] aggregate; there is exactly one mutator
//! - Cross-object references are plain string ids, never owning
//!   pointers; the cascade engine repairs them after deletions
//! - Errors exist only at the document boundary — mutations normalize
//!   silently instead of raising
//!
//! ## Architectural Constraints
//!
//! The ENGINE:
//! - Has NO async, NO network, NO file I/O (pure Rust)
//! - Never fetches schema lists; they are injected per call site
//! - Never persists; the app layer serializes the exported snapshot

// =============================================================================
// MODULES
// =============================================================================

pub mod bundle;
pub mod cascade;
pub mod context;
pub mod dedup;
pub mod export;
pub mod primitives;
pub mod retype;
pub mod schema;
pub mod types;
pub mod upsert;

// =============================================================================
// RE-EXPORTS: Core Types (from types module)
// =============================================================================

pub use types::{
    BundleObject, CommonFields, Container, DomainObject, ExternalReference, ObjectId, Observable,
    RawObject, Relationship, WorkbenchError,
};

// =============================================================================
// RE-EXPORTS: Engine
// =============================================================================

pub use bundle::{Bundle, BundleCounts};
pub use context::{ContextSelections, Counterpart};
pub use export::BundleDocument;
pub use schema::{
    AttributeCatalog, AttributeKind, Category, StandardCatalog, TypeSchema, allowed_context_kinds,
    is_container_type, is_pseudo_domain_type,
};
pub use upsert::{IdentityRef, MarkingRef, UpsertPayload};
