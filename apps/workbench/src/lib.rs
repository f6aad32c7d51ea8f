//! # Workbench Application Library
//!
//! Shared surface between the `workbench` binary and its integration
//! tests: the HTTP API (axum router, handlers, wire types) and the CLI
//! command implementations.

pub mod api;
pub mod cli;
