//! Roster configuration: loading, schema, validation.
//!
//! The roster is pure data handed to the orchestrator at construction, not
//! ambient global state, so the core stays testable with synthetic tables.

pub mod loader;
pub mod schema;

pub use loader::{load_from_path, load_from_str, ConfigError};
pub use schema::{Meta, Roster, TargetEntry, ValidationError, ValidationIssue};
