//! datagrid-util - generic JSON value helpers for the datagrid engine.
//!
//! Everything here is domain-agnostic: deep equality and cloning over
//! `serde_json::Value`, plus annotation-aware twins that ignore
//! transient client-side keys identified by a caller-supplied prefix.

pub mod is_empty;
pub mod json_clone;
pub mod json_equal;

// Re-exports for convenience
pub use is_empty::is_empty_value;
pub use json_clone::{clone_stripped, deep_clone};
pub use json_equal::{deep_equal, deep_equal_data};
