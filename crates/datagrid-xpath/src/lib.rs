//! Schema-path ("xpath") primitives for the datagrid engine.
//!
//! A schema path identifies a field's logical position in a nested
//! entity, e.g. `orders.items[1].price`. Array indices in a schema path
//! are recorded at declaration time and may go stale as the live array
//! is mutated; resolving them against a live graph is the job of the
//! core crate. This crate owns the parsed path value type and the plain
//! positional access it provides over `serde_json::Value` trees.

mod access;
mod path;

pub use path::{Segment, XPath, XPathError};
