//! Core engine for the schema-driven data grid: change tracking against
//! a server baseline, minimal patch computation, and conflict
//! reconciliation while live server pushes race user edits.

pub mod annotate;
pub mod conflict;
pub mod diff;
pub mod materializer;
pub mod resolver;
pub mod schema;
pub mod session;
pub mod xpath_cache;

use rand::Rng;
use serde_json::Value;

pub use conflict::{Conflict, EditSession, EditState};
pub use diff::{diff_for_save, DiffError, SaveDiff};
pub use resolver::ElementRef;
pub use session::{GridModel, PushOutcome, SaveOutcome};
pub use xpath_cache::XPathCaches;

/// Object key carrying an element's persistent server-side identity.
pub const DB_ID: &str = "DB_ID";

/// Prefix shared by every transient client-side annotation key.
pub const XPATH_PREFIX: &str = "xpath_";

/// Annotation key for the transient row identifier on array elements.
pub const ROW_ID: &str = "xpath_row_id";

/// Minimum value for generated transient row ids.
pub const MIN_ROW_ID: u64 = 65_536;

/// Returns the stable identity of an entity, if it has one.
pub fn entity_id(value: &Value) -> Option<&Value> {
    match value {
        Value::Object(map) => map.get(DB_ID).filter(|id| !id.is_null()),
        _ => None,
    }
}

/// Canonical map-key form of a stable identity scalar.
///
/// Identities are arbitrary unique scalars (numeric or string); both
/// index maps in the cache manager key on this form.
pub fn id_key(id: &Value) -> Option<String> {
    match id {
        Value::Number(n) => Some(n.to_string()),
        Value::String(s) => Some(s.clone()),
        _ => None,
    }
}

/// Generates a random transient row id.
pub fn generate_row_id() -> u64 {
    let mut rng = rand::thread_rng();
    rng.gen_range(MIN_ROW_ID..=i64::MAX as u64)
}

/// Returns the crate version at compile time.
pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
