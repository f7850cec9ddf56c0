//! Schema-path resolution against a live, mutating object graph.
//!
//! A schema path carries array indices recorded at declaration time;
//! the live arrays may have shuffled since. Resolution walks the path
//! and replaces each stale index with the live position of the element
//! whose own annotation matches the accumulated schema prefix. The
//! result is a data path that is safe for direct get/set right now.
//!
//! Resolution failure is an `Option::None`, never an error: transient
//! misses (row not materialized, mid-mutation state) are expected and
//! callers must simply not proceed with that particular access.

use serde_json::Value;

use datagrid_xpath::{Segment, XPath};

use crate::annotate::element_prefix;
use crate::xpath_cache::{PositionCache, XPathCaches};
use crate::{entity_id, id_key};

/// Reference to one array element: by stable identity or by schema
/// position. When both are available the identity branch is tried
/// first.
#[derive(Debug, Clone, PartialEq)]
pub enum ElementRef {
    ById(Value),
    ByPosition(XPath),
}

/// Resolves a schema path into a data path against the live graph.
///
/// O(depth x array length). Correct with no cache at all; the assisted
/// variants below only shortcut this walk, never change its result.
pub fn resolve(root: &Value, path: &XPath) -> Option<XPath> {
    if path.has_pending() {
        // Not-yet-materialized marker: handed back to the caller as-is.
        return Some(path.clone());
    }
    let mut schema = XPath::root();
    let mut data = XPath::root();
    for (pos, seg) in path.segments().iter().enumerate() {
        match seg {
            Segment::Field(name) => {
                schema.push(Segment::Field(name.clone()));
                data.push(Segment::Field(name.clone()));
            }
            Segment::Index(index) => {
                schema.push(Segment::Index(*index));
                if pos == 0 {
                    // Root-level repeated-entity view: the leading index
                    // is taken literally, there are no sibling
                    // annotations to check it against.
                    data.push(Segment::Index(*index));
                    continue;
                }
                let arr = data.value_at(root)?.as_array()?;
                let live = arr
                    .iter()
                    .position(|el| element_prefix(el).is_some_and(|prefix| prefix == schema))?;
                data.push(Segment::Index(live));
            }
            Segment::Pending => return Some(path.clone()),
        }
    }
    Some(data)
}

/// Position-cache-assisted variant for one specific array.
///
/// When the path's final array step is a cache hit, the cached index is
/// substituted directly and the linear scan skipped; a miss or a stale
/// entry falls back to the uncached algorithm.
pub fn resolve_with_positions(
    root: &Value,
    path: &XPath,
    positions: &PositionCache,
) -> Option<XPath> {
    if path.has_pending() {
        return Some(path.clone());
    }
    let Some(last) = path.last_index_position() else {
        return resolve(root, path);
    };
    let element = path.slice(0, last + 1);
    let Some(index) = positions.get(&element.to_string()) else {
        return resolve(root, path);
    };
    let Some(data_prefix) = resolve(root, &path.slice(0, last)) else {
        return resolve(root, path);
    };
    let candidate = data_prefix.child(Segment::Index(index));
    match candidate.value_at(root) {
        Some(el) if element_prefix(el).is_some_and(|prefix| prefix == element) => {
            Some(candidate.join(&path.slice(last + 1, path.len())))
        }
        _ => resolve(root, path),
    }
}

/// Identity-assisted variant.
///
/// Reads the element at the stale schema position from `baseline` to
/// learn its identity, then jumps through the identity -> data-path
/// index. O(1) on the happy path; the element at the cached position is
/// verified to still carry the identity before being trusted, and any
/// miss falls back to the full resolver.
pub fn resolve_by_identity(
    root: &Value,
    path: &XPath,
    baseline: &Value,
    caches: &XPathCaches,
) -> Option<XPath> {
    if path.has_pending() {
        return Some(path.clone());
    }
    match identity_fast_path(root, path, baseline, caches) {
        Some(found) => Some(found),
        None => resolve(root, path),
    }
}

fn identity_fast_path(
    root: &Value,
    path: &XPath,
    baseline: &Value,
    caches: &XPathCaches,
) -> Option<XPath> {
    let last = path.last_index_position()?;
    let element = path.slice(0, last + 1);
    let stale = element.value_at(baseline)?;
    let id = entity_id(stale)?;
    let key = id_key(id)?;
    let data_element = XPath::parse(caches.data_path_for_id(&key)?).ok()?;
    let live = data_element.value_at(root)?;
    if entity_id(live) != Some(id) {
        return None;
    }
    Some(data_element.join(&path.slice(last + 1, path.len())))
}

/// Explicit identity-or-position element lookup.
pub fn locate_element(root: &Value, element: &ElementRef, caches: &XPathCaches) -> Option<XPath> {
    match element {
        ElementRef::ById(id) => {
            let key = id_key(id)?;
            let data = XPath::parse(caches.data_path_for_id(&key)?).ok()?;
            let live = data.value_at(root)?;
            (entity_id(live) == Some(id)).then_some(data)
        }
        ElementRef::ByPosition(path) => resolve(root, path),
    }
}
