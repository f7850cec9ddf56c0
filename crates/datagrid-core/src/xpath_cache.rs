//! Multi-index xpath cache.
//!
//! Per tracked array (keyed by the array's own schema path) a position
//! cache maps each element's schema path to its current live index.
//! Globally, two identity-keyed indices record where an element lives
//! conceptually (schema path) and physically (data path). Insert and
//! remove notifications maintain the position cache with pure index
//! arithmetic; no rescan of the live array is ever required.

use std::collections::HashMap;

use serde_json::Value;

use datagrid_xpath::{Segment, XPath};

use crate::annotate::element_prefix;
use crate::{entity_id, id_key};

/// Position index for one tracked array: element schema path -> current
/// index in the live array.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PositionCache {
    positions: HashMap<String, usize>,
}

impl PositionCache {
    pub fn get(&self, element_schema_path: &str) -> Option<usize> {
        self.positions.get(element_schema_path).copied()
    }

    pub fn len(&self) -> usize {
        self.positions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, usize)> {
        self.positions.iter().map(|(k, v)| (k.as_str(), *v))
    }

    /// Next unused declaration index for new rows: one past the highest
    /// index any cached element was declared at. Stays unique across
    /// removals, unlike the live array length.
    pub fn next_declaration_index(&self) -> usize {
        self.positions
            .keys()
            .filter_map(|key| trailing_index(key))
            .max()
            .map_or(0, |n| n + 1)
    }
}

fn trailing_index(element_schema_path: &str) -> Option<usize> {
    XPath::parse(element_schema_path).ok()?.last()?.as_index()
}

#[derive(Debug, Clone, Default)]
pub struct XPathCaches {
    arrays: HashMap<String, PositionCache>,
    id_schema_paths: HashMap<String, String>,
    id_data_paths: HashMap<String, String>,
}

impl XPathCaches {
    pub fn new() -> Self {
        Self::default()
    }

    /// Scans `array` once and (re)builds its position cache, refreshing
    /// the identity indices for every identity-bearing element.
    ///
    /// Elements without an annotation are skipped; non-array input
    /// yields an empty cache without error.
    pub fn rebuild_array(&mut self, array: &Value, array_path: &XPath) {
        let mut cache = PositionCache::default();
        if let Value::Array(arr) = array {
            for (index, el) in arr.iter().enumerate() {
                let Some(prefix) = element_prefix(el) else {
                    continue;
                };
                cache.positions.insert(prefix.to_string(), index);
                if let Some(key) = entity_id(el).and_then(id_key) {
                    self.id_schema_paths.insert(key.clone(), prefix.to_string());
                    self.id_data_paths
                        .insert(key, array_path.child(Segment::Index(index)).to_string());
                }
            }
        }
        self.arrays.insert(array_path.to_string(), cache);
    }

    pub fn positions(&self, array_path: &XPath) -> Option<&PositionCache> {
        self.arrays.get(&array_path.to_string())
    }

    pub fn position(&self, element_schema_path: &XPath, array_path: &XPath) -> Option<usize> {
        self.positions(array_path)?
            .get(&element_schema_path.to_string())
    }

    /// An element was physically inserted at `index`: shift every cached
    /// position at or after it, then record the new element.
    pub fn notify_insert(
        &mut self,
        array_path: &XPath,
        element_schema_path: &XPath,
        index: usize,
    ) {
        let cache = self.arrays.entry(array_path.to_string()).or_default();
        for pos in cache.positions.values_mut() {
            if *pos >= index {
                *pos += 1;
            }
        }
        cache
            .positions
            .insert(element_schema_path.to_string(), index);
    }

    /// An element was physically removed from `index`: drop its entry
    /// and shift every cached position after it.
    pub fn notify_remove(
        &mut self,
        array_path: &XPath,
        element_schema_path: &XPath,
        index: usize,
    ) {
        let Some(cache) = self.arrays.get_mut(&array_path.to_string()) else {
            return;
        };
        cache.positions.remove(&element_schema_path.to_string());
        for pos in cache.positions.values_mut() {
            if *pos > index {
                *pos -= 1;
            }
        }
    }

    pub fn schema_path_for_id(&self, id: &str) -> Option<&str> {
        self.id_schema_paths.get(id).map(String::as_str)
    }

    pub fn data_path_for_id(&self, id: &str) -> Option<&str> {
        self.id_data_paths.get(id).map(String::as_str)
    }

    /// Refreshes an identity's live data path. No-op when the identity
    /// is not tracked yet; positional moves of untracked elements are
    /// picked up by the next rebuild instead.
    pub fn update_id_data_path(&mut self, id: &str, data_path: &XPath) {
        if let Some(slot) = self.id_data_paths.get_mut(id) {
            *slot = data_path.to_string();
        }
    }

    /// Drops one array's position cache.
    pub fn clear_array(&mut self, array_path: &XPath) {
        self.arrays.remove(&array_path.to_string());
    }

    /// Drops everything: position caches and both identity indices.
    /// Called on wholesale structural resync.
    pub fn clear_all(&mut self) {
        self.arrays.clear();
        self.id_schema_paths.clear();
        self.id_data_paths.clear();
    }
}
