//! Thin projection of the object graph for rendering.
//!
//! Flat rows for one tracked array, or a hierarchical tree of the whole
//! value. No widgets, no styling; the first row materialization of an
//! array also seeds its position cache.

use serde_json::Value;

use datagrid_xpath::{Segment, XPath};

use crate::annotate::element_prefix;
use crate::resolver;
use crate::xpath_cache::XPathCaches;
use crate::{entity_id, id_key, XPATH_PREFIX};

/// One materialized grid row.
#[derive(Debug, Clone, PartialEq)]
pub struct Row {
    pub index: usize,
    pub id: Option<Value>,
    /// Schema position of the element, when it is annotated.
    pub schema_path: Option<XPath>,
    /// Live position, valid until the array next mutates.
    pub data_path: XPath,
}

/// Projects one tracked array into flat rows, rebuilding that array's
/// position cache as it scans.
pub fn materialize_rows(root: &Value, array_path: &XPath, caches: &mut XPathCaches) -> Vec<Row> {
    let Some(array_data) = resolver::resolve(root, array_path) else {
        return Vec::new();
    };
    let Some(live) = array_data.value_at(root) else {
        return Vec::new();
    };
    let Some(arr) = live.as_array() else {
        return Vec::new();
    };
    caches.rebuild_array(live, array_path);
    arr.iter()
        .enumerate()
        .map(|(index, el)| Row {
            index,
            id: entity_id(el).cloned(),
            schema_path: element_prefix(el),
            data_path: array_data.child(Segment::Index(index)),
        })
        .collect()
}

/// One node of the hierarchical projection.
#[derive(Debug, Clone, PartialEq)]
pub struct TreeNode {
    pub name: String,
    pub data_path: XPath,
    /// Present on primitive nodes only.
    pub leaf: Option<Value>,
    pub children: Vec<TreeNode>,
}

/// Projects a nested value into a tree for hierarchical rendering.
/// Annotation entries are invisible; array elements are labeled by
/// identity when they have one, by position otherwise.
pub fn materialize_tree(root: &Value) -> TreeNode {
    build_node(String::new(), root, XPath::root())
}

fn build_node(name: String, value: &Value, path: XPath) -> TreeNode {
    match value {
        Value::Object(map) => {
            let children = map
                .iter()
                .filter(|(key, _)| !key.starts_with(XPATH_PREFIX))
                .map(|(key, val)| {
                    build_node(
                        key.clone(),
                        val,
                        path.child(Segment::Field(key.clone())),
                    )
                })
                .collect();
            TreeNode {
                name,
                data_path: path,
                leaf: None,
                children,
            }
        }
        Value::Array(arr) => {
            let children = arr
                .iter()
                .enumerate()
                .map(|(index, el)| {
                    let label = entity_id(el)
                        .and_then(id_key)
                        .unwrap_or_else(|| index.to_string());
                    build_node(label, el, path.child(Segment::Index(index)))
                })
                .collect();
            TreeNode {
                name,
                data_path: path,
                leaf: None,
                children,
            }
        }
        other => TreeNode {
            name,
            data_path: path,
            leaf: Some(other.clone()),
            children: Vec::new(),
        },
    }
}
