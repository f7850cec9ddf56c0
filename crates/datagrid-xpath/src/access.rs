use serde_json::Value;

use crate::path::{Segment, XPath};

/// Positional access over `serde_json::Value` trees.
///
/// These walkers treat index segments literally. They are only safe on a
/// path whose indices are known to be live (a data path); resolving a
/// possibly stale schema path into one is the core crate's job.
impl XPath {
    pub fn value_at<'a>(&self, root: &'a Value) -> Option<&'a Value> {
        let mut cur = root;
        for seg in self.segments() {
            cur = match (seg, cur) {
                (Segment::Field(name), Value::Object(map)) => map.get(name)?,
                (Segment::Index(idx), Value::Array(arr)) => arr.get(*idx)?,
                _ => return None,
            };
        }
        Some(cur)
    }

    pub fn value_at_mut<'a>(&self, root: &'a mut Value) -> Option<&'a mut Value> {
        let mut cur = root;
        for seg in self.segments() {
            cur = match (seg, cur) {
                (Segment::Field(name), Value::Object(map)) => map.get_mut(name)?,
                (Segment::Index(idx), Value::Array(arr)) => arr.get_mut(*idx)?,
                _ => return None,
            };
        }
        Some(cur)
    }

    /// Writes `value` at this path. Returns `false` when the path does
    /// not address a writable slot; existing array slots may be
    /// overwritten, object keys may be overwritten or newly inserted.
    pub fn set_at(&self, root: &mut Value, value: Value) -> bool {
        if self.is_root() {
            *root = value;
            return true;
        }
        let parent = self.parent();
        let Some(target) = parent.value_at_mut(root) else {
            return false;
        };
        match (self.last(), target) {
            (Some(Segment::Field(name)), Value::Object(map)) => {
                map.insert(name.clone(), value);
                true
            }
            (Some(Segment::Index(idx)), Value::Array(arr)) => match arr.get_mut(*idx) {
                Some(slot) => {
                    *slot = value;
                    true
                }
                None => false,
            },
            _ => false,
        }
    }
}
