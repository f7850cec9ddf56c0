//! Property tests for the cache-maintenance and diff round-trip
//! invariants.

use datagrid_core::annotate::{annotated_element, element_prefix};
use datagrid_core::diff::{apply_diff, structural_diff};
use datagrid_core::xpath_cache::XPathCaches;
use datagrid_xpath::{Segment, XPath};
use proptest::prelude::*;
use serde_json::{json, Map, Value};

/// A faithful sequence of insert/remove notifications must leave the
/// position cache identical to a from-scratch rebuild of the final
/// array.
#[test]
fn notification_sequences_match_full_rebuild() {
    proptest!(|(
        initial in 0usize..5,
        ops in prop::collection::vec((any::<bool>(), any::<usize>()), 0..40),
    )| {
        let array_path = XPath::parse("items").unwrap();
        let mut live: Vec<Value> = Vec::new();
        let mut caches = XPathCaches::new();
        let mut next_decl = 0usize;

        for _ in 0..initial {
            let element_path = array_path.child(Segment::Index(next_decl));
            live.push(annotated_element(&json!({"qty": next_decl}), &element_path));
            next_decl += 1;
        }
        caches.rebuild_array(&Value::Array(live.clone()), &array_path);

        for (is_insert, seed) in ops {
            if is_insert || live.is_empty() {
                let index = seed % (live.len() + 1);
                let element_path = array_path.child(Segment::Index(next_decl));
                next_decl += 1;
                live.insert(index, annotated_element(&json!({"qty": 0}), &element_path));
                caches.notify_insert(&array_path, &element_path, index);
            } else {
                let index = seed % live.len();
                let removed = live.remove(index);
                let element_path = element_prefix(&removed).unwrap();
                caches.notify_remove(&array_path, &element_path, index);
            }
        }

        let mut fresh = XPathCaches::new();
        fresh.rebuild_array(&Value::Array(live), &array_path);
        prop_assert_eq!(
            caches.positions(&array_path),
            fresh.positions(&array_path)
        );
    });
}

/// Per-element mutation applied when building a working copy.
#[derive(Debug, Clone)]
enum ItemEdit {
    Keep,
    Delete,
    SetQty(i32),
}

fn arb_item_edit() -> impl Strategy<Value = ItemEdit> {
    prop_oneof![
        Just(ItemEdit::Keep),
        Just(ItemEdit::Delete),
        any::<i32>().prop_map(ItemEdit::SetQty),
    ]
}

fn build_entity(name: &str, qtys: &[i32]) -> Value {
    let items: Vec<Value> = qtys
        .iter()
        .enumerate()
        .map(|(index, qty)| json!({"DB_ID": index as i64 + 1, "qty": qty}))
        .collect();
    json!({"DB_ID": 100, "name": name, "items": items})
}

/// Applying the diff produced for a set of edits back onto the baseline
/// reproduces the working object exactly.
#[test]
fn diff_then_apply_round_trips() {
    proptest!(|(
        qtys in prop::collection::vec(any::<i32>(), 0..6),
        edits in prop::collection::vec(arb_item_edit(), 6),
        appended in prop::collection::vec("[a-z]{1,4}", 0..3),
        renamed in prop::option::of("[a-z]{1,6}"),
    )| {
        let baseline = build_entity("base", &qtys);

        let mut working_items: Vec<Value> = Vec::new();
        for (index, qty) in qtys.iter().enumerate() {
            match &edits[index] {
                ItemEdit::Keep => {
                    working_items.push(json!({"DB_ID": index as i64 + 1, "qty": qty}));
                }
                ItemEdit::Delete => {}
                ItemEdit::SetQty(new_qty) => {
                    working_items.push(json!({"DB_ID": index as i64 + 1, "qty": new_qty}));
                }
            }
        }
        for sku in &appended {
            working_items.push(json!({"sku": sku}));
        }
        let mut working = Map::new();
        working.insert("DB_ID".into(), json!(100));
        working.insert(
            "name".into(),
            json!(renamed.clone().unwrap_or_else(|| "base".into())),
        );
        working.insert("items".into(), Value::Array(working_items));
        let working = Value::Object(working);

        let diff = structural_diff(&baseline, &working);
        prop_assert_eq!(apply_diff(&baseline, &diff), working.clone());

        // Diffing a server-sourced object against itself is always
        // empty (every element of a persisted array carries its id).
        prop_assert_eq!(structural_diff(&baseline, &baseline), json!({}));
    });
}
