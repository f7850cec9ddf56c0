//! End-to-end flows through the public model API: edit sessions racing
//! server pushes, conflict resolution, creation payloads, and resolver
//! behavior over mutating arrays.

use datagrid_core::schema::FieldMeta;
use datagrid_core::session::{GridModel, PushOutcome, SaveOutcome};
use datagrid_core::{materializer, EditState, ElementRef};
use datagrid_xpath::XPath;
use serde_json::{json, Value};

fn order_baseline() -> Value {
    json!({
        "DB_ID": 100,
        "name": "order",
        "status": "open",
        "items": [
            {"DB_ID": 1, "qty": 1, "sku": "a"},
            {"DB_ID": 2, "qty": 2, "sku": "b"},
            {"DB_ID": 3, "qty": 3, "sku": "c"}
        ]
    })
}

fn order_fields() -> Vec<FieldMeta> {
    vec![
        FieldMeta::new("name"),
        FieldMeta::new("status"),
        FieldMeta::new("items.qty"),
        FieldMeta::new("items.sku"),
    ]
}

fn path(raw: &str) -> XPath {
    XPath::parse(raw).unwrap()
}

#[test]
fn edit_save_confirm_cycle() {
    let mut model = GridModel::new(order_baseline());
    model.mount();
    model.begin_edit();
    assert!(model.edit_field(&path("items[2].qty"), json!(30)));
    assert!(model.edit_field(&path("name"), json!("renamed")));

    let saved = match model.save(&order_fields()).unwrap() {
        SaveOutcome::Saved(saved) => saved,
        other => panic!("expected save, got {other:?}"),
    };
    assert_eq!(
        saved.diff,
        json!({
            "name": "renamed",
            "items": [{"DB_ID": 3, "qty": 30}],
            "DB_ID": 100
        })
    );

    model.confirm_saved(&saved);
    assert_eq!(model.edit_session().state(), EditState::Clean);
    assert_eq!(model.baseline()["name"], json!("renamed"));
    assert_eq!(model.baseline()["items"][2]["qty"], json!(30));
}

#[test]
fn non_colliding_push_rebases_mid_edit() {
    let mut model = GridModel::new(order_baseline());
    model.begin_edit();
    assert!(model.edit_field(&path("items[0].qty"), json!(99)));

    // Server concurrently touches a different element.
    let mut advanced = order_baseline();
    advanced["items"][1]["qty"] = json!(20);
    assert_eq!(
        model.apply_server_push(advanced),
        PushOutcome::Rebased
    );

    // Both the user's edit and the server's change survive.
    let working = model.working().unwrap();
    assert_eq!(working["items"][0]["qty"], json!(99));
    assert_eq!(working["items"][1]["qty"], json!(20));

    let saved = match model.save(&order_fields()).unwrap() {
        SaveOutcome::Saved(saved) => saved,
        other => panic!("expected save, got {other:?}"),
    };
    // The patch carries only the user's own edit.
    assert_eq!(
        saved.diff,
        json!({"items": [{"DB_ID": 1, "qty": 99}], "DB_ID": 100})
    );
}

#[test]
fn colliding_push_then_discard() {
    let mut model = GridModel::new(order_baseline());
    model.begin_edit();
    assert!(model.edit_field(&path("status"), json!("mine")));

    let mut advanced = order_baseline();
    advanced["status"] = json!("theirs");
    let conflicts = match model.apply_server_push(advanced.clone()) {
        PushOutcome::ConflictPending(conflicts) => conflicts,
        other => panic!("expected conflict, got {other:?}"),
    };
    assert_eq!(conflicts.len(), 1);
    assert_eq!(conflicts[0].field, "status");
    assert_eq!(conflicts[0].your_value, json!("mine"));
    assert_eq!(conflicts[0].server_value, json!("theirs"));

    // Until the decision, the user still sees their pre-edit world.
    assert_eq!(model.shown_baseline()["status"], json!("open"));

    model.resolve_discard();
    assert_eq!(model.edit_session().state(), EditState::Clean);
    assert_eq!(model.shown_baseline(), &advanced);
}

#[test]
fn colliding_push_then_overwrite() {
    let mut model = GridModel::new(order_baseline());
    model.begin_edit();
    assert!(model.edit_field(&path("status"), json!("mine")));

    let mut advanced = order_baseline();
    advanced["status"] = json!("theirs");
    let _ = model.apply_server_push(advanced);

    let saved = match model.resolve_overwrite(&order_fields()).unwrap() {
        SaveOutcome::Saved(saved) => saved,
        other => panic!("expected save, got {other:?}"),
    };
    // Diffed against the pre-edit snapshot: the user's value wins.
    assert_eq!(saved.diff, json!({"status": "mine", "DB_ID": 100}));
    model.confirm_saved(&saved);
    assert_eq!(model.baseline()["status"], json!("mine"));
}

#[test]
fn server_deleting_an_edited_row_conflicts() {
    let mut model = GridModel::new(order_baseline());
    model.begin_edit();
    assert!(model.edit_field(&path("items[1].qty"), json!(22)));

    let mut advanced = order_baseline();
    advanced["items"]
        .as_array_mut()
        .unwrap()
        .retain(|el| el["DB_ID"] != json!(2));
    let conflicts = match model.apply_server_push(advanced) {
        PushOutcome::ConflictPending(conflicts) => conflicts,
        other => panic!("expected conflict, got {other:?}"),
    };
    assert_eq!(conflicts.len(), 1);
    assert_eq!(conflicts[0].field, "items[2]");
    assert_eq!(conflicts[0].server_value, Value::Null);
    assert_eq!(conflicts[0].your_value["qty"], json!(22));
}

#[test]
fn creation_strips_null_leaves_from_the_payload() {
    let mut model = GridModel::new(json!({}));
    model.begin_edit();
    assert!(model.edit_field(&path("name"), json!("fresh")));
    assert!(model.edit_field(&path("status"), Value::Null));

    let saved = match model.save(&order_fields()).unwrap() {
        SaveOutcome::Saved(saved) => saved,
        other => panic!("expected save, got {other:?}"),
    };
    // No identity on the root: creation payload, nulls stripped.
    assert_eq!(saved.diff, json!({"name": "fresh"}));
}

#[test]
fn untouched_creation_has_nothing_to_save() {
    let mut model = GridModel::new(json!({}));
    model.begin_edit();
    assert!(model.edit_field(&path("status"), Value::Null));
    assert_eq!(
        model.save(&order_fields()).unwrap(),
        SaveOutcome::NothingToSave
    );
}

#[test]
fn row_mutations_keep_resolution_consistent() {
    let mut model = GridModel::new(order_baseline());
    model.begin_edit();

    assert!(model.remove_row(&path("items"), 0));
    assert!(model.add_row(&path("items"), json!({"sku": "d", "qty": 4})));

    // Surviving elements still resolve through their stale declaration
    // paths.
    assert!(model.edit_field(&path("items[1].qty"), json!(20)));
    assert!(model.edit_field(&path("items[2].qty"), json!(33)));
    let working = model.working().unwrap();
    assert_eq!(working["items"][0]["qty"], json!(20));
    assert_eq!(working["items"][1]["qty"], json!(33));

    let saved = match model.save(&order_fields()).unwrap() {
        SaveOutcome::Saved(saved) => saved,
        other => panic!("expected save, got {other:?}"),
    };
    assert_eq!(
        saved.diff,
        json!({
            "items": [
                {"DB_ID": 1},
                {"DB_ID": 2, "qty": 20},
                {"DB_ID": 3, "qty": 33},
                {"sku": "d", "qty": 4}
            ],
            "DB_ID": 100
        })
    );
}

#[test]
fn materialized_rows_round_trip_through_the_resolver() {
    let mut model = GridModel::new(order_baseline());
    model.begin_edit();
    assert!(model.remove_row(&path("items"), 1));

    let working = model.working().unwrap().clone();
    let rows = materializer::materialize_rows(&working, &path("items"), model.caches_mut());
    assert_eq!(rows.len(), 2);
    for row in rows {
        // Reading the live object at the row's data path yields the
        // element whose annotation matches the row's schema path.
        let element = row.data_path.value_at(&working).unwrap();
        assert_eq!(
            datagrid_core::annotate::element_prefix(element),
            row.schema_path
        );
        if let Some(id) = &row.id {
            assert_eq!(
                model.row_data_path(&ElementRef::ById(id.clone())),
                Some(row.data_path.clone())
            );
        }
    }
}
