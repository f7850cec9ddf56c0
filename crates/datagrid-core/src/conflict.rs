//! Three-way conflict reconciliation.
//!
//! Reconciles the pre-edit snapshot, the current server baseline, and
//! the user's working object to decide whether a save can proceed
//! without losing information. A field collides when the user changed
//! it and the server's copy moved away from the snapshot at the same
//! path; a server-side deletion of an array element the user modified
//! is also a collision. Detection never fails on odd data: missing
//! inputs log a warning and report no conflicts, because save must
//! remain possible even when ancillary state is unexpectedly absent.

use serde_json::{Map, Value};
use tracing::warn;

use datagrid_util::{deep_clone, deep_equal};
use datagrid_xpath::XPath;

use crate::annotate::{annotated_clone, strip};
use crate::diff::{diff_for_save, structural_diff, apply_diff, DiffError, SaveDiff};
use crate::schema::FieldMeta;
use crate::{entity_id, id_key, DB_ID, XPATH_PREFIX};

/// One detected collision between a pending user edit and a concurrent
/// server-side change.
#[derive(Debug, Clone, PartialEq)]
pub struct Conflict {
    /// Dotted/bracketed path of the colliding field; array elements are
    /// addressed by identity, e.g. `items[5].qty`.
    pub field: String,
    pub your_value: Value,
    pub server_value: Value,
}

/// Field-by-field three-way conflict detection.
///
/// No conflicts are reported when there is no snapshot (no active edit
/// session), when the server baseline never moved away from the
/// snapshot, or when the user has not actually changed anything.
pub fn detect_conflicts(
    snapshot: Option<&Value>,
    baseline: Option<&Value>,
    working: Option<&Value>,
) -> Vec<Conflict> {
    let Some(snapshot) = snapshot else {
        return Vec::new();
    };
    let (Some(baseline), Some(working)) = (baseline, working) else {
        warn!("conflict check skipped: baseline or working object missing");
        return Vec::new();
    };
    let snap = strip(snapshot);
    let base = strip(baseline);
    if deep_equal(&snap, &base) {
        return Vec::new();
    }
    let work = strip(working);
    let changed = structural_diff(&snap, &work);
    let Value::Object(changed) = changed else {
        warn!("conflict check skipped: snapshot and working object are not both objects");
        return Vec::new();
    };
    if changed.is_empty() {
        return Vec::new();
    }
    let mut out = Vec::new();
    collect(&changed, &snap, &base, "", &mut out);
    out
}

fn collect(
    changed: &Map<String, Value>,
    snapshot: &Value,
    baseline: &Value,
    prefix: &str,
    out: &mut Vec<Conflict>,
) {
    for (key, yours) in changed {
        if key == DB_ID || key.starts_with(XPATH_PREFIX) {
            continue;
        }
        let path = if prefix.is_empty() {
            key.clone()
        } else {
            format!("{prefix}.{key}")
        };
        let snap_v = snapshot.get(key);
        let base_v = baseline.get(key);
        match yours {
            Value::Array(entries) if !entries.is_empty() && entries.iter().all(Value::is_object) => {
                match (
                    snap_v.and_then(Value::as_array),
                    base_v.and_then(Value::as_array),
                ) {
                    (Some(snap_arr), Some(base_arr)) => {
                        collect_array(entries, snap_arr, base_arr, &path, out);
                    }
                    _ => leaf_check(&path, yours, snap_v, base_v, out),
                }
            }
            Value::Object(nested) => match (snap_v, base_v) {
                (Some(s @ Value::Object(_)), Some(b @ Value::Object(_))) => {
                    collect(nested, s, b, &path, out);
                }
                _ => leaf_check(&path, yours, snap_v, base_v, out),
            },
            _ => leaf_check(&path, yours, snap_v, base_v, out),
        }
    }
}

fn collect_array(
    entries: &[Value],
    snap_arr: &[Value],
    base_arr: &[Value],
    path: &str,
    out: &mut Vec<Conflict>,
) {
    for entry in entries {
        let Some(emap) = entry.as_object() else {
            continue;
        };
        let Some(id) = emap.get(DB_ID).filter(|id| !id.is_null()) else {
            // User-inserted element: nothing on the server to collide with.
            continue;
        };
        if emap.len() == 1 {
            // User deleted the element; deletion carries no field values
            // a server change could overwrite.
            continue;
        }
        let label = id_key(id).unwrap_or_else(|| id.to_string());
        let element_path = format!("{path}[{label}]");
        let Some(server_el) = base_arr.iter().find(|el| entity_id(el) == Some(id)) else {
            out.push(Conflict {
                field: element_path,
                your_value: entry.clone(),
                server_value: Value::Null,
            });
            continue;
        };
        let Some(snap_el) = snap_arr.iter().find(|el| entity_id(el) == Some(id)) else {
            warn!(element = %element_path, "conflict check skipped: element missing from snapshot");
            continue;
        };
        collect(emap, snap_el, server_el, &element_path, out);
    }
}

fn leaf_check(
    path: &str,
    yours: &Value,
    snap_v: Option<&Value>,
    base_v: Option<&Value>,
    out: &mut Vec<Conflict>,
) {
    let snap = snap_v.unwrap_or(&Value::Null);
    let base = base_v.unwrap_or(&Value::Null);
    if !deep_equal(snap, base) {
        out.push(Conflict {
            field: path.to_string(),
            your_value: yours.clone(),
            server_value: base.clone(),
        });
    }
}

/// Edit-session lifecycle of one editable entity.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum EditState {
    #[default]
    Clean,
    Editing,
    ConflictPending,
}

/// Outcome of a save attempt against the session's snapshot.
#[derive(Debug, Clone, PartialEq)]
pub enum SaveAttempt {
    /// No edit session is active; there is nothing to save.
    NoSession,
    NothingToSave,
    Conflicts(Vec<Conflict>),
    Diff(SaveDiff),
}

/// Per-entity edit session: holds the pre-edit snapshot and the
/// annotated working copy, and drives the
/// `Clean -> Editing -> ConflictPending -> Clean` state machine.
#[derive(Debug, Clone, Default)]
pub struct EditSession {
    state: EditState,
    snapshot: Option<Value>,
    working: Option<Value>,
}

impl EditSession {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> EditState {
        self.state
    }

    /// True while a snapshot is held (either editing or awaiting a
    /// conflict decision).
    pub fn is_active(&self) -> bool {
        self.state != EditState::Clean
    }

    /// Enters edit mode: deep-copies the baseline as the snapshot and
    /// seeds an annotated working copy from it.
    pub fn begin_edit(&mut self, baseline: &Value) {
        self.snapshot = Some(deep_clone(baseline));
        self.working = Some(annotated_clone(baseline, &XPath::root()));
        self.state = EditState::Editing;
    }

    pub fn snapshot(&self) -> Option<&Value> {
        self.snapshot.as_ref()
    }

    pub fn working(&self) -> Option<&Value> {
        self.working.as_ref()
    }

    pub fn working_mut(&mut self) -> Option<&mut Value> {
        self.working.as_mut()
    }

    /// The "stored" data the rest of the system should display and diff
    /// against: the pre-edit snapshot while a session is active (so the
    /// grid does not shift under the user's fingers), the live baseline
    /// otherwise.
    pub fn effective_baseline<'a>(&'a self, live: &'a Value) -> &'a Value {
        match (&self.state, &self.snapshot) {
            (EditState::Clean, _) | (_, None) => live,
            (_, Some(snapshot)) => snapshot,
        }
    }

    /// The user's pending business-data changes relative to the snapshot.
    pub fn pending_changes(&self) -> Value {
        match (&self.snapshot, &self.working) {
            (Some(snapshot), Some(working)) => {
                structural_diff(&strip(snapshot), &strip(working))
            }
            _ => Value::Object(Map::new()),
        }
    }

    pub fn check_conflicts(&self, baseline: &Value) -> Vec<Conflict> {
        detect_conflicts(self.snapshot.as_ref(), Some(baseline), self.working.as_ref())
    }

    /// Parks an active session on detected conflicts, awaiting the
    /// user's discard/overwrite decision.
    pub fn mark_conflict_pending(&mut self) {
        if self.is_active() {
            self.state = EditState::ConflictPending;
        }
    }

    /// Attempts a save against the given current baseline. Conflicts
    /// move the session to `ConflictPending`; a clean attempt diffs the
    /// working object against the pre-edit snapshot. The session stays
    /// active until [`EditSession::complete_save`] confirms the server
    /// accepted the patch.
    pub fn try_save(
        &mut self,
        baseline: &Value,
        fields: &[FieldMeta],
    ) -> Result<SaveAttempt, DiffError> {
        if !self.is_active() {
            warn!("save attempted without an active edit session");
            return Ok(SaveAttempt::NoSession);
        }
        let conflicts = self.check_conflicts(baseline);
        if !conflicts.is_empty() {
            self.state = EditState::ConflictPending;
            return Ok(SaveAttempt::Conflicts(conflicts));
        }
        self.state = EditState::Editing;
        self.diff_against_snapshot(fields)
    }

    /// Resolves a pending conflict in the user's favor: the save diffs
    /// against the pre-edit snapshot, so the user's edits win the
    /// field-level collisions.
    pub fn overwrite_save(&mut self, fields: &[FieldMeta]) -> Result<SaveAttempt, DiffError> {
        if !self.is_active() {
            warn!("overwrite attempted without an active edit session");
            return Ok(SaveAttempt::NoSession);
        }
        self.diff_against_snapshot(fields)
    }

    fn diff_against_snapshot(&mut self, fields: &[FieldMeta]) -> Result<SaveAttempt, DiffError> {
        let (Some(snapshot), Some(working)) = (&self.snapshot, &self.working) else {
            warn!("save skipped: snapshot or working object missing");
            return Ok(SaveAttempt::NoSession);
        };
        let is_create = entity_id(snapshot).is_none();
        let saved = diff_for_save(snapshot, working, fields, is_create)?;
        if saved.is_empty() {
            return Ok(SaveAttempt::NothingToSave);
        }
        Ok(SaveAttempt::Diff(saved))
    }

    /// The server accepted the patch: the session ends.
    pub fn complete_save(&mut self) {
        self.reset();
    }

    /// Resolves a pending conflict (or abandons an edit) by throwing the
    /// user's changes away.
    pub fn discard(&mut self) {
        self.reset();
    }

    /// Re-seats an active session on a fresh baseline, replaying the
    /// user's pending changes on top of it.
    pub fn rebase(&mut self, new_baseline: &Value, pending: &Value) {
        let rebased = apply_diff(new_baseline, pending);
        self.snapshot = Some(deep_clone(new_baseline));
        self.working = Some(annotated_clone(&rebased, &XPath::root()));
        self.state = EditState::Editing;
    }

    fn reset(&mut self) {
        self.snapshot = None;
        self.working = None;
        self.state = EditState::Clean;
    }
}
