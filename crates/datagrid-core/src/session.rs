//! Model composition root.
//!
//! `GridModel` wires one entity's baseline, edit session, xpath caches,
//! and presentation state into the discrete event entry points the
//! surrounding grid calls: server pushes, field edits, row mutations,
//! and the save/discard/overwrite flow. Everything runs synchronously
//! on the caller's thread; row mutations emit their cache notification
//! in the same operation, never deferred.

use std::collections::HashSet;

use serde_json::Value;
use tracing::warn;

use datagrid_util::is_empty_value;
use datagrid_xpath::{Segment, XPath};

use crate::annotate::{annotated_element, element_prefix};
use crate::conflict::{Conflict, EditSession, SaveAttempt};
use crate::diff::{apply_diff, DiffError, SaveDiff};
use crate::resolver::{self, ElementRef};
use crate::schema::FieldMeta;
use crate::xpath_cache::XPathCaches;

/// Outcome of a server push arriving while the model may be mid-edit.
#[derive(Debug, Clone, PartialEq)]
pub enum PushOutcome {
    /// No edit session was active; the baseline was swapped wholesale.
    Applied,
    /// An active session was re-seated on the new baseline with the
    /// user's pending changes replayed on top.
    Rebased,
    /// The push collides with pending edits; the session is parked
    /// until the user discards or overwrites.
    ConflictPending(Vec<Conflict>),
}

/// Outcome of a save request.
#[derive(Debug, Clone, PartialEq)]
pub enum SaveOutcome {
    NothingToSave,
    Conflicts(Vec<Conflict>),
    /// The validated patch to transmit. Call
    /// [`GridModel::confirm_saved`] once the server accepts it.
    Saved(SaveDiff),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SortSpec {
    pub field: String,
    pub descending: bool,
}

/// Per-model presentation state (page, sort, column visibility).
///
/// Lives on the model instance and is dropped on unmount, rather than
/// in a process-wide registry keyed by model name.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ViewState {
    pub page: usize,
    pub page_size: usize,
    pub sort: Option<SortSpec>,
    pub hidden_columns: HashSet<String>,
}

/// One entity's client-side data-consistency engine.
#[derive(Debug, Clone, Default)]
pub struct GridModel {
    baseline: Value,
    edit: EditSession,
    caches: XPathCaches,
    view: ViewState,
}

impl GridModel {
    pub fn new(baseline: Value) -> Self {
        Self {
            baseline,
            edit: EditSession::new(),
            caches: XPathCaches::new(),
            view: ViewState::default(),
        }
    }

    /// Fresh presentation state when the model is (re)mounted.
    pub fn mount(&mut self) {
        self.view = ViewState::default();
    }

    /// Teardown: presentation state, caches, and any in-flight edit are
    /// dropped.
    pub fn unmount(&mut self) {
        self.view = ViewState::default();
        self.caches.clear_all();
        self.edit.discard();
    }

    /// The live, server-authoritative baseline.
    pub fn baseline(&self) -> &Value {
        &self.baseline
    }

    /// The "stored" data to display: the pre-edit snapshot while an
    /// edit session is active, the live baseline otherwise.
    pub fn shown_baseline(&self) -> &Value {
        self.edit.effective_baseline(&self.baseline)
    }

    pub fn edit_session(&self) -> &EditSession {
        &self.edit
    }

    pub fn caches(&self) -> &XPathCaches {
        &self.caches
    }

    pub fn caches_mut(&mut self) -> &mut XPathCaches {
        &mut self.caches
    }

    pub fn view_state(&self) -> &ViewState {
        &self.view
    }

    pub fn view_state_mut(&mut self) -> &mut ViewState {
        &mut self.view
    }

    pub fn begin_edit(&mut self) {
        self.edit.begin_edit(&self.baseline);
        // Annotations were rebuilt from scratch; cached positions for
        // the previous working copy no longer apply.
        self.caches.clear_all();
    }

    pub fn working(&self) -> Option<&Value> {
        self.edit.working()
    }

    /// Writes one field of the working object, resolving the schema
    /// path to a live data path first. `false` is a resolution miss or
    /// an inactive session; the caller drops this particular edit.
    pub fn edit_field(&mut self, schema_path: &XPath, value: Value) -> bool {
        let data_path = {
            let (Some(snapshot), Some(working)) = (self.edit.snapshot(), self.edit.working())
            else {
                warn!("field edit ignored: no active edit session");
                return false;
            };
            match resolver::resolve_by_identity(working, schema_path, snapshot, &self.caches) {
                Some(path) if !path.has_pending() => path,
                _ => return false,
            }
        };
        let Some(working) = self.edit.working_mut() else {
            return false;
        };
        data_path.set_at(working, value)
    }

    /// Appends a row to a tracked array of the working object and
    /// notifies the cache in the same operation.
    pub fn add_row(&mut self, array_path: &XPath, element: Value) -> bool {
        let (array_data, element_path) = {
            let Some(working) = self.edit.working() else {
                warn!("row insert ignored: no active edit session");
                return false;
            };
            let Some(array_data) = resolver::resolve(working, array_path) else {
                return false;
            };
            let Some(live) = array_data.value_at(working) else {
                return false;
            };
            if !live.is_array() {
                return false;
            }
            if self.caches.positions(array_path).is_none() {
                self.caches.rebuild_array(live, array_path);
            }
            let declared = self
                .caches
                .positions(array_path)
                .map_or(0, |positions| positions.next_declaration_index());
            (array_data, array_path.child(Segment::Index(declared)))
        };
        let annotated = annotated_element(&element, &element_path);
        let Some(working) = self.edit.working_mut() else {
            return false;
        };
        let Some(arr) = array_data.value_at_mut(working).and_then(Value::as_array_mut) else {
            return false;
        };
        let index = arr.len();
        arr.push(annotated);
        self.caches.notify_insert(array_path, &element_path, index);
        true
    }

    /// Removes the row at the given live index from a tracked array of
    /// the working object, with the matching cache notification.
    pub fn remove_row(&mut self, array_path: &XPath, index: usize) -> bool {
        let array_data = {
            let Some(working) = self.edit.working() else {
                warn!("row removal ignored: no active edit session");
                return false;
            };
            match resolver::resolve(working, array_path) {
                Some(path) => path,
                None => return false,
            }
        };
        let Some(working) = self.edit.working_mut() else {
            return false;
        };
        let Some(arr) = array_data.value_at_mut(working).and_then(Value::as_array_mut) else {
            return false;
        };
        if index >= arr.len() {
            return false;
        }
        let removed = arr.remove(index);
        let element_path =
            element_prefix(&removed).unwrap_or_else(|| array_path.child(Segment::Index(index)));
        self.caches.notify_remove(array_path, &element_path, index);
        true
    }

    /// Locates an element in whichever tree is currently authoritative
    /// for display (the working copy while editing).
    pub fn row_data_path(&self, element: &ElementRef) -> Option<XPath> {
        let root = self.edit.working().unwrap_or(&self.baseline);
        resolver::locate_element(root, element, &self.caches)
    }

    /// A full replacement baseline arrived from the server.
    ///
    /// Conflict detection runs against the incoming value before the
    /// baseline reference is swapped. Every wholesale replacement
    /// invalidates all caches; incremental notifications are reserved
    /// for local row mutations.
    pub fn apply_server_push(&mut self, new_baseline: Value) -> PushOutcome {
        if !self.edit.is_active() {
            self.baseline = new_baseline;
            self.caches.clear_all();
            return PushOutcome::Applied;
        }
        let conflicts = self.edit.check_conflicts(&new_baseline);
        if !conflicts.is_empty() {
            self.baseline = new_baseline;
            self.caches.clear_all();
            self.edit.mark_conflict_pending();
            return PushOutcome::ConflictPending(conflicts);
        }
        let pending = self.edit.pending_changes();
        self.baseline = new_baseline;
        self.caches.clear_all();
        if is_empty_value(&pending) {
            self.edit.begin_edit(&self.baseline);
        } else {
            self.edit.rebase(&self.baseline, &pending);
        }
        PushOutcome::Rebased
    }

    /// Attempts a save of the pending edits.
    pub fn save(&mut self, fields: &[FieldMeta]) -> Result<SaveOutcome, DiffError> {
        match self.edit.try_save(&self.baseline, fields)? {
            SaveAttempt::NoSession | SaveAttempt::NothingToSave => Ok(SaveOutcome::NothingToSave),
            SaveAttempt::Conflicts(conflicts) => Ok(SaveOutcome::Conflicts(conflicts)),
            SaveAttempt::Diff(saved) => Ok(SaveOutcome::Saved(saved)),
        }
    }

    /// The server accepted the transmitted patch: fold it into the
    /// local baseline and end the session.
    pub fn confirm_saved(&mut self, saved: &SaveDiff) {
        self.baseline = apply_diff(&self.baseline, &saved.diff);
        self.edit.complete_save();
        self.caches.clear_all();
    }

    /// Resolves a pending conflict by dropping the user's edits.
    pub fn resolve_discard(&mut self) {
        self.edit.discard();
    }

    /// Resolves a pending conflict in the user's favor: the save
    /// proceeds against the pre-edit snapshot.
    pub fn resolve_overwrite(&mut self, fields: &[FieldMeta]) -> Result<SaveOutcome, DiffError> {
        match self.edit.overwrite_save(fields)? {
            SaveAttempt::NoSession | SaveAttempt::NothingToSave => Ok(SaveOutcome::NothingToSave),
            SaveAttempt::Conflicts(conflicts) => Ok(SaveOutcome::Conflicts(conflicts)),
            SaveAttempt::Diff(saved) => Ok(SaveOutcome::Saved(saved)),
        }
    }
}
