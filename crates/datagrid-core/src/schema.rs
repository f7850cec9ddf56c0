//! Field-level schema metadata consumed by the save pipeline.
//!
//! The surrounding layer loads these from the backend model
//! description; the differ only needs the per-field flags that gate
//! what a client is allowed to write.

use serde::{Deserialize, Serialize};

/// Declaration-order metadata for one field.
///
/// `path` is the dotted field-name path with array indices elided
/// (`orders.items.price`), the same shape a diff walk produces.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldMeta {
    pub path: String,
    /// Derived/read-only on the server; the client must never write it.
    #[serde(default)]
    pub server_populated: bool,
    #[serde(default)]
    pub required: bool,
    /// User-facing prompt to show before submitting a change to this
    /// field, when present.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub confirm_caption: Option<String>,
}

impl FieldMeta {
    pub fn new(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            server_populated: false,
            required: false,
            confirm_caption: None,
        }
    }

    pub fn server_populated(mut self) -> Self {
        self.server_populated = true;
        self
    }

    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    pub fn with_confirm_caption(mut self, caption: impl Into<String>) -> Self {
        self.confirm_caption = Some(caption.into());
        self
    }
}

/// Looks up the metadata entry for a dotted field-name path.
pub fn field_meta<'a>(fields: &'a [FieldMeta], path: &str) -> Option<&'a FieldMeta> {
    fields.iter().find(|meta| meta.path == path)
}
