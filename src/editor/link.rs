use std::collections::HashMap;

use tracing::debug;

use super::selection::SelectionSnapshot;
use super::{Editor, SourceEditor};

pub const LINK_DIALOG_TITLE: &str = "Insert link";
pub const LINK_TEXT_FIELD: &str = "text";
pub const LINK_URL_FIELD: &str = "url";
pub const LINK_NEW_TAB_FIELD: &str = "new_tab";

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum FieldDescriptor {
    Text {
        key: String,
        label: String,
        initial: String,
    },
    Checkbox {
        key: String,
        label: String,
        default: bool,
    },
}

impl FieldDescriptor {
    pub fn key(&self) -> &str {
        match self {
            FieldDescriptor::Text { key, .. } | FieldDescriptor::Checkbox { key, .. } => key,
        }
    }

    pub fn label(&self) -> &str {
        match self {
            FieldDescriptor::Text { label, .. } | FieldDescriptor::Checkbox { label, .. } => label,
        }
    }
}

/// What a host has to show to collect input from the user.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DialogRequest {
    pub title: String,
    pub fields: Vec<FieldDescriptor>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum FieldValue {
    Text(String),
    Flag(bool),
}

/// Values the user confirmed, keyed by field.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct DialogValues {
    values: HashMap<String, FieldValue>,
}

impl DialogValues {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_text(mut self, key: &str, value: impl Into<String>) -> Self {
        self.set(key, FieldValue::Text(value.into()));
        self
    }

    pub fn with_flag(mut self, key: &str, value: bool) -> Self {
        self.set(key, FieldValue::Flag(value));
        self
    }

    pub fn set(&mut self, key: &str, value: FieldValue) {
        self.values.insert(key.to_string(), value);
    }

    pub fn text(&self, key: &str) -> Option<&str> {
        match self.values.get(key)? {
            FieldValue::Text(text) => Some(text.as_str()),
            FieldValue::Flag(_) => None,
        }
    }

    pub fn flag(&self, key: &str) -> bool {
        matches!(self.values.get(key), Some(FieldValue::Flag(true)))
    }
}

/// A link insertion waiting for the dialog to finish. Holds the selection as
/// it was when the insertion started.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PendingLink {
    pub snapshot: SelectionSnapshot,
    pub request: DialogRequest,
}

impl<S: SourceEditor> Editor<S> {
    /// Captures the selection and describes the dialog to show. Must run
    /// while the triggering event is handled, before focus moves anywhere.
    pub fn begin_link_insertion(&self) -> PendingLink {
        let snapshot = self.capture();
        let request = DialogRequest {
            title: LINK_DIALOG_TITLE.to_string(),
            fields: vec![
                FieldDescriptor::Text {
                    key: LINK_TEXT_FIELD.to_string(),
                    label: "Text".to_string(),
                    initial: self.selected_text(),
                },
                FieldDescriptor::Text {
                    key: LINK_URL_FIELD.to_string(),
                    label: "URL".to_string(),
                    initial: String::new(),
                },
                FieldDescriptor::Checkbox {
                    key: LINK_NEW_TAB_FIELD.to_string(),
                    label: "Open in new tab".to_string(),
                    default: false,
                },
            ],
        };
        PendingLink { snapshot, request }
    }

    /// Finishes a link insertion. `None` means the dialog was cancelled and
    /// nothing happens, not even a selection restore.
    pub fn complete_link_insertion(
        &mut self,
        pending: PendingLink,
        result: Option<DialogValues>,
    ) -> bool {
        let Some(values) = result else {
            debug!(target: "pure_rte::link", "link dialog cancelled");
            return false;
        };
        let url = values.text(LINK_URL_FIELD).unwrap_or_default().trim();
        if url.is_empty() {
            debug!(target: "pure_rte::link", "link skipped: empty url");
            return false;
        }
        let text = match values.text(LINK_TEXT_FIELD) {
            Some(text) if !text.is_empty() => text,
            _ => url,
        };
        self.restore(&pending.snapshot);
        self.wrap_inside_link(text, url, values.flag(LINK_NEW_TAB_FIELD))
    }
}
