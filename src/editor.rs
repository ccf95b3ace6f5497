use tracing::debug;

use crate::config::EditorConfig;
use crate::dom::{NodeId, Tree};
use crate::markup;
use crate::source_buffer::SourceBuffer;

mod content;
mod cursor;
mod keys;
mod link;
mod mode;
mod paste;
mod selection;
mod styles;

pub use cursor::{CaretStop, caret_stops};
pub use keys::{KeyAction, KeyDisposition, classify_key_event, has_accelerator};
pub use link::{
    DialogRequest, DialogValues, FieldDescriptor, FieldValue, LINK_DIALOG_TITLE,
    LINK_NEW_TAB_FIELD, LINK_TEXT_FIELD, LINK_URL_FIELD, PendingLink,
};
pub use mode::{EditorMode, ModeController, SourceEditor, SourceOptions, join_source_lines};
pub use paste::{
    ClipboardData, ClipboardPayload, HTML_MIME, PasteTarget, TEXT_MIME, clean, clean_for,
    plain_text_fragment, reconcile_styles, safe_href, sanitize_markup, style_wrappers,
};
pub use selection::{Boundary, Range, Selection, SelectionSnapshot, compare_boundaries};
pub use styles::{StyleCategory, StyleContext, resolve_style_context};

pub(crate) use selection::selected_chars;
pub(crate) use styles::style_category_label;

/// Sent to the host when something it may want to react to happened.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Notification {
    ModeChanged { mode: EditorMode },
}

/// A rich-text editing surface: the document tree, the selection on it and
/// the visual/code mode state.
pub struct Editor<S: SourceEditor = SourceBuffer> {
    tree: Tree,
    selection: Option<Selection>,
    mode: ModeController<S>,
    config: EditorConfig,
    notifications: Vec<Notification>,
}

impl<S: SourceEditor> Default for Editor<S> {
    fn default() -> Self {
        Self::configured(EditorConfig::default())
    }
}

impl Editor {
    pub fn new() -> Self {
        Self::configured(EditorConfig::default())
    }

    pub fn with_config(config: EditorConfig) -> Self {
        Self::configured(config)
    }

    pub fn from_markup(markup: &str) -> Self {
        let mut editor = Self::new();
        editor.set_content(markup);
        editor
    }
}

impl<S: SourceEditor> Editor<S> {
    /// An empty editor using `S` as its source editor.
    pub fn configured(config: EditorConfig) -> Self {
        Self {
            tree: Tree::new(),
            selection: None,
            mode: ModeController::new(),
            config,
            notifications: Vec::new(),
        }
    }

    pub fn tree(&self) -> &Tree {
        &self.tree
    }

    /// Direct access to the tree. Edits made here can leave the selection
    /// pointing at removed nodes; it is re-validated on the next read.
    pub fn tree_mut(&mut self) -> &mut Tree {
        &mut self.tree
    }

    pub fn root(&self) -> NodeId {
        self.tree.root()
    }

    pub fn config(&self) -> &EditorConfig {
        &self.config
    }

    /// The canonical content: the serialized tree in visual mode, the
    /// source editor's text in code mode.
    pub fn content(&self) -> String {
        match self.mode.source() {
            Some(source) => source.lines().join("\n"),
            None => markup::serialize_children(&self.tree, self.tree.root()),
        }
    }

    /// Replaces the canonical content of the current mode.
    pub fn set_content(&mut self, markup: &str) {
        debug!(target: "pure_rte::editor", len = markup.len(), mode = self.mode().label(), "set content");
        match self.mode.source_mut() {
            Some(source) => source.replace(markup),
            None => {
                mode::replace_tree_content(&mut self.tree, markup);
                self.selection = None;
            }
        }
    }

    /// Hands all queued notifications to the caller.
    pub fn take_notifications(&mut self) -> Vec<Notification> {
        std::mem::take(&mut self.notifications)
    }
}

#[cfg(test)]
#[path = "editor_tests.rs"]
mod editor_tests;



#[cfg(test)]
#[path = "editor/style_tests.rs"]
mod style_tests;


#[cfg(test)]
#[path = "editor/link_tests.rs"]
mod link_tests;



#[cfg(test)]
#[path = "editor/cursor_tests.rs"]
mod cursor_tests;
