//! Switching between the rendered document and its markup source.
//!
//! Only one representation is live at a time. The source editor is created
//! when entering code mode and destroyed when leaving it; while in visual
//! mode it does not exist at all.

use std::mem;

use tracing::info;

use super::{Editor, Notification};
use crate::config::EditorConfig;
use crate::dom::Tree;
use crate::markup;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum EditorMode {
    Visual,
    Code,
}

impl EditorMode {
    pub fn label(self) -> &'static str {
        match self {
            EditorMode::Visual => "Visual",
            EditorMode::Code => "Code",
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SourceOptions {
    pub line_wrapping: bool,
}

/// A plain text editor used for code mode. The controller owns it for as
/// long as code mode lasts.
pub trait SourceEditor: Sized {
    fn create(initial: &str, options: &SourceOptions) -> Self;
    /// Full content, one entry per line, without terminators.
    fn lines(&self) -> Vec<String>;
    fn replace(&mut self, text: &str);
    /// Releases the editor. Called exactly once, when code mode ends.
    fn destroy(self);
}

enum ModeState<S> {
    Visual,
    Code(S),
}

pub struct ModeController<S: SourceEditor> {
    state: ModeState<S>,
}

impl<S: SourceEditor> Default for ModeController<S> {
    fn default() -> Self {
        Self::new()
    }
}

impl<S: SourceEditor> ModeController<S> {
    pub fn new() -> Self {
        Self {
            state: ModeState::Visual,
        }
    }

    pub fn mode(&self) -> EditorMode {
        match self.state {
            ModeState::Visual => EditorMode::Visual,
            ModeState::Code(_) => EditorMode::Code,
        }
    }

    pub fn source(&self) -> Option<&S> {
        match &self.state {
            ModeState::Code(source) => Some(source),
            ModeState::Visual => None,
        }
    }

    pub fn source_mut(&mut self) -> Option<&mut S> {
        match &mut self.state {
            ModeState::Code(source) => Some(source),
            ModeState::Visual => None,
        }
    }

    /// Moves the canonical content into the other representation and
    /// returns the new mode.
    pub fn toggle(&mut self, tree: &mut Tree, config: &EditorConfig) -> EditorMode {
        match mem::replace(&mut self.state, ModeState::Visual) {
            ModeState::Visual => {
                let markup = markup::serialize_children(tree, tree.root());
                let options = SourceOptions {
                    line_wrapping: config.source_line_wrapping,
                };
                self.state = ModeState::Code(S::create(&markup, &options));
                EditorMode::Code
            }
            ModeState::Code(source) => {
                let text = join_source_lines(&source.lines(), config.trim_source_lines);
                source.destroy();
                replace_tree_content(tree, &text);
                EditorMode::Visual
            }
        }
    }
}

/// Joins source lines with `\n`, trimming each one when asked to.
pub fn join_source_lines(lines: &[String], trim: bool) -> String {
    lines
        .iter()
        .map(|line| if trim { line.trim() } else { line.as_str() })
        .collect::<Vec<_>>()
        .join("\n")
}

/// Replaces everything below the root with the parsed `markup`.
pub(crate) fn replace_tree_content(tree: &mut Tree, markup: &str) {
    let root = tree.root();
    tree.clear_children(root);
    tree.insert_fragment(markup::parse_fragment(markup), root, 0);
}

impl<S: SourceEditor> Editor<S> {
    pub fn mode(&self) -> EditorMode {
        self.mode.mode()
    }

    pub fn is_visual(&self) -> bool {
        self.mode() == EditorMode::Visual
    }

    /// Switches between visual and code mode. The selection does not survive
    /// the switch.
    pub fn toggle_mode(&mut self) -> EditorMode {
        let mode = self.mode.toggle(&mut self.tree, &self.config);
        self.selection = None;
        info!(target: "pure_rte::mode", mode = mode.label(), "mode changed");
        self.notifications.push(Notification::ModeChanged { mode });
        mode
    }

    pub fn source_editor(&self) -> Option<&S> {
        self.mode.source()
    }

    pub fn source_editor_mut(&mut self) -> Option<&mut S> {
        self.mode.source_mut()
    }
}
