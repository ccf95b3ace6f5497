//! Content-transformation core of a rich-text editing widget.
//!
//! The [`editor::Editor`] owns a markup tree and a selection on it, applies
//! selection scoped edits, sanitizes pasted content and switches between a
//! visual representation and the markup source. [`render`] and [`theme`]
//! lay the document out for a terminal.

pub mod config;
pub mod dom;
pub mod editor;
pub mod markup;
pub mod render;
pub mod source_buffer;
pub mod theme;

pub use config::EditorConfig;
pub use editor::{Editor, EditorMode, Notification};
