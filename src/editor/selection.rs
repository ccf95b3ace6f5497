use std::cmp::Ordering;

use tracing::debug;

use super::{Editor, SourceEditor};
use crate::dom::{NodeId, Tree};

/// A point in the tree. Offsets count characters inside text nodes and
/// children everywhere else.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Boundary {
    pub container: NodeId,
    pub offset: usize,
}

impl Boundary {
    pub fn new(container: NodeId, offset: usize) -> Self {
        Self { container, offset }
    }

    /// The container is still part of the document and the offset fits.
    pub fn is_valid(&self, tree: &Tree) -> bool {
        tree.is_attached(self.container) && self.offset <= tree.boundary_len(self.container)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Range {
    pub start: Boundary,
    pub end: Boundary,
}

impl Range {
    pub fn new(start: Boundary, end: Boundary) -> Self {
        Self { start, end }
    }

    pub fn collapsed(&self) -> bool {
        self.start == self.end
    }
}

/// The live selection. `anchor` is where it started, `focus` where the caret is.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Selection {
    pub anchor: Boundary,
    pub focus: Boundary,
}

impl Selection {
    pub fn new(anchor: Boundary, focus: Boundary) -> Self {
        Self { anchor, focus }
    }

    pub fn caret(at: Boundary) -> Self {
        Self {
            anchor: at,
            focus: at,
        }
    }

    pub fn is_collapsed(&self) -> bool {
        self.anchor == self.focus
    }

    /// Orders anchor and focus into a range.
    pub fn range(&self, tree: &Tree) -> Option<Range> {
        match compare_boundaries(tree, &self.anchor, &self.focus)? {
            Ordering::Greater => Some(Range::new(self.focus, self.anchor)),
            _ => Some(Range::new(self.anchor, self.focus)),
        }
    }
}

/// A detached copy of the selection, taken before something may move the
/// focus away from the document (a dialog, a menu). It holds weak node
/// handles only.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct SelectionSnapshot {
    range: Option<Range>,
}

impl SelectionSnapshot {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn range(&self) -> Option<Range> {
        self.range
    }

    pub fn is_empty(&self) -> bool {
        self.range.is_none()
    }
}

/// Document order of two boundaries. `None` when either container is gone.
pub fn compare_boundaries(tree: &Tree, a: &Boundary, b: &Boundary) -> Option<Ordering> {
    if a.container == b.container {
        return Some(a.offset.cmp(&b.offset));
    }
    let mut a_key = tree.path_of(a.container)?;
    a_key.push(a.offset);
    let mut b_key = tree.path_of(b.container)?;
    b_key.push(b.offset);
    Some(a_key.cmp(&b_key))
}

/// Character span of text node `node` that lies inside `range`.
pub(crate) fn selected_chars(tree: &Tree, node: NodeId, range: &Range) -> Option<(usize, usize)> {
    let len = tree.text(node)?.chars().count();
    let lo = if range.start.container == node {
        range.start.offset
    } else if compare_boundaries(tree, &Boundary::new(node, 0), &range.start)
        .is_some_and(|order| order != Ordering::Less)
    {
        0
    } else {
        len
    };
    let hi = if range.end.container == node {
        range.end.offset
    } else if compare_boundaries(tree, &Boundary::new(node, len), &range.end)
        .is_some_and(|order| order != Ordering::Greater)
    {
        len
    } else {
        0
    };
    (lo < hi).then_some((lo, hi.min(len)))
}

/// Characters of every text node inside `range`, in document order.
pub(crate) fn text_in_range(tree: &Tree, root: NodeId, range: &Range) -> String {
    let mut out = String::new();
    for node in tree.descendants(root) {
        let (Some(text), Some((lo, hi))) = (tree.text(node), selected_chars(tree, node, range)) else {
            continue;
        };
        out.extend(text.chars().skip(lo).take(hi - lo));
    }
    out
}

impl<S: SourceEditor> Editor<S> {
    pub fn selection(&self) -> Option<Selection> {
        self.selection
    }

    /// The selection as an ordered range, if it still points into the document.
    pub fn selection_range(&self) -> Option<Range> {
        let selection = self.selection?;
        if !selection.anchor.is_valid(&self.tree) || !selection.focus.is_valid(&self.tree) {
            return None;
        }
        selection.range(&self.tree)
    }

    pub fn set_selection(&mut self, anchor: Boundary, focus: Boundary) -> bool {
        if !anchor.is_valid(&self.tree) || !focus.is_valid(&self.tree) {
            return false;
        }
        self.selection = Some(Selection::new(anchor, focus));
        true
    }

    pub fn collapse_to(&mut self, at: Boundary) -> bool {
        self.set_selection(at, at)
    }

    /// Selects everything inside `node`.
    pub fn select_node_contents(&mut self, node: NodeId) -> bool {
        let len = self.tree.boundary_len(node);
        self.set_selection(Boundary::new(node, 0), Boundary::new(node, len))
    }

    pub fn clear_selection(&mut self) {
        self.selection = None;
    }

    /// Takes a snapshot of the current selection. Call this while the
    /// triggering event is still being handled, before any dialog opens.
    pub fn capture(&self) -> SelectionSnapshot {
        SelectionSnapshot {
            range: self.selection_range(),
        }
    }

    /// Re-establishes a captured selection. Returns `false` and leaves the
    /// current selection alone when the snapshot is empty or no longer fits
    /// the document.
    pub fn restore(&mut self, snapshot: &SelectionSnapshot) -> bool {
        let Some(range) = snapshot.range else {
            debug!(target: "pure_rte::selection", "restore skipped: empty snapshot");
            return false;
        };
        if !range.start.is_valid(&self.tree) || !range.end.is_valid(&self.tree) {
            debug!(
                target: "pure_rte::selection",
                ?range,
                "restore skipped: snapshot no longer attached"
            );
            return false;
        }
        self.selection = Some(Selection::new(range.start, range.end));
        true
    }

    pub fn selected_text(&self) -> String {
        match self.selection_range() {
            Some(range) if !range.collapsed() => text_in_range(&self.tree, self.tree.root(), &range),
            _ => String::new(),
        }
    }
}
