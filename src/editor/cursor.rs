use std::cmp::Ordering;

use super::content::{insertion_point, is_locked, isolate_range};
use super::selection::{Boundary, Range, compare_boundaries};
use super::{Editor, SourceEditor};
use crate::dom::{NodeId, Tree, char_to_byte_idx};
use crate::markup::{is_block_element, is_void_element};

/// A position the caret can rest on, with the visual line it belongs to.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CaretStop {
    pub boundary: Boundary,
    pub line: usize,
}

/// Walks the tree once and lists every distinct caret position.
///
/// Adjacent text nodes (for example `a` and `<b>b</b>`) share the position
/// between them, which is represented by the end of the first node. Line
/// breaks, block boundaries and locked elements separate positions.
struct StopCollector<'a> {
    tree: &'a Tree,
    stops: Vec<CaretStop>,
    line: usize,
    line_start: usize,
    after_text: bool,
    pending: Option<Boundary>,
}

/// An element whose children are being walked.
struct Frame {
    node: NodeId,
    next: usize,
    /// Number of stops before a block element was entered.
    block_start: Option<usize>,
}

impl<'a> StopCollector<'a> {
    fn new(tree: &'a Tree) -> Self {
        Self {
            tree,
            stops: Vec::new(),
            line: 0,
            line_start: 0,
            after_text: false,
            pending: None,
        }
    }

    fn push(&mut self, boundary: Boundary) {
        self.stops.push(CaretStop {
            boundary,
            line: self.line,
        });
    }

    fn flush_pending(&mut self) {
        if let Some(boundary) = self.pending.take() {
            self.push(boundary);
        }
    }

    fn break_line(&mut self) {
        self.flush_pending();
        if self.stops.len() > self.line_start {
            self.line += 1;
            self.line_start = self.stops.len();
        }
        self.after_text = false;
    }

    fn collect(&mut self, root: NodeId) {
        let tree = self.tree;
        let mut frames = vec![Frame {
            node: root,
            next: 0,
            block_start: None,
        }];
        while let Some(frame) = frames.last_mut() {
            let node = frame.node;
            let index = frame.next;
            frame.next += 1;
            let Some(child) = tree.children(node).get(index).copied() else {
                if let Some(before) = frames.pop().and_then(|frame| frame.block_start) {
                    self.flush_pending();
                    if self.stops.len() == before {
                        self.push(Boundary::new(node, 0));
                    }
                    self.break_line();
                }
                continue;
            };
            if let Some(text) = tree.text(child) {
                let len = text.chars().count();
                if len == 0 {
                    continue;
                }
                self.pending = None;
                let first = usize::from(self.after_text);
                for offset in first..=len {
                    self.push(Boundary::new(child, offset));
                }
                self.after_text = true;
                continue;
            }
            let Some(tag) = tree.tag_name(child) else {
                continue;
            };
            if tag == "br" || is_locked(tree, child) {
                if !self.after_text {
                    self.pending = None;
                    self.push(Boundary::new(node, index));
                }
                if tag == "br" {
                    self.line += 1;
                    self.line_start = self.stops.len();
                }
                self.after_text = false;
                self.pending = Some(Boundary::new(node, index + 1));
            } else if is_block_element(tag) {
                self.break_line();
                frames.push(Frame {
                    node: child,
                    next: 0,
                    block_start: Some(self.stops.len()),
                });
            } else if !is_void_element(tag) {
                frames.push(Frame {
                    node: child,
                    next: 0,
                    block_start: None,
                });
            }
        }
    }

    fn finish(mut self) -> Vec<CaretStop> {
        self.flush_pending();
        if self.stops.is_empty() {
            self.push(Boundary::new(self.tree.root(), 0));
        }
        self.stops
    }
}

pub fn caret_stops(tree: &Tree) -> Vec<CaretStop> {
    let mut collector = StopCollector::new(tree);
    collector.collect(tree.root());
    collector.finish()
}

/// Index of the stop at `at`, or of the first stop after it.
pub(crate) fn stop_index(tree: &Tree, stops: &[CaretStop], at: &Boundary) -> usize {
    if let Some(index) = stops.iter().position(|stop| stop.boundary == *at) {
        return index;
    }
    stops
        .iter()
        .position(|stop| {
            compare_boundaries(tree, &stop.boundary, at).is_some_and(|order| order != Ordering::Less)
        })
        .unwrap_or(stops.len().saturating_sub(1))
}

fn block_of(tree: &Tree, node: NodeId) -> NodeId {
    std::iter::once(node)
        .chain(tree.ancestors(node))
        .find(|candidate| tree.tag_name(*candidate).is_some_and(is_block_element))
        .unwrap_or(tree.root())
}

/// Joins the block holding `next` onto the block holding `previous`.
fn merge_blocks(tree: &mut Tree, previous: NodeId, next: NodeId) -> bool {
    let previous_block = block_of(tree, previous);
    let next_block = block_of(tree, next);
    if previous_block == next_block || next_block == tree.root() {
        return false;
    }
    if tree.is_ancestor_of(next_block, previous_block) {
        return false;
    }
    if tree.is_ancestor_of(previous_block, next_block) {
        return tree.unwrap_element(next_block).is_some();
    }
    for child in tree.children(next_block).to_vec() {
        tree.append_child(previous_block, child);
    }
    tree.remove(next_block)
}

impl<S: SourceEditor> Editor<S> {
    pub fn caret_stops(&self) -> Vec<CaretStop> {
        caret_stops(&self.tree)
    }

    /// The caret (selection focus) moved onto the nearest caret stop.
    pub fn caret_position(&self) -> Option<Boundary> {
        let selection = self.selection?;
        if !selection.focus.is_valid(&self.tree) {
            return None;
        }
        let stops = self.caret_stops();
        let index = stop_index(&self.tree, &stops, &selection.focus);
        stops.get(index).map(|stop| stop.boundary)
    }

    fn move_focus(
        &mut self,
        extend: bool,
        target: impl FnOnce(&[CaretStop], usize) -> Option<usize>,
    ) -> bool {
        let stops = self.caret_stops();
        let current = self
            .selection
            .filter(|selection| selection.focus.is_valid(&self.tree))
            .map(|selection| stop_index(&self.tree, &stops, &selection.focus));
        let Some(index) = target(&stops, current.unwrap_or(0)) else {
            return false;
        };
        let Some(stop) = stops.get(index) else {
            return false;
        };
        let anchor = match (extend, self.selection) {
            (true, Some(selection)) if current.is_some() => selection.anchor,
            _ => stop.boundary,
        };
        self.set_selection(anchor, stop.boundary)
    }

    fn collapse_selection(&mut self, to_end: bool) -> bool {
        let Some(range) = self.selection_range().filter(|range| !range.collapsed()) else {
            return false;
        };
        let at = if to_end { range.end } else { range.start };
        self.collapse_to(at)
    }

    pub fn move_left(&mut self, extend: bool) -> bool {
        if !extend && self.collapse_selection(false) {
            return true;
        }
        self.move_focus(extend, |_, index| index.checked_sub(1))
    }

    pub fn move_right(&mut self, extend: bool) -> bool {
        if !extend && self.collapse_selection(true) {
            return true;
        }
        self.move_focus(extend, |stops, index| {
            (index + 1 < stops.len()).then_some(index + 1)
        })
    }

    pub fn move_to_line_start(&mut self, extend: bool) -> bool {
        self.move_focus(extend, |stops, index| {
            let line = stops.get(index)?.line;
            stops.iter().position(|stop| stop.line == line)
        })
    }

    pub fn move_to_line_end(&mut self, extend: bool) -> bool {
        self.move_focus(extend, |stops, index| {
            let line = stops.get(index)?.line;
            stops.iter().rposition(|stop| stop.line == line)
        })
    }

    pub fn move_to_document_start(&mut self, extend: bool) -> bool {
        self.move_focus(extend, |_, _| Some(0))
    }

    pub fn move_to_document_end(&mut self, extend: bool) -> bool {
        self.move_focus(extend, |stops, _| stops.len().checked_sub(1))
    }

    /// Types `text` at the caret, replacing the selected content first.
    pub fn insert_text(&mut self, text: &str) -> bool {
        if !self.is_visual() || text.is_empty() {
            return false;
        }
        let caret = match self.selection_range() {
            Some(range) if !range.collapsed() => self.delete_range_contents(&range),
            Some(_) => self.caret_position(),
            None => self.caret_stops().last().map(|stop| stop.boundary),
        };
        let Some(caret) = caret else {
            return false;
        };
        let inserted = text.chars().count();

        if let Some(existing) = self.tree.text(caret.container) {
            let mut updated = existing.to_string();
            updated.insert_str(char_to_byte_idx(existing, caret.offset), text);
            self.tree.set_text(caret.container, updated);
            return self.collapse_to(Boundary::new(caret.container, caret.offset + inserted));
        }

        let Some((parent, index)) = insertion_point(&mut self.tree, caret) else {
            return false;
        };
        let node = self.tree.create_text(text);
        self.tree.insert_child(parent, index, node);
        self.collapse_to(Boundary::new(node, inserted))
    }

    /// Backspace: removes the selection, the character before the caret, or
    /// whatever separates the caret from the previous position.
    pub fn delete_backward(&mut self) -> bool {
        if !self.is_visual() {
            return false;
        }
        if let Some(range) = self.selection_range().filter(|range| !range.collapsed()) {
            return self.delete_range_contents(&range).is_some();
        }
        let stops = self.caret_stops();
        let Some(focus) = self
            .selection
            .map(|selection| selection.focus)
            .filter(|focus| focus.is_valid(&self.tree))
        else {
            return false;
        };
        let index = stop_index(&self.tree, &stops, &focus);
        let Some(caret) = stops.get(index).map(|stop| stop.boundary) else {
            return false;
        };

        if let Some(existing) = self.tree.text(caret.container).map(str::to_string) {
            if caret.offset > 0 {
                let start = char_to_byte_idx(&existing, caret.offset - 1);
                let end = char_to_byte_idx(&existing, caret.offset);
                let mut updated = existing;
                updated.replace_range(start..end, "");
                if updated.is_empty() {
                    let parent = self.tree.parent(caret.container);
                    let position = self.tree.index_in_parent(caret.container);
                    self.tree.remove(caret.container);
                    if let (Some(parent), Some(position)) = (parent, position) {
                        self.collapse_to(Boundary::new(parent, position));
                    }
                    return true;
                }
                self.tree.set_text(caret.container, updated);
                return self.collapse_to(Boundary::new(caret.container, caret.offset - 1));
            }
        }

        let Some(previous) = index.checked_sub(1).and_then(|prev| stops.get(prev)) else {
            return false;
        };
        let previous = previous.boundary;
        let range = Range::new(previous, caret);
        let Some((parent, run)) = isolate_range(&mut self.tree, &range) else {
            return false;
        };
        if run.is_empty() {
            let merged = merge_blocks(&mut self.tree, previous.container, caret.container);
            if merged {
                self.collapse_to(previous);
            }
            return merged;
        }
        let nodes: Vec<NodeId> = self.tree.children(parent)[run.clone()].to_vec();
        for node in nodes {
            self.tree.remove(node);
        }
        if !self.collapse_to(previous) {
            self.collapse_to(Boundary::new(parent, run.start));
        }
        true
    }
}
