use std::ops::Range as IndexRange;

use tracing::debug;

use super::selection::{Boundary, Range};
use super::{Editor, SourceEditor};
use crate::dom::{Fragment, NodeId, Tree};
use crate::markup::{self, escape_attribute, escape_text};

/// Elements that only carry inline formatting and can be removed without
/// losing content.
pub(crate) const FORMATTING_TAGS: &[&str] = &[
    "b", "strong", "i", "em", "u", "s", "strike", "del", "ins", "span", "font", "sub", "sup",
    "mark", "small", "big", "code", "tt", "q",
];

/// Inline elements that are split, but kept, when formatting is lifted off a run.
const KEPT_INLINE_TAGS: &[&str] = &["a", "abbr", "cite", "dfn", "kbd", "samp", "var"];

/// Elements the user cannot edit into (the locked space marker among them).
pub(crate) fn is_locked(tree: &Tree, id: NodeId) -> bool {
    tree.attribute(id, "contenteditable")
        .is_some_and(|value| value.eq_ignore_ascii_case("false"))
}

pub(crate) fn is_formatting_element(tree: &Tree, id: NodeId) -> bool {
    tree.tag_name(id)
        .is_some_and(|tag| FORMATTING_TAGS.contains(&tag))
        && !is_locked(tree, id)
}

fn is_kept_inline_element(tree: &Tree, id: NodeId) -> bool {
    tree.tag_name(id)
        .is_some_and(|tag| KEPT_INLINE_TAGS.contains(&tag))
}

/// Deepest node containing both `a` and `b` (either may be the other).
pub(crate) fn common_ancestor(tree: &Tree, a: NodeId, b: NodeId) -> Option<NodeId> {
    let chain: Vec<NodeId> = std::iter::once(a).chain(tree.ancestors(a)).collect();
    std::iter::once(b)
        .chain(tree.ancestors(b))
        .find(|candidate| chain.contains(candidate))
}

/// Resolves a boundary to a position between children of a container,
/// splitting a text node when the boundary falls inside it.
pub(crate) fn insertion_point(tree: &mut Tree, at: Boundary) -> Option<(NodeId, usize)> {
    if tree.is_text(at.container) {
        let parent = tree.parent(at.container)?;
        let index = tree.index_in_parent(at.container)?;
        let len = tree.boundary_len(at.container);
        return Some(match at.offset {
            0 => (parent, index),
            offset if offset >= len => (parent, index + 1),
            offset => {
                tree.split_text(at.container, offset)?;
                (parent, index + 1)
            }
        });
    }
    let accepts_children = tree.is_container(at.container)
        && !tree
            .tag_name(at.container)
            .is_some_and(markup::is_void_element);
    if accepts_children {
        return Some((at.container, at.offset.min(tree.child_count(at.container))));
    }
    let parent = tree.parent(at.container)?;
    let index = tree.index_in_parent(at.container)?;
    Some((parent, index + 1))
}

/// Splits text and elements along the path from `at` up to `ancestor` and
/// returns the child index of `ancestor` the boundary now falls on.
fn split_up_to(tree: &mut Tree, at: Boundary, ancestor: NodeId) -> Option<usize> {
    let (mut node, mut offset) = if at.container == ancestor {
        return Some(at.offset.min(tree.child_count(ancestor)));
    } else if tree.is_text(at.container) {
        insertion_point(tree, at)?
    } else {
        (at.container, at.offset)
    };

    while node != ancestor {
        let parent = tree.parent(node)?;
        let index = tree.index_in_parent(node)?;
        offset = if offset == 0 {
            index
        } else if offset >= tree.child_count(node) {
            index + 1
        } else {
            tree.split_element(node, offset)?;
            index + 1
        };
        node = parent;
    }
    Some(offset)
}

/// Splits the tree at both ends of `range` so that the selected content is
/// exactly a run of siblings. Returns the run's parent and child indices.
pub(crate) fn isolate_range(tree: &mut Tree, range: &Range) -> Option<(NodeId, IndexRange<usize>)> {
    let mut ancestor = common_ancestor(tree, range.start.container, range.end.container)?;
    if tree.is_text(ancestor) {
        ancestor = tree.parent(ancestor)?;
    }

    // The end side goes first so that splitting the start never invalidates it.
    let end_index = split_up_to(tree, range.end, ancestor)?;
    let end_marker = tree.children(ancestor).get(end_index).copied();

    let start_index = split_up_to(tree, range.start, ancestor)?;
    let end_index = match end_marker {
        Some(marker) => tree.index_in_parent(marker)?,
        None => tree.child_count(ancestor),
    };
    Some((ancestor, start_index..end_index.max(start_index)))
}

/// Replaces `id` by its children if it is a formatting element, after doing
/// the same for every descendant. Returns the nodes now standing where `id`
/// was.
fn strip_formatting(tree: &mut Tree, id: NodeId, changed: &mut bool) -> Vec<NodeId> {
    if is_locked(tree, id) {
        return vec![id];
    }
    // Reversed pre-order with children pushed left to right is a post-order,
    // so every element is visited after its descendants.
    let mut order = Vec::new();
    let mut pending: Vec<NodeId> = tree.children(id).to_vec();
    while let Some(node) = pending.pop() {
        order.push(node);
        if !is_locked(tree, node) {
            pending.extend(tree.children(node).iter().copied());
        }
    }
    for node in order.into_iter().rev() {
        if is_formatting_element(tree, node) {
            *changed = true;
            tree.unwrap_element(node);
        }
    }
    if is_formatting_element(tree, id) {
        *changed = true;
        return tree.unwrap_element(id).unwrap_or_default();
    }
    vec![id]
}

/// Moves a sibling run out of every enclosing inline element. Formatting
/// elements are split around the run and dropped from it; links and other
/// kept inline elements are split but stay wrapped around the run.
fn lift_out_of_inline_ancestors(tree: &mut Tree, mut run: Vec<NodeId>, changed: &mut bool) -> Vec<NodeId> {
    loop {
        let Some(first) = run.first().copied() else {
            return run;
        };
        let Some(parent) = tree.parent(first) else {
            return run;
        };
        let formatting = is_formatting_element(tree, parent);
        if !formatting && !is_kept_inline_element(tree, parent) {
            return run;
        }
        let Some(start) = tree.index_in_parent(first) else {
            return run;
        };
        let end = start + run.len();
        if end < tree.child_count(parent) && tree.split_element(parent, end).is_none() {
            return run;
        }
        let middle = if start > 0 {
            match tree.split_element(parent, start) {
                Some(clone) => clone,
                None => return run,
            }
        } else {
            parent
        };
        if formatting {
            *changed = true;
            run = tree.unwrap_element(middle).unwrap_or_default();
        } else {
            run = vec![middle];
        }
    }
}

impl<S: SourceEditor> Editor<S> {
    /// Wraps the selected content in a new `tag` element and selects the
    /// wrapper's contents. A caret gets an empty element with the caret inside.
    pub fn wrap_inside_tag(&mut self, tag: &str) -> bool {
        if !self.is_visual() {
            return false;
        }
        let Some(range) = self.selection_range() else {
            return false;
        };

        let isolated = if range.collapsed() {
            insertion_point(&mut self.tree, range.start).map(|(parent, index)| (parent, index..index))
        } else {
            isolate_range(&mut self.tree, &range)
        };
        let Some((parent, run)) = isolated else {
            debug!(target: "pure_rte::content", tag, "wrap skipped: range could not be isolated");
            return false;
        };

        let nodes: Vec<NodeId> = self.tree.children(parent)[run.clone()].to_vec();
        let wrapper = self.tree.create_element(tag);
        self.tree.insert_child(parent, run.start, wrapper);
        for node in nodes {
            self.tree.append_child(wrapper, node);
        }
        self.select_node_contents(wrapper);
        true
    }

    /// Removes inline formatting inside the selection and lifts the selection
    /// out of formatting that encloses it. Text and its order stay the same.
    pub fn clear_selection_style(&mut self) -> bool {
        if !self.is_visual() {
            return false;
        }
        let Some(range) = self.selection_range() else {
            return false;
        };
        if range.collapsed() {
            return false;
        }
        let Some((parent, run)) = isolate_range(&mut self.tree, &range) else {
            return false;
        };

        let mut changed = false;
        let nodes: Vec<NodeId> = self.tree.children(parent)[run].to_vec();
        let lifted = lift_out_of_inline_ancestors(&mut self.tree, nodes, &mut changed);
        let mut result = Vec::new();
        for node in lifted {
            result.extend(strip_formatting(&mut self.tree, node, &mut changed));
        }

        let span = result.first().zip(result.last()).and_then(|(first, last)| {
            Some((
                self.tree.parent(*first)?,
                self.tree.index_in_parent(*first)?,
                self.tree.index_in_parent(*last)?,
            ))
        });
        if let Some((parent, start, end)) = span {
            self.set_selection(Boundary::new(parent, start), Boundary::new(parent, end + 1));
        }
        changed
    }

    /// Deletes the selected content (only for a non-collapsed selection that
    /// starts in text) and inserts `markup` at the caret.
    pub fn replace_selection_by_html(&mut self, markup: &str) -> bool {
        if !self.is_visual() {
            return false;
        }
        self.insert_fragment(markup::parse_fragment(markup))
    }

    /// Inserts a link in place of the selection.
    pub fn wrap_inside_link(&mut self, text: &str, href: &str, new_tab: bool) -> bool {
        let mut link = format!("<a href=\"{}\"", escape_attribute(href));
        if new_tab {
            link.push_str(&format!(
                " target=\"{}\" rel=\"{}\"",
                escape_attribute(&self.config.link_target),
                escape_attribute(&self.config.link_rel)
            ));
        }
        link.push('>');
        link.push_str(&escape_text(text));
        link.push_str("</a>");
        self.replace_selection_by_html(&link)
    }

    pub fn insert_line_break(&mut self) -> bool {
        let markup = self.config.line_break_markup();
        self.replace_selection_by_html(&markup)
    }

    /// Inserts the non-editable locked space marker.
    pub fn insert_locked_space(&mut self) -> bool {
        let markup = self.config.locked_space_markup();
        self.replace_selection_by_html(&markup)
    }

    /// Shared insertion path: removes the selected content when allowed, then
    /// inserts the fragment and puts the caret right after it. Without a
    /// selection the fragment is appended to the document.
    pub fn insert_fragment(&mut self, fragment: Fragment) -> bool {
        if !self.is_visual() || fragment.is_empty() {
            return false;
        }
        let Some((parent, index)) = self.prepare_insertion() else {
            return false;
        };
        self.insert_fragment_at(fragment, parent, index)
    }

    /// Deletes the selected content when allowed and returns the position
    /// between children where inserted content goes.
    pub(crate) fn prepare_insertion(&mut self) -> Option<(NodeId, usize)> {
        let root = self.tree.root();
        let position = match self.selection_range() {
            None => Some((root, self.tree.child_count(root))),
            Some(range) => {
                let caret = if !range.collapsed() && self.tree.is_text(range.start.container) {
                    self.delete_range_contents(&range)
                } else {
                    Some(range.start)
                };
                caret.and_then(|caret| insertion_point(&mut self.tree, caret))
            }
        };
        if position.is_none() {
            debug!(target: "pure_rte::content", "insert skipped: no insertion point");
        }
        position
    }

    pub(crate) fn insert_fragment_at(
        &mut self,
        fragment: Fragment,
        parent: NodeId,
        index: usize,
    ) -> bool {
        let inserted = self.tree.insert_fragment(fragment, parent, index);
        if inserted.is_empty() {
            return false;
        }
        self.collapse_to(Boundary::new(parent, index + inserted.len()));
        true
    }

    /// Removes everything inside `range` and returns where the caret belongs.
    pub(crate) fn delete_range_contents(&mut self, range: &Range) -> Option<Boundary> {
        let (parent, run) = isolate_range(&mut self.tree, range)?;
        let nodes: Vec<NodeId> = self.tree.children(parent)[run.clone()].to_vec();
        for node in nodes {
            self.tree.remove(node);
        }
        let caret = Boundary::new(parent, run.start);
        self.collapse_to(caret);
        Some(caret)
    }
}
