/// Handle to a node in a [`Tree`].
///
/// Handles are weak: they never keep a node alive, and once a node is removed
/// the slot's generation moves on so stale handles stop resolving.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct NodeId {
    index: u32,
    generation: u32,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ElementData {
    pub name: String,
    pub attributes: Vec<(String, String)>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum NodeKind {
    Root,
    Element(ElementData),
    Text(String),
    Comment(String),
}

#[derive(Clone, Debug)]
struct NodeData {
    kind: NodeKind,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
}

#[derive(Clone, Debug)]
struct Slot {
    generation: u32,
    node: Option<NodeData>,
}

/// Arena backed markup tree. Index 0 always holds the root container.
#[derive(Clone, Debug)]
pub struct Tree {
    slots: Vec<Slot>,
    free: Vec<u32>,
    root: NodeId,
}

impl Default for Tree {
    fn default() -> Self {
        Self::new()
    }
}

impl Tree {
    pub fn new() -> Self {
        let mut tree = Self {
            slots: Vec::new(),
            free: Vec::new(),
            root: NodeId {
                index: 0,
                generation: 0,
            },
        };
        tree.root = tree.alloc(NodeKind::Root);
        tree
    }

    pub fn root(&self) -> NodeId {
        self.root
    }

    fn alloc(&mut self, kind: NodeKind) -> NodeId {
        let data = NodeData {
            kind,
            parent: None,
            children: Vec::new(),
        };
        if let Some(index) = self.free.pop() {
            let slot = &mut self.slots[index as usize];
            slot.node = Some(data);
            return NodeId {
                index,
                generation: slot.generation,
            };
        }
        let index = self.slots.len() as u32;
        self.slots.push(Slot {
            generation: 0,
            node: Some(data),
        });
        NodeId {
            index,
            generation: 0,
        }
    }

    fn data(&self, id: NodeId) -> Option<&NodeData> {
        let slot = self.slots.get(id.index as usize)?;
        if slot.generation != id.generation {
            return None;
        }
        slot.node.as_ref()
    }

    fn data_mut(&mut self, id: NodeId) -> Option<&mut NodeData> {
        let slot = self.slots.get_mut(id.index as usize)?;
        if slot.generation != id.generation {
            return None;
        }
        slot.node.as_mut()
    }

    /// Whether the handle still resolves to a live node (attached or not).
    pub fn contains(&self, id: NodeId) -> bool {
        self.data(id).is_some()
    }

    pub fn create_element(&mut self, name: &str) -> NodeId {
        self.create_element_with_attributes(name, Vec::new())
    }

    pub fn create_element_with_attributes(
        &mut self,
        name: &str,
        attributes: Vec<(String, String)>,
    ) -> NodeId {
        self.alloc(NodeKind::Element(ElementData {
            name: name.to_ascii_lowercase(),
            attributes,
        }))
    }

    pub fn create_text(&mut self, text: impl Into<String>) -> NodeId {
        self.alloc(NodeKind::Text(text.into()))
    }

    pub fn create_comment(&mut self, text: impl Into<String>) -> NodeId {
        self.alloc(NodeKind::Comment(text.into()))
    }

    pub fn kind(&self, id: NodeId) -> Option<&NodeKind> {
        self.data(id).map(|data| &data.kind)
    }

    pub fn tag_name(&self, id: NodeId) -> Option<&str> {
        match self.kind(id)? {
            NodeKind::Element(element) => Some(element.name.as_str()),
            _ => None,
        }
    }

    pub fn is_element_named(&self, id: NodeId, name: &str) -> bool {
        self.tag_name(id).is_some_and(|tag| tag == name)
    }

    pub fn is_text(&self, id: NodeId) -> bool {
        matches!(self.kind(id), Some(NodeKind::Text(_)))
    }

    /// Elements and the root can hold children; text and comments cannot.
    pub fn is_container(&self, id: NodeId) -> bool {
        matches!(
            self.kind(id),
            Some(NodeKind::Root) | Some(NodeKind::Element(_))
        )
    }

    pub fn text(&self, id: NodeId) -> Option<&str> {
        match self.kind(id)? {
            NodeKind::Text(text) => Some(text.as_str()),
            _ => None,
        }
    }

    pub fn set_text(&mut self, id: NodeId, value: impl Into<String>) -> bool {
        match self.data_mut(id).map(|data| &mut data.kind) {
            Some(NodeKind::Text(text)) => {
                *text = value.into();
                true
            }
            _ => false,
        }
    }

    pub fn attributes(&self, id: NodeId) -> &[(String, String)] {
        match self.kind(id) {
            Some(NodeKind::Element(element)) => &element.attributes,
            _ => &[],
        }
    }

    pub fn attribute(&self, id: NodeId, name: &str) -> Option<&str> {
        self.attributes(id)
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.data(id)?.parent
    }

    pub fn children(&self, id: NodeId) -> &[NodeId] {
        self.data(id)
            .map(|data| data.children.as_slice())
            .unwrap_or(&[])
    }

    pub fn child_count(&self, id: NodeId) -> usize {
        self.children(id).len()
    }

    pub fn index_in_parent(&self, id: NodeId) -> Option<usize> {
        let parent = self.parent(id)?;
        self.children(parent).iter().position(|child| *child == id)
    }

    /// Ancestors of `id`, nearest first, excluding `id` itself.
    pub fn ancestors(&self, id: NodeId) -> Ancestors<'_> {
        Ancestors {
            tree: self,
            next: self.parent(id),
        }
    }

    pub fn is_ancestor_of(&self, ancestor: NodeId, node: NodeId) -> bool {
        self.ancestors(node).any(|candidate| candidate == ancestor)
    }

    /// Live and reachable from the root.
    pub fn is_attached(&self, id: NodeId) -> bool {
        if !self.contains(id) {
            return false;
        }
        id == self.root || self.is_ancestor_of(self.root, id)
    }

    /// Length of the node in boundary units: characters for text, children otherwise.
    pub fn boundary_len(&self, id: NodeId) -> usize {
        match self.kind(id) {
            Some(NodeKind::Text(text)) | Some(NodeKind::Comment(text)) => text.chars().count(),
            Some(_) => self.child_count(id),
            None => 0,
        }
    }

    /// Child indices leading from the root down to `id`.
    pub fn path_of(&self, id: NodeId) -> Option<Vec<usize>> {
        let mut path = Vec::new();
        let mut current = id;
        while current != self.root {
            path.push(self.index_in_parent(current)?);
            current = self.parent(current)?;
        }
        path.reverse();
        Some(path)
    }

    pub fn append_child(&mut self, parent: NodeId, child: NodeId) -> bool {
        let index = self.child_count(parent);
        let index = if self.parent(child) == Some(parent) {
            index.saturating_sub(1)
        } else {
            index
        };
        self.insert_child(parent, index, child)
    }

    /// Inserts `child` at `index` among `parent`'s children, detaching it from
    /// wherever it currently lives. The index is interpreted after detaching.
    pub fn insert_child(&mut self, parent: NodeId, index: usize, child: NodeId) -> bool {
        if !self.is_container(parent) || !self.contains(child) || child == self.root {
            return false;
        }
        // A childless node cannot be an ancestor of anything.
        if child == parent
            || (self.child_count(child) > 0 && self.is_ancestor_of(child, parent))
        {
            return false;
        }
        self.adopt(parent, index, child)
    }

    /// Moves `child` under `parent` without checking for cycles.
    fn adopt(&mut self, parent: NodeId, index: usize, child: NodeId) -> bool {
        self.detach(child);
        let Some(data) = self.data_mut(parent) else {
            return false;
        };
        let index = index.min(data.children.len());
        data.children.insert(index, child);
        if let Some(child_data) = self.data_mut(child) {
            child_data.parent = Some(parent);
        }
        true
    }

    /// Unlinks `id` from its parent. The node stays alive as a detached subtree.
    pub fn detach(&mut self, id: NodeId) -> bool {
        let Some(parent) = self.parent(id) else {
            return false;
        };
        if let Some(parent_data) = self.data_mut(parent) {
            parent_data.children.retain(|child| *child != id);
        }
        if let Some(data) = self.data_mut(id) {
            data.parent = None;
        }
        true
    }

    /// Detaches `id` and frees its whole subtree.
    pub fn remove(&mut self, id: NodeId) -> bool {
        if id == self.root || !self.contains(id) {
            return false;
        }
        self.detach(id);
        self.free_subtree(id);
        true
    }

    fn free_subtree(&mut self, id: NodeId) {
        let mut pending = vec![id];
        while let Some(current) = pending.pop() {
            let Some(slot) = self.slots.get_mut(current.index as usize) else {
                continue;
            };
            if slot.generation != current.generation {
                continue;
            }
            if let Some(data) = slot.node.take() {
                pending.extend(data.children);
            }
            slot.generation = slot.generation.wrapping_add(1);
            self.free.push(current.index);
        }
    }

    pub fn clear_children(&mut self, id: NodeId) {
        let children = self.children(id).to_vec();
        for child in children {
            self.remove(child);
        }
    }

    /// All nodes below `id` in document order, `id` excluded.
    pub fn descendants(&self, id: NodeId) -> Vec<NodeId> {
        let mut result = Vec::new();
        let mut pending: Vec<NodeId> = self.children(id).iter().rev().copied().collect();
        while let Some(current) = pending.pop() {
            result.push(current);
            pending.extend(self.children(current).iter().rev().copied());
        }
        result
    }

    pub fn text_content(&self, id: NodeId) -> String {
        let mut out = String::new();
        if let Some(text) = self.text(id) {
            out.push_str(text);
            return out;
        }
        for node in self.descendants(id) {
            if let Some(text) = self.text(node) {
                out.push_str(text);
            }
        }
        out
    }

    /// Splits a text node at a character offset. The original keeps the head;
    /// the returned node holds the tail and is inserted right after it.
    pub fn split_text(&mut self, id: NodeId, offset: usize) -> Option<NodeId> {
        let text = self.text(id)?.to_string();
        let parent = self.parent(id)?;
        let index = self.index_in_parent(id)?;
        let byte_idx = char_to_byte_idx(&text, offset);
        let (head, tail) = text.split_at(byte_idx);
        let tail_node = self.create_text(tail);
        self.set_text(id, head);
        self.insert_child(parent, index + 1, tail_node);
        Some(tail_node)
    }

    /// Copies an element or text node without its children.
    pub fn shallow_clone(&mut self, id: NodeId) -> Option<NodeId> {
        let kind = self.kind(id)?.clone();
        if matches!(kind, NodeKind::Root) {
            return None;
        }
        Some(self.alloc(kind))
    }

    /// Splits an element so that children from `index` on move into a shallow
    /// clone inserted right after it. Returns the clone.
    pub fn split_element(&mut self, id: NodeId, index: usize) -> Option<NodeId> {
        let parent = self.parent(id)?;
        let position = self.index_in_parent(id)?;
        let clone = self.shallow_clone(id)?;
        let moved: Vec<NodeId> = self.children(id).iter().skip(index).copied().collect();
        self.insert_child(parent, position + 1, clone);
        for (offset, child) in moved.into_iter().enumerate() {
            self.adopt(clone, offset, child);
        }
        Some(clone)
    }

    /// Replaces an element by its children, returning them in order.
    pub fn unwrap_element(&mut self, id: NodeId) -> Option<Vec<NodeId>> {
        if self.tag_name(id).is_none() {
            return None;
        }
        let parent = self.parent(id)?;
        let position = self.index_in_parent(id)?;
        let children = std::mem::take(&mut self.data_mut(id)?.children);
        for child in &children {
            if let Some(data) = self.data_mut(*child) {
                data.parent = Some(parent);
            }
        }
        if let Some(parent_data) = self.data_mut(parent) {
            parent_data
                .children
                .splice(position..=position, children.iter().copied());
        }
        if let Some(data) = self.data_mut(id) {
            data.parent = None;
        }
        self.free_subtree(id);
        Some(children)
    }

    /// Moves the fragment's top-level nodes under `parent` starting at `index`.
    /// The fragment is consumed; the inserted top-level nodes are returned.
    pub fn insert_fragment(
        &mut self,
        fragment: Fragment,
        parent: NodeId,
        index: usize,
    ) -> Vec<NodeId> {
        if !self.is_container(parent) {
            return Vec::new();
        }
        let source = fragment.into_tree();
        let mut inserted = Vec::new();
        let mut position = index.min(self.child_count(parent));
        for child in source.children(source.root()) {
            let copy = self.import_node(&source, *child);
            if self.insert_child(parent, position, copy) {
                inserted.push(copy);
                position += 1;
            }
        }
        inserted
    }

    fn import_node(&mut self, source: &Tree, id: NodeId) -> NodeId {
        let kind = source.kind(id).cloned().unwrap_or(NodeKind::Root);
        let copy = self.alloc(kind);
        let mut pending: Vec<(NodeId, NodeId)> = source
            .children(id)
            .iter()
            .rev()
            .map(|child| (*child, copy))
            .collect();
        while let Some((node, parent)) = pending.pop() {
            let kind = source.kind(node).cloned().unwrap_or(NodeKind::Root);
            let node_copy = self.alloc(kind);
            self.append_child(parent, node_copy);
            pending.extend(
                source
                    .children(node)
                    .iter()
                    .rev()
                    .map(|child| (*child, node_copy)),
            );
        }
        copy
    }
}

pub struct Ancestors<'a> {
    tree: &'a Tree,
    next: Option<NodeId>,
}

impl Iterator for Ancestors<'_> {
    type Item = NodeId;

    fn next(&mut self) -> Option<Self::Item> {
        let current = self.next?;
        self.next = self.tree.parent(current);
        Some(current)
    }
}

/// A detached tree that is not yet part of the live document.
#[derive(Clone, Debug, Default)]
pub struct Fragment {
    tree: Tree,
}

impl Fragment {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_tree(tree: Tree) -> Self {
        Self { tree }
    }

    pub fn tree(&self) -> &Tree {
        &self.tree
    }

    pub fn tree_mut(&mut self) -> &mut Tree {
        &mut self.tree
    }

    pub fn root(&self) -> NodeId {
        self.tree.root()
    }

    pub fn is_empty(&self) -> bool {
        self.tree.child_count(self.tree.root()) == 0
    }

    pub fn into_tree(self) -> Tree {
        self.tree
    }
}

pub fn char_to_byte_idx(text: &str, char_idx: usize) -> usize {
    if char_idx == 0 {
        return 0;
    }
    for (count, (byte_idx, _)) in text.char_indices().enumerate() {
        if count == char_idx {
            return byte_idx;
        }
    }
    text.len()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn paragraph_with_text(tree: &mut Tree, text: &str) -> (NodeId, NodeId) {
        let root = tree.root();
        let paragraph = tree.create_element("p");
        let text = tree.create_text(text);
        tree.append_child(root, paragraph);
        tree.append_child(paragraph, text);
        (paragraph, text)
    }

    #[test]
    fn removed_handles_stop_resolving() {
        let mut tree = Tree::new();
        let (paragraph, text) = paragraph_with_text(&mut tree, "hello");
        assert!(tree.remove(paragraph));
        assert!(!tree.contains(paragraph));
        assert!(!tree.contains(text));

        let reused = tree.create_text("again");
        assert!(tree.contains(reused));
        assert!(!tree.contains(text));
        assert!(!tree.contains(paragraph));
    }

    #[test]
    fn detached_nodes_are_alive_but_not_attached() {
        let mut tree = Tree::new();
        let (paragraph, text) = paragraph_with_text(&mut tree, "hello");
        assert!(tree.is_attached(text));
        assert!(tree.detach(paragraph));
        assert!(tree.contains(text));
        assert!(!tree.is_attached(text));
    }

    #[test]
    fn split_text_keeps_head_in_place() {
        let mut tree = Tree::new();
        let (paragraph, text) = paragraph_with_text(&mut tree, "héllo world");
        let tail = tree.split_text(text, 5).unwrap();
        assert_eq!(tree.text(text), Some("héllo"));
        assert_eq!(tree.text(tail), Some(" world"));
        assert_eq!(tree.children(paragraph), &[text, tail]);
    }

    #[test]
    fn split_element_moves_trailing_children() {
        let mut tree = Tree::new();
        let root = tree.root();
        let bold = tree.create_element("b");
        tree.append_child(root, bold);
        let first = tree.create_text("one");
        let second = tree.create_text("two");
        tree.append_child(bold, first);
        tree.append_child(bold, second);

        let clone = tree.split_element(bold, 1).unwrap();
        assert_eq!(tree.tag_name(clone), Some("b"));
        assert_eq!(tree.children(bold), &[first]);
        assert_eq!(tree.children(clone), &[second]);
        assert_eq!(tree.children(root), &[bold, clone]);
    }

    #[test]
    fn unwrap_element_hoists_children() {
        let mut tree = Tree::new();
        let (paragraph, _) = paragraph_with_text(&mut tree, "a");
        let italic = tree.create_element("i");
        let inner = tree.create_text("b");
        tree.append_child(italic, inner);
        tree.append_child(paragraph, italic);

        let hoisted = tree.unwrap_element(italic).unwrap();
        assert_eq!(hoisted, vec![inner]);
        assert_eq!(tree.text_content(paragraph), "ab");
        assert!(!tree.contains(italic));
    }

    #[test]
    fn insert_child_rejects_cycles() {
        let mut tree = Tree::new();
        let (paragraph, _) = paragraph_with_text(&mut tree, "a");
        let span = tree.create_element("span");
        tree.append_child(paragraph, span);
        assert!(!tree.insert_child(span, 0, paragraph));
        assert_eq!(tree.parent(span), Some(paragraph));
    }

    #[test]
    fn insert_fragment_imports_top_level_nodes() {
        let mut tree = Tree::new();
        let (paragraph, text) = paragraph_with_text(&mut tree, "ab");

        let mut fragment = Fragment::new();
        let fragment_root = fragment.root();
        let bold = fragment.tree_mut().create_element("b");
        let inner = fragment.tree_mut().create_text("x");
        fragment.tree_mut().append_child(bold, inner);
        fragment.tree_mut().append_child(fragment_root, bold);

        let inserted = tree.insert_fragment(fragment, paragraph, 1);
        assert_eq!(inserted.len(), 1);
        assert_eq!(tree.children(paragraph)[0], text);
        assert_eq!(tree.tag_name(inserted[0]), Some("b"));
        assert_eq!(tree.text_content(paragraph), "abx");
    }

    #[test]
    fn path_of_follows_child_indices() {
        let mut tree = Tree::new();
        let (_, _) = paragraph_with_text(&mut tree, "first");
        let (second, text) = paragraph_with_text(&mut tree, "second");
        assert_eq!(tree.path_of(second), Some(vec![1]));
        assert_eq!(tree.path_of(text), Some(vec![1, 0]));
        assert_eq!(tree.path_of(tree.root()), Some(vec![]));
    }

    #[test]
    fn deep_fragments_import_and_unwrap_without_recursion() {
        let depth = 50_000;
        let mut fragment = Fragment::new();
        let mut parent = fragment.root();
        for _ in 0..depth {
            let bold = fragment.tree_mut().create_element("b");
            fragment.tree_mut().append_child(parent, bold);
            parent = bold;
        }
        let leaf = fragment.tree_mut().create_text("x");
        fragment.tree_mut().append_child(parent, leaf);

        let mut tree = Tree::new();
        let (paragraph, _) = paragraph_with_text(&mut tree, "a");
        let inserted = tree.insert_fragment(fragment, paragraph, 1);
        assert_eq!(inserted.len(), 1);
        assert_eq!(tree.descendants(inserted[0]).len(), depth);

        let mut current = inserted[0];
        while tree.is_element_named(current, "b") {
            let children = tree.unwrap_element(current).unwrap();
            current = children[0];
        }
        assert_eq!(tree.text(current), Some("x"));
        assert_eq!(tree.text_content(paragraph), "ax");
    }
}
