use super::{Editor, SourceEditor};
use crate::dom::{NodeId, Tree};

/// Inline formatting that is inherited from enclosing elements.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum StyleCategory {
    Bold,
    Italic,
    Underline,
    Strikethrough,
    Quote,
}

impl StyleCategory {
    pub const ALL: [StyleCategory; 5] = [
        StyleCategory::Bold,
        StyleCategory::Italic,
        StyleCategory::Underline,
        StyleCategory::Strikethrough,
        StyleCategory::Quote,
    ];

    pub fn from_tag(tag: &str) -> Option<Self> {
        match tag {
            "b" | "strong" => Some(StyleCategory::Bold),
            "i" | "em" => Some(StyleCategory::Italic),
            "u" => Some(StyleCategory::Underline),
            "s" | "strike" | "del" => Some(StyleCategory::Strikethrough),
            "blockquote" | "q" => Some(StyleCategory::Quote),
            _ => None,
        }
    }

    /// The element the sanitizer uses to express this category.
    pub fn canonical_tag(self) -> &'static str {
        match self {
            StyleCategory::Bold => "b",
            StyleCategory::Italic => "i",
            StyleCategory::Underline => "u",
            StyleCategory::Strikethrough => "s",
            StyleCategory::Quote => "blockquote",
        }
    }

    fn bit(self) -> u8 {
        match self {
            StyleCategory::Bold => 1,
            StyleCategory::Italic => 1 << 1,
            StyleCategory::Underline => 1 << 2,
            StyleCategory::Strikethrough => 1 << 3,
            StyleCategory::Quote => 1 << 4,
        }
    }
}

pub(crate) fn style_category_label(category: StyleCategory) -> &'static str {
    match category {
        StyleCategory::Bold => "Bold",
        StyleCategory::Italic => "Italic",
        StyleCategory::Underline => "Underline",
        StyleCategory::Strikethrough => "Strikethrough",
        StyleCategory::Quote => "Quote",
    }
}

/// Which categories are active at a position.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct StyleContext {
    active: u8,
}

impl StyleContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_categories(categories: &[StyleCategory]) -> Self {
        categories
            .iter()
            .fold(Self::default(), |context, category| context.with(*category))
    }

    pub fn with(mut self, category: StyleCategory) -> Self {
        self.activate(category);
        self
    }

    pub fn activate(&mut self, category: StyleCategory) {
        self.active |= category.bit();
    }

    pub fn is_active(&self, category: StyleCategory) -> bool {
        self.active & category.bit() != 0
    }

    pub fn is_empty(&self) -> bool {
        self.active == 0
    }

    /// The categories active here but not in `other`.
    pub fn without(self, other: StyleContext) -> Self {
        Self {
            active: self.active & !other.active,
        }
    }

    /// Active categories in [`StyleCategory::ALL`] order.
    pub fn active(&self) -> Vec<StyleCategory> {
        StyleCategory::ALL
            .into_iter()
            .filter(|category| self.is_active(*category))
            .collect()
    }

    pub fn labels(&self) -> Vec<&'static str> {
        self.active().into_iter().map(style_category_label).collect()
    }
}

/// Walks from `start` up to (not including) `boundary` and collects the
/// categories of every element on the way. `start` counts when it is an
/// element itself. Stops at the tree root if `boundary` is never met.
pub fn resolve_style_context(tree: &Tree, start: NodeId, boundary: NodeId) -> StyleContext {
    let mut context = StyleContext::new();
    let mut current = Some(start);
    while let Some(node) = current {
        if node == boundary {
            break;
        }
        if let Some(category) = tree.tag_name(node).and_then(StyleCategory::from_tag) {
            context.activate(category);
        }
        current = tree.parent(node);
    }
    context
}

impl<S: SourceEditor> Editor<S> {
    /// Style context at the start of the selection. Empty without a selection.
    pub fn style_context_at_selection(&self) -> StyleContext {
        match self.selection_range() {
            Some(range) => resolve_style_context(&self.tree, range.start.container, self.tree.root()),
            None => StyleContext::new(),
        }
    }
}
