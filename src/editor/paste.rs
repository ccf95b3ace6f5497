//! Turns clipboard payloads into fragments that are safe to insert.
//!
//! Markup from other applications is reduced to a small set of block and
//! inline elements, and the inline formatting active at the caret is
//! reapplied so that pasting into bold text stays bold.

use tracing::debug;

use super::styles::{StyleCategory, StyleContext, resolve_style_context};
use super::{Editor, SourceEditor};
use crate::dom::{Fragment, NodeId, NodeKind, Tree};
use crate::markup;

pub const HTML_MIME: &str = "text/html";
pub const TEXT_MIME: &str = "text/plain";

const START_FRAGMENT: &str = "<!--StartFragment-->";
const END_FRAGMENT: &str = "<!--EndFragment-->";

/// Elements removed together with everything inside them.
const DROPPED_ELEMENTS: &[&str] = &[
    "script", "style", "head", "title", "meta", "link", "iframe", "object", "embed", "template",
    "noscript", "svg", "math", "form", "input", "button", "select", "textarea",
];

/// Elements that survive sanitizing. Everything else is replaced by its children.
const ALLOWED_ELEMENTS: &[&str] = &[
    "p", "div", "br", "ul", "ol", "li", "blockquote", "h1", "h2", "h3", "h4", "h5", "h6", "pre",
    "b", "i", "u", "s", "a", "code", "sub", "sup", "q",
];

const SAFE_SCHEMES: &[&str] = &["http", "https", "mailto"];

/// Containers whose children are blocks rather than running text.
const FLOW_CONTAINERS: &[&str] = &["blockquote", "div", "li", "ul", "ol"];

/// What kind of position a fragment is inserted at. Inside running text a
/// quote can only be expressed inline.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PasteTarget {
    Flow,
    Phrasing,
}

impl PasteTarget {
    /// Classifies the children of `parent`.
    pub fn of(tree: &Tree, parent: NodeId) -> Self {
        match tree.tag_name(parent) {
            Some(tag) if !FLOW_CONTAINERS.contains(&tag) => PasteTarget::Phrasing,
            _ => PasteTarget::Flow,
        }
    }

    fn wrapper_tag(self, category: StyleCategory) -> &'static str {
        match (self, category) {
            (PasteTarget::Phrasing, StyleCategory::Quote) => "q",
            _ => category.canonical_tag(),
        }
    }
}

/// Read access to the data a paste event carries.
pub trait ClipboardData {
    fn has_type(&self, mime: &str) -> bool;
    fn get_data(&self, mime: &str) -> Option<String>;
}

/// Clipboard contents held in memory, keyed by MIME type.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ClipboardPayload {
    entries: Vec<(String, String)>,
}

impl ClipboardPayload {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn plain_text(text: impl Into<String>) -> Self {
        Self::new().with_data(TEXT_MIME, text)
    }

    pub fn html(markup: impl Into<String>) -> Self {
        Self::new().with_data(HTML_MIME, markup)
    }

    pub fn with_data(mut self, mime: &str, data: impl Into<String>) -> Self {
        let data = data.into();
        match self.entries.iter_mut().find(|(key, _)| key == mime) {
            Some(entry) => entry.1 = data,
            None => self.entries.push((mime.to_string(), data)),
        }
        self
    }
}

impl ClipboardData for ClipboardPayload {
    fn has_type(&self, mime: &str) -> bool {
        self.entries.iter().any(|(key, _)| key == mime)
    }

    fn get_data(&self, mime: &str) -> Option<String> {
        self.entries
            .iter()
            .find(|(key, _)| key == mime)
            .map(|(_, value)| value.clone())
    }
}

/// Builds the fragment for a paste at a position with the given style context.
/// Markup wins over plain text; an empty clipboard gives an empty fragment.
pub fn clean(clipboard: &dyn ClipboardData, context: StyleContext) -> Fragment {
    clean_for(clipboard, context, PasteTarget::Flow)
}

/// Like [`clean`], with the quote wrapper chosen for `target`.
pub fn clean_for(
    clipboard: &dyn ClipboardData,
    context: StyleContext,
    target: PasteTarget,
) -> Fragment {
    reconcile_styles(clipboard_fragment(clipboard), context, target)
}

fn clipboard_fragment(clipboard: &dyn ClipboardData) -> Fragment {
    let markup = clipboard
        .has_type(HTML_MIME)
        .then(|| clipboard.get_data(HTML_MIME))
        .flatten()
        .filter(|markup| !markup.trim().is_empty());

    match markup {
        Some(markup) => sanitize_markup(&markup),
        None => match clipboard.get_data(TEXT_MIME) {
            Some(text) => plain_text_fragment(&text),
            None => {
                debug!(target: "pure_rte::paste", "clipboard offers neither markup nor text");
                Fragment::new()
            }
        },
    }
}

/// Reduces arbitrary markup to the allowed subset.
pub fn sanitize_markup(raw: &str) -> Fragment {
    let windowed = fragment_window(raw);
    let source = if windowed.to_ascii_lowercase().contains("<body") {
        markup::parse_fragment(windowed)
    } else {
        markup::parse_fragment(&format!("<html><body>{windowed}</body></html>"))
    };
    let tree = source.tree();
    let body = tree
        .descendants(source.root())
        .into_iter()
        .find(|node| tree.is_element_named(*node, "body"))
        .unwrap_or(source.root());

    let mut out = Fragment::new();
    let out_root = out.root();
    copy_sanitized_children(tree, body, out.tree_mut(), out_root);
    debug!(
        target: "pure_rte::paste",
        input_len = raw.len(),
        nodes = out.tree().descendants(out_root).len(),
        "sanitized markup"
    );
    out
}

/// Content between the `StartFragment`/`EndFragment` markers some producers
/// put around the copied part of a page. The whole input otherwise.
fn fragment_window(raw: &str) -> &str {
    let Some(start) = raw.find(START_FRAGMENT) else {
        return raw;
    };
    let inner = &raw[start + START_FRAGMENT.len()..];
    match inner.find(END_FRAGMENT) {
        Some(end) => &inner[..end],
        None => inner,
    }
}

fn copy_sanitized_children(source: &Tree, from: NodeId, out: &mut Tree, into: NodeId) {
    let mut pending: Vec<(NodeId, NodeId)> = source
        .children(from)
        .iter()
        .rev()
        .map(|child| (*child, into))
        .collect();
    while let Some((child, into)) = pending.pop() {
        match source.kind(child) {
            Some(NodeKind::Text(text)) => append_text(out, into, text),
            Some(NodeKind::Element(element)) => {
                let name = element.name.as_str();
                if DROPPED_ELEMENTS.contains(&name) {
                    continue;
                }
                let tag = canonical_tag(name);
                let mut target = into;
                if ALLOWED_ELEMENTS.contains(&tag) {
                    let href = match tag {
                        "a" => source.attribute(child, "href").and_then(safe_href),
                        _ => None,
                    };
                    let attributes = href
                        .map(|href| vec![("href".to_string(), href)])
                        .unwrap_or_default();
                    let element = out.create_element_with_attributes(tag, attributes);
                    out.append_child(into, element);
                    target = element;
                }
                if let Some(style) = source.attribute(child, "style") {
                    for wrapper in style_wrappers(style) {
                        if wrapper == tag {
                            continue;
                        }
                        let element = out.create_element(wrapper);
                        out.append_child(target, element);
                        target = element;
                    }
                }
                pending.extend(
                    source
                        .children(child)
                        .iter()
                        .rev()
                        .map(|grandchild| (*grandchild, target)),
                );
            }
            _ => {}
        }
    }
}

fn append_text(tree: &mut Tree, parent: NodeId, text: &str) {
    if text.is_empty() {
        return;
    }
    let last = tree.children(parent).last().copied();
    if let Some(previous) = last.filter(|node| tree.is_text(*node)) {
        let merged = format!("{}{}", tree.text(previous).unwrap_or_default(), text);
        tree.set_text(previous, merged);
        return;
    }
    let node = tree.create_text(text);
    tree.append_child(parent, node);
}

fn canonical_tag(name: &str) -> &str {
    match name {
        "strong" => "b",
        "em" => "i",
        "strike" | "del" => "s",
        other => other,
    }
}

/// Keeps `http`, `https` and `mailto` links as well as relative ones.
pub fn safe_href(href: &str) -> Option<String> {
    let compact: String = href
        .chars()
        .filter(|ch| !ch.is_whitespace() && !ch.is_control())
        .collect();
    if compact.is_empty() {
        return None;
    }
    let scheme_end = compact.find(':');
    let path_start = compact.find(['/', '?', '#']);
    match (scheme_end, path_start) {
        (Some(colon), Some(path)) if path < colon => Some(href.trim().to_string()),
        (Some(colon), _) => {
            let scheme = compact[..colon].to_ascii_lowercase();
            SAFE_SCHEMES
                .contains(&scheme.as_str())
                .then(|| href.trim().to_string())
        }
        (None, _) => Some(href.trim().to_string()),
    }
}

/// Formatting elements equivalent to an inline `style` declaration, in
/// `b`, `i`, `u`, `s` order.
pub fn style_wrappers(style: &str) -> Vec<&'static str> {
    let mut bold = false;
    let mut italic = false;
    let mut underline = false;
    let mut strike = false;

    for declaration in style.split(';') {
        let Some((property, value)) = declaration.split_once(':') else {
            continue;
        };
        let property = property.trim().to_ascii_lowercase();
        let value = value.to_ascii_lowercase().replace("!important", "");
        let value = value.trim();
        match property.as_str() {
            "font-weight" => {
                bold |= matches!(value, "bold" | "bolder")
                    || value.parse::<u32>().is_ok_and(|weight| weight >= 600);
            }
            "font-style" => italic |= matches!(value, "italic" | "oblique"),
            "text-decoration" | "text-decoration-line" => {
                underline |= value.contains("underline");
                strike |= value.contains("line-through");
            }
            _ => {}
        }
    }

    [(bold, "b"), (italic, "i"), (underline, "u"), (strike, "s")]
        .into_iter()
        .filter_map(|(active, tag)| active.then_some(tag))
        .collect()
}

/// Plain text with every run of line terminators turned into one `<br>`.
/// The text itself is never interpreted as markup.
pub fn plain_text_fragment(text: &str) -> Fragment {
    let mut fragment = Fragment::new();
    let root = fragment.root();
    let tree = fragment.tree_mut();
    let mut current = String::new();
    let mut in_break = false;

    for ch in text.chars() {
        if ch == '\r' || ch == '\n' {
            if !in_break {
                if !current.is_empty() {
                    let node = tree.create_text(std::mem::take(&mut current));
                    tree.append_child(root, node);
                }
                let br = tree.create_element("br");
                tree.append_child(root, br);
                in_break = true;
            }
            continue;
        }
        in_break = false;
        current.push(ch);
    }
    if !current.is_empty() {
        let node = tree.create_text(current);
        tree.append_child(root, node);
    }
    fragment
}

/// Wraps the fragment so every active category of `context` covers all of
/// its text. The quote ends up outermost, followed by `b`, `i`, `u`, `s`.
pub fn reconcile_styles(
    mut fragment: Fragment,
    context: StyleContext,
    target: PasteTarget,
) -> Fragment {
    if fragment.is_empty() || context.is_empty() {
        return fragment;
    }
    let root = fragment.root();
    let wrapping_order = [
        StyleCategory::Strikethrough,
        StyleCategory::Underline,
        StyleCategory::Italic,
        StyleCategory::Bold,
        StyleCategory::Quote,
    ];
    for category in wrapping_order {
        if !context.is_active(category) || covers_all_text(fragment.tree(), root, category) {
            continue;
        }
        let tree = fragment.tree_mut();
        let wrapper = tree.create_element(target.wrapper_tag(category));
        for child in tree.children(root).to_vec() {
            tree.append_child(wrapper, child);
        }
        tree.append_child(root, wrapper);
    }
    fragment
}

fn covers_all_text(tree: &Tree, root: NodeId, category: StyleCategory) -> bool {
    let mut pending: Vec<(NodeId, bool)> = tree
        .children(root)
        .iter()
        .map(|child| (*child, false))
        .collect();
    while let Some((node, covered)) = pending.pop() {
        if tree.is_text(node) {
            if !covered {
                return false;
            }
            continue;
        }
        let covered = covered
            || tree.tag_name(node).and_then(StyleCategory::from_tag) == Some(category);
        pending.extend(tree.children(node).iter().map(|child| (*child, covered)));
    }
    true
}

impl<S: SourceEditor> Editor<S> {
    /// Inserts clipboard contents at the selection, carrying over the inline
    /// formatting active there. Formatting the insertion point already
    /// inherits is not applied a second time.
    pub fn paste(&mut self, clipboard: &dyn ClipboardData) -> bool {
        if !self.is_visual() {
            return false;
        }
        let context = self.style_context_at_selection();
        let fragment = clipboard_fragment(clipboard);
        if fragment.is_empty() {
            return false;
        }
        let Some((parent, index)) = self.prepare_insertion() else {
            return false;
        };
        let inherited = resolve_style_context(&self.tree, parent, self.tree.root());
        let missing = context.without(inherited);
        let target = PasteTarget::of(&self.tree, parent);
        debug!(
            target: "pure_rte::paste",
            styles = ?context.labels(),
            applied = ?missing.labels(),
            ?target,
            "pasting fragment"
        );
        let fragment = reconcile_styles(fragment, missing, target);
        self.insert_fragment_at(fragment, parent, index)
    }
}
