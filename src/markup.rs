//! Tolerant reader and writer for the HTML subset the editor works in.
//!
//! This is not a conforming HTML5 parser. It understands tags, attributes,
//! comments, doctypes, raw text elements and a small set of character
//! references, and builds a [`Tree`] with a handful of implied end tags.

use crate::dom::{Fragment, NodeId, NodeKind, Tree};

const VOID_ELEMENTS: &[&str] = &[
    "area", "base", "br", "col", "embed", "hr", "img", "input", "link", "meta", "param",
    "source", "track", "wbr",
];

const RAW_TEXT_ELEMENTS: &[&str] = &["script", "style"];

/// Start tags that close an open `p`.
const CLOSES_PARAGRAPH: &[&str] = &[
    "address", "article", "aside", "blockquote", "div", "dl", "fieldset", "footer", "form", "h1",
    "h2", "h3", "h4", "h5", "h6", "header", "hr", "li", "main", "nav", "ol", "p", "pre", "section",
    "table", "ul",
];

/// Elements an implied end tag never searches past.
const SCOPE_BOUNDARIES: &[&str] = &[
    "blockquote", "body", "div", "html", "li", "ol", "td", "th", "ul",
];

const BLOCK_ELEMENTS: &[&str] = &[
    "address", "article", "aside", "blockquote", "body", "div", "dl", "dd", "dt", "fieldset",
    "figure", "footer", "form", "h1", "h2", "h3", "h4", "h5", "h6", "header", "hr", "html", "li",
    "main", "nav", "ol", "p", "pre", "section", "table", "tr", "td", "th", "ul",
];

pub fn is_void_element(name: &str) -> bool {
    VOID_ELEMENTS.contains(&name)
}

pub fn is_block_element(name: &str) -> bool {
    BLOCK_ELEMENTS.contains(&name)
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Token {
    Doctype(String),
    StartTag {
        name: String,
        attributes: Vec<(String, String)>,
        self_closing: bool,
    },
    EndTag(String),
    Comment(String),
    Text(String),
}

/// Splits `input` into tokens. Never fails; anything that does not look like
/// markup is passed through as text.
pub fn tokenize(input: &str) -> Vec<Token> {
    let mut tokens = Vec::new();
    let bytes = input.as_bytes();
    let mut pos = 0;
    let mut text_start = 0;

    while pos < bytes.len() {
        if bytes[pos] != b'<' {
            pos += 1;
            continue;
        }
        let rest = &input[pos..];
        let next = bytes.get(pos + 1).copied();

        let consumed = if rest.starts_with("<!--") {
            flush_text(&mut tokens, &input[text_start..pos]);
            let body_start = pos + 4;
            let (comment, end) = match input[body_start..].find("-->") {
                Some(idx) => (&input[body_start..body_start + idx], body_start + idx + 3),
                None => (&input[body_start..], bytes.len()),
            };
            tokens.push(Token::Comment(comment.to_string()));
            Some(end)
        } else if next == Some(b'!') || next == Some(b'?') {
            flush_text(&mut tokens, &input[text_start..pos]);
            let end = input[pos..].find('>').map(|idx| pos + idx + 1).unwrap_or(bytes.len());
            let inner = input[pos + 2..end].trim_end_matches('>');
            let inner = inner
                .strip_prefix("DOCTYPE")
                .or_else(|| inner.strip_prefix("doctype"))
                .unwrap_or(inner);
            tokens.push(Token::Doctype(inner.trim().to_string()));
            Some(end)
        } else if next == Some(b'/') && bytes.get(pos + 2).is_some_and(u8::is_ascii_alphabetic) {
            flush_text(&mut tokens, &input[text_start..pos]);
            let name_start = pos + 2;
            let name_end = scan_name(bytes, name_start);
            let end = input[name_end..]
                .find('>')
                .map(|idx| name_end + idx + 1)
                .unwrap_or(bytes.len());
            tokens.push(Token::EndTag(
                input[name_start..name_end].to_ascii_lowercase(),
            ));
            Some(end)
        } else if next.is_some_and(|b| b.is_ascii_alphabetic()) {
            flush_text(&mut tokens, &input[text_start..pos]);
            let (token, mut end) = scan_start_tag(input, pos + 1);
            let raw_text_name = match &token {
                Token::StartTag {
                    name,
                    self_closing: false,
                    ..
                } if RAW_TEXT_ELEMENTS.contains(&name.as_str()) => Some(name.clone()),
                _ => None,
            };
            tokens.push(token);
            if let Some(name) = raw_text_name {
                let closing = format!("</{name}");
                let lowered = input[end..].to_ascii_lowercase();
                let raw_end = lowered.find(&closing).map(|idx| end + idx).unwrap_or(bytes.len());
                if raw_end > end {
                    tokens.push(Token::Text(input[end..raw_end].to_string()));
                }
                end = input[raw_end..]
                    .find('>')
                    .map(|idx| raw_end + idx + 1)
                    .unwrap_or(bytes.len());
                if raw_end < bytes.len() {
                    tokens.push(Token::EndTag(name));
                }
            }
            Some(end)
        } else {
            None
        };

        match consumed {
            Some(end) => {
                pos = end;
                text_start = end;
            }
            None => pos += 1,
        }
    }
    flush_text(&mut tokens, &input[text_start..]);
    tokens
}

fn flush_text(tokens: &mut Vec<Token>, raw: &str) {
    if raw.is_empty() {
        return;
    }
    tokens.push(Token::Text(decode_entities(raw)));
}

fn scan_name(bytes: &[u8], start: usize) -> usize {
    let mut end = start;
    while end < bytes.len() {
        let b = bytes[end];
        if b.is_ascii_whitespace() || b == b'>' || b == b'/' {
            break;
        }
        end += 1;
    }
    end
}

fn scan_start_tag(input: &str, name_start: usize) -> (Token, usize) {
    let bytes = input.as_bytes();
    let name_end = scan_name(bytes, name_start);
    let name = input[name_start..name_end].to_ascii_lowercase();
    let mut attributes = Vec::new();
    let mut self_closing = false;
    let mut pos = name_end;

    loop {
        while pos < bytes.len() && bytes[pos].is_ascii_whitespace() {
            pos += 1;
        }
        if pos >= bytes.len() {
            break;
        }
        match bytes[pos] {
            b'>' => {
                pos += 1;
                break;
            }
            b'/' => {
                pos += 1;
                if bytes.get(pos) == Some(&b'>') {
                    self_closing = true;
                    pos += 1;
                    break;
                }
                continue;
            }
            _ => {}
        }

        let attr_start = pos;
        while pos < bytes.len() {
            let b = bytes[pos];
            if b.is_ascii_whitespace() || b == b'=' || b == b'>' || b == b'/' {
                break;
            }
            pos += 1;
        }
        let attr_name = input[attr_start..pos].to_ascii_lowercase();
        while pos < bytes.len() && bytes[pos].is_ascii_whitespace() {
            pos += 1;
        }

        let mut value = String::new();
        if bytes.get(pos) == Some(&b'=') {
            pos += 1;
            while pos < bytes.len() && bytes[pos].is_ascii_whitespace() {
                pos += 1;
            }
            match bytes.get(pos) {
                Some(&quote) if quote == b'"' || quote == b'\'' => {
                    let value_start = pos + 1;
                    let value_end = input[value_start..]
                        .find(quote as char)
                        .map(|idx| value_start + idx)
                        .unwrap_or(bytes.len());
                    value = decode_entities(&input[value_start..value_end]);
                    pos = (value_end + 1).min(bytes.len());
                }
                Some(_) => {
                    let value_start = pos;
                    while pos < bytes.len() && !bytes[pos].is_ascii_whitespace() && bytes[pos] != b'>'
                    {
                        pos += 1;
                    }
                    value = decode_entities(&input[value_start..pos]);
                }
                None => {}
            }
        }

        if !attr_name.is_empty() && !attributes.iter().any(|(key, _)| key == &attr_name) {
            attributes.push((attr_name, value));
        }
    }

    (
        Token::StartTag {
            name,
            attributes,
            self_closing,
        },
        pos,
    )
}

/// Decodes `&amp; &lt; &gt; &quot; &apos; &nbsp;` and well-formed numeric
/// references. Anything else is left as written.
pub fn decode_entities(raw: &str) -> String {
    if !raw.contains('&') {
        return raw.to_string();
    }
    let mut out = String::with_capacity(raw.len());
    let mut rest = raw;
    while let Some(amp) = rest.find('&') {
        out.push_str(&rest[..amp]);
        rest = &rest[amp..];
        let Some(semi) = rest[1..].find(';').map(|idx| idx + 1).filter(|idx| *idx <= 10) else {
            out.push('&');
            rest = &rest[1..];
            continue;
        };
        let name = &rest[1..semi];
        let decoded = match name {
            "amp" => Some('&'),
            "lt" => Some('<'),
            "gt" => Some('>'),
            "quot" => Some('"'),
            "apos" => Some('\''),
            "nbsp" => Some('\u{a0}'),
            _ => name.strip_prefix('#').and_then(|number| {
                let value = match number.strip_prefix(['x', 'X']) {
                    Some(hex) => u32::from_str_radix(hex, 16).ok(),
                    None => number.parse::<u32>().ok(),
                };
                value.and_then(char::from_u32)
            }),
        };
        match decoded {
            Some(ch) => {
                out.push(ch);
                rest = &rest[semi + 1..];
            }
            None => {
                out.push('&');
                rest = &rest[1..];
            }
        }
    }
    out.push_str(rest);
    out
}

/// Builds a detached tree from `input`.
pub fn parse_fragment(input: &str) -> Fragment {
    let mut tree = Tree::new();
    let root = tree.root();
    let mut open: Vec<NodeId> = vec![root];

    for token in tokenize(input) {
        let parent = open.last().copied().unwrap_or(root);
        match token {
            Token::Doctype(_) => {}
            Token::Comment(text) => {
                let comment = tree.create_comment(text);
                tree.append_child(parent, comment);
            }
            Token::Text(text) => {
                if text.is_empty() {
                    continue;
                }
                let last = tree.children(parent).last().copied();
                match last.filter(|node| tree.is_text(*node)) {
                    Some(previous) => {
                        let mut merged = tree.text(previous).unwrap_or_default().to_string();
                        merged.push_str(&text);
                        tree.set_text(previous, merged);
                    }
                    None => {
                        let node = tree.create_text(text);
                        tree.append_child(parent, node);
                    }
                }
            }
            Token::StartTag {
                name,
                attributes,
                self_closing,
            } => {
                apply_implied_end_tags(&tree, &mut open, &name);
                let parent = open.last().copied().unwrap_or(root);
                let element = tree.create_element_with_attributes(&name, attributes);
                tree.append_child(parent, element);
                if !self_closing && !is_void_element(&name) {
                    open.push(element);
                }
            }
            Token::EndTag(name) => {
                if let Some(depth) = open
                    .iter()
                    .rposition(|node| tree.is_element_named(*node, &name))
                {
                    open.truncate(depth);
                }
            }
        }
    }

    Fragment::from_tree(tree)
}

fn apply_implied_end_tags(tree: &Tree, open: &mut Vec<NodeId>, name: &str) {
    if name == "li" {
        close_in_scope(tree, open, "li", &["ol", "ul"]);
    }
    if CLOSES_PARAGRAPH.contains(&name) {
        close_in_scope(tree, open, "p", SCOPE_BOUNDARIES);
    }
}

fn close_in_scope(tree: &Tree, open: &mut Vec<NodeId>, target: &str, boundaries: &[&str]) {
    for depth in (1..open.len()).rev() {
        let Some(tag) = tree.tag_name(open[depth]) else {
            continue;
        };
        if tag == target {
            open.truncate(depth);
            return;
        }
        if boundaries.contains(&tag) {
            return;
        }
    }
}

/// Serializes the children of `id` (the usual way to read a container's markup).
pub fn serialize_children(tree: &Tree, id: NodeId) -> String {
    let mut out = String::new();
    let mut pending: Vec<Step<'_>> = tree
        .children(id)
        .iter()
        .rev()
        .map(|child| Step::Node(*child))
        .collect();
    while let Some(step) = pending.pop() {
        match step {
            Step::Raw(text) => out.push_str(text),
            Step::Close(name) => {
                out.push_str("</");
                out.push_str(name);
                out.push('>');
            }
            Step::Node(node) => write_node(tree, node, &mut out, &mut pending),
        }
    }
    out
}

/// Work left to do while serializing; children are pushed in reverse.
enum Step<'a> {
    Node(NodeId),
    Raw(&'a str),
    Close(&'a str),
}

fn write_node<'a>(tree: &'a Tree, id: NodeId, out: &mut String, pending: &mut Vec<Step<'a>>) {
    match tree.kind(id) {
        Some(NodeKind::Root) => {
            pending.extend(tree.children(id).iter().rev().map(|child| Step::Node(*child)));
        }
        Some(NodeKind::Text(text)) => out.push_str(&escape_text(text)),
        Some(NodeKind::Comment(text)) => {
            out.push_str("<!--");
            out.push_str(text);
            out.push_str("-->");
        }
        Some(NodeKind::Element(element)) => {
            out.push('<');
            out.push_str(&element.name);
            for (key, value) in &element.attributes {
                out.push(' ');
                out.push_str(key);
                out.push_str("=\"");
                out.push_str(&escape_attribute(value));
                out.push('"');
            }
            out.push('>');
            if is_void_element(&element.name) {
                return;
            }
            pending.push(Step::Close(&element.name));
            let raw = RAW_TEXT_ELEMENTS.contains(&element.name.as_str());
            for child in tree.children(id).iter().rev() {
                match tree.text(*child) {
                    Some(text) if raw => pending.push(Step::Raw(text)),
                    _ => pending.push(Step::Node(*child)),
                }
            }
        }
        None => {}
    }
}

pub fn escape_text(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '\u{a0}' => out.push_str("&nbsp;"),
            _ => out.push(ch),
        }
    }
    out
}

pub fn escape_attribute(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for ch in value.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '"' => out.push_str("&quot;"),
            '\u{a0}' => out.push_str("&nbsp;"),
            _ => out.push(ch),
        }
    }
    out
}
