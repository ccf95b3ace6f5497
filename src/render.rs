use std::ops::Range as IndexRange;

use ratatui::{
    style::{Modifier, Style},
    text::{Line, Span},
};
use unicode_width::UnicodeWidthChar;

use crate::dom::{NodeId, Tree};
use crate::editor::{Boundary, Range, SourceEditor, selected_chars};
use crate::markup::is_block_element;
use crate::source_buffer::SourceBuffer;
use crate::theme::Theme;

const LOCKED_SPACE_GLYPH: char = '·';

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CursorVisualPosition {
    pub line: usize,
    pub column: u16,
}

#[derive(Debug)]
pub struct RenderResult {
    pub lines: Vec<Line<'static>>,
    pub cursor: Option<CursorVisualPosition>,
    pub total_lines: usize,
}

/// Lays out the document for a terminal of the given width.
pub fn render_tree(
    tree: &Tree,
    width: usize,
    caret: Option<Boundary>,
    selection: Option<Range>,
    theme: &Theme,
) -> RenderResult {
    let mut renderer = Renderer::new(tree, width.max(1), caret, selection, theme);
    renderer.render_children(tree.root(), Style::default());
    renderer.finish()
}

/// Lays out the source buffer of code mode.
pub fn render_source(buffer: &SourceBuffer, width: usize, theme: &Theme) -> RenderResult {
    let width = width.max(1);
    let style = theme.source_style();
    let (cursor_line, cursor_column) = buffer.cursor();
    let mut lines = Vec::new();
    let mut cursor = None;

    for (index, text) in buffer.lines().iter().enumerate() {
        let cells: Vec<Cell> = text
            .chars()
            .map(|ch| Cell {
                ch: if ch == '\t' { ' ' } else { ch },
                style,
            })
            .collect();
        let rows = if buffer.line_wrapping() {
            wrap_cells(&cells, width, false)
        } else {
            vec![0..cells.len()]
        };
        if index == cursor_line {
            cursor = Some(locate_caret(&cells, &rows, cursor_column, lines.len(), 0));
        }
        for row in rows {
            lines.push(Line::from(styled_spans(&cells[row])));
        }
    }

    let total_lines = lines.len();
    RenderResult {
        lines,
        cursor,
        total_lines,
    }
}

#[derive(Clone, Copy, Debug)]
struct Cell {
    ch: char,
    style: Style,
}

#[derive(Clone, Debug)]
struct Prefix {
    first: String,
    continuation: String,
}

/// A block element whose children are being laid out.
struct OpenBlock<'a> {
    tag: &'a str,
    pushed_prefix: bool,
    lines_before: usize,
}

struct Frame<'a> {
    node: NodeId,
    style: Style,
    next: usize,
    block: Option<OpenBlock<'a>>,
}

struct Renderer<'a> {
    tree: &'a Tree,
    width: usize,
    caret: Option<Boundary>,
    selection: Option<Range>,
    theme: &'a Theme,
    lines: Vec<Line<'static>>,
    cells: Vec<Cell>,
    caret_cell: Option<usize>,
    prefixes: Vec<Prefix>,
    first_row_of_block: bool,
    preformatted: usize,
    cursor: Option<CursorVisualPosition>,
}

impl<'a> Renderer<'a> {
    fn new(
        tree: &'a Tree,
        width: usize,
        caret: Option<Boundary>,
        selection: Option<Range>,
        theme: &'a Theme,
    ) -> Self {
        Self {
            tree,
            width,
            caret,
            selection: selection.filter(|range| !range.collapsed()),
            theme,
            lines: Vec::new(),
            cells: Vec::new(),
            caret_cell: None,
            prefixes: Vec::new(),
            first_row_of_block: true,
            preformatted: 0,
            cursor: None,
        }
    }

    fn mark_caret(&mut self, at: Boundary) {
        if self.caret == Some(at) {
            self.caret_cell = Some(self.cells.len());
        }
    }

    fn render_children(&mut self, root: NodeId, style: Style) {
        let tree = self.tree;
        let mut frames = vec![Frame {
            node: root,
            style,
            next: 0,
            block: None,
        }];
        while let Some(frame) = frames.last_mut() {
            let node = frame.node;
            let style = frame.style;
            let index = frame.next;
            frame.next += 1;
            self.mark_caret(Boundary::new(node, index));
            let Some(child) = tree.children(node).get(index).copied() else {
                if let Some(block) = frames.pop().and_then(|frame| frame.block) {
                    self.leave_block(block);
                }
                continue;
            };
            if let Some(text) = tree.text(child) {
                // Indentation between block elements in hand-written markup.
                let layout_whitespace = text.trim().is_empty()
                    && self.cells.is_empty()
                    && self.preformatted == 0
                    && self.caret.is_none_or(|caret| caret.container != child);
                if !layout_whitespace {
                    self.render_text(child, text, style);
                }
                continue;
            }
            let Some(tag) = tree.tag_name(child) else {
                continue;
            };
            if tree
                .attribute(child, "contenteditable")
                .is_some_and(|value| value.eq_ignore_ascii_case("false"))
            {
                self.cells.push(Cell {
                    ch: LOCKED_SPACE_GLYPH,
                    style: self.theme.locked_space_style(),
                });
                continue;
            }
            match tag {
                "br" => self.flush_line(),
                "script" | "style" | "head" | "title" => {}
                _ if is_block_element(tag) => {
                    let (inner, block) = self.enter_block(tag, style);
                    frames.push(Frame {
                        node: child,
                        style: inner,
                        next: 0,
                        block: Some(block),
                    });
                }
                _ => {
                    let inner = self.inline_style(tag, style);
                    frames.push(Frame {
                        node: child,
                        style: inner,
                        next: 0,
                        block: None,
                    });
                }
            }
        }
    }

    fn render_text(&mut self, node: NodeId, text: &str, style: Style) {
        let selected = self
            .selection
            .and_then(|range| selected_chars(self.tree, node, &range));
        let mut count = 0;
        for (offset, ch) in text.chars().enumerate() {
            self.mark_caret(Boundary::new(node, offset));
            let ch = match ch {
                '\n' | '\r' | '\t' if self.preformatted == 0 => ' ',
                '\u{a0}' => ' ',
                other => other,
            };
            if ch == '\n' {
                self.flush_line();
                count = offset + 1;
                continue;
            }
            let in_selection = selected.is_some_and(|(lo, hi)| offset >= lo && offset < hi);
            let style = if in_selection {
                style.patch(self.theme.selection_style())
            } else {
                style
            };
            self.cells.push(Cell { ch, style });
            count = offset + 1;
        }
        self.mark_caret(Boundary::new(node, count));
    }

    fn enter_block(&mut self, tag: &'a str, style: Style) -> (Style, OpenBlock<'a>) {
        if !self.cells.is_empty() || self.caret_cell.is_some() {
            self.flush_line();
        }
        let prefix = match tag {
            "blockquote" => Some(Prefix {
                first: "│ ".to_string(),
                continuation: "│ ".to_string(),
            }),
            "li" => Some(Prefix {
                first: "• ".to_string(),
                continuation: "  ".to_string(),
            }),
            _ => None,
        };
        let pushed_prefix = prefix.is_some();
        if let Some(prefix) = prefix {
            self.prefixes.push(prefix);
        }
        if tag == "pre" {
            self.preformatted += 1;
        }
        if pushed_prefix {
            self.first_row_of_block = true;
        }

        let style = match tag {
            "h1" | "h2" | "h3" | "h4" | "h5" | "h6" => style.add_modifier(Modifier::BOLD),
            "pre" => style.add_modifier(Modifier::DIM),
            _ => style,
        };
        let block = OpenBlock {
            tag,
            pushed_prefix,
            lines_before: self.lines.len(),
        };
        (style, block)
    }

    fn leave_block(&mut self, block: OpenBlock<'a>) {
        if !self.cells.is_empty()
            || self.caret_cell.is_some()
            || self.lines.len() == block.lines_before
        {
            self.flush_line();
        }
        if block.tag == "pre" {
            self.preformatted -= 1;
        }
        if block.pushed_prefix {
            self.prefixes.pop();
        }
        if matches!(block.tag, "p" | "h1" | "h2" | "h3" | "h4" | "h5" | "h6" | "pre")
            && self.prefixes.is_empty()
        {
            self.lines.push(Line::default());
        }
    }

    fn inline_style(&self, tag: &str, style: Style) -> Style {
        match tag {
            "b" | "strong" => style.add_modifier(Modifier::BOLD),
            "i" | "em" => style.add_modifier(Modifier::ITALIC),
            "u" | "ins" => style.add_modifier(Modifier::UNDERLINED),
            "s" | "strike" | "del" => style.add_modifier(Modifier::CROSSED_OUT),
            "a" => style.patch(self.theme.link_style()),
            "code" | "tt" => style.add_modifier(Modifier::DIM),
            "mark" => style.patch(self.theme.highlight_style()),
            _ => style,
        }
    }

    fn current_prefix(&self) -> String {
        let mut prefix = String::new();
        let last = self.prefixes.len().saturating_sub(1);
        for (depth, entry) in self.prefixes.iter().enumerate() {
            if depth == last && self.first_row_of_block {
                prefix.push_str(&entry.first);
            } else {
                prefix.push_str(&entry.continuation);
            }
        }
        prefix
    }

    fn flush_line(&mut self) {
        let cells = std::mem::take(&mut self.cells);
        let caret = self.caret_cell.take();
        let first_prefix = self.current_prefix();
        self.first_row_of_block = false;
        let continuation = self.current_prefix();
        let prefix_width = visible_width(&first_prefix).max(visible_width(&continuation));
        let available = self.width.saturating_sub(prefix_width).max(1);
        let rows = wrap_cells(&cells, available, self.preformatted == 0);

        if let Some(caret) = caret {
            self.cursor = Some(locate_caret(
                &cells,
                &rows,
                caret,
                self.lines.len(),
                prefix_width,
            ));
        }
        for (row_index, row) in rows.into_iter().enumerate() {
            let prefix = if row_index == 0 {
                first_prefix.clone()
            } else {
                continuation.clone()
            };
            let mut spans = Vec::new();
            if !prefix.is_empty() {
                spans.push(Span::styled(prefix, self.theme.block_prefix_style()));
            }
            spans.extend(styled_spans(&cells[row]));
            self.lines.push(Line::from(spans));
        }
    }

    fn finish(mut self) -> RenderResult {
        if !self.cells.is_empty() || self.caret_cell.is_some() {
            self.flush_line();
        }
        while self
            .lines
            .last()
            .is_some_and(|line| line.spans.is_empty() && self.lines.len() > 1)
        {
            self.lines.pop();
        }
        let total_lines = self.lines.len();
        RenderResult {
            lines: self.lines,
            cursor: self.cursor,
            total_lines,
        }
    }
}

/// Splits a run of cells into rows no wider than `width`, breaking after
/// whitespace when `at_words` is set.
fn wrap_cells(cells: &[Cell], width: usize, at_words: bool) -> Vec<IndexRange<usize>> {
    let mut rows = Vec::new();
    let mut start = 0;
    let mut column = 0;
    let mut last_space: Option<usize> = None;

    for (index, cell) in cells.iter().enumerate() {
        let cell_width = cell.ch.width().unwrap_or(0);
        if column + cell_width > width && index > start {
            let break_at = match last_space {
                Some(space) if at_words && space >= start => space + 1,
                _ => index,
            };
            rows.push(start..break_at);
            start = break_at;
            last_space = None;
            column = cells[start..index]
                .iter()
                .map(|cell| cell.ch.width().unwrap_or(0))
                .sum();
        }
        if cell.ch == ' ' {
            last_space = Some(index);
        }
        column += cell_width;
    }
    rows.push(start..cells.len());
    rows
}

fn locate_caret(
    cells: &[Cell],
    rows: &[IndexRange<usize>],
    caret: usize,
    first_line: usize,
    prefix_width: usize,
) -> CursorVisualPosition {
    let caret = caret.min(cells.len());
    let row_index = rows
        .iter()
        .position(|row| caret >= row.start && caret < row.end)
        .unwrap_or(rows.len().saturating_sub(1));
    let row_start = rows.get(row_index).map(|row| row.start).unwrap_or(0);
    let column: usize = cells[row_start..caret]
        .iter()
        .map(|cell| cell.ch.width().unwrap_or(0))
        .sum();
    CursorVisualPosition {
        line: first_line + row_index,
        column: (prefix_width + column).min(u16::MAX as usize) as u16,
    }
}

fn styled_spans(cells: &[Cell]) -> Vec<Span<'static>> {
    let mut spans: Vec<Span<'static>> = Vec::new();
    let mut current = String::new();
    let mut current_style = None;
    for cell in cells {
        if current_style != Some(cell.style) && !current.is_empty() {
            spans.push(Span::styled(
                std::mem::take(&mut current),
                current_style.unwrap_or_default(),
            ));
        }
        current_style = Some(cell.style);
        current.push(cell.ch);
    }
    if !current.is_empty() {
        spans.push(Span::styled(current, current_style.unwrap_or_default()));
    }
    spans
}

fn visible_width(text: &str) -> usize {
    text.chars().map(|ch| ch.width().unwrap_or(0)).sum()
}
