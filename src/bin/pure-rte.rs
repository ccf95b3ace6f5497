use std::{
    env,
    fs::{self, OpenOptions},
    io,
    path::{Path, PathBuf},
    sync::Mutex,
    time::{Duration, Instant},
};

use anyhow::{Context, Result, anyhow};
use crossterm::{
    event::{
        self, DisableBracketedPaste, EnableBracketedPaste, Event, KeyCode, KeyEvent,
        KeyEventKind, KeyModifiers,
    },
    execute,
    terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode},
};
use ratatui::{
    Frame, Terminal,
    backend::CrosstermBackend,
    layout::{Constraint, Direction, Layout, Position, Rect},
    style::Style,
    text::{Line, Span, Text},
    widgets::{Block, Borders, Clear, Paragraph, Wrap},
};
use tdoc::{Document, markdown, parse, writer::Writer};
use tracing::{debug, info, warn};
use tracing_subscriber::EnvFilter;

use pure_rte::editor::{
    ClipboardPayload, DialogValues, FieldDescriptor, FieldValue, Notification, PendingLink,
};
use pure_rte::render::{RenderResult, render_source, render_tree};
use pure_rte::theme::Theme;
use pure_rte::{Editor, EditorMode};

const STATUS_TIMEOUT: Duration = Duration::from_secs(4);
const LOG_FILE_ENV: &str = "PURE_RTE_LOG";

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum DocumentFormat {
    Ftml,
    Markdown,
}

impl DocumentFormat {
    fn from_path(path: &Path) -> Self {
        let ext = path
            .extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| ext.to_ascii_lowercase());
        match ext.as_deref() {
            Some("md") | Some("markdown") | Some("mkd") | Some("mdown") | Some("mdtxt") => {
                DocumentFormat::Markdown
            }
            _ => DocumentFormat::Ftml,
        }
    }
}

fn main() -> Result<()> {
    run()
}

/// Logs go to the file named by `PURE_RTE_LOG`, filtered by `RUST_LOG`.
/// Without the variable nothing is logged, since stdout belongs to the UI.
fn init_logging() -> Result<()> {
    let Some(path) = env::var_os(LOG_FILE_ENV) else {
        return Ok(());
    };
    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(&path)
        .with_context(|| format!("failed to open log file {}", PathBuf::from(&path).display()))?;
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(Mutex::new(file))
        .with_ansi(false)
        .try_init()
        .map_err(|err| anyhow!("failed to install log subscriber: {err}"))?;
    Ok(())
}

fn run() -> Result<()> {
    let mut args = env::args().skip(1);
    let Some(path_arg) = args.next() else {
        eprintln!("Usage: pure-rte <file.ftml|file.md>");
        return Ok(());
    };
    init_logging()?;
    let path = PathBuf::from(path_arg);

    let (markup, format, initial_status) = load_document(&path)?;
    let mut app = App::new(&markup, path, format, initial_status);

    enable_raw_mode().context("failed to enable raw mode")?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen, EnableBracketedPaste)
        .context("failed to initialize terminal")?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend).context("failed to create terminal backend")?;
    terminal.clear().ok();

    let res = run_app(&mut terminal, &mut app).context("application error");

    disable_raw_mode().ok();
    execute!(
        terminal.backend_mut(),
        LeaveAlternateScreen,
        DisableBracketedPaste
    )
    .ok();
    terminal.show_cursor().ok();

    res
}

/// Reads the file and converts it to the markup the editor works on.
fn load_document(path: &Path) -> Result<(String, DocumentFormat, Option<String>)> {
    let format = DocumentFormat::from_path(path);
    if !path.exists() {
        return Ok((String::new(), format, Some("New document".to_string())));
    }
    let content =
        fs::read_to_string(path).with_context(|| format!("failed to read {}", path.display()))?;
    let parsed = match format {
        DocumentFormat::Ftml => parse(io::Cursor::new(content))
            .map_err(|err| -> Box<dyn std::error::Error + Send + Sync> { Box::new(err) }),
        DocumentFormat::Markdown => markdown::parse(io::Cursor::new(content)),
    };
    match parsed {
        Ok(document) => {
            let markup = document_to_markup(&document)?;
            info!(target: "pure_rte::app", path = %path.display(), ?format, "document loaded");
            Ok((markup, format, None))
        }
        Err(err) => {
            warn!(target: "pure_rte::app", path = %path.display(), %err, "parse failed");
            let message = format!("Parse error: {err}. Starting with empty document.");
            Ok((String::new(), format, Some(message)))
        }
    }
}

fn document_to_markup(document: &Document) -> Result<String> {
    let ftml = Writer::new()
        .write_to_string(document)
        .context("failed to render FTML")?;
    Ok(body_markup(&ftml).to_string())
}

/// The inner markup of `<body>` if the text is a full page.
fn body_markup(markup: &str) -> &str {
    let lower = markup.to_ascii_lowercase();
    let Some(open) = lower.find("<body") else {
        return markup;
    };
    let Some(content_start) = lower[open..].find('>').map(|end| open + end + 1) else {
        return markup;
    };
    let content_end = lower[content_start..]
        .find("</body")
        .map(|end| content_start + end)
        .unwrap_or(markup.len());
    &markup[content_start..content_end]
}

fn run_app<B: ratatui::backend::Backend>(terminal: &mut Terminal<B>, app: &mut App) -> Result<()> {
    let tick_rate = Duration::from_millis(250);
    let mut last_tick = Instant::now();
    let mut needs_redraw = true;

    while !app.should_quit {
        if needs_redraw {
            terminal
                .draw(|frame| app.draw(frame))
                .context("failed to draw frame")?;
            needs_redraw = false;
        }

        let timeout = tick_rate
            .checked_sub(last_tick.elapsed())
            .unwrap_or_else(|| Duration::from_secs(0));

        if event::poll(timeout).context("event poll failed")? {
            let evt = event::read().context("failed to read event")?;
            app.handle_event(evt)?;
            needs_redraw = true;
        }

        if last_tick.elapsed() >= tick_rate {
            let had_message_before = app.status_message.is_some();
            app.prune_status_message();
            last_tick = Instant::now();
            if had_message_before && app.status_message.is_none() {
                needs_redraw = true;
            }
        }
    }

    Ok(())
}

enum DialogInput {
    Text(String),
    Checkbox(bool),
}

struct DialogField {
    key: String,
    label: String,
    input: DialogInput,
}

/// The link dialog while it is open. The pending insertion keeps the
/// selection that was live when the dialog was requested.
struct LinkDialog {
    pending: PendingLink,
    fields: Vec<DialogField>,
    focus: usize,
}

impl LinkDialog {
    fn new(pending: PendingLink) -> Self {
        let fields = pending
            .request
            .fields
            .iter()
            .map(|field| DialogField {
                key: field.key().to_string(),
                label: field.label().to_string(),
                input: match field {
                    FieldDescriptor::Text { initial, .. } => DialogInput::Text(initial.clone()),
                    FieldDescriptor::Checkbox { default, .. } => DialogInput::Checkbox(*default),
                },
            })
            .collect();
        Self {
            pending,
            fields,
            focus: 0,
        }
    }

    fn values(&self) -> DialogValues {
        let mut values = DialogValues::new();
        for field in &self.fields {
            let value = match &field.input {
                DialogInput::Text(text) => FieldValue::Text(text.clone()),
                DialogInput::Checkbox(checked) => FieldValue::Flag(*checked),
            };
            values.set(&field.key, value);
        }
        values
    }

    fn focus_next(&mut self) {
        if !self.fields.is_empty() {
            self.focus = (self.focus + 1) % self.fields.len();
        }
    }

    fn focus_previous(&mut self) {
        if !self.fields.is_empty() {
            self.focus = (self.focus + self.fields.len() - 1) % self.fields.len();
        }
    }

    fn field_line(field: &DialogField) -> String {
        match &field.input {
            DialogInput::Text(text) => format!("{}: {}", field.label, text),
            DialogInput::Checkbox(checked) => {
                format!("[{}] {}", if *checked { "x" } else { " " }, field.label)
            }
        }
    }
}

enum DialogOutcome {
    Open,
    Confirmed,
    Cancelled,
}

struct App {
    editor: Editor,
    theme: Theme,
    file_path: PathBuf,
    document_format: DocumentFormat,
    status_message: Option<(String, Instant)>,
    dirty: bool,
    should_quit: bool,
    scroll_top: usize,
    link_dialog: Option<LinkDialog>,
}

impl App {
    fn new(
        markup: &str,
        file_path: PathBuf,
        document_format: DocumentFormat,
        initial_status: Option<String>,
    ) -> Self {
        let mut editor = Editor::from_markup(markup);
        editor.move_to_document_start(false);
        Self {
            editor,
            theme: Theme::new(),
            file_path,
            document_format,
            status_message: initial_status.map(|message| (message, Instant::now())),
            dirty: false,
            should_quit: false,
            scroll_top: 0,
            link_dialog: None,
        }
    }

    fn set_status(&mut self, message: impl Into<String>) {
        self.status_message = Some((message.into(), Instant::now()));
    }

    fn prune_status_message(&mut self) {
        if let Some((_, instant)) = &self.status_message
            && instant.elapsed() > STATUS_TIMEOUT
        {
            self.status_message = None;
        }
    }

    fn mark_dirty(&mut self, changed: bool) {
        if changed {
            self.dirty = true;
        }
    }

    fn render(&self, width: usize) -> RenderResult {
        match self.editor.source_editor() {
            Some(source) => render_source(source, width, &self.theme),
            None => render_tree(
                self.editor.tree(),
                width,
                self.editor.caret_position(),
                self.editor.selection_range(),
                &self.theme,
            ),
        }
    }

    fn draw(&mut self, frame: &mut Frame) {
        let area = frame.area();
        if area.height == 0 || area.width == 0 {
            return;
        }

        let vertical = Layout::default()
            .direction(Direction::Vertical)
            .constraints([Constraint::Min(1), Constraint::Length(1)])
            .split(area);
        let text_area = vertical[0];
        let status_area = vertical[1];

        let render = self.render(text_area.width.max(1) as usize);
        let viewport_height = text_area.height as usize;
        self.adjust_scroll(&render, viewport_height);

        let paragraph = Paragraph::new(Text::from(render.lines.clone()))
            .wrap(Wrap { trim: false })
            .block(Block::default().borders(Borders::NONE))
            .scroll((self.scroll_top as u16, 0));
        frame.render_widget(paragraph, text_area);

        if self.link_dialog.is_none()
            && let Some(cursor) = render.cursor
            && cursor.line >= self.scroll_top
            && cursor.line < self.scroll_top + viewport_height
        {
            let cursor_y = text_area.y + (cursor.line - self.scroll_top) as u16;
            let cursor_x = text_area.x + cursor.column.min(text_area.width - 1);
            frame.set_cursor_position(Position::new(cursor_x, cursor_y));
        }

        let status_line = self.status_line(status_area.width as usize);
        let status_widget = Paragraph::new(status_line)
            .block(Block::default().borders(Borders::NONE))
            .style(self.theme.status_bar_style());
        frame.render_widget(status_widget, status_area);

        if self.link_dialog.is_some() {
            self.render_link_dialog(frame, area);
        }
    }

    fn adjust_scroll(&mut self, render: &RenderResult, viewport_height: usize) {
        let viewport = viewport_height.max(1);
        let max_scroll = render.total_lines.saturating_sub(viewport);
        if let Some(cursor) = render.cursor {
            if cursor.line < self.scroll_top {
                self.scroll_top = cursor.line;
            } else if cursor.line >= self.scroll_top + viewport {
                self.scroll_top = cursor.line + 1 - viewport;
            }
        }
        self.scroll_top = self.scroll_top.min(max_scroll);
    }

    fn render_link_dialog(&self, frame: &mut Frame, area: Rect) {
        let Some(dialog) = &self.link_dialog else {
            return;
        };
        if area.width < 3 || area.height < 3 {
            return;
        }

        let footer = "Enter:OK Esc:Cancel Tab:Next";
        let content_width = dialog
            .fields
            .iter()
            .map(|field| LinkDialog::field_line(field).chars().count())
            .chain([footer.len(), 40])
            .max()
            .unwrap_or(40) as u16;
        let width = (content_width + 4).min(area.width);
        let height = (dialog.fields.len() as u16 + 4).min(area.height);
        let popup_area = Rect::new(
            area.x + (area.width.saturating_sub(width)) / 2,
            area.y + (area.height.saturating_sub(height)) / 2,
            width,
            height,
        );

        frame.render_widget(Clear, popup_area);

        let dialog_style = self.theme.dialog_style();
        let mut lines: Vec<Line<'static>> = dialog
            .fields
            .iter()
            .enumerate()
            .map(|(index, field)| {
                let style = if index == dialog.focus {
                    self.theme.dialog_focus_style()
                } else {
                    dialog_style
                };
                Line::from(Span::styled(LinkDialog::field_line(field), style))
            })
            .collect();
        lines.push(Line::default());
        lines.push(Line::from(Span::styled(footer, dialog_style)));

        let block = Block::default()
            .title(dialog.pending.request.title.clone())
            .borders(Borders::ALL)
            .style(dialog_style);
        let paragraph = Paragraph::new(Text::from(lines))
            .block(block)
            .style(dialog_style);
        frame.render_widget(paragraph, popup_area);

        if let Some(field) = dialog.fields.get(dialog.focus)
            && matches!(field.input, DialogInput::Text(_))
        {
            let column = LinkDialog::field_line(field).chars().count() as u16;
            let x = (popup_area.x + 1 + column).min(popup_area.right().saturating_sub(2));
            let y = popup_area.y + 1 + dialog.focus as u16;
            frame.set_cursor_position(Position::new(x, y));
        }
    }

    fn status_line(&mut self, terminal_width: usize) -> Line<'static> {
        self.prune_status_message();

        let mode = self.editor.mode().label();
        if let Some((message, _)) = &self.status_message {
            return Line::from(vec![
                Span::styled(format!("{mode} "), self.theme.mode_style()),
                Span::raw(message.clone()),
            ]);
        }

        let filename = self.file_path.display().to_string();
        let marker = if self.dirty { "*" } else { "" };

        let mut spans = vec![
            Span::styled(format!("{mode} "), self.theme.mode_style()),
            Span::styled(format!("{filename}{marker}"), self.theme.filename_style()),
        ];
        let styles = self.editor.style_context_at_selection().labels();
        if self.editor.is_visual() && !styles.is_empty() {
            spans.push(Span::raw(format!(" {}", styles.join(" › "))));
        }

        let left_width: usize = spans.iter().map(|span| span.content.chars().count()).sum();
        let all_shortcuts = ["^K:Link", "^L:Clear", "F9:Code", "^S:Save", "^Q:Quit"];
        let mut shortcuts_to_show = Vec::new();
        let mut shortcuts_width = 0;
        for shortcut in all_shortcuts.iter().rev() {
            let test_width = if shortcuts_to_show.is_empty() {
                shortcut.chars().count()
            } else {
                shortcuts_width + 1 + shortcut.chars().count()
            };
            if left_width + 1 + test_width <= terminal_width {
                shortcuts_to_show.insert(0, *shortcut);
                shortcuts_width = test_width;
            } else {
                break;
            }
        }

        if !shortcuts_to_show.is_empty() {
            let padding = terminal_width
                .saturating_sub(left_width)
                .saturating_sub(shortcuts_width)
                .max(1);
            spans.push(Span::raw(" ".repeat(padding)));
            spans.push(Span::styled(shortcuts_to_show.join(" "), Style::default()));
        }

        Line::from(spans)
    }

    fn handle_event(&mut self, event: Event) -> Result<()> {
        match event {
            Event::Paste(text) => self.handle_paste(&text),
            Event::Key(key) => self.handle_key(key)?,
            _ => {}
        }
        self.drain_notifications();
        Ok(())
    }

    fn drain_notifications(&mut self) {
        for notification in self.editor.take_notifications() {
            match notification {
                Notification::ModeChanged { mode } => {
                    self.scroll_top = 0;
                    self.set_status(format!("{} mode", mode.label()));
                }
            }
        }
    }

    fn handle_paste(&mut self, text: &str) {
        if self.link_dialog.is_some() {
            return;
        }
        let changed = match self.editor.source_editor_mut() {
            Some(source) => {
                source.insert_str(text);
                true
            }
            None => self.editor.paste(&ClipboardPayload::plain_text(text)),
        };
        debug!(target: "pure_rte::app", len = text.len(), changed, "paste event");
        self.mark_dirty(changed);
    }

    fn handle_key(&mut self, key: KeyEvent) -> Result<()> {
        if self.link_dialog.is_some() {
            if key.kind == KeyEventKind::Press {
                self.handle_dialog_key(key);
            }
            return Ok(());
        }

        if self.editor.on_key_event(&key) {
            if key.kind != KeyEventKind::Release {
                self.mark_dirty(true);
            }
            return Ok(());
        }
        if key.kind != KeyEventKind::Press {
            return Ok(());
        }

        let control = key.modifiers.contains(KeyModifiers::CONTROL);
        match key.code {
            KeyCode::Char('q') if control => self.should_quit = true,
            KeyCode::Char('s') if control => {
                if let Err(err) = self.save() {
                    warn!(target: "pure_rte::app", error = %err, "save failed");
                    self.set_status(format!("Save failed: {err:#}"));
                }
            }
            KeyCode::F(9) => {
                self.editor.toggle_mode();
            }
            _ => match self.editor.mode() {
                EditorMode::Visual => self.handle_visual_key(key),
                EditorMode::Code => self.handle_code_key(key),
            },
        }
        Ok(())
    }

    fn handle_visual_key(&mut self, key: KeyEvent) {
        let control = key.modifiers.contains(KeyModifiers::CONTROL);
        let shift = key.modifiers.contains(KeyModifiers::SHIFT);
        let editor = &mut self.editor;
        let changed = match key.code {
            KeyCode::Char('b') if control => editor.wrap_inside_tag("b"),
            KeyCode::Char('t') if control => editor.wrap_inside_tag("i"),
            KeyCode::Char('u') if control => editor.wrap_inside_tag("u"),
            KeyCode::Char('d') if control => editor.wrap_inside_tag("s"),
            KeyCode::Char('l') if control => editor.clear_selection_style(),
            KeyCode::Char('k') if control => {
                let pending = editor.begin_link_insertion();
                self.link_dialog = Some(LinkDialog::new(pending));
                false
            }
            KeyCode::Left => {
                editor.move_left(shift);
                false
            }
            KeyCode::Right => {
                editor.move_right(shift);
                false
            }
            KeyCode::Home if control => {
                editor.move_to_document_start(shift);
                false
            }
            KeyCode::End if control => {
                editor.move_to_document_end(shift);
                false
            }
            KeyCode::Home => {
                editor.move_to_line_start(shift);
                false
            }
            KeyCode::End => {
                editor.move_to_line_end(shift);
                false
            }
            KeyCode::Backspace => editor.delete_backward(),
            KeyCode::Tab => editor.insert_text("\t"),
            KeyCode::Char(ch) if !control => editor.insert_text(ch.encode_utf8(&mut [0; 4])),
            _ => false,
        };
        self.mark_dirty(changed);
    }

    fn handle_code_key(&mut self, key: KeyEvent) {
        let control = key.modifiers.contains(KeyModifiers::CONTROL);
        let Some(source) = self.editor.source_editor_mut() else {
            return;
        };
        let changed = match key.code {
            KeyCode::Enter => {
                source.insert_newline();
                true
            }
            KeyCode::Backspace => source.backspace(),
            KeyCode::Delete => source.delete(),
            KeyCode::Left => {
                source.move_left();
                false
            }
            KeyCode::Right => {
                source.move_right();
                false
            }
            KeyCode::Up => {
                source.move_up();
                false
            }
            KeyCode::Down => {
                source.move_down();
                false
            }
            KeyCode::Home => {
                source.move_to_line_start();
                false
            }
            KeyCode::End => {
                source.move_to_line_end();
                false
            }
            KeyCode::Tab => {
                source.insert_char('\t');
                true
            }
            KeyCode::Char(ch) if !control => {
                source.insert_char(ch);
                true
            }
            _ => false,
        };
        self.mark_dirty(changed);
    }

    fn handle_dialog_key(&mut self, key: KeyEvent) {
        let Some(dialog) = self.link_dialog.as_mut() else {
            return;
        };
        let outcome = match key.code {
            KeyCode::Esc => DialogOutcome::Cancelled,
            KeyCode::Enter => DialogOutcome::Confirmed,
            KeyCode::Tab | KeyCode::Down => {
                dialog.focus_next();
                DialogOutcome::Open
            }
            KeyCode::BackTab | KeyCode::Up => {
                dialog.focus_previous();
                DialogOutcome::Open
            }
            code => {
                if let Some(field) = dialog.fields.get_mut(dialog.focus) {
                    match (&mut field.input, code) {
                        (DialogInput::Text(text), KeyCode::Char(ch)) => text.push(ch),
                        (DialogInput::Text(text), KeyCode::Backspace) => {
                            text.pop();
                        }
                        (DialogInput::Checkbox(checked), KeyCode::Char(' ')) => {
                            *checked = !*checked;
                        }
                        _ => {}
                    }
                }
                DialogOutcome::Open
            }
        };

        match outcome {
            DialogOutcome::Open => {}
            DialogOutcome::Cancelled => {
                if let Some(dialog) = self.link_dialog.take() {
                    self.editor.complete_link_insertion(dialog.pending, None);
                }
            }
            DialogOutcome::Confirmed => {
                if let Some(dialog) = self.link_dialog.take() {
                    let values = dialog.values();
                    let inserted = self
                        .editor
                        .complete_link_insertion(dialog.pending, Some(values));
                    if inserted {
                        self.mark_dirty(true);
                    } else {
                        self.set_status("Link needs a URL");
                    }
                }
            }
        }
    }

    fn save(&mut self) -> Result<()> {
        let markup = self.editor.content();
        let document = parse(io::Cursor::new(markup))
            .map_err(|err| anyhow!("failed to convert markup: {err}"))?;
        match self.document_format {
            DocumentFormat::Ftml => {
                let writer = Writer::new();
                let contents = writer
                    .write_to_string(&document)
                    .context("failed to render FTML")?;
                fs::write(&self.file_path, contents)
                    .with_context(|| format!("failed to write {}", self.file_path.display()))?;
            }
            DocumentFormat::Markdown => {
                let mut contents = Vec::new();
                markdown::write(&mut contents, &document).context("failed to render Markdown")?;
                fs::write(&self.file_path, contents)
                    .with_context(|| format!("failed to write {}", self.file_path.display()))?;
            }
        }

        info!(target: "pure_rte::app", path = %self.file_path.display(), "document saved");
        self.dirty = false;
        self.set_status("Saved");
        Ok(())
    }
}
