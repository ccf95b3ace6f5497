use ratatui::style::{Color, Modifier, Style};

/// Theme configuration for the editor
#[derive(Clone, Debug)]
pub struct Theme {
    /// Foreground (text) color for the status bar
    pub status_bar_fg: Color,

    /// Background color for the status bar
    pub status_bar_bg: Color,

    /// Color for the current file name in the status bar
    pub filename_color: Color,

    /// Color of the mode indicator in the status bar
    pub mode_color: Color,

    /// Foreground color for active selection
    pub selection_fg: Color,

    /// Background color for active selection
    pub selection_bg: Color,

    /// Foreground color for `<mark>` text
    pub highlight_fg: Color,

    /// Background color for `<mark>` text
    pub highlight_bg: Color,

    /// Color for links
    pub link_color: Color,

    /// Color of the locked space marker
    pub locked_space_color: Color,

    /// Color of block prefixes (quote bars, list bullets)
    pub block_prefix_color: Color,

    /// Foreground color for the markup source in code mode
    pub source_fg: Color,

    /// Foreground color for dialogs
    pub dialog_fg: Color,

    /// Background color for dialogs
    pub dialog_bg: Color,

    /// Foreground color for the focused dialog field
    pub dialog_focus_fg: Color,

    /// Background color for the focused dialog field
    pub dialog_focus_bg: Color,
}

impl Default for Theme {
    fn default() -> Self {
        Self {
            status_bar_fg: Color::White,
            status_bar_bg: Color::Blue,
            filename_color: Color::LightYellow,
            mode_color: Color::LightGreen,
            selection_fg: Color::White,
            selection_bg: Color::LightBlue,
            highlight_fg: Color::Black,
            highlight_bg: Color::LightYellow,
            link_color: Color::Blue,
            locked_space_color: Color::DarkGray,
            block_prefix_color: Color::DarkGray,
            source_fg: Color::Reset,
            dialog_fg: Color::White,
            dialog_bg: Color::Black,
            dialog_focus_fg: Color::White,
            dialog_focus_bg: Color::LightBlue,
        }
    }
}

impl Theme {
    /// Create a new theme with default colors
    pub fn new() -> Self {
        Self::default()
    }

    /// Get the style for the status bar
    pub fn status_bar_style(&self) -> Style {
        Style::default()
            .fg(self.status_bar_fg)
            .bg(self.status_bar_bg)
    }

    /// Get the style for the filename in the status bar
    pub fn filename_style(&self) -> Style {
        Style::default().fg(self.filename_color)
    }

    pub fn mode_style(&self) -> Style {
        Style::default()
            .fg(self.mode_color)
            .add_modifier(Modifier::BOLD)
    }

    /// Get the style for selected text
    pub fn selection_style(&self) -> Style {
        Style::default().fg(self.selection_fg).bg(self.selection_bg)
    }

    /// Get the style for highlighted text
    pub fn highlight_style(&self) -> Style {
        Style::default().fg(self.highlight_fg).bg(self.highlight_bg)
    }

    /// Get the style for links
    pub fn link_style(&self) -> Style {
        Style::default()
            .fg(self.link_color)
            .add_modifier(Modifier::UNDERLINED)
    }

    pub fn locked_space_style(&self) -> Style {
        Style::default().fg(self.locked_space_color)
    }

    pub fn block_prefix_style(&self) -> Style {
        Style::default().fg(self.block_prefix_color)
    }

    pub fn source_style(&self) -> Style {
        Style::default().fg(self.source_fg)
    }

    /// Get the style for the dialog popup
    pub fn dialog_style(&self) -> Style {
        Style::default().fg(self.dialog_fg).bg(self.dialog_bg)
    }

    /// Get the style for the focused dialog field
    pub fn dialog_focus_style(&self) -> Style {
        Style::default()
            .fg(self.dialog_focus_fg)
            .bg(self.dialog_focus_bg)
    }
}
