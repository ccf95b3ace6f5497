/// Knobs for the editing core. Everything has a sensible default; hosts
/// override individual values through the `with_*` builders.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EditorConfig {
    /// Trim every source line when switching from code back to visual mode.
    /// Turning this off keeps whitespace inside preformatted blocks.
    pub trim_source_lines: bool,
    /// Passed to the source editor when it is created.
    pub source_line_wrapping: bool,
    /// `target` attribute added to links that open in a new tab.
    pub link_target: String,
    /// `rel` attribute added to links that open in a new tab.
    pub link_rel: String,
    /// Class name of the non-editable locked space marker.
    pub locked_space_class: String,
    /// Element inserted for an explicit line break.
    pub line_break_tag: String,
}

impl Default for EditorConfig {
    fn default() -> Self {
        Self {
            trim_source_lines: true,
            source_line_wrapping: true,
            link_target: "_blank".to_string(),
            link_rel: "noopener noreferrer".to_string(),
            locked_space_class: "locked-space".to_string(),
            line_break_tag: "br".to_string(),
        }
    }
}

impl EditorConfig {
    pub fn with_trim_source_lines(mut self, trim: bool) -> Self {
        self.trim_source_lines = trim;
        self
    }

    pub fn with_source_line_wrapping(mut self, wrapping: bool) -> Self {
        self.source_line_wrapping = wrapping;
        self
    }

    pub fn with_link_target(mut self, target: impl Into<String>) -> Self {
        self.link_target = target.into();
        self
    }

    pub fn with_link_rel(mut self, rel: impl Into<String>) -> Self {
        self.link_rel = rel.into();
        self
    }

    pub fn with_locked_space_class(mut self, class: impl Into<String>) -> Self {
        self.locked_space_class = class.into();
        self
    }

    pub fn with_line_break_tag(mut self, tag: impl Into<String>) -> Self {
        self.line_break_tag = tag.into();
        self
    }

    /// Markup of the locked space marker.
    pub fn locked_space_markup(&self) -> String {
        format!(
            "<span class=\"{}\" contenteditable=\"false\">&nbsp;</span>",
            crate::markup::escape_attribute(&self.locked_space_class)
        )
    }

    pub fn line_break_markup(&self) -> String {
        format!("<{}>", self.line_break_tag)
    }
}
