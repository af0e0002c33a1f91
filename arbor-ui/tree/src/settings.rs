const DEFAULT_INDENT_WIDTH: f32 = 14.0;
const DEFAULT_TOGGLE_WIDTH: f32 = 16.0;

/// Layout and glyph settings for [`TreeView`](crate::TreeView).
#[derive(Debug, Clone, PartialEq)]
pub struct TreeViewSettings {
    /// Horizontal offset added per depth level.
    pub indent_width: f32,
    /// Width reserved for the expand handle.
    pub toggle_width: f32,
    /// Vertical spacing between rows.
    pub spacing: f32,
    pub expanded_glyph: String,
    pub condensed_glyph: String,
}

impl Default for TreeViewSettings {
    fn default() -> Self {
        Self {
            indent_width: DEFAULT_INDENT_WIDTH,
            toggle_width: DEFAULT_TOGGLE_WIDTH,
            spacing: 0.0,
            expanded_glyph: String::from("[-]"),
            condensed_glyph: String::from("[+]"),
        }
    }
}

impl TreeViewSettings {
    pub fn with_indent_width(mut self, width: f32) -> Self {
        self.indent_width = width.max(0.0);
        self
    }

    pub fn with_toggle_width(mut self, width: f32) -> Self {
        self.toggle_width = width.max(0.0);
        self
    }

    pub fn with_spacing(mut self, spacing: f32) -> Self {
        self.spacing = spacing;
        self
    }

    pub fn with_glyphs(
        mut self,
        expanded: impl Into<String>,
        condensed: impl Into<String>,
    ) -> Self {
        self.expanded_glyph = expanded.into();
        self.condensed_glyph = condensed.into();
        self
    }

    /// Glyph drawn in the expand handle for a branch in the given state.
    pub fn glyph(&self, expanded: bool) -> &str {
        if expanded {
            &self.expanded_glyph
        } else {
            &self.condensed_glyph
        }
    }
}
