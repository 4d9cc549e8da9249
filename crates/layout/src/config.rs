#[derive(Debug, Clone, PartialEq)]
pub struct LayoutConfig {
    /// How many times one unit may be split at the top of a frame before it
    /// is placed whole, overflowing.
    ///
    /// Defaults to `32`.
    pub max_split_retries: u32,
    /// Shown wherever a page number is not known yet.
    ///
    /// Defaults to `"?"`.
    pub placeholder: String,
    /// Substituted for `{title}` in running blocks when the document has none.
    pub title: Option<String>,
    /// Vertical space between the footnote separator rule and the notes.
    pub footnote_gap: f32,
}

impl Default for LayoutConfig {
    fn default() -> Self {
        Self {
            max_split_retries: 32,
            placeholder: "?".to_string(),
            title: None,
            footnote_gap: 8.0,
        }
    }
}
