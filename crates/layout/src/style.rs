use folio_style::border::Border;
use folio_style::dimension::Margins;
use folio_style::font::{FontStyle, FontWeight};
use folio_style::list::ListStyleType;
use folio_style::stylesheet::{ElementStyle, StyleSheet};
use folio_style::text::{TextAlign, TextDecoration};
use folio_traits::FontSpec;
use folio_types::Color;
use std::collections::HashMap;
use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

// Helper to hash floats
fn hash_f32<H: Hasher>(v: &f32, state: &mut H) {
    v.to_bits().hash(state);
}

// Grouped Style Structures

#[derive(Debug, Clone, PartialEq, Default)]
pub struct BoxModel {
    /// `top`/`bottom` are the space before/after, `left`/`right` the indents.
    pub margin: Margins,
    pub padding: Margins,
}

impl Eq for BoxModel {}

impl Hash for BoxModel {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.margin.hash(state);
        self.padding.hash(state);
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct BorderModel {
    pub top: Option<Border>,
    pub right: Option<Border>,
    pub bottom: Option<Border>,
    pub left: Option<Border>,
}

impl Eq for BorderModel {}

impl Hash for BorderModel {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.top.hash(state);
        self.right.hash(state);
        self.bottom.hash(state);
        self.left.hash(state);
    }
}

impl BorderModel {
    pub fn is_empty(&self) -> bool {
        [&self.top, &self.right, &self.bottom, &self.left]
            .iter()
            .all(|b| b.as_ref().is_none_or(|b| b.effective_width() <= 0.0))
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct TextModel {
    pub font_family: Arc<str>,
    pub font_size: f32,
    pub font_weight: FontWeight,
    pub font_style: FontStyle,
    pub line_height: f32,
    pub text_align: TextAlign,
    pub text_decoration: TextDecoration,
    pub color: Color,
}

impl Default for TextModel {
    fn default() -> Self {
        Self {
            font_family: Arc::from("Helvetica"),
            font_size: 12.0,
            font_weight: FontWeight::Regular,
            font_style: FontStyle::Normal,
            line_height: 14.4,
            text_align: TextAlign::Left,
            text_decoration: TextDecoration::None,
            color: Color::default(),
        }
    }
}

impl Eq for TextModel {}

impl Hash for TextModel {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.font_family.hash(state);
        hash_f32(&self.font_size, state);
        self.font_weight.hash(state);
        self.font_style.hash(state);
        hash_f32(&self.line_height, state);
        self.text_align.hash(state);
        self.text_decoration.hash(state);
        self.color.hash(state);
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct ListModel {
    pub style_type: ListStyleType,
}

/// Accumulated horizontal offsets of all enclosing blocks.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct IndentModel {
    pub left: f32,
    pub right: f32,
}

impl Eq for IndentModel {}

impl Hash for IndentModel {
    fn hash<H: Hasher>(&self, state: &mut H) {
        hash_f32(&self.left, state);
        hash_f32(&self.right, state);
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct PaginationModel {
    pub keep_with_next: bool,
    pub page_break_before: bool,
    pub page_template: Option<Arc<str>>,
}

impl Eq for PaginationModel {}

impl Hash for PaginationModel {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.keep_with_next.hash(state);
        self.page_break_before.hash(state);
        self.page_template.hash(state);
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct MiscModel {
    pub widows: usize,
    pub orphans: usize,
    pub first_line_indent: f32,
    pub background_color: Option<Color>,
}

impl Eq for MiscModel {}

impl Hash for MiscModel {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.widows.hash(state);
        self.orphans.hash(state);
        hash_f32(&self.first_line_indent, state);
        self.background_color.hash(state);
    }
}

impl Default for MiscModel {
    fn default() -> Self {
        Self {
            widows: 2,
            orphans: 2,
            first_line_indent: 0.0,
            background_color: None,
        }
    }
}

/// Holds the raw styling data. Separated from `ComputedStyle` to enforce safe hashing.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ComputedStyleData {
    pub box_model: BoxModel,
    pub border: BorderModel,
    pub text: TextModel,
    pub list: ListModel,
    pub indent: IndentModel,
    pub pagination: PaginationModel,
    pub misc: MiscModel,
}

// We implement Hash manually for the Data struct because it contains f32s,
// which don't support auto-derive Hash.
impl Hash for ComputedStyleData {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.box_model.hash(state);
        self.border.hash(state);
        self.text.hash(state);
        self.list.hash(state);
        self.indent.hash(state);
        self.pagination.hash(state);
        self.misc.hash(state);
    }
}

impl ComputedStyleData {
    /// Returns the total width of horizontal padding.
    pub fn padding_x(&self) -> f32 {
        self.box_model.padding.left + self.box_model.padding.right
    }

    /// Returns the total height of vertical padding.
    pub fn padding_y(&self) -> f32 {
        self.box_model.padding.top + self.box_model.padding.bottom
    }

    pub fn border_top_width(&self) -> f32 {
        self.border.top.as_ref().map_or(0.0, Border::effective_width)
    }

    pub fn border_bottom_width(&self) -> f32 {
        self.border.bottom.as_ref().map_or(0.0, Border::effective_width)
    }

    pub fn border_left_width(&self) -> f32 {
        self.border.left.as_ref().map_or(0.0, Border::effective_width)
    }

    pub fn border_right_width(&self) -> f32 {
        self.border.right.as_ref().map_or(0.0, Border::effective_width)
    }

    /// Returns the total width of horizontal borders.
    pub fn border_x(&self) -> f32 {
        self.border_left_width() + self.border_right_width()
    }

    /// Returns the total height of vertical borders.
    pub fn border_y(&self) -> f32 {
        self.border_top_width() + self.border_bottom_width()
    }

    /// Vertical space taken by padding and borders around the content box.
    pub fn box_extra_y(&self) -> f32 {
        self.padding_y() + self.border_y()
    }

    /// Whether the block paints anything behind or around its content.
    pub fn has_decoration(&self) -> bool {
        self.misc.background_color.is_some() || !self.border.is_empty()
    }

    /// Left edge of the block relative to the frame.
    pub fn block_left(&self) -> f32 {
        self.indent.left + self.box_model.margin.left
    }

    /// Width of the block (border box) inside a frame of `frame_width`.
    pub fn block_width(&self, frame_width: f32) -> f32 {
        (frame_width
            - self.indent.left
            - self.indent.right
            - self.box_model.margin.left
            - self.box_model.margin.right)
            .max(0.0)
    }

    /// Width of the content box inside a frame of `frame_width`.
    pub fn content_width(&self, frame_width: f32) -> f32 {
        (self.block_width(frame_width) - self.padding_x() - self.border_x()).max(0.0)
    }

    pub fn font_spec(&self) -> FontSpec {
        FontSpec::new(self.text.font_family.clone(), self.text.font_weight, self.text.font_style)
    }
}

/// A wrapper around style data that enforces hashing on construction.
/// This prevents bugs where data changes but the hash doesn't.
#[derive(Debug, Clone)]
pub struct ComputedStyle {
    /// The actual style data.
    pub inner: ComputedStyleData,
    /// Pre-calculated hash for rapid HashMap lookups (caching).
    cached_hash: u64,
}

impl ComputedStyle {
    pub fn new(data: ComputedStyleData) -> Self {
        let mut s = DefaultHasher::new();
        data.hash(&mut s);
        Self {
            inner: data,
            cached_hash: s.finish(),
        }
    }

    pub fn hash_value(&self) -> u64 {
        self.cached_hash
    }

    /// A copy with the accumulated indent cleared, for content laid out in
    /// its own box (table cells, footnotes).
    pub fn without_indent(&self) -> Arc<ComputedStyle> {
        let mut data = self.inner.clone();
        data.indent = IndentModel::default();
        Arc::new(ComputedStyle::new(data))
    }
}

impl Default for ComputedStyle {
    fn default() -> Self {
        Self::new(ComputedStyleData::default())
    }
}

// Allows accessing style data directly (e.g. style.box_model)
impl std::ops::Deref for ComputedStyle {
    type Target = ComputedStyleData;
    fn deref(&self) -> &Self::Target {
        &self.inner
    }
}

impl Eq for ComputedStyle {}

impl PartialEq for ComputedStyle {
    fn eq(&self, other: &Self) -> bool {
        // Fail fast if hashes differ
        if self.cached_hash != other.cached_hash {
            return false;
        }
        // Fallback to full comparison to handle potential collisions
        self.inner == other.inner
    }
}

impl Hash for ComputedStyle {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.cached_hash.hash(state);
    }
}

/// Computes the style for a node by inheriting from its parent, applying the
/// matching style-sheet rules in order, and finally any inline overrides.
pub fn compute_style(
    style_sets: &[&ElementStyle],
    style_override: Option<&ElementStyle>,
    parent_style: &Arc<ComputedStyle>,
) -> Arc<ComputedStyle> {
    let mut merged = ElementStyle::default();
    for style_def in style_sets {
        merged.merge(style_def);
    }
    if let Some(override_style_def) = style_override {
        merged.merge(override_style_def);
    }

    let parent = &parent_style.inner;
    let computed_data = ComputedStyleData {
        text: TextModel {
            font_family: merged
                .font_family
                .map(Arc::from)
                .unwrap_or_else(|| parent.text.font_family.clone()),
            font_size: merged.font_size.unwrap_or(parent.text.font_size),
            font_weight: merged.font_weight.unwrap_or(parent.text.font_weight),
            font_style: merged.font_style.unwrap_or(parent.text.font_style),
            line_height: merged.line_height.unwrap_or_else(|| {
                merged
                    .font_size
                    .map(|fs| fs * 1.2)
                    .unwrap_or(parent.text.line_height)
            }),
            text_align: merged.text_align.unwrap_or(parent.text.text_align),
            text_decoration: merged.text_decoration.unwrap_or(parent.text.text_decoration),
            color: merged.color.unwrap_or_else(|| parent.text.color.clone()),
        },
        list: ListModel {
            style_type: merged.list_style_type.unwrap_or(parent.list.style_type),
        },
        indent: IndentModel {
            left: parent.indent.left + parent.box_model.margin.left,
            right: parent.indent.right + parent.box_model.margin.right,
        },
        misc: MiscModel {
            widows: merged.widows.unwrap_or(parent.misc.widows),
            orphans: merged.orphans.unwrap_or(parent.misc.orphans),
            first_line_indent: merged.first_line_indent.unwrap_or(0.0),
            background_color: merged.background_color,
        },
        // Non-inherited properties
        box_model: BoxModel {
            margin: merged.margin.unwrap_or_default(),
            padding: merged.padding.unwrap_or_default(),
        },
        border: BorderModel {
            top: merged.border_top.or_else(|| merged.border.clone()),
            right: merged.border_right.or_else(|| merged.border.clone()),
            bottom: merged.border_bottom.or_else(|| merged.border.clone()),
            left: merged.border_left.or_else(|| merged.border.clone()),
        },
        pagination: PaginationModel {
            keep_with_next: merged.keep_with_next.unwrap_or(false),
            page_break_before: merged.page_break_before.unwrap_or(false),
            page_template: merged.page_template.map(Arc::from),
        },
    };

    Arc::new(ComputedStyle::new(computed_data))
}

/// Returns the built-in style every document starts from.
pub fn get_default_style() -> Arc<ComputedStyle> {
    Arc::new(ComputedStyle::default())
}

/// What a node's style may depend on besides its own kind and classes.
#[derive(Debug, Clone)]
pub struct StyleContext {
    pub parent: Arc<ComputedStyle>,
    pub depth: usize,
    /// Counters of the enclosing lists, innermost last.
    pub list_counters: Vec<usize>,
}

impl StyleContext {
    pub fn root(style: Arc<ComputedStyle>) -> Self {
        Self { parent: style, depth: 0, list_counters: Vec::new() }
    }

    pub fn child(&self, parent: Arc<ComputedStyle>) -> Self {
        Self {
            parent,
            depth: self.depth + 1,
            list_counters: self.list_counters.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct StyleKey {
    kind: String,
    classes: Vec<String>,
    depth: usize,
    parent_hash: u64,
}

/// Resolves styles against a [`StyleSheet`], memoizing results.
///
/// Resolution is a pure function of (kind, classes, inline override,
/// context); the cache only skips recomputation. Nodes carrying an inline
/// override are never cached.
#[derive(Debug)]
pub struct StyleResolver {
    sheet: Arc<StyleSheet>,
    root: Arc<ComputedStyle>,
    cache: HashMap<StyleKey, Arc<ComputedStyle>>,
}

impl StyleResolver {
    pub fn new(sheet: Arc<StyleSheet>) -> Self {
        let root = compute_style(&[&sheet.default], None, &get_default_style());
        // The document default must not indent or pad everything below it.
        let mut data = root.inner.clone();
        data.box_model = BoxModel::default();
        data.border = BorderModel::default();
        data.misc.background_color = None;
        let root = Arc::new(ComputedStyle::new(data));
        Self { sheet, root, cache: HashMap::new() }
    }

    /// Style of the document root: the built-in defaults overlaid with the
    /// sheet's default record.
    pub fn root_style(&self) -> Arc<ComputedStyle> {
        self.root.clone()
    }

    pub fn sheet(&self) -> &StyleSheet {
        &self.sheet
    }

    pub fn resolve(
        &mut self,
        kind: &str,
        classes: &[String],
        inline: Option<&ElementStyle>,
        context: &StyleContext,
    ) -> Arc<ComputedStyle> {
        let inline = inline.filter(|s| !s.is_empty());
        if let Some(inline) = inline {
            let rules = self.sheet.matching(kind, classes);
            return compute_style(&rules, Some(inline), &context.parent);
        }

        let key = StyleKey {
            kind: kind.to_string(),
            classes: classes.to_vec(),
            depth: context.depth,
            parent_hash: context.parent.hash_value(),
        };
        if let Some(hit) = self.cache.get(&key) {
            return hit.clone();
        }
        let rules = self.sheet.matching(kind, classes);
        let style = compute_style(&rules, None, &context.parent);
        self.cache.insert(key, style.clone());
        style
    }

    pub fn cached_len(&self) -> usize {
        self.cache.len()
    }
}
