//! Flow units: the measurable, splittable pieces the layout engine places.

mod builder;
mod handlers;
mod validate;

pub use builder::{BuildContext, FlowBuilder, NodeHandler};

use crate::style::ComputedStyle;
use crate::warnings::LayoutWarning;
use folio_traits::ImageData;
use folio_types::{AnchorId, TocEntry};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::sync::Arc;

/// Identity of a flow unit. Parts produced by splitting share it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct UnitId(pub u32);

impl fmt::Display for UnitId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum SpanContent {
    Text(String),
    /// Page number the target lands on, rendered from the reference table.
    PageNumber(AnchorId),
    LineBreak,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TextSpan {
    pub content: SpanContent,
    pub style: Arc<ComputedStyle>,
    pub href: Option<Arc<str>>,
}

impl TextSpan {
    pub fn text(text: impl Into<String>, style: Arc<ComputedStyle>) -> Self {
        Self { content: SpanContent::Text(text.into()), style, href: None }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ParagraphUnit {
    pub spans: Vec<TextSpan>,
    /// Hanging label (list bullet or footnote label) drawn left of the first line.
    pub bullet: Option<String>,
    /// Where this part starts in the original paragraph, in bytes of span text.
    pub offset: usize,
    /// Literal text: whitespace runs are kept as written.
    pub preserve_whitespace: bool,
}

impl ParagraphUnit {
    pub fn new(spans: Vec<TextSpan>) -> Self {
        Self { spans, bullet: None, offset: 0, preserve_whitespace: false }
    }

    pub fn has_page_numbers(&self) -> bool {
        self.spans.iter().any(|s| matches!(s.content, SpanContent::PageNumber(_)))
    }

    /// Concatenated text content; page numbers are omitted and line breaks become `\n`.
    pub fn plain_text(&self) -> String {
        let mut out = String::new();
        for span in &self.spans {
            match &span.content {
                SpanContent::Text(t) => out.push_str(t),
                SpanContent::LineBreak => out.push('\n'),
                SpanContent::PageNumber(_) => {}
            }
        }
        out
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ImageUnit {
    pub src: String,
    pub width: f32,
    pub height: f32,
    /// `None` draws a placeholder frame.
    pub data: Option<ImageData>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CellUnit {
    pub column: usize,
    pub span: usize,
    pub style: Arc<ComputedStyle>,
    pub units: Vec<FlowUnit>,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct TableRowUnit {
    pub cells: Vec<CellUnit>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TableUnit {
    /// Relative column weights.
    pub columns: Vec<f32>,
    pub header: Vec<TableRowUnit>,
    pub rows: Vec<TableRowUnit>,
    pub repeat_header: bool,
    pub splittable: bool,
    /// Index of the first body row of this part in the original table.
    pub first_row: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TocLine {
    pub entry: TocEntry,
    pub style: Arc<ComputedStyle>,
    pub indent: f32,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TocUnit {
    pub depth: Option<u8>,
    pub lines: Vec<TocLine>,
    /// Index of the first line of this part in the full listing.
    pub first_line: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BreakSide {
    #[default]
    Any,
    Odd,
    Even,
}

impl BreakSide {
    pub fn accepts(&self, page_number: usize) -> bool {
        match self {
            BreakSide::Any => true,
            BreakSide::Odd => page_number % 2 == 1,
            BreakSide::Even => page_number % 2 == 0,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum FlowKind {
    Paragraph(ParagraphUnit),
    Image(ImageUnit),
    Table(TableUnit),
    Spacer { height: f32 },
    PageBreak { template: Option<Arc<str>>, side: BreakSide },
    ColumnBreak,
    TocPlaceholder(TocUnit),
    FootnoteAnchor { note: AnchorId },
    /// Zero-height marker. `outline` entries appear in the PDF outline;
    /// the others only give a container's id a position. `template` names
    /// the template for the next page a section flows onto.
    Bookmark { title: String, level: u8, outline: bool, template: Option<Arc<str>> },
}

impl FlowKind {
    pub fn name(&self) -> &'static str {
        match self {
            FlowKind::Paragraph(_) => "Paragraph",
            FlowKind::Image(_) => "Image",
            FlowKind::Table(_) => "Table",
            FlowKind::Spacer { .. } => "Spacer",
            FlowKind::PageBreak { .. } => "PageBreak",
            FlowKind::ColumnBreak => "ColumnBreak",
            FlowKind::TocPlaceholder(_) => "TocPlaceholder",
            FlowKind::FootnoteAnchor { .. } => "FootnoteAnchor",
            FlowKind::Bookmark { .. } => "Bookmark",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct FlowUnit {
    pub id: UnitId,
    pub part: u32,
    pub anchor: Option<AnchorId>,
    pub style: Arc<ComputedStyle>,
    pub kind: FlowKind,
}

impl FlowUnit {
    /// Markers take no space and never end a frame.
    pub fn is_marker(&self) -> bool {
        matches!(self.kind, FlowKind::Bookmark { .. } | FlowKind::FootnoteAnchor { .. })
    }

    /// The next part of this unit after a split.
    pub fn remainder(&self, kind: FlowKind) -> FlowUnit {
        FlowUnit {
            id: self.id,
            part: self.part + 1,
            anchor: None,
            style: self.style.clone(),
            kind,
        }
    }

    /// Whether measuring this unit reads page numbers.
    pub fn depends_on_references(&self) -> bool {
        match &self.kind {
            FlowKind::Paragraph(p) => p.has_page_numbers(),
            FlowKind::Table(t) => t
                .header
                .iter()
                .chain(&t.rows)
                .flat_map(|r| &r.cells)
                .flat_map(|c| &c.units)
                .any(FlowUnit::depends_on_references),
            _ => false,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Footnote {
    pub id: AnchorId,
    pub label: String,
    pub units: Vec<FlowUnit>,
}

/// Footnote content, kept out of the main flow until page finalization.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FootnoteTable {
    notes: BTreeMap<AnchorId, Footnote>,
}

impl FootnoteTable {
    pub fn insert(&mut self, note: Footnote) {
        self.notes.insert(note.id.clone(), note);
    }

    pub fn get(&self, id: &AnchorId) -> Option<&Footnote> {
        self.notes.get(id)
    }

    pub fn contains(&self, id: &AnchorId) -> bool {
        self.notes.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.notes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.notes.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Footnote> {
        self.notes.values()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct BookmarkNode {
    pub entry: TocEntry,
    pub children: Vec<BookmarkNode>,
}

/// Output of the flow builder; read-only to every later stage.
#[derive(Debug, Clone, Default)]
pub struct FlowDocument {
    pub units: Vec<FlowUnit>,
    pub footnotes: FootnoteTable,
    /// Section outline in document order.
    pub bookmarks: Vec<TocEntry>,
    /// Every id that can be the target of a link or a destination.
    pub anchors: BTreeSet<AnchorId>,
    /// Targets whose page numbers are rendered somewhere.
    pub referenced: BTreeSet<AnchorId>,
    pub title: Option<String>,
    /// Styles of the running header and footer blocks.
    pub header_style: Arc<ComputedStyle>,
    pub footer_style: Arc<ComputedStyle>,
    pub warnings: Vec<LayoutWarning>,
}

impl FlowDocument {
    pub fn has_references(&self) -> bool {
        !self.referenced.is_empty()
    }

    /// Builds the outline forest from the flat, leveled bookmark list.
    pub fn bookmark_forest(&self) -> Vec<BookmarkNode> {
        fn attach(stack: &mut Vec<BookmarkNode>, roots: &mut Vec<BookmarkNode>, level: u8) {
            while let Some(top) = stack.last() {
                if top.entry.level < level {
                    break;
                }
                if let Some(done) = stack.pop() {
                    match stack.last_mut() {
                        Some(parent) => parent.children.push(done),
                        None => roots.push(done),
                    }
                }
            }
        }

        let mut roots = Vec::new();
        let mut stack: Vec<BookmarkNode> = Vec::new();
        for entry in &self.bookmarks {
            attach(&mut stack, &mut roots, entry.level);
            stack.push(BookmarkNode { entry: entry.clone(), children: Vec::new() });
        }
        attach(&mut stack, &mut roots, 0);
        roots
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FootnoteMode {
    /// Notes go to the bottom of the frame holding their anchor.
    #[default]
    Page,
    /// Notes stay where they are written.
    Inline,
}

/// Options of the flow builder.
#[derive(Debug, Clone, PartialEq)]
pub struct FlowConfig {
    /// Sections at this level or above start a new page; 0 disables.
    pub break_level: u8,
    pub break_side: BreakSide,
    pub footnote_mode: FootnoteMode,
    pub split_tables: bool,
    pub repeat_table_header: bool,
    pub toc_depth: Option<u8>,
    pub toc_title: String,
    pub section_spacing: f32,
    pub default_dpi: f32,
}

impl Default for FlowConfig {
    fn default() -> Self {
        Self {
            break_level: 0,
            break_side: BreakSide::Any,
            footnote_mode: FootnoteMode::Page,
            split_tables: true,
            repeat_table_header: false,
            toc_depth: None,
            toc_title: "Contents".to_string(),
            section_spacing: 6.0,
            default_dpi: 300.0,
        }
    }
}
