//! Drawable output of the layout engine.

use crate::flow::UnitId;
use crate::reference::{AnchorPosition, PlacementMap, ReferenceTable};
use crate::style::ComputedStyle;
use crate::warnings::LayoutWarning;
use folio_traits::ImageData;
use folio_types::geometry::Rect;
use folio_types::{AnchorId, Color};
use std::collections::BTreeMap;
use std::sync::Arc;

/// A single drawable item at its absolute position on the page. Coordinates
/// are points from the top-left corner.
#[derive(Clone, Debug, PartialEq)]
pub struct PositionedElement {
    /// The flow unit this element was produced for, if any.
    pub unit: Option<UnitId>,
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
    pub element: LayoutElement,
    pub style: Arc<ComputedStyle>,
}

impl PositionedElement {
    /// Creates a partial `PositionedElement` from a `Rect`.
    /// The `element` and `style` fields must be filled in by the caller.
    pub fn from_rect(rect: Rect) -> Self {
        Self {
            unit: None,
            x: rect.x,
            y: rect.y,
            width: rect.width,
            height: rect.height,
            element: LayoutElement::Rectangle(RectElement::default()),
            style: Arc::new(ComputedStyle::default()),
        }
    }

    pub fn rect(&self) -> Rect {
        Rect::new(self.x, self.y, self.width, self.height)
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum LayoutElement {
    Text(TextElement),
    Rectangle(RectElement),
    /// A horizontal line, e.g. the footnote separator.
    Rule { thickness: f32, color: Color },
    Image(ImageElement),
}

impl std::fmt::Display for LayoutElement {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LayoutElement::Text(t) => write!(f, "Text(\"{}\")", t.content),
            LayoutElement::Rectangle(_) => write!(f, "Rectangle"),
            LayoutElement::Rule { .. } => write!(f, "Rule"),
            LayoutElement::Image(i) => write!(f, "Image(src=\"{}\")", i.src),
        }
    }
}

/// One run of text on one line. `y` of the owning element is the top of the
/// line box; the baseline sits `baseline` below it.
#[derive(Clone, Debug, PartialEq)]
pub struct TextElement {
    pub content: String,
    /// `#id` for internal destinations, anything else is an external URI.
    pub href: Option<Arc<str>>,
    /// Extra advance per space for justified lines.
    pub word_spacing: f32,
    pub baseline: f32,
}

/// A filled and/or stroked box. Colors come from `fill` and `stroke` when set.
#[derive(Clone, Debug, PartialEq, Default)]
pub struct RectElement {
    pub fill: Option<Color>,
    pub stroke: Option<(f32, Color)>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct ImageElement {
    pub src: String,
    /// `None` draws a placeholder frame.
    pub data: Option<ImageData>,
}

/// A finished page, ready for emission.
#[derive(Clone, Debug, PartialEq)]
pub struct LaidOutPage {
    /// 1-based.
    pub number: usize,
    pub template: Arc<str>,
    /// Width and height in points.
    pub size: (f32, f32),
    pub elements: Vec<PositionedElement>,
    /// Footnotes drawn at the bottom of this page, in drawing order.
    pub footnotes: Vec<AnchorId>,
}

impl LaidOutPage {
    pub fn text(&self) -> impl Iterator<Item = &str> {
        self.elements.iter().filter_map(|e| match &e.element {
            LayoutElement::Text(t) => Some(t.content.as_str()),
            _ => None,
        })
    }
}

/// Everything one layout pass produces.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct LayoutPass {
    pub pages: Vec<LaidOutPage>,
    pub placements: PlacementMap,
    pub anchors: BTreeMap<AnchorId, AnchorPosition>,
    pub warnings: Vec<LayoutWarning>,
}

impl LayoutPass {
    pub fn page_count(&self) -> usize {
        self.pages.len()
    }

    /// The reference table this pass observed.
    pub fn observed_references(&self) -> ReferenceTable {
        ReferenceTable::from_positions(self.anchors.clone(), self.pages.len())
    }
}
