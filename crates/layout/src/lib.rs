//! Style resolution, flow building and pagination of document trees.

pub mod cache;
pub mod config;
pub mod elements;
pub mod engine;
pub mod error;
pub mod flow;
pub mod node_kind;
pub mod reference;
pub mod style;
pub mod template;
pub mod text;
pub mod warnings;

pub use self::cache::MeasureCache;
pub use self::config::LayoutConfig;
pub use self::elements::{
    ImageElement, LaidOutPage, LayoutElement, LayoutPass, PositionedElement, RectElement, TextElement,
};
pub use self::engine::LayoutEngine;
pub use self::error::{LayoutError, NodeLocation, StructuralError};
pub use self::flow::{FlowBuilder, FlowConfig, FlowDocument, FlowKind, FlowUnit, UnitId};
pub use self::node_kind::NodeKind;
pub use self::reference::{AnchorPosition, Placement, PlacementMap, ReferenceTable};
pub use self::style::{ComputedStyle, StyleResolver};
pub use self::template::{PageTemplate, RunningBlock, TemplateSet};
pub use self::warnings::LayoutWarning;

// Re-export geometry types so callers need not depend on the types crate.
pub use folio_types::geometry::{Rect, Size};

#[cfg(test)]
mod pagination_test;
#[cfg(test)]
mod test_utils;
