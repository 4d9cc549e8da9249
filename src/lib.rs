//! Compiles structured document trees into paginated, bookmarked PDF.
//!
//! The work is split across the workspace crates: styles are resolved and the
//! tree is flattened into flow units by `folio-layout`, the layout engine is
//! re-run until page references settle, and `folio-render-lopdf` writes the
//! final pages. This crate wires the stages together.
//!
//! ```ignore
//! use folio::{PipelineBuilder, idf::DocNode};
//!
//! let pipeline = PipelineBuilder::new().with_config_json(r#"{"tocDepth": 2}"#)?.build()?;
//! let output = pipeline.convert(&DocNode::document(vec![DocNode::paragraph("Hello")]))?;
//! std::fs::write("hello.pdf", output.pdf)?;
//! ```

pub mod error;
pub mod pipeline;

pub use error::PipelineError;
pub use pipeline::{
    ConversionConfig, ConversionOutput, Pipeline, PipelineBuilder, ReferenceResolver, Resolution,
};

pub use folio_idf as idf;
pub use folio_layout as layout;
pub use folio_render_lopdf as render;
pub use folio_style as style;
pub use folio_traits as traits;
pub use folio_types as types;
