// src/error.rs
use folio_layout::{LayoutError, StructuralError};
use folio_render_lopdf::RenderError;
use folio_traits::ResourceError;
use thiserror::Error;

/// A comprehensive error type for the entire conversion pipeline. Any of
/// these means no PDF was produced.
#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("Document structure is invalid: {0}")]
    Structural(#[from] StructuralError),

    #[error("Layout failed: {0}")]
    Layout(#[from] LayoutError),

    #[error("Rendering failed: {0}")]
    Render(#[from] RenderError),

    #[error("Resource error: {0}")]
    Resource(#[from] ResourceError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON parsing error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Configuration is invalid: {0}")]
    Config(String),
}
