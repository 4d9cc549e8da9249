use thiserror::Error;

#[derive(Error, Debug)]
pub enum RenderError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("PDF generation error: {0}")]
    Pdf(String),
    /// Layout produced geometry the emitter cannot place: an element or an
    /// outline entry whose unit or target has no recorded position.
    #[error("Emission internal error: {0}")]
    EmissionInternalError(String),
}

impl From<lopdf::Error> for RenderError {
    fn from(err: lopdf::Error) -> Self {
        RenderError::Pdf(err.to_string())
    }
}
