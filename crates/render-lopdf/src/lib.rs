//! PDF emission for laid-out pages.
//!
//! The emitter turns a final [`folio_layout::LayoutPass`] into a complete PDF
//! byte stream: page content streams, standard Type1 fonts, image XObjects,
//! the outline, named destinations and link annotations.

mod annotations;
mod content;
mod emitter;
mod encoding;
mod error;
mod outline;
mod resources;
mod writer;

pub use emitter::{EmitOptions, PdfEmitter};
pub use encoding::to_win_ansi;
pub use error::RenderError;
pub use writer::StreamingPdfWriter;
