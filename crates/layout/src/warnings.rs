//! Non-fatal findings of a conversion. They are collected, logged, and
//! returned alongside the PDF.

use crate::flow::UnitId;
use folio_types::AnchorId;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum LayoutWarning {
    /// A unit is taller than an empty frame.
    #[error("Unit {unit} needs {height:.2}pt but the frame on page {page} offers {available:.2}pt.")]
    LayoutOverflow { unit: UnitId, page: usize, height: f32, available: f32 },

    #[error("References did not settle after {passes} passes; unstable targets: {}", join(.unstable))]
    ReferenceNonConvergence { passes: usize, unstable: Vec<AnchorId> },

    /// The note could not join its anchor's page.
    #[error("Footnote '{note}' anchored on page {anchor_page} was moved to page {note_page}.")]
    FootnoteSeparated { note: AnchorId, anchor_page: usize, note_page: usize },

    #[error("Unit {unit} was split {retries} times at a frame top; the rest was placed whole on page {page}.")]
    SplitRetryLimit { unit: UnitId, page: usize, retries: u32 },

    #[error("Image '{src}' is unavailable ({reason}); drawing a placeholder.")]
    ImageUnavailable { src: String, reason: String },
}

fn join(ids: &[AnchorId]) -> String {
    ids.iter().map(AnchorId::as_str).collect::<Vec<_>>().join(", ")
}

impl LayoutWarning {
    /// Logs the warning through the `log` facade and returns it.
    pub fn logged(self) -> Self {
        log::warn!("{}", self);
        self
    }
}
