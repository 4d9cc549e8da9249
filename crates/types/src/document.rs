use crate::ids::AnchorId;
use serde::{Deserialize, Serialize};

/// An entry in the table of contents.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TocEntry {
    /// Section nesting level, starting at 1 for top-level sections.
    pub level: u8,
    /// The plain-text title of the section.
    pub title: String,
    /// The anchor the entry points at.
    pub target: AnchorId,
}
