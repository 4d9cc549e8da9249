//! Where things landed: per-unit placements and the anchor table that
//! forward references are rendered from.

use crate::flow::UnitId;
use folio_types::AnchorId;
use std::collections::BTreeMap;
use std::sync::Arc;

/// Position of the first fragment of a placed unit.
#[derive(Debug, Clone, PartialEq)]
pub struct Placement {
    /// 1-based page number.
    pub page: usize,
    /// Index into the frames of `template`.
    pub frame: usize,
    /// Top of the fragment, in points from the top of the page.
    pub y: f32,
    pub template: Arc<str>,
}

pub type PlacementMap = BTreeMap<UnitId, Placement>;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AnchorPosition {
    pub page: usize,
    pub y: f32,
}

/// Anchor id → (page, y), plus the total page count.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ReferenceTable {
    anchors: BTreeMap<AnchorId, AnchorPosition>,
    total_pages: Option<usize>,
}

impl ReferenceTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_positions(anchors: BTreeMap<AnchorId, AnchorPosition>, total_pages: usize) -> Self {
        Self { anchors, total_pages: Some(total_pages) }
    }

    pub fn insert(&mut self, id: AnchorId, position: AnchorPosition) {
        self.anchors.insert(id, position);
    }

    pub fn position(&self, id: &AnchorId) -> Option<AnchorPosition> {
        self.anchors.get(id).copied()
    }

    pub fn page_of(&self, id: &AnchorId) -> Option<usize> {
        self.anchors.get(id).map(|p| p.page)
    }

    pub fn total_pages(&self) -> Option<usize> {
        self.total_pages
    }

    pub fn set_total_pages(&mut self, total: Option<usize>) {
        self.total_pages = total;
    }

    pub fn len(&self) -> usize {
        self.anchors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.anchors.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&AnchorId, &AnchorPosition)> {
        self.anchors.iter()
    }
}
