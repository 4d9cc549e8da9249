use crate::flow::UnitId;
use crate::text::ParagraphLayout;
use std::collections::HashMap;
use std::sync::Arc;

// --- Cache Keys ---

/// A paragraph part measured at a given width. Parts are identified by the
/// unit plus the byte offset they start at, which is stable across passes.
#[derive(Hash, PartialEq, Eq, Clone, Copy, Debug)]
pub struct MeasureKey {
    pub unit: UnitId,
    pub offset: usize,
    pub width_bits: u32,
}

impl MeasureKey {
    pub fn new(unit: UnitId, offset: usize, width: f32) -> Self {
        Self { unit, offset, width_bits: width.to_bits() }
    }
}

// --- The Manager ---

/// Line-breaking results kept across reference passes. Layouts that render
/// page numbers are dropped at the start of every pass, everything else is
/// reused as long as the cache lives.
#[derive(Default, Debug)]
pub struct MeasureCache {
    paragraphs: HashMap<MeasureKey, Arc<ParagraphLayout>>,
    hits: usize,
    misses: usize,
}

impl MeasureCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&mut self, key: &MeasureKey) -> Option<Arc<ParagraphLayout>> {
        match self.paragraphs.get(key) {
            Some(layout) => {
                self.hits += 1;
                Some(layout.clone())
            }
            None => {
                self.misses += 1;
                None
            }
        }
    }

    pub fn insert(&mut self, key: MeasureKey, layout: Arc<ParagraphLayout>) {
        self.paragraphs.insert(key, layout);
    }

    /// Forgets layouts whose text depends on the reference table.
    pub fn begin_pass(&mut self) {
        let before = self.paragraphs.len();
        self.paragraphs.retain(|_, layout| !layout.volatile);
        log::debug!(
            "measure cache: {} hits, {} misses, {} volatile entries dropped",
            self.hits,
            self.misses,
            before - self.paragraphs.len()
        );
        self.hits = 0;
        self.misses = 0;
    }

    pub fn len(&self) -> usize {
        self.paragraphs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.paragraphs.is_empty()
    }

    pub fn clear(&mut self) {
        self.paragraphs.clear();
    }
}
