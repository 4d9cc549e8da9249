//! Places flow units into page frames.
//!
//! One call to [`LayoutEngine::place`] is one layout pass: it reads page
//! numbers from the given reference table and reports where every unit and
//! anchor landed, so the caller can iterate until references settle.

mod compose;
mod paginator;
mod painting;
mod running;
mod table;
mod toc;

use crate::cache::MeasureCache;
use crate::config::LayoutConfig;
use crate::elements::LayoutPass;
use crate::error::LayoutError;
use crate::flow::FlowDocument;
use crate::reference::ReferenceTable;
use crate::template::TemplateSet;
use crate::text::TextWrapper;
use compose::Composer;
use folio_traits::TextMeasurer;
use paginator::Paginator;
use std::sync::Arc;

pub struct LayoutEngine {
    config: LayoutConfig,
    measurer: Arc<dyn TextMeasurer>,
}

impl LayoutEngine {
    pub fn new(config: LayoutConfig, measurer: Arc<dyn TextMeasurer>) -> Self {
        Self { config, measurer }
    }

    pub fn config(&self) -> &LayoutConfig {
        &self.config
    }

    pub fn measurer(&self) -> &dyn TextMeasurer {
        self.measurer.as_ref()
    }

    /// Runs one layout pass. Identical inputs give identical passes.
    pub fn place(
        &self,
        doc: &FlowDocument,
        templates: &TemplateSet,
        references: &ReferenceTable,
        cache: &mut MeasureCache,
    ) -> Result<LayoutPass, LayoutError> {
        let wrapper = TextWrapper::new(self.measurer.as_ref(), references, &self.config.placeholder);
        let composer = Composer::new(wrapper, cache);
        let pass = Paginator::new(&self.config, doc, templates, composer).run()?;
        log::debug!(
            "layout pass with {}: {} pages, {} anchors, {} warnings",
            self.measurer.name(),
            pass.pages.len(),
            pass.anchors.len(),
            pass.warnings.len()
        );
        Ok(pass)
    }
}
