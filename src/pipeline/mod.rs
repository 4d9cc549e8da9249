//! Conversion pipeline orchestration.
//!
//! - [`PipelineBuilder`]: assembles style sheet, page templates, font metrics,
//!   image decoder and [`ConversionConfig`] into a [`Pipeline`]
//! - [`ReferenceResolver`]: repeats layout passes until page references settle
//! - [`Pipeline::convert`]: tree in, PDF bytes and warnings out

mod builder;
pub mod config;
pub mod resolver;

pub use builder::PipelineBuilder;
pub use config::ConversionConfig;
pub use resolver::{ReferenceResolver, Resolution};

use crate::error::PipelineError;
use folio_idf::DocNode;
use folio_layout::{FlowBuilder, FlowDocument, LayoutEngine, LayoutWarning, TemplateSet};
use folio_render_lopdf::PdfEmitter;
use folio_style::stylesheet::StyleSheet;
use folio_traits::{ImageDecoder, TextMeasurer};
use std::sync::Arc;

/// What a successful conversion produced.
#[derive(Debug, Clone)]
pub struct ConversionOutput {
    pub pdf: Vec<u8>,
    /// Flow-building warnings first, then those of the emitted layout pass.
    pub warnings: Vec<LayoutWarning>,
    pub page_count: usize,
    /// Layout passes run while resolving references.
    pub passes: usize,
}

/// A configured converter. Conversions share nothing mutable, so one
/// pipeline can serve many documents at once.
pub struct Pipeline {
    stylesheet: Arc<StyleSheet>,
    templates: Arc<TemplateSet>,
    measurer: Arc<dyn TextMeasurer>,
    images: Arc<dyn ImageDecoder>,
    config: ConversionConfig,
}

impl Pipeline {
    pub fn config(&self) -> &ConversionConfig {
        &self.config
    }

    pub fn stylesheet(&self) -> &StyleSheet {
        &self.stylesheet
    }

    pub fn templates(&self) -> &TemplateSet {
        &self.templates
    }

    /// Builds the flow document and resolves its references, stopping short
    /// of PDF emission.
    pub fn layout(&self, tree: &DocNode) -> Result<(FlowDocument, Resolution), PipelineError> {
        let flow_config = self.config.flow_config();
        let doc = FlowBuilder::new(&flow_config, self.stylesheet.clone(), self.images.as_ref()).build(tree)?;

        let engine = LayoutEngine::new(self.config.layout_config(), self.measurer.clone());
        let resolution = ReferenceResolver::new(&engine, &self.templates, self.config.max_passes).resolve(&doc)?;
        Ok((doc, resolution))
    }

    /// Converts one document tree. Any error means no PDF.
    pub fn convert(&self, tree: &DocNode) -> Result<ConversionOutput, PipelineError> {
        let (doc, resolution) = self.layout(tree)?;
        let pdf = PdfEmitter::new(self.config.emit_options()).emit(&resolution.pass, &doc)?;

        let mut warnings = doc.warnings;
        warnings.extend(resolution.pass.warnings.iter().cloned());
        let page_count = resolution.pass.page_count();
        log::info!(
            "Converted document: {} pages in {} passes, {} bytes, {} warnings.",
            page_count,
            resolution.passes,
            pdf.len(),
            warnings.len()
        );
        Ok(ConversionOutput { pdf, warnings, page_count, passes: resolution.passes })
    }

    /// Converts several documents, in parallel when the `rayon-executor`
    /// feature is on. Results keep the order of `trees`.
    pub fn convert_all(&self, trees: &[DocNode]) -> Vec<Result<ConversionOutput, PipelineError>> {
        #[cfg(feature = "rayon-executor")]
        {
            use rayon::prelude::*;
            log::info!("Converting {} documents on the rayon pool.", trees.len());
            trees.par_iter().map(|tree| self.convert(tree)).collect()
        }
        #[cfg(not(feature = "rayon-executor"))]
        {
            log::info!("Converting {} documents sequentially.", trees.len());
            trees.iter().map(|tree| self.convert(tree)).collect()
        }
    }
}
