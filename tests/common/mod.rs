#![allow(dead_code)]

use folio::idf::{DocNode, InlineNode, NodeMetadata};
use folio::layout::{PageTemplate, TemplateSet};
use folio::style::dimension::{Margins, PageSize};
use folio::style::stylesheet::StyleSheet;
use folio::traits::FixedWidthMeasurer;
use folio::{ConversionConfig, Pipeline, PipelineBuilder, PipelineError};
use lopdf::content::Content;
use lopdf::{Document as LopdfDocument, ObjectId};
use std::sync::Arc;

pub type TestResult = Result<(), Box<dyn std::error::Error>>;

pub fn init_logger() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// One `width` x `height` template with 10pt margins and no running blocks.
pub fn small_templates(width: f32, height: f32) -> Result<TemplateSet, PipelineError> {
    let template = PageTemplate::single_column("page", PageSize::Custom { width, height }, &Margins::all(10.0));
    Ok(TemplateSet::single(template)?)
}

/// A pipeline with predictable metrics: an empty style sheet (12pt text on
/// 14.4pt lines) and every character 6pt wide.
pub fn plain_pipeline(templates: TemplateSet, config: ConversionConfig) -> Result<Pipeline, PipelineError> {
    PipelineBuilder::new()
        .with_base_stylesheet(StyleSheet::new())
        .with_templates(templates)
        .with_measurer(Arc::new(FixedWidthMeasurer::default()))
        .with_config(config)
        .build()
}

pub fn paragraph(children: Vec<InlineNode>) -> DocNode {
    DocNode::Paragraph { meta: NodeMetadata::default(), children }
}

/// Wrapper around a generated PDF with helper methods
pub struct GeneratedPdf {
    pub bytes: Vec<u8>,
    pub doc: LopdfDocument,
}

impl GeneratedPdf {
    pub fn from_bytes(bytes: Vec<u8>) -> Result<Self, Box<dyn std::error::Error>> {
        let doc = LopdfDocument::load_mem(&bytes)?;
        Ok(Self { bytes, doc })
    }

    pub fn page_count(&self) -> usize {
        self.doc.get_pages().len()
    }

    pub fn page_id(&self, page: u32) -> Option<ObjectId> {
        self.doc.get_pages().get(&page).copied()
    }

    /// Operands of every `Tj` on a 1-based page, in drawing order.
    pub fn page_strings(&self, page: u32) -> Vec<String> {
        let Some(id) = self.page_id(page) else {
            return Vec::new();
        };
        let Ok(bytes) = self.doc.get_page_content(id) else {
            return Vec::new();
        };
        let Ok(content) = Content::decode(&bytes) else {
            return Vec::new();
        };
        content
            .operations
            .iter()
            .filter(|op| op.operator == "Tj")
            .filter_map(|op| op.operands.first())
            .filter_map(|o| o.as_str().ok())
            .map(|b| String::from_utf8_lossy(b).into_owned())
            .collect()
    }

    /// Page strings joined by single spaces.
    pub fn page_text(&self, page: u32) -> String {
        self.page_strings(page).join(" ")
    }

    /// Top-level outline entries as (title, destination page number).
    pub fn outline(&self) -> Vec<(String, u32)> {
        let mut entries = Vec::new();
        let pages: Vec<(u32, ObjectId)> = self.doc.get_pages().into_iter().collect();
        let Ok(catalog) = self.doc.catalog() else {
            return entries;
        };
        let Ok(outlines) = catalog.get(b"Outlines").and_then(|o| o.as_reference()) else {
            return entries;
        };
        let Ok(root) = self.doc.get_dictionary(outlines) else {
            return entries;
        };
        let mut next = root.get(b"First").and_then(|o| o.as_reference()).ok();
        while let Some(id) = next {
            let Ok(item) = self.doc.get_dictionary(id) else {
                break;
            };
            let title = item
                .get(b"Title")
                .and_then(|t| t.as_str())
                .map(|b| String::from_utf8_lossy(b).into_owned())
                .unwrap_or_default();
            let page = item
                .get(b"Dest")
                .and_then(|d| d.as_array())
                .ok()
                .and_then(|dest| dest.first())
                .and_then(|target| target.as_reference().ok())
                .and_then(|target| pages.iter().find(|(_, pid)| *pid == target).map(|(n, _)| *n))
                .unwrap_or(0);
            entries.push((title, page));
            next = item.get(b"Next").and_then(|o| o.as_reference()).ok();
        }
        entries
    }

    /// Number of `/Link` annotations with a `GoTo` action on a page.
    pub fn internal_links(&self, page: u32) -> usize {
        let Some(id) = self.page_id(page) else {
            return 0;
        };
        let Ok(page_dict) = self.doc.get_dictionary(id) else {
            return 0;
        };
        let Ok(annots) = page_dict.get(b"Annots").and_then(|a| a.as_array()) else {
            return 0;
        };
        annots
            .iter()
            .filter_map(|a| a.as_reference().ok())
            .filter_map(|a| self.doc.get_dictionary(a).ok())
            .filter(|annot| {
                annot
                    .get(b"A")
                    .and_then(|a| a.as_reference())
                    .and_then(|a| self.doc.get_dictionary(a))
                    .and_then(|a| a.get(b"S"))
                    .and_then(|s| s.as_name())
                    .is_ok_and(|s| s == b"GoTo")
            })
            .count()
    }
}

/// Strings that are page numbers.
pub fn numbers(strings: &[String]) -> Vec<&str> {
    strings
        .iter()
        .map(String::as_str)
        .filter(|s| !s.is_empty() && s.chars().all(|c| c.is_ascii_digit()))
        .collect()
}
