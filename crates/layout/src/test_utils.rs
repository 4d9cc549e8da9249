use crate::{
    FlowBuilder, FlowConfig, FlowDocument, LaidOutPage, LayoutConfig, LayoutEngine, LayoutError, LayoutPass,
    MeasureCache, PageTemplate, PositionedElement, ReferenceTable, StructuralError, TemplateSet,
};
use crate::elements::LayoutElement;
use folio_idf::{DocNode, InlineNode, NodeMetadata};
use folio_style::dimension::{Margins, PageSize};
use folio_style::stylesheet::{ElementStyle, StyleSheet};
use folio_traits::{FixedWidthMeasurer, InMemoryImageDecoder};
use std::sync::Arc;

pub fn init_logger() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// A bare sheet: 12pt text on 14.4pt lines, no spacing anywhere.
pub fn plain_sheet() -> StyleSheet {
    StyleSheet::new()
}

pub fn build(tree: &DocNode, sheet: StyleSheet) -> Result<FlowDocument, StructuralError> {
    build_with(tree, sheet, &FlowConfig::default())
}

pub fn build_with(tree: &DocNode, sheet: StyleSheet, config: &FlowConfig) -> Result<FlowDocument, StructuralError> {
    let images = InMemoryImageDecoder::new();
    FlowBuilder::new(config, Arc::new(sheet), &images).build(tree)
}

/// One template of `width` x `height` points with 10pt margins.
pub fn small_pages(width: f32, height: f32) -> TemplateSet {
    let template = PageTemplate::single_column("page", PageSize::Custom { width, height }, &Margins::all(10.0));
    match TemplateSet::single(template) {
        Ok(set) => set,
        Err(e) => panic!("test template rejected: {e}"),
    }
}

/// Creates an engine whose characters are all 6pt wide at 12pt.
pub fn create_test_engine() -> LayoutEngine {
    LayoutEngine::new(LayoutConfig::default(), Arc::new(FixedWidthMeasurer::default()))
}

pub fn place(doc: &FlowDocument, templates: &TemplateSet) -> Result<LayoutPass, LayoutError> {
    place_with(doc, templates, &ReferenceTable::new())
}

pub fn place_with(doc: &FlowDocument, templates: &TemplateSet, refs: &ReferenceTable) -> Result<LayoutPass, LayoutError> {
    let mut cache = MeasureCache::new();
    create_test_engine().place(doc, templates, refs, &mut cache)
}

/// Builds and places a list of top-level nodes.
pub fn paginate_test_nodes(templates: &TemplateSet, nodes: Vec<DocNode>) -> Result<Vec<LaidOutPage>, LayoutError> {
    let doc = build(&DocNode::document(nodes), plain_sheet()).map_err(|e| LayoutError::Generic(e.to_string()))?;
    Ok(place(&doc, templates)?.pages)
}

/// A paragraph where `\n` becomes a line break.
pub fn create_paragraph(text: &str) -> DocNode {
    create_styled_paragraph(text, None)
}

pub fn create_styled_paragraph(text: &str, style: Option<ElementStyle>) -> DocNode {
    let mut children = Vec::new();
    for (i, line) in text.split('\n').enumerate() {
        if i > 0 {
            children.push(InlineNode::LineBreak);
        }
        if !line.is_empty() {
            children.push(InlineNode::text(line));
        }
    }
    DocNode::Paragraph { meta: NodeMetadata { style, ..Default::default() }, children }
}

pub fn find_first_text_box_with_content<'a>(page: &'a LaidOutPage, content: &str) -> Option<&'a PositionedElement> {
    page.elements.iter().find(|el| match &el.element {
        LayoutElement::Text(t) => t.content.contains(content),
        _ => false,
    })
}

/// All text of a page in drawing order.
pub fn page_text(page: &LaidOutPage) -> String {
    page.text().collect::<Vec<_>>().join(" ")
}
