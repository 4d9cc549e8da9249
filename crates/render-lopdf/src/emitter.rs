use crate::annotations::{PageTargets, create_link_annotations};
use crate::content::PageCanvas;
use crate::encoding::to_win_ansi;
use crate::error::RenderError;
use crate::outline::build_outlines;
use crate::resources::ResourceRegistry;
use crate::writer::StreamingPdfWriter;
use folio_layout::{FlowDocument, LayoutPass};
use lopdf::{Dictionary, Object, ObjectId, StringFormat, dictionary};
use std::io::Cursor;

const PDF_VERSION: &str = "1.7";

#[derive(Debug, Clone, PartialEq)]
pub struct EmitOptions {
    /// Deflate page content streams.
    pub compress: bool,
    pub title: Option<String>,
    pub author: Option<String>,
    /// Written verbatim as `/CreationDate`, e.g. `D:20240101000000Z`. Without
    /// it the output carries no timestamp and is byte-for-byte reproducible.
    pub creation_date: Option<String>,
    pub producer: String,
}

impl Default for EmitOptions {
    fn default() -> Self {
        Self {
            compress: false,
            title: None,
            author: None,
            creation_date: None,
            producer: concat!("folio ", env!("CARGO_PKG_VERSION")).to_string(),
        }
    }
}

/// Serializes a final layout pass into PDF bytes.
#[derive(Debug, Clone, Default)]
pub struct PdfEmitter {
    options: EmitOptions,
}

impl PdfEmitter {
    pub fn new(options: EmitOptions) -> Self {
        Self { options }
    }

    pub fn options(&self) -> &EmitOptions {
        &self.options
    }

    pub fn emit(&self, pass: &LayoutPass, doc: &FlowDocument) -> Result<Vec<u8>, RenderError> {
        check_placements(pass)?;

        let registry = ResourceRegistry::collect(&pass.pages);
        let mut writer = StreamingPdfWriter::new(Cursor::new(Vec::new()), PDF_VERSION, Dictionary::new(), self.options.compress)?;
        registry.write(&mut writer, &pass.pages);

        // Page ids come first so links and outline entries can point forward.
        let page_ids: Vec<ObjectId> = pass.pages.iter().map(|_| writer.new_object_id()).collect();
        let targets = PageTargets { ids: &page_ids, pages: &pass.pages, anchors: &pass.anchors };

        for (page, page_id) in pass.pages.iter().zip(&page_ids) {
            let (width, height) = page.size;
            let mut canvas = PageCanvas::new(height, &registry);
            for el in &page.elements {
                canvas.draw_element(el)?;
            }
            let content_id = writer.buffer_content_stream(&canvas.finish())?;
            let annotations = create_link_annotations(&mut writer, page, &targets)?;

            let mut page_dict = dictionary! {
                "Type" => "Page",
                "Parent" => writer.pages_id,
                "MediaBox" => vec![0.into(), 0.into(), width.into(), height.into()],
                "Contents" => content_id,
                "Resources" => writer.resources_id,
            };
            if !annotations.is_empty() {
                page_dict.set("Annots", annotations.into_iter().map(Object::Reference).collect::<Vec<_>>());
            }
            writer.buffer_object_at_id(*page_id, page_dict.into());
            writer.add_page(*page_id);
        }

        if let Some(outline_id) = build_outlines(&mut writer, &doc.bookmark_forest(), &targets)? {
            writer.set_catalog_entry("Outlines", outline_id);
            writer.set_catalog_entry("PageMode", "UseOutlines");
        }
        if !pass.anchors.is_empty() {
            let dests = writer.buffer_object(targets.named_destinations()?.into());
            writer.set_catalog_entry("Dests", dests);
        }
        writer.set_info(self.info(doc));

        let bytes = writer.finish()?.into_inner();
        log::info!("Emitted {} pages ({} bytes)", pass.pages.len(), bytes.len());
        Ok(bytes)
    }

    fn info(&self, doc: &FlowDocument) -> Dictionary {
        let text = |s: &str| Object::String(to_win_ansi(s), StringFormat::Literal);
        let mut info = dictionary! { "Producer" => text(&self.options.producer) };
        if let Some(title) = self.options.title.as_deref().or(doc.title.as_deref()) {
            info.set("Title", text(title));
        }
        if let Some(author) = &self.options.author {
            info.set("Author", text(author));
        }
        if let Some(date) = &self.options.creation_date {
            info.set("CreationDate", text(date));
        }
        info
    }
}

/// Every element drawn for a flow unit needs that unit's placement.
fn check_placements(pass: &LayoutPass) -> Result<(), RenderError> {
    for page in &pass.pages {
        for el in &page.elements {
            if let Some(unit) = el.unit {
                if !pass.placements.contains_key(&unit) {
                    return Err(RenderError::EmissionInternalError(format!(
                        "element {} on page {} belongs to unit {} which has no placement",
                        el.element, page.number, unit
                    )));
                }
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use folio_layout::{
        AnchorPosition, FlowBuilder, FlowConfig, LaidOutPage, LayoutConfig, LayoutElement, LayoutEngine,
        MeasureCache, PositionedElement, ReferenceTable, TemplateSet, TextElement,
    };
    use folio_idf::{DocNode, InlineNode, NodeMetadata};
    use folio_style::stylesheet::StyleSheet;
    use folio_traits::{NullImageDecoder, StandardMetrics};
    use folio_types::AnchorId;
    use lopdf::content::Content;
    use std::sync::Arc;

    fn init_logger() {
        let _ = env_logger::builder().is_test(true).try_init();
    }

    fn lay_out(tree: &DocNode) -> (FlowDocument, LayoutPass) {
        let images = NullImageDecoder;
        let doc = FlowBuilder::new(&FlowConfig::default(), Arc::new(StyleSheet::standard()), &images)
            .build(tree)
            .unwrap();
        let engine = LayoutEngine::new(LayoutConfig::default(), Arc::new(StandardMetrics::default()));
        let templates = TemplateSet::standard();
        let first = engine.place(&doc, &templates, &ReferenceTable::new(), &mut MeasureCache::new()).unwrap();
        let pass = engine.place(&doc, &templates, &first.observed_references(), &mut MeasureCache::new()).unwrap();
        (doc, pass)
    }

    fn page_strings(doc: &lopdf::Document, page: ObjectId) -> Vec<String> {
        let content = Content::decode(&doc.get_page_content(page).unwrap()).unwrap();
        content
            .operations
            .iter()
            .filter(|op| op.operator == "Tj")
            .filter_map(|op| op.operands.first())
            .filter_map(|o| o.as_str().ok())
            .map(|b| String::from_utf8_lossy(b).into_owned())
            .collect()
    }

    #[test]
    fn test_outline_and_internal_links_point_at_target_page() -> Result<(), RenderError> {
        init_logger();
        let tree = DocNode::document(vec![
            DocNode::Paragraph {
                meta: NodeMetadata::default(),
                children: vec![InlineNode::Link {
                    href: "#later".to_string(),
                    children: vec![InlineNode::text("jump")],
                }],
            },
            DocNode::PageBreak { template: None },
            DocNode::section("later", "Later", vec![DocNode::paragraph("Target text")]),
        ]);
        let (flow, pass) = lay_out(&tree);
        let bytes = PdfEmitter::default().emit(&pass, &flow)?;

        let doc = lopdf::Document::load_mem(&bytes).unwrap();
        let pages = doc.get_pages();
        assert_eq!(pages.len(), 2);
        let page2_id = pages[&2];
        let page_height = pass.pages[1].size.1;
        let anchor_y = pass.anchors[&AnchorId::new("later")].y;

        let catalog = doc.catalog().unwrap();
        let outlines = doc.get_object(catalog.get(b"Outlines").unwrap().as_reference().unwrap()).unwrap();
        let first = outlines.as_dict().unwrap().get(b"First").unwrap().as_reference().unwrap();
        let item = doc.get_object(first).unwrap().as_dict().unwrap();
        let dest = item.get(b"Dest").unwrap().as_array().unwrap();
        assert_eq!(dest[0].as_reference().unwrap(), page2_id);
        assert_eq!(dest[1].as_name().unwrap(), b"FitH");
        assert!((dest[2].as_float().unwrap() - (page_height - anchor_y)).abs() < 0.1);

        let page1 = doc.get_object(pages[&1]).unwrap().as_dict().unwrap();
        let annots = page1.get(b"Annots").unwrap().as_array().unwrap();
        assert_eq!(annots.len(), 1);
        let annot = doc.get_object(annots[0].as_reference().unwrap()).unwrap().as_dict().unwrap();
        let action = doc.get_object(annot.get(b"A").unwrap().as_reference().unwrap()).unwrap().as_dict().unwrap();
        assert_eq!(action.get(b"S").unwrap().as_name().unwrap(), b"GoTo");
        let target = action.get(b"D").unwrap().as_array().unwrap();
        assert_eq!(target[0].as_reference().unwrap(), page2_id);

        let dests = doc.get_object(catalog.get(b"Dests").unwrap().as_reference().unwrap()).unwrap();
        assert!(dests.as_dict().unwrap().has(b"later"));
        Ok(())
    }

    #[test]
    fn test_external_links_use_uri_actions() -> Result<(), RenderError> {
        init_logger();
        let tree = DocNode::document(vec![DocNode::Paragraph {
            meta: NodeMetadata::default(),
            children: vec![InlineNode::Link {
                href: "https://example.org".to_string(),
                children: vec![InlineNode::text("site")],
            }],
        }]);
        let (flow, pass) = lay_out(&tree);
        let bytes = PdfEmitter::default().emit(&pass, &flow)?;

        let doc = lopdf::Document::load_mem(&bytes).unwrap();
        let page = doc.get_object(doc.get_pages()[&1]).unwrap().as_dict().unwrap();
        let annots = page.get(b"Annots").unwrap().as_array().unwrap();
        let annot = doc.get_object(annots[0].as_reference().unwrap()).unwrap().as_dict().unwrap();
        let action = doc.get_object(annot.get(b"A").unwrap().as_reference().unwrap()).unwrap().as_dict().unwrap();
        assert_eq!(action.get(b"S").unwrap().as_name().unwrap(), b"URI");
        assert_eq!(action.get(b"URI").unwrap().as_str().unwrap(), b"https://example.org");
        Ok(())
    }

    #[test]
    fn test_text_and_info_are_written() -> Result<(), RenderError> {
        init_logger();
        let tree = DocNode::Document {
            meta: NodeMetadata::default(),
            title: Some("Manual".to_string()),
            children: vec![DocNode::paragraph("Hello PDF")],
        };
        let (flow, pass) = lay_out(&tree);
        let options = EmitOptions { author: Some("Docs Team".to_string()), ..Default::default() };
        let bytes = PdfEmitter::new(options).emit(&pass, &flow)?;

        let doc = lopdf::Document::load_mem(&bytes).unwrap();
        let strings = page_strings(&doc, doc.get_pages()[&1]);
        assert!(strings.iter().any(|s| s == "Hello PDF"));
        assert!(strings.iter().any(|s| s == "1"), "footer page number missing: {strings:?}");

        let info_id = doc.trailer.get(b"Info").unwrap().as_reference().unwrap();
        let info = doc.get_object(info_id).unwrap().as_dict().unwrap();
        assert_eq!(info.get(b"Title").unwrap().as_str().unwrap(), b"Manual");
        assert_eq!(info.get(b"Author").unwrap().as_str().unwrap(), b"Docs Team");
        assert!(!info.has(b"CreationDate"));
        Ok(())
    }

    #[test]
    fn test_emission_is_deterministic_and_compressible() -> Result<(), RenderError> {
        init_logger();
        let tree = DocNode::document(vec![DocNode::section("a", "A", vec![DocNode::paragraph("Body")])]);
        let (flow, pass) = lay_out(&tree);
        let plain = PdfEmitter::default();
        assert_eq!(plain.emit(&pass, &flow)?, plain.emit(&pass, &flow)?);

        let compressed = PdfEmitter::new(EmitOptions { compress: true, ..Default::default() }).emit(&pass, &flow)?;
        let doc = lopdf::Document::load_mem(&compressed).unwrap();
        let strings = page_strings(&doc, doc.get_pages()[&1]);
        assert!(strings.iter().any(|s| s == "Body"));
        Ok(())
    }

    #[test]
    fn test_element_without_placement_is_an_internal_error() {
        init_logger();
        let orphan = PositionedElement {
            unit: Some(folio_layout::UnitId(99)),
            element: LayoutElement::Text(TextElement {
                content: "lost".to_string(),
                href: None,
                word_spacing: 0.0,
                baseline: 10.0,
            }),
            ..PositionedElement::from_rect(folio_types::Rect::new(0.0, 0.0, 10.0, 10.0))
        };
        let pass = LayoutPass {
            pages: vec![LaidOutPage {
                number: 1,
                template: Arc::from("t"),
                size: (100.0, 100.0),
                elements: vec![orphan],
                footnotes: vec![],
            }],
            ..Default::default()
        };
        let result = PdfEmitter::default().emit(&pass, &FlowDocument::default());
        assert!(matches!(result, Err(RenderError::EmissionInternalError(_))));
    }

    #[test]
    fn test_bookmark_without_anchor_is_an_internal_error() {
        init_logger();
        let flow = FlowDocument {
            bookmarks: vec![folio_types::TocEntry { level: 1, title: "Gone".to_string(), target: AnchorId::new("gone") }],
            ..Default::default()
        };
        let mut pass = LayoutPass::default();
        pass.pages.push(LaidOutPage {
            number: 1,
            template: Arc::from("t"),
            size: (100.0, 100.0),
            elements: vec![],
            footnotes: vec![],
        });
        pass.anchors.insert(AnchorId::new("other"), AnchorPosition { page: 1, y: 0.0 });
        let result = PdfEmitter::default().emit(&pass, &flow);
        assert!(matches!(result, Err(RenderError::EmissionInternalError(_))));
    }
}
