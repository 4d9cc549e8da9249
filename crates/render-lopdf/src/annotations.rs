//! Destinations and link annotations.

use crate::error::RenderError;
use crate::writer::StreamingPdfWriter;
use folio_layout::{AnchorPosition, LaidOutPage, LayoutElement};
use folio_types::AnchorId;
use lopdf::{Object, ObjectId, StringFormat, dictionary};
use std::collections::BTreeMap;
use std::io::{Seek, Write};

/// Page objects and heights, indexed by page number - 1.
pub(crate) struct PageTargets<'a> {
    pub ids: &'a [ObjectId],
    pub pages: &'a [LaidOutPage],
    pub anchors: &'a BTreeMap<AnchorId, AnchorPosition>,
}

impl PageTargets<'_> {
    /// `[page /FitH top]` for an anchor.
    pub fn destination(&self, target: &AnchorId) -> Result<Vec<Object>, RenderError> {
        let position = self
            .anchors
            .get(target)
            .ok_or_else(|| RenderError::EmissionInternalError(format!("anchor '{}' has no placement", target)))?;
        let index = position.page.checked_sub(1).filter(|i| *i < self.ids.len()).ok_or_else(|| {
            RenderError::EmissionInternalError(format!("anchor '{}' points at missing page {}", target, position.page))
        })?;
        let page_height = self.pages[index].size.1;
        Ok(vec![Object::Reference(self.ids[index]), "FitH".into(), (page_height - position.y).into()])
    }

    /// The `/Dests` dictionary: one named destination per placed anchor.
    pub fn named_destinations(&self) -> Result<lopdf::Dictionary, RenderError> {
        let mut dests = lopdf::Dictionary::new();
        for id in self.anchors.keys() {
            dests.set(id.as_str().as_bytes(), Object::Array(self.destination(id)?));
        }
        Ok(dests)
    }
}

/// Creates link annotations for every text run that carries an `href`:
/// `#id` becomes a `GoTo` action, anything else a `URI` action.
pub(crate) fn create_link_annotations<W: Write + Seek>(
    writer: &mut StreamingPdfWriter<W>,
    page: &LaidOutPage,
    targets: &PageTargets<'_>,
) -> Result<Vec<ObjectId>, RenderError> {
    let page_height = page.size.1;
    let mut annots = Vec::new();
    for el in &page.elements {
        let LayoutElement::Text(text) = &el.element else { continue };
        let Some(href) = text.href.as_deref() else { continue };
        if text.content.trim().is_empty() {
            continue;
        }
        let action = match href.strip_prefix('#') {
            Some(target) => dictionary! {
                "Type" => "Action",
                "S" => "GoTo",
                "D" => targets.destination(&AnchorId::new(target))?,
            },
            None => dictionary! {
                "Type" => "Action",
                "S" => "URI",
                "URI" => Object::String(href.as_bytes().to_vec(), StringFormat::Literal),
            },
        };
        let action_id = writer.buffer_object(action.into());
        let rect = vec![
            el.x.into(),
            (page_height - (el.y + el.height)).into(),
            (el.x + el.width).into(),
            (page_height - el.y).into(),
        ];
        let annot = dictionary! {
            "Type" => "Annot",
            "Subtype" => "Link",
            "Rect" => rect,
            "Border" => vec![0.into(), 0.into(), 0.into()],
            "A" => action_id,
        };
        annots.push(writer.buffer_object(annot.into()));
    }
    Ok(annots)
}
