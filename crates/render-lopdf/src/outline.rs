//! The document outline (bookmarks).

use crate::annotations::PageTargets;
use crate::encoding::to_win_ansi;
use crate::error::RenderError;
use crate::writer::StreamingPdfWriter;
use folio_layout::flow::BookmarkNode;
use lopdf::{Object, ObjectId, StringFormat, dictionary};
use std::io::{Seek, Write};

struct OutlineItem {
    id: ObjectId,
    title: String,
    dest: Vec<Object>,
    children: Vec<OutlineItem>,
}

fn allocate<W: Write + Seek>(
    writer: &mut StreamingPdfWriter<W>,
    nodes: &[BookmarkNode],
    targets: &PageTargets<'_>,
) -> Result<Vec<OutlineItem>, RenderError> {
    nodes
        .iter()
        .map(|node| {
            Ok(OutlineItem {
                id: writer.new_object_id(),
                title: node.entry.title.clone(),
                dest: targets.destination(&node.entry.target)?,
                children: allocate(writer, &node.children, targets)?,
            })
        })
        .collect()
}

/// Visible entries below `items`, counting open descendants.
fn open_count(items: &[OutlineItem]) -> i64 {
    items.iter().map(|i| 1 + open_count(&i.children)).sum()
}

fn buffer_level<W: Write + Seek>(items: &[OutlineItem], parent: ObjectId, writer: &mut StreamingPdfWriter<W>) {
    for (i, item) in items.iter().enumerate() {
        let mut dict = dictionary! {
            "Title" => Object::String(to_win_ansi(&item.title), StringFormat::Literal),
            "Parent" => parent,
            "Dest" => item.dest.clone(),
        };
        if i > 0 {
            dict.set("Prev", items[i - 1].id);
        }
        if let Some(next) = items.get(i + 1) {
            dict.set("Next", next.id);
        }
        if let (Some(first), Some(last)) = (item.children.first(), item.children.last()) {
            dict.set("First", first.id);
            dict.set("Last", last.id);
            dict.set("Count", open_count(&item.children));
            buffer_level(&item.children, item.id, writer);
        }
        writer.buffer_object_at_id(item.id, dict.into());
    }
}

/// Writes the outline tree and returns the id of its root, or `None` when the
/// document has no bookmarks.
pub(crate) fn build_outlines<W: Write + Seek>(
    writer: &mut StreamingPdfWriter<W>,
    forest: &[BookmarkNode],
    targets: &PageTargets<'_>,
) -> Result<Option<ObjectId>, RenderError> {
    if forest.is_empty() {
        return Ok(None);
    }
    let root_id = writer.new_object_id();
    let items = allocate(writer, forest, targets)?;
    let (Some(first), Some(last)) = (items.first(), items.last()) else {
        return Ok(None);
    };
    writer.buffer_object_at_id(
        root_id,
        dictionary! {
            "Type" => "Outlines",
            "First" => first.id,
            "Last" => last.id,
            "Count" => open_count(&items),
        }
        .into(),
    );
    buffer_level(&items, root_id, writer);
    Ok(Some(root_id))
}
