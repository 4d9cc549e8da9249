//! The default per-kind handlers of the flow builder.

use super::builder::{BuildContext, FlowBuilder};
use super::{
    CellUnit, FlowKind, FlowUnit, Footnote, FootnoteMode, ImageUnit, ParagraphUnit, TableRowUnit,
    TableUnit, TextSpan, TocLine, TocUnit,
};
use crate::error::{NodeLocation, StructuralError};
use crate::style::StyleContext;
use crate::warnings::LayoutWarning;
use folio_idf::{DocNode, InlineNode, TableRow};
use folio_style::list::ListStyleType;
use folio_types::TocEntry;
use std::sync::Arc;

/// Size of the box drawn for an image that could not be decoded and has no
/// explicit size.
const PLACEHOLDER_IMAGE_SIZE: f32 = 72.0;

/// Indent of each TOC level below the first.
const TOC_LEVEL_INDENT: f32 = 12.0;

pub(crate) fn document(b: &mut FlowBuilder<'_>, node: &DocNode, ctx: &BuildContext) -> Result<(), StructuralError> {
    let DocNode::Document { meta, title, children } = node else {
        return Ok(());
    };
    if title.is_some() {
        b.title = title.clone();
    }
    let style = b.resolve_style("document", Some(meta), ctx);
    b.emit_anchor_marker(meta, &style);
    b.walk_children(children, ctx, style)
}

pub(crate) fn section(b: &mut FlowBuilder<'_>, node: &DocNode, ctx: &BuildContext) -> Result<(), StructuralError> {
    let DocNode::Section { meta, title, children } = node else {
        return Ok(());
    };
    let level = ctx.section_level.saturating_add(1);
    let style = b.resolve_style("section", Some(meta), ctx);
    let id = b.anchor_or_generate(meta, "section");

    let by_level = b.config.break_level > 0 && level <= b.config.break_level;
    let wants_break = by_level || style.pagination.page_break_before;
    let mut template = style.pagination.page_template.clone();
    // A break before the first content only matters when it picks a template.
    if wants_break && (b.has_content() || template.is_some()) {
        let template = template.take();
        b.emit(None, style.clone(), FlowKind::PageBreak { template, side: b.config.break_side });
    }

    let plain = InlineNode::plain_text(title);
    b.emit(
        Some(id.clone()),
        style.clone(),
        FlowKind::Bookmark { title: plain.clone(), level, outline: true, template },
    );
    b.bookmarks.push(TocEntry { level, title: plain, target: id });

    let mut classes = vec![format!("h{}", level)];
    classes.extend(meta.classes.iter().cloned());
    let heading_ctx = ctx.style.child(style.clone());
    let heading = b.resolve_with_classes("heading", &classes, &heading_ctx);
    let location = ctx.location(Some(meta));
    let spans = b.spans(title, &heading, ctx, &location);
    b.emit(None, heading, FlowKind::Paragraph(ParagraphUnit::new(spans)));

    let mut inner = ctx.clone();
    inner.section_level = level;
    b.walk_children(children, &inner, style)
}

pub(crate) fn paragraph(b: &mut FlowBuilder<'_>, node: &DocNode, ctx: &BuildContext) -> Result<(), StructuralError> {
    let DocNode::Paragraph { meta, children } = node else {
        return Ok(());
    };
    let style = b.resolve_style("paragraph", Some(meta), ctx);
    let location = ctx.location(Some(meta));
    let spans = b.spans(children, &style, ctx, &location);
    let mut unit = ParagraphUnit::new(spans);
    unit.bullet = b.pending_bullet.take();
    b.emit(meta.id.clone(), style, FlowKind::Paragraph(unit));
    Ok(())
}

pub(crate) fn literal_block(b: &mut FlowBuilder<'_>, node: &DocNode, ctx: &BuildContext) -> Result<(), StructuralError> {
    let DocNode::LiteralBlock { meta, text } = node else {
        return Ok(());
    };
    let style = b.resolve_style("literal-block", Some(meta), ctx);
    let mut unit = ParagraphUnit::new(vec![TextSpan::text(text.clone(), style.clone())]);
    unit.preserve_whitespace = true;
    unit.bullet = b.pending_bullet.take();
    b.emit(meta.id.clone(), style, FlowKind::Paragraph(unit));
    Ok(())
}

pub(crate) fn block(b: &mut FlowBuilder<'_>, node: &DocNode, ctx: &BuildContext) -> Result<(), StructuralError> {
    let DocNode::Block { meta, children } = node else {
        return Ok(());
    };
    let style = b.resolve_style("block", Some(meta), ctx);
    b.emit_anchor_marker(meta, &style);
    b.walk_children(children, ctx, style)
}

pub(crate) fn list(b: &mut FlowBuilder<'_>, node: &DocNode, ctx: &BuildContext) -> Result<(), StructuralError> {
    let DocNode::List { meta, ordered, start, items } = node else {
        return Ok(());
    };
    let style = b.resolve_style("list", Some(meta), ctx);
    b.emit_anchor_marker(meta, &style);

    let style_type = match (style.list.style_type, *ordered) {
        (t, true) if !t.is_ordered() && t != ListStyleType::None => ListStyleType::Decimal,
        (t, false) if t.is_ordered() => ListStyleType::Disc,
        (t, _) => t,
    };
    let mut counter = start.unwrap_or(1);
    for (index, item) in items.iter().enumerate() {
        let mut item_ctx = ctx.child(index, style.clone());
        item_ctx.style.list_counters.push(counter);
        if matches!(item, DocNode::ListItem { .. }) {
            let label = style_type.label(counter);
            b.pending_bullet = (!label.is_empty()).then_some(label);
            counter += 1;
        }
        b.walk(item, &item_ctx)?;
        b.pending_bullet = None;
    }
    Ok(())
}

pub(crate) fn list_item(b: &mut FlowBuilder<'_>, node: &DocNode, ctx: &BuildContext) -> Result<(), StructuralError> {
    let DocNode::ListItem { meta, children } = node else {
        return Ok(());
    };
    let style = b.resolve_style("list-item", Some(meta), ctx);
    b.emit_anchor_marker(meta, &style);
    b.walk_children(children, ctx, style)
}

pub(crate) fn table(b: &mut FlowBuilder<'_>, node: &DocNode, ctx: &BuildContext) -> Result<(), StructuralError> {
    let DocNode::Table { meta, columns, header, rows } = node else {
        return Ok(());
    };
    let style = b.resolve_style("table", Some(meta), ctx);

    let declared = columns.len();
    let column_count = if declared > 0 {
        declared
    } else {
        header
            .iter()
            .chain(rows)
            .map(|r| r.cells.iter().map(|c| c.col_span).sum::<usize>())
            .max()
            .unwrap_or(1)
            .max(1)
    };
    check_spans(header.iter().chain(rows), column_count, ctx, meta.line)?;

    let weights: Vec<f32> = if declared > 0 {
        columns
            .iter()
            .map(|c| c.width.filter(|w| *w > 0.0).unwrap_or(1.0))
            .collect()
    } else {
        vec![1.0; column_count]
    };

    let mut built_header = Vec::with_capacity(header.len());
    for (r, row) in header.iter().enumerate() {
        built_header.push(table_row(b, row, r, true, column_count, ctx, &style)?);
    }
    let mut built_rows = Vec::with_capacity(rows.len());
    for (r, row) in rows.iter().enumerate() {
        built_rows.push(table_row(b, row, header.len() + r, false, column_count, ctx, &style)?);
    }

    let unit = TableUnit {
        columns: weights,
        header: built_header,
        rows: built_rows,
        repeat_header: b.config.repeat_table_header,
        splittable: b.config.split_tables,
        first_row: 0,
    };
    b.emit(meta.id.clone(), style, FlowKind::Table(unit));
    Ok(())
}

fn check_spans<'r>(
    rows: impl Iterator<Item = &'r TableRow>,
    columns: usize,
    ctx: &BuildContext,
    table_line: Option<u32>,
) -> Result<(), StructuralError> {
    for (r, row) in rows.enumerate() {
        let mut used = 0;
        for (c, cell) in row.cells.iter().enumerate() {
            let mut path = ctx.path.clone();
            path.extend([r, c]);
            let location = NodeLocation::new(path, cell.meta.line.or(table_line));
            if cell.col_span == 0 {
                return Err(StructuralError::ZeroColumnSpan { location });
            }
            used += cell.col_span;
            if used > columns {
                return Err(StructuralError::ColumnSpanExceeded { location, spans: used, columns });
            }
        }
    }
    Ok(())
}

fn table_row(
    b: &mut FlowBuilder<'_>,
    row: &TableRow,
    row_index: usize,
    is_header: bool,
    column_count: usize,
    ctx: &BuildContext,
    table_style: &Arc<crate::style::ComputedStyle>,
) -> Result<TableRowUnit, StructuralError> {
    let mut cells = Vec::with_capacity(row.cells.len());
    let mut column = 0;
    for (c, cell) in row.cells.iter().enumerate() {
        let mut cell_ctx = ctx.child(row_index, table_style.clone());
        cell_ctx.path.push(c);
        let mut meta = cell.meta.clone();
        if is_header {
            meta.classes.push("header".to_string());
        }
        let cell_style = b.resolve_style("table-cell", Some(&meta), &cell_ctx).without_indent();
        let pending = b.pending_bullet.take();
        let units = b.capture(|b| {
            b.emit_anchor_marker(&cell.meta, &cell_style);
            b.walk_children(&cell.children, &cell_ctx, cell_style.clone())
        })?;
        b.pending_bullet = pending;
        cells.push(CellUnit { column, span: cell.col_span, style: cell_style, units });
        column += cell.col_span;
    }
    // Short rows are padded with empty cells.
    while column < column_count {
        let mut cell_ctx = ctx.child(row_index, table_style.clone());
        cell_ctx.path.push(cells.len());
        let classes = if is_header { vec!["header".to_string()] } else { Vec::new() };
        let style = b.resolve_with_classes("table-cell", &classes, &cell_ctx.style).without_indent();
        cells.push(CellUnit { column, span: 1, style, units: Vec::new() });
        column += 1;
    }
    Ok(TableRowUnit { cells })
}

pub(crate) fn image(b: &mut FlowBuilder<'_>, node: &DocNode, ctx: &BuildContext) -> Result<(), StructuralError> {
    let DocNode::Image { meta, src, width, height } = node else {
        return Ok(());
    };
    let style = b.resolve_style("image", Some(meta), ctx);
    let unit = match b.images.decode(src) {
        Ok(decoded) => {
            let (natural_w, natural_h) = decoded.natural_size_pt(b.config.default_dpi);
            let (w, h) = scale_image(natural_w, natural_h, *width, *height);
            ImageUnit { src: src.clone(), width: w, height: h, data: decoded.data }
        }
        Err(err) => {
            b.warnings.push(
                LayoutWarning::ImageUnavailable { src: src.clone(), reason: err.to_string() }.logged(),
            );
            ImageUnit {
                src: src.clone(),
                width: width.unwrap_or(PLACEHOLDER_IMAGE_SIZE),
                height: height.or(*width).unwrap_or(PLACEHOLDER_IMAGE_SIZE),
                data: None,
            }
        }
    };
    b.emit(meta.id.clone(), style, FlowKind::Image(unit));
    Ok(())
}

/// Display size from the natural size and the requested dimensions,
/// keeping the aspect ratio when only one dimension is given.
fn scale_image(natural_w: f32, natural_h: f32, width: Option<f32>, height: Option<f32>) -> (f32, f32) {
    let ratio = if natural_w > 0.0 { natural_h / natural_w } else { 1.0 };
    match (width, height) {
        (Some(w), Some(h)) => (w, h),
        (Some(w), None) => (w, w * ratio),
        (None, Some(h)) if ratio > 0.0 => (h / ratio, h),
        (None, Some(h)) => (h, h),
        (None, None) => (natural_w, natural_h),
    }
}

pub(crate) fn footnote(b: &mut FlowBuilder<'_>, node: &DocNode, ctx: &BuildContext) -> Result<(), StructuralError> {
    let DocNode::Footnote { meta, children, .. } = node else {
        return Ok(());
    };
    let label = b.next_footnote_label();
    let id = b.anchor_or_generate(meta, "footnote");
    let mut note_ctx = ctx.clone();
    note_ctx.footnote = Some(id.clone());

    match b.config.footnote_mode {
        FootnoteMode::Page => {
            let style = b.resolve_style("footnote", Some(meta), ctx).without_indent();
            let pending = b.pending_bullet.replace(format!("[{}]", label));
            let units = b.capture(|b| b.walk_children(children, &note_ctx, style.clone()))?;
            b.pending_bullet = pending;
            b.declare_anchor(id.clone());
            b.footnotes.insert(Footnote { id: id.clone(), label, units });
            b.emit(None, style, FlowKind::FootnoteAnchor { note: id });
        }
        FootnoteMode::Inline => {
            let style = b.resolve_style("footnote", Some(meta), ctx);
            b.emit(
                Some(id),
                style.clone(),
                FlowKind::Bookmark { title: String::new(), level: 0, outline: false, template: None },
            );
            b.pending_bullet = Some(format!("[{}]", label));
            b.walk_children(children, &note_ctx, style)?;
            b.pending_bullet = None;
        }
    }
    Ok(())
}

pub(crate) fn contents(b: &mut FlowBuilder<'_>, node: &DocNode, ctx: &BuildContext) -> Result<(), StructuralError> {
    let DocNode::Contents { meta, title, depth } = node else {
        return Ok(());
    };
    let style = b.resolve_style("contents", Some(meta), ctx);
    let title = title.clone().unwrap_or_else(|| b.config.toc_title.clone());
    if !title.is_empty() {
        let heading_ctx = ctx.style.child(style.clone());
        let heading = b.resolve_with_classes("heading", &["h1".to_string(), "toc-title".to_string()], &heading_ctx);
        let spans = vec![TextSpan::text(title, heading.clone())];
        b.emit(None, heading, FlowKind::Paragraph(ParagraphUnit::new(spans)));
    }
    let unit = TocUnit { depth: depth.or(b.config.toc_depth), lines: Vec::new(), first_line: 0 };
    b.emit(meta.id.clone(), style, FlowKind::TocPlaceholder(unit));
    Ok(())
}

pub(crate) fn page_break(b: &mut FlowBuilder<'_>, node: &DocNode, ctx: &BuildContext) -> Result<(), StructuralError> {
    let DocNode::PageBreak { template } = node else {
        return Ok(());
    };
    b.emit(
        None,
        ctx.style.parent.clone(),
        FlowKind::PageBreak { template: template.as_deref().map(Arc::from), side: Default::default() },
    );
    Ok(())
}

pub(crate) fn column_break(b: &mut FlowBuilder<'_>, _node: &DocNode, ctx: &BuildContext) -> Result<(), StructuralError> {
    b.emit(None, ctx.style.parent.clone(), FlowKind::ColumnBreak);
    Ok(())
}

pub(crate) fn spacer(b: &mut FlowBuilder<'_>, node: &DocNode, ctx: &BuildContext) -> Result<(), StructuralError> {
    if let DocNode::Spacer { height } = node {
        b.emit(None, ctx.style.parent.clone(), FlowKind::Spacer { height: height.max(0.0) });
    }
    Ok(())
}

/// Fills every TOC placeholder from the finished bookmark list.
pub(crate) fn fill_contents(b: &mut FlowBuilder<'_>, units: &mut [FlowUnit]) {
    for unit in units.iter_mut() {
        match &mut unit.kind {
            FlowKind::TocPlaceholder(toc) => {
                let entries: Vec<TocEntry> = b
                    .bookmarks
                    .iter()
                    .filter(|e| toc.depth.is_none_or(|d| e.level <= d))
                    .cloned()
                    .collect();
                let ctx = StyleContext::root(unit.style.clone()).child(unit.style.clone());
                for entry in entries {
                    let classes = vec![format!("toc{}", entry.level)];
                    let style = b.resolve_with_classes("toc-entry", &classes, &ctx);
                    b.referenced.insert(entry.target.clone());
                    let indent = TOC_LEVEL_INDENT * f32::from(entry.level.saturating_sub(1));
                    toc.lines.push(TocLine { entry, style, indent });
                }
            }
            FlowKind::Table(table) => {
                for row in table.header.iter_mut().chain(table.rows.iter_mut()) {
                    for cell in row.cells.iter_mut() {
                        fill_contents(b, &mut cell.units);
                    }
                }
            }
            _ => {}
        }
    }
}
