//! Measuring and drawing of single units, independent of pagination.

use super::painting::background_and_borders;
use crate::cache::{MeasureCache, MeasureKey};
use crate::elements::{ImageElement, LayoutElement, PositionedElement, TextElement};
use crate::flow::{FlowKind, FlowUnit, ImageUnit, ParagraphUnit, UnitId};
use crate::style::ComputedStyle;
use crate::text::{ParagraphLayout, TextWrapper};
use folio_style::text::TextAlign;
use folio_types::geometry::Rect;
use folio_types::AnchorId;
use std::ops::Range;
use std::sync::Arc;

pub(crate) const EPSILON: f32 = 0.01;

/// Gap between a hanging label and the text it labels.
const BULLET_GAP: f32 = 6.0;

/// What drawing nested content left behind for the paginator to record.
#[derive(Debug, Default)]
pub(crate) struct DrawLog {
    /// First fragments: unit, its anchor, top y.
    pub placed: Vec<(UnitId, Option<AnchorId>, f32)>,
    /// Footnote anchors met inside nested content.
    pub notes: Vec<AnchorId>,
}

impl DrawLog {
    pub fn place(&mut self, unit: &FlowUnit, y: f32) {
        if unit.part == 0 {
            self.placed.push((unit.id, unit.anchor.clone(), y));
        }
    }
}

/// A horizontal slot to draw into: left edge and width of the frame or cell.
#[derive(Debug, Clone, Copy)]
pub(crate) struct Slot {
    pub x: f32,
    pub width: f32,
}

pub(crate) struct Composer<'a> {
    pub wrapper: TextWrapper<'a>,
    pub cache: &'a mut MeasureCache,
}

/// Vertical box extras of a block fragment.
pub(crate) fn top_extra(style: &ComputedStyle, first: bool) -> f32 {
    if first { style.border_top_width() + style.box_model.padding.top } else { 0.0 }
}

pub(crate) fn bottom_extra(style: &ComputedStyle, last: bool) -> f32 {
    if last { style.border_bottom_width() + style.box_model.padding.bottom } else { 0.0 }
}

/// Space before `next` when it follows a block with `prev_after` space after.
pub(crate) fn collapsed_space(next: &ComputedStyle, prev_after: f32) -> f32 {
    (next.box_model.margin.top - prev_after).max(0.0)
}

impl<'a> Composer<'a> {
    pub fn new(wrapper: TextWrapper<'a>, cache: &'a mut MeasureCache) -> Self {
        Self { wrapper, cache }
    }

    pub fn paragraph_layout(&mut self, unit: &FlowUnit, para: &ParagraphUnit, slot_width: f32) -> Arc<ParagraphLayout> {
        let width = unit.style.content_width(slot_width);
        let key = MeasureKey::new(unit.id, para.offset, width);
        if let Some(layout) = self.cache.get(&key) {
            return layout;
        }
        let layout = Arc::new(self.wrapper.break_lines(para, &unit.style, width));
        self.cache.insert(key, layout.clone());
        layout
    }

    /// Height of a paragraph fragment holding `lines` of `layout`.
    pub fn paragraph_height(style: &ComputedStyle, layout: &ParagraphLayout, lines: Range<usize>, first: bool) -> f32 {
        let last = lines.end >= layout.lines.len();
        let content: f32 = layout.lines[lines].iter().map(|l| l.height).sum();
        top_extra(style, first) + content + bottom_extra(style, last)
    }

    /// Draws `lines` of a paragraph with the block's top edge at `y`.
    /// Returns the height used.
    #[allow(clippy::too_many_arguments)]
    pub fn draw_paragraph(
        &self,
        unit: &FlowUnit,
        para: &ParagraphUnit,
        layout: &ParagraphLayout,
        lines: Range<usize>,
        slot: Slot,
        y: f32,
        out: &mut Vec<PositionedElement>,
    ) -> f32 {
        let style = &unit.style;
        let first = para.offset == 0 && lines.start == 0;
        let last = lines.end >= layout.lines.len();
        let height = Self::paragraph_height(style, layout, lines.clone(), first);

        let block_x = slot.x + style.block_left();
        let block_width = style.block_width(slot.width);
        if style.has_decoration() {
            out.extend(background_and_borders(
                Rect::new(block_x, y, block_width, height),
                style,
                first,
                last,
                Some(unit.id),
            ));
        }

        let content_x = block_x + style.border_left_width() + style.box_model.padding.left;
        let mut line_y = y + top_extra(style, first);

        if first {
            if let (Some(bullet), Some(line)) = (&para.bullet, layout.lines.first()) {
                let width = self.wrapper.measure(bullet, style);
                out.push(PositionedElement {
                    unit: Some(unit.id),
                    x: content_x - width - BULLET_GAP,
                    y: line_y,
                    width,
                    height: line.height,
                    element: LayoutElement::Text(TextElement {
                        content: bullet.clone(),
                        href: None,
                        word_spacing: 0.0,
                        baseline: line.baseline,
                    }),
                    style: style.clone(),
                });
            }
        }

        for line in &layout.lines[lines] {
            for item in &line.items {
                out.push(PositionedElement {
                    unit: Some(unit.id),
                    x: content_x + item.x,
                    y: line_y,
                    width: item.width,
                    height: line.height,
                    element: LayoutElement::Text(TextElement {
                        content: item.text.clone(),
                        href: item.href.clone(),
                        word_spacing: line.word_spacing,
                        baseline: line.baseline,
                    }),
                    style: item.style.clone(),
                });
            }
            line_y += line.height;
        }
        height
    }

    /// Drawn size of an image: its natural size, scaled down to fit the content width.
    pub fn image_size(style: &ComputedStyle, image: &ImageUnit, slot_width: f32) -> (f32, f32) {
        let available = style.content_width(slot_width);
        if image.width > available && image.width > 0.0 {
            let scale = available / image.width;
            (available, image.height * scale)
        } else {
            (image.width, image.height)
        }
    }

    pub fn draw_image(unit: &FlowUnit, image: &ImageUnit, slot: Slot, y: f32, out: &mut Vec<PositionedElement>) -> f32 {
        let style = &unit.style;
        let (width, height) = Self::image_size(style, image, slot.width);
        let content_x = slot.x + style.block_left() + style.border_left_width() + style.box_model.padding.left;
        let free = (style.content_width(slot.width) - width).max(0.0);
        let x = match style.text.text_align {
            TextAlign::Center => content_x + free / 2.0,
            TextAlign::Right => content_x + free,
            _ => content_x,
        };
        out.push(PositionedElement {
            unit: Some(unit.id),
            x,
            y,
            width,
            height,
            element: LayoutElement::Image(ImageElement { src: image.src.clone(), data: image.data.clone() }),
            style: style.clone(),
        });
        height
    }

    /// Height of a whole unit, unsplit, in a slot of `slot_width`.
    pub fn measure(&mut self, unit: &FlowUnit, slot_width: f32) -> f32 {
        match &unit.kind {
            FlowKind::Paragraph(para) => {
                let layout = self.paragraph_layout(unit, para, slot_width);
                Self::paragraph_height(&unit.style, &layout, 0..layout.lines.len(), para.offset == 0)
            }
            FlowKind::Image(image) => Self::image_size(&unit.style, image, slot_width).1,
            FlowKind::Table(table) => {
                let geometry = self.table_geometry(unit, table, slot_width);
                let header = self.header_rows(table);
                header.iter().chain(&table.rows).map(|row| self.row_height(row, &geometry)).sum()
            }
            FlowKind::TocPlaceholder(toc) => {
                let width = unit.style.content_width(slot_width);
                toc.lines.iter().map(|line| self.toc_line_height(line, width)).sum()
            }
            FlowKind::Spacer { height } => *height,
            _ => 0.0,
        }
    }

    /// Height of a stack of units laid out top to bottom without breaks.
    pub fn measure_units(&mut self, units: &[FlowUnit], slot_width: f32) -> f32 {
        let mut height = 0.0;
        let mut prev_after = None;
        for unit in units {
            if unit.is_marker() {
                continue;
            }
            if let FlowKind::Spacer { height: h } = unit.kind {
                height += h;
                prev_after = Some(0.0);
                continue;
            }
            let h = self.measure(unit, slot_width);
            if let Some(after) = prev_after {
                height += collapsed_space(&unit.style, after);
            }
            height += h;
            prev_after = Some(unit.style.box_model.margin.bottom);
        }
        height
    }

    /// Draws a stack of units starting at `y`; returns the height used.
    pub fn draw_units(
        &mut self,
        units: &[FlowUnit],
        slot: Slot,
        y: f32,
        out: &mut Vec<PositionedElement>,
        log: &mut DrawLog,
    ) -> f32 {
        let mut cursor = y;
        let mut prev_after = None;
        for unit in units {
            match &unit.kind {
                FlowKind::Bookmark { .. } => {
                    log.place(unit, cursor);
                    continue;
                }
                FlowKind::FootnoteAnchor { note } => {
                    log.place(unit, cursor);
                    log.notes.push(note.clone());
                    continue;
                }
                FlowKind::Spacer { height } => {
                    cursor += height;
                    prev_after = Some(0.0);
                    continue;
                }
                FlowKind::PageBreak { .. } | FlowKind::ColumnBreak => continue,
                _ => {}
            }
            if let Some(after) = prev_after {
                cursor += collapsed_space(&unit.style, after);
            }
            log.place(unit, cursor);
            cursor += self.draw_whole(unit, slot, cursor, out, log);
            prev_after = Some(unit.style.box_model.margin.bottom);
        }
        cursor - y
    }

    /// Draws a content unit in full at `y`.
    pub fn draw_whole(
        &mut self,
        unit: &FlowUnit,
        slot: Slot,
        y: f32,
        out: &mut Vec<PositionedElement>,
        log: &mut DrawLog,
    ) -> f32 {
        match &unit.kind {
            FlowKind::Paragraph(para) => {
                let layout = self.paragraph_layout(unit, para, slot.width);
                self.draw_paragraph(unit, para, &layout, 0..layout.lines.len(), slot, y, out)
            }
            FlowKind::Image(image) => Self::draw_image(unit, image, slot, y, out),
            FlowKind::Table(table) => {
                let count = table.rows.len();
                self.draw_table(unit, table, 0..count, slot, y, out, log)
            }
            FlowKind::TocPlaceholder(toc) => self.draw_toc(unit, toc, 0..toc.lines.len(), slot, y, out),
            FlowKind::Spacer { height } => *height,
            _ => 0.0,
        }
    }
}
