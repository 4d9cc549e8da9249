use super::compose::{Composer, Slot};
use crate::elements::{LayoutElement, PositionedElement, TextElement};
use crate::flow::{FlowUnit, ParagraphUnit, TextSpan, TocLine, TocUnit};
use crate::text::ParagraphLayout;
use std::ops::Range;
use std::sync::Arc;

/// Room kept free right of an entry title for its page number.
const PAGE_COLUMN: f32 = 36.0;
/// Minimum gap around the leader dots.
const LEADER_GAP: f32 = 4.0;

impl Composer<'_> {
    fn toc_title_layout(&self, line: &TocLine, content_width: f32) -> ParagraphLayout {
        let width = (content_width - line.indent - PAGE_COLUMN).max(1.0);
        let para = ParagraphUnit::new(vec![TextSpan::text(line.entry.title.clone(), line.style.clone())]);
        self.wrapper.break_lines(&para, &line.style, width)
    }

    pub fn toc_line_height(&self, line: &TocLine, content_width: f32) -> f32 {
        let layout = self.toc_title_layout(line, content_width);
        layout.height().max(line.style.text.line_height) + line.style.box_model.margin.bottom
    }

    /// Draws `lines` of a contents listing: wrapped title, leader dots and the
    /// right-aligned page number, all linked to the entry's target.
    pub fn draw_toc(
        &self,
        unit: &FlowUnit,
        toc: &TocUnit,
        lines: Range<usize>,
        slot: Slot,
        y: f32,
        out: &mut Vec<PositionedElement>,
    ) -> f32 {
        let content_x = slot.x + unit.style.block_left();
        let content_width = unit.style.content_width(slot.width);
        let mut cursor = y;
        for line in &toc.lines[lines] {
            let href: Arc<str> = Arc::from(format!("#{}", line.entry.target));
            let layout = self.toc_title_layout(line, content_width);
            let text = |content: String, x: f32, y: f32, width: f32, height: f32, baseline: f32| PositionedElement {
                unit: Some(unit.id),
                x,
                y,
                width,
                height,
                element: LayoutElement::Text(TextElement {
                    content,
                    href: Some(href.clone()),
                    word_spacing: 0.0,
                    baseline,
                }),
                style: line.style.clone(),
            };

            let mut line_y = cursor;
            let mut last_end = content_x + line.indent;
            let mut last_height = line.style.text.line_height;
            let mut last_baseline = line.style.text.font_size * 0.8;
            for title_line in &layout.lines {
                for item in &title_line.items {
                    let x = content_x + line.indent + item.x;
                    out.push(text(item.text.clone(), x, line_y, item.width, title_line.height, title_line.baseline));
                    last_end = x + item.width;
                }
                last_height = title_line.height;
                last_baseline = title_line.baseline;
                line_y += title_line.height;
            }
            let last_y = line_y - last_height;

            let page = self.wrapper.page_text(&line.entry.target).into_owned();
            let page_width = self.wrapper.measure(&page, &line.style);
            let page_x = content_x + content_width - page_width;
            let dot_width = self.wrapper.measure(".", &line.style);
            let room = page_x - last_end - 2.0 * LEADER_GAP;
            if dot_width > 0.0 && room >= dot_width {
                let count = (room / dot_width).floor() as usize;
                let width = count as f32 * dot_width;
                out.push(text(".".repeat(count), page_x - LEADER_GAP - width, last_y, width, last_height, last_baseline));
            }
            out.push(text(page, page_x, last_y, page_width, last_height, last_baseline));

            cursor = line_y.max(cursor + line.style.text.line_height) + line.style.box_model.margin.bottom;
        }
        cursor - y
    }
}
