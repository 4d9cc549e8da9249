//! The page/frame cursor and the placement loop.

use super::compose::{Composer, DrawLog, EPSILON, Slot, collapsed_space, top_extra};
use super::running::RunningFields;
use crate::config::LayoutConfig;
use crate::elements::{LaidOutPage, LayoutElement, LayoutPass, PositionedElement};
use crate::error::LayoutError;
use crate::flow::{BreakSide, FlowDocument, FlowKind, FlowUnit, ParagraphUnit, TableUnit, TocUnit, UnitId};
use crate::reference::{AnchorPosition, Placement, PlacementMap};
use crate::template::{PageTemplate, TemplateSet};
use crate::text::{split_spans, spans_len};
use crate::warnings::LayoutWarning;
use folio_types::geometry::Rect;
use folio_types::{AnchorId, Color};
use std::borrow::Cow;
use std::collections::{BTreeMap, HashMap, HashSet, VecDeque};

const RULE_THICKNESS: f32 = 0.5;

/// A zero-height unit waiting for the next placed unit's position.
struct Marker {
    id: UnitId,
    anchor: Option<AnchorId>,
    section: Option<String>,
}

/// How much of a unit goes into the current frame: paragraph lines, table
/// body rows or contents entries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct SplitPlan {
    leading: usize,
}

struct PageState<'a> {
    number: usize,
    template: &'a PageTemplate,
    elements: Vec<PositionedElement>,
    frame: usize,
    y: f32,
    frame_empty: bool,
    has_content: bool,
    /// Footnotes reserved at the bottom of each frame, with their heights.
    notes: Vec<Vec<(AnchorId, f32)>>,
    first_section: Option<String>,
    section_before: Option<String>,
}

impl<'a> PageState<'a> {
    fn new(number: usize, template: &'a PageTemplate, section_before: Option<String>) -> Self {
        Self {
            number,
            template,
            elements: Vec::new(),
            frame: 0,
            y: template.frames.first().map_or(0.0, |f| f.y),
            frame_empty: true,
            has_content: false,
            notes: vec![Vec::new(); template.frames.len()],
            first_section: None,
            section_before,
        }
    }

    fn frame_rect(&self) -> Rect {
        self.template.frames.get(self.frame).copied().unwrap_or_default()
    }

    fn reserved(&self, frame: usize, gap: f32) -> f32 {
        match self.notes.get(frame) {
            Some(notes) if !notes.is_empty() => gap + notes.iter().map(|(_, h)| h).sum::<f32>(),
            _ => 0.0,
        }
    }
}

pub(crate) struct Paginator<'a> {
    config: &'a LayoutConfig,
    doc: &'a FlowDocument,
    templates: &'a TemplateSet,
    composer: Composer<'a>,
    queue: VecDeque<Cow<'a, FlowUnit>>,
    page: PageState<'a>,
    pages: Vec<LaidOutPage>,
    prev_after: f32,
    markers: Vec<Marker>,
    /// Notes that did not fit next to their anchor, for the next page.
    carried: Vec<AnchorId>,
    last_section: Option<String>,
    /// Template picked by a section without a page break; used by the next
    /// page advance.
    pending_template: Option<&'a PageTemplate>,
    split_counts: HashMap<UnitId, u32>,
    overflowed: HashSet<UnitId>,
    placements: PlacementMap,
    anchors: BTreeMap<AnchorId, AnchorPosition>,
    warnings: Vec<LayoutWarning>,
}

impl<'a> Paginator<'a> {
    pub fn new(config: &'a LayoutConfig, doc: &'a FlowDocument, templates: &'a TemplateSet, composer: Composer<'a>) -> Self {
        Self {
            config,
            doc,
            templates,
            composer,
            queue: doc.units.iter().map(Cow::Borrowed).collect(),
            page: PageState::new(1, templates.first_template(), None),
            pages: Vec::new(),
            prev_after: 0.0,
            markers: Vec::new(),
            carried: Vec::new(),
            last_section: None,
            pending_template: None,
            split_counts: HashMap::new(),
            overflowed: HashSet::new(),
            placements: PlacementMap::new(),
            anchors: BTreeMap::new(),
            warnings: Vec::new(),
        }
    }

    pub fn run(mut self) -> Result<LayoutPass, LayoutError> {
        while let Some(unit) = self.queue.pop_front() {
            self.process(unit)?;
        }
        let y = self.page.y;
        self.flush_markers(y);
        if !self.carried.is_empty() {
            self.new_page(None)?;
        }
        let last = std::mem::replace(&mut self.page, PageState::new(0, self.templates.default_template(), None));
        self.finish(last)?;

        Ok(LayoutPass {
            pages: self.pages,
            placements: self.placements,
            anchors: self.anchors,
            warnings: self.warnings,
        })
    }

    fn process(&mut self, unit: Cow<'a, FlowUnit>) -> Result<(), LayoutError> {
        if matches!(
            unit.kind,
            FlowKind::Paragraph(_) | FlowKind::Image(_) | FlowKind::Table(_) | FlowKind::TocPlaceholder(_)
        ) {
            return self.place_block(unit);
        }
        match &unit.kind {
            FlowKind::Bookmark { title, outline, template, .. } => {
                if let Some(name) = template {
                    self.pending_template = Some(self.templates.lookup(name)?);
                }
                self.markers.push(Marker {
                    id: unit.id,
                    anchor: unit.anchor.clone(),
                    section: outline.then(|| title.clone()),
                });
            }
            FlowKind::FootnoteAnchor { note } => {
                let y = self.page.y;
                self.record(unit.id, unit.anchor.clone(), y);
                self.reserve_note(note.clone())?;
            }
            FlowKind::PageBreak { template, side } => self.page_break(template.as_deref(), *side)?,
            FlowKind::ColumnBreak => {
                if !self.page.frame_empty {
                    self.advance_frame()?;
                }
            }
            FlowKind::Spacer { height } => {
                // Dropped at a frame top.
                if !self.page.frame_empty {
                    if *height <= self.remaining() + EPSILON {
                        self.page.y += height;
                        self.prev_after = 0.0;
                    } else {
                        self.advance_frame()?;
                    }
                }
            }
            _ => {}
        }
        Ok(())
    }

    // --- Geometry ---

    fn slot(&self) -> Slot {
        let frame = self.page.frame_rect();
        Slot { x: frame.x, width: frame.width }
    }

    fn frame_bottom(&self) -> f32 {
        self.page.frame_rect().bottom() - self.page.reserved(self.page.frame, self.config.footnote_gap)
    }

    fn remaining(&self) -> f32 {
        (self.frame_bottom() - self.page.y).max(0.0)
    }

    fn empty_frame_height(&self) -> f32 {
        (self.frame_bottom() - self.page.frame_rect().y).max(0.0)
    }

    // --- Frame and page advance ---

    fn advance_frame(&mut self) -> Result<(), LayoutError> {
        if self.page.frame + 1 < self.page.template.frames.len() {
            self.page.frame += 1;
            self.page.y = self.page.frame_rect().y;
            self.page.frame_empty = true;
            self.prev_after = 0.0;
            log::debug!("page {}: frame {}", self.page.number, self.page.frame);
            Ok(())
        } else {
            self.new_page(None)
        }
    }

    /// Finishes the current page and starts the next one with `template`, else
    /// the pending section template, else the current template's successor.
    fn new_page(&mut self, template: Option<&'a PageTemplate>) -> Result<(), LayoutError> {
        let template = template
            .or_else(|| self.pending_template.take())
            .unwrap_or_else(|| self.templates.next_after(self.page.template));
        let next = PageState::new(self.page.number + 1, template, self.last_section.clone());
        let done = std::mem::replace(&mut self.page, next);
        self.finish(done)?;
        self.prev_after = 0.0;
        log::debug!("page {} uses template '{}'", self.page.number, template.name);
        self.reserve_carried()
    }

    fn page_break(&mut self, template: Option<&str>, side: BreakSide) -> Result<(), LayoutError> {
        let template = match template {
            Some(name) => Some(self.templates.lookup(name)?),
            None => None,
        };
        if template.is_some() {
            self.pending_template = None;
        }
        if self.page.has_content {
            self.new_page(template)?;
        } else if let Some(template) = template {
            self.switch_template(template)?;
        }
        // A page of the wrong parity is left blank.
        if !side.accepts(self.page.number) {
            self.new_page(template)?;
        }
        Ok(())
    }

    /// Re-templates the current, still empty page.
    fn switch_template(&mut self, template: &'a PageTemplate) -> Result<(), LayoutError> {
        let notes: Vec<AnchorId> = self.page.notes.drain(..).flatten().map(|(id, _)| id).collect();
        self.page.template = template;
        self.page.frame = 0;
        self.page.y = self.page.frame_rect().y;
        self.page.frame_empty = true;
        self.page.notes = vec![Vec::new(); template.frames.len()];
        let width = self.page.frame_rect().width;
        for id in notes {
            let height = self.note_height(&id, width)?;
            if let Some(frame_notes) = self.page.notes.first_mut() {
                frame_notes.push((id, height));
            }
        }
        Ok(())
    }

    // --- Footnotes ---

    fn note_height(&mut self, id: &AnchorId, width: f32) -> Result<f32, LayoutError> {
        let note = self.doc.footnotes.get(id).ok_or_else(|| LayoutError::MissingFootnote(id.clone()))?;
        Ok(self.composer.measure_units(&note.units, width))
    }

    /// Reserves room for a note at the bottom of the current frame, or
    /// carries it to the next page when it does not fit below the cursor.
    fn reserve_note(&mut self, id: AnchorId) -> Result<(), LayoutError> {
        let frame = self.page.frame;
        let width = self.page.frame_rect().width;
        let height = self.note_height(&id, width)?;
        let gap = if self.page.notes.get(frame).is_some_and(|n| n.is_empty()) { self.config.footnote_gap } else { 0.0 };
        if self.page.y + height + gap <= self.frame_bottom() + EPSILON {
            if let Some(notes) = self.page.notes.get_mut(frame) {
                notes.push((id, height));
            }
        } else {
            let warning = LayoutWarning::FootnoteSeparated {
                note: id.clone(),
                anchor_page: self.page.number,
                note_page: self.page.number + 1,
            };
            self.warnings.push(warning.logged());
            self.carried.push(id);
        }
        Ok(())
    }

    fn reserve_carried(&mut self) -> Result<(), LayoutError> {
        let width = self.page.frame_rect().width;
        for id in std::mem::take(&mut self.carried) {
            let height = self.note_height(&id, width)?;
            if let Some(notes) = self.page.notes.first_mut() {
                notes.push((id, height));
            }
        }
        Ok(())
    }

    // --- Recording ---

    fn record(&mut self, id: UnitId, anchor: Option<AnchorId>, y: f32) {
        let page = self.page.number;
        self.placements.entry(id).or_insert_with(|| Placement {
            page,
            frame: self.page.frame,
            y,
            template: self.page.template.name.clone(),
        });
        if let Some(anchor) = anchor {
            self.anchors.entry(anchor).or_insert(AnchorPosition { page, y });
        }
    }

    fn flush_markers(&mut self, y: f32) {
        for marker in std::mem::take(&mut self.markers) {
            self.record(marker.id, marker.anchor, y);
            if let Some(title) = marker.section {
                if self.page.first_section.is_none() {
                    self.page.first_section = Some(title.clone());
                }
                self.last_section = Some(title);
            }
        }
    }

    fn absorb(&mut self, log: DrawLog) -> Result<(), LayoutError> {
        for (id, anchor, y) in log.placed {
            self.record(id, anchor, y);
        }
        for note in log.notes {
            self.reserve_note(note)?;
        }
        Ok(())
    }

    // --- Blocks ---

    fn place_block(&mut self, unit: Cow<'a, FlowUnit>) -> Result<(), LayoutError> {
        loop {
            let slot = self.slot();
            let before = if self.page.frame_empty { 0.0 } else { collapsed_space(&unit.style, self.prev_after) };
            let available = self.remaining() - before;
            let full = self.composer.measure(&unit, slot.width);

            if full <= available + EPSILON {
                if !self.page.frame_empty && unit.style.pagination.keep_with_next {
                    let follow = self.following_min_height(&unit, slot.width);
                    if full + follow > available + EPSILON {
                        self.advance_frame()?;
                        continue;
                    }
                }
                self.page.y += before;
                return self.draw_whole(&unit);
            }

            if self.page.frame_empty && self.overflowed.insert(unit.id) {
                let warning = LayoutWarning::LayoutOverflow {
                    unit: unit.id,
                    page: self.page.number,
                    height: full,
                    available: self.empty_frame_height(),
                };
                self.warnings.push(warning.logged());
            }

            match self.plan_split(&unit, available) {
                Some(plan) => {
                    if self.page.frame_empty {
                        let retries = self.split_counts.entry(unit.id).or_insert(0);
                        *retries += 1;
                        if *retries > self.config.max_split_retries {
                            let warning = LayoutWarning::SplitRetryLimit {
                                unit: unit.id,
                                page: self.page.number,
                                retries: self.config.max_split_retries,
                            };
                            self.warnings.push(warning.logged());
                            return self.draw_whole(&unit);
                        }
                    }
                    self.page.y += before;
                    let rest = self.draw_leading(&unit, plan)?;
                    self.queue.push_front(Cow::Owned(rest));
                    return self.advance_frame();
                }
                // Indivisible and taller than an empty frame: placed overflowing.
                None if self.page.frame_empty => return self.draw_whole(&unit),
                None => self.advance_frame()?,
            }
        }
    }

    /// Smallest height the next content unit needs to start in this frame.
    fn following_min_height(&mut self, unit: &FlowUnit, width: f32) -> f32 {
        let Some(next) = self.queue.iter().find(|u| !u.is_marker()) else {
            return 0.0;
        };
        let space = collapsed_space(&next.style, unit.style.box_model.margin.bottom);
        match &next.kind {
            FlowKind::Paragraph(para) => {
                let layout = self.composer.paragraph_layout(next, para, width);
                let first_line = layout.lines.first().map_or(0.0, |l| l.height);
                space + top_extra(&next.style, para.offset == 0) + first_line
            }
            FlowKind::Table(table) => {
                let geometry = self.composer.table_geometry(next, table, width);
                let header: f32 = table.header.iter().map(|r| self.composer.row_height(r, &geometry)).sum();
                let first = table.rows.first().map_or(0.0, |r| self.composer.row_height(r, &geometry));
                space + header + first
            }
            FlowKind::TocPlaceholder(toc) => {
                let content = next.style.content_width(width);
                space + toc.lines.first().map_or(0.0, |l| self.composer.toc_line_height(l, content))
            }
            FlowKind::Image(_) => space + self.composer.measure(next, width),
            _ => 0.0,
        }
    }

    /// Decides how much of `unit` fits into `available` points, if any part of it should go here.
    fn plan_split(&mut self, unit: &FlowUnit, available: f32) -> Option<SplitPlan> {
        let width = self.slot().width;
        let frame_empty = self.page.frame_empty;
        let (count, mut fitting) = match &unit.kind {
            FlowKind::Paragraph(para) => {
                let layout = self.composer.paragraph_layout(unit, para, width);
                let room = available - top_extra(&unit.style, para.offset == 0);
                let n = layout.lines.len();
                let mut k = layout.lines_fitting(room.max(0.0)).min(n.saturating_sub(1));
                let widows = unit.style.misc.widows.max(1);
                let orphans = unit.style.misc.orphans.max(1);
                if n - k < widows {
                    k = n.saturating_sub(widows);
                }
                if k < orphans {
                    k = 0;
                }
                (n, k)
            }
            FlowKind::Table(table) if table.splittable => {
                let geometry = self.composer.table_geometry(unit, table, width);
                let header: f32 = self.composer.header_rows(table).iter().map(|r| self.composer.row_height(r, &geometry)).sum();
                let mut used = header;
                let mut k = 0;
                for row in &table.rows {
                    let h = self.composer.row_height(row, &geometry);
                    if used + h > available + EPSILON {
                        break;
                    }
                    used += h;
                    k += 1;
                }
                (table.rows.len(), k)
            }
            FlowKind::TocPlaceholder(toc) => {
                let content = unit.style.content_width(width);
                let mut used = 0.0;
                let mut k = 0;
                for line in &toc.lines {
                    let h = self.composer.toc_line_height(line, content);
                    if used + h > available + EPSILON {
                        break;
                    }
                    used += h;
                    k += 1;
                }
                (toc.lines.len(), k)
            }
            _ => return None,
        };
        if fitting == 0 && frame_empty {
            fitting = 1;
        }
        (fitting > 0 && fitting < count).then_some(SplitPlan { leading: fitting })
    }

    fn draw_whole(&mut self, unit: &FlowUnit) -> Result<(), LayoutError> {
        let y = self.page.y;
        self.flush_markers(y);
        self.record(unit.id, unit.anchor.clone(), y);
        let slot = self.slot();
        let mut log = DrawLog::default();
        let height = self.composer.draw_whole(unit, slot, y, &mut self.page.elements, &mut log);
        self.placed(unit, height);
        self.absorb(log)
    }

    /// Draws the leading part of `unit` and returns the remainder.
    fn draw_leading(&mut self, unit: &FlowUnit, plan: SplitPlan) -> Result<FlowUnit, LayoutError> {
        let count = plan.leading;
        let y = self.page.y;
        let slot = self.slot();
        self.flush_markers(y);
        self.record(unit.id, unit.anchor.clone(), y);
        let mut log = DrawLog::default();

        let (height, rest) = match &unit.kind {
            FlowKind::Paragraph(para) => {
                let layout = self.composer.paragraph_layout(unit, para, slot.width);
                let height = self.composer.draw_paragraph(unit, para, &layout, 0..count, slot, y, &mut self.page.elements);
                let end = layout.lines[count - 1].end;
                let (_, spans) = split_spans(&para.spans, end);
                let consumed = spans_len(&para.spans) - spans_len(&spans);
                let rest = ParagraphUnit {
                    spans,
                    bullet: None,
                    offset: para.offset + consumed,
                    preserve_whitespace: para.preserve_whitespace,
                };
                (height, FlowKind::Paragraph(rest))
            }
            FlowKind::Table(table) => {
                let height = self.composer.draw_table(unit, table, 0..count, slot, y, &mut self.page.elements, &mut log);
                let rest = TableUnit {
                    rows: table.rows[count..].to_vec(),
                    first_row: table.first_row + count,
                    ..table.clone()
                };
                (height, FlowKind::Table(rest))
            }
            FlowKind::TocPlaceholder(toc) => {
                let height = self.composer.draw_toc(unit, toc, 0..count, slot, y, &mut self.page.elements);
                let rest = TocUnit {
                    depth: toc.depth,
                    lines: toc.lines[count..].to_vec(),
                    first_line: toc.first_line + count,
                };
                (height, FlowKind::TocPlaceholder(rest))
            }
            other => {
                return Err(LayoutError::Generic(format!("{} units cannot be split", other.name())));
            }
        };
        log::debug!("unit {} split on page {} after {} pieces", unit.id, self.page.number, count);
        self.placed(unit, height);
        self.absorb(log)?;
        Ok(unit.remainder(rest))
    }

    fn placed(&mut self, unit: &FlowUnit, height: f32) {
        self.page.y += height;
        self.prev_after = unit.style.box_model.margin.bottom;
        self.page.frame_empty = false;
        self.page.has_content = true;
    }

    // --- Page finalization ---

    fn finish(&mut self, page: PageState<'a>) -> Result<(), LayoutError> {
        let PageState { number, template, mut elements, notes: frame_notes, first_section, section_before, .. } = page;
        let gap = self.config.footnote_gap;
        let mut footnotes = Vec::new();

        for (index, notes) in frame_notes.iter().enumerate() {
            if notes.is_empty() {
                continue;
            }
            let frame = template.frames.get(index).copied().unwrap_or_default();
            let reserved: f32 = gap + notes.iter().map(|(_, h)| h).sum::<f32>();
            let top = frame.bottom() - reserved;
            elements.push(PositionedElement {
                element: LayoutElement::Rule { thickness: RULE_THICKNESS, color: Color::BLACK },
                ..PositionedElement::from_rect(Rect::new(frame.x, top + gap / 2.0, frame.width / 3.0, RULE_THICKNESS))
            });
            let slot = Slot { x: frame.x, width: frame.width };
            let mut y = top + gap;
            for (id, height) in notes {
                let note = self.doc.footnotes.get(id).ok_or_else(|| LayoutError::MissingFootnote(id.clone()))?;
                self.anchors.entry(id.clone()).or_insert(AnchorPosition { page: number, y });
                let mut log = DrawLog::default();
                self.composer.draw_units(&note.units, slot, y, &mut elements, &mut log);
                for (unit, anchor, at) in log.placed {
                    self.placements.entry(unit).or_insert_with(|| Placement {
                        page: number,
                        frame: index,
                        y: at,
                        template: template.name.clone(),
                    });
                    if let Some(anchor) = anchor {
                        self.anchors.entry(anchor).or_insert(AnchorPosition { page: number, y: at });
                    }
                }
                if !log.notes.is_empty() {
                    log::debug!("footnote '{}' refers to further notes; they are not reserved", id);
                }
                y += height;
                footnotes.push(id.clone());
            }
        }

        let placeholder = self.composer.wrapper.placeholder();
        let title = self.doc.title.as_deref().or(self.config.title.as_deref()).unwrap_or("");
        let section = first_section.or(section_before).unwrap_or_default();
        let fields = RunningFields {
            page: number,
            pages: self.composer.wrapper.references().total_pages(),
            title,
            section: &section,
            placeholder,
        };
        if let Some(header) = &template.header {
            self.composer.draw_running(header, &self.doc.header_style, &fields, &mut elements);
        }
        if let Some(footer) = &template.footer {
            self.composer.draw_running(footer, &self.doc.footer_style, &fields, &mut elements);
        }

        log::debug!("page {} finished with {} elements", number, elements.len());
        self.pages.push(LaidOutPage {
            number,
            template: template.name.clone(),
            size: template.dimensions(),
            elements,
            footnotes,
        });
        Ok(())
    }
}
