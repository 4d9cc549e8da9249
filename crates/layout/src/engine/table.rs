use super::compose::{Composer, DrawLog, Slot};
use super::painting::background_and_borders;
use crate::elements::PositionedElement;
use crate::flow::{CellUnit, FlowUnit, TableRowUnit, TableUnit};
use folio_types::geometry::Rect;
use std::ops::Range;

/// Resolved column positions of a table in a given slot.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct TableGeometry {
    pub x: f32,
    pub offsets: Vec<f32>,
    pub widths: Vec<f32>,
}

impl TableGeometry {
    /// Splits `width` between columns in proportion to their weights.
    pub fn new(x: f32, width: f32, weights: &[f32]) -> Self {
        let total: f32 = weights.iter().map(|w| w.max(0.0)).sum();
        let count = weights.len().max(1) as f32;
        let widths: Vec<f32> = weights
            .iter()
            .map(|w| if total > 0.0 { width * w.max(0.0) / total } else { width / count })
            .collect();
        let mut offsets = Vec::with_capacity(widths.len());
        let mut at = 0.0;
        for w in &widths {
            offsets.push(at);
            at += w;
        }
        Self { x, offsets, widths }
    }

    pub fn cell_rect(&self, cell: &CellUnit, y: f32, height: f32) -> Rect {
        let first = cell.column.min(self.widths.len().saturating_sub(1));
        let last = (cell.column + cell.span.max(1)).min(self.widths.len());
        let width: f32 = self.widths.get(first..last).map_or(0.0, |w| w.iter().sum());
        let x = self.x + self.offsets.get(first).copied().unwrap_or(0.0);
        Rect::new(x, y, width, height)
    }
}

fn cell_inner_width(cell: &CellUnit, rect_width: f32) -> f32 {
    (rect_width - cell.style.padding_x() - cell.style.border_x()).max(0.0)
}

impl Composer<'_> {
    pub fn table_geometry(&self, unit: &FlowUnit, table: &TableUnit, slot_width: f32) -> TableGeometry {
        TableGeometry::new(unit.style.block_left(), unit.style.block_width(slot_width), &table.columns)
    }

    /// Header rows drawn in this part: always on the first part, and on
    /// continuations when headers repeat.
    pub fn header_rows<'t>(&self, table: &'t TableUnit) -> &'t [TableRowUnit] {
        if table.first_row == 0 || table.repeat_header { &table.header } else { &[] }
    }

    pub fn row_height(&mut self, row: &TableRowUnit, geometry: &TableGeometry) -> f32 {
        let mut height: f32 = 0.0;
        for cell in &row.cells {
            let rect = geometry.cell_rect(cell, 0.0, 0.0);
            let content = self.measure_units(&cell.units, cell_inner_width(cell, rect.width));
            height = height.max(content + cell.style.padding_y() + cell.style.border_y());
        }
        height
    }

    /// Draws the header rows followed by `rows` of the body at `y`.
    #[allow(clippy::too_many_arguments)]
    pub fn draw_table(
        &mut self,
        unit: &FlowUnit,
        table: &TableUnit,
        rows: Range<usize>,
        slot: Slot,
        y: f32,
        out: &mut Vec<PositionedElement>,
        log: &mut DrawLog,
    ) -> f32 {
        let mut geometry = self.table_geometry(unit, table, slot.width);
        geometry.x += slot.x;
        let mut cursor = y;
        let header = self.header_rows(table);
        for row in header.iter().chain(&table.rows[rows]) {
            let height = self.row_height(row, &geometry);
            for cell in &row.cells {
                let rect = geometry.cell_rect(cell, cursor, height);
                out.extend(background_and_borders(rect, &cell.style, true, true, Some(unit.id)));
                let inner = Slot {
                    x: rect.x + cell.style.border_left_width() + cell.style.box_model.padding.left,
                    width: cell_inner_width(cell, rect.width),
                };
                let top = cursor + cell.style.border_top_width() + cell.style.box_model.padding.top;
                self.draw_units(&cell.units, inner, top, out, log);
            }
            cursor += height;
        }
        cursor - y
    }
}
