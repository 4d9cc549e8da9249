use crate::elements::{LayoutElement, PositionedElement, RectElement};
use crate::flow::UnitId;
use crate::style::ComputedStyle;
use folio_style::border::Border;
use folio_types::geometry::Rect;
use std::sync::Arc;

/// Background and border rectangles for a block occupying `bounds`.
///
/// A fragment continued from or on another frame leaves out the top or
/// bottom edge (`draw_top`/`draw_bottom`). Borders are drawn as filled
/// rectangles so their corners join without gaps.
pub(crate) fn background_and_borders(
    bounds: Rect,
    style: &Arc<ComputedStyle>,
    draw_top: bool,
    draw_bottom: bool,
    unit: Option<UnitId>,
) -> Vec<PositionedElement> {
    let mut elements = Vec::new();
    if bounds.height <= 0.0 || bounds.width <= 0.0 {
        return elements;
    }

    let border_top = if draw_top { style.border_top_width() } else { 0.0 };
    let border_bottom = if draw_bottom { style.border_bottom_width() } else { 0.0 };
    let border_left = style.border_left_width();
    let border_right = style.border_right_width();

    let mut push = |rect: Rect, fill: &folio_types::Color| {
        elements.push(PositionedElement {
            unit,
            element: LayoutElement::Rectangle(RectElement { fill: Some(fill.clone()), stroke: None }),
            style: style.clone(),
            ..PositionedElement::from_rect(rect)
        });
    };

    // Background sits inside the borders.
    if let Some(bg) = &style.misc.background_color {
        push(bounds.inset(border_top, border_right, border_bottom, border_left), bg);
    }

    let mut draw_border = |b: &Option<Border>, rect: Rect| {
        if let Some(border) = b {
            if border.effective_width() > 0.0 && rect.width > 0.0 && rect.height > 0.0 {
                push(rect, &border.color);
            }
        }
    };

    if draw_top {
        draw_border(&style.border.top, Rect::new(bounds.x, bounds.y, bounds.width, border_top));
    }
    if draw_bottom {
        draw_border(
            &style.border.bottom,
            Rect::new(bounds.x, bounds.bottom() - border_bottom, bounds.width, border_bottom),
        );
    }
    draw_border(&style.border.left, Rect::new(bounds.x, bounds.y, border_left, bounds.height));
    draw_border(
        &style.border.right,
        Rect::new(bounds.right() - border_right, bounds.y, border_right, bounds.height),
    );

    elements
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::style::ComputedStyleData;
    use folio_types::Color;

    #[test]
    fn continued_fragment_skips_top_edge() {
        let mut data = ComputedStyleData::default();
        let border = Some(Border::solid(2.0, Color::BLACK));
        data.border.top = border.clone();
        data.border.bottom = border.clone();
        data.border.left = border.clone();
        data.misc.background_color = Some(Color::gray(200));
        let style = Arc::new(ComputedStyle::new(data));

        let bounds = Rect::new(10.0, 10.0, 100.0, 50.0);
        let full = background_and_borders(bounds, &style, true, true, None);
        assert_eq!(full.len(), 4);
        let bg = &full[0];
        assert_eq!((bg.y, bg.height), (12.0, 46.0));

        let continued = background_and_borders(bounds, &style, false, true, None);
        assert_eq!(continued.len(), 3);
        assert_eq!(continued[0].y, 10.0);
    }
}
