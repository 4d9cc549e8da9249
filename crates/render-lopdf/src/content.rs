//! Content stream operators for one page.

use crate::encoding::to_win_ansi;
use crate::error::RenderError;
use crate::resources::ResourceRegistry;
use folio_layout::{ComputedStyle, ImageElement, LayoutElement, PositionedElement, RectElement, TextElement};
use folio_style::text::TextDecoration;
use folio_types::Color;
use lopdf::content::{Content, Operation};
use lopdf::{Object, StringFormat};

/// Stroke width of the frame drawn for images without samples.
const PLACEHOLDER_STROKE: f32 = 0.5;

#[derive(Default, Clone, PartialEq)]
struct RenderState {
    font_name: String,
    font_size: f32,
    fill_color: Option<Color>,
    word_spacing: f32,
}

/// Draws positioned elements into a content stream. Layout coordinates grow
/// downward from the top-left corner; PDF user space grows upward from the
/// bottom-left, so every y is flipped against the page height.
pub(crate) struct PageCanvas<'a> {
    page_height: f32,
    content: Content,
    state: RenderState,
    resources: &'a ResourceRegistry,
}

impl<'a> PageCanvas<'a> {
    pub fn new(page_height: f32, resources: &'a ResourceRegistry) -> Self {
        Self { page_height, content: Content { operations: vec![] }, state: RenderState::default(), resources }
    }

    pub fn finish(self) -> Content {
        self.content
    }

    fn op(&mut self, operator: &str, operands: Vec<Object>) {
        self.content.operations.push(Operation::new(operator, operands));
    }

    pub fn draw_element(&mut self, el: &PositionedElement) -> Result<(), RenderError> {
        match &el.element {
            LayoutElement::Text(text) => self.draw_text(text, el),
            LayoutElement::Rectangle(rect) => {
                self.draw_rect(rect, el);
                Ok(())
            }
            LayoutElement::Rule { thickness, color } => {
                self.fill_rect(el.x, el.y, el.width, *thickness, color);
                Ok(())
            }
            LayoutElement::Image(image) => self.draw_image(image, el),
        }
    }

    fn set_fill_color(&mut self, color: &Color) {
        if self.state.fill_color.as_ref() != Some(color) {
            let (r, g, b) = color.unit_rgb();
            self.op("rg", vec![r.into(), g.into(), b.into()]);
            self.state.fill_color = Some(color.clone());
        }
    }

    fn fill_rect(&mut self, x: f32, y: f32, width: f32, height: f32, color: &Color) {
        self.set_fill_color(color);
        self.op("re", vec![x.into(), (self.page_height - y - height).into(), width.into(), height.into()]);
        self.op("f", vec![]);
    }

    fn draw_rect(&mut self, rect: &RectElement, el: &PositionedElement) {
        if let Some(fill) = &rect.fill {
            self.fill_rect(el.x, el.y, el.width, el.height, fill);
        }
        if let Some((width, color)) = &rect.stroke {
            self.stroke_rect(el, *width, color);
        }
    }

    fn stroke_rect(&mut self, el: &PositionedElement, width: f32, color: &Color) {
        let (r, g, b) = color.unit_rgb();
        self.op("w", vec![width.into()]);
        self.op("RG", vec![r.into(), g.into(), b.into()]);
        self.op("re", vec![el.x.into(), (self.page_height - el.y - el.height).into(), el.width.into(), el.height.into()]);
        self.op("S", vec![]);
    }

    fn set_font(&mut self, style: &ComputedStyle) -> Result<(), RenderError> {
        let base_font = style.font_spec().base_font();
        let name = self
            .resources
            .font_name(base_font)
            .ok_or_else(|| RenderError::EmissionInternalError(format!("font '{}' was not registered", base_font)))?
            .to_string();
        let size = style.text.font_size;
        if self.state.font_name != name || self.state.font_size != size {
            self.op("Tf", vec![Object::Name(name.as_bytes().to_vec()), size.into()]);
            self.state.font_name = name;
            self.state.font_size = size;
        }
        Ok(())
    }

    fn draw_text(&mut self, text: &TextElement, el: &PositionedElement) -> Result<(), RenderError> {
        if text.content.trim().is_empty() {
            return Ok(());
        }
        let style = &el.style;
        let baseline_y = self.page_height - (el.y + text.baseline);

        self.op("BT", vec![]);
        // Font state is only valid inside BT/ET.
        self.state.font_name.clear();
        self.set_font(style)?;
        self.set_fill_color(&style.text.color);
        if self.state.word_spacing != text.word_spacing {
            self.op("Tw", vec![text.word_spacing.into()]);
            self.state.word_spacing = text.word_spacing;
        }
        self.op("Td", vec![el.x.into(), baseline_y.into()]);
        self.op("Tj", vec![Object::String(to_win_ansi(&text.content), StringFormat::Literal)]);
        self.op("ET", vec![]);

        let size = style.text.font_size;
        let thickness = (size / 18.0).max(0.5);
        let color = style.text.color.clone();
        match style.text.text_decoration {
            TextDecoration::Underline => {
                self.fill_rect(el.x, el.y + text.baseline + size * 0.1, el.width, thickness, &color);
            }
            TextDecoration::LineThrough => {
                self.fill_rect(el.x, el.y + text.baseline - size * 0.3, el.width, thickness, &color);
            }
            TextDecoration::None => {}
        }
        Ok(())
    }

    fn draw_image(&mut self, image: &ImageElement, el: &PositionedElement) -> Result<(), RenderError> {
        match self.resources.image_name(&image.src) {
            Some(name) if image.data.is_some() => {
                let name = name.as_bytes().to_vec();
                let bottom = self.page_height - el.y - el.height;
                self.op("q", vec![]);
                self.op(
                    "cm",
                    vec![el.width.into(), 0.into(), 0.into(), el.height.into(), el.x.into(), bottom.into()],
                );
                self.op("Do", vec![Object::Name(name)]);
                self.op("Q", vec![]);
            }
            _ => {
                log::debug!("Drawing a frame for image '{}' without samples", image.src);
                self.stroke_rect(el, PLACEHOLDER_STROKE, &Color::gray(128));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use folio_layout::LaidOutPage;
    use std::sync::Arc;

    fn page_with(elements: Vec<PositionedElement>) -> LaidOutPage {
        LaidOutPage { number: 1, template: Arc::from("t"), size: (200.0, 100.0), elements, footnotes: vec![] }
    }

    fn text(content: &str, word_spacing: f32) -> PositionedElement {
        PositionedElement {
            element: LayoutElement::Text(TextElement {
                content: content.to_string(),
                href: None,
                word_spacing,
                baseline: 11.0,
            }),
            ..PositionedElement::from_rect(folio_types::Rect::new(10.0, 20.0, 50.0, 14.4))
        }
    }

    fn operators(content: &Content) -> Vec<&str> {
        content.operations.iter().map(|o| o.operator.as_str()).collect()
    }

    #[test]
    fn text_baseline_is_flipped() {
        let page = page_with(vec![text("Hi", 0.0)]);
        let registry = ResourceRegistry::collect(std::slice::from_ref(&page));
        let mut canvas = PageCanvas::new(100.0, &registry);
        canvas.draw_element(&page.elements[0]).unwrap();
        let content = canvas.finish();

        assert_eq!(operators(&content), vec!["BT", "Tf", "rg", "Td", "Tj", "ET"]);
        let td = &content.operations[3];
        assert_eq!(td.operands[1].as_float().unwrap(), 100.0 - 31.0);
    }

    #[test]
    fn word_spacing_is_set_once_per_change() {
        let page = page_with(vec![text("a b", 2.0), text("c d", 2.0), text("e", 0.0)]);
        let registry = ResourceRegistry::collect(std::slice::from_ref(&page));
        let mut canvas = PageCanvas::new(100.0, &registry);
        for el in &page.elements {
            canvas.draw_element(el).unwrap();
        }
        let content = canvas.finish();
        assert_eq!(operators(&content).iter().filter(|o| **o == "Tw").count(), 2);
    }

    #[test]
    fn image_without_samples_draws_a_frame() {
        let el = PositionedElement {
            element: LayoutElement::Image(ImageElement { src: "x.png".to_string(), data: None }),
            ..PositionedElement::from_rect(folio_types::Rect::new(0.0, 0.0, 20.0, 20.0))
        };
        let page = page_with(vec![el]);
        let registry = ResourceRegistry::collect(std::slice::from_ref(&page));
        let mut canvas = PageCanvas::new(100.0, &registry);
        canvas.draw_element(&page.elements[0]).unwrap();
        assert_eq!(operators(&canvas.finish()), vec!["w", "RG", "re", "S"]);
    }
}
