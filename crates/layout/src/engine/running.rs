use super::compose::Composer;
use crate::elements::{LayoutElement, PositionedElement, TextElement};
use crate::flow::{ParagraphUnit, TextSpan};
use crate::style::ComputedStyle;
use crate::template::RunningBlock;
use std::sync::Arc;

/// Values available to running header and footer text.
#[derive(Debug, Clone, Copy)]
pub(crate) struct RunningFields<'s> {
    pub page: usize,
    pub pages: Option<usize>,
    pub title: &'s str,
    pub section: &'s str,
    pub placeholder: &'s str,
}

pub(crate) fn substitute(text: &str, fields: &RunningFields<'_>) -> String {
    let pages = fields.pages.map_or_else(|| fields.placeholder.to_string(), |p| p.to_string());
    text.replace("{page}", &fields.page.to_string())
        .replace("{pages}", &pages)
        .replace("{title}", fields.title)
        .replace("{section}", fields.section)
}

impl Composer<'_> {
    /// Draws a running block inside its rectangle. Running text belongs to no
    /// flow unit.
    pub fn draw_running(
        &self,
        block: &RunningBlock,
        style: &Arc<ComputedStyle>,
        fields: &RunningFields<'_>,
        out: &mut Vec<PositionedElement>,
    ) {
        let text = substitute(&block.text, fields);
        if text.trim().is_empty() {
            return;
        }
        let para = ParagraphUnit::new(vec![TextSpan::text(text, style.clone())]);
        let layout = self.wrapper.break_lines(&para, style, block.rect.width);
        let mut y = block.rect.y;
        for line in &layout.lines {
            for item in &line.items {
                out.push(PositionedElement {
                    unit: None,
                    x: block.rect.x + item.x,
                    y,
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
            y += line.height;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fields_are_substituted() {
        let fields = RunningFields { page: 3, pages: None, title: "Manual", section: "Setup", placeholder: "?" };
        assert_eq!(substitute("{title}: {section} {page}/{pages}", &fields), "Manual: Setup 3/?");
        let fields = RunningFields { pages: Some(9), ..fields };
        assert_eq!(substitute("{page} of {pages}", &fields), "3 of 9");
    }
}
