//! Text measurement collaborator.
//!
//! The layout engine never computes glyph metrics itself; it asks a
//! [`TextMeasurer`] for the advance width of a run of text. [`StandardMetrics`]
//! covers the PDF standard Type1 faces the renderer emits.

use folio_style::font::{FontStyle, FontWeight};
use std::fmt::Debug;
use std::sync::Arc;

/// Identifies a face: family + weight + style.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FontSpec {
    pub family: Arc<str>,
    pub weight: FontWeight,
    pub style: FontStyle,
}

impl FontSpec {
    pub fn new(family: impl Into<Arc<str>>, weight: FontWeight, style: FontStyle) -> Self {
        Self { family: family.into(), weight, style }
    }

    pub fn regular(family: impl Into<Arc<str>>) -> Self {
        Self::new(family, FontWeight::Regular, FontStyle::Normal)
    }
}

/// The three standard families every PDF reader provides.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum StandardFamily {
    Helvetica,
    Times,
    Courier,
}

impl StandardFamily {
    /// Maps a requested family onto a standard one. Unknown families fall back to Helvetica.
    pub fn resolve(family: &str) -> Self {
        let lower = family.to_ascii_lowercase();
        if lower.starts_with("times") || lower == "serif" {
            StandardFamily::Times
        } else if lower.starts_with("courier") || lower == "monospace" || lower == "mono" {
            StandardFamily::Courier
        } else {
            StandardFamily::Helvetica
        }
    }

    /// PostScript name of the face for the given weight and style.
    pub fn base_font(&self, bold: bool, italic: bool) -> &'static str {
        match (self, bold, italic) {
            (StandardFamily::Helvetica, false, false) => "Helvetica",
            (StandardFamily::Helvetica, true, false) => "Helvetica-Bold",
            (StandardFamily::Helvetica, false, true) => "Helvetica-Oblique",
            (StandardFamily::Helvetica, true, true) => "Helvetica-BoldOblique",
            (StandardFamily::Times, false, false) => "Times-Roman",
            (StandardFamily::Times, true, false) => "Times-Bold",
            (StandardFamily::Times, false, true) => "Times-Italic",
            (StandardFamily::Times, true, true) => "Times-BoldItalic",
            (StandardFamily::Courier, false, false) => "Courier",
            (StandardFamily::Courier, true, false) => "Courier-Bold",
            (StandardFamily::Courier, false, true) => "Courier-Oblique",
            (StandardFamily::Courier, true, true) => "Courier-BoldOblique",
        }
    }
}

impl FontSpec {
    pub fn standard_family(&self) -> StandardFamily {
        StandardFamily::resolve(&self.family)
    }

    pub fn base_font(&self) -> &'static str {
        self.standard_family()
            .base_font(self.weight.is_bold(), self.style.is_slanted())
    }
}

/// Measures the advance width of text. Implementations must be pure: the same
/// input always yields the same width, otherwise layout is not reproducible.
pub trait TextMeasurer: Send + Sync + Debug {
    /// Width in points of `text` set in `font` at `size` points.
    fn measure(&self, text: &str, font: &FontSpec, size: f32) -> f32;

    /// Returns a human-readable name for this measurer (for logging/debugging).
    fn name(&self) -> &'static str;
}

// AFM advance widths (1/1000 em) for ASCII 32..=126.
#[rustfmt::skip]
const HELVETICA: [u16; 95] = [
    278, 278, 355, 556, 556, 889, 667, 191, 333, 333, 389, 584, 278, 333, 278, 278,
    556, 556, 556, 556, 556, 556, 556, 556, 556, 556,
    278, 278, 584, 584, 584, 556, 1015,
    667, 667, 722, 722, 667, 611, 778, 722, 278, 500, 667, 556, 833,
    722, 778, 667, 778, 722, 667, 611, 722, 667, 944, 667, 667, 611,
    278, 278, 278, 469, 556, 333,
    556, 556, 500, 556, 556, 278, 556, 556, 222, 222, 500, 222, 833,
    556, 556, 556, 556, 333, 500, 278, 556, 500, 722, 500, 500, 500,
    334, 260, 334, 584,
];

#[rustfmt::skip]
const HELVETICA_BOLD: [u16; 95] = [
    278, 333, 474, 556, 556, 889, 722, 238, 333, 333, 389, 584, 278, 333, 278, 278,
    556, 556, 556, 556, 556, 556, 556, 556, 556, 556,
    333, 333, 584, 584, 584, 611, 975,
    722, 722, 722, 722, 667, 611, 778, 722, 278, 556, 722, 611, 833,
    722, 778, 667, 778, 722, 667, 611, 722, 667, 944, 667, 667, 611,
    333, 278, 333, 584, 556, 333,
    556, 611, 556, 611, 556, 333, 611, 611, 278, 278, 556, 278, 889,
    611, 611, 611, 611, 389, 556, 333, 611, 556, 778, 556, 556, 500,
    389, 280, 389, 584,
];

#[rustfmt::skip]
const TIMES_ROMAN: [u16; 95] = [
    250, 333, 408, 500, 500, 833, 778, 180, 333, 333, 500, 564, 250, 333, 250, 278,
    500, 500, 500, 500, 500, 500, 500, 500, 500, 500,
    278, 278, 564, 564, 564, 444, 921,
    722, 667, 667, 722, 611, 556, 722, 722, 333, 389, 722, 611, 889,
    722, 722, 556, 722, 667, 556, 611, 722, 722, 944, 722, 722, 611,
    333, 278, 333, 469, 500, 333,
    444, 500, 444, 500, 444, 333, 500, 500, 278, 278, 500, 278, 778,
    500, 500, 500, 500, 333, 389, 278, 500, 500, 722, 500, 500, 444,
    480, 200, 480, 541,
];

/// Metrics for the standard Type1 faces. Italic faces share the upright
/// widths; Times bold shares the roman widths.
#[derive(Debug, Default, Clone, Copy)]
pub struct StandardMetrics;

impl StandardMetrics {
    pub fn new() -> Self {
        Self
    }

    fn char_width(table: &[u16; 95], c: char) -> u16 {
        match c {
            ' '..='~' => table[c as usize - 32],
            '\u{a0}' => table[0],
            '\u{2022}' => 350,
            '\u{2013}' => 556,
            '\u{2014}' => 1000,
            '\u{2018}' | '\u{2019}' => 222,
            '\u{201c}' | '\u{201d}' => 333,
            '\u{2026}' => 1000,
            _ => table[('n' as usize) - 32],
        }
    }
}

impl TextMeasurer for StandardMetrics {
    fn measure(&self, text: &str, font: &FontSpec, size: f32) -> f32 {
        let units: u32 = match font.standard_family() {
            StandardFamily::Courier => text.chars().count() as u32 * 600,
            StandardFamily::Times => text.chars().map(|c| Self::char_width(&TIMES_ROMAN, c) as u32).sum(),
            StandardFamily::Helvetica => {
                let table = if font.weight.is_bold() { &HELVETICA_BOLD } else { &HELVETICA };
                text.chars().map(|c| Self::char_width(table, c) as u32).sum()
            }
        };
        units as f32 * size / 1000.0
    }

    fn name(&self) -> &'static str {
        "StandardMetrics"
    }
}

/// Every character has the same advance: `advance_em * size`. Handy for tests
/// where widths must be predictable.
#[derive(Debug, Clone, Copy)]
pub struct FixedWidthMeasurer {
    pub advance_em: f32,
}

impl FixedWidthMeasurer {
    pub fn new(advance_em: f32) -> Self {
        Self { advance_em }
    }
}

impl Default for FixedWidthMeasurer {
    fn default() -> Self {
        Self::new(0.5)
    }
}

impl TextMeasurer for FixedWidthMeasurer {
    fn measure(&self, text: &str, _font: &FontSpec, size: f32) -> f32 {
        text.chars().count() as f32 * self.advance_em * size
    }

    fn name(&self) -> &'static str {
        "FixedWidthMeasurer"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn helvetica_widths() {
        let m = StandardMetrics::new();
        let font = FontSpec::regular("Helvetica");
        // H=722 e=556 l=222 l=222 o=556
        let w = m.measure("Hello", &font, 10.0);
        assert!((w - 22.78).abs() < 0.001);
        let bold = FontSpec::new("Helvetica", FontWeight::Bold, FontStyle::Normal);
        assert!(m.measure("Hello", &bold, 10.0) > w);
    }

    #[test]
    fn courier_is_monospaced() {
        let m = StandardMetrics::new();
        let font = FontSpec::regular("Courier");
        assert_eq!(m.measure("iiii", &font, 10.0), m.measure("MMMM", &font, 10.0));
        assert_eq!(m.measure("ab", &font, 10.0), 12.0);
    }

    #[test]
    fn family_resolution() {
        assert_eq!(StandardFamily::resolve("Times New Roman"), StandardFamily::Times);
        assert_eq!(StandardFamily::resolve("monospace"), StandardFamily::Courier);
        assert_eq!(StandardFamily::resolve("DejaVu Sans"), StandardFamily::Helvetica);
        let spec = FontSpec::new("Times", FontWeight::Bold, FontStyle::Italic);
        assert_eq!(spec.base_font(), "Times-BoldItalic");
        let spec = FontSpec::new("Courier", FontWeight::Regular, FontStyle::Oblique);
        assert_eq!(spec.base_font(), "Courier-Oblique");
    }

    #[test]
    fn fixed_width() {
        let m = FixedWidthMeasurer::new(0.5);
        assert_eq!(m.measure("abcd", &FontSpec::regular("x"), 10.0), 20.0);
        assert_eq!(m.measure("", &FontSpec::regular("x"), 10.0), 0.0);
    }
}
