//! Style records and the rule sheet that maps node kinds and classes to them.

use crate::border::Border;
use crate::dimension::{deserialize_opt_length, Margins};
use crate::font::{FontStyle, FontWeight};
use crate::list::ListStyleType;
use crate::text::{TextAlign, TextDecoration};
use folio_types::Color;
use serde::{Deserialize, Serialize};

/// A set of attribute overrides. `None` means "not set here".
#[derive(Deserialize, Serialize, Default, Clone, PartialEq, Debug)]
#[serde(rename_all = "camelCase")]
pub struct ElementStyle {
    // Font & Text
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub font_family: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none", deserialize_with = "deserialize_opt_length")]
    pub font_size: Option<f32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub font_weight: Option<FontWeight>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub font_style: Option<FontStyle>,
    /// Absolute leading in points.
    #[serde(default, skip_serializing_if = "Option::is_none", deserialize_with = "deserialize_opt_length")]
    pub line_height: Option<f32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text_align: Option<TextAlign>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<Color>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text_decoration: Option<TextDecoration>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub widows: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub orphans: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none", deserialize_with = "deserialize_opt_length")]
    pub first_line_indent: Option<f32>,

    // Box Model
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub background_color: Option<Color>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub border: Option<Border>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub border_top: Option<Border>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub border_right: Option<Border>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub border_bottom: Option<Border>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub border_left: Option<Border>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub margin: Option<Margins>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub padding: Option<Margins>,

    // Lists
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub list_style_type: Option<ListStyleType>,

    // Pagination
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub keep_with_next: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub page_break_before: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub page_template: Option<String>,
}

impl ElementStyle {
    pub fn is_empty(&self) -> bool {
        *self == ElementStyle::default()
    }

    /// Copies every property set in `to_apply` over the properties of `self`.
    pub fn merge(&mut self, to_apply: &ElementStyle) {
        if to_apply.font_family.is_some() { self.font_family = to_apply.font_family.clone(); }
        if to_apply.font_size.is_some() { self.font_size = to_apply.font_size; }
        if to_apply.font_weight.is_some() { self.font_weight = to_apply.font_weight; }
        if to_apply.font_style.is_some() { self.font_style = to_apply.font_style; }
        if to_apply.line_height.is_some() { self.line_height = to_apply.line_height; }
        if to_apply.text_align.is_some() { self.text_align = to_apply.text_align; }
        if to_apply.color.is_some() { self.color = to_apply.color.clone(); }
        if to_apply.text_decoration.is_some() { self.text_decoration = to_apply.text_decoration; }
        if to_apply.widows.is_some() { self.widows = to_apply.widows; }
        if to_apply.orphans.is_some() { self.orphans = to_apply.orphans; }
        if to_apply.first_line_indent.is_some() { self.first_line_indent = to_apply.first_line_indent; }
        if to_apply.background_color.is_some() { self.background_color = to_apply.background_color.clone(); }
        if to_apply.border.is_some() { self.border = to_apply.border.clone(); }
        if to_apply.border_top.is_some() { self.border_top = to_apply.border_top.clone(); }
        if to_apply.border_right.is_some() { self.border_right = to_apply.border_right.clone(); }
        if to_apply.border_bottom.is_some() { self.border_bottom = to_apply.border_bottom.clone(); }
        if to_apply.border_left.is_some() { self.border_left = to_apply.border_left.clone(); }
        if to_apply.margin.is_some() { self.margin = to_apply.margin.clone(); }
        if to_apply.padding.is_some() { self.padding = to_apply.padding.clone(); }
        if to_apply.list_style_type.is_some() { self.list_style_type = to_apply.list_style_type; }
        if to_apply.keep_with_next.is_some() { self.keep_with_next = to_apply.keep_with_next; }
        if to_apply.page_break_before.is_some() { self.page_break_before = to_apply.page_break_before; }
        if to_apply.page_template.is_some() { self.page_template = to_apply.page_template.clone(); }
    }
}

/// Matches nodes by kind, by class, by both, or (both absent) everything.
#[derive(Deserialize, Serialize, Default, Clone, PartialEq, Eq, Debug)]
pub struct Selector {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub class: Option<String>,
}

impl Selector {
    pub fn kind(kind: impl Into<String>) -> Self {
        Self { kind: Some(kind.into()), class: None }
    }

    pub fn class(class: impl Into<String>) -> Self {
        Self { kind: None, class: Some(class.into()) }
    }

    pub fn kind_and_class(kind: impl Into<String>, class: impl Into<String>) -> Self {
        Self { kind: Some(kind.into()), class: Some(class.into()) }
    }

    pub fn matches(&self, kind: &str, classes: &[String]) -> bool {
        self.kind.as_deref().is_none_or(|k| k == kind)
            && self
                .class
                .as_deref()
                .is_none_or(|c| classes.iter().any(|cls| cls == c))
    }

    /// kind+class > class > kind > universal.
    pub fn specificity(&self) -> u8 {
        match (&self.kind, &self.class) {
            (Some(_), Some(_)) => 3,
            (None, Some(_)) => 2,
            (Some(_), None) => 1,
            (None, None) => 0,
        }
    }
}

#[derive(Deserialize, Serialize, Clone, PartialEq, Debug)]
pub struct StyleRule {
    #[serde(flatten)]
    pub selector: Selector,
    pub style: ElementStyle,
}

#[derive(Deserialize, Serialize, Default, Clone, PartialEq, Debug)]
pub struct StyleSheet {
    /// Applied to the document root; everything else inherits from it.
    #[serde(default)]
    pub default: ElementStyle,
    #[serde(default)]
    pub rules: Vec<StyleRule>,
}

impl StyleSheet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    pub fn with_rule(mut self, selector: Selector, style: ElementStyle) -> Self {
        self.rules.push(StyleRule { selector, style });
        self
    }

    /// Appends `other` after this sheet's rules, so `other` wins ties.
    pub fn extend(&mut self, other: StyleSheet) {
        self.default.merge(&other.default);
        self.rules.extend(other.rules);
    }

    /// Rules matching a node, ordered so that applying them in sequence gives
    /// the most specific (and among equals, the latest declared) the last word.
    pub fn matching(&self, kind: &str, classes: &[String]) -> Vec<&ElementStyle> {
        let mut matched: Vec<(u8, usize, &ElementStyle)> = self
            .rules
            .iter()
            .enumerate()
            .filter(|(_, rule)| rule.selector.matches(kind, classes))
            .map(|(idx, rule)| (rule.selector.specificity(), idx, &rule.style))
            .collect();
        matched.sort_by_key(|(spec, idx, _)| (*spec, *idx));
        matched.into_iter().map(|(_, _, style)| style).collect()
    }

    /// A default sheet: Helvetica body text, bold headings h1..h6, inline roles,
    /// monospaced literal blocks, small footnotes, TOC levels, ruled table cells
    /// and small centered running headers and footers.
    pub fn standard() -> Self {
        let heading = |size: f32| ElementStyle {
            font_size: Some(size),
            line_height: Some(size * 1.2),
            ..Default::default()
        };
        let mut sheet = StyleSheet {
            default: ElementStyle {
                font_family: Some("Helvetica".to_string()),
                font_size: Some(10.0),
                line_height: Some(12.0),
                color: Some(Color::BLACK),
                ..Default::default()
            },
            rules: Vec::new(),
        };
        sheet = sheet
            .with_rule(
                Selector::kind("paragraph"),
                ElementStyle { margin: Some(Margins::default().with_bottom(6.0)), ..Default::default() },
            )
            .with_rule(
                Selector::kind("heading"),
                ElementStyle {
                    font_weight: Some(FontWeight::Bold),
                    keep_with_next: Some(true),
                    margin: Some(Margins { top: 12.0, right: 0.0, bottom: 6.0, left: 0.0 }),
                    ..Default::default()
                },
            )
            .with_rule(Selector::class("h1"), heading(18.0))
            .with_rule(Selector::class("h2"), heading(16.0))
            .with_rule(Selector::class("h3"), heading(14.0))
            .with_rule(Selector::class("h4"), heading(12.0))
            .with_rule(Selector::class("h5"), heading(11.0))
            .with_rule(Selector::class("h6"), heading(10.0))
            .with_rule(
                Selector::class("title"),
                ElementStyle {
                    font_size: Some(24.0),
                    line_height: Some(28.8),
                    text_align: Some(TextAlign::Center),
                    ..Default::default()
                },
            )
            .with_rule(
                Selector::kind("literal-block"),
                ElementStyle {
                    font_family: Some("Courier".to_string()),
                    font_size: Some(9.0),
                    line_height: Some(11.0),
                    background_color: Some(Color::gray(240)),
                    padding: Some(Margins::all(4.0)),
                    margin: Some(Margins::default().with_bottom(6.0)),
                    ..Default::default()
                },
            )
            .with_rule(
                Selector::kind("literal"),
                ElementStyle { font_family: Some("Courier".to_string()), ..Default::default() },
            )
            .with_rule(
                Selector::kind("emphasis"),
                ElementStyle { font_style: Some(FontStyle::Italic), ..Default::default() },
            )
            .with_rule(
                Selector::kind("strong"),
                ElementStyle { font_weight: Some(FontWeight::Bold), ..Default::default() },
            )
            .with_rule(
                Selector::kind("link"),
                ElementStyle { color: Some(Color::rgb(0, 0, 204)), ..Default::default() },
            )
            .with_rule(
                Selector::kind("footnote-reference"),
                ElementStyle { color: Some(Color::rgb(0, 0, 204)), ..Default::default() },
            )
            .with_rule(
                Selector::kind("footnote"),
                ElementStyle {
                    font_size: Some(8.0),
                    line_height: Some(10.0),
                    margin: Some(Margins { top: 0.0, right: 0.0, bottom: 2.0, left: 18.0 }),
                    ..Default::default()
                },
            )
            .with_rule(
                Selector::kind("list"),
                ElementStyle {
                    margin: Some(Margins { top: 0.0, right: 0.0, bottom: 6.0, left: 18.0 }),
                    ..Default::default()
                },
            )
            .with_rule(
                Selector::kind("list-item"),
                ElementStyle { margin: Some(Margins::default().with_bottom(3.0)), ..Default::default() },
            )
            .with_rule(
                Selector::kind("toc-entry"),
                ElementStyle { margin: Some(Margins::default().with_bottom(2.0)), ..Default::default() },
            )
            .with_rule(
                Selector::class("toc1"),
                ElementStyle { font_weight: Some(FontWeight::Bold), ..Default::default() },
            )
            .with_rule(
                Selector::kind("table"),
                ElementStyle { margin: Some(Margins::default().with_bottom(6.0)), ..Default::default() },
            )
            .with_rule(
                Selector::kind("table-cell"),
                ElementStyle {
                    padding: Some(Margins::all(3.0)),
                    border: Some(Border::solid(0.5, Color::gray(136))),
                    ..Default::default()
                },
            )
            .with_rule(
                Selector::kind_and_class("table-cell", "header"),
                ElementStyle {
                    font_weight: Some(FontWeight::Bold),
                    background_color: Some(Color::gray(230)),
                    ..Default::default()
                },
            );
        for running in ["header", "footer"] {
            sheet = sheet.with_rule(
                Selector::kind(running),
                ElementStyle {
                    font_size: Some(8.0),
                    line_height: Some(10.0),
                    text_align: Some(TextAlign::Center),
                    color: Some(Color::gray(96)),
                    ..Default::default()
                },
            );
        }
        sheet
    }
}
