//! Intermediate Document Format (IDF)
//! The in-memory representation of a parsed document tree: the input of the
//! page compiler. The core only ever reads it.

use folio_style::dimension::deserialize_opt_length;
use folio_style::stylesheet::ElementStyle;
use folio_types::AnchorId;
use serde::{Deserialize, Serialize};

/// Common metadata carried by every block-level node.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct NodeMetadata {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<AnchorId>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub classes: Vec<String>,
    /// Inline attribute overrides; these beat every style-sheet rule.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub style: Option<ElementStyle>,
    /// Line in the source markup, when the parser knows it.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub line: Option<u32>,
}

impl NodeMetadata {
    pub fn with_id(id: impl Into<AnchorId>) -> Self {
        Self { id: Some(id.into()), ..Default::default() }
    }

    pub fn with_class(mut self, class: impl Into<String>) -> Self {
        self.classes.push(class.into());
        self
    }
}

/// A block-level element of the document tree.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum DocNode {
    Document {
        #[serde(default)]
        meta: NodeMetadata,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        title: Option<String>,
        #[serde(default)]
        children: Vec<DocNode>,
    },
    Section {
        #[serde(default)]
        meta: NodeMetadata,
        title: Vec<InlineNode>,
        #[serde(default)]
        children: Vec<DocNode>,
    },
    Paragraph {
        #[serde(default)]
        meta: NodeMetadata,
        children: Vec<InlineNode>,
    },
    /// Preformatted text; line breaks are kept.
    LiteralBlock {
        #[serde(default)]
        meta: NodeMetadata,
        text: String,
    },
    /// A generic container (block quote, admonition, topic...).
    Block {
        #[serde(default)]
        meta: NodeMetadata,
        #[serde(default)]
        children: Vec<DocNode>,
    },
    List {
        #[serde(default)]
        meta: NodeMetadata,
        #[serde(default)]
        ordered: bool,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        start: Option<usize>,
        items: Vec<DocNode>,
    },
    ListItem {
        #[serde(default)]
        meta: NodeMetadata,
        #[serde(default)]
        children: Vec<DocNode>,
    },
    Table {
        #[serde(default)]
        meta: NodeMetadata,
        columns: Vec<ColumnSpec>,
        #[serde(default, skip_serializing_if = "Vec::is_empty")]
        header: Vec<TableRow>,
        #[serde(default)]
        rows: Vec<TableRow>,
    },
    Image {
        #[serde(default)]
        meta: NodeMetadata,
        src: String,
        /// Display width in points; derived from the pixel size when absent.
        #[serde(default, skip_serializing_if = "Option::is_none", deserialize_with = "deserialize_opt_length")]
        width: Option<f32>,
        #[serde(default, skip_serializing_if = "Option::is_none", deserialize_with = "deserialize_opt_length")]
        height: Option<f32>,
    },
    Footnote {
        #[serde(default)]
        meta: NodeMetadata,
        /// Explicit label; auto-numbered in document order when absent.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        label: Option<String>,
        #[serde(default)]
        children: Vec<DocNode>,
    },
    /// Table of contents.
    Contents {
        #[serde(default)]
        meta: NodeMetadata,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        title: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        depth: Option<u8>,
    },
    PageBreak {
        /// Template for the page that follows.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        template: Option<String>,
    },
    ColumnBreak,
    Spacer {
        #[serde(deserialize_with = "deserialize_length")]
        height: f32,
    },
}

fn deserialize_length<'de, D>(deserializer: D) -> Result<f32, D::Error>
where
    D: serde::Deserializer<'de>,
{
    folio_style::dimension::Length::deserialize(deserializer).map(|l| l.0)
}

impl DocNode {
    pub fn meta(&self) -> Option<&NodeMetadata> {
        match self {
            DocNode::Document { meta, .. }
            | DocNode::Section { meta, .. }
            | DocNode::Paragraph { meta, .. }
            | DocNode::LiteralBlock { meta, .. }
            | DocNode::Block { meta, .. }
            | DocNode::List { meta, .. }
            | DocNode::ListItem { meta, .. }
            | DocNode::Table { meta, .. }
            | DocNode::Image { meta, .. }
            | DocNode::Footnote { meta, .. }
            | DocNode::Contents { meta, .. } => Some(meta),
            DocNode::PageBreak { .. } | DocNode::ColumnBreak | DocNode::Spacer { .. } => None,
        }
    }

    pub fn id(&self) -> Option<&AnchorId> {
        self.meta().and_then(|m| m.id.as_ref())
    }

    /// Kind name as used by style-sheet selectors.
    pub fn kind(&self) -> &'static str {
        match self {
            DocNode::Document { .. } => "document",
            DocNode::Section { .. } => "section",
            DocNode::Paragraph { .. } => "paragraph",
            DocNode::LiteralBlock { .. } => "literal-block",
            DocNode::Block { .. } => "block",
            DocNode::List { .. } => "list",
            DocNode::ListItem { .. } => "list-item",
            DocNode::Table { .. } => "table",
            DocNode::Image { .. } => "image",
            DocNode::Footnote { .. } => "footnote",
            DocNode::Contents { .. } => "contents",
            DocNode::PageBreak { .. } => "page-break",
            DocNode::ColumnBreak => "column-break",
            DocNode::Spacer { .. } => "spacer",
        }
    }

    /// Block children in document order. Table cells are not included.
    pub fn children(&self) -> &[DocNode] {
        match self {
            DocNode::Document { children, .. }
            | DocNode::Section { children, .. }
            | DocNode::Block { children, .. }
            | DocNode::ListItem { children, .. }
            | DocNode::Footnote { children, .. } => children,
            DocNode::List { items, .. } => items,
            _ => &[],
        }
    }

    pub fn document(children: Vec<DocNode>) -> Self {
        DocNode::Document { meta: NodeMetadata::default(), title: None, children }
    }

    pub fn section(id: &str, title: &str, children: Vec<DocNode>) -> Self {
        DocNode::Section {
            meta: NodeMetadata::with_id(id),
            title: vec![InlineNode::text(title)],
            children,
        }
    }

    pub fn paragraph(text: &str) -> Self {
        DocNode::Paragraph { meta: NodeMetadata::default(), children: vec![InlineNode::text(text)] }
    }
}

/// Inline content of paragraphs and titles.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum InlineNode {
    Text {
        text: String,
    },
    /// A span with a role such as `emphasis`, `strong` or `literal`.
    Styled {
        role: String,
        #[serde(default, skip_serializing_if = "Vec::is_empty")]
        classes: Vec<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        style: Option<ElementStyle>,
        #[serde(default)]
        children: Vec<InlineNode>,
    },
    /// `href` starting with `#` targets an anchor in this document.
    Link {
        href: String,
        #[serde(default)]
        children: Vec<InlineNode>,
    },
    /// Renders the page number the target lands on.
    PageReference {
        target: AnchorId,
    },
    FootnoteReference {
        target: AnchorId,
    },
    LineBreak,
}

impl InlineNode {
    pub fn text(text: impl Into<String>) -> Self {
        InlineNode::Text { text: text.into() }
    }

    pub fn styled(role: &str, children: Vec<InlineNode>) -> Self {
        InlineNode::Styled { role: role.to_string(), classes: Vec::new(), style: None, children }
    }

    /// Flattens inline content to its text, as used for bookmark and TOC titles.
    pub fn plain_text(nodes: &[InlineNode]) -> String {
        let mut out = String::new();
        for node in nodes {
            match node {
                InlineNode::Text { text } => out.push_str(text),
                InlineNode::Styled { children, .. } | InlineNode::Link { children, .. } => {
                    out.push_str(&Self::plain_text(children))
                }
                InlineNode::LineBreak => out.push(' '),
                InlineNode::PageReference { .. } | InlineNode::FootnoteReference { .. } => {}
            }
        }
        out
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ColumnSpec {
    /// Relative weight; columns without one share equally.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub width: Option<f32>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct TableRow {
    pub cells: Vec<TableCell>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TableCell {
    #[serde(default)]
    pub meta: NodeMetadata,
    #[serde(default = "default_span")]
    pub col_span: usize,
    #[serde(default)]
    pub children: Vec<DocNode>,
}

fn default_span() -> usize {
    1
}

impl TableCell {
    pub fn new(children: Vec<DocNode>) -> Self {
        Self { meta: NodeMetadata::default(), col_span: 1, children }
    }

    pub fn spanning(col_span: usize, children: Vec<DocNode>) -> Self {
        Self { meta: NodeMetadata::default(), col_span, children }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn deserializes_tagged_tree() {
        let json = r##"{
            "type": "document",
            "title": "Manual",
            "children": [
                { "type": "section", "meta": { "id": "intro", "line": 3 },
                  "title": [ { "type": "text", "text": "Intro" } ],
                  "children": [
                    { "type": "paragraph", "children": [
                        { "type": "text", "text": "See page " },
                        { "type": "page-reference", "target": "intro" },
                        { "type": "styled", "role": "emphasis", "children": [ { "type": "text", "text": "now" } ] },
                        { "type": "line-break" }
                    ] },
                    { "type": "spacer", "height": "1cm" },
                    { "type": "column-break" }
                  ] },
                { "type": "table", "columns": [ {}, { "width": 2 } ],
                  "rows": [ { "cells": [ { "colSpan": 2, "children": [] } ] } ] }
            ]
        }"##;
        let doc: DocNode = serde_json::from_str(json).unwrap();
        assert_eq!(doc.kind(), "document");
        let section = &doc.children()[0];
        assert_eq!(section.id().map(AnchorId::as_str), Some("intro"));
        assert_eq!(section.meta().and_then(|m| m.line), Some(3));
        match &section.children()[1] {
            DocNode::Spacer { height } => assert!((height - 28.35).abs() < 0.01),
            other => panic!("unexpected node {:?}", other),
        }
        match &doc.children()[1] {
            DocNode::Table { columns, rows, .. } => {
                assert_eq!(columns[1].width, Some(2.0));
                assert_eq!(rows[0].cells[0].col_span, 2);
            }
            other => panic!("unexpected node {:?}", other),
        }
    }

    #[test]
    fn plain_text_flattens_markup() {
        let inline = vec![
            InlineNode::text("A "),
            InlineNode::styled("strong", vec![InlineNode::text("bold")]),
            InlineNode::PageReference { target: AnchorId::new("x") },
            InlineNode::text(" move"),
        ];
        assert_eq!(InlineNode::plain_text(&inline), "A bold move");
    }
}
