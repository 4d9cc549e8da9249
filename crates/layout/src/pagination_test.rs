use crate::elements::LayoutElement;
use crate::flow::FlowConfig;
use crate::template::{PageTemplate, RunningBlock, TemplateSet};
use crate::test_utils::*;
use crate::warnings::LayoutWarning;
use crate::{LayoutConfig, LayoutEngine, MeasureCache, Rect, ReferenceTable};
use folio_idf::{DocNode, InlineNode, NodeMetadata};
use folio_style::dimension::{Margins, PageSize};
use folio_style::stylesheet::{ElementStyle, Selector, StyleSheet};
use folio_style::text::TextAlign;
use folio_traits::FixedWidthMeasurer;
use std::sync::Arc;
use folio_types::AnchorId;

fn texts(page: &crate::LaidOutPage) -> Vec<&str> {
    page.text().collect()
}

fn footnote(id: &str, text: &str) -> DocNode {
    DocNode::Footnote { meta: NodeMetadata::with_id(id), label: None, children: vec![DocNode::paragraph(text)] }
}

fn with_note_ref(text: &str, target: &str) -> DocNode {
    DocNode::Paragraph {
        meta: NodeMetadata::default(),
        children: vec![InlineNode::text(text), InlineNode::FootnoteReference { target: AnchorId::new(target) }],
    }
}

#[test]
fn test_widow_control_moves_lines_to_next_page() {
    init_logger();
    // Content height 50 holds three 14.4pt lines.
    let templates = small_pages(500.0, 70.0);
    let style = ElementStyle { widows: Some(2), ..Default::default() };
    let nodes = vec![create_styled_paragraph("Line 1\nLine 2\nLine 3\nLine 4", Some(style))];

    let pages = paginate_test_nodes(&templates, nodes).unwrap();

    assert_eq!(pages.len(), 2, "Expected two pages");
    assert_eq!(texts(&pages[0]), vec!["Line 1", "Line 2"]);
    assert_eq!(texts(&pages[1]), vec!["Line 3", "Line 4"]);
    let first = find_first_text_box_with_content(&pages[1], "Line 3").unwrap();
    assert!((first.y - 10.0).abs() < 0.01);
}

#[test]
fn test_orphan_control_moves_whole_paragraph() {
    init_logger();
    let templates = small_pages(500.0, 70.0);
    let style = ElementStyle { orphans: Some(2), widows: Some(1), ..Default::default() };
    let nodes = vec![
        create_paragraph("Line A\nLine B"),
        create_styled_paragraph("Line C\nLine D\nLine E", Some(style)),
    ];

    let pages = paginate_test_nodes(&templates, nodes).unwrap();

    assert_eq!(pages.len(), 2);
    assert_eq!(texts(&pages[0]), vec!["Line A", "Line B"]);
    let line_c = find_first_text_box_with_content(&pages[1], "Line C").unwrap();
    assert!((line_c.y - 10.0).abs() < 0.01, "paragraph should start at the top of page 2");
}

#[test]
fn test_text_wraps_within_frame() {
    init_logger();
    let templates = small_pages(130.0, 500.0);
    // 110pt of width fits 18 characters of 6pt.
    let pages = paginate_test_nodes(&templates, vec![create_paragraph("the quick brown fox jumps over the lazy dog")]).unwrap();

    let lines = texts(&pages[0]);
    assert!(lines.len() >= 3, "expected wrapping, got {lines:?}");
    assert_eq!(lines.join(" "), "the quick brown fox jumps over the lazy dog");
    for el in &pages[0].elements {
        assert!(el.x + el.width <= 120.0 + 0.01, "element overflows the frame: {el:?}");
    }
}

#[test]
fn test_centered_text_is_offset() {
    init_logger();
    let templates = small_pages(500.0, 70.0);
    let style = ElementStyle { text_align: Some(TextAlign::Center), ..Default::default() };
    let pages = paginate_test_nodes(&templates, vec![create_styled_paragraph("Hello", Some(style))]).unwrap();

    let hello = find_first_text_box_with_content(&pages[0], "Hello").unwrap();
    assert!((hello.width - 30.0).abs() < 0.01);
    assert!((hello.x - (10.0 + (480.0 - 30.0) / 2.0)).abs() < 0.01);
}

#[test]
fn test_oversized_paragraph_is_split_without_loss() {
    init_logger();
    let templates = small_pages(500.0, 70.0);
    let text: Vec<String> = (0..10).map(|i| format!("L{i}")).collect();
    let doc = build(&DocNode::document(vec![create_paragraph(&text.join("\n"))]), plain_sheet()).unwrap();

    let pass = place(&doc, &templates).unwrap();

    let per_page: Vec<usize> = pass.pages.iter().map(|p| p.text().count()).collect();
    assert_eq!(per_page, vec![3, 3, 2, 2]);
    let all: Vec<&str> = pass.pages.iter().flat_map(|p| p.text()).collect();
    assert_eq!(all, text.iter().map(String::as_str).collect::<Vec<_>>());
    let overflows = pass.warnings.iter().filter(|w| matches!(w, LayoutWarning::LayoutOverflow { .. })).count();
    assert_eq!(overflows, 1);
}

#[test]
fn test_indivisible_unit_overflows_empty_frame() {
    init_logger();
    let templates = small_pages(500.0, 70.0);
    let image = DocNode::Image { meta: NodeMetadata::default(), src: "missing.png".to_string(), width: Some(40.0), height: Some(90.0) };
    let doc = build(&DocNode::document(vec![create_paragraph("Before"), image]), plain_sheet()).unwrap();

    let pass = place(&doc, &templates).unwrap();

    assert_eq!(pass.page_count(), 2);
    let placed = pass.pages[1].elements.iter().find(|e| matches!(e.element, LayoutElement::Image(_))).unwrap();
    assert!((placed.y - 10.0).abs() < 0.01);
    assert!(placed.height > 50.0);
    assert!(pass.warnings.iter().any(|w| matches!(w, LayoutWarning::LayoutOverflow { page: 2, .. })));
}

#[test]
fn test_footnote_lands_on_anchor_page() {
    init_logger();
    let templates = small_pages(500.0, 200.0);
    let nodes = vec![with_note_ref("Claim", "n1"), footnote("n1", "Source."), create_paragraph("More text")];
    let doc = build(&DocNode::document(nodes), plain_sheet()).unwrap();

    let pass = place(&doc, &templates).unwrap();

    assert_eq!(pass.page_count(), 1);
    let page = &pass.pages[0];
    assert_eq!(page.footnotes, vec![AnchorId::new("n1")]);
    let claim = find_first_text_box_with_content(page, "Claim").unwrap();
    let source = find_first_text_box_with_content(page, "Source.").unwrap();
    assert!(source.y > claim.y);
    // Area: 8pt gap plus one 14.4pt line at the bottom of the frame.
    assert!((source.y - (190.0 - 14.4)).abs() < 0.01);
    assert!(page.elements.iter().any(|e| matches!(e.element, LayoutElement::Rule { .. })));
    assert_eq!(pass.anchors[&AnchorId::new("n1")].page, 1);
    assert!(pass.warnings.is_empty());
}

#[test]
fn test_footnote_that_cannot_fit_moves_to_next_page() {
    init_logger();
    let templates = small_pages(500.0, 70.0);
    let nodes = vec![create_paragraph("A\nB"), with_note_ref("C", "n1"), footnote("n1", "Note.")];
    let doc = build(&DocNode::document(nodes), plain_sheet()).unwrap();

    let pass = place(&doc, &templates).unwrap();

    assert_eq!(pass.page_count(), 2);
    assert!(pass.pages[0].footnotes.is_empty());
    assert_eq!(pass.pages[1].footnotes, vec![AnchorId::new("n1")]);
    assert!(pass.warnings.iter().any(|w| matches!(
        w,
        LayoutWarning::FootnoteSeparated { anchor_page: 1, note_page: 2, .. }
    )));
}

#[test]
fn test_page_break_switches_template() {
    init_logger();
    let narrow = PageTemplate::single_column("narrow", PageSize::Custom { width: 300.0, height: 300.0 }, &Margins::all(10.0));
    let wide = PageTemplate::single_column("wide", PageSize::Custom { width: 600.0, height: 300.0 }, &Margins::all(10.0));
    let templates = TemplateSet::new(vec![narrow, wide], "narrow", "narrow").unwrap();
    let nodes = vec![
        create_paragraph("First"),
        DocNode::PageBreak { template: Some("wide".to_string()) },
        create_paragraph("Second"),
    ];

    let pages = paginate_test_nodes(&templates, nodes).unwrap();

    assert_eq!(pages.len(), 2);
    assert_eq!(&*pages[0].template, "narrow");
    assert_eq!(&*pages[1].template, "wide");
    assert_eq!(pages[1].size, (600.0, 300.0));
}

#[test]
fn test_unknown_break_template_is_an_error() {
    init_logger();
    let nodes = vec![create_paragraph("First"), DocNode::PageBreak { template: Some("nope".to_string()) }];
    let result = paginate_test_nodes(&small_pages(300.0, 300.0), nodes);
    assert!(matches!(result, Err(crate::LayoutError::UnknownTemplate(name)) if name == "nope"));
}

#[test]
fn test_odd_page_breaks_insert_blank_page() {
    init_logger();
    let config = FlowConfig { break_level: 1, break_side: crate::flow::BreakSide::Odd, ..Default::default() };
    let tree = DocNode::document(vec![
        DocNode::section("one", "One", vec![create_paragraph("Alpha")]),
        DocNode::section("two", "Two", vec![create_paragraph("Beta")]),
    ]);
    let doc = build_with(&tree, plain_sheet(), &config).unwrap();

    let pass = place(&doc, &small_pages(300.0, 300.0)).unwrap();

    assert_eq!(pass.page_count(), 3);
    assert!(pass.pages[1].elements.is_empty(), "page 2 should be blank");
    assert_eq!(pass.anchors[&AnchorId::new("two")].page, 3);
}

#[test]
fn test_first_template_chains_to_next() {
    init_logger();
    let size = PageSize::Custom { width: 300.0, height: 70.0 };
    let title = PageTemplate::single_column("title", size.clone(), &Margins::all(10.0)).with_next("body");
    let body = PageTemplate::single_column("body", size, &Margins::all(10.0));
    let templates = TemplateSet::new(vec![title, body], "title", "body").unwrap();
    let nodes = (0..3).map(|i| create_paragraph(&format!("P{i}a\nP{i}b\nP{i}c"))).collect();

    let pages = paginate_test_nodes(&templates, nodes).unwrap();

    let names: Vec<&str> = pages.iter().map(|p| &*p.template).collect();
    assert_eq!(names, vec!["title", "body", "body"]);
}

#[test]
fn test_spacer_at_frame_top_is_dropped() {
    init_logger();
    let nodes = vec![
        create_paragraph("First"),
        DocNode::PageBreak { template: None },
        DocNode::Spacer { height: 20.0 },
        create_paragraph("Second"),
        DocNode::Spacer { height: 20.0 },
        create_paragraph("Third"),
    ];

    let pages = paginate_test_nodes(&small_pages(300.0, 300.0), nodes).unwrap();

    let second = find_first_text_box_with_content(&pages[1], "Second").unwrap();
    assert!((second.y - 10.0).abs() < 0.01);
    let third = find_first_text_box_with_content(&pages[1], "Third").unwrap();
    assert!((third.y - (10.0 + 14.4 + 20.0)).abs() < 0.01);
}

#[test]
fn test_heading_keeps_with_next() {
    init_logger();
    let sheet = StyleSheet::new()
        .with_rule(Selector::kind("heading"), ElementStyle { keep_with_next: Some(true), ..Default::default() });
    let tree = DocNode::document(vec![
        create_paragraph("A\nB"),
        DocNode::section("s", "Title", vec![create_paragraph("Body")]),
    ]);
    let doc = build(&tree, sheet).unwrap();

    let pass = place(&doc, &small_pages(300.0, 70.0)).unwrap();

    assert_eq!(pass.page_count(), 2);
    let heading = find_first_text_box_with_content(&pass.pages[1], "Title").unwrap();
    assert!((heading.y - 10.0).abs() < 0.01);
    assert_eq!(texts(&pass.pages[1]), vec!["Title", "Body"]);
    assert_eq!(pass.anchors[&AnchorId::new("s")].page, 2);
}

#[test]
fn test_two_columns_fill_left_then_right() {
    init_logger();
    let size = PageSize::Custom { width: 500.0, height: 70.0 };
    let templates = TemplateSet::single(PageTemplate::two_column("cols", size, &Margins::all(10.0), 20.0)).unwrap();

    let pages = paginate_test_nodes(&templates, vec![create_paragraph("W\nX\nY\nZ")]).unwrap();

    assert_eq!(pages.len(), 1);
    let x = |s: &str| find_first_text_box_with_content(&pages[0], s).unwrap().x;
    assert!((x("W") - 10.0).abs() < 0.01);
    assert!((x("Y") - 260.0).abs() < 0.01);
    let z = find_first_text_box_with_content(&pages[0], "Z").unwrap();
    assert!((z.y - 24.4).abs() < 0.01);
}

#[test]
fn test_contents_page_numbers_come_from_references() {
    init_logger();
    let tree = DocNode::document(vec![
        DocNode::Contents { meta: NodeMetadata::default(), title: None, depth: None },
        DocNode::PageBreak { template: None },
        DocNode::section("a", "Alpha", vec![create_paragraph("one")]),
        DocNode::PageBreak { template: None },
        DocNode::section("b", "Beta", vec![create_paragraph("two")]),
    ]);
    let doc = build(&tree, plain_sheet()).unwrap();
    let templates = small_pages(300.0, 120.0);

    let first = place(&doc, &templates).unwrap();
    let placeholders = first.pages[0].text().filter(|t| *t == "?").count();
    assert_eq!(placeholders, 2);

    let refs = first.observed_references();
    assert_eq!(refs.page_of(&AnchorId::new("b")), Some(3));
    let second = place_with(&doc, &templates, &refs).unwrap();
    let numbers: Vec<&str> = second.pages[0].text().filter(|t| !t.is_empty() && t.chars().all(|c| c.is_ascii_digit())).collect();
    assert_eq!(numbers, vec!["2", "3"]);
    let alpha = find_first_text_box_with_content(&second.pages[0], "Alpha").unwrap();
    let LayoutElement::Text(text) = &alpha.element else { unreachable!() };
    assert_eq!(text.href.as_deref(), Some("#a"));
}

#[test]
fn test_running_footer_substitutes_fields() {
    init_logger();
    let size = PageSize::Custom { width: 300.0, height: 100.0 };
    let template = PageTemplate::single_column("page", size, &Margins::all(20.0)).with_footer(RunningBlock {
        text: "{page} of {pages}".to_string(),
        rect: Rect::new(20.0, 84.0, 260.0, 12.0),
    });
    let templates = TemplateSet::single(template).unwrap();
    let doc = build(&DocNode::document(vec![create_paragraph("Body")]), plain_sheet()).unwrap();

    let first = place(&doc, &templates).unwrap();
    assert!(find_first_text_box_with_content(&first.pages[0], "1 of ?").is_some());

    let second = place_with(&doc, &templates, &first.observed_references()).unwrap();
    let footer = find_first_text_box_with_content(&second.pages[0], "1 of 1").unwrap();
    assert!(footer.unit.is_none());
    assert!((footer.y - 84.0).abs() < 0.01);
}

fn two_templates(first: &str, second: &str) -> TemplateSet {
    let normal = PageTemplate::single_column(first, PageSize::Custom { width: 300.0, height: 100.0 }, &Margins::all(10.0));
    let wide = PageTemplate::single_column(second, PageSize::Custom { width: 600.0, height: 100.0 }, &Margins::all(10.0));
    TemplateSet::new(vec![normal, wide], first, first).unwrap()
}

#[test]
fn test_section_template_applies_to_following_pages() {
    init_logger();
    let sheet = StyleSheet::new().with_rule(
        Selector::kind_and_class("section", "appendix"),
        ElementStyle { page_template: Some("wide".to_string()), ..Default::default() },
    );
    let body = (0..12).map(|i| format!("L{i}")).collect::<Vec<_>>().join("\n");
    let appendix = DocNode::Section {
        meta: NodeMetadata { id: Some(AnchorId::new("appendix")), classes: vec!["appendix".to_string()], ..Default::default() },
        title: vec![InlineNode::text("Appendix")],
        children: vec![create_paragraph(&body)],
    };
    let tree = DocNode::document(vec![create_paragraph("Intro"), appendix]);
    let doc = build(&tree, sheet).unwrap();

    let pass = place(&doc, &two_templates("normal", "wide")).unwrap();

    let names: Vec<&str> = pass.pages.iter().map(|p| &*p.template).collect();
    assert!(names.len() >= 3, "{names:?}");
    assert_eq!(names[0], "normal");
    assert!(names[1..].iter().all(|n| *n == "wide"), "{names:?}");
    assert_eq!(pass.anchors[&AnchorId::new("appendix")].page, 1);
}

#[test]
fn test_explicit_break_template_overrides_section_template() {
    init_logger();
    let sheet = StyleSheet::new().with_rule(
        Selector::class("appendix"),
        ElementStyle { page_template: Some("wide".to_string()), ..Default::default() },
    );
    let appendix = DocNode::Section {
        meta: NodeMetadata { classes: vec!["appendix".to_string()], ..Default::default() },
        title: vec![InlineNode::text("Appendix")],
        children: vec![
            create_paragraph("Short"),
            DocNode::PageBreak { template: Some("normal".to_string()) },
            create_paragraph(&(0..8).map(|i| format!("A{i}")).collect::<Vec<_>>().join("\n")),
        ],
    };
    let doc = build(&DocNode::document(vec![appendix]), sheet).unwrap();

    let pass = place(&doc, &two_templates("normal", "wide")).unwrap();

    let names: Vec<&str> = pass.pages.iter().map(|p| &*p.template).collect();
    assert_eq!(names, vec!["normal", "normal", "normal"]);
}

fn keyed_table(rows: usize) -> DocNode {
    DocNode::Table {
        meta: NodeMetadata::default(),
        columns: vec![folio_idf::ColumnSpec::default(); 2],
        header: vec![folio_idf::TableRow {
            cells: vec![
                folio_idf::TableCell::new(vec![DocNode::paragraph("HK")]),
                folio_idf::TableCell::new(vec![DocNode::paragraph("HV")]),
            ],
        }],
        rows: (0..rows)
            .map(|i| folio_idf::TableRow {
                cells: vec![
                    folio_idf::TableCell::new(vec![DocNode::paragraph(&format!("k{i}"))]),
                    folio_idf::TableCell::new(vec![DocNode::paragraph(&format!("v{i}"))]),
                ],
            })
            .collect(),
    }
}

fn split_table(repeat_table_header: bool) -> Vec<crate::LaidOutPage> {
    let config = FlowConfig { repeat_table_header, ..Default::default() };
    let doc = build_with(&DocNode::document(vec![keyed_table(12)]), plain_sheet(), &config).unwrap();
    // 80pt frames hold five 14.4pt rows.
    let pass = place(&doc, &small_pages(300.0, 100.0)).unwrap();
    assert!(pass.warnings.is_empty(), "{:?}", pass.warnings);
    pass.pages
}

fn assert_rows_drawn_once(pages: &[crate::LaidOutPage]) {
    for i in 0..12 {
        let key = format!("k{i}");
        let count: usize = pages.iter().map(|p| p.text().filter(|t| *t == key).count()).sum();
        assert_eq!(count, 1, "{key} drawn {count} times");
    }
}

#[test]
fn test_table_splits_at_rows_with_repeated_header() {
    init_logger();
    let pages = split_table(true);

    assert_eq!(pages.len(), 3);
    assert_rows_drawn_once(&pages);
    for page in &pages {
        assert_eq!(page.text().filter(|t| *t == "HK").count(), 1);
    }
    assert_eq!(texts(&pages[1]).iter().filter(|t| t.starts_with('k')).count(), 4);
}

#[test]
fn test_table_continuation_without_header() {
    init_logger();
    let pages = split_table(false);

    assert_eq!(pages.len(), 3);
    assert_rows_drawn_once(&pages);
    assert_eq!(pages[0].text().filter(|t| *t == "HK").count(), 1);
    assert!(pages[1..].iter().all(|p| !p.text().any(|t| t == "HK")));
    assert_eq!(texts(&pages[1]), vec!["k4", "v4", "k5", "v5", "k6", "v6", "k7", "v7", "k8", "v8"]);
}

#[test]
fn test_split_retry_limit_places_rest_whole() {
    init_logger();
    let body = (0..10).map(|i| format!("L{i}")).collect::<Vec<_>>().join("\n");
    let doc = build(&DocNode::document(vec![create_paragraph(&body)]), plain_sheet()).unwrap();
    let config = LayoutConfig { max_split_retries: 1, ..Default::default() };
    let engine = LayoutEngine::new(config, Arc::new(FixedWidthMeasurer::default()));
    let mut cache = MeasureCache::new();

    // 50pt frames hold three lines; the second split hits the limit.
    let pass = engine.place(&doc, &small_pages(500.0, 70.0), &ReferenceTable::new(), &mut cache).unwrap();

    assert_eq!(pass.page_count(), 2);
    assert!(pass.warnings.iter().any(|w| matches!(w, LayoutWarning::SplitRetryLimit { page: 2, retries: 1, .. })));
    assert_eq!(page_text(&pass.pages[1]), "L3 L4 L5 L6 L7 L8 L9");
}

#[test]
fn test_column_break_moves_to_next_frame() {
    init_logger();
    let size = PageSize::Custom { width: 500.0, height: 70.0 };
    let templates = TemplateSet::single(PageTemplate::two_column("cols", size, &Margins::all(10.0), 20.0)).unwrap();
    let nodes = vec![
        DocNode::ColumnBreak,
        create_paragraph("A"),
        DocNode::ColumnBreak,
        create_paragraph("B"),
    ];

    let pages = paginate_test_nodes(&templates, nodes).unwrap();

    assert_eq!(pages.len(), 1);
    let a = find_first_text_box_with_content(&pages[0], "A").unwrap();
    assert!((a.x - 10.0).abs() < 0.01, "a break on an empty frame is ignored");
    let b = find_first_text_box_with_content(&pages[0], "B").unwrap();
    assert!((b.x - 260.0).abs() < 0.01);
    assert!((b.y - 10.0).abs() < 0.01);
}
