mod common;

use common::{GeneratedPdf, TestResult, init_logger, numbers, plain_pipeline, small_templates};
use folio::ConversionConfig;
use folio::idf::{DocNode, NodeMetadata};
use folio::layout::LayoutWarning;
use folio::types::AnchorId;

fn contents() -> DocNode {
    DocNode::Contents { meta: NodeMetadata::default(), title: None, depth: None }
}

fn titled_document() -> DocNode {
    DocNode::document(vec![
        contents(),
        DocNode::section(
            "title",
            "Title",
            vec![DocNode::paragraph("First paragraph."), DocNode::paragraph("Second paragraph.")],
        ),
    ])
}

#[test]
fn test_toc_renders_title_page_after_resolution() -> TestResult {
    init_logger();
    let pipeline = plain_pipeline(small_templates(300.0, 300.0)?, ConversionConfig::default())?;

    let (_, resolution) = pipeline.layout(&titled_document())?;
    assert_eq!(resolution.history[0].page_of(&AnchorId::new("title")), Some(1));
    assert_eq!(resolution.passes, 2);

    let output = pipeline.convert(&titled_document())?;
    assert!(output.warnings.is_empty(), "{:?}", output.warnings);
    let pdf = GeneratedPdf::from_bytes(output.pdf)?;
    assert_eq!(pdf.page_count(), 1);

    let strings = pdf.page_strings(1);
    assert!(strings.iter().any(|s| s.contains("Contents")));
    assert_eq!(numbers(&strings), vec!["1"]);
    assert!(!strings.iter().any(|s| s == "?"));
    assert!(pdf.internal_links(1) >= 1);

    assert_eq!(pdf.outline(), vec![("Title".to_string(), 1)]);
    Ok(())
}

#[test]
fn test_first_pass_shows_placeholder() -> TestResult {
    init_logger();
    let config = ConversionConfig { max_passes: 1, ..Default::default() };
    let pipeline = plain_pipeline(small_templates(300.0, 300.0)?, config)?;

    let output = pipeline.convert(&titled_document())?;
    assert_eq!(output.passes, 1);
    assert!(output.warnings.iter().any(|w| matches!(
        w,
        LayoutWarning::ReferenceNonConvergence { passes: 1, unstable } if unstable == &vec![AnchorId::new("title")]
    )));

    let pdf = GeneratedPdf::from_bytes(output.pdf)?;
    let strings = pdf.page_strings(1);
    assert!(strings.iter().any(|s| s == "?"), "{strings:?}");
    assert!(numbers(&strings).is_empty());
    Ok(())
}

#[test]
fn test_contents_spanning_pages_numbers_every_section() -> TestResult {
    init_logger();
    let mut children = vec![contents()];
    for i in 0..8 {
        children.push(DocNode::section(
            &format!("s{i}"),
            &format!("Section {i}"),
            vec![DocNode::paragraph("Body text.")],
        ));
    }
    let tree = DocNode::document(children);
    let config = ConversionConfig { break_level: 1, ..Default::default() };
    // Five lines per frame: the title and eight entries need two pages.
    let pipeline = plain_pipeline(small_templates(300.0, 100.0)?, config)?;

    let (_, resolution) = pipeline.layout(&tree)?;
    assert!(resolution.converged);
    for i in 0..8 {
        let target = AnchorId::new(format!("s{i}"));
        let placed = resolution.pass.anchors.get(&target).map(|p| p.page);
        assert_eq!(placed, Some(i + 3));
        assert_eq!(resolution.references.page_of(&target), placed);
    }

    let pdf = GeneratedPdf::from_bytes(pipeline.convert(&tree)?.pdf)?;
    assert_eq!(pdf.page_count(), 10);
    let mut listed = pdf.page_strings(1);
    listed.extend(pdf.page_strings(2));
    assert_eq!(numbers(&listed), vec!["3", "4", "5", "6", "7", "8", "9", "10"]);
    Ok(())
}

#[test]
fn test_recorded_pages_never_change_once_repeated() -> TestResult {
    init_logger();
    let mut children = vec![contents()];
    for i in 0..6 {
        children.push(DocNode::section(
            &format!("s{i}"),
            &format!("Section {i}"),
            vec![DocNode::paragraph("Some body text that wraps over a couple of lines in a narrow frame.")],
        ));
    }
    let tree = DocNode::document(children);
    let pipeline = plain_pipeline(small_templates(200.0, 120.0)?, ConversionConfig::default())?;

    let (doc, resolution) = pipeline.layout(&tree)?;
    assert!(resolution.passes <= pipeline.config().max_passes);
    for target in &doc.referenced {
        let pages: Vec<Option<usize>> = resolution.history.iter().map(|t| t.page_of(target)).collect();
        if let Some(settled) = pages.windows(2).position(|w| w[0] == w[1]) {
            assert!(pages[settled..].iter().all(|p| *p == pages[settled]), "{target}: {pages:?}");
        }
    }
    Ok(())
}
