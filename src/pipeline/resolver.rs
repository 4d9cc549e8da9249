// src/pipeline/resolver.rs
//! Repeats layout passes until forward page references stop changing.

use folio_layout::{
    FlowDocument, LayoutEngine, LayoutError, LayoutPass, LayoutWarning, MeasureCache, ReferenceTable, TemplateSet,
};
use folio_types::AnchorId;
use std::collections::BTreeSet;

/// The settled outcome of reference resolution.
#[derive(Debug, Clone)]
pub struct Resolution {
    /// The pass to emit.
    pub pass: LayoutPass,
    /// The table `pass` was laid out with.
    pub references: ReferenceTable,
    /// Number of layout passes run.
    pub passes: usize,
    /// What was known about every target after each pass, in pass order.
    pub history: Vec<ReferenceTable>,
    /// `false` when the pass cap was hit first.
    pub converged: bool,
}

/// Fixpoint driver over [`LayoutEngine::place`].
///
/// The first pass sees an empty table. Every later pass sees what the
/// previous one observed, except that a referenced target whose page came
/// out the same as it went in is frozen at that position for the rest of the
/// conversion. Resolution stops once the next table would equal the current
/// one on every referenced target (and on the page total, when a running
/// block prints it).
pub struct ReferenceResolver<'a> {
    engine: &'a LayoutEngine,
    templates: &'a TemplateSet,
    max_passes: usize,
}

impl<'a> ReferenceResolver<'a> {
    pub fn new(engine: &'a LayoutEngine, templates: &'a TemplateSet, max_passes: usize) -> Self {
        Self { engine, templates, max_passes: max_passes.max(1) }
    }

    pub fn resolve(&self, doc: &FlowDocument) -> Result<Resolution, LayoutError> {
        let mut cache = MeasureCache::new();
        self.resolve_with_cache(doc, &mut cache)
    }

    /// Like [`resolve`](Self::resolve), reusing line-breaking results from
    /// `cache`. The cache must only ever have seen `doc`.
    pub fn resolve_with_cache(&self, doc: &FlowDocument, cache: &mut MeasureCache) -> Result<Resolution, LayoutError> {
        let tracks_total = self.templates.uses_total_pages();
        let needs_fixpoint = doc.has_references() || tracks_total;

        let mut table = ReferenceTable::new();
        let mut frozen: BTreeSet<AnchorId> = BTreeSet::new();
        let mut history = Vec::new();

        loop {
            let number = history.len() + 1;
            if number > 1 {
                cache.begin_pass();
            }
            let mut pass = self.engine.place(doc, self.templates, &table, cache)?;
            let observed = pass.observed_references();
            log::info!(
                "Reference pass {}: {} pages, {} anchors observed.",
                number,
                pass.page_count(),
                observed.len()
            );
            if !needs_fixpoint {
                history.push(observed);
                return Ok(Resolution { pass, references: table, passes: number, history, converged: true });
            }

            for target in &doc.referenced {
                if !frozen.contains(target) {
                    let went_in = table.page_of(target);
                    if went_in.is_some() && went_in == observed.page_of(target) {
                        log::debug!("Freezing '{}' on page {:?}.", target, went_in);
                        frozen.insert(target.clone());
                    }
                }
            }

            let next = next_table(&table, observed, &frozen);
            history.push(next.clone());
            let mut unstable: Vec<AnchorId> = doc
                .referenced
                .iter()
                .filter(|t| table.position(t) != next.position(t))
                .cloned()
                .collect();
            let total_changed = tracks_total && table.total_pages() != next.total_pages();

            if unstable.is_empty() && !total_changed {
                log::info!("References settled after {} passes.", number);
                return Ok(Resolution { pass, references: table, passes: number, history, converged: true });
            }

            if number >= self.max_passes {
                unstable.sort();
                pass.warnings.push(LayoutWarning::ReferenceNonConvergence { passes: number, unstable }.logged());
                return Ok(Resolution { pass, references: table, passes: number, history, converged: false });
            }

            log::debug!(
                "{} references unstable after pass {}{}.",
                unstable.len(),
                number,
                if total_changed { ", page total changed" } else { "" }
            );
            table = next;
        }
    }
}

/// `observed`, with frozen targets kept where `current` has them.
fn next_table(current: &ReferenceTable, mut observed: ReferenceTable, frozen: &BTreeSet<AnchorId>) -> ReferenceTable {
    for target in frozen {
        if let Some(position) = current.position(target) {
            observed.insert(target.clone(), position);
        }
    }
    observed
}

#[cfg(test)]
mod tests {
    use super::*;
    use folio_idf::{DocNode, InlineNode, NodeMetadata};
    use folio_layout::{FlowBuilder, FlowConfig, LayoutConfig, PageTemplate, RunningBlock};
    use folio_layout::reference::AnchorPosition;
    use folio_style::dimension::{Margins, PageSize};
    use folio_style::stylesheet::StyleSheet;
    use folio_traits::{FixedWidthMeasurer, NullImageDecoder};
    use folio_types::geometry::Rect;
    use std::sync::Arc;

    fn init_logger() {
        let _ = env_logger::builder().is_test(true).try_init();
    }

    fn engine() -> LayoutEngine {
        LayoutEngine::new(LayoutConfig::default(), Arc::new(FixedWidthMeasurer::default()))
    }

    fn small_pages() -> TemplateSet {
        let size = PageSize::Custom { width: 300.0, height: 120.0 };
        TemplateSet::single(PageTemplate::single_column("page", size, &Margins::all(10.0))).unwrap()
    }

    fn build(tree: &DocNode) -> FlowDocument {
        FlowBuilder::new(&FlowConfig::default(), Arc::new(StyleSheet::new()), &NullImageDecoder)
            .build(tree)
            .unwrap()
    }

    fn cites(target: &str) -> DocNode {
        DocNode::Paragraph {
            meta: NodeMetadata::default(),
            children: vec![InlineNode::text("see page "), InlineNode::PageReference { target: AnchorId::new(target) }],
        }
    }

    #[test]
    fn plain_documents_take_one_pass() {
        init_logger();
        let doc = build(&DocNode::document(vec![DocNode::paragraph("Just text.")]));
        let engine = engine();
        let templates = small_pages();
        let resolution = ReferenceResolver::new(&engine, &templates, 10).resolve(&doc).unwrap();
        assert_eq!(resolution.passes, 1);
        assert!(resolution.converged);
        assert!(resolution.references.is_empty());
        assert_eq!(resolution.history.len(), 1);
    }

    #[test]
    fn forward_citation_settles_on_second_pass() {
        init_logger();
        let doc = build(&DocNode::document(vec![
            cites("end"),
            DocNode::PageBreak { template: None },
            DocNode::section("end", "End", vec![DocNode::paragraph("done")]),
        ]));
        let engine = engine();
        let templates = small_pages();
        let resolution = ReferenceResolver::new(&engine, &templates, 10).resolve(&doc).unwrap();

        assert_eq!(resolution.passes, 2);
        assert!(resolution.converged);
        assert_eq!(resolution.references.page_of(&AnchorId::new("end")), Some(2));
        let first_page: Vec<&str> = resolution.pass.pages[0].text().collect();
        assert!(first_page.iter().any(|t| t.contains('2')), "{first_page:?}");
        assert!(!first_page.iter().any(|t| t.contains('?')));
    }

    #[test]
    fn page_total_in_footer_forces_second_pass() {
        init_logger();
        let size = PageSize::Custom { width: 300.0, height: 100.0 };
        let template = PageTemplate::single_column("page", size, &Margins::all(20.0)).with_footer(RunningBlock {
            text: "{page} / {pages}".to_string(),
            rect: Rect::new(20.0, 84.0, 260.0, 12.0),
        });
        let templates = TemplateSet::single(template).unwrap();
        let doc = build(&DocNode::document(vec![DocNode::paragraph("Body")]));
        let engine = engine();

        let resolution = ReferenceResolver::new(&engine, &templates, 10).resolve(&doc).unwrap();
        assert_eq!(resolution.passes, 2);
        assert_eq!(resolution.references.total_pages(), Some(1));
        assert!(resolution.pass.pages[0].text().any(|t| t.contains("1 / 1")));
    }

    #[test]
    fn pass_cap_reports_unstable_targets() {
        init_logger();
        let doc = build(&DocNode::document(vec![
            cites("end"),
            DocNode::PageBreak { template: None },
            DocNode::section("end", "End", vec![]),
        ]));
        let engine = engine();
        let templates = small_pages();
        let resolution = ReferenceResolver::new(&engine, &templates, 1).resolve(&doc).unwrap();

        assert_eq!(resolution.passes, 1);
        assert!(!resolution.converged);
        let warning = resolution
            .pass
            .warnings
            .iter()
            .find(|w| matches!(w, LayoutWarning::ReferenceNonConvergence { .. }))
            .unwrap();
        assert_eq!(
            warning,
            &LayoutWarning::ReferenceNonConvergence { passes: 1, unstable: vec![AnchorId::new("end")] }
        );
    }

    #[test]
    fn frozen_targets_survive_new_observations() {
        let current = ReferenceTable::from_positions(
            [(AnchorId::new("a"), AnchorPosition { page: 2, y: 10.0 })].into_iter().collect(),
            3,
        );
        let observed = ReferenceTable::from_positions(
            [
                (AnchorId::new("a"), AnchorPosition { page: 3, y: 40.0 }),
                (AnchorId::new("b"), AnchorPosition { page: 1, y: 5.0 }),
            ]
            .into_iter()
            .collect(),
            4,
        );
        let frozen: BTreeSet<AnchorId> = [AnchorId::new("a")].into_iter().collect();
        let next = next_table(&current, observed, &frozen);
        assert_eq!(next.page_of(&AnchorId::new("a")), Some(2));
        assert_eq!(next.page_of(&AnchorId::new("b")), Some(1));
        assert_eq!(next.total_pages(), Some(4));
    }
}
