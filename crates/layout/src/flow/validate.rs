//! Checks run once the whole tree has been walked.

use super::builder::{FlowBuilder, ReferenceKind};
use super::FootnoteMode;
use crate::error::{NodeLocation, StructuralError};
use folio_types::AnchorId;
use std::collections::{BTreeMap, BTreeSet};

/// Every page reference, internal link and footnote reference must name a
/// known id; footnote references must name a footnote.
pub(crate) fn references(b: &FlowBuilder<'_>) -> Result<(), StructuralError> {
    for reference in &b.references {
        if !b.is_anchor(&reference.target) {
            return Err(StructuralError::DanglingReference {
                target: reference.target.clone(),
                location: reference.location.clone(),
            });
        }
        if reference.kind == ReferenceKind::Footnote {
            let is_note = match b.config.footnote_mode {
                FootnoteMode::Page => b.footnotes.contains(&reference.target),
                FootnoteMode::Inline => b.is_footnote_id(&reference.target),
            };
            if !is_note {
                return Err(StructuralError::NotAFootnote {
                    target: reference.target.clone(),
                    location: reference.location.clone(),
                });
            }
        }
    }
    Ok(())
}

/// Rejects footnotes that (transitively) reference themselves.
pub(crate) fn footnote_cycles(
    edges: &BTreeMap<AnchorId, Vec<(AnchorId, NodeLocation)>>,
) -> Result<(), StructuralError> {
    let mut done: BTreeSet<&AnchorId> = BTreeSet::new();
    for start in edges.keys() {
        let mut path: Vec<&AnchorId> = Vec::new();
        if let Some((cycle, location)) = find_cycle(start, edges, &mut path, &mut done) {
            return Err(StructuralError::CyclicFootnote { cycle, location });
        }
    }
    Ok(())
}

fn find_cycle<'e>(
    node: &'e AnchorId,
    edges: &'e BTreeMap<AnchorId, Vec<(AnchorId, NodeLocation)>>,
    path: &mut Vec<&'e AnchorId>,
    done: &mut BTreeSet<&'e AnchorId>,
) -> Option<(Vec<AnchorId>, NodeLocation)> {
    if done.contains(node) {
        return None;
    }
    path.push(node);
    for (next, location) in edges.get(node).into_iter().flatten() {
        if let Some(pos) = path.iter().position(|p| *p == next) {
            let mut cycle: Vec<AnchorId> = path[pos..].iter().map(|id| (*id).clone()).collect();
            cycle.push(next.clone());
            return Some((cycle, location.clone()));
        }
        if let Some(found) = find_cycle(next, edges, path, done) {
            return Some(found);
        }
    }
    path.pop();
    done.insert(node);
    None
}
