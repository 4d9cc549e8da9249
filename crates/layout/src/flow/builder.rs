use super::handlers;
use super::validate;
use super::{FlowConfig, FlowDocument, FlowKind, FlowUnit, FootnoteTable, SpanContent, TextSpan, UnitId};
use crate::error::{NodeLocation, StructuralError};
use crate::node_kind::NodeKind;
use crate::style::{ComputedStyle, StyleContext, StyleResolver};
use crate::warnings::LayoutWarning;
use folio_idf::{DocNode, InlineNode, NodeMetadata};
use folio_style::stylesheet::StyleSheet;
use folio_traits::ImageDecoder;
use folio_types::{AnchorId, TocEntry};
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::Arc;

/// Converts one node into flow units by calling back into the builder.
pub type NodeHandler = fn(&mut FlowBuilder<'_>, &DocNode, &BuildContext) -> Result<(), StructuralError>;

/// State threaded down the tree walk.
#[derive(Debug, Clone)]
pub struct BuildContext {
    pub style: StyleContext,
    pub path: Vec<usize>,
    pub section_level: u8,
    /// The footnote whose content is being built, if any.
    pub footnote: Option<AnchorId>,
}

impl BuildContext {
    pub fn root(style: Arc<ComputedStyle>) -> Self {
        Self { style: StyleContext::root(style), path: Vec::new(), section_level: 0, footnote: None }
    }

    /// Context for the `index`-th child of a node styled `parent`.
    pub fn child(&self, index: usize, parent: Arc<ComputedStyle>) -> Self {
        let mut path = self.path.clone();
        path.push(index);
        Self {
            style: self.style.child(parent),
            path,
            section_level: self.section_level,
            footnote: self.footnote.clone(),
        }
    }

    pub fn location(&self, meta: Option<&NodeMetadata>) -> NodeLocation {
        NodeLocation::new(self.path.clone(), meta.and_then(|m| m.line))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ReferenceKind {
    Page,
    Link,
    Footnote,
}

#[derive(Debug, Clone)]
pub(crate) struct PendingReference {
    pub target: AnchorId,
    pub location: NodeLocation,
    pub kind: ReferenceKind,
}

/// Walks a document tree and emits its flow units.
///
/// Dispatch goes through a per-kind handler table; [`FlowBuilder::register`]
/// replaces the handler of a kind.
pub struct FlowBuilder<'a> {
    pub(crate) config: &'a FlowConfig,
    pub(crate) images: &'a dyn ImageDecoder,
    resolver: StyleResolver,
    handlers: HashMap<NodeKind, NodeHandler>,
    sinks: Vec<Vec<FlowUnit>>,
    next_id: u32,
    has_content: bool,
    pub(crate) pending_bullet: Option<String>,
    explicit_ids: BTreeSet<AnchorId>,
    anchors: BTreeSet<AnchorId>,
    footnote_labels: Vec<String>,
    labels_by_id: HashMap<AnchorId, String>,
    footnote_index: usize,
    generated: usize,
    pub(crate) footnotes: FootnoteTable,
    pub(crate) bookmarks: Vec<TocEntry>,
    pub(crate) references: Vec<PendingReference>,
    pub(crate) footnote_edges: BTreeMap<AnchorId, Vec<(AnchorId, NodeLocation)>>,
    pub(crate) referenced: BTreeSet<AnchorId>,
    pub(crate) title: Option<String>,
    pub(crate) warnings: Vec<LayoutWarning>,
}

impl<'a> FlowBuilder<'a> {
    pub fn new(config: &'a FlowConfig, sheet: Arc<StyleSheet>, images: &'a dyn ImageDecoder) -> Self {
        let mut builder = Self {
            config,
            images,
            resolver: StyleResolver::new(sheet),
            handlers: HashMap::new(),
            sinks: vec![Vec::new()],
            next_id: 0,
            has_content: false,
            pending_bullet: None,
            explicit_ids: BTreeSet::new(),
            anchors: BTreeSet::new(),
            footnote_labels: Vec::new(),
            labels_by_id: HashMap::new(),
            footnote_index: 0,
            generated: 0,
            footnotes: FootnoteTable::default(),
            bookmarks: Vec::new(),
            references: Vec::new(),
            footnote_edges: BTreeMap::new(),
            referenced: BTreeSet::new(),
            title: None,
            warnings: Vec::new(),
        };
        builder.register(NodeKind::Document, handlers::document);
        builder.register(NodeKind::Section, handlers::section);
        builder.register(NodeKind::Paragraph, handlers::paragraph);
        builder.register(NodeKind::LiteralBlock, handlers::literal_block);
        builder.register(NodeKind::Block, handlers::block);
        builder.register(NodeKind::List, handlers::list);
        builder.register(NodeKind::ListItem, handlers::list_item);
        builder.register(NodeKind::Table, handlers::table);
        builder.register(NodeKind::Image, handlers::image);
        builder.register(NodeKind::Footnote, handlers::footnote);
        builder.register(NodeKind::Contents, handlers::contents);
        builder.register(NodeKind::PageBreak, handlers::page_break);
        builder.register(NodeKind::ColumnBreak, handlers::column_break);
        builder.register(NodeKind::Spacer, handlers::spacer);
        builder
    }

    /// Installs `handler` for `kind`, returning the handler it replaces.
    pub fn register(&mut self, kind: NodeKind, handler: NodeHandler) -> Option<NodeHandler> {
        self.handlers.insert(kind, handler)
    }

    pub fn build(mut self, tree: &DocNode) -> Result<FlowDocument, StructuralError> {
        self.prescan(tree)?;
        let ctx = BuildContext::root(self.resolver.root_style());
        self.walk(tree, &ctx)?;

        let header_style = self.resolve_with_classes("header", &[], &ctx.style);
        let footer_style = self.resolve_with_classes("footer", &[], &ctx.style);

        let mut units = self.sinks.pop().unwrap_or_default();
        handlers::fill_contents(&mut self, &mut units);
        validate::references(&self)?;
        validate::footnote_cycles(&self.footnote_edges)?;

        log::debug!(
            "Flow built: {} units, {} footnotes, {} bookmarks, {} referenced targets, {} cached styles",
            units.len(),
            self.footnotes.len(),
            self.bookmarks.len(),
            self.referenced.len(),
            self.resolver.cached_len()
        );
        Ok(FlowDocument {
            units,
            footnotes: self.footnotes,
            bookmarks: self.bookmarks,
            anchors: self.anchors,
            referenced: self.referenced,
            title: self.title,
            header_style,
            footer_style,
            warnings: self.warnings,
        })
    }

    /// Dispatches `node` to its handler.
    pub fn walk(&mut self, node: &DocNode, ctx: &BuildContext) -> Result<(), StructuralError> {
        match self.handlers.get(&NodeKind::of(node)).copied() {
            Some(handler) => handler(self, node, ctx),
            None => self.walk_children(node.children(), ctx, ctx.style.parent.clone()),
        }
    }

    /// Walks `children` of a node styled `style`, joining sibling sections
    /// with a spacer.
    pub fn walk_children(
        &mut self,
        children: &[DocNode],
        ctx: &BuildContext,
        style: Arc<ComputedStyle>,
    ) -> Result<(), StructuralError> {
        let mut previous_was_section = false;
        for (index, child) in children.iter().enumerate() {
            let is_section = matches!(child, DocNode::Section { .. });
            if is_section && previous_was_section && self.config.section_spacing > 0.0 {
                self.emit(None, style.clone(), FlowKind::Spacer { height: self.config.section_spacing });
            }
            self.walk(child, &ctx.child(index, style.clone()))?;
            previous_was_section = is_section;
        }
        Ok(())
    }

    pub fn resolve_style(&mut self, kind: &str, meta: Option<&NodeMetadata>, ctx: &BuildContext) -> Arc<ComputedStyle> {
        let classes: &[String] = meta.map_or(&[], |m| m.classes.as_slice());
        self.resolver.resolve(kind, classes, meta.and_then(|m| m.style.as_ref()), &ctx.style)
    }

    pub fn resolve_with_classes(&mut self, kind: &str, classes: &[String], ctx: &StyleContext) -> Arc<ComputedStyle> {
        self.resolver.resolve(kind, classes, None, ctx)
    }

    /// Appends a unit to the innermost sink and returns its id.
    pub fn emit(&mut self, anchor: Option<AnchorId>, style: Arc<ComputedStyle>, kind: FlowKind) -> UnitId {
        let id = UnitId(self.next_id);
        self.next_id += 1;
        if !matches!(
            kind,
            FlowKind::Bookmark { .. } | FlowKind::FootnoteAnchor { .. } | FlowKind::PageBreak { .. } | FlowKind::ColumnBreak
        ) {
            self.has_content = true;
        }
        if let Some(anchor) = &anchor {
            self.anchors.insert(anchor.clone());
        }
        let unit = FlowUnit { id, part: 0, anchor, style, kind };
        if let Some(sink) = self.sinks.last_mut() {
            sink.push(unit);
        }
        id
    }

    /// Gives a container's id a position in the flow.
    pub fn emit_anchor_marker(&mut self, meta: &NodeMetadata, style: &Arc<ComputedStyle>) {
        if let Some(id) = &meta.id {
            self.emit(
                Some(id.clone()),
                style.clone(),
                FlowKind::Bookmark { title: String::new(), level: 0, outline: false, template: None },
            );
        }
    }

    /// Whether anything that occupies space has been emitted yet.
    pub fn has_content(&self) -> bool {
        self.has_content
    }

    /// Collects the units emitted by `f` instead of appending them to the flow.
    pub fn capture<F>(&mut self, f: F) -> Result<Vec<FlowUnit>, StructuralError>
    where
        F: FnOnce(&mut Self) -> Result<(), StructuralError>,
    {
        self.sinks.push(Vec::new());
        let result = f(self);
        let units = self.sinks.pop().unwrap_or_default();
        result.map(|_| units)
    }

    /// The node's id, or a fresh generated one that no explicit id uses.
    pub fn anchor_or_generate(&mut self, meta: &NodeMetadata, prefix: &str) -> AnchorId {
        if let Some(id) = &meta.id {
            return id.clone();
        }
        loop {
            self.generated += 1;
            let candidate = AnchorId::new(format!("{}-{}", prefix, self.generated));
            if !self.explicit_ids.contains(&candidate) && !self.anchors.contains(&candidate) {
                return candidate;
            }
        }
    }

    /// Label of the next footnote in document order.
    pub(crate) fn next_footnote_label(&mut self) -> String {
        let label = self
            .footnote_labels
            .get(self.footnote_index)
            .cloned()
            .unwrap_or_else(|| (self.footnote_index + 1).to_string());
        self.footnote_index += 1;
        label
    }

    /// Converts inline content into text spans styled relative to `style`.
    pub fn spans(
        &mut self,
        nodes: &[InlineNode],
        style: &Arc<ComputedStyle>,
        ctx: &BuildContext,
        location: &NodeLocation,
    ) -> Vec<TextSpan> {
        let mut out = Vec::new();
        self.collect_spans(nodes, style, None, ctx, location, &mut out);
        out
    }

    fn collect_spans(
        &mut self,
        nodes: &[InlineNode],
        style: &Arc<ComputedStyle>,
        href: Option<&Arc<str>>,
        ctx: &BuildContext,
        location: &NodeLocation,
        out: &mut Vec<TextSpan>,
    ) {
        let inline_ctx = ctx.style.child(style.clone());
        for node in nodes {
            match node {
                InlineNode::Text { text } => {
                    if !text.is_empty() {
                        out.push(TextSpan {
                            content: SpanContent::Text(text.clone()),
                            style: style.clone(),
                            href: href.cloned(),
                        });
                    }
                }
                InlineNode::Styled { role, classes, style: inline, children } => {
                    let span_style = self.resolver.resolve(role, classes, inline.as_ref(), &inline_ctx);
                    self.collect_spans(children, &span_style, href, ctx, location, out);
                }
                InlineNode::Link { href: target, children } => {
                    let link_style = self.resolver.resolve("link", &[], None, &inline_ctx);
                    if let Some(anchor) = target.strip_prefix('#') {
                        self.references.push(PendingReference {
                            target: AnchorId::new(anchor),
                            location: location.clone(),
                            kind: ReferenceKind::Link,
                        });
                    }
                    let href: Arc<str> = Arc::from(target.as_str());
                    self.collect_spans(children, &link_style, Some(&href), ctx, location, out);
                }
                InlineNode::PageReference { target } => {
                    self.references.push(PendingReference {
                        target: target.clone(),
                        location: location.clone(),
                        kind: ReferenceKind::Page,
                    });
                    self.referenced.insert(target.clone());
                    out.push(TextSpan {
                        content: SpanContent::PageNumber(target.clone()),
                        style: style.clone(),
                        href: href.cloned().or_else(|| Some(Arc::from(format!("#{}", target)))),
                    });
                }
                InlineNode::FootnoteReference { target } => {
                    self.references.push(PendingReference {
                        target: target.clone(),
                        location: location.clone(),
                        kind: ReferenceKind::Footnote,
                    });
                    if let Some(from) = &ctx.footnote {
                        self.footnote_edges
                            .entry(from.clone())
                            .or_default()
                            .push((target.clone(), location.clone()));
                    }
                    self.referenced.insert(target.clone());
                    let label = self
                        .labels_by_id
                        .get(target)
                        .cloned()
                        .unwrap_or_else(|| target.to_string());
                    let ref_style = self.resolver.resolve("footnote-reference", &[], None, &inline_ctx);
                    out.push(TextSpan {
                        content: SpanContent::Text(format!("[{}]", label)),
                        style: ref_style,
                        href: Some(Arc::from(format!("#{}", target))),
                    });
                }
                InlineNode::LineBreak => out.push(TextSpan {
                    content: SpanContent::LineBreak,
                    style: style.clone(),
                    href: None,
                }),
            }
        }
    }

    pub(crate) fn is_footnote_id(&self, id: &AnchorId) -> bool {
        self.labels_by_id.contains_key(id)
    }

    /// Records an id that is placed outside the unit stream (footnote notes).
    pub(crate) fn declare_anchor(&mut self, id: AnchorId) {
        self.anchors.insert(id);
    }

    pub(crate) fn is_anchor(&self, id: &AnchorId) -> bool {
        self.anchors.contains(id)
    }

    /// Collects explicit ids (rejecting duplicates) and footnote labels before
    /// the main walk, so forward references know what they point at.
    fn prescan(&mut self, tree: &DocNode) -> Result<(), StructuralError> {
        let mut seen: HashMap<AnchorId, NodeLocation> = HashMap::new();
        let mut auto = 0usize;
        let mut result = Ok(());
        visit(tree, &mut Vec::new(), &mut |meta, node, path| {
            if result.is_err() {
                return;
            }
            if let Some(meta) = meta {
                if let Some(id) = &meta.id {
                    let here = NodeLocation::new(path.to_vec(), meta.line);
                    if let Some(first) = seen.get(id) {
                        result = Err(StructuralError::DuplicateId {
                            id: id.clone(),
                            first: first.clone(),
                            second: here,
                        });
                        return;
                    }
                    seen.insert(id.clone(), here);
                }
            }
            if let Some(DocNode::Footnote { meta, label, .. }) = node {
                let label = match label {
                    Some(label) => label.clone(),
                    None => {
                        auto += 1;
                        auto.to_string()
                    }
                };
                if let Some(id) = &meta.id {
                    self.labels_by_id.insert(id.clone(), label.clone());
                }
                self.footnote_labels.push(label);
            }
        });
        result?;
        self.explicit_ids = seen.into_keys().collect();
        Ok(())
    }
}

/// Pre-order visit of every node and table cell, matching the walk order.
fn visit<F>(node: &DocNode, path: &mut Vec<usize>, f: &mut F)
where
    F: FnMut(Option<&NodeMetadata>, Option<&DocNode>, &[usize]),
{
    f(node.meta(), Some(node), path);
    if let DocNode::Table { header, rows, .. } = node {
        for (r, row) in header.iter().chain(rows).enumerate() {
            for (c, cell) in row.cells.iter().enumerate() {
                path.extend([r, c]);
                f(Some(&cell.meta), None, path);
                for (i, child) in cell.children.iter().enumerate() {
                    path.push(i);
                    visit(child, path, f);
                    path.pop();
                }
                path.truncate(path.len() - 2);
            }
        }
    }
    for (i, child) in node.children().iter().enumerate() {
        path.push(i);
        visit(child, path, f);
        path.pop();
    }
}
