use folio_idf::DocNode;

/// Represents the specific type of a document node.
///
/// The flow builder's handler table is keyed by this enum rather than by
/// the kind strings used in style-sheet selectors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum NodeKind {
    Document,
    Section,
    Paragraph,
    LiteralBlock,
    Block,
    List,
    ListItem,
    Table,
    Image,
    Footnote,
    Contents,
    PageBreak,
    ColumnBreak,
    Spacer,
}

impl NodeKind {
    pub const ALL: [NodeKind; 14] = [
        NodeKind::Document,
        NodeKind::Section,
        NodeKind::Paragraph,
        NodeKind::LiteralBlock,
        NodeKind::Block,
        NodeKind::List,
        NodeKind::ListItem,
        NodeKind::Table,
        NodeKind::Image,
        NodeKind::Footnote,
        NodeKind::Contents,
        NodeKind::PageBreak,
        NodeKind::ColumnBreak,
        NodeKind::Spacer,
    ];

    /// Determines the `NodeKind` from a given `DocNode`.
    pub fn of(node: &DocNode) -> Self {
        match node {
            DocNode::Document { .. } => NodeKind::Document,
            DocNode::Section { .. } => NodeKind::Section,
            DocNode::Paragraph { .. } => NodeKind::Paragraph,
            DocNode::LiteralBlock { .. } => NodeKind::LiteralBlock,
            DocNode::Block { .. } => NodeKind::Block,
            DocNode::List { .. } => NodeKind::List,
            DocNode::ListItem { .. } => NodeKind::ListItem,
            DocNode::Table { .. } => NodeKind::Table,
            DocNode::Image { .. } => NodeKind::Image,
            DocNode::Footnote { .. } => NodeKind::Footnote,
            DocNode::Contents { .. } => NodeKind::Contents,
            DocNode::PageBreak { .. } => NodeKind::PageBreak,
            DocNode::ColumnBreak => NodeKind::ColumnBreak,
            DocNode::Spacer { .. } => NodeKind::Spacer,
        }
    }

    /// Returns a string representation, primarily for debugging or error messages.
    pub fn as_str(&self) -> &'static str {
        match self {
            NodeKind::Document => "Document",
            NodeKind::Section => "Section",
            NodeKind::Paragraph => "Paragraph",
            NodeKind::LiteralBlock => "LiteralBlock",
            NodeKind::Block => "Block",
            NodeKind::List => "List",
            NodeKind::ListItem => "ListItem",
            NodeKind::Table => "Table",
            NodeKind::Image => "Image",
            NodeKind::Footnote => "Footnote",
            NodeKind::Contents => "Contents",
            NodeKind::PageBreak => "PageBreak",
            NodeKind::ColumnBreak => "ColumnBreak",
            NodeKind::Spacer => "Spacer",
        }
    }
}
