use folio_types::AnchorId;
use std::fmt;
use thiserror::Error;

/// Where a node sits in the input tree: the child-index path from the root
/// plus the source line when the parser recorded one.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct NodeLocation {
    pub path: Vec<usize>,
    pub line: Option<u32>,
}

impl NodeLocation {
    pub fn new(path: Vec<usize>, line: Option<u32>) -> Self {
        Self { path, line }
    }
}

impl fmt::Display for NodeLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "node /")?;
        let path: Vec<String> = self.path.iter().map(usize::to_string).collect();
        write!(f, "{}", path.join("/"))?;
        if let Some(line) = self.line {
            write!(f, " (line {})", line)?;
        }
        Ok(())
    }
}

/// Fatal problems in the input tree. No PDF is produced.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum StructuralError {
    #[error("Table cell at {location} spans past the declared {columns} columns (row needs {spans}).")]
    ColumnSpanExceeded { location: NodeLocation, spans: usize, columns: usize },
    #[error("Table cell at {location} has a column span of zero.")]
    ZeroColumnSpan { location: NodeLocation },
    #[error("Reference to unknown target '{target}' at {location}.")]
    DanglingReference { target: AnchorId, location: NodeLocation },
    #[error("Footnote reference at {location} targets '{target}', which is not a footnote.")]
    NotAFootnote { target: AnchorId, location: NodeLocation },
    #[error("Footnotes reference each other in a cycle: {}", format_cycle(.cycle))]
    CyclicFootnote { cycle: Vec<AnchorId>, location: NodeLocation },
    #[error("Duplicate id '{id}' at {second}; first declared at {first}.")]
    DuplicateId { id: AnchorId, first: NodeLocation, second: NodeLocation },
}

fn format_cycle(cycle: &[AnchorId]) -> String {
    cycle.iter().map(AnchorId::as_str).collect::<Vec<_>>().join(" -> ")
}

impl StructuralError {
    pub fn location(&self) -> &NodeLocation {
        match self {
            StructuralError::ColumnSpanExceeded { location, .. }
            | StructuralError::ZeroColumnSpan { location }
            | StructuralError::DanglingReference { location, .. }
            | StructuralError::NotAFootnote { location, .. }
            | StructuralError::CyclicFootnote { location, .. } => location,
            StructuralError::DuplicateId { second, .. } => second,
        }
    }
}

#[derive(Error, Debug)]
pub enum LayoutError {
    #[error("Unknown page template '{0}'.")]
    UnknownTemplate(String),
    #[error("Invalid template set: {0}")]
    InvalidTemplates(String),
    #[error("Footnote '{0}' has no registered content.")]
    MissingFootnote(AnchorId),
    #[error("Template JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("Generic layout error: {0}")]
    Generic(String),
}
