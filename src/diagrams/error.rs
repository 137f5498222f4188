//! Error types for the diagram pipeline.

use super::document::NodeId;
use super::types::{Dialect, RenderFailure};

/// Failures of host document operations.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DocumentError {
    /// The node id does not name a node of this document.
    #[error("unknown node {0}")]
    UnknownNode(NodeId),
    /// The reference node passed to an insertion is not a child of the parent.
    #[error("node {child} is not a child of {parent}")]
    NotAChild { parent: NodeId, child: NodeId },
    /// The insertion would make a node its own ancestor.
    #[error("inserting {node} under {parent} would create a cycle")]
    Cycle { parent: NodeId, node: NodeId },
}

/// Errors raised while parsing a structural selector.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SelectorError {
    #[error("empty selector")]
    Empty,
    /// Only `tag`, `.class` and `tag.class` forms are supported.
    #[error("unsupported selector '{0}'")]
    Unsupported(String),
}

/// Per-block failures of the block scanner.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ScanError {
    /// A classified block lacks one of the regions needed to attach it.
    #[error("block {block} has no {part}; leaving it unprocessed")]
    MissingStructure { block: NodeId, part: &'static str },
    #[error(transparent)]
    Document(#[from] DocumentError),
}

/// Failures of the render back-ends.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RenderError {
    /// The layout engine rejected the source.
    #[error("{0}")]
    Layout(String),
    /// The remote service answered with a non-success status.
    #[error("PlantUML server error: {status} {reason}")]
    HttpStatus { status: u16, reason: String },
    /// The request never produced a response.
    #[error("{0}")]
    Transport(String),
    /// The response body is not an SVG document.
    #[error("Invalid response from PlantUML server")]
    InvalidResponse,
    /// The back-end panicked while rendering.
    #[error("{0} renderer panicked: {1}")]
    Panicked(Dialect, String),
    /// No back-end is configured for the dialect.
    #[error("{0} rendering is not available")]
    Unavailable(Dialect),
}

impl From<RenderError> for RenderFailure {
    fn from(err: RenderError) -> Self {
        RenderFailure::new(err.to_string())
    }
}
