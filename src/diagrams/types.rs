//! Shared data types for the diagram pipeline.

use std::fmt;
use std::sync::LazyLock;

use regex::Regex;

use super::document::NodeId;

/// Identity of a diagram block: the host node of its outer container.
pub type BlockId = NodeId;

/// The two supported diagram markup languages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Dialect {
    /// Rendered in-process by the Mermaid layout engine.
    Mermaid,
    /// Rendered by a remote PlantUML server.
    PlantUml,
}

impl Dialect {
    /// Lower-case language tag as used in `language-<tag>` annotations.
    pub fn tag(self) -> &'static str {
        match self {
            Dialect::Mermaid => "mermaid",
            Dialect::PlantUml => "plantuml",
        }
    }

    /// Human-readable name.
    pub fn display_name(self) -> &'static str {
        match self {
            Dialect::Mermaid => "Mermaid",
            Dialect::PlantUml => "PlantUML",
        }
    }
}

impl fmt::Display for Dialect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.display_name())
    }
}

/// A successfully rendered diagram.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SvgArtifact {
    pub dialect: Dialect,
    /// Complete `<svg ...>...</svg>` document.
    pub svg: String,
}

/// A failed render, normalised for display.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderFailure {
    pub message: String,
    /// Source line the back-end blamed, when its message names one.
    pub line: Option<u32>,
}

static LINE_HINT: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r"(?i)line\s+(\d+)").ok());

impl RenderFailure {
    /// Build a failure, extracting a `line N` hint from the message.
    pub fn new(message: impl Into<String>) -> Self {
        let message = message.into();
        let line = extract_line_hint(&message);
        Self { message, line }
    }
}

/// Best-effort extraction of the first `line N` mention (case-insensitive).
pub fn extract_line_hint(message: &str) -> Option<u32> {
    LINE_HINT
        .as_ref()?
        .captures(message)
        .and_then(|caps| caps.get(1))
        .and_then(|m| m.as_str().parse().ok())
}

/// Outcome of one pass through the render pipeline.
pub type RenderResult = Result<SvgArtifact, RenderFailure>;

/// Observable display state of one block.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DisplayState {
    /// A render is in flight and no newer outcome is shown.
    Loading,
    Rendered(SvgArtifact),
    Error {
        message: String,
        line: Option<u32>,
        /// Whether the error panel is visible (grace window elapsed).
        revealed: bool,
    },
    /// The user switched the block to its raw source.
    SourceView,
}

impl DisplayState {
    pub fn is_loading(&self) -> bool {
        matches!(self, DisplayState::Loading)
    }

    pub fn is_rendered(&self) -> bool {
        matches!(self, DisplayState::Rendered(_))
    }

    pub fn is_revealed_error(&self) -> bool {
        matches!(self, DisplayState::Error { revealed: true, .. })
    }
}
