//! Dialect classification of code block contents.
//!
//! First match wins: an explicit `language-<tag>` class on the source region
//! or source text element, then a keyword prefix of the trimmed, lower-cased
//! text. Inconclusive blocks classify as `None` and are retried on the next
//! mutation.

use super::types::Dialect;

/// Leading keywords identifying Mermaid sources, compared lower-cased.
const MERMAID_KEYWORDS: &[&str] = &[
    "mermaid",
    "graph ",
    "flowchart ",
    "sequencediagram",
    "classdiagram",
    "statediagram",
    "erdiagram",
    "gantt",
    "pie",
    "gitgraph",
    "journey",
    "mindmap",
    "timeline",
    "quadrantchart",
    "xychart",
    "block-beta",
    "packet-beta",
    "kanban",
    "c4",
];

/// Leading keywords identifying PlantUML sources, compared lower-cased.
const PLANTUML_KEYWORDS: &[&str] = &["@startuml", "@startmindmap", "@startwbs", "@startgantt"];

/// Pure classifier honouring which dialects are enabled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Classifier {
    mermaid: bool,
    plantuml: bool,
}

impl Default for Classifier {
    fn default() -> Self {
        Self::new(true, true)
    }
}

impl Classifier {
    pub fn new(mermaid: bool, plantuml: bool) -> Self {
        Self { mermaid, plantuml }
    }

    fn enabled(&self, dialect: Dialect) -> bool {
        match dialect {
            Dialect::Mermaid => self.mermaid,
            Dialect::PlantUml => self.plantuml,
        }
    }

    /// Classify a block from its annotation classes and current text.
    ///
    /// An explicit annotation is authoritative: if it names a disabled
    /// dialect the block is not classified at all.
    pub fn classify(&self, annotations: &[&str], text: &str) -> Option<Dialect> {
        if let Some(dialect) = annotated_dialect(annotations) {
            return self.enabled(dialect).then_some(dialect);
        }

        let lowered = text.trim().to_lowercase();
        [
            (Dialect::Mermaid, MERMAID_KEYWORDS),
            (Dialect::PlantUml, PLANTUML_KEYWORDS),
        ]
        .into_iter()
        .filter(|(dialect, _)| self.enabled(*dialect))
        .find(|(_, keywords)| keywords.iter().any(|kw| lowered.starts_with(kw)))
        .map(|(dialect, _)| dialect)
    }
}

fn annotated_dialect(annotations: &[&str]) -> Option<Dialect> {
    annotations.iter().find_map(|class| {
        let lang = class
            .get(..9)
            .filter(|prefix| prefix.eq_ignore_ascii_case("language-"))
            .map(|_| &class[9..])?;
        if lang.eq_ignore_ascii_case("mermaid") {
            Some(Dialect::Mermaid)
        } else if lang.eq_ignore_ascii_case("plantuml") {
            Some(Dialect::PlantUml)
        } else {
            None
        }
    })
}
