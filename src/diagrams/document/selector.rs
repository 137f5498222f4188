//! Minimal structural selectors: `tag`, `.class`, `.a.b` and `tag.class`.

use std::fmt;
use std::str::FromStr;

use super::{Document, NodeId};
use crate::diagrams::error::SelectorError;

/// A compound selector matching a tag name and/or a set of classes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Selector {
    tag: Option<String>,
    classes: Vec<String>,
}

fn is_ident(s: &str) -> bool {
    !s.is_empty()
        && s
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
}

impl Selector {
    pub fn parse(input: &str) -> Result<Self, SelectorError> {
        let input = input.trim();
        if input.is_empty() {
            return Err(SelectorError::Empty);
        }

        let mut parts = input.split('.');
        let tag = match parts.next() {
            Some("") | None => None,
            Some(tag) if is_ident(tag) => Some(tag.to_ascii_lowercase()),
            Some(_) => return Err(SelectorError::Unsupported(input.to_string())),
        };

        let mut classes = Vec::new();
        for class in parts {
            if !is_ident(class) {
                return Err(SelectorError::Unsupported(input.to_string()));
            }
            classes.push(class.to_string());
        }

        if tag.is_none() && classes.is_empty() {
            return Err(SelectorError::Unsupported(input.to_string()));
        }
        Ok(Self { tag, classes })
    }

    /// Whether `node` is an element satisfying every part of the selector.
    pub fn matches<D: Document + ?Sized>(&self, doc: &D, node: NodeId) -> bool {
        let Some(tag) = doc.tag_name(node) else {
            return false;
        };
        if let Some(want) = &self.tag
            && !tag.eq_ignore_ascii_case(want)
        {
            return false;
        }
        self.classes.iter().all(|class| doc.has_class(node, class))
    }
}

impl FromStr for Selector {
    type Err = SelectorError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Selector::parse(s)
    }
}

impl fmt::Display for Selector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(tag) = &self.tag {
            f.write_str(tag)?;
        }
        for class in &self.classes {
            write!(f, ".{class}")?;
        }
        Ok(())
    }
}
