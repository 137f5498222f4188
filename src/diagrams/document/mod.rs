//! Host document abstraction.
//!
//! The pipeline never touches a concrete DOM. Everything it needs from the
//! host (tree navigation, class and attribute queries, element creation and
//! the handful of presentation mutations the display performs) goes through
//! the [`Document`] trait. [`MemoryDocument`] is an arena-backed
//! implementation used by tests and the replay tool.

mod memory;
mod selector;

pub use memory::MemoryDocument;
pub use selector::Selector;

use std::fmt;

use super::error::DocumentError;

/// Stable identity of a node within one document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(u64);

impl NodeId {
    pub const fn from_raw(raw: u64) -> Self {
        Self(raw)
    }

    pub const fn raw(self) -> u64 {
        self.0
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Tree queries and mutations the diagram pipeline needs from its host.
///
/// Queries on an unknown node return empty results; mutations return
/// [`DocumentError::UnknownNode`].
pub trait Document {
    fn root(&self) -> NodeId;

    /// Whether `node` names a node of this document (attached or not).
    fn contains(&self, node: NodeId) -> bool;

    fn parent(&self, node: NodeId) -> Option<NodeId>;

    fn children(&self, node: NodeId) -> Vec<NodeId>;

    /// Lower-case tag name, `None` for text nodes.
    fn tag_name(&self, node: NodeId) -> Option<&str>;

    fn classes(&self, node: NodeId) -> Vec<&str>;

    fn attribute(&self, node: NodeId, name: &str) -> Option<&str>;

    /// Concatenated text of all descendant text nodes.
    fn text_content(&self, node: NodeId) -> String;

    fn is_hidden(&self, node: NodeId) -> bool;

    /// Raw markup payload previously written with [`Document::set_inner_markup`].
    fn inner_markup(&self, node: NodeId) -> Option<&str>;

    fn background(&self, node: NodeId) -> Option<&str>;

    /// Create a detached element.
    fn create_element(&mut self, tag: &str, classes: &[&str]) -> NodeId;

    /// Insert `node` under `parent` before `reference`, or last when `None`.
    ///
    /// A node that already has a parent is moved.
    fn insert_before(
        &mut self,
        parent: NodeId,
        node: NodeId,
        reference: Option<NodeId>,
    ) -> Result<(), DocumentError>;

    /// Detach `node` from its parent. Detaching a detached node is a no-op.
    fn remove(&mut self, node: NodeId) -> Result<(), DocumentError>;

    fn set_attribute(&mut self, node: NodeId, name: &str, value: &str)
    -> Result<(), DocumentError>;

    fn remove_attribute(&mut self, node: NodeId, name: &str) -> Result<(), DocumentError>;

    /// Replace all children of `node` with a single text node.
    fn set_text(&mut self, node: NodeId, text: &str) -> Result<(), DocumentError>;

    /// Replace the markup payload of `node`.
    fn set_inner_markup(&mut self, node: NodeId, markup: &str) -> Result<(), DocumentError>;

    fn set_hidden(&mut self, node: NodeId, hidden: bool) -> Result<(), DocumentError>;

    fn set_background(&mut self, node: NodeId, color: Option<&str>)
    -> Result<(), DocumentError>;

    // ── Provided helpers ────────────────────────────────────────────────

    fn has_class(&self, node: NodeId, class: &str) -> bool {
        self.classes(node).iter().any(|c| *c == class)
    }

    fn first_child(&self, node: NodeId) -> Option<NodeId> {
        self.children(node).first().copied()
    }

    fn append_child(&mut self, parent: NodeId, node: NodeId) -> Result<(), DocumentError> {
        self.insert_before(parent, node, None)
    }

    /// Whether `ancestor` is `node` or one of its ancestors.
    fn is_inclusive_ancestor(&self, ancestor: NodeId, node: NodeId) -> bool {
        let mut current = Some(node);
        while let Some(n) = current {
            if n == ancestor {
                return true;
            }
            current = self.parent(n);
        }
        false
    }

    /// Whether `node` is reachable from the document root.
    fn is_attached(&self, node: NodeId) -> bool {
        self.contains(node) && self.is_inclusive_ancestor(self.root(), node)
    }

    fn matches(&self, node: NodeId, selector: &Selector) -> bool {
        selector.matches(self, node)
    }

    /// Nearest inclusive ancestor of `node` matching `selector`.
    fn closest(&self, node: NodeId, selector: &Selector) -> Option<NodeId> {
        let mut current = Some(node);
        while let Some(n) = current {
            if selector.matches(self, n) {
                return Some(n);
            }
            current = self.parent(n);
        }
        None
    }

    /// First descendant of `scope` (excluding `scope`) matching `selector`, in document order.
    fn query(&self, scope: NodeId, selector: &Selector) -> Option<NodeId> {
        let mut stack: Vec<NodeId> = self.children(scope).into_iter().rev().collect();
        while let Some(node) = stack.pop() {
            if selector.matches(self, node) {
                return Some(node);
            }
            stack.extend(self.children(node).into_iter().rev());
        }
        None
    }

    /// All descendants of `scope` (excluding `scope`) matching `selector`, in document order.
    fn query_all(&self, scope: NodeId, selector: &Selector) -> Vec<NodeId> {
        let mut found = Vec::new();
        let mut stack: Vec<NodeId> = self.children(scope).into_iter().rev().collect();
        while let Some(node) = stack.pop() {
            if selector.matches(self, node) {
                found.push(node);
            }
            stack.extend(self.children(node).into_iter().rev());
        }
        found
    }
}
