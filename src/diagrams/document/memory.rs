//! Arena-backed in-memory document.
//!
//! Every structural or text mutation is recorded as a [`ChangeEvent`] so the
//! document doubles as the change feed for the watcher, the way a browser
//! mutation observer reports child-list and character-data changes.

use std::collections::BTreeMap;

use super::{Document, NodeId};
use crate::diagrams::error::DocumentError;
use crate::diagrams::watcher::{ChangeEvent, ChangeFeed};

#[derive(Debug, Clone)]
enum NodeKind {
    Element(String),
    Text(String),
}

#[derive(Debug, Clone)]
struct Node {
    kind: NodeKind,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
    classes: Vec<String>,
    attributes: BTreeMap<String, String>,
    hidden: bool,
    background: Option<String>,
    markup: Option<String>,
}

impl Node {
    fn new(kind: NodeKind) -> Self {
        Self {
            kind,
            parent: None,
            children: Vec::new(),
            classes: Vec::new(),
            attributes: BTreeMap::new(),
            hidden: false,
            background: None,
            markup: None,
        }
    }
}

/// In-memory [`Document`] with a `body` root element.
#[derive(Debug, Clone)]
pub struct MemoryDocument {
    nodes: Vec<Node>,
    root: NodeId,
    changes: Vec<ChangeEvent>,
}

impl Default for MemoryDocument {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryDocument {
    pub fn new() -> Self {
        let mut doc = Self {
            nodes: Vec::new(),
            root: NodeId::from_raw(0),
            changes: Vec::new(),
        };
        doc.root = doc.push(Node::new(NodeKind::Element("body".to_string())));
        doc
    }

    fn push(&mut self, node: Node) -> NodeId {
        let id = NodeId::from_raw(self.nodes.len() as u64);
        self.nodes.push(node);
        id
    }

    fn node(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(id.raw() as usize)
    }

    fn node_mut(&mut self, id: NodeId) -> Result<&mut Node, DocumentError> {
        self.nodes
            .get_mut(id.raw() as usize)
            .ok_or(DocumentError::UnknownNode(id))
    }

    fn detach(&mut self, id: NodeId) -> Result<(), DocumentError> {
        if let Some(parent) = self.node_mut(id)?.parent.take() {
            self.node_mut(parent)?.children.retain(|c| *c != id);
        }
        Ok(())
    }

    /// Create a detached element with the given classes.
    pub fn element(&mut self, tag: &str, classes: &[&str]) -> NodeId {
        let mut node = Node::new(NodeKind::Element(tag.to_ascii_lowercase()));
        node.classes = classes.iter().map(|c| c.to_string()).collect();
        self.push(node)
    }

    /// Create a detached text node.
    pub fn text(&mut self, text: &str) -> NodeId {
        self.push(Node::new(NodeKind::Text(text.to_string())))
    }

    pub fn add_class(&mut self, node: NodeId, class: &str) -> Result<(), DocumentError> {
        let node = self.node_mut(node)?;
        if !node.classes.iter().any(|c| c == class) {
            node.classes.push(class.to_string());
        }
        Ok(())
    }

    /// Append streamed text to `node`.
    ///
    /// A text node grows in place. An element grows its trailing text child,
    /// or gains a new one when its last child is not text.
    pub fn append_text(&mut self, node: NodeId, chunk: &str) -> Result<(), DocumentError> {
        let target = match &self.node(node).ok_or(DocumentError::UnknownNode(node))?.kind {
            NodeKind::Text(_) => Some(node),
            NodeKind::Element(_) => self
                .node(node)
                .and_then(|n| n.children.last().copied())
                .filter(|last| matches!(self.node(*last).map(|n| &n.kind), Some(NodeKind::Text(_)))),
        };

        match target {
            Some(text_node) => {
                if let NodeKind::Text(text) = &mut self.node_mut(text_node)?.kind {
                    text.push_str(chunk);
                }
                self.changes.push(ChangeEvent::TextChanged(text_node));
            }
            None => {
                let text_node = self.text(chunk);
                self.insert_before(node, text_node, None)?;
            }
        }
        Ok(())
    }

    /// Number of changes recorded and not yet drained.
    pub fn pending_changes(&self) -> usize {
        self.changes.len()
    }

    /// Number of nodes ever created, attached or not.
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }
}

impl Document for MemoryDocument {
    fn root(&self) -> NodeId {
        self.root
    }

    fn contains(&self, node: NodeId) -> bool {
        self.node(node).is_some()
    }

    fn parent(&self, node: NodeId) -> Option<NodeId> {
        self.node(node)?.parent
    }

    fn children(&self, node: NodeId) -> Vec<NodeId> {
        self.node(node).map(|n| n.children.clone()).unwrap_or_default()
    }

    fn tag_name(&self, node: NodeId) -> Option<&str> {
        match &self.node(node)?.kind {
            NodeKind::Element(tag) => Some(tag),
            NodeKind::Text(_) => None,
        }
    }

    fn classes(&self, node: NodeId) -> Vec<&str> {
        self.node(node)
            .map(|n| n.classes.iter().map(String::as_str).collect())
            .unwrap_or_default()
    }

    fn attribute(&self, node: NodeId, name: &str) -> Option<&str> {
        self.node(node)?.attributes.get(name).map(String::as_str)
    }

    fn text_content(&self, node: NodeId) -> String {
        let mut out = String::new();
        let mut stack = vec![node];
        while let Some(id) = stack.pop() {
            let Some(n) = self.node(id) else { continue };
            match &n.kind {
                NodeKind::Text(text) => out.push_str(text),
                NodeKind::Element(_) => stack.extend(n.children.iter().rev()),
            }
        }
        out
    }

    fn is_hidden(&self, node: NodeId) -> bool {
        self.node(node).is_some_and(|n| n.hidden)
    }

    fn inner_markup(&self, node: NodeId) -> Option<&str> {
        self.node(node)?.markup.as_deref()
    }

    fn background(&self, node: NodeId) -> Option<&str> {
        self.node(node)?.background.as_deref()
    }

    fn create_element(&mut self, tag: &str, classes: &[&str]) -> NodeId {
        self.element(tag, classes)
    }

    fn insert_before(
        &mut self,
        parent: NodeId,
        node: NodeId,
        reference: Option<NodeId>,
    ) -> Result<(), DocumentError> {
        if !self.contains(parent) {
            return Err(DocumentError::UnknownNode(parent));
        }
        if !self.contains(node) {
            return Err(DocumentError::UnknownNode(node));
        }
        if self.is_inclusive_ancestor(node, parent) {
            return Err(DocumentError::Cycle { parent, node });
        }
        if let Some(reference) = reference
            && self.parent(reference) != Some(parent)
        {
            return Err(DocumentError::NotAChild {
                parent,
                child: reference,
            });
        }

        self.detach(node)?;
        let siblings = &mut self.node_mut(parent)?.children;
        let index = reference
            .and_then(|r| siblings.iter().position(|c| *c == r))
            .unwrap_or(siblings.len());
        siblings.insert(index, node);
        self.node_mut(node)?.parent = Some(parent);
        self.changes.push(ChangeEvent::NodeInserted(node));
        Ok(())
    }

    fn remove(&mut self, node: NodeId) -> Result<(), DocumentError> {
        let parent = self.node(node).ok_or(DocumentError::UnknownNode(node))?.parent;
        self.detach(node)?;
        if parent.is_some() {
            self.changes.push(ChangeEvent::NodeRemoved(node));
        }
        Ok(())
    }

    fn set_attribute(
        &mut self,
        node: NodeId,
        name: &str,
        value: &str,
    ) -> Result<(), DocumentError> {
        self.node_mut(node)?
            .attributes
            .insert(name.to_string(), value.to_string());
        Ok(())
    }

    fn remove_attribute(&mut self, node: NodeId, name: &str) -> Result<(), DocumentError> {
        self.node_mut(node)?.attributes.remove(name);
        Ok(())
    }

    fn set_text(&mut self, node: NodeId, text: &str) -> Result<(), DocumentError> {
        let old_children = std::mem::take(&mut self.node_mut(node)?.children);
        for child in old_children {
            self.node_mut(child)?.parent = None;
        }
        let text_node = self.text(text);
        self.node_mut(text_node)?.parent = Some(node);
        self.node_mut(node)?.children.push(text_node);
        self.changes.push(ChangeEvent::TextChanged(node));
        Ok(())
    }

    fn set_inner_markup(&mut self, node: NodeId, markup: &str) -> Result<(), DocumentError> {
        self.node_mut(node)?.markup = Some(markup.to_string());
        self.changes.push(ChangeEvent::TextChanged(node));
        Ok(())
    }

    fn set_hidden(&mut self, node: NodeId, hidden: bool) -> Result<(), DocumentError> {
        self.node_mut(node)?.hidden = hidden;
        Ok(())
    }

    fn set_background(
        &mut self,
        node: NodeId,
        color: Option<&str>,
    ) -> Result<(), DocumentError> {
        self.node_mut(node)?.background = color.map(str::to_string);
        Ok(())
    }
}

impl ChangeFeed for MemoryDocument {
    fn drain_changes(&mut self) -> Vec<ChangeEvent> {
        std::mem::take(&mut self.changes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diagrams::document::Selector;

    #[test]
    fn test_append_and_query_in_document_order() {
        let mut doc = MemoryDocument::new();
        let root = doc.root();
        let a = doc.element("pre", &["first"]);
        let b = doc.element("div", &[]);
        let c = doc.element("pre", &["second"]);
        doc.append_child(root, a).unwrap();
        doc.append_child(root, b).unwrap();
        doc.append_child(b, c).unwrap();

        let pre = Selector::parse("pre").unwrap();
        assert_eq!(doc.query_all(root, &pre), vec![a, c]);
        assert_eq!(doc.query(b, &pre), Some(c));
        assert_eq!(doc.closest(c, &Selector::parse("div").unwrap()), Some(b));
    }

    #[test]
    fn test_insert_before_reference() {
        let mut doc = MemoryDocument::new();
        let root = doc.root();
        let second = doc.element("pre", &[]);
        doc.append_child(root, second).unwrap();
        let first = doc.element("div", &[]);
        doc.insert_before(root, first, Some(second)).unwrap();
        assert_eq!(doc.children(root), vec![first, second]);
    }

    #[test]
    fn test_insert_rejects_foreign_reference_and_cycles() {
        let mut doc = MemoryDocument::new();
        let root = doc.root();
        let outer = doc.element("div", &[]);
        let inner = doc.element("div", &[]);
        let stray = doc.element("span", &[]);
        doc.append_child(root, outer).unwrap();
        doc.append_child(outer, inner).unwrap();

        let err = doc.insert_before(root, stray, Some(inner)).unwrap_err();
        assert!(matches!(err, DocumentError::NotAChild { .. }));
        let err = doc.append_child(inner, outer).unwrap_err();
        assert!(matches!(err, DocumentError::Cycle { .. }));
    }

    #[test]
    fn test_append_text_grows_trailing_text_node() {
        let mut doc = MemoryDocument::new();
        let root = doc.root();
        let code = doc.element("code", &[]);
        doc.append_child(root, code).unwrap();
        doc.drain_changes();

        doc.append_text(code, "graph ").unwrap();
        doc.append_text(code, "TD").unwrap();
        assert_eq!(doc.text_content(code), "graph TD");
        assert_eq!(doc.children(code).len(), 1);

        let changes = doc.drain_changes();
        assert!(matches!(changes[0], ChangeEvent::NodeInserted(_)));
        assert!(matches!(changes[1], ChangeEvent::TextChanged(_)));
    }

    #[test]
    fn test_remove_detaches_subtree() {
        let mut doc = MemoryDocument::new();
        let root = doc.root();
        let block = doc.element("code-block", &[]);
        let pre = doc.element("pre", &[]);
        doc.append_child(root, block).unwrap();
        doc.append_child(block, pre).unwrap();
        assert!(doc.is_attached(pre));

        doc.remove(block).unwrap();
        assert!(!doc.is_attached(block));
        assert!(!doc.is_attached(pre));
        assert!(doc.contains(pre));
        assert_eq!(doc.drain_changes().last(), Some(&ChangeEvent::NodeRemoved(block)));
    }

    #[test]
    fn test_text_content_skips_markup_payload() {
        let mut doc = MemoryDocument::new();
        let root = doc.root();
        let div = doc.element("div", &[]);
        doc.append_child(root, div).unwrap();
        doc.set_inner_markup(div, "<svg></svg>").unwrap();
        assert_eq!(doc.text_content(div), "");
        assert_eq!(doc.inner_markup(div), Some("<svg></svg>"));
    }

    #[test]
    fn test_unknown_node_errors() {
        let mut doc = MemoryDocument::new();
        let ghost = NodeId::from_raw(999);
        assert_eq!(
            doc.set_hidden(ghost, true),
            Err(DocumentError::UnknownNode(ghost))
        );
        assert!(doc.children(ghost).is_empty());
        assert!(!doc.is_attached(ghost));
    }
}
