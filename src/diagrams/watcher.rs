//! Mutation watcher: turns raw document changes into scanner and scheduler work.
//!
//! The watcher owns no state of its own. It routes each [`ChangeEvent`] to the
//! narrowest relevant block and returns [`WatchAction`]s for the engine to
//! execute, so it can be exercised against any [`Document`] without timers or
//! back-ends.

use super::document::{Document, NodeId, Selector};
use super::registry::BlockRegistry;
use super::types::BlockId;

/// One observed change in the host document.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeEvent {
    NodeInserted(NodeId),
    /// Text (or markup) under `node` changed.
    TextChanged(NodeId),
    NodeRemoved(NodeId),
    /// Backstop tick for the full-document sweep.
    PeriodicTick,
}

/// Source of document change events.
///
/// Implemented by whatever observes the host document; tests feed synthetic
/// events through [`MemoryDocument`](super::document::MemoryDocument).
pub trait ChangeFeed {
    /// Take every change recorded since the last call, oldest first.
    fn drain_changes(&mut self) -> Vec<ChangeEvent>;
}

/// Work requested by the watcher.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WatchAction {
    /// Run the scanner over this subtree (inclusive).
    Scan(NodeId),
    /// The source text of a registered block changed.
    Notify(BlockId),
    /// Deregister blocks that are no longer attached.
    Prune,
    /// Scan the whole document, then prune.
    Sweep,
}

/// Routes change events to blocks.
#[derive(Debug, Clone)]
pub struct MutationWatcher {
    block: Selector,
    processed_attribute: String,
}

impl MutationWatcher {
    pub fn new(block: Selector, processed_attribute: impl Into<String>) -> Self {
        Self {
            block,
            processed_attribute: processed_attribute.into(),
        }
    }

    fn is_processed<D: Document + ?Sized>(&self, doc: &D, block: NodeId) -> bool {
        doc.attribute(block, &self.processed_attribute).is_some()
    }

    /// Whether `node` lies inside the source text element of registered `block`.
    fn in_source_text<D: Document + ?Sized>(
        doc: &D,
        registry: &BlockRegistry,
        block: BlockId,
        node: NodeId,
    ) -> bool {
        registry
            .get(block)
            .is_some_and(|entry| doc.is_inclusive_ancestor(entry.parts.source_text, node))
    }

    /// Decide what `event` requires.
    pub fn route<D: Document + ?Sized>(
        &self,
        doc: &D,
        registry: &BlockRegistry,
        event: ChangeEvent,
    ) -> Vec<WatchAction> {
        match event {
            ChangeEvent::NodeInserted(node) => {
                if !doc.is_attached(node) {
                    return Vec::new();
                }
                if let Some(block) = doc.closest(node, &self.block) {
                    if block == node {
                        return vec![WatchAction::Scan(block)];
                    }
                    if registry.contains(block) {
                        if Self::in_source_text(doc, registry, block, node) {
                            return vec![WatchAction::Notify(block)];
                        }
                        return Vec::new();
                    }
                    if !self.is_processed(doc, block) {
                        return vec![WatchAction::Scan(block)];
                    }
                    return Vec::new();
                }
                doc.query_all(node, &self.block)
                    .into_iter()
                    .map(WatchAction::Scan)
                    .collect()
            }
            ChangeEvent::TextChanged(node) => {
                if !doc.is_attached(node) {
                    return Vec::new();
                }
                let Some(block) = doc.closest(node, &self.block) else {
                    return Vec::new();
                };
                if registry.contains(block) {
                    if Self::in_source_text(doc, registry, block, node) {
                        return vec![WatchAction::Notify(block)];
                    }
                    return Vec::new();
                }
                if self.is_processed(doc, block) {
                    Vec::new()
                } else {
                    vec![WatchAction::Scan(block)]
                }
            }
            ChangeEvent::NodeRemoved(_) => vec![WatchAction::Prune],
            ChangeEvent::PeriodicTick => vec![WatchAction::Sweep],
        }
    }
}
