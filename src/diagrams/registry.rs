//! Block registry: the explicit owner of every attached block's scheduler
//! and display machine.

use std::collections::HashMap;

use super::display::DisplayMachine;
use super::document::{Document, NodeId};
use super::scanner::AttachedBlock;
use super::scheduler::RenderScheduler;
use super::timer::{TimerKind, TimerQueue};
use super::types::BlockId;

#[derive(Debug)]
pub struct BlockEntry {
    pub parts: AttachedBlock,
    pub scheduler: RenderScheduler,
    pub display: DisplayMachine,
}

#[derive(Debug, Default)]
pub struct BlockRegistry {
    entries: HashMap<BlockId, BlockEntry>,
    /// Toggle control node -> owning block.
    by_control: HashMap<NodeId, BlockId>,
}

impl BlockRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, entry: BlockEntry) {
        let block = entry.parts.block;
        self.by_control.insert(entry.parts.toggle, block);
        self.entries.insert(block, entry);
    }

    pub fn contains(&self, block: BlockId) -> bool {
        self.entries.contains_key(&block)
    }

    pub fn get(&self, block: BlockId) -> Option<&BlockEntry> {
        self.entries.get(&block)
    }

    pub fn get_mut(&mut self, block: BlockId) -> Option<&mut BlockEntry> {
        self.entries.get_mut(&block)
    }

    /// Block owning the toggle control `node`.
    pub fn block_for_control(&self, node: NodeId) -> Option<BlockId> {
        self.by_control.get(&node).copied()
    }

    /// Remove `block`, cancelling its debounce and grace timers.
    ///
    /// Returns the nodes the block was attached with, so the caller can
    /// release them.
    pub fn deregister(
        &mut self,
        block: BlockId,
        timers: &mut TimerQueue<TimerKind>,
    ) -> Option<AttachedBlock> {
        let mut entry = self.entries.remove(&block)?;
        entry.scheduler.cancel(timers);
        entry.display.cancel(timers);
        self.by_control.remove(&entry.parts.toggle);
        crate::debug_info!("REGISTRY", "Deregistered block {}", block);
        Some(entry.parts)
    }

    /// Deregister every block no longer attached to the document.
    pub fn prune<D: Document + ?Sized>(
        &mut self,
        doc: &D,
        timers: &mut TimerQueue<TimerKind>,
    ) -> Vec<AttachedBlock> {
        let mut detached: Vec<BlockId> = self
            .entries
            .keys()
            .copied()
            .filter(|block| !doc.is_attached(*block))
            .collect();
        detached.sort();
        detached
            .into_iter()
            .filter_map(|block| self.deregister(block, timers))
            .collect()
    }

    pub fn values_mut(&mut self) -> impl Iterator<Item = &mut BlockEntry> {
        self.entries.values_mut()
    }

    pub fn ids(&self) -> Vec<BlockId> {
        let mut ids: Vec<BlockId> = self.entries.keys().copied().collect();
        ids.sort();
        ids
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
