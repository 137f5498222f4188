//! The single-threaded coordinator, [`Engine`].
//!
//! Everything that touches the document or per-block state runs inside
//! [`Engine::handle_change`], [`Engine::handle_action`] or [`Engine::poll`].
//! Renders run on the injected [`RenderExecutor`]; their completions come
//! back through `poll`.

use std::sync::Arc;
use std::time::Duration;

use chat_diagrams_config::Config;

use super::UserAction;
use crate::diagrams::classifier::Classifier;
use crate::diagrams::display::DisplayMachine;
use crate::diagrams::document::{Document, NodeId};
use crate::diagrams::error::SelectorError;
use crate::diagrams::pipeline::{RenderCompletion, RenderExecutor, RenderJob};
use crate::diagrams::registry::{BlockEntry, BlockRegistry};
use crate::diagrams::scanner::{AttachedBlock, BlockLayout, BlockScanner};
use crate::diagrams::scheduler::RenderScheduler;
use crate::diagrams::timer::{Clock, TimerHandle, TimerKind, TimerQueue};
use crate::diagrams::types::{BlockId, DisplayState};
use crate::diagrams::watcher::{ChangeEvent, ChangeFeed, MutationWatcher, WatchAction};

/// Sweeps are never scheduled closer together than this.
const MIN_SWEEP_INTERVAL: Duration = Duration::from_millis(1);

/// Upper bound on rounds in [`Engine::settle`].
const MAX_SETTLE_ROUNDS: usize = 64;

/// Owns the host document and drives every attached block.
pub struct Engine<D: Document> {
    doc: D,
    scanner: BlockScanner,
    watcher: MutationWatcher,
    registry: BlockRegistry,
    timers: TimerQueue<TimerKind>,
    executor: Box<dyn RenderExecutor>,
    clock: Arc<dyn Clock>,
    debounce: Duration,
    error_grace: Duration,
    sweep_interval: Duration,
    sweep_timer: Option<TimerHandle>,
    /// Jobs submitted whose completion has not been polled yet.
    in_flight: usize,
}

impl<D: Document> Engine<D> {
    /// Build an engine over `doc`. Selectors come from `config`; disabled
    /// dialects are never classified.
    pub fn new(
        doc: D,
        config: &Config,
        executor: Box<dyn RenderExecutor>,
        clock: Arc<dyn Clock>,
    ) -> Result<Self, SelectorError> {
        let layout = BlockLayout::from_config(config)?;
        let watcher = MutationWatcher::new(layout.block.clone(), layout.processed_attribute.clone());
        let classifier = Classifier::new(config.mermaid.enabled, config.plantuml.enabled);

        Ok(Self {
            doc,
            scanner: BlockScanner::new(layout, classifier),
            watcher,
            registry: BlockRegistry::new(),
            timers: TimerQueue::new(),
            executor,
            clock,
            debounce: config.debounce(),
            error_grace: config.error_grace(),
            sweep_interval: config.sweep_interval().max(MIN_SWEEP_INTERVAL),
            sweep_timer: None,
            in_flight: 0,
        })
    }

    pub fn document(&self) -> &D {
        &self.doc
    }

    /// Mutable access for the host; changes must still be reported through
    /// [`handle_change`](Self::handle_change) or a [`ChangeFeed`].
    pub fn document_mut(&mut self) -> &mut D {
        &mut self.doc
    }

    pub fn registry(&self) -> &BlockRegistry {
        &self.registry
    }

    pub fn state(&self, block: BlockId) -> Option<DisplayState> {
        self.registry.get(block).map(|entry| entry.display.state())
    }

    /// Display state of every registered block, in document-creation order.
    pub fn block_states(&self) -> Vec<(BlockId, DisplayState)> {
        self.registry
            .ids()
            .into_iter()
            .filter_map(|block| self.state(block).map(|state| (block, state)))
            .collect()
    }

    pub fn in_flight(&self) -> usize {
        self.in_flight
    }

    /// Earliest pending timer deadline, including the sweep.
    pub fn next_deadline(&self) -> Option<Duration> {
        self.timers.next_deadline()
    }

    /// No render in flight and no debounce or grace timer pending.
    pub fn is_idle(&self) -> bool {
        let sweep_pending = self
            .sweep_timer
            .is_some_and(|handle| self.timers.is_pending(handle));
        let block_timers = self.timers.len() - usize::from(sweep_pending);
        self.in_flight == 0 && block_timers == 0
    }

    /// Initial full scan; also starts the periodic sweep.
    pub fn start(&mut self) {
        crate::debug_info!("ENGINE", "Starting diagram engine");
        self.sweep();
        self.paint_all();
    }

    /// Route one document change and act on it.
    pub fn handle_change(&mut self, event: ChangeEvent) {
        crate::debug_trace!("WATCHER", "Change {:?}", event);
        let actions = self.watcher.route(&self.doc, &self.registry, event);
        for action in actions {
            self.apply(action);
        }
        self.paint_all();
    }

    fn apply(&mut self, action: WatchAction) {
        match action {
            WatchAction::Scan(scope) => {
                let attached = self.scanner.scan(&mut self.doc, scope);
                self.attach_all(attached);
            }
            WatchAction::Notify(block) => self.notify(block),
            WatchAction::Prune => self.prune(),
            WatchAction::Sweep => self.sweep(),
        }
    }

    fn sweep(&mut self) {
        let attached = self.scanner.scan_document(&mut self.doc);
        if !attached.is_empty() {
            crate::debug_log!("WATCHER", "Sweep attached {} block(s)", attached.len());
        }
        self.attach_all(attached);
        self.prune();

        if let Some(handle) = self.sweep_timer.take() {
            self.timers.cancel(handle);
        }
        let deadline = self.clock.now() + self.sweep_interval;
        self.sweep_timer = Some(self.timers.schedule(deadline, TimerKind::Sweep));
    }

    /// Deregister detached blocks and strip what attaching added to them.
    fn prune(&mut self) {
        for parts in self.registry.prune(&self.doc, &mut self.timers) {
            if let Err(e) = self.scanner.release(&mut self.doc, &parts) {
                crate::debug_warn!("ENGINE", "Failed to release block {}: {}", parts.block, e);
            }
        }
    }

    fn attach_all(&mut self, attached: Vec<AttachedBlock>) {
        for parts in attached {
            self.attach(parts);
        }
    }

    /// Register a freshly attached block and render it right away.
    fn attach(&mut self, parts: AttachedBlock) {
        let block = parts.block;
        self.registry.register(BlockEntry {
            parts,
            scheduler: RenderScheduler::new(block, self.debounce),
            display: DisplayMachine::new(block, parts.dialect, self.error_grace),
        });

        let text = self.doc.text_content(parts.source_text);
        let Some(entry) = self.registry.get_mut(block) else {
            return;
        };
        if let Some(source) = entry.scheduler.request_now(text, &mut self.timers) {
            let seq = entry.display.begin_request(&mut self.timers);
            self.executor.submit(RenderJob {
                block,
                seq,
                dialect: parts.dialect,
                source,
            });
            self.in_flight += 1;
        }
    }

    fn notify(&mut self, block: BlockId) {
        let Some(entry) = self.registry.get_mut(block) else {
            return;
        };
        let text = self.doc.text_content(entry.parts.source_text);
        let now = self.clock.now();
        entry.scheduler.notify(text, &mut self.timers, now);
    }

    /// Apply a user interaction. Returns false if it had no effect.
    pub fn handle_action(&mut self, action: UserAction) -> bool {
        let applied = match action {
            UserAction::Toggle(block) => match self.registry.get_mut(block) {
                Some(entry) => {
                    entry.display.toggle();
                    true
                }
                None => false,
            },
            UserAction::ViewSource(block) => self
                .registry
                .get_mut(block)
                .is_some_and(|entry| entry.display.view_source()),
        };
        if applied {
            crate::debug_log!("ENGINE", "Applied {:?}", action);
            self.paint_all();
        }
        applied
    }

    /// Activate the control node `node` (e.g. a click on a toggle).
    pub fn activate_control(&mut self, node: NodeId) -> bool {
        match self.registry.block_for_control(node) {
            Some(block) => self.handle_action(UserAction::Toggle(block)),
            None => false,
        }
    }

    /// Deliver render completions and fire expired timers, then repaint.
    ///
    /// Returns the number of completions and timers handled.
    pub fn poll(&mut self) -> usize {
        let mut handled = 0;

        for completion in self.executor.poll_completions() {
            self.complete(completion);
            handled += 1;
        }

        let now = self.clock.now();
        while let Some((handle, kind)) = self.timers.pop_expired(now) {
            handled += 1;
            match kind {
                TimerKind::Debounce(block) => self.debounce_fired(block, handle),
                TimerKind::ErrorGrace(block) => {
                    if let Some(entry) = self.registry.get_mut(block) {
                        entry.display.grace_expired(handle);
                    }
                }
                TimerKind::Sweep => {
                    if self.sweep_timer == Some(handle) {
                        self.sweep_timer = None;
                    }
                    self.sweep();
                }
            }
        }

        if handled > 0 {
            self.paint_all();
        }
        handled
    }

    fn complete(&mut self, completion: RenderCompletion) {
        self.in_flight = self.in_flight.saturating_sub(1);
        let now = self.clock.now();
        match self.registry.get_mut(completion.block) {
            Some(entry) => {
                entry
                    .display
                    .complete(completion.seq, completion.result, &mut self.timers, now);
            }
            None => crate::debug_log!(
                "ENGINE",
                "Dropping result for deregistered block {}",
                completion.block
            ),
        }
    }

    fn debounce_fired(&mut self, block: BlockId, handle: TimerHandle) {
        let Some(entry) = self.registry.get_mut(block) else {
            return;
        };
        let Some(source) = entry.scheduler.fire(handle) else {
            return;
        };
        let seq = entry.display.begin_request(&mut self.timers);
        crate::debug_log!("SCHEDULER", "Block {} render request {}", block, seq);
        self.executor.submit(RenderJob {
            block,
            seq,
            dialect: entry.parts.dialect,
            source,
        });
        self.in_flight += 1;
    }

    fn paint_all(&mut self) {
        for entry in self.registry.values_mut() {
            if let Err(e) = entry.display.paint(&mut self.doc, &entry.parts) {
                crate::debug_warn!("DISPLAY", "Failed to paint block {}: {}", entry.parts.block, e);
            }
        }
    }
}

impl<D: Document + ChangeFeed> Engine<D> {
    /// Route every change the document recorded since the last call.
    ///
    /// Returns the number of events drained.
    pub fn pump_document_changes(&mut self) -> usize {
        let events = self.doc.drain_changes();
        let count = events.len();
        for event in events {
            self.handle_change(event);
        }
        count
    }

    /// One loop turn: document changes, then completions and timers.
    pub fn step(&mut self) -> usize {
        self.pump_document_changes() + self.poll()
    }

    /// Step until nothing more happens at the current instant.
    ///
    /// Does not advance the clock; pending timers stay pending.
    pub fn settle(&mut self) {
        for _ in 0..MAX_SETTLE_ROUNDS {
            if self.step() == 0 {
                return;
            }
        }
        crate::debug_warn!("ENGINE", "Engine did not settle in {} rounds", MAX_SETTLE_ROUNDS);
    }
}
