//! Per-block render debouncing.
//!
//! Each notification replaces the stored snapshot and restarts the block's
//! single debounce timer. When the timer fires the latest snapshot is handed
//! out once; a snapshot identical to the last one submitted is swallowed.

use std::time::Duration;

use super::timer::{TimerHandle, TimerKind, TimerQueue};
use super::types::BlockId;

#[derive(Debug)]
pub struct RenderScheduler {
    block: BlockId,
    debounce: Duration,
    pending: Option<TimerHandle>,
    latest: Option<String>,
    last_submitted: Option<String>,
}

impl RenderScheduler {
    pub fn new(block: BlockId, debounce: Duration) -> Self {
        Self {
            block,
            debounce,
            pending: None,
            latest: None,
            last_submitted: None,
        }
    }

    /// Record a new source snapshot and restart the debounce window.
    ///
    /// Text equal to the last submission is ignored unless a newer snapshot
    /// is already waiting.
    pub fn notify(&mut self, text: String, timers: &mut TimerQueue<TimerKind>, now: Duration) {
        if self.pending.is_none() && self.last_submitted.as_deref() == Some(text.as_str()) {
            return;
        }
        if let Some(handle) = self.pending.take() {
            timers.cancel(handle);
        }
        self.latest = Some(text);
        self.pending = Some(timers.schedule(now + self.debounce, TimerKind::Debounce(self.block)));
    }

    /// Source to render when `handle` fires, or `None` if the timer was
    /// superseded or the text has not changed since the last submission.
    pub fn fire(&mut self, handle: TimerHandle) -> Option<String> {
        if self.pending != Some(handle) {
            return None;
        }
        self.pending = None;
        let text = self.latest.take()?;
        self.submit(text)
    }

    /// Bypass the debounce window, e.g. for the initial render on attach.
    pub fn request_now(
        &mut self,
        text: String,
        timers: &mut TimerQueue<TimerKind>,
    ) -> Option<String> {
        if let Some(handle) = self.pending.take() {
            timers.cancel(handle);
        }
        self.latest = None;
        self.submit(text)
    }

    fn submit(&mut self, text: String) -> Option<String> {
        if self.last_submitted.as_deref() == Some(text.as_str()) {
            crate::debug_trace!("SCHEDULER", "Block {} unchanged; skipping render", self.block);
            return None;
        }
        self.last_submitted = Some(text.clone());
        Some(text)
    }

    /// Cancel the pending timer, if any.
    pub fn cancel(&mut self, timers: &mut TimerQueue<TimerKind>) {
        if let Some(handle) = self.pending.take() {
            timers.cancel(handle);
        }
        self.latest = None;
    }

    pub fn is_pending(&self) -> bool {
        self.pending.is_some()
    }
}
