//! Cancellable timers over a pluggable clock.
//!
//! Deadlines are offsets from an arbitrary clock origin. [`SystemClock`]
//! measures wall time; [`ManualClock`] only moves when told to, which makes
//! debounce and grace behaviour deterministic under test.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

use super::types::BlockId;

/// Monotonic time source.
pub trait Clock: Send + Sync {
    /// Time elapsed since the clock's origin.
    fn now(&self) -> Duration;
}

/// Wall-clock time measured from construction.
#[derive(Debug, Clone, Copy)]
pub struct SystemClock {
    origin: Instant,
}

impl SystemClock {
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
        }
    }
}

impl Default for SystemClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for SystemClock {
    fn now(&self) -> Duration {
        self.origin.elapsed()
    }
}

/// Virtual clock advanced explicitly. Clones share the same time.
#[derive(Debug, Clone, Default)]
pub struct ManualClock {
    nanos: Arc<AtomicU64>,
}

impl ManualClock {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn advance(&self, by: Duration) {
        let by = u64::try_from(by.as_nanos()).unwrap_or(u64::MAX);
        self.nanos.fetch_add(by, Ordering::SeqCst);
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Duration {
        Duration::from_nanos(self.nanos.load(Ordering::SeqCst))
    }
}

/// Handle to a scheduled timer; used to cancel it or recognise it on expiry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TimerHandle(u64);

/// What a timer does when it fires.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimerKind {
    /// A block's debounce window elapsed.
    Debounce(BlockId),
    /// A block's error grace window elapsed.
    ErrorGrace(BlockId),
    /// Periodic full-document sweep.
    Sweep,
}

/// Deadline-ordered set of pending timers.
///
/// Timers with equal deadlines fire in scheduling order.
#[derive(Debug)]
pub struct TimerQueue<K> {
    next_id: u64,
    by_deadline: BTreeMap<(Duration, u64), K>,
    deadlines: HashMap<u64, Duration>,
}

impl<K> Default for TimerQueue<K> {
    fn default() -> Self {
        Self {
            next_id: 0,
            by_deadline: BTreeMap::new(),
            deadlines: HashMap::new(),
        }
    }
}

impl<K> TimerQueue<K> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn schedule(&mut self, deadline: Duration, kind: K) -> TimerHandle {
        let id = self.next_id;
        self.next_id += 1;
        self.by_deadline.insert((deadline, id), kind);
        self.deadlines.insert(id, deadline);
        TimerHandle(id)
    }

    /// Cancel a pending timer. Returns false if it already fired or was cancelled.
    pub fn cancel(&mut self, handle: TimerHandle) -> bool {
        match self.deadlines.remove(&handle.0) {
            Some(deadline) => self.by_deadline.remove(&(deadline, handle.0)).is_some(),
            None => false,
        }
    }

    pub fn is_pending(&self, handle: TimerHandle) -> bool {
        self.deadlines.contains_key(&handle.0)
    }

    /// Remove and return the earliest timer whose deadline is at or before `now`.
    pub fn pop_expired(&mut self, now: Duration) -> Option<(TimerHandle, K)> {
        let (&(deadline, id), _) = self.by_deadline.first_key_value()?;
        if deadline > now {
            return None;
        }
        let kind = self.by_deadline.remove(&(deadline, id))?;
        self.deadlines.remove(&id);
        Some((TimerHandle(id), kind))
    }

    pub fn next_deadline(&self) -> Option<Duration> {
        self.by_deadline.keys().next().map(|(deadline, _)| *deadline)
    }

    pub fn len(&self) -> usize {
        self.deadlines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.deadlines.is_empty()
    }
}
