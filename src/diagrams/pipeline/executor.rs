//! Running render jobs off the event loop and handing results back.
//!
//! The engine submits [`RenderJob`]s and later collects
//! [`RenderCompletion`]s from the same executor during `poll`. In-flight
//! jobs are never cancelled; stale completions are filtered by sequence
//! number on arrival.

use std::collections::VecDeque;
use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::mpsc;

use super::RenderPipeline;
use crate::diagrams::types::{BlockId, Dialect, RenderResult};

/// One render request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderJob {
    pub block: BlockId,
    /// Per-block request sequence number.
    pub seq: u64,
    pub dialect: Dialect,
    pub source: String,
}

/// Result of one [`RenderJob`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderCompletion {
    pub block: BlockId,
    pub seq: u64,
    pub result: RenderResult,
}

pub trait RenderExecutor {
    fn submit(&mut self, job: RenderJob);

    /// Completions that arrived since the last call.
    fn poll_completions(&mut self) -> Vec<RenderCompletion>;
}

/// Renders synchronously inside `submit`; results surface on the next poll.
pub struct InlineExecutor {
    pipeline: Arc<RenderPipeline>,
    done: VecDeque<RenderCompletion>,
}

impl InlineExecutor {
    pub fn new(pipeline: Arc<RenderPipeline>) -> Self {
        Self {
            pipeline,
            done: VecDeque::new(),
        }
    }
}

impl RenderExecutor for InlineExecutor {
    fn submit(&mut self, job: RenderJob) {
        let result = self.pipeline.render(job.dialect, &job.source);
        self.done.push_back(RenderCompletion {
            block: job.block,
            seq: job.seq,
            result,
        });
    }

    fn poll_completions(&mut self) -> Vec<RenderCompletion> {
        self.done.drain(..).collect()
    }
}

/// Runs jobs on Tokio's blocking pool and receives results over a channel.
pub struct TokioExecutor {
    handle: tokio::runtime::Handle,
    pipeline: Arc<RenderPipeline>,
    tx: mpsc::UnboundedSender<RenderCompletion>,
    rx: mpsc::UnboundedReceiver<RenderCompletion>,
}

impl TokioExecutor {
    pub fn new(handle: tokio::runtime::Handle, pipeline: Arc<RenderPipeline>) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        Self {
            handle,
            pipeline,
            tx,
            rx,
        }
    }
}

impl RenderExecutor for TokioExecutor {
    fn submit(&mut self, job: RenderJob) {
        let pipeline = Arc::clone(&self.pipeline);
        let tx = self.tx.clone();
        self.handle.spawn_blocking(move || {
            let result = pipeline.render(job.dialect, &job.source);
            // The receiver only goes away when the engine is dropped.
            let _ = tx.send(RenderCompletion {
                block: job.block,
                seq: job.seq,
                result,
            });
        });
    }

    fn poll_completions(&mut self) -> Vec<RenderCompletion> {
        let mut out = Vec::new();
        while let Ok(completion) = self.rx.try_recv() {
            out.push(completion);
        }
        out
    }
}

#[derive(Default)]
struct ManualState {
    submitted: Vec<RenderJob>,
    ready: VecDeque<RenderCompletion>,
}

/// Executor whose jobs are resolved explicitly, in any order.
///
/// Clones share state: hand one to the engine and keep one to resolve jobs.
#[derive(Clone, Default)]
pub struct ManualExecutor {
    state: Arc<Mutex<ManualState>>,
}

impl ManualExecutor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Jobs submitted and not yet resolved, oldest first.
    pub fn pending(&self) -> Vec<RenderJob> {
        self.state.lock().submitted.clone()
    }

    /// Resolve the job for `(block, seq)` with `result`.
    ///
    /// Returns false if no such job is pending.
    pub fn resolve(&self, block: BlockId, seq: u64, result: RenderResult) -> bool {
        let mut state = self.state.lock();
        let Some(index) = state
            .submitted
            .iter()
            .position(|job| job.block == block && job.seq == seq)
        else {
            return false;
        };
        state.submitted.remove(index);
        state.ready.push_back(RenderCompletion { block, seq, result });
        true
    }

    /// Resolve every pending job through `pipeline`, oldest first.
    pub fn resolve_all_with(&self, pipeline: &RenderPipeline) -> usize {
        let jobs = std::mem::take(&mut self.state.lock().submitted);
        let count = jobs.len();
        for job in jobs {
            let result = pipeline.render(job.dialect, &job.source);
            self.state.lock().ready.push_back(RenderCompletion {
                block: job.block,
                seq: job.seq,
                result,
            });
        }
        count
    }
}

impl RenderExecutor for ManualExecutor {
    fn submit(&mut self, job: RenderJob) {
        self.state.lock().submitted.push(job);
    }

    fn poll_completions(&mut self) -> Vec<RenderCompletion> {
        self.state.lock().ready.drain(..).collect()
    }
}
