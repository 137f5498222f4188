//! Streaming diagram detection and rendering.
//!
//! Watches a host document whose code blocks grow while a response streams
//! in, recognises Mermaid and PlantUML sources, and renders them into SVG
//! behind a per-block toggle without flashing transient errors.
//!
//! # Module Structure
//!
//! ## Host Document
//! - [`document`] — the [`document::Document`] trait the pipeline drives, a
//!   minimal [`document::Selector`] and the in-memory [`document::MemoryDocument`].
//! - [`watcher`] — routes document [`watcher::ChangeEvent`]s to scans and
//!   per-block notifications.
//!
//! ## Detection
//! - [`classifier`] — decides whether text is a diagram and which dialect.
//! - [`scanner`] — attaches the toggle control and render target to new blocks.
//! - [`registry`] — owns per-block state for every attached block.
//!
//! ## Rendering
//! - [`scheduler`] — per-block debounce of source snapshots.
//! - [`pipeline`] — Mermaid (in-process) and PlantUML (HTTP) back-ends plus
//!   job executors.
//! - [`display`] — the per-block display state machine and its markup.
//! - [`timer`] — clocks and the timer queue behind debounce, grace and sweep.
//!
//! ## Coordination
//! - [`engine`] — [`engine::Engine`]: the single-threaded event loop tying
//!   everything together.
//!
//! ## Shared Types
//! - [`types`] — dialects, artifacts, failures and display states.
//! - [`error`] — error enums for documents, selectors, scanning and rendering.

pub mod classifier;
pub mod display;
pub mod document;
pub mod engine;
pub mod error;
pub mod pipeline;
pub mod registry;
pub mod scanner;
pub mod scheduler;
pub mod timer;
pub mod types;
pub mod watcher;

#[cfg(test)]
pub(crate) mod testing;

pub use classifier::Classifier;
pub use display::DisplayMachine;
pub use document::{Document, MemoryDocument, NodeId, Selector};
pub use engine::{Engine, UserAction};
pub use error::{DocumentError, RenderError, ScanError, SelectorError};
pub use pipeline::{
    InlineExecutor, ManualExecutor, RenderExecutor, RenderPipeline, TokioExecutor,
};
pub use registry::BlockRegistry;
pub use scanner::{AttachedBlock, BlockLayout, BlockScanner};
pub use scheduler::RenderScheduler;
pub use timer::{Clock, ManualClock, SystemClock};
pub use types::{BlockId, Dialect, DisplayState, RenderFailure, RenderResult, SvgArtifact};
pub use watcher::{ChangeEvent, ChangeFeed, MutationWatcher};
