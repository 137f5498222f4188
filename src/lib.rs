// Library exports for the diagram pipeline and the replay tool.
//
// # Threading
//
// The diagram engine is single-threaded: every document mutation, timer and
// completion is handled on the thread that owns the `Engine`. Only render
// jobs leave that thread, through a `RenderExecutor`. Shared state inside the
// executors uses `parking_lot::Mutex`; nothing holds a lock across a render.

/// Crate version, reported by the replay tool.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[macro_use]
pub mod debug;

pub mod cli;
pub mod diagrams;
pub mod http;
pub mod replay;

pub use chat_diagrams_config as config;
