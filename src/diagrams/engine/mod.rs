//! Event loop tying the watcher, scanner, registry, schedulers, render
//! executor and display machines together.
//!
//! Sub-modules:
//! - [`engine_impl`] — `Engine` struct and all methods

mod engine_impl;

#[cfg(test)]
mod tests;

pub use engine_impl::Engine;

use super::types::BlockId;

/// User interaction with a block's controls.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UserAction {
    /// The toggle control was activated.
    Toggle(BlockId),
    /// The error panel's view-source control was activated.
    ViewSource(BlockId),
}
