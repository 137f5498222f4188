//! Display state machine for attached diagram blocks.
//!
//! Each block shows exactly one of its rendered artifact, an error panel or a
//! loading placeholder in its render target, with the source region hidden
//! while in graph mode. Errors are revealed only after a grace window so a
//! half-streamed diagram does not flash an error between tokens.
//!
//! # Sub-modules
//!
//! - [`machine`] — `DisplayMachine`: state, transitions and minimal repaint
//! - [`markup`] — HTML fragments for the loading placeholder and error panel

pub mod machine;
pub mod markup;

pub use machine::DisplayMachine;
