//! Configuration system for chat-diagrams.
//!
//! This crate provides configuration loading, validation, and default values
//! for the streaming diagram renderer. It includes:
//!
//! - Timing policy (debounce window, error grace window, sweep interval)
//! - Per-dialect back-end settings (Mermaid layout engine, PlantUML server)
//! - Host document selectors used to locate code blocks and their parts
//! - Log verbosity

pub mod config;
pub mod defaults;
mod error;
mod types;

pub use config::{Config, MermaidConfig, PlantUmlConfig, SelectorConfig};
pub use error::ConfigError;
pub use types::LogLevel;
