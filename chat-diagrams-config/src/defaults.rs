//! Default value functions for configuration.
//!
//! Each function backs a `#[serde(default = "crate::defaults::...")]`
//! attribute on a config field.

// ── Primitive helpers ──────────────────────────────────────────────────────

pub fn bool_true() -> bool {
    true
}

// ── Timing policy ──────────────────────────────────────────────────────────

/// Quiet time after the last streamed token before a block re-renders.
pub fn debounce_ms() -> u64 {
    500
}

/// Delay before a render error is shown to the user.
pub fn error_grace_ms() -> u64 {
    2000
}

/// Interval of the full-document backstop sweep.
pub fn sweep_interval_ms() -> u64 {
    2000
}

// ── Mermaid ────────────────────────────────────────────────────────────────

pub fn mermaid_theme() -> String {
    "modern".to_string()
}

// ── PlantUML ───────────────────────────────────────────────────────────────

pub fn plantuml_server() -> String {
    "https://www.plantuml.com/plantuml".to_string()
}

pub fn plantuml_timeout_secs() -> u64 {
    15
}

// ── Host document ──────────────────────────────────────────────────────────

pub fn block_selector() -> String {
    "code-block".to_string()
}

pub fn header_selector() -> String {
    ".code-block-decoration.header-formatted".to_string()
}

pub fn header_buttons_selector() -> String {
    ".buttons".to_string()
}

pub fn source_region_selector() -> String {
    "pre".to_string()
}

pub fn source_text_selector() -> String {
    "code".to_string()
}

pub fn processed_attribute() -> String {
    "data-diagram-renderer-processed".to_string()
}
