//! The `Config` struct and its loading / validation methods.
//!
//! Every field carries a serde default so a partial (or empty) YAML document
//! yields a usable configuration.

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::types::LogLevel;

/// Top-level configuration for the diagram renderer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// Quiet time (ms) after the last text change before a block re-renders.
    #[serde(default = "crate::defaults::debounce_ms")]
    pub debounce_ms: u64,

    /// Delay (ms) between a render failure and the error becoming visible.
    #[serde(default = "crate::defaults::error_grace_ms")]
    pub error_grace_ms: u64,

    /// Interval (ms) of the idempotent full-document sweep.
    #[serde(default = "crate::defaults::sweep_interval_ms")]
    pub sweep_interval_ms: u64,

    #[serde(default)]
    pub mermaid: MermaidConfig,

    #[serde(default)]
    pub plantuml: PlantUmlConfig,

    #[serde(default)]
    pub selectors: SelectorConfig,

    /// Attribute written onto a block once it has been attached.
    #[serde(default = "crate::defaults::processed_attribute")]
    pub processed_attribute: String,

    #[serde(default)]
    pub log_level: LogLevel,
}

/// In-process Mermaid layout engine settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MermaidConfig {
    /// Whether Mermaid blocks are detected at all.
    #[serde(default = "crate::defaults::bool_true")]
    pub enabled: bool,

    /// Base theme name ("modern" is the only built-in).
    #[serde(default = "crate::defaults::mermaid_theme")]
    pub theme: String,

    /// Font family override for diagram text.
    #[serde(default)]
    pub font_family: Option<String>,

    /// Background colour override (e.g. "#ffffff").
    #[serde(default)]
    pub background: Option<String>,
}

impl Default for MermaidConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            theme: crate::defaults::mermaid_theme(),
            font_family: None,
            background: None,
        }
    }
}

/// Remote PlantUML service settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlantUmlConfig {
    /// Whether PlantUML blocks are detected at all.
    #[serde(default = "crate::defaults::bool_true")]
    pub enabled: bool,

    /// Base URL of the PlantUML server, without the trailing `/svg/...` path.
    #[serde(default = "crate::defaults::plantuml_server")]
    pub server: String,

    /// Global timeout for the single request/response round trip.
    #[serde(default = "crate::defaults::plantuml_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for PlantUmlConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            server: crate::defaults::plantuml_server(),
            timeout_secs: crate::defaults::plantuml_timeout_secs(),
        }
    }
}

/// Selectors describing the host document's code block structure.
///
/// Supported forms are `tag`, `.class`, `.class.other` and `tag.class`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SelectorConfig {
    #[serde(default = "crate::defaults::block_selector")]
    pub block: String,

    #[serde(default = "crate::defaults::header_selector")]
    pub header: String,

    /// Button container inside the header; the toggle is prepended here when present.
    #[serde(default = "crate::defaults::header_buttons_selector")]
    pub header_buttons: String,

    /// Region hidden while the diagram is shown.
    #[serde(default = "crate::defaults::source_region_selector")]
    pub source_region: String,

    /// Element whose text content is the diagram source.
    #[serde(default = "crate::defaults::source_text_selector")]
    pub source_text: String,
}

impl Default for SelectorConfig {
    fn default() -> Self {
        Self {
            block: crate::defaults::block_selector(),
            header: crate::defaults::header_selector(),
            header_buttons: crate::defaults::header_buttons_selector(),
            source_region: crate::defaults::source_region_selector(),
            source_text: crate::defaults::source_text_selector(),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            debounce_ms: crate::defaults::debounce_ms(),
            error_grace_ms: crate::defaults::error_grace_ms(),
            sweep_interval_ms: crate::defaults::sweep_interval_ms(),
            mermaid: MermaidConfig::default(),
            plantuml: PlantUmlConfig::default(),
            selectors: SelectorConfig::default(),
            processed_attribute: crate::defaults::processed_attribute(),
            log_level: LogLevel::default(),
        }
    }
}

impl Config {
    /// Parse and validate a configuration from a YAML string.
    pub fn from_yaml_str(contents: &str) -> Result<Self, ConfigError> {
        let config: Config = if contents.trim().is_empty() {
            Config::default()
        } else {
            serde_yaml_ng::from_str(contents)?
        };
        config.validate()?;
        Ok(config)
    }

    /// Load and validate a configuration file.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        log::info!("Loading config from {:?}", path);
        let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_yaml_str(&contents)
    }

    /// Serialize to YAML.
    pub fn to_yaml(&self) -> Result<String, ConfigError> {
        Ok(serde_yaml_ng::to_string(self)?)
    }

    /// Check semantic constraints that serde cannot express.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.sweep_interval_ms == 0 {
            return Err(ConfigError::Validation(
                "sweep_interval_ms must be greater than zero".to_string(),
            ));
        }
        if self.plantuml.timeout_secs == 0 {
            return Err(ConfigError::Validation(
                "plantuml.timeout_secs must be greater than zero".to_string(),
            ));
        }
        let server = self.plantuml.server.trim();
        if !(server.starts_with("http://") || server.starts_with("https://")) {
            return Err(ConfigError::Validation(format!(
                "plantuml.server must be an http(s) URL, got '{server}'"
            )));
        }

        let selectors = [
            ("selectors.block", &self.selectors.block),
            ("selectors.header", &self.selectors.header),
            ("selectors.header_buttons", &self.selectors.header_buttons),
            ("selectors.source_region", &self.selectors.source_region),
            ("selectors.source_text", &self.selectors.source_text),
            ("processed_attribute", &self.processed_attribute),
        ];
        for (field, value) in selectors {
            if value.trim().is_empty() {
                return Err(ConfigError::Validation(format!("{field} must not be empty")));
            }
        }
        Ok(())
    }

    pub fn debounce(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }

    pub fn error_grace(&self) -> Duration {
        Duration::from_millis(self.error_grace_ms)
    }

    pub fn sweep_interval(&self) -> Duration {
        Duration::from_millis(self.sweep_interval_ms)
    }

    pub fn plantuml_timeout(&self) -> Duration {
        Duration::from_secs(self.plantuml.timeout_secs)
    }

    /// Builder-style override of the three timing windows.
    pub fn with_timing(mut self, debounce_ms: u64, error_grace_ms: u64, sweep_interval_ms: u64) -> Self {
        self.debounce_ms = debounce_ms;
        self.error_grace_ms = error_grace_ms;
        self.sweep_interval_ms = sweep_interval_ms;
        self
    }
}
