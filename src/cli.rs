//! Command-line interface for `diagram-replay`.

use clap::Parser;
use std::path::PathBuf;
use std::time::Duration;

use chat_diagrams_config::LogLevel;

use crate::replay::ReplayOptions;

/// diagram-replay - Stream a Markdown transcript through the diagram pipeline
#[derive(Parser, Debug)]
#[command(name = "diagram-replay")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Markdown transcript to replay
    #[arg(value_name = "TRANSCRIPT")]
    pub input: PathBuf,

    /// Directory that receives one file per diagram block
    #[arg(short, long, value_name = "DIR", default_value = "diagrams-out")]
    pub output: PathBuf,

    /// YAML configuration file (defaults are used when omitted)
    #[arg(short, long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Characters per streamed chunk
    #[arg(long, value_name = "CHARS", default_value_t = 24)]
    pub chunk_size: usize,

    /// Delay between streamed chunks
    #[arg(long, value_name = "MS", default_value_t = 40)]
    pub chunk_delay_ms: u64,

    /// Give up waiting for renders after this many seconds
    #[arg(long, value_name = "SECONDS", default_value_t = 60)]
    pub idle_timeout: u64,

    /// Override the PlantUML server URL
    #[arg(long, value_name = "URL")]
    pub plantuml_server: Option<String>,

    /// Log level (off, error, warn, info, debug, trace); overrides the config
    #[arg(long, value_name = "LEVEL")]
    pub log_level: Option<LogLevel>,

    /// Write the log to this file instead of stderr
    #[arg(long, value_name = "PATH")]
    pub log_file: Option<PathBuf>,
}

impl Cli {
    pub fn replay_options(&self) -> ReplayOptions {
        ReplayOptions {
            chunk_size: self.chunk_size.max(1),
            chunk_delay: Duration::from_millis(self.chunk_delay_ms),
            idle_timeout: Duration::from_secs(self.idle_timeout),
        }
    }
}
