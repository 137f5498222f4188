//! Categorised logging for chat-diagrams.
//!
//! All library code logs through the `log` facade with the category as the
//! record target, e.g. `debug_info!("SCANNER", "attached {}", id)`.
//!
//! Hosts that already install a logger get these records for free. Hosts
//! that don't can call [`init_logging`] to install [`DebugLogger`], which
//! writes `[timestamp] [LEVEL] [category] message` lines to a file, or to
//! stderr when no file is given.

use parking_lot::Mutex;
use std::fs::OpenOptions;
use std::io::Write;
use std::path::Path;
use std::time::{SystemTime, UNIX_EPOCH};

#[doc(hidden)]
pub use log as __log;

/// Where [`DebugLogger`] writes its lines.
enum Sink {
    File(std::fs::File),
    Stderr,
}

/// `log::Log` implementation writing categorised lines.
pub struct DebugLogger {
    level: log::LevelFilter,
    sink: Mutex<Sink>,
}

impl DebugLogger {
    fn new(level: log::LevelFilter, path: Option<&Path>) -> std::io::Result<Self> {
        let sink = match path {
            Some(path) => Sink::File(
                OpenOptions::new()
                    .write(true)
                    .truncate(true)
                    .create(true)
                    .open(path)?,
            ),
            None => Sink::Stderr,
        };
        let logger = DebugLogger {
            level,
            sink: Mutex::new(sink),
        };
        logger.write_raw(&format!(
            "\n{}\nchat-diagrams debug session started at {} (level={:?})\n{}\n",
            "=".repeat(80),
            get_timestamp(),
            level,
            "=".repeat(80)
        ));
        Ok(logger)
    }

    fn write_raw(&self, msg: &str) {
        let mut sink = self.sink.lock();
        match &mut *sink {
            Sink::File(file) => {
                let _ = file.write_all(msg.as_bytes());
                let _ = file.flush();
            }
            Sink::Stderr => {
                let _ = std::io::stderr().write_all(msg.as_bytes());
            }
        }
    }
}

impl log::Log for DebugLogger {
    fn enabled(&self, metadata: &log::Metadata) -> bool {
        metadata.level() <= self.level
    }

    fn log(&self, record: &log::Record) {
        if !self.enabled(record.metadata()) {
            return;
        }
        let level_str = match record.level() {
            log::Level::Error => "ERROR",
            log::Level::Warn => "WARN ",
            log::Level::Info => "INFO ",
            log::Level::Debug => "DEBUG",
            log::Level::Trace => "TRACE",
        };
        self.write_raw(&format!(
            "[{}] [{}] [{}] {}\n",
            get_timestamp(),
            level_str,
            record.target(),
            record.args()
        ));
    }

    fn flush(&self) {
        if let Sink::File(file) = &mut *self.sink.lock() {
            let _ = file.flush();
        }
    }
}

fn get_timestamp() -> String {
    let now = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default();
    format!("{}.{:06}", now.as_secs(), now.subsec_micros())
}

/// Install [`DebugLogger`] as the global `log` backend.
///
/// `LevelFilter::Off` installs nothing. A second call is a no-op because the
/// `log` crate only accepts one global logger.
pub fn init_logging(level: log::LevelFilter, path: Option<&Path>) -> std::io::Result<()> {
    if level == log::LevelFilter::Off {
        return Ok(());
    }
    let logger = DebugLogger::new(level, path)?;
    if log::set_boxed_logger(Box::new(logger)).is_ok() {
        log::set_max_level(level);
    }
    Ok(())
}

// Convenience macros for categorised logging
#[macro_export]
macro_rules! debug_error {
    ($category:expr, $($arg:tt)*) => {
        $crate::debug::__log::error!(target: $category, $($arg)*)
    };
}

#[macro_export]
macro_rules! debug_warn {
    ($category:expr, $($arg:tt)*) => {
        $crate::debug::__log::warn!(target: $category, $($arg)*)
    };
}

#[macro_export]
macro_rules! debug_info {
    ($category:expr, $($arg:tt)*) => {
        $crate::debug::__log::info!(target: $category, $($arg)*)
    };
}

#[macro_export]
macro_rules! debug_log {
    ($category:expr, $($arg:tt)*) => {
        $crate::debug::__log::debug!(target: $category, $($arg)*)
    };
}

#[macro_export]
macro_rules! debug_trace {
    ($category:expr, $($arg:tt)*) => {
        $crate::debug::__log::trace!(target: $category, $($arg)*)
    };
}
