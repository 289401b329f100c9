//! Logging for backup runs
//!
//! The runner, the stages and the retention policy never touch a global
//! logger directly; they receive a [`RunLog`]. The binary hands them a
//! [`TracingLog`] after [`init`] has installed the subscriber, tests hand them
//! a [`RecordingLog`].

use std::fs::{self, OpenOptions};
use std::path::Path;
use std::sync::Mutex;

use tracing_subscriber::{filter::LevelFilter, fmt, prelude::*, EnvFilter};

use crate::error::{BackupError, BackupResult};

/// Log sink handed to every component of a run
pub trait RunLog {
    fn info(&self, message: &str);

    fn error(&self, message: &str);

    fn warn(&self, message: &str) {
        self.info(message);
    }
}

/// Forwards to `tracing` under the `localbkup` target
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingLog;

impl RunLog for TracingLog {
    fn info(&self, message: &str) {
        tracing::info!(target: "localbkup", "{}", message);
    }

    fn error(&self, message: &str) {
        tracing::error!(target: "localbkup", "{}", message);
    }

    fn warn(&self, message: &str) {
        tracing::warn!(target: "localbkup", "{}", message);
    }
}

/// Severity of a recorded line
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel {
    Info,
    Warn,
    Error,
}

/// Keeps every line in memory
#[derive(Debug, Default)]
pub struct RecordingLog {
    lines: Mutex<Vec<(LogLevel, String)>>,
}

impl RecordingLog {
    pub fn new() -> Self {
        Self::default()
    }

    fn push(&self, level: LogLevel, message: &str) {
        if let Ok(mut lines) = self.lines.lock() {
            lines.push((level, message.to_string()));
        }
    }

    /// All recorded lines, oldest first
    pub fn lines(&self) -> Vec<(LogLevel, String)> {
        self.lines.lock().map(|l| l.clone()).unwrap_or_default()
    }

    /// Recorded messages of one level
    pub fn messages(&self, level: LogLevel) -> Vec<String> {
        self.lines()
            .into_iter()
            .filter(|(l, _)| *l == level)
            .map(|(_, m)| m)
            .collect()
    }

    /// Whether any line contains `needle`
    pub fn contains(&self, needle: &str) -> bool {
        self.lines().iter().any(|(_, m)| m.contains(needle))
    }
}

impl RunLog for RecordingLog {
    fn info(&self, message: &str) {
        self.push(LogLevel::Info, message);
    }

    fn error(&self, message: &str) {
        self.push(LogLevel::Error, message);
    }

    fn warn(&self, message: &str) {
        self.push(LogLevel::Warn, message);
    }
}

/// Install the global subscriber: DEBUG and up to `log_file`, INFO and up to stderr.
///
/// `RUST_LOG` overrides the overall filter.
pub fn init(log_file: &Path) -> BackupResult<()> {
    if let Some(parent) = log_file.parent() {
        fs::create_dir_all(parent).map_err(|e| {
            BackupError::Logging(format!(
                "Failed to create log directory {}: {}",
                parent.display(),
                e
            ))
        })?;
    }

    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(log_file)
        .map_err(|e| {
            BackupError::Logging(format!(
                "Failed to open log file {}: {}",
                log_file.display(),
                e
            ))
        })?;

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,localbkup=debug"));

    let file_layer = fmt::layer()
        .with_ansi(false)
        .with_writer(Mutex::new(file))
        .with_filter(LevelFilter::DEBUG);

    let stderr_layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_filter(LevelFilter::INFO);

    tracing_subscriber::registry()
        .with(filter)
        .with(file_layer)
        .with(stderr_layer)
        .try_init()
        .map_err(|e| BackupError::Logging(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_recording_log() {
        let log = RecordingLog::new();
        log.info("Compressed to file: /tmp/a.tar.gz");
        log.warn("tar: file changed as we read it");
        log.error("boom");

        assert_eq!(log.lines().len(), 3);
        assert_eq!(log.messages(LogLevel::Error), vec!["boom".to_string()]);
        assert!(log.contains("Compressed to file"));
    }

    #[test]
    fn test_default_warn_goes_to_info() {
        struct InfoOnly(Mutex<Vec<String>>);
        impl RunLog for InfoOnly {
            fn info(&self, message: &str) {
                self.0.lock().unwrap().push(message.to_string());
            }
            fn error(&self, _message: &str) {}
        }

        let log = InfoOnly(Mutex::new(Vec::new()));
        log.warn("careful");
        assert_eq!(log.0.lock().unwrap().as_slice(), ["careful".to_string()]);
    }
}
