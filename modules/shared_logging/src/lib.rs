#![deny(
    clippy::all,
    clippy::pedantic,
    clippy::nursery,
    missing_docs,
    rust_2018_idioms
)]

//! Structured JSON-lines logging shared by the engine and the CLI.

use std::{
    fmt,
    fs::{self, File},
    io::{self, Write},
    path::{Path, PathBuf},
    str::FromStr,
};

use anyhow::Result;
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Log severity level, ordered from least to most severe.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(rename_all = "UPPERCASE")]
pub enum LogLevel {
    /// Debug information.
    #[serde(alias = "debug")]
    Debug,
    /// Informational events.
    #[serde(alias = "info")]
    Info,
    /// Warning indicator.
    #[serde(alias = "warn", alias = "warning")]
    Warn,
    /// Error indicator.
    #[serde(alias = "error")]
    Error,
}

impl LogLevel {
    /// Lowercase label, as accepted by [`FromStr`].
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Debug => "debug",
            Self::Info => "info",
            Self::Warn => "warn",
            Self::Error => "error",
        }
    }
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Raised when a level name cannot be parsed.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("unknown log level `{0}` (expected debug, info, warn or error)")]
pub struct ParseLevelError(String);

impl FromStr for LogLevel {
    type Err = ParseLevelError;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "debug" => Ok(Self::Debug),
            "info" => Ok(Self::Info),
            "warn" | "warning" => Ok(Self::Warn),
            "error" => Ok(Self::Error),
            _ => Err(ParseLevelError(raw.to_string())),
        }
    }
}

/// Structured log record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogRecord {
    /// Timestamp in ISO8601.
    pub timestamp: DateTime<Utc>,
    /// Module emitting the log.
    pub module: String,
    /// Severity.
    pub level: LogLevel,
    /// Dotted event name, e.g. `simulation.run.completed`.
    pub message: String,
    /// Structured fields attached to the event.
    #[serde(default, skip_serializing_if = "serde_json::Map::is_empty")]
    pub metadata: serde_json::Map<String, serde_json::Value>,
}

impl LogRecord {
    /// Creates a record stamped with the current time.
    #[must_use]
    pub fn new(module: impl Into<String>, level: LogLevel, message: impl Into<String>) -> Self {
        Self {
            timestamp: Utc::now(),
            module: module.into(),
            level,
            message: message.into(),
            metadata: serde_json::Map::new(),
        }
    }

    /// Attaches one metadata field.
    #[must_use]
    pub fn with_field(mut self, key: impl Into<String>, value: impl Into<serde_json::Value>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }
}

/// Destination of the JSON lines.
#[derive(Debug)]
pub enum LogSink {
    /// Append-only file.
    File {
        /// Location on disk.
        path: PathBuf,
        /// Open handle.
        file: File,
    },
    /// Standard error of the current process.
    Stderr,
}

/// Thread-safe JSON logger; each record is written as one line.
#[derive(Debug)]
pub struct JsonLogger {
    sink: Mutex<LogSink>,
    min_level: LogLevel,
}

impl JsonLogger {
    /// Creates or opens a file logger at the desired path.
    pub fn new(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let file = fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)?;
        Ok(Self {
            sink: Mutex::new(LogSink::File { path, file }),
            min_level: LogLevel::Debug,
        })
    }

    /// Logger writing to stderr.
    #[must_use]
    pub fn stderr() -> Self {
        Self {
            sink: Mutex::new(LogSink::Stderr),
            min_level: LogLevel::Debug,
        }
    }

    /// Drops every record less severe than `level`.
    #[must_use]
    pub const fn with_min_level(mut self, level: LogLevel) -> Self {
        self.min_level = level;
        self
    }

    /// Whether a record at `level` would be written.
    #[must_use]
    pub fn enabled(&self, level: LogLevel) -> bool {
        level >= self.min_level
    }

    /// Writes a log record as a JSON line.
    pub fn log(&self, record: &LogRecord) -> Result<()> {
        if !self.enabled(record.level) {
            return Ok(());
        }
        let mut line = serde_json::to_vec(record)?;
        line.push(b'\n');
        let mut sink = self.sink.lock();
        match &mut *sink {
            LogSink::File { file, .. } => {
                file.write_all(&line)?;
                file.flush()?;
            }
            LogSink::Stderr => {
                let mut handle = io::stderr().lock();
                handle.write_all(&line)?;
                handle.flush()?;
            }
        }
        Ok(())
    }

    /// File path backing this logger, if any.
    #[must_use]
    pub fn path(&self) -> Option<PathBuf> {
        match &*self.sink.lock() {
            LogSink::File { path, .. } => Some(path.clone()),
            LogSink::Stderr => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn writes_json_lines() {
        let dir = tempdir().unwrap();
        let logger = JsonLogger::new(dir.path().join("logs").join("run.log")).unwrap();
        logger
            .log(&LogRecord::new("engine", LogLevel::Info, "simulation.run.start").with_field("n", 1000))
            .unwrap();
        logger
            .log(&LogRecord::new("engine", LogLevel::Warn, "catalog.entry_rejected"))
            .unwrap();
        let content = fs::read_to_string(logger.path().unwrap()).unwrap();
        let lines: Vec<_> = content.lines().collect();
        assert_eq!(lines.len(), 2);
        let first: LogRecord = serde_json::from_str(lines[0]).unwrap();
        assert_eq!(first.message, "simulation.run.start");
        assert_eq!(first.metadata["n"], 1000);
        assert!(lines[1].contains("\"level\":\"WARN\""));
    }

    #[test]
    fn filters_below_min_level() {
        let dir = tempdir().unwrap();
        let logger = JsonLogger::new(dir.path().join("filtered.log"))
            .unwrap()
            .with_min_level(LogLevel::Warn);
        logger
            .log(&LogRecord::new("engine", LogLevel::Info, "dropped"))
            .unwrap();
        logger
            .log(&LogRecord::new("engine", LogLevel::Error, "kept"))
            .unwrap();
        let content = fs::read_to_string(logger.path().unwrap()).unwrap();
        assert!(!content.contains("dropped"));
        assert!(content.contains("kept"));
    }

    #[test]
    fn parses_level_names() {
        assert_eq!("INFO".parse::<LogLevel>().unwrap(), LogLevel::Info);
        assert_eq!("warning".parse::<LogLevel>().unwrap(), LogLevel::Warn);
        assert!("verbose".parse::<LogLevel>().is_err());
        assert!(LogLevel::Error > LogLevel::Debug);
    }

    #[test]
    fn level_deserializes_from_either_case() {
        for (raw, level) in [
            ("\"info\"", LogLevel::Info),
            ("\"INFO\"", LogLevel::Info),
            ("\"debug\"", LogLevel::Debug),
            ("\"warning\"", LogLevel::Warn),
            ("\"error\"", LogLevel::Error),
        ] {
            assert_eq!(serde_json::from_str::<LogLevel>(raw).unwrap(), level);
        }
        assert_eq!(serde_json::to_string(&LogLevel::Warn).unwrap(), "\"WARN\"");
        assert!(serde_json::from_str::<LogLevel>("\"loud\"").is_err());
    }

    #[test]
    fn stderr_logger_has_no_path() {
        let logger = JsonLogger::stderr();
        assert!(logger.path().is_none());
        assert!(logger.enabled(LogLevel::Debug));
    }
}
