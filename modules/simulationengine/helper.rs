use std::{fmt, path::PathBuf, sync::Arc};

use anyhow::Result;
use rand::Rng;
use serde_json::Value;
use shared_logging::{JsonLogger, LogLevel, LogRecord};

enum LogTarget {
    Silent,
    File(PathBuf),
    Stderr,
}

/// Telemetry builder for the simulation engine.
pub struct SimulationTelemetryBuilder {
    module: String,
    target: LogTarget,
    min_level: LogLevel,
}

impl SimulationTelemetryBuilder {
    /// Creates a new builder scoped to a module label.
    #[must_use]
    pub fn new(module: impl Into<String>) -> Self {
        Self {
            module: module.into(),
            target: LogTarget::Silent,
            min_level: LogLevel::Info,
        }
    }

    /// Appends records to a file.
    #[must_use]
    pub fn log_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.target = LogTarget::File(path.into());
        self
    }

    /// Writes records to stderr.
    #[must_use]
    pub fn stderr(mut self) -> Self {
        self.target = LogTarget::Stderr;
        self
    }

    /// Drops records less severe than `level`.
    #[must_use]
    pub const fn min_level(mut self, level: LogLevel) -> Self {
        self.min_level = level;
        self
    }

    /// Builds telemetry.
    pub fn build(self) -> Result<SimulationTelemetry> {
        let logger = match self.target {
            LogTarget::Silent => None,
            LogTarget::File(path) => Some(JsonLogger::new(path)?.with_min_level(self.min_level)),
            LogTarget::Stderr => Some(JsonLogger::stderr().with_min_level(self.min_level)),
        };
        Ok(SimulationTelemetry {
            inner: Arc::new(TelemetryInner {
                module: self.module,
                logger,
            }),
        })
    }
}

/// Telemetry handle shared across simulation components.
#[derive(Clone)]
pub struct SimulationTelemetry {
    inner: Arc<TelemetryInner>,
}

impl fmt::Debug for SimulationTelemetry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SimulationTelemetry")
            .field("module", &self.inner.module)
            .field("sink", &self.inner.logger.as_ref().map(JsonLogger::path))
            .finish()
    }
}

struct TelemetryInner {
    module: String,
    logger: Option<JsonLogger>,
}

impl SimulationTelemetry {
    /// Returns a builder.
    #[must_use]
    pub fn builder(module: impl Into<String>) -> SimulationTelemetryBuilder {
        SimulationTelemetryBuilder::new(module)
    }

    /// Module label stamped on every record.
    #[must_use]
    pub fn module(&self) -> &str {
        &self.inner.module
    }

    /// Logs a message; object metadata becomes the record's `metadata`.
    pub fn log(&self, level: LogLevel, message: &str, metadata: Value) -> Result<()> {
        if let Some(logger) = &self.inner.logger {
            if !logger.enabled(level) {
                return Ok(());
            }
            let mut record = LogRecord::new(&self.inner.module, level, message);
            match metadata {
                Value::Object(fields) => record.metadata = fields,
                Value::Null => {}
                other => record = record.with_field("value", other),
            }
            logger.log(&record)?;
        }
        Ok(())
    }

    /// Records a named lifecycle event at info level.
    pub fn event(&self, event_type: &str, payload: Value) -> Result<()> {
        self.log(LogLevel::Info, event_type, payload)
    }

    /// Records a recoverable problem.
    pub fn warn(&self, message: &str, metadata: Value) -> Result<()> {
        self.log(LogLevel::Warn, message, metadata)
    }
}

/// Draws a fresh seed for callers that do not pin one.
#[must_use]
pub fn random_seed() -> u32 {
    rand::thread_rng().gen()
}
