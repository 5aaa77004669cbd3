//! Alert sinks.
//!
//! Engines return [`Alert`]s; hosts attach source metadata and hand the
//! resulting [`AlertRecord`] rows to a sink.

use std::fs::{File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::debug;
use vigil_models::{Alert, AlertRecord, SourceInfo};

/// Result type for sink operations.
pub type SinkResult<T> = Result<T, SinkError>;

#[derive(Debug, Error)]
pub enum SinkError {
    #[error("IO error writing alerts to {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to serialize alert record: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl SinkError {
    fn io(path: &Path, source: std::io::Error) -> Self {
        Self::Io {
            path: path.to_path_buf(),
            source,
        }
    }
}

/// Destination for alert rows.
pub trait AlertSink {
    fn emit(&mut self, record: &AlertRecord) -> SinkResult<()>;

    /// Convert and emit a batch of engine alerts for one source.
    fn emit_alerts(&mut self, alerts: &[Alert], source: &SourceInfo) -> SinkResult<()> {
        for alert in alerts {
            self.emit(&AlertRecord::from_alert(alert, source))?;
        }
        Ok(())
    }

    fn flush(&mut self) -> SinkResult<()> {
        Ok(())
    }
}

/// Keeps every record in memory.
#[derive(Debug, Default, Clone)]
pub struct MemoryAlertSink {
    records: Vec<AlertRecord>,
}

impl MemoryAlertSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn records(&self) -> &[AlertRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn into_records(self) -> Vec<AlertRecord> {
        self.records
    }
}

impl AlertSink for MemoryAlertSink {
    fn emit(&mut self, record: &AlertRecord) -> SinkResult<()> {
        self.records.push(record.clone());
        Ok(())
    }
}

/// Appends one JSON object per line to a file.
#[derive(Debug)]
pub struct JsonlAlertSink {
    path: PathBuf,
    writer: BufWriter<File>,
    written: usize,
}

impl JsonlAlertSink {
    /// Open `path` for appending, creating it and its parent directories.
    pub fn open(path: impl AsRef<Path>) -> SinkResult<Self> {
        let path = path.as_ref();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|e| SinkError::io(path, e))?;
        }
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .map_err(|e| SinkError::io(path, e))?;

        debug!(path = %path.display(), "Opened alert log");
        Ok(Self {
            path: path.to_path_buf(),
            writer: BufWriter::new(file),
            written: 0,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Records written since the sink was opened.
    pub fn written(&self) -> usize {
        self.written
    }
}

impl AlertSink for JsonlAlertSink {
    fn emit(&mut self, record: &AlertRecord) -> SinkResult<()> {
        let line = serde_json::to_string(record)?;
        self.writer
            .write_all(line.as_bytes())
            .and_then(|_| self.writer.write_all(b"\n"))
            .map_err(|e| SinkError::io(&self.path, e))?;
        self.written += 1;
        Ok(())
    }

    fn flush(&mut self) -> SinkResult<()> {
        self.writer.flush().map_err(|e| SinkError::io(&self.path, e))
    }
}
