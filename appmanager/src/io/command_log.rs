//! Append-only command log.
//!
//! # Separation of Concerns
//!
//! - **Command log (this module)**: product artifact. Every external command,
//!   its exit and every timeout kill is recorded here, unaffected by `RUST_LOG`.
//! - **Tracing (`logging`)**: developer diagnostics on stderr.

use std::fmt;
use std::fs::{self, File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::time::Duration;

use anyhow::{Context, Result};
use chrono::Local;
use tracing::warn;

/// One entry of the command log.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LogRecord {
    Invoked { argv: Vec<String> },
    Exited { argv: Vec<String>, code: i32 },
    TimedOut { argv: Vec<String>, timeout: Duration },
    SpawnFailed { argv: Vec<String>, error: String },
    /// Free text (headers, application summary).
    Note(String),
}

impl LogRecord {
    pub fn is_timeout(&self) -> bool {
        matches!(self, LogRecord::TimedOut { .. })
    }
}

impl fmt::Display for LogRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LogRecord::Invoked { argv } => write!(f, "Running {argv:?}"),
            LogRecord::Exited { argv, code } => write!(f, "Exited with {code} {argv:?}"),
            LogRecord::TimedOut { argv, timeout } => {
                write!(f, "Process timed out after {timeout:?}, killing {argv:?}")
            }
            LogRecord::SpawnFailed { argv, error } => {
                write!(f, "Could not start {argv:?}: {error}")
            }
            LogRecord::Note(text) => f.write_str(text),
        }
    }
}

/// Sink for command log records. Shared across worker threads.
pub trait CommandLog: Send + Sync {
    fn record(&self, record: &LogRecord);
}

/// Appends records to a file, flushing after each one.
#[derive(Debug)]
pub struct FileLog {
    path: PathBuf,
    writer: Mutex<BufWriter<File>>,
}

impl FileLog {
    /// Open `path` for appending and write a session header for `app_name`.
    pub fn open(path: &Path, app_name: &str) -> Result<Self> {
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            fs::create_dir_all(parent)
                .with_context(|| format!("create log dir {}", parent.display()))?;
        }
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .with_context(|| format!("open command log {}", path.display()))?;
        let log = Self {
            path: path.to_path_buf(),
            writer: Mutex::new(BufWriter::new(file)),
        };
        log.record(&LogRecord::Note(format!(
            "== {app_name} ==\nLog started on {}",
            Local::now().format("%A (%a) %d/%m/%Y")
        )));
        Ok(log)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl CommandLog for FileLog {
    fn record(&self, record: &LogRecord) {
        let line = match record {
            LogRecord::Note(text) => format!("{text}\n"),
            other => format!("{} {other}\n", Local::now().format("%H:%M:%S%.3f")),
        };
        let Ok(mut writer) = self.writer.lock() else {
            warn!(path = %self.path.display(), "command log lock poisoned");
            return;
        };
        if let Err(e) = writer.write_all(line.as_bytes()) {
            warn!(err = %e, path = %self.path.display(), "failed to write command log");
        } else if let Err(e) = writer.flush() {
            warn!(err = %e, path = %self.path.display(), "failed to flush command log");
        }
    }
}

/// Keeps records in memory, in arrival order.
#[derive(Debug, Default)]
pub struct MemoryLog {
    records: Mutex<Vec<LogRecord>>,
}

impl MemoryLog {
    pub fn records(&self) -> Vec<LogRecord> {
        self.records
            .lock()
            .map(|records| records.clone())
            .unwrap_or_default()
    }
}

impl CommandLog for MemoryLog {
    fn record(&self, record: &LogRecord) {
        if let Ok(mut records) = self.records.lock() {
            records.push(record.clone());
        }
    }
}

/// Discards everything.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullLog;

impl CommandLog for NullLog {
    fn record(&self, _record: &LogRecord) {}
}

#[cfg(test)]
mod tests {
    use super::*;

    fn argv(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn file_log_writes_header_and_records() {
        let temp = tempfile::tempdir().expect("tempdir");
        let path = temp.path().join("logs").join("demo.log");
        let log = FileLog::open(&path, "demo").expect("open");
        log.record(&LogRecord::Invoked {
            argv: argv(&["yarp", "exists", "/a"]),
        });
        log.record(&LogRecord::TimedOut {
            argv: argv(&["yarp", "exists", "/a"]),
            timeout: Duration::from_secs(2),
        });

        let contents = fs::read_to_string(&path).expect("read log");
        assert!(contents.starts_with("== demo ==\nLog started on "));
        assert!(contents.contains("Running [\"yarp\", \"exists\", \"/a\"]"));
        assert!(contents.contains("Process timed out after 2s"));
    }

    #[test]
    fn reopening_appends() {
        let temp = tempfile::tempdir().expect("tempdir");
        let path = temp.path().join("demo.log");
        FileLog::open(&path, "demo")
            .expect("open")
            .record(&LogRecord::Note("first session".to_string()));
        FileLog::open(&path, "demo")
            .expect("reopen")
            .record(&LogRecord::Note("second session".to_string()));

        let contents = fs::read_to_string(&path).expect("read log");
        assert!(contents.contains("first session"));
        assert!(contents.contains("second session"));
        assert_eq!(contents.matches("== demo ==").count(), 2);
    }

    #[test]
    fn memory_log_keeps_order() {
        let log = MemoryLog::default();
        log.record(&LogRecord::Note("a".to_string()));
        log.record(&LogRecord::Exited {
            argv: argv(&["true"]),
            code: 0,
        });
        let records = log.records();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0], LogRecord::Note("a".to_string()));
        assert!(!records[1].is_timeout());
    }
}
