//! Audit sinks.

use crate::entry::{AuditAction, AuditEntry, AuditStatus};
use crate::error::AuditError;
use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

/// Header written at the top of every audit file.
pub const AUDIT_HEADER: &str = "timestamp,data";

/// Destination for audit entries.
///
/// `record` has no error channel: a sink that cannot write reports it through
/// `tracing` and drops the entry.
pub trait AuditSink: Send + Sync {
    fn record(&self, entry: AuditEntry);
}

/// Append-only CSV audit file, one per run.
pub struct CsvAuditLog {
    path: PathBuf,
    file: Mutex<File>,
}

impl CsvAuditLog {
    /// Create (or truncate) the file at `path` and write the header.
    pub fn create(path: impl AsRef<Path>) -> Result<Self, AuditError> {
        let path = path.as_ref().to_path_buf();
        let init_err = |source| AuditError::InitializationFailed {
            path: path.display().to_string(),
            source,
        };

        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            fs::create_dir_all(parent).map_err(init_err)?;
        }

        let mut file = File::create(&path).map_err(init_err)?;
        writeln!(file, "{}", AUDIT_HEADER).map_err(init_err)?;

        tracing::debug!(path = %path.display(), "Audit log initialized");
        Ok(Self {
            path,
            file: Mutex::new(file),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl AuditSink for CsvAuditLog {
    fn record(&self, entry: AuditEntry) {
        tracing::debug!(
            status = %entry.status,
            action = %entry.action(),
            "Audit entry"
        );

        let line = match entry.to_line() {
            Ok(line) => line,
            Err(e) => {
                tracing::warn!(error = %e, "Failed to serialize audit entry");
                return;
            }
        };

        let mut file = self.file.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        if let Err(e) = writeln!(file, "{}", line) {
            tracing::warn!(
                path = %self.path.display(),
                error = %e,
                "Failed to append audit entry"
            );
        }
    }
}

/// In-memory sink, used by tests and dry runs.
#[derive(Default)]
pub struct MemoryAuditSink {
    entries: Mutex<Vec<AuditEntry>>,
}

impl MemoryAuditSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn entries(&self) -> Vec<AuditEntry> {
        self.entries
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    /// Number of entries with the given status.
    pub fn count(&self, status: AuditStatus) -> usize {
        self.entries().iter().filter(|e| e.status == status).count()
    }

    /// Number of entries with the given status and action.
    pub fn count_for(&self, status: AuditStatus, action: AuditAction) -> usize {
        self.entries()
            .iter()
            .filter(|e| e.status == status && e.action() == action)
            .count()
    }
}

impl AuditSink for MemoryAuditSink {
    fn record(&self, entry: AuditEntry) {
        self.entries
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .push(entry);
    }
}
