//! Audit persistence backends.

use async_trait::async_trait;
use bastion_audit_types::AuditEntry;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tokio::fs::{File, OpenOptions};
use tokio::io::AsyncWriteExt;
use tokio::sync::{Mutex, RwLock};

/// Errors raised by an audit sink.
#[derive(Debug, Error)]
pub enum AuditSinkError {
    #[error("audit storage I/O failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("audit entry could not be encoded: {0}")]
    Encoding(#[from] serde_json::Error),

    #[error("audit storage unavailable: {0}")]
    Unavailable(String),
}

/// Append-only audit storage.
#[async_trait]
pub trait AuditSink: Send + Sync {
    /// Persist one entry.
    async fn append(&self, entry: AuditEntry) -> Result<(), AuditSinkError>;

    /// Return up to `limit` of the most recently appended entries, oldest first.
    async fn recent(&self, limit: usize) -> Result<Vec<AuditEntry>, AuditSinkError>;
}

/// In-process sink, used by default and in tests.
#[derive(Debug, Default)]
pub struct MemoryAuditSink {
    entries: RwLock<Vec<AuditEntry>>,
}

impl MemoryAuditSink {
    /// Create an empty sink.
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot every stored entry.
    pub async fn entries(&self) -> Vec<AuditEntry> {
        self.entries.read().await.clone()
    }

    /// Number of stored entries.
    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    /// Whether nothing has been stored yet.
    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }
}

#[async_trait]
impl AuditSink for MemoryAuditSink {
    async fn append(&self, entry: AuditEntry) -> Result<(), AuditSinkError> {
        self.entries.write().await.push(entry);
        Ok(())
    }

    async fn recent(&self, limit: usize) -> Result<Vec<AuditEntry>, AuditSinkError> {
        let entries = self.entries.read().await;
        let start = entries.len().saturating_sub(limit);
        Ok(entries[start..].to_vec())
    }
}

/// Sink that appends one JSON document per line to a file.
#[derive(Debug)]
pub struct JsonLinesAuditSink {
    path: PathBuf,
    file: Mutex<File>,
}

impl JsonLinesAuditSink {
    /// Open (or create) the file in append mode.
    pub async fn open(path: impl AsRef<Path>) -> Result<Self, AuditSinkError> {
        let path = path.as_ref().to_path_buf();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await?;
        }
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .await?;
        Ok(Self {
            path,
            file: Mutex::new(file),
        })
    }

    /// Location of the backing file.
    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl AuditSink for JsonLinesAuditSink {
    async fn append(&self, entry: AuditEntry) -> Result<(), AuditSinkError> {
        let mut line = serde_json::to_vec(&entry)?;
        line.push(b'\n');

        let mut file = self.file.lock().await;
        file.write_all(&line).await?;
        file.flush().await?;
        Ok(())
    }

    async fn recent(&self, limit: usize) -> Result<Vec<AuditEntry>, AuditSinkError> {
        // Hold the writer lock so a half-written line is never read.
        let _guard = self.file.lock().await;
        let contents = tokio::fs::read_to_string(&self.path).await?;
        let lines: Vec<&str> = contents.lines().filter(|l| !l.trim().is_empty()).collect();
        let start = lines.len().saturating_sub(limit);
        lines[start..]
            .iter()
            .map(|line| serde_json::from_str(line).map_err(AuditSinkError::from))
            .collect()
    }
}
