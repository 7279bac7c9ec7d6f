//! Where a replica reads the primary's record set from.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use async_trait::async_trait;
use rusqlite::{Connection, OpenFlags};

use crate::store::record_store::read_all;
use crate::store::{Employee, RecordStore, StoreError};

/// A readable view of the primary's full record set.
#[async_trait]
pub trait SnapshotSource: Send + Sync {
    /// Read every record the primary currently holds.
    async fn fetch_snapshot(&self) -> Result<Vec<Employee>, StoreError>;

    /// Human-readable location, for logs.
    fn describe(&self) -> String;
}

/// An in-process primary store.
#[async_trait]
impl SnapshotSource for Arc<RecordStore> {
    async fn fetch_snapshot(&self) -> Result<Vec<Employee>, StoreError> {
        self.snapshot().await
    }

    fn describe(&self) -> String {
        format!("in-process {} store", self.role())
    }
}

/// The primary's SQLite file, opened read-only once per fetch.
///
/// Nodes sharing a host replicate this way: the primary keeps writing
/// through its own connection while replicas read the committed state.
#[derive(Debug, Clone)]
pub struct PrimaryFileSource {
    path: PathBuf,
}

impl PrimaryFileSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl SnapshotSource for PrimaryFileSource {
    async fn fetch_snapshot(&self) -> Result<Vec<Employee>, StoreError> {
        let path = self.path.clone();
        tokio::task::spawn_blocking(move || {
            let conn = Connection::open_with_flags(
                &path,
                OpenFlags::SQLITE_OPEN_READ_ONLY | OpenFlags::SQLITE_OPEN_NO_MUTEX,
            )?;
            read_all(&conn)
        })
        .await
        .map_err(|e| StoreError::Task(e.to_string()))?
    }

    fn describe(&self) -> String {
        self.path.display().to_string()
    }
}
