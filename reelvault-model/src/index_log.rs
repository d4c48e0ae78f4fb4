//! Idempotency and audit record for indexed source files.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::ids::{IndexLogId, WatchableId};

/// One row per source filepath. The filepath is the dedup key: a path with an
/// existing log is never reprocessed automatically.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndexLog {
    pub id: IndexLogId,
    pub filepath: PathBuf,
    pub indexing: bool,
    pub failed: bool,
    pub error: Option<String>,
    pub watchable: Option<WatchableId>,
    pub indexed_at: DateTime<Utc>,
}

impl IndexLog {
    /// A fresh log for a job that is about to start.
    pub fn started(filepath: impl AsRef<Path>) -> Self {
        Self {
            id: IndexLogId::new(),
            filepath: filepath.as_ref().to_path_buf(),
            indexing: true,
            failed: false,
            error: None,
            watchable: None,
            indexed_at: Utc::now(),
        }
    }

    pub fn complete(&mut self, watchable: WatchableId) {
        self.indexing = false;
        self.failed = false;
        self.error = None;
        self.watchable = Some(watchable);
    }

    pub fn fail(&mut self, error: impl Into<String>) {
        self.indexing = false;
        self.failed = true;
        self.error = Some(error.into());
    }

    /// Reset for a retry run, keeping the row identity.
    pub fn restart(&mut self) {
        self.indexing = true;
        self.failed = false;
        self.error = None;
        self.indexed_at = Utc::now();
    }
}
