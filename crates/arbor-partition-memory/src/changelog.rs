//! In-memory Changelog Sink
//!
//! Collects change records in order; useful for tests and embedders that
//! inspect what the pipeline committed.

use arbor_core::DirectoryResult;
use arbor_pipeline::{ChangeRecord, ChangelogSink};
use async_trait::async_trait;
use std::sync::{Mutex, PoisonError};

/// A changelog sink that keeps records in memory, in arrival order.
#[derive(Debug, Default)]
pub struct MemoryChangelog {
    records: Mutex<Vec<ChangeRecord>>,
}

impl MemoryChangelog {
    /// An empty sink.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of all records so far.
    #[must_use]
    pub fn records(&self) -> Vec<ChangeRecord> {
        self.records
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Number of records collected.
    #[must_use]
    pub fn len(&self) -> usize {
        self.records
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// Whether no records were collected.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl ChangelogSink for MemoryChangelog {
    async fn record(&self, record: ChangeRecord) -> DirectoryResult<()> {
        self.records
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(record);
        Ok(())
    }
}
