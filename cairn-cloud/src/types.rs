//! Shared types for push results and sync state.

use crate::catalog::SourceDb;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;

/// Per-source-database watermarks plus last-attempt bookkeeping.
///
/// Owned exclusively by the caller between pushes; `push()` reads it once,
/// mutates a copy in memory, and hands it back. Persistence is the
/// caller's job. Cursors never regress across successful pushes.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct SyncState {
    pub drift_cursor: i64,
    pub bridge_cursor: i64,
    pub cortex_cursor: i64,
    pub last_sync_at: Option<DateTime<Utc>>,
    pub last_sync_row_count: u64,
}

impl SyncState {
    pub fn cursor_for(&self, source: SourceDb) -> i64 {
        match source {
            SourceDb::Drift => self.drift_cursor,
            SourceDb::Bridge => self.bridge_cursor,
            SourceDb::Cortex => self.cortex_cursor,
        }
    }

    pub fn set_cursor(&mut self, source: SourceDb, cursor: i64) {
        match source {
            SourceDb::Drift => self.drift_cursor = cursor,
            SourceDb::Bridge => self.bridge_cursor = cursor,
            SourceDb::Cortex => self.cortex_cursor = cursor,
        }
    }
}

/// One failure recorded during a push, confined to a single table unless
/// the whole push aborted before any table ran.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SyncFailure {
    /// The local table the failure belongs to; `None` for push-level
    /// failures such as a missing token.
    pub table: Option<String>,
    pub message: String,
    /// Whether re-running the push can plausibly succeed on its own.
    pub retryable: bool,
}

/// Outcome of one `push()` call.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct PushResult {
    /// True iff `errors` is empty. Zero changed rows is still success.
    pub success: bool,
    /// Rows confirmed uploaded, summed over fully-successful tables.
    pub total_rows: u64,
    pub errors: Vec<SyncFailure>,
    /// The updated state to persist for the next push.
    pub sync_state: SyncState,
    /// Uploaded row count per fully-successful local table.
    pub table_counts: BTreeMap<String, u64>,
}

impl PushResult {
    /// Failures a scheduled re-run can absorb on its own.
    pub fn retryable_errors(&self) -> impl Iterator<Item = &SyncFailure> {
        self.errors.iter().filter(|e| e.retryable)
    }

    /// Failures needing operator action before a retry can help.
    pub fn non_retryable_errors(&self) -> impl Iterator<Item = &SyncFailure> {
        self.errors.iter().filter(|e| !e.retryable)
    }
}

/// Emitted after each table completes, success or failure. Purely
/// observational.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct TableProgress {
    pub table: String,
    /// Rows uploaded; 0 when the table failed.
    pub rows: u64,
    pub succeeded: bool,
    /// Tables completed so far, this one included.
    pub completed: usize,
    /// Total tables in the catalog.
    pub total: usize,
}

/// Progress callback fired per completed table.
pub type ProgressFn = Arc<dyn Fn(TableProgress) + Send + Sync>;

/// Options for one `push()` call.
#[derive(Clone, Default)]
pub struct PushOptions {
    /// Read every table from cursor 0 for this push only. Never regresses
    /// a cursor; it only forces re-reading history once.
    pub full_sync: bool,
    pub on_progress: Option<ProgressFn>,
}

impl PushOptions {
    pub fn full_sync() -> Self {
        Self {
            full_sync: true,
            on_progress: None,
        }
    }
}
