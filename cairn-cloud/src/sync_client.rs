//! Push orchestration.
//!
//! Runs each catalog table through its own read → redact → upload
//! pipeline, isolates failures per table, and advances per-database
//! cursors only from tables whose entire row set is confirmed uploaded.
//! The client is an explicit value owning its configuration and a token
//! provider; there is no hidden global state, so concurrent or test
//! sessions never interfere.

use crate::catalog::{Catalog, SourceDb, TableDefinition};
use crate::config::CloudConfig;
use crate::error::{CloudError, CloudResult};
use crate::reader::{LocalRowReader, TokenProvider};
use crate::redaction::RedactionEngine;
use crate::types::{PushOptions, PushResult, SyncFailure, SyncState, TableProgress};
use crate::uploader::BatchUploader;
use chrono::Utc;
use futures::stream::{self, StreamExt};
use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Orchestrates one push of local rows to the cloud.
pub struct SyncClient {
    config: CloudConfig,
    catalog: Catalog,
    redaction: RedactionEngine,
    uploader: BatchUploader,
    tokens: Arc<dyn TokenProvider>,
}

impl std::fmt::Debug for SyncClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SyncClient").finish_non_exhaustive()
    }
}

/// Result of one table's pipeline. Empty `failures` means Done.
struct TableOutcome {
    table: &'static str,
    source: SourceDb,
    rows: u64,
    max_row_id: Option<i64>,
    failures: Vec<SyncFailure>,
}

impl TableOutcome {
    fn succeeded(&self) -> bool {
        self.failures.is_empty()
    }

    fn done(table: &'static str, source: SourceDb) -> Self {
        Self {
            table,
            source,
            rows: 0,
            max_row_id: None,
            failures: Vec::new(),
        }
    }

    fn failed(table: &'static str, source: SourceDb, failures: Vec<SyncFailure>) -> Self {
        Self {
            table,
            source,
            rows: 0,
            max_row_id: None,
            failures,
        }
    }
}

impl SyncClient {
    /// Builds a client, validating catalog and redaction configuration up
    /// front so config drift surfaces here rather than per row mid-push.
    pub fn new(config: CloudConfig, tokens: Arc<dyn TokenProvider>) -> CloudResult<Self> {
        config.validate()?;
        let catalog = Catalog::standard();
        catalog.validate()?;
        let redaction = RedactionEngine::standard();
        redaction.validate(&catalog)?;
        let uploader = BatchUploader::new(config.clone());

        Ok(Self {
            config,
            catalog,
            redaction,
            uploader,
            tokens,
        })
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    pub fn redaction(&self) -> &RedactionEngine {
        &self.redaction
    }

    /// Pushes every catalog table once and returns a structured result.
    ///
    /// Never returns `Err` for operational failures: authentication,
    /// network and server problems all land in `PushResult::errors`,
    /// tagged retryable or not, so the caller decides retry policy.
    /// `last_sync_at` / `last_sync_row_count` are refreshed on every
    /// return, partial failures and auth aborts included.
    pub async fn push(
        &self,
        reader: &dyn LocalRowReader,
        previous: SyncState,
        options: PushOptions,
    ) -> PushResult {
        // Token check happens before any suspension point: a missing token
        // fails the whole push with zero network calls.
        let token = match self.tokens.bearer_token() {
            Some(t) if !t.is_empty() => t,
            _ => {
                warn!("push aborted: no bearer token available");
                let mut state = previous.clone();
                state.last_sync_at = Some(Utc::now());
                state.last_sync_row_count = 0;
                return PushResult {
                    success: false,
                    total_rows: 0,
                    errors: vec![SyncFailure {
                        table: None,
                        message: CloudError::AuthRequired.to_string(),
                        retryable: false,
                    }],
                    sync_state: state,
                    table_counts: BTreeMap::new(),
                };
            }
        };

        info!(
            "pushing {} tables for project {}",
            self.catalog.len(),
            self.config.project_id
        );

        // Per-database no-change fast path: if the database's highest row
        // id hasn't moved past our cursor, its tables have nothing to read.
        let mut skip_db: HashSet<SourceDb> = HashSet::new();
        if !options.full_sync {
            for db in SourceDb::ALL {
                if self.catalog.tables_for(db).next().is_none() {
                    continue;
                }
                match reader.max_cursor(db).await {
                    Ok(max) if max <= previous.cursor_for(db) => {
                        debug!("{db} unchanged at cursor {max}, skipping reads");
                        skip_db.insert(db);
                    }
                    Ok(_) => {}
                    Err(e) => warn!("max_cursor({db}) failed, reading anyway: {e}"),
                }
            }
        }

        let total = self.catalog.len();
        let mut completed: HashSet<&'static str> = HashSet::new();
        let mut outcomes: Vec<TableOutcome> = Vec::new();
        let mut timed_out = false;

        // Inner scope: the table stream borrows the previous state and the
        // token; it must drop before aggregation takes ownership.
        {
            let tasks = self.catalog.tables().iter().map(|def| {
                self.sync_table(
                    reader,
                    def,
                    previous.cursor_for(def.source),
                    options.full_sync,
                    skip_db.contains(&def.source),
                    &token,
                )
            });
            let table_stream =
                stream::iter(tasks).buffer_unordered(self.config.max_concurrent_tables);
            futures::pin_mut!(table_stream);

            let deadline = self
                .config
                .push_timeout_secs
                .map(|s| tokio::time::Instant::now() + Duration::from_secs(s));

            loop {
                let next = match deadline {
                    Some(at) => match tokio::time::timeout_at(at, table_stream.next()).await {
                        Ok(n) => n,
                        Err(_) => {
                            timed_out = true;
                            break;
                        }
                    },
                    None => table_stream.next().await,
                };
                let Some(outcome) = next else { break };

                completed.insert(outcome.table);
                if let Some(cb) = &options.on_progress {
                    cb(TableProgress {
                        table: outcome.table.to_string(),
                        rows: outcome.rows,
                        succeeded: outcome.succeeded(),
                        completed: completed.len(),
                        total,
                    });
                }
                outcomes.push(outcome);
            }
        }

        if timed_out {
            warn!(
                "push deadline exceeded with {} of {total} tables completed",
                completed.len()
            );
            // In-flight batches are abandoned; their tables record a
            // retryable failure so their databases never advance past
            // unconfirmed rows.
            for def in self.catalog.tables() {
                if completed.contains(def.local_table) {
                    continue;
                }
                completed.insert(def.local_table);
                let outcome = TableOutcome::failed(
                    def.local_table,
                    def.source,
                    vec![SyncFailure {
                        table: Some(def.local_table.to_string()),
                        message: CloudError::Timeout.to_string(),
                        retryable: true,
                    }],
                );
                if let Some(cb) = &options.on_progress {
                    cb(TableProgress {
                        table: def.local_table.to_string(),
                        rows: 0,
                        succeeded: false,
                        completed: completed.len(),
                        total,
                    });
                }
                outcomes.push(outcome);
            }
        }

        self.aggregate(&previous, outcomes)
    }

    /// One table's Pending → Reading → Redacting → Uploading pipeline.
    async fn sync_table(
        &self,
        reader: &dyn LocalRowReader,
        def: &TableDefinition,
        previous_cursor: i64,
        full_sync: bool,
        skip: bool,
        token: &str,
    ) -> TableOutcome {
        let table = def.local_table;
        if skip {
            return TableOutcome::done(table, def.source);
        }

        let since = if full_sync { 0 } else { previous_cursor };
        let rows = match reader.read_rows(table, def.source, since).await {
            Ok(rows) => rows,
            Err(e) => {
                warn!("read failed for {table}: {e}");
                return TableOutcome::failed(
                    table,
                    def.source,
                    vec![SyncFailure {
                        table: Some(table.to_string()),
                        message: e.to_string(),
                        retryable: e.is_retryable(),
                    }],
                );
            }
        };
        if rows.is_empty() {
            debug!("{table}: no rows past cursor {since}");
            return TableOutcome::done(table, def.source);
        }

        let redacted = self
            .redaction
            .redact_batch(table, &rows, &self.config.project_root);

        let upload_errors = self
            .uploader
            .upload_table(&def.cloud_table(), def.conflict_columns, &redacted, token)
            .await;
        if !upload_errors.is_empty() {
            warn!("{table}: {} batch(es) failed", upload_errors.len());
            let failures = upload_errors
                .into_iter()
                .map(|e| SyncFailure {
                    table: Some(table.to_string()),
                    message: e.to_string(),
                    retryable: e.is_retryable(),
                })
                .collect();
            return TableOutcome::failed(table, def.source, failures);
        }

        let max_row_id = rows
            .iter()
            .filter_map(|r| r.get("id").and_then(|v| v.as_i64()))
            .max();
        debug!("{table}: uploaded {} rows", rows.len());

        TableOutcome {
            table,
            source: def.source,
            rows: rows.len() as u64,
            max_row_id,
            failures: Vec::new(),
        }
    }

    fn aggregate(&self, previous: &SyncState, outcomes: Vec<TableOutcome>) -> PushResult {
        let mut state = previous.clone();
        let mut total_rows = 0u64;
        let mut table_counts = BTreeMap::new();
        let mut errors = Vec::new();
        let mut db_failed: HashSet<SourceDb> = HashSet::new();
        let mut db_candidate: HashMap<SourceDb, i64> = HashMap::new();

        for outcome in outcomes {
            if outcome.succeeded() {
                total_rows += outcome.rows;
                table_counts.insert(outcome.table.to_string(), outcome.rows);
                if let Some(max_id) = outcome.max_row_id {
                    let candidate = db_candidate.entry(outcome.source).or_insert(max_id);
                    *candidate = (*candidate).max(max_id);
                }
            } else {
                db_failed.insert(outcome.source);
                errors.extend(outcome.failures);
            }
        }

        // A database's cursor advances only when every table reading from
        // it succeeded, so a failed table is re-read from the old cursor
        // next push. Advancement never regresses.
        for db in SourceDb::ALL {
            if db_failed.contains(&db) {
                continue;
            }
            if let Some(candidate) = db_candidate.get(&db) {
                let prev = previous.cursor_for(db);
                state.set_cursor(db, prev.max(*candidate));
            }
        }

        state.last_sync_at = Some(Utc::now());
        state.last_sync_row_count = total_rows;

        let success = errors.is_empty();
        if success {
            info!(
                "push complete: {total_rows} rows across {} tables",
                table_counts.len()
            );
        } else {
            warn!(
                "push finished with {} failure(s), {total_rows} rows uploaded",
                errors.len()
            );
        }

        PushResult {
            success,
            total_rows,
            errors,
            sync_state: state,
            table_counts,
        }
    }
}
