//! Cloud sync engine for Cairn.
//!
//! Incrementally replicates rows from the three local databases (drift,
//! bridge, cortex) into the multi-tenant cloud store:
//! - Static table catalog with per-table upsert conflict keys
//! - Mandatory redaction boundary (paths, secrets, source text, blobs)
//! - Batched idempotent upserts with tenant/project identity stamping
//! - Per-table failure isolation and monotonic per-database cursors

pub mod catalog;
pub mod config;
pub mod error;
pub mod reader;
pub mod redaction;
pub mod sync_client;
pub mod types;
pub mod uploader;

pub use catalog::{Catalog, SourceDb, TableDefinition};
pub use config::CloudConfig;
pub use error::{CloudError, CloudResult};
pub use reader::{LocalRowReader, StaticTokenProvider, TokenProvider};
pub use redaction::{RedactionEngine, RedactionKind, SECRET_MARKER};
pub use sync_client::SyncClient;
pub use types::{PushOptions, PushResult, SyncFailure, SyncState, TableProgress};
pub use uploader::BatchUploader;
