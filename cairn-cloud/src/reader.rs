//! Ports consumed by the sync engine.
//!
//! The engine never opens the embedded databases itself; it reads rows
//! through [`LocalRowReader`] and obtains bearer tokens through
//! [`TokenProvider`]. Both are plain traits so test suites and alternate
//! frontends can supply their own implementations.

use crate::catalog::SourceDb;
use crate::error::CloudResult;
use async_trait::async_trait;
use cairn_types::Row;

/// Read access to the three local embedded databases.
#[async_trait]
pub trait LocalRowReader: Send + Sync {
    /// Returns every row of `local_table` with a local row id greater than
    /// `since_cursor`, as a finite, non-restartable batch.
    async fn read_rows(
        &self,
        local_table: &str,
        source: SourceDb,
        since_cursor: i64,
    ) -> CloudResult<Vec<Row>>;

    /// The highest local row id currently present in one source database.
    async fn max_cursor(&self, source: SourceDb) -> CloudResult<i64>;
}

/// Supplies the bearer token for one push.
///
/// Token acquisition (refresh, keychain access) lives behind this trait;
/// the engine only requires that a valid token is obtainable synchronously
/// at push start.
pub trait TokenProvider: Send + Sync {
    /// Returns the current bearer token, or `None` when no session exists.
    fn bearer_token(&self) -> Option<String>;
}

/// Token provider backed by a fixed string, for tests and one-shot CLIs.
pub struct StaticTokenProvider {
    token: Option<String>,
}

impl StaticTokenProvider {
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            token: Some(token.into()),
        }
    }

    /// A provider with no session at all.
    pub fn unauthenticated() -> Self {
        Self { token: None }
    }
}

impl TokenProvider for StaticTokenProvider {
    fn bearer_token(&self) -> Option<String> {
        self.token.clone()
    }
}
