//! Cloud sync configuration.

use crate::error::{CloudError, CloudResult};
use serde::{Deserialize, Serialize};

/// Configuration for the cloud sync engine.
///
/// Tenant and project identity live here, never in local row data: the
/// uploader stamps them onto every outgoing row from this struct.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct CloudConfig {
    /// Base URL for the Cairn cloud API (e.g., "https://cloud.cairnhq.dev").
    pub base_url: String,

    /// Tenant identifier stamped onto every uploaded row.
    pub tenant_id: String,

    /// Project identifier stamped onto every uploaded row.
    pub project_id: String,

    /// Absolute path of the local project root, used to relativize paths
    /// before upload.
    pub project_root: String,

    /// Rows per upsert request.
    pub batch_size: usize,

    /// Table pipelines run concurrently up to this limit.
    pub max_concurrent_tables: usize,

    /// Batches within one table dispatch concurrently up to this limit.
    pub max_concurrent_batches: usize,

    /// Per-request timeout in seconds.
    pub request_timeout_secs: u64,

    /// Optional overall deadline for one push, in seconds.
    pub push_timeout_secs: Option<u64>,
}

impl Default for CloudConfig {
    fn default() -> Self {
        Self {
            base_url: "https://cloud.cairnhq.dev".to_string(),
            tenant_id: String::new(),
            project_id: String::new(),
            project_root: String::new(),
            batch_size: 500,
            max_concurrent_tables: 4,
            max_concurrent_batches: 4,
            request_timeout_secs: 30,
            push_timeout_secs: None,
        }
    }
}

impl CloudConfig {
    /// Checks the fields the uploader depends on before any row is read.
    pub fn validate(&self) -> CloudResult<()> {
        if self.base_url.is_empty() {
            return Err(CloudError::Config("base_url is empty".to_string()));
        }
        if self.tenant_id.is_empty() {
            return Err(CloudError::Config("tenant_id is empty".to_string()));
        }
        if self.project_id.is_empty() {
            return Err(CloudError::Config("project_id is empty".to_string()));
        }
        if self.batch_size == 0 {
            return Err(CloudError::Config("batch_size must be nonzero".to_string()));
        }
        if self.max_concurrent_tables == 0 || self.max_concurrent_batches == 0 {
            return Err(CloudError::Config(
                "concurrency limits must be nonzero".to_string(),
            ));
        }
        Ok(())
    }

    /// Creates a config pointed at a local mock server for test suites.
    pub fn test(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            tenant_id: "tenant-test".to_string(),
            project_id: "project-test".to_string(),
            project_root: "/home/dev/project".to_string(),
            batch_size: 500,
            max_concurrent_tables: 4,
            max_concurrent_batches: 4,
            request_timeout_secs: 5,
            push_timeout_secs: None,
        }
    }
}
