//! Batched upsert uploads to the cloud endpoint.
//!
//! Rows arrive here already redacted. The uploader stamps tenant/project
//! identity from configuration onto every row (local data is never trusted
//! for identity), chunks the result into fixed-size batches, and issues
//! upsert-by-conflict-key requests so repeated delivery of the same row is
//! a no-op. One failed batch invalidates only its own rows.

use crate::config::CloudConfig;
use crate::error::{CloudError, CloudResult};
use cairn_types::{Row, RowValue};
use futures::stream::{self, StreamExt};
use reqwest::Client;
use std::time::Duration;
use tracing::debug;

/// Uploads redacted rows as idempotent upsert batches.
pub struct BatchUploader {
    client: Client,
    config: CloudConfig,
}

impl BatchUploader {
    pub fn new(config: CloudConfig) -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()
            .expect("failed to build HTTP client");

        Self { client, config }
    }

    /// Uploads `rows` to `cloud_table` in `batch_size` chunks, dispatched
    /// concurrently up to the configured limit. Returns every batch
    /// failure; an empty vec means the whole table is confirmed uploaded.
    /// Never touches cursors; that is the orchestrator's job.
    pub async fn upload_table(
        &self,
        cloud_table: &str,
        conflict_columns: &[&str],
        rows: &[Row],
        token: &str,
    ) -> Vec<CloudError> {
        if token.is_empty() {
            return vec![CloudError::AuthRequired];
        }
        if rows.is_empty() {
            return Vec::new();
        }

        let stamped: Vec<Row> = rows.iter().map(|r| self.stamp_identity(r)).collect();
        let url = format!("{}/rest/v1/{}", self.config.base_url, cloud_table);
        let on_conflict = conflict_columns.join(",");
        let batch_count = stamped.chunks(self.config.batch_size).count();

        let uploads = stamped
            .chunks(self.config.batch_size)
            .enumerate()
            .map(|(index, chunk)| {
                self.send_batch(&url, &on_conflict, cloud_table, index, batch_count, chunk, token)
            });

        let results: Vec<CloudResult<()>> = stream::iter(uploads)
            .buffer_unordered(self.config.max_concurrent_batches)
            .collect()
            .await;

        results.into_iter().filter_map(Result::err).collect()
    }

    /// Tenant isolation boundary: identity always comes from configuration,
    /// overwriting whatever the local row carried.
    fn stamp_identity(&self, row: &Row) -> Row {
        let mut stamped = row.clone();
        stamped.insert(
            "tenant_id".to_string(),
            RowValue::Text(self.config.tenant_id.clone()),
        );
        stamped.insert(
            "project_id".to_string(),
            RowValue::Text(self.config.project_id.clone()),
        );
        stamped
    }

    #[allow(clippy::too_many_arguments)]
    async fn send_batch(
        &self,
        url: &str,
        on_conflict: &str,
        cloud_table: &str,
        index: usize,
        batch_count: usize,
        chunk: &[Row],
        token: &str,
    ) -> CloudResult<()> {
        let resp = self
            .client
            .post(url)
            .query(&[("on_conflict", on_conflict)])
            .bearer_auth(token)
            .header("Prefer", "resolution=merge-duplicates,return=minimal")
            .json(&chunk)
            .send()
            .await?;

        let status = resp.status();
        if status.is_success() {
            debug!(
                "uploaded batch {}/{batch_count} ({} rows) to {cloud_table}",
                index + 1,
                chunk.len()
            );
            return Ok(());
        }

        let message = resp.text().await.unwrap_or_default();
        if status.is_client_error() {
            Err(CloudError::Rejected {
                status: status.as_u16(),
                message,
            })
        } else {
            Err(CloudError::ServerError {
                status: status.as_u16(),
                message,
            })
        }
    }
}
