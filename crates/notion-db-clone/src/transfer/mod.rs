//! Batch replication of rows into the new database.
//!
//! Rows are created in fixed-size batches. Batches run strictly one after the
//! other; inside a batch every creation request is in flight at once and the
//! batch completes only when all of them have settled. A failing row is
//! recorded and never retried, and never stops the rows around it.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use futures::future::join_all;
use tracing::{debug, info, warn};

use crate::core::{DatabaseApi, Row, Schema};
use crate::error::{Error, Result};
use crate::filter::{filter_row_values, RenameTable};

/// A row whose creation failed.
#[derive(Debug, Clone)]
pub struct RowFailure {
    /// Id of the row in the source database.
    pub source_row_id: String,
    pub error: String,
}

/// Statistics from replicating rows.
#[derive(Debug, Clone, Default)]
pub struct ReplicationStats {
    /// Rows created successfully.
    pub copied: usize,

    /// Rows whose creation failed.
    pub failed: usize,

    /// Number of batches issued.
    pub batches: usize,

    /// Source row id to created row id, captured from each creation.
    pub id_map: HashMap<String, String>,

    /// Failure details, in batch order.
    pub failures: Vec<RowFailure>,

    /// Time spent replicating.
    pub elapsed: Duration,
}

/// Creates the target database and replays rows into it.
pub struct Replicator {
    api: Arc<dyn DatabaseApi>,
    batch_size: usize,
    renames: RenameTable,
}

impl Replicator {
    /// Create a replicator issuing `batch_size` concurrent creations per batch.
    pub fn new(api: Arc<dyn DatabaseApi>, batch_size: usize, renames: RenameTable) -> Self {
        Self {
            api,
            batch_size: batch_size.max(1),
            renames,
        }
    }

    /// Create the target database with the filtered schema.
    ///
    /// A single remote call; any failure is fatal for the clone. Failures the
    /// service classified (not found, unauthorized, validation) are returned
    /// as-is, everything else becomes `Error::Clone`.
    pub async fn create_database(
        &self,
        parent_id: &str,
        title: &str,
        schema: &Schema,
    ) -> Result<String> {
        debug!(
            "Creating database {:?} under {} with {} fields",
            title,
            parent_id,
            schema.len()
        );
        self.api
            .create_database(parent_id, title, schema)
            .await
            .map_err(|e| {
                if e.is_remote_classified() {
                    e
                } else {
                    Error::clone_failed(format!("creating database {:?}: {}", title, e))
                }
            })
    }

    /// Create every row in `rows` in `database_id`.
    ///
    /// Always returns; per-row failures are counted in the stats.
    pub async fn replicate_rows(&self, database_id: &str, rows: &[Row]) -> ReplicationStats {
        let start = Instant::now();
        let mut stats = ReplicationStats::default();
        let total_batches = rows.len().div_ceil(self.batch_size);

        for (index, batch) in rows.chunks(self.batch_size).enumerate() {
            stats.batches += 1;

            let results = join_all(batch.iter().map(|row| self.create_one(database_id, row))).await;

            let mut batch_failed = 0;
            for (source_row_id, result) in results {
                match result {
                    Ok(created_id) => {
                        stats.copied += 1;
                        stats.id_map.insert(source_row_id, created_id);
                    }
                    Err(e) => {
                        warn!("Row {} failed to copy: {}", source_row_id, e);
                        batch_failed += 1;
                        stats.failures.push(RowFailure {
                            source_row_id,
                            error: e.to_string(),
                        });
                    }
                }
            }
            stats.failed += batch_failed;

            debug!(
                "Batch {}/{}: {} rows, {} failed",
                index + 1,
                total_batches,
                batch.len(),
                batch_failed
            );
        }

        stats.elapsed = start.elapsed();
        info!(
            "Copied {}/{} rows in {} batches ({} failed) in {:.1}s",
            stats.copied,
            rows.len(),
            stats.batches,
            stats.failed,
            stats.elapsed.as_secs_f64()
        );
        stats
    }

    async fn create_one(&self, database_id: &str, row: &Row) -> (String, Result<String>) {
        let values = filter_row_values(&row.values, &self.renames);
        let result = self.api.create_row(database_id, &values).await;
        (row.id.clone(), result)
    }
}
