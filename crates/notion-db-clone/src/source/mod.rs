//! Source reading: cursor pagination over a database's rows.

use std::sync::Arc;

use tracing::{debug, warn};

use crate::config::MAX_PAGE_SIZE;
use crate::core::{DatabaseApi, Row};
use crate::error::{Error, Result};

/// Reads every row of a database page by page.
pub struct Paginator {
    api: Arc<dyn DatabaseApi>,
    page_size: usize,
}

impl Paginator {
    /// Create a paginator requesting `page_size` rows per call (capped at 100).
    pub fn new(api: Arc<dyn DatabaseApi>, page_size: usize) -> Self {
        Self {
            api,
            page_size: page_size.clamp(1, MAX_PAGE_SIZE),
        }
    }

    pub fn page_size(&self) -> usize {
        self.page_size
    }

    /// Fetch all rows of `database_id` in service order.
    ///
    /// Any failing page aborts the whole fetch with `Error::TransientFetch`;
    /// nothing is retried here.
    pub async fn fetch_all(&self, database_id: &str) -> Result<Vec<Row>> {
        let mut rows = Vec::new();
        let mut cursor: Option<String> = None;
        let mut pages = 0usize;

        loop {
            let page = self
                .api
                .query_rows(database_id, cursor.as_deref(), self.page_size)
                .await
                .map_err(|e| Error::transient_fetch(database_id, e.to_string()))?;
            pages += 1;

            debug!(
                "{}: page {} returned {} rows (has_more={})",
                database_id,
                pages,
                page.rows.len(),
                page.has_more
            );
            rows.extend(page.rows);

            if !page.has_more {
                break;
            }
            match page.next_cursor {
                Some(next) => cursor = Some(next),
                None => {
                    warn!(
                        "{}: service reported more rows without a cursor, stopping after {} pages",
                        database_id, pages
                    );
                    break;
                }
            }
        }

        debug!("{}: fetched {} rows in {} pages", database_id, rows.len(), pages);
        Ok(rows)
    }
}
