//! Remote database service abstraction.
//!
//! [`DatabaseApi`] is the seam between the clone engine and the service that
//! hosts the databases. The engine only ever talks to an
//! `Arc<dyn DatabaseApi>` handed to it at construction, so the HTTP client
//! and test doubles are interchangeable.

use async_trait::async_trait;

use crate::error::Result;

use super::schema::{DatabaseSchema, QueryPage, Row, RowValues, Schema};

/// Operations the clone engine needs from the remote service.
#[async_trait]
pub trait DatabaseApi: Send + Sync {
    /// Retrieve a database's title and schema.
    ///
    /// Fails with `NotFound` / `Unauthorized` as reported by the service.
    async fn retrieve_schema(&self, database_id: &str) -> Result<DatabaseSchema>;

    /// Create a database under `parent_id` and return its id.
    async fn create_database(&self, parent_id: &str, title: &str, schema: &Schema)
        -> Result<String>;

    /// Add fields to an existing database's schema.
    async fn update_schema(&self, database_id: &str, fields_to_add: &Schema) -> Result<()>;

    /// Fetch one page of rows. `cursor` is absent on the first call.
    async fn query_rows(
        &self,
        database_id: &str,
        cursor: Option<&str>,
        page_size: usize,
    ) -> Result<QueryPage>;

    /// Create a row and return its id.
    async fn create_row(&self, database_id: &str, values: &RowValues) -> Result<String>;

    /// Retrieve a single row.
    async fn retrieve_row(&self, row_id: &str) -> Result<Row>;

    /// Overwrite the given values of a row.
    async fn update_row(&self, row_id: &str, values: &RowValues) -> Result<()>;
}
