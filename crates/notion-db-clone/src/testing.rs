//! In-memory [`DatabaseApi`] used by unit tests.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;

use crate::core::{DatabaseApi, DatabaseSchema, QueryPage, Row, RowValues, Schema};
use crate::error::{Error, Result};

#[derive(Debug, Clone)]
pub struct MockDatabase {
    pub parent_id: String,
    pub title: String,
    pub schema: Schema,
    pub row_ids: Vec<String>,
}

#[derive(Default)]
struct Store {
    databases: HashMap<String, MockDatabase>,
    rows: HashMap<String, Row>,
}

/// Substitute remote service holding databases and rows in memory.
#[derive(Default)]
pub struct MockApi {
    store: Mutex<Store>,
    next_id: AtomicUsize,
    pub query_calls: AtomicUsize,
    pub create_row_calls: AtomicUsize,
    pub update_row_calls: AtomicUsize,
    in_flight: AtomicUsize,
    pub max_in_flight: AtomicUsize,
    fail_every_nth_create: Option<usize>,
    fail_queries_for: HashSet<String>,
    fail_create_database: bool,
    fail_updates_for: Mutex<HashSet<String>>,
}

impl MockApi {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fail every Nth create_row call (1-based).
    pub fn failing_every_nth_create(mut self, n: usize) -> Self {
        self.fail_every_nth_create = Some(n);
        self
    }

    /// Fail queries against `database_id`.
    pub fn failing_queries_for(mut self, database_id: &str) -> Self {
        self.fail_queries_for.insert(database_id.to_string());
        self
    }

    /// Fail every database creation.
    pub fn failing_create_database(mut self) -> Self {
        self.fail_create_database = true;
        self
    }

    /// Fail update_row for `row_id`.
    pub fn fail_updates_for(&self, row_id: &str) {
        self.fail_updates_for
            .lock()
            .unwrap()
            .insert(row_id.to_string());
    }

    fn fresh_id(&self) -> String {
        let n = self.next_id.fetch_add(1, Ordering::SeqCst) + 1;
        format!("{:08x}-0000-4000-8000-{:012x}", n, n)
    }

    /// Seed a database with rows; returns the row ids in order.
    pub fn add_database(&self, id: &str, title: &str, schema: Schema, rows: Vec<Row>) -> Vec<String> {
        let mut store = self.store.lock().unwrap();
        let row_ids: Vec<String> = rows.iter().map(|r| r.id.clone()).collect();
        for row in rows {
            store.rows.insert(row.id.clone(), row);
        }
        store.databases.insert(
            id.to_string(),
            MockDatabase {
                parent_id: String::new(),
                title: title.to_string(),
                schema,
                row_ids: row_ids.clone(),
            },
        );
        row_ids
    }

    pub fn database(&self, id: &str) -> Option<MockDatabase> {
        self.store.lock().unwrap().databases.get(id).cloned()
    }

    /// Ids of databases created through the API, excluding seeded ones.
    pub fn created_databases(&self) -> Vec<String> {
        let store = self.store.lock().unwrap();
        store
            .databases
            .iter()
            .filter(|(_, db)| !db.parent_id.is_empty())
            .map(|(id, _)| id.clone())
            .collect()
    }

    pub fn row(&self, id: &str) -> Option<Row> {
        self.store.lock().unwrap().rows.get(id).cloned()
    }

    pub fn rows_of(&self, database_id: &str) -> Vec<Row> {
        let store = self.store.lock().unwrap();
        store
            .databases
            .get(database_id)
            .map(|db| {
                db.row_ids
                    .iter()
                    .filter_map(|id| store.rows.get(id).cloned())
                    .collect()
            })
            .unwrap_or_default()
    }

    fn enter(&self) {
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);
    }

    fn leave(&self) {
        self.in_flight.fetch_sub(1, Ordering::SeqCst);
    }
}

#[async_trait]
impl DatabaseApi for MockApi {
    async fn retrieve_schema(&self, database_id: &str) -> Result<DatabaseSchema> {
        let store = self.store.lock().unwrap();
        let db = store
            .databases
            .get(database_id)
            .ok_or_else(|| Error::NotFound(format!("database {}", database_id)))?;
        Ok(DatabaseSchema {
            id: database_id.to_string(),
            title: db.title.clone(),
            schema: db.schema.clone(),
        })
    }

    async fn create_database(
        &self,
        parent_id: &str,
        title: &str,
        schema: &Schema,
    ) -> Result<String> {
        if self.fail_create_database {
            return Err(Error::clone_failed("database creation rejected"));
        }
        let id = self.fresh_id();
        self.store.lock().unwrap().databases.insert(
            id.clone(),
            MockDatabase {
                parent_id: parent_id.to_string(),
                title: title.to_string(),
                schema: schema.clone(),
                row_ids: Vec::new(),
            },
        );
        Ok(id)
    }

    async fn update_schema(&self, database_id: &str, fields_to_add: &Schema) -> Result<()> {
        let mut store = self.store.lock().unwrap();
        let db = store
            .databases
            .get_mut(database_id)
            .ok_or_else(|| Error::NotFound(format!("database {}", database_id)))?;
        for (name, definition) in fields_to_add.iter() {
            db.schema.insert(name, definition.clone());
        }
        Ok(())
    }

    async fn query_rows(
        &self,
        database_id: &str,
        cursor: Option<&str>,
        page_size: usize,
    ) -> Result<QueryPage> {
        self.query_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_queries_for.contains(database_id) {
            return Err(Error::clone_failed("service unavailable"));
        }

        let rows = self.rows_of(database_id);
        let start: usize = cursor.and_then(|c| c.parse().ok()).unwrap_or(0);
        let end = (start + page_size).min(rows.len());
        let has_more = end < rows.len();

        Ok(QueryPage {
            rows: rows[start.min(end)..end].to_vec(),
            has_more,
            next_cursor: has_more.then(|| end.to_string()),
        })
    }

    async fn create_row(&self, database_id: &str, values: &RowValues) -> Result<String> {
        let call = self.create_row_calls.fetch_add(1, Ordering::SeqCst) + 1;
        self.enter();
        tokio::task::yield_now().await;
        self.leave();

        if let Some(n) = self.fail_every_nth_create {
            if call % n == 0 {
                return Err(Error::validation("properties", "rejected by mock"));
            }
        }

        let id = self.fresh_id();
        let mut store = self.store.lock().unwrap();
        let db = store
            .databases
            .get_mut(database_id)
            .ok_or_else(|| Error::NotFound(format!("database {}", database_id)))?;
        db.row_ids.push(id.clone());
        store
            .rows
            .insert(id.clone(), Row::new(id.clone(), values.clone()));
        Ok(id)
    }

    async fn retrieve_row(&self, row_id: &str) -> Result<Row> {
        self.store
            .lock()
            .unwrap()
            .rows
            .get(row_id)
            .cloned()
            .ok_or_else(|| Error::NotFound(format!("page {}", row_id)))
    }

    async fn update_row(&self, row_id: &str, values: &RowValues) -> Result<()> {
        self.update_row_calls.fetch_add(1, Ordering::SeqCst);
        self.enter();
        tokio::task::yield_now().await;
        self.leave();

        if self.fail_updates_for.lock().unwrap().contains(row_id) {
            return Err(Error::clone_failed("update rejected"));
        }

        let mut store = self.store.lock().unwrap();
        let row = store
            .rows
            .get_mut(row_id)
            .ok_or_else(|| Error::NotFound(format!("page {}", row_id)))?;
        for (name, value) in values.iter() {
            row.values.insert(name, value.clone());
        }
        Ok(())
    }
}
