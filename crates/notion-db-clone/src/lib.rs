//! # notion-db-clone
//!
//! Clone a Notion database (schema and rows) into a new database.
//!
//! The library provides:
//!
//! - **Schema filtering** that drops relation and rollup fields and applies
//!   rename-and-reposition rules
//! - **Row filtering** that drops computed and system-maintained values
//! - **Cursor pagination** over the source rows
//! - **Batched replication** with bounded concurrency and per-row failure
//!   accounting
//! - **Hierarchy restore** for self-referential parent/child relations
//!
//! ## Example
//!
//! ```rust,no_run
//! use notion_db_clone::{CloneOptions, Cloner, Config};
//!
//! #[tokio::main]
//! async fn main() -> notion_db_clone::Result<()> {
//!     let config = Config::from_env()?;
//!     let cloner = Cloner::connect(config)?;
//!     let result = cloner
//!         .clone_database(
//!             "12345678-1234-1234-1234-123456789012",
//!             "abcdefabcdefabcdefabcdefabcdefab",
//!             CloneOptions::default(),
//!         )
//!         .await?;
//!     println!("Copied {} rows", result.copied_row_count);
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod core;
pub mod error;
pub mod filter;
pub mod hierarchy;
pub mod notion;
pub mod orchestrator;
pub mod source;
pub mod transfer;

#[cfg(test)]
pub(crate) mod testing;

// Re-exports for convenient access
pub use config::{CloneConfig, Config};
pub use self::core::{DatabaseApi, Row, Schema};
pub use error::{Error, Result};
pub use notion::NotionClient;
pub use orchestrator::{CloneOptions, ClonePlan, CloneResult, Cloner, HierarchyReport};
pub use source::Paginator;
pub use transfer::{ReplicationStats, Replicator};
