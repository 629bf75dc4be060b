//! Core abstractions shared by every clone phase.
//!
//! - [`schema`]: field definitions, rows and their wire encoding
//! - [`identifier`]: identifier validation
//! - [`traits`]: the [`DatabaseApi`] seam to the remote service

pub mod identifier;
pub mod schema;
pub mod traits;

pub use identifier::{canonical_id, same_id, validate_id};
pub use schema::{
    DatabaseSchema, FieldDefinition, FieldKind, FieldMap, PropertyValue, QueryPage, Row,
    RowValues, Schema,
};
pub use traits::DatabaseApi;
