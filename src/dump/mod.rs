// ABOUTME: Export engine: catalog introspection, value serialization, extraction, archiving
// ABOUTME: Each phase works against a Session and writes into the staging area

pub mod archive;
pub mod catalog;
pub mod data;
pub mod query;
pub mod schema;
pub mod value;

pub use archive::create_archive;
pub use catalog::{describe_table, list_tables, ColumnDescriptor, TableDescriptor};
pub use data::dump_tables;
pub use schema::{dump_schema, SCHEMA_FILE};
pub use value::{parse_literal, serialize, split_row, SqlValue};
