//! Catalog: database and table metadata records and their persistence

pub mod metadata;
pub mod store;

pub use metadata::{
    DatabaseEntry, DatabaseMetadata, DatabaseTableEntry, GlobalMetadata, TableEntry,
    TableMetadata, METADATA_VERSION,
};
pub use store::{JsonMetadataStore, MetadataStore};
