//! Storage layer implementation
//!
//! Flat-file engine: JSON catalog records plus append-only CSV data files
//! per table, read back through batched scans.

pub mod layout;
pub mod data_file;
pub mod coerce;
pub mod scan;
pub mod engine;

pub use layout::Layout;
pub use coerce::{coerce_field, TRUTHY};
pub use scan::TableScan;
pub use engine::StorageEngine;
