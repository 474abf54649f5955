//! Query execution layer

pub mod batch_ops;
pub mod sinks;
mod executor;

pub use batch_ops::{filter_batches, project_batches, BatchIter, BatchSource};
pub use sinks::{InsertSink, OutputSink, RowAppender, Sink, TupleSink};
pub use executor::Executor;
