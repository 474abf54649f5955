//! Query execution engine
//!
//! Pull-based pipeline: scan → filter → project → sink. Each stage
//! handles one batch at a time, so memory stays bounded by the batch size
//! unless the sink itself accumulates.

use crate::error::Result;
use crate::query::batch_ops::{filter_batches, project_batches, BatchSource};
use crate::query::sinks::Sink;
use crate::sql::ast::Expr;
use crate::sql::evaluator::ExprEvaluator;

pub struct Executor<'a, S: BatchSource + ?Sized> {
    source: &'a S,
}

impl<'a, S: BatchSource + ?Sized> Executor<'a, S> {
    pub fn new(source: &'a S) -> Self {
        Self { source }
    }

    /// Stream `table` through an optional filter and projection into `sink`
    pub fn run_pipeline<K: Sink>(
        &self,
        database: &str,
        table: &str,
        batch_size: usize,
        predicate: Option<&Expr>,
        columns: Option<&[String]>,
        mut sink: K,
    ) -> Result<K::Output> {
        let mut batches = self.source.scan_batches(database, table, batch_size)?;

        if let Some(expr) = predicate {
            let expr = expr.clone();
            let evaluator = ExprEvaluator::new();
            batches = filter_batches(batches, move |row| evaluator.eval_predicate(&expr, row));
        }
        if let Some(columns) = columns {
            batches = project_batches(batches, columns.to_vec());
        }

        let mut processed = 0usize;
        for batch in batches {
            let batch = batch?;
            processed += batch.len();
            sink.consume(batch)?;
        }

        log::debug!("Pipeline over '{}.{}' passed {} row(s)", database, table, processed);
        sink.finish()
    }
}
