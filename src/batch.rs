//! Batch accumulation with flush-on-full
//!
//! Rows are held until the configured batch size is reached, then handed to
//! the sink in one bulk insert and cleared. The remainder is flushed once at
//! the end of the run.

use crate::error::Result;
use crate::mapping::ColumnSchema;
use crate::sink::RowSink;
use crate::transform::OutputRow;
use std::sync::Arc;
use tracing::info;

/// A bounded group of rows sharing one column set
#[derive(Debug, Clone)]
pub struct Batch {
    columns: Arc<[ColumnSchema]>,
    rows: Vec<OutputRow>,
}

impl Batch {
    pub fn new(columns: Arc<[ColumnSchema]>) -> Self {
        Self {
            columns,
            rows: Vec::new(),
        }
    }

    pub fn with_rows(columns: Arc<[ColumnSchema]>, rows: Vec<OutputRow>) -> Self {
        Self { columns, rows }
    }

    pub fn columns(&self) -> &[ColumnSchema] {
        &self.columns
    }

    pub fn rows(&self) -> &[OutputRow] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    fn push(&mut self, row: OutputRow) {
        self.rows.push(row);
    }

    fn clear(&mut self) {
        self.rows.clear();
    }
}

/// Collects rows and flushes them to a sink in fixed-size batches
#[derive(Debug)]
pub struct BatchAccumulator {
    batch: Batch,
    batch_size: usize,
    flush_count: usize,
    rows_flushed: usize,
}

impl BatchAccumulator {
    pub fn new(columns: Arc<[ColumnSchema]>, batch_size: usize) -> Self {
        let batch_size = batch_size.max(1);
        let mut batch = Batch::new(columns);
        batch.rows.reserve(batch_size);

        Self {
            batch,
            batch_size,
            flush_count: 0,
            rows_flushed: 0,
        }
    }

    /// Append a row, flushing synchronously when the batch becomes full.
    ///
    /// Returns true when this call triggered a flush.
    pub async fn add<S>(&mut self, row: OutputRow, sink: &mut S) -> Result<bool>
    where
        S: RowSink + ?Sized,
    {
        self.batch.push(row);

        if self.batch.len() >= self.batch_size {
            self.flush(sink).await?;
            info!(
                "Processed data batch ({} rows so far)...",
                self.rows_flushed
            );
            return Ok(true);
        }

        Ok(false)
    }

    /// Flush any partial batch; does nothing when empty
    pub async fn finish<S>(&mut self, sink: &mut S) -> Result<bool>
    where
        S: RowSink + ?Sized,
    {
        if self.batch.is_empty() {
            return Ok(false);
        }

        self.flush(sink).await?;
        Ok(true)
    }

    async fn flush<S>(&mut self, sink: &mut S) -> Result<()>
    where
        S: RowSink + ?Sized,
    {
        sink.bulk_insert(&self.batch).await?;
        self.flush_count += 1;
        self.rows_flushed += self.batch.len();
        self.batch.clear();
        Ok(())
    }

    /// Rows currently waiting for a flush
    pub fn pending(&self) -> usize {
        self.batch.len()
    }

    pub fn batch_size(&self) -> usize {
        self.batch_size
    }

    pub fn flush_count(&self) -> usize {
        self.flush_count
    }

    pub fn rows_flushed(&self) -> usize {
        self.rows_flushed
    }
}
