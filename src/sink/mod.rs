//! Storage collaborators receiving bulk-inserted batches
//!
//! - [`memory`] - keeps rows in memory (dry runs and tests)
//! - [`sqlite`] - relational table in a SQLite database
//! - [`parquet`] - directory of Parquet part files, one per batch
//! - [`names`] - field name to storage column correspondence

pub mod memory;
pub mod names;
pub mod parquet;
pub mod sqlite;

pub use memory::MemorySink;
pub use names::ColumnNameMap;
pub use parquet::ParquetSink;
pub use sqlite::SqliteSink;

use crate::batch::Batch;
use crate::error::Result;
use async_trait::async_trait;

/// Destination for accepted rows.
///
/// `bulk_insert` either stores the whole batch or fails; callers never retry.
#[async_trait]
pub trait RowSink: Send {
    /// Store every row of the batch
    async fn bulk_insert(&mut self, batch: &Batch) -> Result<()>;

    /// Number of rows currently stored at the destination
    async fn count_rows(&mut self) -> Result<u64>;

    /// Remove every stored row
    async fn truncate(&mut self) -> Result<()>;
}

#[async_trait]
impl<S: RowSink + ?Sized> RowSink for Box<S> {
    async fn bulk_insert(&mut self, batch: &Batch) -> Result<()> {
        (**self).bulk_insert(batch).await
    }

    async fn count_rows(&mut self) -> Result<u64> {
        (**self).count_rows().await
    }

    async fn truncate(&mut self) -> Result<()> {
        (**self).truncate().await
    }
}
