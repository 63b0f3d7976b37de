//! In-memory sink

use super::RowSink;
use crate::batch::Batch;
use crate::error::Result;
use crate::transform::OutputRow;
use async_trait::async_trait;

/// Keeps every inserted row and the size of every bulk call
#[derive(Debug, Default, Clone)]
pub struct MemorySink {
    rows: Vec<OutputRow>,
    batch_sizes: Vec<usize>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn rows(&self) -> &[OutputRow] {
        &self.rows
    }

    /// Row count of each bulk insert, in call order
    pub fn batch_sizes(&self) -> &[usize] {
        &self.batch_sizes
    }

    pub fn insert_calls(&self) -> usize {
        self.batch_sizes.len()
    }
}

#[async_trait]
impl RowSink for MemorySink {
    async fn bulk_insert(&mut self, batch: &Batch) -> Result<()> {
        self.batch_sizes.push(batch.len());
        self.rows.extend(batch.rows().iter().cloned());
        Ok(())
    }

    async fn count_rows(&mut self) -> Result<u64> {
        Ok(self.rows.len() as u64)
    }

    async fn truncate(&mut self) -> Result<()> {
        self.rows.clear();
        self.batch_sizes.clear();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mapping::{ColumnSchema, Value, ValueKind};
    use std::sync::Arc;

    fn batch(ids: &[i64]) -> Batch {
        let columns: Arc<[ColumnSchema]> = vec![ColumnSchema {
            name: Arc::from("id"),
            kind: ValueKind::Integer,
        }]
        .into();
        let rows = ids
            .iter()
            .map(|id| OutputRow::new(vec![(Arc::from("id"), Value::Integer(*id))]))
            .collect();
        Batch::with_rows(columns, rows)
    }

    #[tokio::test]
    async fn test_truncate_resets_rows_and_calls() {
        let mut sink = MemorySink::new();
        sink.bulk_insert(&batch(&[1, 2])).await.unwrap();
        sink.bulk_insert(&batch(&[3])).await.unwrap();
        assert_eq!(sink.batch_sizes(), &[2, 1]);

        sink.truncate().await.unwrap();
        assert_eq!(sink.count_rows().await.unwrap(), 0);
        assert_eq!(sink.insert_calls(), 0);

        sink.bulk_insert(&batch(&[4])).await.unwrap();
        assert_eq!(sink.batch_sizes(), &[1]);
        assert_eq!(sink.rows().len(), 1);
    }
}
