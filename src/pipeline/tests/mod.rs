//! Pipeline tests
//!
//! Exercise full runs against in-memory readers and sinks.

pub mod duplicates;

use crate::batch::Batch;
use crate::dedup::{DuplicateKeyFn, key_from_columns};
use crate::error::{LoaderError, Result};
use crate::mapping::ProcessorConfiguration;
use crate::models::RunSummary;
use crate::pipeline::Pipeline;
use crate::sink::{MemorySink, RowSink};
use async_trait::async_trait;

/// Run `input` through a pipeline, returning the summary and the duplicates output
pub(crate) async fn run_input<S>(
    pipeline: &mut Pipeline<S>,
    input: &str,
) -> Result<(RunSummary, String)>
where
    S: RowSink,
{
    run_bytes(pipeline, input.as_bytes()).await
}

/// Same as [`run_input`] for input that may not be valid UTF-8
pub(crate) async fn run_bytes<S>(
    pipeline: &mut Pipeline<S>,
    input: &[u8],
) -> Result<(RunSummary, String)>
where
    S: RowSink,
{
    let mut duplicates = Vec::new();
    let summary = pipeline.process_reader(input, &mut duplicates).await?;
    Ok((summary, String::from_utf8_lossy(&duplicates).into_owned()))
}

/// Memory pipeline keyed on the given source positions
pub(crate) fn memory_pipeline<F>(configure: F, key_columns: Vec<usize>) -> Pipeline<MemorySink>
where
    F: FnOnce(&mut ProcessorConfiguration) -> Result<()>,
{
    Pipeline::new(MemorySink::new(), configure, key_from_columns(key_columns)).unwrap()
}

/// Key function that never reports a duplicate
pub(crate) fn unique_keys() -> DuplicateKeyFn {
    let counter = std::sync::atomic::AtomicUsize::new(0);
    DuplicateKeyFn::new(move |_| {
        counter
            .fetch_add(1, std::sync::atomic::Ordering::Relaxed)
            .to_string()
    })
}

/// Sink that accepts a fixed number of bulk inserts, then fails
#[derive(Debug, Default)]
pub(crate) struct FailingSink {
    pub allowed_inserts: usize,
    pub inserts: usize,
    pub rows: u64,
}

#[async_trait]
impl RowSink for FailingSink {
    async fn bulk_insert(&mut self, batch: &Batch) -> Result<()> {
        if self.inserts >= self.allowed_inserts {
            return Err(LoaderError::sink("connection lost"));
        }
        self.inserts += 1;
        self.rows += batch.len() as u64;
        Ok(())
    }

    async fn count_rows(&mut self) -> Result<u64> {
        Ok(self.rows)
    }

    async fn truncate(&mut self) -> Result<()> {
        self.rows = 0;
        Ok(())
    }
}
