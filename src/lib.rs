//! Trip Loader Library
//!
//! Streams delimited trip record files into a storage sink in fixed-size
//! batches.
//!
//! This library provides tools for:
//! - Declaring column mappings by header name or position, with typed conversion
//! - Resolving mappings against the header line of the input
//! - Diverting repeated records to a duplicates report before conversion
//! - Accumulating converted rows and bulk inserting them into SQLite or Parquet
//! - Reporting accepted, duplicate and invalid row counts at the end of a run

pub mod batch;
pub mod config;
pub mod constants;
pub mod dedup;
pub mod error;
pub mod header;
pub mod mapping;
pub mod models;
pub mod pipeline;
pub mod sink;
pub mod transform;

// CLI modules
pub mod cli {
    pub mod args;
    pub mod commands;
}

// Re-export commonly used types
pub use config::{ColumnSpec, LoaderConfig, NamedConversion};
pub use dedup::{DuplicateKeyFn, key_from_columns};
pub use error::{LoaderError, Result};
pub use mapping::{ColumnMapping, CustomConversion, ProcessorConfiguration, Value, ValueKind};
pub use models::{PipelineState, RunSummary};
pub use pipeline::Pipeline;
pub use sink::{ColumnNameMap, MemorySink, ParquetSink, RowSink, SqliteSink};
pub use transform::ConversionFailurePolicy;
