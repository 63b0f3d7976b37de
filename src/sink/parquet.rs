//! Parquet directory sink
//!
//! Every bulk insert becomes one `part-NNNNN.parquet` file, so the directory
//! behaves as an append-only table. Columns are typed from the value kinds:
//! decimals are stored as Float64, date-times as UTC microsecond timestamps.

use super::{ColumnNameMap, RowSink};
use crate::batch::Batch;
use crate::constants::PARQUET_PART_PREFIX;
use crate::error::{LoaderError, Result};
use crate::mapping::{Value, ValueKind};
use async_trait::async_trait;
use polars::prelude::{
    Column, DataFrame, DataType, NamedFrom, ParquetCompression, ParquetReader,
    ParquetWriter as PolarsParquetWriter, SerReader, Series, TimeUnit,
};
use rust_decimal::prelude::ToPrimitive;
use std::fs::{self, File};
use std::path::{Path, PathBuf};
use tracing::debug;

/// Writes batches as Parquet part files under one directory
#[derive(Debug)]
pub struct ParquetSink {
    dir: PathBuf,
    names: ColumnNameMap,
    compression: ParquetCompression,
    next_part: usize,
}

impl ParquetSink {
    /// Use (and create if needed) a directory; existing parts are kept and appended to
    pub fn new(dir: impl Into<PathBuf>, names: ColumnNameMap) -> Result<Self> {
        let dir = dir.into();
        fs::create_dir_all(&dir)?;
        let next_part = next_part_index(&dir)?;

        Ok(Self {
            dir,
            names,
            compression: ParquetCompression::Snappy,
            next_part,
        })
    }

    pub fn with_compression(mut self, compression: ParquetCompression) -> Self {
        self.compression = compression;
        self
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Part files currently in the directory, in name order
    pub fn parts(&self) -> Result<Vec<PathBuf>> {
        part_files(&self.dir)
    }

    /// Write a batch under a temporary name, renamed into place once complete
    fn write_part(&mut self, batch: &Batch) -> Result<PathBuf> {
        let mut frame = batch_to_frame(batch, &self.names)?;
        let name = format!("{}{:05}.parquet", PARQUET_PART_PREFIX, self.next_part);
        let path = self.dir.join(&name);
        let staging = self.dir.join(format!(".{}.tmp", name));

        let written = File::create(&staging)
            .map_err(LoaderError::from)
            .and_then(|file| {
                PolarsParquetWriter::new(file)
                    .with_compression(self.compression)
                    .finish(&mut frame)
                    .map_err(|e| {
                        LoaderError::sink(format!("failed to write {}: {}", path.display(), e))
                    })
            });
        if let Err(e) = written {
            if let Err(cleanup) = fs::remove_file(&staging) {
                debug!("Could not remove {}: {}", staging.display(), cleanup);
            }
            return Err(e);
        }

        fs::rename(&staging, &path)?;
        self.next_part += 1;
        Ok(path)
    }
}

#[async_trait]
impl RowSink for ParquetSink {
    async fn bulk_insert(&mut self, batch: &Batch) -> Result<()> {
        if batch.is_empty() {
            return Ok(());
        }
        let path = self.write_part(batch)?;
        debug!("Wrote {} rows to {}", batch.len(), path.display());
        Ok(())
    }

    async fn count_rows(&mut self) -> Result<u64> {
        let mut total = 0u64;
        for part in part_files(&self.dir)? {
            let mut reader = ParquetReader::new(File::open(&part)?);
            total += reader.num_rows()? as u64;
        }
        Ok(total)
    }

    async fn truncate(&mut self) -> Result<()> {
        for part in part_files(&self.dir)? {
            fs::remove_file(&part)?;
        }
        self.next_part = 0;
        Ok(())
    }
}

fn part_files(dir: &Path) -> Result<Vec<PathBuf>> {
    let mut parts = Vec::new();
    for entry in fs::read_dir(dir)? {
        let path = entry?.path();
        let is_part = path
            .file_name()
            .and_then(|n| n.to_str())
            .is_some_and(|n| n.starts_with(PARQUET_PART_PREFIX) && n.ends_with(".parquet"));
        if is_part {
            parts.push(path);
        }
    }
    parts.sort();
    Ok(parts)
}

/// Numeric suffix of a `part-NNNNN.parquet` file name
fn part_index(path: &Path) -> Option<usize> {
    path.file_name()?
        .to_str()?
        .strip_prefix(PARQUET_PART_PREFIX)?
        .strip_suffix(".parquet")?
        .parse()
        .ok()
}

/// One past the highest existing part number, so no existing part is overwritten
fn next_part_index(dir: &Path) -> Result<usize> {
    Ok(part_files(dir)?
        .iter()
        .filter_map(|part| part_index(part))
        .max()
        .map_or(0, |highest| highest + 1))
}

/// Build a typed DataFrame from a batch, one column per destination field
pub fn batch_to_frame(batch: &Batch, names: &ColumnNameMap) -> Result<DataFrame> {
    let mut columns = Vec::with_capacity(batch.columns().len());

    for (index, schema) in batch.columns().iter().enumerate() {
        let name = names.storage_name(&schema.name);
        let values = batch.rows().iter().map(|row| row.value_at(index));

        let series = match schema.kind.underlying() {
            ValueKind::Integer => {
                let data = values
                    .map(|value| match value {
                        Some(Value::Integer(i)) => Ok(Some(*i)),
                        Some(Value::Null) | None => Ok(None),
                        Some(other) => Err(type_mismatch(name, "integer", other)),
                    })
                    .collect::<Result<Vec<Option<i64>>>>()?;
                Series::new(name.into(), data)
            }
            ValueKind::Boolean => {
                let data = values
                    .map(|value| match value {
                        Some(Value::Boolean(b)) => Ok(Some(*b)),
                        Some(Value::Null) | None => Ok(None),
                        Some(other) => Err(type_mismatch(name, "boolean", other)),
                    })
                    .collect::<Result<Vec<Option<bool>>>>()?;
                Series::new(name.into(), data)
            }
            ValueKind::Decimal => {
                let data = values
                    .map(|value| match value {
                        Some(Value::Decimal(d)) => Ok(d.to_f64()),
                        Some(Value::Integer(i)) => Ok(Some(*i as f64)),
                        Some(Value::Null) | None => Ok(None),
                        Some(other) => Err(type_mismatch(name, "decimal", other)),
                    })
                    .collect::<Result<Vec<Option<f64>>>>()?;
                Series::new(name.into(), data)
            }
            ValueKind::DateTime => {
                let data = values
                    .map(|value| match value {
                        Some(Value::DateTime(dt)) => Ok(Some(dt.timestamp_micros())),
                        Some(Value::Null) | None => Ok(None),
                        Some(other) => Err(type_mismatch(name, "date-time", other)),
                    })
                    .collect::<Result<Vec<Option<i64>>>>()?;
                Series::new(name.into(), data)
                    .cast(&DataType::Datetime(TimeUnit::Microseconds, None))?
            }
            ValueKind::String | ValueKind::Nullable(_) => {
                let data: Vec<Option<String>> = values
                    .map(|value| value.and_then(Value::render))
                    .collect();
                Series::new(name.into(), data)
            }
        };

        columns.push(Column::from(series));
    }

    Ok(DataFrame::new(columns)?)
}

fn type_mismatch(column: &str, expected: &str, value: &Value) -> LoaderError {
    LoaderError::sink(format!(
        "column '{}' expects {} values but received '{}'",
        column, expected, value
    ))
}
