//! Processor configuration and its fluent builder
//!
//! Mapping order is the destination column order of every output row.

use super::column::{ColumnMapping, CustomConversion};
use super::value::ValueKind;
use crate::constants::DEFAULT_BATCH_SIZE;
use crate::error::{LoaderError, Result};
use std::sync::Arc;

/// Destination column as seen by batches and sinks
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnSchema {
    pub name: Arc<str>,
    pub kind: ValueKind,
}

/// Ordered column mappings plus the batch size for one run
#[derive(Debug, Clone)]
pub struct ProcessorConfiguration {
    batch_size: usize,
    mappings: Vec<ColumnMapping>,
}

impl Default for ProcessorConfiguration {
    fn default() -> Self {
        Self::new()
    }
}

impl ProcessorConfiguration {
    pub fn new() -> Self {
        Self {
            batch_size: DEFAULT_BATCH_SIZE,
            mappings: Vec::new(),
        }
    }

    pub fn batch_size(&self) -> usize {
        self.batch_size
    }

    pub fn mappings(&self) -> &[ColumnMapping] {
        &self.mappings
    }

    pub(crate) fn mappings_mut(&mut self) -> &mut [ColumnMapping] {
        &mut self.mappings
    }

    pub fn len(&self) -> usize {
        self.mappings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.mappings.is_empty()
    }

    /// Set the number of rows per bulk insert (must be positive)
    pub fn set_batch_size(&mut self, batch_size: usize) -> Result<&mut Self> {
        if batch_size == 0 {
            return Err(LoaderError::configuration(
                "batch size must be greater than zero",
            ));
        }
        self.batch_size = batch_size;
        Ok(self)
    }

    /// Validate and append a fully described mapping
    pub fn add_column_mapping(&mut self, mapping: ColumnMapping) -> Result<&mut Self> {
        mapping.validate()?;

        if self.mappings.iter().any(|m| m.dest_name == mapping.dest_name) {
            return Err(LoaderError::configuration(format!(
                "destination column '{}' is mapped more than once",
                mapping.dest_name
            )));
        }

        self.mappings.push(mapping);
        Ok(self)
    }

    /// Map a header column to a destination field of the same name
    pub fn add_column(&mut self, source_name: &str, kind: ValueKind) -> Result<&mut Self> {
        self.add_column_mapping(ColumnMapping::by_name(source_name).kind(kind))
    }

    /// Map a header column to a destination field, optionally renamed and converted
    pub fn add_named_column(
        &mut self,
        source_name: &str,
        dest_name: Option<&str>,
        kind: ValueKind,
        conversion: Option<CustomConversion>,
    ) -> Result<&mut Self> {
        let mut mapping = ColumnMapping::by_name(source_name)
            .kind(kind)
            .conversion(conversion);
        if let Some(dest_name) = dest_name {
            mapping = mapping.dest(dest_name);
        }
        self.add_column_mapping(mapping)
    }

    /// Map a fixed source position to a destination field
    pub fn add_indexed_column(
        &mut self,
        source_index: usize,
        dest_name: &str,
        kind: ValueKind,
        conversion: Option<CustomConversion>,
    ) -> Result<&mut Self> {
        self.add_column_mapping(
            ColumnMapping::by_index(source_index, dest_name)
                .kind(kind)
                .conversion(conversion),
        )
    }

    /// Highest source index among resolved mappings
    pub fn max_source_index(&self) -> Option<usize> {
        self.mappings.iter().filter_map(|m| m.source_index).max()
    }

    /// True once every mapping has a positional index
    pub fn is_resolved(&self) -> bool {
        self.mappings.iter().all(|m| m.source_index.is_some())
    }

    /// Destination columns in output order
    pub fn column_schema(&self) -> Vec<ColumnSchema> {
        self.mappings
            .iter()
            .map(|m| ColumnSchema {
                name: Arc::from(m.dest_name.as_str()),
                kind: m.kind.clone(),
            })
            .collect()
    }
}
