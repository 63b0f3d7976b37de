//! Row transformation
//!
//! Turns the split fields of one data line into an [`OutputRow`] following the
//! resolved [`ProcessorConfiguration`], or reports why the row was rejected.

use crate::error::{LoaderError, Result};
use crate::mapping::{ColumnMapping, ColumnSchema, ProcessorConfiguration, Value};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::debug;

/// What to do when a field cannot be converted to its declared kind
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConversionFailurePolicy {
    /// Abort the whole run on the first conversion failure
    #[default]
    Abort,
    /// Reject the row, count it as invalid and keep streaming
    CountAsInvalid,
}

/// One accepted row: destination field names paired with converted values, in column order
#[derive(Debug, Clone, PartialEq)]
pub struct OutputRow {
    fields: Vec<(Arc<str>, Value)>,
}

impl OutputRow {
    pub fn new(fields: Vec<(Arc<str>, Value)>) -> Self {
        Self { fields }
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.fields
            .iter()
            .find(|(field, _)| &**field == name)
            .map(|(_, value)| value)
    }

    pub fn values(&self) -> impl Iterator<Item = &Value> {
        self.fields.iter().map(|(_, value)| value)
    }

    /// Value at a field position
    pub fn value_at(&self, index: usize) -> Option<&Value> {
        self.fields.get(index).map(|(_, value)| value)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.fields.iter().map(|(name, value)| (&**name, value))
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

/// Why a row produced no output
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RejectReason {
    /// A `remove_row_if_blank` field was blank
    BlankRequired { column: String },
    /// The line has fewer fields than a mapping needs
    ShortLine { required: usize, found: usize },
    /// Conversion failed under [`ConversionFailurePolicy::CountAsInvalid`]
    ConversionFailed { column: String, reason: String },
}

impl RejectReason {
    /// Rejections that count toward the invalid-row counter
    pub fn is_invalid(&self) -> bool {
        matches!(self, RejectReason::ConversionFailed { .. })
    }
}

/// Result of transforming one row
#[derive(Debug, Clone, PartialEq)]
pub enum RowOutcome {
    Accepted(OutputRow),
    Rejected(RejectReason),
}

/// Converts split source fields into output rows
#[derive(Debug, Clone)]
pub struct RowTransformer {
    mappings: Vec<ColumnMapping>,
    columns: Arc<[ColumnSchema]>,
    policy: ConversionFailurePolicy,
    max_source_index: usize,
}

impl RowTransformer {
    /// Build a transformer from a configuration whose indices are all resolved
    pub fn new(
        configuration: &ProcessorConfiguration,
        policy: ConversionFailurePolicy,
    ) -> Result<Self> {
        if let Some(unresolved) = configuration
            .mappings()
            .iter()
            .find(|m| m.source_index.is_none())
        {
            return Err(LoaderError::configuration(format!(
                "source column {} for '{}' has not been resolved",
                unresolved.source_label(),
                unresolved.dest_name
            )));
        }

        Ok(Self {
            mappings: configuration.mappings().to_vec(),
            columns: configuration.column_schema().into(),
            policy,
            max_source_index: configuration.max_source_index().unwrap_or(0),
        })
    }

    /// Destination columns shared by every row this transformer produces
    pub fn columns(&self) -> Arc<[ColumnSchema]> {
        Arc::clone(&self.columns)
    }

    pub fn policy(&self) -> ConversionFailurePolicy {
        self.policy
    }

    /// Minimum field count a line needs before it is worth transforming
    pub fn required_fields(&self) -> usize {
        if self.mappings.is_empty() {
            0
        } else {
            self.max_source_index + 1
        }
    }

    /// Transform one line's fields.
    ///
    /// Errors only for conversion failures under [`ConversionFailurePolicy::Abort`].
    pub fn transform(&self, fields: &[&str]) -> Result<RowOutcome> {
        let mut output = Vec::with_capacity(self.mappings.len());

        for (mapping, column) in self.mappings.iter().zip(self.columns.iter()) {
            // Checked in the constructor
            let index = mapping.source_index.unwrap_or_default();
            let Some(raw) = fields.get(index) else {
                return Ok(RowOutcome::Rejected(RejectReason::ShortLine {
                    required: index + 1,
                    found: fields.len(),
                }));
            };

            let value = if mapping.trim { raw.trim() } else { raw };
            let is_blank = value.trim().is_empty();

            if is_blank && mapping.remove_row_if_blank {
                debug!("Row rejected: required column '{}' is blank", mapping.dest_name);
                return Ok(RowOutcome::Rejected(RejectReason::BlankRequired {
                    column: mapping.dest_name.clone(),
                }));
            }

            let converted = if let Some(conversion) = &mapping.custom_conversion {
                conversion.convert(value)
            } else if is_blank {
                Ok(Value::Null)
            } else {
                mapping.kind.parse(value)
            };

            match converted {
                Ok(converted) => output.push((Arc::clone(&column.name), converted)),
                Err(reason) => return self.conversion_failure(mapping, value, reason),
            }
        }

        Ok(RowOutcome::Accepted(OutputRow::new(output)))
    }

    fn conversion_failure(
        &self,
        mapping: &ColumnMapping,
        value: &str,
        reason: String,
    ) -> Result<RowOutcome> {
        match self.policy {
            ConversionFailurePolicy::Abort => Err(LoaderError::Conversion {
                column: mapping.dest_name.clone(),
                value: value.to_string(),
                kind: mapping.kind.to_string(),
                reason,
            }),
            ConversionFailurePolicy::CountAsInvalid => {
                debug!(
                    "Row rejected: cannot convert '{}' for column '{}': {}",
                    value, mapping.dest_name, reason
                );
                Ok(RowOutcome::Rejected(RejectReason::ConversionFailed {
                    column: mapping.dest_name.clone(),
                    reason,
                }))
            }
        }
    }
}
