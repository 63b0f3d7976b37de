//! Column mapping declarations
//!
//! A [`ColumnMapping`] binds one source field (by header name or by position)
//! to one destination field with a value kind and an optional custom conversion.

use super::value::{ConversionResult, ValueKind};
use crate::error::{LoaderError, Result};
use std::fmt;
use std::sync::Arc;

/// Caller-supplied conversion from the (possibly trimmed) raw string
#[derive(Clone)]
pub struct CustomConversion(Arc<dyn Fn(&str) -> ConversionResult + Send + Sync>);

impl CustomConversion {
    pub fn new<F>(conversion: F) -> Self
    where
        F: Fn(&str) -> ConversionResult + Send + Sync + 'static,
    {
        Self(Arc::new(conversion))
    }

    pub fn convert(&self, raw: &str) -> ConversionResult {
        (self.0)(raw)
    }
}

impl fmt::Debug for CustomConversion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("CustomConversion(..)")
    }
}

/// Describes how one source field becomes one destination field
#[derive(Debug, Clone)]
pub struct ColumnMapping {
    /// Header name to resolve the index from; takes precedence over `source_index`
    pub source_name: Option<String>,

    /// Positional index, either declared or filled in by header resolution
    pub source_index: Option<usize>,

    /// Destination field name
    pub dest_name: String,

    /// Declared value kind
    pub kind: ValueKind,

    /// Trim surrounding whitespace before anything else
    pub trim: bool,

    /// Discard the whole row when this field is blank
    pub remove_row_if_blank: bool,

    /// Replaces the kind-based conversion entirely when present
    pub custom_conversion: Option<CustomConversion>,
}

impl ColumnMapping {
    /// Map a source header name to a destination field of the same name
    pub fn by_name(source_name: impl Into<String>) -> Self {
        let source_name = source_name.into();
        Self {
            dest_name: source_name.clone(),
            source_name: Some(source_name),
            source_index: None,
            kind: ValueKind::String,
            trim: true,
            remove_row_if_blank: false,
            custom_conversion: None,
        }
    }

    /// Map a fixed source position to a destination field
    pub fn by_index(source_index: usize, dest_name: impl Into<String>) -> Self {
        Self {
            source_name: None,
            source_index: Some(source_index),
            dest_name: dest_name.into(),
            kind: ValueKind::String,
            trim: true,
            remove_row_if_blank: false,
            custom_conversion: None,
        }
    }

    pub fn dest(mut self, dest_name: impl Into<String>) -> Self {
        self.dest_name = dest_name.into();
        self
    }

    pub fn kind(mut self, kind: ValueKind) -> Self {
        self.kind = kind;
        self
    }

    pub fn trim(mut self, trim: bool) -> Self {
        self.trim = trim;
        self
    }

    pub fn remove_row_if_blank(mut self, remove: bool) -> Self {
        self.remove_row_if_blank = remove;
        self
    }

    pub fn convert_with<F>(mut self, conversion: F) -> Self
    where
        F: Fn(&str) -> ConversionResult + Send + Sync + 'static,
    {
        self.custom_conversion = Some(CustomConversion::new(conversion));
        self
    }

    pub fn conversion(mut self, conversion: Option<CustomConversion>) -> Self {
        self.custom_conversion = conversion;
        self
    }

    /// True when the mapping is resolved through the header line
    pub fn is_by_name(&self) -> bool {
        self.source_name
            .as_deref()
            .is_some_and(|name| !name.trim().is_empty())
    }

    /// Check that a source is identified and the destination name is usable
    pub fn validate(&self) -> Result<()> {
        if !self.is_by_name() && self.source_index.is_none() {
            return Err(LoaderError::configuration(format!(
                "column mapping for '{}' must provide either a source column name or a source column index",
                self.dest_name
            )));
        }

        if self.dest_name.trim().is_empty() {
            return Err(LoaderError::configuration(
                "destination column name cannot be blank",
            ));
        }

        Ok(())
    }

    /// Human-readable source identifier for logs and errors
    pub fn source_label(&self) -> String {
        match (&self.source_name, self.source_index) {
            (Some(name), _) if self.is_by_name() => format!("'{}'", name),
            (_, Some(index)) => format!("#{}", index),
            _ => "<unset>".to_string(),
        }
    }
}
