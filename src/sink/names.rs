//! Correspondence between output field names and storage column names

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Renames output fields to storage columns; unmapped fields keep their name
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ColumnNameMap {
    names: HashMap<String, String>,
}

impl ColumnNameMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_pairs<I, A, B>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (A, B)>,
        A: Into<String>,
        B: Into<String>,
    {
        Self {
            names: pairs
                .into_iter()
                .map(|(field, column)| (field.into(), column.into()))
                .collect(),
        }
    }

    pub fn add(&mut self, field: impl Into<String>, column: impl Into<String>) -> &mut Self {
        self.names.insert(field.into(), column.into());
        self
    }

    pub fn storage_name<'a>(&'a self, field: &'a str) -> &'a str {
        self.names.get(field).map(String::as_str).unwrap_or(field)
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}
