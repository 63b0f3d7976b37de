//! Error handling for trip loading operations.
//!
//! Covers configuration mistakes detected before streaming starts, per-row
//! conversion failures, and storage failures raised by the sink.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum LoaderError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Configuration error: {message}")]
    Configuration { message: String },

    #[error("Invalid source column name: '{name}' is not present in the header")]
    InvalidSourceColumn { name: String },

    #[error("Invalid CSV format: {reason}")]
    InvalidFormat { reason: String },

    #[error("Cannot convert value '{value}' of column '{column}' to {kind}: {reason}")]
    Conversion {
        column: String,
        value: String,
        kind: String,
        reason: String,
    },

    #[error("Sink error: {message}")]
    Sink { message: String },

    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("Polars error: {0}")]
    Polars(#[from] polars::error::PolarsError),

    #[error("Configuration file error: {0}")]
    Json(#[from] serde_json::Error),
}

impl LoaderError {
    /// Create a configuration error
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration {
            message: message.into(),
        }
    }

    /// Create an invalid format error
    pub fn invalid_format(reason: impl Into<String>) -> Self {
        Self::InvalidFormat {
            reason: reason.into(),
        }
    }

    /// Create a sink error
    pub fn sink(message: impl Into<String>) -> Self {
        Self::Sink {
            message: message.into(),
        }
    }

    /// True for errors raised while declaring or resolving the column mappings.
    pub fn is_configuration(&self) -> bool {
        matches!(
            self,
            Self::Configuration { .. } | Self::InvalidSourceColumn { .. } | Self::InvalidFormat { .. }
        )
    }

    /// True for errors raised by the storage collaborator.
    pub fn is_sink(&self) -> bool {
        matches!(self, Self::Sink { .. } | Self::Sqlite(_) | Self::Polars(_))
    }
}

pub type Result<T> = std::result::Result<T, LoaderError>;
