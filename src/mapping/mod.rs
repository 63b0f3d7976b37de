//! Declarative column-mapping model
//!
//! - [`value`] - value kinds and converted values
//! - [`column`] - a single source-to-destination column mapping
//! - [`configuration`] - the ordered mapping set and batch size for a run

pub mod column;
pub mod configuration;
pub mod value;

pub use column::{ColumnMapping, CustomConversion};
pub use configuration::{ColumnSchema, ProcessorConfiguration};
pub use value::{ConversionResult, Value, ValueKind};
