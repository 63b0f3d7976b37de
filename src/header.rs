//! Header line parsing and source index resolution.
//!
//! The first line of the input names the source fields. Every mapping declared
//! by name is bound to the zero-based position of that name before streaming.

use crate::constants::FIELD_DELIMITER;
use crate::error::{LoaderError, Result};
use crate::mapping::ProcessorConfiguration;
use tracing::debug;

const BYTE_ORDER_MARK: char = '\u{feff}';

/// The header line of a source file, kept verbatim for the duplicates output
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HeaderLine {
    raw: String,
    names: Vec<String>,
}

impl HeaderLine {
    /// Parse a raw header line; `None` when the line is blank.
    ///
    /// A leading UTF-8 byte order mark is dropped from both the names and the raw line.
    pub fn parse(raw: &str) -> Option<Self> {
        let raw = raw.strip_prefix(BYTE_ORDER_MARK).unwrap_or(raw);
        if raw.trim().is_empty() {
            return None;
        }

        let names = split_fields(raw)
            .into_iter()
            .map(|name| name.trim().to_string())
            .collect();

        Some(Self {
            raw: raw.to_string(),
            names,
        })
    }

    pub fn raw(&self) -> &str {
        &self.raw
    }

    pub fn names(&self) -> &[String] {
        &self.names
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    /// Position of the first header field with this exact name
    pub fn position(&self, name: &str) -> Option<usize> {
        self.names.iter().position(|candidate| candidate == name)
    }
}

/// Split a line on the field delimiter without any quoting rules
pub fn split_fields(line: &str) -> Vec<&str> {
    line.split(FIELD_DELIMITER).collect()
}

/// Bind every by-name mapping to its header position, then check the header is wide enough.
///
/// A name missing from the header is fatal. Mappings declared by index are left untouched.
pub fn resolve_source_indices(
    configuration: &mut ProcessorConfiguration,
    header: &HeaderLine,
) -> Result<()> {
    for mapping in configuration.mappings_mut() {
        if !mapping.is_by_name() {
            continue;
        }

        let name = mapping.source_name.as_deref().unwrap_or_default().trim();
        let index = header
            .position(name)
            .ok_or_else(|| LoaderError::InvalidSourceColumn {
                name: name.to_string(),
            })?;

        debug!("Resolved source column '{}' to index {}", name, index);
        mapping.source_index = Some(index);
    }

    if header.len() < configuration.len() {
        return Err(LoaderError::invalid_format(format!(
            "missing headers: header has {} fields but {} columns are mapped",
            header.len(),
            configuration.len()
        )));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mapping::{ColumnMapping, ValueKind};

    fn configuration_for(names: &[&str]) -> ProcessorConfiguration {
        let mut configuration = ProcessorConfiguration::new();
        for name in names {
            configuration.add_column(name, ValueKind::String).unwrap();
        }
        configuration
    }

    #[test]
    fn test_blank_header_is_none() {
        assert!(HeaderLine::parse("").is_none());
        assert!(HeaderLine::parse("   ").is_none());
    }

    #[test]
    fn test_header_keeps_raw_line() {
        let header = HeaderLine::parse("a, b ,c").unwrap();
        assert_eq!(header.raw(), "a, b ,c");
        assert_eq!(header.names(), &["a", "b", "c"]);
        assert_eq!(header.position("b"), Some(1));
        assert_eq!(header.position("d"), None);
    }

    #[test]
    fn test_byte_order_mark_is_dropped() {
        let header = HeaderLine::parse("\u{feff}id,note").unwrap();
        assert_eq!(header.raw(), "id,note");
        assert_eq!(header.position("id"), Some(0));

        let mut configuration = configuration_for(&["id"]);
        resolve_source_indices(&mut configuration, &header).unwrap();
        assert_eq!(configuration.mappings()[0].source_index, Some(0));

        assert!(HeaderLine::parse("\u{feff}").is_none());
    }

    #[test]
    fn test_resolves_zero_based_indices() {
        let mut configuration = configuration_for(&["c", "a"]);
        let header = HeaderLine::parse("a,b,c").unwrap();

        resolve_source_indices(&mut configuration, &header).unwrap();

        let indices: Vec<Option<usize>> = configuration
            .mappings()
            .iter()
            .map(|m| m.source_index)
            .collect();
        assert_eq!(indices, vec![Some(2), Some(0)]);
        assert!(configuration.is_resolved());
    }

    #[test]
    fn test_missing_name_is_fatal() {
        let mut configuration = configuration_for(&["a", "zzz"]);
        let header = HeaderLine::parse("a,b,c").unwrap();

        let err = resolve_source_indices(&mut configuration, &header).unwrap_err();
        assert!(matches!(err, LoaderError::InvalidSourceColumn { ref name } if name == "zzz"));
        assert!(err.to_string().contains("Invalid source column name"));
    }

    #[test]
    fn test_indexed_mappings_skip_lookup() {
        let mut configuration = ProcessorConfiguration::new();
        configuration
            .add_column_mapping(ColumnMapping::by_index(7, "Seven"))
            .unwrap();
        let header = HeaderLine::parse("a,b").unwrap();

        resolve_source_indices(&mut configuration, &header).unwrap();
        assert_eq!(configuration.mappings()[0].source_index, Some(7));
    }

    #[test]
    fn test_header_shorter_than_mappings_fails() {
        let mut configuration = ProcessorConfiguration::new();
        configuration
            .add_column("a", ValueKind::String)
            .unwrap()
            .add_indexed_column(0, "A2", ValueKind::String, None)
            .unwrap();
        let header = HeaderLine::parse("a").unwrap();

        let err = resolve_source_indices(&mut configuration, &header).unwrap_err();
        assert!(matches!(err, LoaderError::InvalidFormat { .. }));
    }

    #[test]
    fn test_resolution_is_repeatable() {
        let mut configuration = configuration_for(&["b"]);
        resolve_source_indices(&mut configuration, &HeaderLine::parse("a,b").unwrap()).unwrap();
        resolve_source_indices(&mut configuration, &HeaderLine::parse("b,a").unwrap()).unwrap();
        assert_eq!(configuration.mappings()[0].source_index, Some(0));
    }
}
