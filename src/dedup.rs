//! Duplicate detection over raw source fields
//!
//! Keys come from a caller-supplied function. The first row carrying a key
//! proceeds; every later row with the same key is kept aside verbatim for the
//! duplicates output. The key set only grows for the lifetime of a run.

use crate::constants::DUPLICATE_KEY_SEPARATOR;
use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;

/// Builds the duplicate key of a row from its raw split fields
#[derive(Clone)]
pub struct DuplicateKeyFn(Arc<dyn Fn(&[&str]) -> String + Send + Sync>);

impl DuplicateKeyFn {
    pub fn new<F>(key_fn: F) -> Self
    where
        F: Fn(&[&str]) -> String + Send + Sync + 'static,
    {
        Self(Arc::new(key_fn))
    }

    pub fn key(&self, fields: &[&str]) -> String {
        (self.0)(fields)
    }
}

impl fmt::Debug for DuplicateKeyFn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("DuplicateKeyFn(..)")
    }
}

/// Key function joining the given field positions with `_`.
///
/// Positions past the end of a line contribute an empty string.
pub fn key_from_columns(indices: Vec<usize>) -> DuplicateKeyFn {
    DuplicateKeyFn::new(move |fields| {
        indices
            .iter()
            .map(|&index| fields.get(index).copied().unwrap_or_default())
            .collect::<Vec<_>>()
            .join(DUPLICATE_KEY_SEPARATOR)
    })
}

/// Classification of one row
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DuplicateStatus {
    FirstSeen,
    Duplicate,
}

/// Tracks seen keys and the raw lines of every repeat occurrence
#[derive(Debug)]
pub struct DuplicateFilter {
    key_fn: DuplicateKeyFn,
    seen: HashSet<String>,
    duplicate_lines: Vec<String>,
}

impl DuplicateFilter {
    pub fn new(key_fn: DuplicateKeyFn) -> Self {
        Self {
            key_fn,
            seen: HashSet::new(),
            duplicate_lines: Vec::new(),
        }
    }

    /// Test-and-insert the row's key; a duplicate's raw line is recorded
    pub fn check(&mut self, fields: &[&str], raw_line: &str) -> DuplicateStatus {
        let key = self.key_fn.key(fields);

        if self.seen.insert(key) {
            DuplicateStatus::FirstSeen
        } else {
            self.duplicate_lines.push(raw_line.to_string());
            DuplicateStatus::Duplicate
        }
    }

    pub fn duplicate_count(&self) -> usize {
        self.duplicate_lines.len()
    }

    /// Raw duplicate lines in encounter order
    pub fn duplicate_lines(&self) -> &[String] {
        &self.duplicate_lines
    }

    /// Number of distinct keys seen so far
    pub fn distinct_keys(&self) -> usize {
        self.seen.len()
    }

    /// Render the duplicates report: the header line followed by every duplicate line
    pub fn render_report(&self, header: &str) -> String {
        let capacity = header.len()
            + 1
            + self
                .duplicate_lines
                .iter()
                .map(|line| line.len() + 1)
                .sum::<usize>();

        let mut report = String::with_capacity(capacity);
        report.push_str(header);
        report.push('\n');
        for line in &self.duplicate_lines {
            report.push_str(line);
            report.push('\n');
        }
        report
    }
}
