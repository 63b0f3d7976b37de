//! Run state and summary types shared by the pipeline and the CLI.

use serde::Serialize;
use std::fmt;
use std::time::Duration;

/// Lifecycle of one pipeline run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub enum PipelineState {
    #[default]
    Idle,
    HeaderRead,
    Streaming,
    Draining,
    Done,
    Failed,
}

impl fmt::Display for PipelineState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            PipelineState::Idle => "idle",
            PipelineState::HeaderRead => "header-read",
            PipelineState::Streaming => "streaming",
            PipelineState::Draining => "draining",
            PipelineState::Done => "done",
            PipelineState::Failed => "failed",
        };
        f.write_str(name)
    }
}

/// Counters reported at the end of a run
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct RunSummary {
    /// Data lines read after the header, blank lines included
    pub lines_read: usize,
    /// Rows transformed and handed to the batch accumulator
    pub accepted: usize,
    /// Rows diverted to the duplicates output
    pub duplicates: usize,
    /// Rows rejected because a value could not be converted
    pub invalid: usize,
    /// Rows silently skipped because a required field was blank
    pub blank_rejected: usize,
    /// Lines skipped for having too few fields
    pub skipped_short: usize,
    /// Bulk inserts issued
    pub batches_flushed: usize,
    /// Row count reported by the sink after loading
    pub sink_row_count: Option<u64>,
    /// Wall-clock time of the run
    pub elapsed: Duration,
}

impl RunSummary {
    /// Lines that reached the duplicate check
    pub fn considered(&self) -> usize {
        self.accepted + self.duplicates + self.invalid + self.blank_rejected
    }

    /// Accepted rows as a percentage of considered rows
    pub fn acceptance_rate(&self) -> f64 {
        let considered = self.considered();
        if considered == 0 {
            100.0
        } else {
            (self.accepted as f64 / considered as f64) * 100.0
        }
    }

    /// One-line summary for logging
    pub fn summary(&self) -> String {
        format!(
            "Load Summary: {} lines -> {} accepted ({:.1}%) | Duplicates: {} | Invalid: {} | \
             Blank rejected: {} | Short lines: {} | Batches: {} | Rows in destination: {}",
            self.lines_read,
            self.accepted,
            self.acceptance_rate(),
            self.duplicates,
            self.invalid,
            self.blank_rejected,
            self.skipped_short,
            self.batches_flushed,
            self.sink_row_count
                .map(|count| count.to_string())
                .unwrap_or_else(|| "unknown".to_string())
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_acceptance_rate() {
        let summary = RunSummary {
            accepted: 3,
            duplicates: 1,
            ..Default::default()
        };
        assert_eq!(summary.considered(), 4);
        assert!((summary.acceptance_rate() - 75.0).abs() < f64::EPSILON);
        assert_eq!(RunSummary::default().acceptance_rate(), 100.0);
    }

    #[test]
    fn test_summary_mentions_counts() {
        let summary = RunSummary {
            lines_read: 10,
            accepted: 8,
            duplicates: 2,
            sink_row_count: Some(8),
            ..Default::default()
        };
        let text = summary.summary();
        assert!(text.contains("10 lines -> 8 accepted"));
        assert!(text.contains("Duplicates: 2"));
        assert!(text.contains("Rows in destination: 8"));
    }
}
