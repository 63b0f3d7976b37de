//! Load pipeline orchestration.
//!
//! Drives one run through `Idle -> HeaderRead -> Streaming -> Draining -> Done`:
//! read the header, resolve mappings, then for every data line check the
//! duplicate key, transform, and accumulate into batches flushed to the sink.
//! Any error moves the pipeline to `Failed` and aborts the run.

#[cfg(test)]
pub mod tests;

use crate::batch::BatchAccumulator;
use crate::constants::PROGRESS_UPDATE_INTERVAL;
use crate::dedup::{DuplicateFilter, DuplicateKeyFn, DuplicateStatus};
use crate::error::{LoaderError, Result};
use crate::header::{resolve_source_indices, split_fields, HeaderLine};
use crate::mapping::ProcessorConfiguration;
use crate::models::{PipelineState, RunSummary};
use crate::sink::RowSink;
use crate::transform::{ConversionFailurePolicy, RejectReason, RowOutcome, RowTransformer};

use indicatif::{ProgressBar, ProgressStyle};
use std::borrow::Cow;
use std::path::Path;
use std::time::Instant;
use tokio::fs::{self, File};
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt, BufReader};
use tracing::{debug, info, warn};

/// Result of the streaming part of a run, before the duplicates report is written
struct RunOutput {
    summary: RunSummary,
    duplicates_report: Option<String>,
}

/// Streams a delimited source into a sink
#[derive(Debug)]
pub struct Pipeline<S: RowSink> {
    sink: S,
    configuration: ProcessorConfiguration,
    key_fn: DuplicateKeyFn,
    policy: ConversionFailurePolicy,
    show_progress: bool,
    state: PipelineState,
}

impl<S: RowSink> Pipeline<S> {
    /// Create a pipeline; `configure` declares the column mappings and batch size
    pub fn new<F>(sink: S, configure: F, key_fn: DuplicateKeyFn) -> Result<Self>
    where
        F: FnOnce(&mut ProcessorConfiguration) -> Result<()>,
    {
        let mut configuration = ProcessorConfiguration::new();
        configure(&mut configuration)?;

        if configuration.is_empty() {
            return Err(LoaderError::configuration(
                "at least one column mapping is required",
            ));
        }

        Ok(Self {
            sink,
            configuration,
            key_fn,
            policy: ConversionFailurePolicy::default(),
            show_progress: false,
            state: PipelineState::Idle,
        })
    }

    /// Choose how per-row conversion failures are handled
    pub fn with_conversion_failure_policy(mut self, policy: ConversionFailurePolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Show a progress spinner while streaming
    pub fn with_progress(mut self, show_progress: bool) -> Self {
        self.show_progress = show_progress;
        self
    }

    pub fn state(&self) -> PipelineState {
        self.state
    }

    pub fn configuration(&self) -> &ProcessorConfiguration {
        &self.configuration
    }

    pub fn sink(&self) -> &S {
        &self.sink
    }

    pub fn sink_mut(&mut self) -> &mut S {
        &mut self.sink
    }

    pub fn into_sink(self) -> S {
        self.sink
    }

    /// Row count currently held by the sink
    pub async fn total_records(&mut self) -> Result<u64> {
        self.sink.count_rows().await
    }

    /// Load a file and write the duplicates report next to it.
    ///
    /// The duplicates file is only written when the run completes.
    pub async fn process_file(&mut self, input: &Path, duplicates_path: &Path) -> Result<RunSummary> {
        info!("Loading {}", input.display());

        let file = match File::open(input).await {
            Ok(file) => file,
            Err(e) => {
                self.state = PipelineState::Failed;
                return Err(LoaderError::Io(e));
            }
        };

        let output = self.execute(BufReader::new(file)).await?;

        if let Some(report) = &output.duplicates_report {
            if let Err(e) = fs::write(duplicates_path, report).await {
                self.state = PipelineState::Failed;
                return Err(LoaderError::Io(e));
            }
            debug!("Duplicates written to {}", duplicates_path.display());
        }

        self.state = PipelineState::Done;
        Ok(output.summary)
    }

    /// Load from any buffered reader, writing the duplicates report to `duplicates`
    pub async fn process_reader<R, W>(&mut self, reader: R, duplicates: &mut W) -> Result<RunSummary>
    where
        R: AsyncBufRead + Unpin,
        W: AsyncWrite + Unpin,
    {
        let output = self.execute(reader).await?;

        if let Some(report) = &output.duplicates_report {
            let written = async {
                duplicates.write_all(report.as_bytes()).await?;
                duplicates.flush().await
            }
            .await;

            if let Err(e) = written {
                self.state = PipelineState::Failed;
                return Err(LoaderError::Io(e));
            }
        }

        self.state = PipelineState::Done;
        Ok(output.summary)
    }

    async fn execute<R>(&mut self, reader: R) -> Result<RunOutput>
    where
        R: AsyncBufRead + Unpin,
    {
        self.state = PipelineState::Idle;
        let result = self.run(reader).await;
        if result.is_err() {
            self.state = PipelineState::Failed;
        }
        result
    }

    async fn run<R>(&mut self, mut reader: R) -> Result<RunOutput>
    where
        R: AsyncBufRead + Unpin,
    {
        let start_time = Instant::now();
        let mut buf = Vec::new();

        let header = match read_line(&mut reader, &mut buf).await? {
            Some(line) => HeaderLine::parse(&line),
            None => None,
        };
        let Some(header) = header else {
            warn!("Data file is empty");
            return Ok(RunOutput {
                summary: RunSummary {
                    elapsed: start_time.elapsed(),
                    ..Default::default()
                },
                duplicates_report: None,
            });
        };
        self.state = PipelineState::HeaderRead;

        resolve_source_indices(&mut self.configuration, &header)?;
        let transformer = RowTransformer::new(&self.configuration, self.policy)?;
        let required_fields = transformer.required_fields();
        info!(
            "Resolved {} column mappings against {} header fields",
            self.configuration.len(),
            header.len()
        );

        let mut filter = DuplicateFilter::new(self.key_fn.clone());
        let mut accumulator =
            BatchAccumulator::new(transformer.columns(), self.configuration.batch_size());
        let mut summary = RunSummary::default();
        let progress = self.progress_bar();

        self.state = PipelineState::Streaming;
        while let Some(line) = read_line(&mut reader, &mut buf).await? {
            summary.lines_read += 1;
            if summary.lines_read % PROGRESS_UPDATE_INTERVAL == 0 {
                progress.set_position(summary.lines_read as u64);
                progress.set_message(format!("{} rows accepted", summary.accepted));
            }

            if line.trim().is_empty() {
                continue;
            }

            let fields = split_fields(&line);
            if fields.len() < required_fields {
                summary.skipped_short += 1;
                continue;
            }

            if filter.check(&fields, &line) == DuplicateStatus::Duplicate {
                summary.duplicates += 1;
                continue;
            }

            match transformer.transform(&fields)? {
                RowOutcome::Accepted(row) => {
                    summary.accepted += 1;
                    accumulator.add(row, &mut self.sink).await?;
                }
                RowOutcome::Rejected(RejectReason::ShortLine { .. }) => summary.skipped_short += 1,
                RowOutcome::Rejected(reason) if reason.is_invalid() => summary.invalid += 1,
                RowOutcome::Rejected(_) => summary.blank_rejected += 1,
            }
        }

        self.state = PipelineState::Draining;
        accumulator.finish(&mut self.sink).await?;
        progress.finish_and_clear();

        summary.batches_flushed = accumulator.flush_count();
        summary.sink_row_count = Some(self.sink.count_rows().await?);
        summary.elapsed = start_time.elapsed();

        info!("Successfully processed all the data");
        info!("Invalid rows: {}", summary.invalid);
        info!("Duplicate rows: {}", summary.duplicates);
        debug!("{}", summary.summary());

        Ok(RunOutput {
            duplicates_report: Some(filter.render_report(header.raw())),
            summary,
        })
    }

    fn progress_bar(&self) -> ProgressBar {
        if !self.show_progress {
            return ProgressBar::hidden();
        }

        let pb = ProgressBar::new_spinner();
        if let Ok(style) = ProgressStyle::default_spinner()
            .template("{spinner:.green} [{elapsed_precise}] {pos} lines {msg}")
        {
            pb.set_style(style.tick_chars("⠁⠂⠄⡀⢀⠠⠐⠈ "));
        }
        pb.set_message("streaming");
        pb
    }
}

/// Read one line without its `\n` or `\r\n` terminator; `None` at end of input.
///
/// Bytes that are not valid UTF-8 are replaced with U+FFFD so a single corrupt
/// line cannot end the run.
async fn read_line<R>(reader: &mut R, buf: &mut Vec<u8>) -> Result<Option<String>>
where
    R: AsyncBufRead + Unpin,
{
    buf.clear();
    if reader.read_until(b'\n', buf).await? == 0 {
        return Ok(None);
    }

    if buf.last() == Some(&b'\n') {
        buf.pop();
        if buf.last() == Some(&b'\r') {
            buf.pop();
        }
    }

    match String::from_utf8_lossy(buf) {
        Cow::Borrowed(line) => Ok(Some(line.to_string())),
        Cow::Owned(line) => {
            debug!("Replaced invalid UTF-8 in line: {}", line);
            Ok(Some(line))
        }
    }
}
