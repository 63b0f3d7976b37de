//! Duplicate diversion and the duplicates report

use super::{memory_pipeline, run_input};
use crate::dedup::key_from_columns;
use crate::error::Result;
use crate::mapping::{ProcessorConfiguration, ValueKind};
use crate::pipeline::Pipeline;
use crate::sink::{MemorySink, RowSink};

fn configure(config: &mut ProcessorConfiguration) -> Result<()> {
    config.set_batch_size(2)?;
    config.add_column("key", ValueKind::String)?;
    config.add_column("amount", ValueKind::Integer)?;
    Ok(())
}

const INPUT: &str = "key,amount\n\
                     k1,1\n\
                     k2,2\n\
                     k1,3\n\
                     k1,  4  \n\
                     k3,5\n\
                     k2,6\n";

#[tokio::test]
async fn test_repeat_keys_are_diverted_in_encounter_order() {
    let mut pipeline = memory_pipeline(configure, vec![0]);

    let (summary, duplicates) = run_input(&mut pipeline, INPUT).await.unwrap();

    assert_eq!(summary.accepted, 3);
    assert_eq!(summary.duplicates, 3);
    assert_eq!(summary.invalid, 0);
    assert_eq!(
        duplicates,
        "key,amount\nk1,3\nk1,  4  \nk2,6\n"
    );

    let amounts: Vec<i64> = pipeline
        .sink()
        .rows()
        .iter()
        .filter_map(|row| row.get("amount").and_then(|v| v.as_i64()))
        .collect();
    assert_eq!(amounts, vec![1, 2, 5]);
}

#[tokio::test]
async fn test_duplicates_are_never_transformed() {
    let mut pipeline = memory_pipeline(configure, vec![0]);

    // The repeat carries a malformed integer; it must not abort the run
    let (summary, duplicates) = run_input(&mut pipeline, "key,amount\nk1,1\nk1,oops\n")
        .await
        .unwrap();

    assert_eq!(summary.accepted, 1);
    assert_eq!(summary.duplicates, 1);
    assert_eq!(summary.invalid, 0);
    assert!(duplicates.ends_with("k1,oops\n"));
}

#[tokio::test]
async fn test_report_is_just_the_header_without_duplicates() {
    let mut pipeline = memory_pipeline(configure, vec![0]);

    let (_, duplicates) = run_input(&mut pipeline, "key,amount\na,1\nb,2\n").await.unwrap();
    assert_eq!(duplicates, "key,amount\n");
}

#[tokio::test]
async fn test_reprocessing_truncated_destination_is_idempotent() {
    let mut first = memory_pipeline(configure, vec![0]);
    let (first_summary, first_report) = run_input(&mut first, INPUT).await.unwrap();

    let mut sink = first.into_sink();
    sink.truncate().await.unwrap();

    let mut second = Pipeline::new(sink, configure, key_from_columns(vec![0])).unwrap();
    let (second_summary, second_report) = run_input(&mut second, INPUT).await.unwrap();

    assert_eq!(first_summary.sink_row_count, second_summary.sink_row_count);
    assert_eq!(first_report.as_bytes(), second_report.as_bytes());
    assert_eq!(second.total_records().await.unwrap(), 3);
}

#[tokio::test]
async fn test_duplicates_file_is_written_on_success() {
    let temp_dir = tempfile::TempDir::new().unwrap();
    let input = temp_dir.path().join("trips.csv");
    let report = temp_dir.path().join("duplicates.csv");
    std::fs::write(&input, INPUT).unwrap();

    let mut pipeline: Pipeline<MemorySink> = memory_pipeline(configure, vec![0]);
    let summary = pipeline.process_file(&input, &report).await.unwrap();

    assert_eq!(summary.duplicates, 3);
    assert_eq!(
        std::fs::read_to_string(&report).unwrap(),
        "key,amount\nk1,3\nk1,  4  \nk2,6\n"
    );
}

#[tokio::test]
async fn test_missing_input_file_writes_no_report() {
    let temp_dir = tempfile::TempDir::new().unwrap();
    let report = temp_dir.path().join("duplicates.csv");

    let mut pipeline = memory_pipeline(configure, vec![0]);
    let err = pipeline
        .process_file(&temp_dir.path().join("absent.csv"), &report)
        .await
        .unwrap_err();

    assert!(matches!(err, crate::error::LoaderError::Io(_)));
    assert!(!report.exists());
}
