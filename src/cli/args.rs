//! Command-line argument definitions for the trip loader

use crate::config::LoaderConfig;
use crate::constants::DEFAULT_DATABASE_FILE;
use crate::error::{LoaderError, Result};
use crate::transform::ConversionFailurePolicy;
use clap::Parser;
use std::path::PathBuf;

#[derive(Debug, Clone, Parser)]
#[command(
    name = "trip-loader",
    version,
    about = "Load NYC taxi trip CSV files into SQLite or Parquet",
    long_about = "Streams a trip record CSV file into a destination table in fixed-size batches. \
                  Columns are mapped and converted per the loader configuration, repeated records \
                  are diverted to a duplicates file, and a load summary is printed at the end."
)]
pub struct Args {
    /// Trip record file to load
    #[arg(value_name = "CSV_FILE")]
    pub input: PathBuf,

    #[arg(
        short = 'c',
        long = "config",
        value_name = "FILE",
        help = "Path to a JSON loader configuration (defaults to the cab trip layout)"
    )]
    pub config_file: Option<PathBuf>,

    #[arg(
        long = "database",
        value_name = "FILE",
        conflicts_with = "parquet_dir",
        help = "SQLite database receiving the rows"
    )]
    pub database: Option<PathBuf>,

    #[arg(
        long = "parquet-dir",
        value_name = "DIR",
        help = "Write Parquet part files to this directory instead of SQLite"
    )]
    pub parquet_dir: Option<PathBuf>,

    #[arg(long = "table", value_name = "NAME", help = "Destination table name")]
    pub table: Option<String>,

    #[arg(
        long = "duplicates",
        value_name = "FILE",
        help = "Where to write the header and every duplicate line"
    )]
    pub duplicates: Option<PathBuf>,

    #[arg(
        short = 'b',
        long = "batch-size",
        value_name = "ROWS",
        help = "Rows per bulk insert"
    )]
    pub batch_size: Option<usize>,

    #[arg(long = "no-truncate", help = "Keep existing rows in the destination")]
    pub no_truncate: bool,

    #[arg(
        long = "count-invalid",
        help = "Count rows with unconvertible values as invalid instead of aborting"
    )]
    pub count_invalid: bool,

    #[arg(
        long = "dry-run",
        help = "Run the whole pipeline against an in-memory destination"
    )]
    pub dry_run: bool,

    #[arg(
        short = 'v',
        long = "verbose",
        action = clap::ArgAction::Count,
        help = "Increase logging verbosity (-v: info, -vv: debug, -vvv: trace)"
    )]
    pub verbose: u8,

    #[arg(
        short = 'q',
        long = "quiet",
        conflicts_with = "verbose",
        help = "Suppress output except errors"
    )]
    pub quiet: bool,
}

/// Destination selected on the command line
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SinkTarget {
    Memory,
    Sqlite(PathBuf),
    Parquet(PathBuf),
}

impl Args {
    /// Check the input file and numeric options before anything is opened
    pub fn validate(&self) -> Result<()> {
        if !self.input.is_file() {
            return Err(LoaderError::configuration(format!(
                "The specified CSV file does not exist: {}",
                self.input.display()
            )));
        }

        if self.input.extension().and_then(|e| e.to_str()) != Some("csv") {
            return Err(LoaderError::configuration(format!(
                "The specified file is not a .csv file: {}",
                self.input.display()
            )));
        }

        if self.batch_size == Some(0) {
            return Err(LoaderError::configuration(
                "Batch size must be greater than 0",
            ));
        }

        Ok(())
    }

    /// Layer command-line overrides on top of a loaded configuration
    pub fn apply_overrides(&self, mut config: LoaderConfig) -> LoaderConfig {
        if let Some(batch_size) = self.batch_size {
            config = config.with_batch_size(batch_size);
        }
        if let Some(table) = &self.table {
            config = config.with_table(table.clone());
        }
        if let Some(duplicates) = &self.duplicates {
            config = config.with_duplicates_path(duplicates.clone());
        }
        if self.no_truncate {
            config = config.with_truncate_before_load(false);
        }
        if self.count_invalid {
            config = config.with_conversion_failure_policy(ConversionFailurePolicy::CountAsInvalid);
        }
        config
    }

    pub fn sink_target(&self) -> SinkTarget {
        if self.dry_run {
            SinkTarget::Memory
        } else if let Some(dir) = &self.parquet_dir {
            SinkTarget::Parquet(dir.clone())
        } else {
            SinkTarget::Sqlite(
                self.database
                    .clone()
                    .unwrap_or_else(|| PathBuf::from(DEFAULT_DATABASE_FILE)),
            )
        }
    }

    pub fn get_log_level(&self) -> &'static str {
        if self.quiet {
            "error"
        } else {
            match self.verbose {
                0 => "warn",
                1 => "info",
                2 => "debug",
                _ => "trace",
            }
        }
    }

    /// Progress spinner and summary are shown unless quiet
    pub fn show_progress(&self) -> bool {
        !self.quiet
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn parse(args: &[&str]) -> Args {
        Args::try_parse_from(std::iter::once("trip-loader").chain(args.iter().copied())).unwrap()
    }

    #[test]
    fn test_validation() {
        let temp_dir = TempDir::new().unwrap();
        let csv = temp_dir.path().join("trips.csv");
        let txt = temp_dir.path().join("trips.txt");
        fs::write(&csv, "a\n").unwrap();
        fs::write(&txt, "a\n").unwrap();

        assert!(parse(&[csv.to_str().unwrap()]).validate().is_ok());

        let err = parse(&[txt.to_str().unwrap()]).validate().unwrap_err();
        assert!(err.to_string().contains("not a .csv file"));

        let missing = temp_dir.path().join("missing.csv");
        let err = parse(&[missing.to_str().unwrap()]).validate().unwrap_err();
        assert!(err.to_string().contains("does not exist"));

        let err = parse(&[csv.to_str().unwrap(), "--batch-size", "0"])
            .validate()
            .unwrap_err();
        assert!(err.is_configuration());
    }

    #[test]
    fn test_overrides() {
        let args = parse(&[
            "trips.csv",
            "--batch-size",
            "250",
            "--table",
            "Trips",
            "--duplicates",
            "dups.csv",
            "--no-truncate",
            "--count-invalid",
        ]);
        let config = args.apply_overrides(LoaderConfig::default());

        assert_eq!(config.batch_size, 250);
        assert_eq!(config.table, "Trips");
        assert_eq!(config.duplicates_path, PathBuf::from("dups.csv"));
        assert!(!config.truncate_before_load);
        assert_eq!(
            config.conversion_failure_policy,
            ConversionFailurePolicy::CountAsInvalid
        );

        let untouched = parse(&["trips.csv"]).apply_overrides(LoaderConfig::default());
        assert_eq!(untouched.batch_size, 10_000);
        assert!(untouched.truncate_before_load);
    }

    #[test]
    fn test_sink_target() {
        assert_eq!(
            parse(&["trips.csv"]).sink_target(),
            SinkTarget::Sqlite(PathBuf::from(DEFAULT_DATABASE_FILE))
        );
        assert_eq!(
            parse(&["trips.csv", "--parquet-dir", "out"]).sink_target(),
            SinkTarget::Parquet(PathBuf::from("out"))
        );
        assert_eq!(
            parse(&["trips.csv", "--parquet-dir", "out", "--dry-run"]).sink_target(),
            SinkTarget::Memory
        );
        assert!(
            Args::try_parse_from(["trip-loader", "t.csv", "--database", "a.db", "--parquet-dir", "b"])
                .is_err()
        );
    }

    #[test]
    fn test_log_level() {
        assert_eq!(parse(&["t.csv"]).get_log_level(), "warn");
        assert_eq!(parse(&["t.csv", "-v"]).get_log_level(), "info");
        assert_eq!(parse(&["t.csv", "-vv"]).get_log_level(), "debug");
        assert_eq!(parse(&["t.csv", "-vvvv"]).get_log_level(), "trace");

        let quiet = parse(&["t.csv", "-q"]);
        assert_eq!(quiet.get_log_level(), "error");
        assert!(!quiet.show_progress());
    }
}
