//! Command implementation for the trip loader CLI
//!
//! Sets up logging, builds the configuration and destination from the
//! arguments, runs the pipeline and prints the load summary.

use crate::cli::args::{Args, SinkTarget};
use crate::config::LoaderConfig;
use crate::models::RunSummary;
use crate::pipeline::Pipeline;
use crate::sink::{MemorySink, ParquetSink, RowSink, SqliteSink};
use anyhow::{Context, Result};
use colored::*;
use tracing::{debug, info};

/// Run a load as described by the command-line arguments
pub async fn run(args: Args) -> Result<RunSummary> {
    setup_logging(&args);

    info!("Starting trip loader");
    debug!("Command line arguments: {:?}", args);

    args.validate()?;

    let config = load_configuration(&args)?;
    debug!("Loaded configuration: {:?}", config);

    let target = args.sink_target();
    let summary = match &target {
        SinkTarget::Memory => load(MemorySink::new(), &args, &config).await?,
        SinkTarget::Sqlite(path) => {
            let sink = SqliteSink::open(path, config.table.clone(), config.column_names.clone())
                .with_context(|| format!("Failed to open database {}", path.display()))?;
            sink.create_table(&config.column_schema()?)
                .with_context(|| format!("Failed to prepare table {}", config.table))?;
            load(sink, &args, &config).await?
        }
        SinkTarget::Parquet(dir) => {
            let sink = ParquetSink::new(dir, config.column_names.clone())
                .with_context(|| format!("Failed to prepare output directory {}", dir.display()))?;
            load(sink, &args, &config).await?
        }
    };

    if args.show_progress() {
        print_summary(&summary, &target, &config);
    }

    Ok(summary)
}

/// Read the configuration file if given, then apply command-line overrides
fn load_configuration(args: &Args) -> Result<LoaderConfig> {
    let config = match &args.config_file {
        Some(path) => LoaderConfig::load(path)
            .with_context(|| format!("Failed to load configuration from {}", path.display()))?,
        None => LoaderConfig::default(),
    };

    let config = args.apply_overrides(config);
    config.validate()?;
    Ok(config)
}

async fn load<S: RowSink>(mut sink: S, args: &Args, config: &LoaderConfig) -> Result<RunSummary> {
    if config.truncate_before_load {
        sink.truncate()
            .await
            .context("Failed to truncate destination")?;
        info!("Destination truncated");
    }

    let mut pipeline = Pipeline::new(
        sink,
        |configuration| config.configure(configuration),
        config.duplicate_key_fn(),
    )?
    .with_conversion_failure_policy(config.conversion_failure_policy)
    .with_progress(args.show_progress());

    let summary = pipeline
        .process_file(&args.input, &config.duplicates_path)
        .await
        .with_context(|| format!("Failed to load {}", args.input.display()))?;

    Ok(summary)
}

/// Set up structured logging based on CLI arguments
fn setup_logging(args: &Args) {
    use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

    let log_level = args.get_log_level();

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("trip_loader={}", log_level)));

    let result = if args.quiet {
        tracing_subscriber::registry()
            .with(filter)
            .with(
                fmt::layer()
                    .with_target(false)
                    .with_level(true)
                    .with_writer(std::io::stderr)
                    .compact(),
            )
            .try_init()
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(
                fmt::layer()
                    .with_target(false)
                    .with_level(true)
                    .with_timer(fmt::time::uptime())
                    .with_writer(std::io::stderr),
            )
            .try_init()
    };

    // A subscriber is already installed when running more than once in-process
    if result.is_ok() {
        debug!("Logging initialized at level: {}", log_level);
    }
}

fn print_summary(summary: &RunSummary, target: &SinkTarget, config: &LoaderConfig) {
    println!("\n{}", "Load Summary".bright_green().bold());
    println!(
        "  {} {:.2}s",
        "Time elapsed:".bright_cyan(),
        summary.elapsed.as_secs_f64()
    );
    println!(
        "  {} {}",
        "Lines read:".bright_cyan(),
        summary.lines_read.to_string().bright_white()
    );
    println!(
        "  {} {}",
        "Rows accepted:".bright_cyan(),
        summary.accepted.to_string().bright_white().bold()
    );

    if summary.duplicates > 0 {
        println!(
            "  {} {} (written to {})",
            "Duplicate rows:".bright_yellow(),
            summary.duplicates.to_string().bright_yellow().bold(),
            config.duplicates_path.display()
        );
    } else {
        println!("  {} 0", "Duplicate rows:".bright_cyan());
    }

    if summary.invalid > 0 {
        println!(
            "  {} {}",
            "Invalid rows:".bright_red(),
            summary.invalid.to_string().bright_red().bold()
        );
    } else {
        println!("  {} 0", "Invalid rows:".bright_cyan());
    }

    if summary.blank_rejected + summary.skipped_short > 0 {
        println!(
            "  {} {} blank required, {} short",
            "Skipped lines:".bright_cyan(),
            summary.blank_rejected,
            summary.skipped_short
        );
    }

    let destination = match target {
        SinkTarget::Memory => "memory (dry run)".to_string(),
        SinkTarget::Sqlite(path) => format!("{} in {}", config.table, path.display()),
        SinkTarget::Parquet(dir) => dir.display().to_string(),
    };
    let rows = summary
        .sink_row_count
        .map(|count| count.to_string())
        .unwrap_or_else(|| "-".to_string());
    println!(
        "  {} {} ({})",
        "Total rows in destination:".bright_cyan(),
        rows.bright_white().bold(),
        destination
    );
}
