//! Application constants for the trip loader
//!
//! Default values and fixed formats used throughout the loader.

// =============================================================================
// Source Input
// =============================================================================

/// Field delimiter for header and data lines (no quoting or escaping)
pub const FIELD_DELIMITER: char = ',';

/// Separator placed between fields when building duplicate keys
pub const DUPLICATE_KEY_SEPARATOR: &str = "_";

/// Number of lines between progress updates while streaming
pub const PROGRESS_UPDATE_INTERVAL: usize = 10_000;

// =============================================================================
// Batching and Output
// =============================================================================

/// Rows accumulated before a bulk insert is issued
pub const DEFAULT_BATCH_SIZE: usize = 10_000;

/// File receiving the header plus every duplicate raw line
pub const DEFAULT_DUPLICATES_FILE: &str = "duplicates.csv";

/// Destination table for trip records
pub const DEFAULT_TABLE: &str = "CabTripData";

/// SQLite database used when no other sink is requested
pub const DEFAULT_DATABASE_FILE: &str = "trip_loader.db";

/// Prefix of part files written by the Parquet sink
pub const PARQUET_PART_PREFIX: &str = "part-";

// =============================================================================
// Date/Time Parsing
// =============================================================================

/// Offset-less formats accepted by the date-time value kind (interpreted as UTC)
pub const NAIVE_DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M",
    "%m/%d/%Y %I:%M:%S %p",
    "%m/%d/%Y %H:%M:%S",
];

/// Formats carrying an explicit UTC offset
pub const OFFSET_DATETIME_FORMATS: &[&str] = &["%Y-%m-%d %H:%M:%S%.f %z", "%m/%d/%Y %I:%M:%S %p %z"];

/// Date-only format (midnight UTC)
pub const DATE_FORMAT: &str = "%Y-%m-%d";

/// Canonical rendering of converted date-time values
pub const CANONICAL_DATETIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Timestamp layout used by the NYC TLC trip files
pub const TRIP_TIMESTAMP_FORMAT: &str = "%m/%d/%Y %I:%M:%S %p";

/// Zone in which trip timestamps are recorded
pub const TRIP_TIMEZONE: &str = "America/New_York";
