//! Loader configuration.
//!
//! A [`LoaderConfig`] is the serializable description of one load: column
//! mappings, the duplicate key, the destination table and its column names.
//! It is read from JSON and turned into the runtime collaborators the
//! pipeline consumes. The default value describes the NYC yellow cab trip
//! files.

use crate::constants::{
    DEFAULT_BATCH_SIZE, DEFAULT_DUPLICATES_FILE, DEFAULT_TABLE, TRIP_TIMESTAMP_FORMAT,
    TRIP_TIMEZONE,
};
use crate::dedup::{DuplicateKeyFn, key_from_columns};
use crate::error::{LoaderError, Result};
use crate::mapping::{
    ColumnMapping, ColumnSchema, ConversionResult, CustomConversion, ProcessorConfiguration,
    Value, ValueKind,
};
use crate::sink::ColumnNameMap;
use crate::transform::ConversionFailurePolicy;
use chrono::{DateTime, Duration, LocalResult, NaiveDateTime, Offset, TimeZone, Utc};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Conversions that can be named in a configuration file
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum NamedConversion {
    /// `"Y"` becomes `"Yes"`, anything else `"No"`
    YesNoFlag,
    /// Local timestamp in an explicit format and IANA zone, normalized to UTC
    ZonedDateTime { format: String, timezone: String },
}

impl NamedConversion {
    /// Build the runtime conversion, validating the timezone up front
    pub fn build(&self) -> Result<CustomConversion> {
        match self {
            NamedConversion::YesNoFlag => Ok(CustomConversion::new(yes_no_flag)),
            NamedConversion::ZonedDateTime { format, timezone } => {
                let tz: Tz = timezone.parse().map_err(|e| {
                    LoaderError::configuration(format!("unknown timezone '{}': {}", timezone, e))
                })?;
                let format = format.clone();
                Ok(CustomConversion::new(move |raw| {
                    zoned_date_time(raw, &format, tz)
                }))
            }
        }
    }
}

fn yes_no_flag(raw: &str) -> ConversionResult {
    Ok(Value::from(if raw == "Y" { "Yes" } else { "No" }))
}

/// Parse `raw` with `format` as wall-clock time in `tz` and return it in UTC.
///
/// A repeated hour resolves to standard time. A skipped hour keeps the offset
/// in force just before the gap.
pub fn zoned_date_time(raw: &str, format: &str, tz: Tz) -> ConversionResult {
    let naive = NaiveDateTime::parse_from_str(raw, format).map_err(|e| {
        format!(
            "invalid date format '{}', expected '{}': {}",
            raw, format, e
        )
    })?;

    local_to_utc(naive, tz)
        .map(Value::DateTime)
        .ok_or_else(|| format!("'{}' cannot be placed in {}", raw, tz))
}

fn local_to_utc(naive: NaiveDateTime, tz: Tz) -> Option<DateTime<Utc>> {
    match tz.from_local_datetime(&naive) {
        LocalResult::Single(dt) => Some(dt.with_timezone(&Utc)),
        LocalResult::Ambiguous(_, standard) => Some(standard.with_timezone(&Utc)),
        LocalResult::None => {
            let before = tz
                .from_local_datetime(&(naive - Duration::hours(1)))
                .earliest()?;
            let offset = before.offset().fix().local_minus_utc();
            Some((naive - Duration::seconds(i64::from(offset))).and_utc())
        }
    }
}

fn default_trim() -> bool {
    true
}

/// One column of a configuration file
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnSpec {
    /// Header name to resolve
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,

    /// Fixed source position, used when `source` is absent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub index: Option<usize>,

    /// Destination field name; defaults to the source name
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dest: Option<String>,

    #[serde(default)]
    pub kind: ValueKind,

    #[serde(default = "default_trim")]
    pub trim: bool,

    #[serde(default)]
    pub remove_row_if_blank: bool,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub conversion: Option<NamedConversion>,
}

impl ColumnSpec {
    pub fn named(source: impl Into<String>, kind: ValueKind) -> Self {
        Self {
            source: Some(source.into()),
            index: None,
            dest: None,
            kind,
            trim: true,
            remove_row_if_blank: false,
            conversion: None,
        }
    }

    pub fn indexed(index: usize, dest: impl Into<String>, kind: ValueKind) -> Self {
        Self {
            source: None,
            index: Some(index),
            dest: Some(dest.into()),
            kind,
            trim: true,
            remove_row_if_blank: false,
            conversion: None,
        }
    }

    pub fn with_dest(mut self, dest: impl Into<String>) -> Self {
        self.dest = Some(dest.into());
        self
    }

    pub fn with_conversion(mut self, conversion: NamedConversion) -> Self {
        self.conversion = Some(conversion);
        self
    }

    pub fn with_remove_row_if_blank(mut self, remove: bool) -> Self {
        self.remove_row_if_blank = remove;
        self
    }

    /// Turn this entry into a runtime column mapping
    pub fn to_mapping(&self) -> Result<ColumnMapping> {
        let mapping = match (&self.source, self.index) {
            (Some(source), _) => {
                let mut mapping = ColumnMapping::by_name(source.as_str());
                mapping.source_index = self.index;
                mapping
            }
            (None, Some(index)) => ColumnMapping::by_index(index, ""),
            (None, None) => {
                return Err(LoaderError::configuration(format!(
                    "column '{}' needs a source name or index",
                    self.dest.as_deref().unwrap_or("<unnamed>")
                )));
            }
        };

        let mapping = match &self.dest {
            Some(dest) => mapping.dest(dest.as_str()),
            None => mapping,
        };

        let conversion = self
            .conversion
            .as_ref()
            .map(NamedConversion::build)
            .transpose()?;

        Ok(mapping
            .kind(self.kind.clone())
            .trim(self.trim)
            .remove_row_if_blank(self.remove_row_if_blank)
            .conversion(conversion))
    }
}

/// Everything needed to run one load
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoaderConfig {
    pub batch_size: usize,
    pub columns: Vec<ColumnSpec>,

    /// Raw field positions joined with `_` to build the duplicate key
    pub duplicate_key_columns: Vec<usize>,

    pub duplicates_path: PathBuf,

    /// Output field name to storage column name
    pub column_names: ColumnNameMap,

    pub table: String,
    pub truncate_before_load: bool,
    pub conversion_failure_policy: ConversionFailurePolicy,
}

impl Default for LoaderConfig {
    fn default() -> Self {
        let trip_time = NamedConversion::ZonedDateTime {
            format: TRIP_TIMESTAMP_FORMAT.to_string(),
            timezone: TRIP_TIMEZONE.to_string(),
        };

        let columns = vec![
            ColumnSpec::named("tpep_pickup_datetime", ValueKind::DateTime)
                .with_conversion(trip_time.clone()),
            ColumnSpec::named("tpep_dropoff_datetime", ValueKind::DateTime)
                .with_conversion(trip_time),
            ColumnSpec::named("passenger_count", ValueKind::Integer),
            ColumnSpec::named("trip_distance", ValueKind::Decimal),
            ColumnSpec::named("store_and_fwd_flag", ValueKind::String)
                .with_conversion(NamedConversion::YesNoFlag),
            ColumnSpec::named("PULocationID", ValueKind::Integer),
            ColumnSpec::named("DOLocationID", ValueKind::Integer),
            ColumnSpec::named("fare_amount", ValueKind::Decimal),
            ColumnSpec::named("tip_amount", ValueKind::Decimal),
        ];

        let column_names = ColumnNameMap::from_pairs([
            ("tpep_pickup_datetime", "PickupDateTime"),
            ("tpep_dropoff_datetime", "DropoffDateTime"),
            ("passenger_count", "PassengerCount"),
            ("trip_distance", "TripDistance"),
            ("store_and_fwd_flag", "StoreAndFwdFlag"),
            ("PULocationID", "PULocationID"),
            ("DOLocationID", "DOLocationID"),
            ("fare_amount", "FareAmount"),
            ("tip_amount", "TipAmount"),
        ]);

        Self {
            batch_size: DEFAULT_BATCH_SIZE,
            columns,
            duplicate_key_columns: vec![1, 2, 3],
            duplicates_path: PathBuf::from(DEFAULT_DUPLICATES_FILE),
            column_names,
            table: DEFAULT_TABLE.to_string(),
            truncate_before_load: true,
            conversion_failure_policy: ConversionFailurePolicy::default(),
        }
    }
}

impl LoaderConfig {
    /// Read a JSON configuration file; omitted fields keep their defaults
    pub fn load(path: &Path) -> Result<Self> {
        debug!("Loading configuration from {}", path.display());
        let content = fs::read_to_string(path)?;
        let config: LoaderConfig = serde_json::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.batch_size == 0 {
            return Err(LoaderError::configuration(
                "batch_size must be greater than zero",
            ));
        }

        if self.columns.is_empty() {
            return Err(LoaderError::configuration(
                "at least one column must be configured",
            ));
        }

        if self.duplicate_key_columns.is_empty() {
            return Err(LoaderError::configuration(
                "duplicate_key_columns cannot be empty",
            ));
        }

        if self.table.trim().is_empty() {
            return Err(LoaderError::configuration("table name cannot be blank"));
        }

        Ok(())
    }

    /// Declare batch size and column mappings on a pipeline configuration
    pub fn configure(&self, configuration: &mut ProcessorConfiguration) -> Result<()> {
        configuration.set_batch_size(self.batch_size)?;
        for spec in &self.columns {
            configuration.add_column_mapping(spec.to_mapping()?)?;
        }
        Ok(())
    }

    /// Destination columns in output order, for creating storage up front
    pub fn column_schema(&self) -> Result<Vec<ColumnSchema>> {
        let mut configuration = ProcessorConfiguration::new();
        self.configure(&mut configuration)?;
        Ok(configuration.column_schema())
    }

    pub fn duplicate_key_fn(&self) -> DuplicateKeyFn {
        key_from_columns(self.duplicate_key_columns.clone())
    }

    pub fn column_name_map(&self) -> &ColumnNameMap {
        &self.column_names
    }

    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size;
        self
    }

    pub fn with_duplicates_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.duplicates_path = path.into();
        self
    }

    pub fn with_table(mut self, table: impl Into<String>) -> Self {
        self.table = table.into();
        self
    }

    pub fn with_truncate_before_load(mut self, truncate: bool) -> Self {
        self.truncate_before_load = truncate;
        self
    }

    pub fn with_conversion_failure_policy(mut self, policy: ConversionFailurePolicy) -> Self {
        self.conversion_failure_policy = policy;
        self
    }
}
