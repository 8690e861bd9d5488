//! Configuration loading and config-path resolution
//!
//! The importer is configured by one TOML file holding the known-station set,
//! the DST-interval table, the monitoring-start-time table, the diagnostic
//! suppression list, and logging options. Table malformation is fatal and
//! reported before any walking begins.

use crate::{Error, Result};
use chrono::{Datelike, NaiveDate, NaiveDateTime, NaiveTime};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::warn;

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level: "error", "warn", "info", "debug", "trace"
    #[serde(default = "default_log_level")]
    pub level: String,
    /// Optional log file path (stderr when absent)
    #[serde(default)]
    pub file: Option<PathBuf>,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            file: None,
        }
    }
}

/// One DST-interval table entry.
///
/// An entry without a station is the shared per-year default. An entry with a
/// station overrides the default for that station; `observed = false` records
/// that the station did not observe DST that year, which disables DST
/// reasoning even when a default interval exists.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DstIntervalEntry {
    pub year: i32,
    #[serde(default)]
    pub station: Option<String>,
    #[serde(default = "default_true")]
    pub observed: bool,
    #[serde(default)]
    pub start: Option<NaiveDateTime>,
    #[serde(default)]
    pub end: Option<NaiveDateTime>,
}

fn default_true() -> bool {
    true
}

/// Closed date range, inclusive on both ends
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DateRange {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

/// One monitoring-start-time table entry.
///
/// The time-of-day applies to the listed dates and every date of the listed
/// ranges; with neither dates nor ranges it applies to every date of the year.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MonitoringStartEntry {
    pub station: String,
    pub year: i32,
    pub time: NaiveTime,
    #[serde(default)]
    pub dates: Vec<NaiveDate>,
    #[serde(default)]
    pub ranges: Vec<DateRange>,
}

/// Importer TOML configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TomlConfig {
    /// Known station names; an empty list accepts any station segment
    #[serde(default)]
    pub stations: Vec<String>,

    /// Diagnostic suppression substrings (suppressed messages still count as
    /// ignored files)
    #[serde(default)]
    pub suppress: Vec<String>,

    #[serde(default)]
    pub logging: LoggingConfig,

    #[serde(default)]
    pub dst_intervals: Vec<DstIntervalEntry>,

    #[serde(default)]
    pub monitoring_start_times: Vec<MonitoringStartEntry>,
}

impl TomlConfig {
    /// Load configuration from a TOML file and validate its tables.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("Read {} failed: {}", path.display(), e)))?;
        let config: TomlConfig = toml::from_str(&content)
            .map_err(|e| Error::Config(format!("Parse {} failed: {}", path.display(), e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Validate table entries. Any malformation here aborts the run.
    pub fn validate(&self) -> Result<()> {
        for entry in &self.dst_intervals {
            if entry.observed {
                let (start, end) = match (entry.start, entry.end) {
                    (Some(s), Some(e)) => (s, e),
                    _ => {
                        return Err(Error::Config(format!(
                            "DST interval for year {} is missing start or end",
                            entry.year
                        )))
                    }
                };
                if start >= end {
                    return Err(Error::Config(format!(
                        "DST interval for year {} has start >= end",
                        entry.year
                    )));
                }
            }
        }

        for entry in &self.monitoring_start_times {
            for range in &entry.ranges {
                if range.start > range.end {
                    return Err(Error::Config(format!(
                        "monitoring start date range for station {} year {} has start {} > end {}",
                        entry.station, entry.year, range.start, range.end
                    )));
                }
            }
            for date in &entry.dates {
                if date.year() != entry.year {
                    return Err(Error::Config(format!(
                        "monitoring start date {} is outside year {} for station {}",
                        date, entry.year, entry.station
                    )));
                }
            }
        }

        Ok(())
    }
}

/// Resolve the configuration file path following the priority order:
/// 1. Command-line argument (highest priority)
/// 2. NOCTURN_CONFIG environment variable
/// 3. Platform config directory (~/.config/nocturn/nocturn.toml)
pub fn resolve_config_path(cli_arg: Option<&Path>) -> PathBuf {
    if let Some(path) = cli_arg {
        return path.to_path_buf();
    }

    if let Ok(path) = std::env::var("NOCTURN_CONFIG") {
        return PathBuf::from(path);
    }

    dirs::config_dir()
        .map(|d| d.join("nocturn").join("nocturn.toml"))
        .unwrap_or_else(|| PathBuf::from("nocturn.toml"))
}

/// Load configuration from the resolved path, falling back to defaults with a
/// warning when the file does not exist. A present-but-malformed file is still
/// fatal.
pub fn load_or_default(path: &Path) -> Result<TomlConfig> {
    if path.exists() {
        TomlConfig::load(path)
    } else {
        warn!(
            "Config file {} not found; continuing with defaults (no DST or \
             monitoring-start tables)",
            path.display()
        );
        Ok(TomlConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_full_config() {
        let text = r#"
            stations = ["Ridge", "Harbor"]
            suppress = ["no monitoring start time"]

            [logging]
            level = "debug"

            [[dst_intervals]]
            year = 2012
            start = "2012-03-11T02:00:00"
            end = "2012-11-04T02:00:00"

            [[dst_intervals]]
            year = 2012
            station = "Harbor"
            observed = false

            [[monitoring_start_times]]
            station = "Ridge"
            year = 2012
            time = "21:00:00"
            ranges = [{ start = "2012-08-15", end = "2012-10-31" }]
        "#;
        let config: TomlConfig = toml::from_str(text).unwrap();
        config.validate().unwrap();

        assert_eq!(config.stations, vec!["Ridge", "Harbor"]);
        assert_eq!(config.logging.level, "debug");
        assert_eq!(config.dst_intervals.len(), 2);
        assert!(!config.dst_intervals[1].observed);
        assert_eq!(config.monitoring_start_times[0].ranges.len(), 1);
    }

    #[test]
    fn test_empty_config_is_valid() {
        let config: TomlConfig = toml::from_str("").unwrap();
        config.validate().unwrap();
        assert!(config.stations.is_empty());
        assert_eq!(config.logging.level, "info");
    }

    #[test]
    fn test_reversed_date_range_rejected() {
        let text = r#"
            [[monitoring_start_times]]
            station = "Ridge"
            year = 2012
            time = "21:00:00"
            ranges = [{ start = "2012-10-31", end = "2012-08-15" }]
        "#;
        let config: TomlConfig = toml::from_str(text).unwrap();
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("start"));
    }

    #[test]
    fn test_dst_interval_missing_end_rejected() {
        let text = r#"
            [[dst_intervals]]
            year = 2012
            start = "2012-03-11T02:00:00"
        "#;
        let config: TomlConfig = toml::from_str(text).unwrap();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_dst_interval_start_after_end_rejected() {
        let text = r#"
            [[dst_intervals]]
            year = 2012
            start = "2012-11-04T02:00:00"
            end = "2012-03-11T02:00:00"
        "#;
        let config: TomlConfig = toml::from_str(text).unwrap();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_out_of_year_date_rejected() {
        let text = r#"
            [[monitoring_start_times]]
            station = "Ridge"
            year = 2012
            time = "21:00:00"
            dates = ["2013-08-15"]
        "#;
        let config: TomlConfig = toml::from_str(text).unwrap();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_resolve_config_path_prefers_cli() {
        let path = resolve_config_path(Some(Path::new("/tmp/custom.toml")));
        assert_eq!(path, PathBuf::from("/tmp/custom.toml"));
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nocturn.toml");
        std::fs::write(&path, "stations = [\"Ridge\"]\n").unwrap();

        let config = TomlConfig::load(&path).unwrap();
        assert_eq!(config.stations, vec!["Ridge"]);
    }

    #[test]
    fn test_load_malformed_file_is_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nocturn.toml");
        std::fs::write(&path, "stations = not-toml").unwrap();

        assert!(TomlConfig::load(&path).is_err());
        assert!(load_or_default(&path).is_err());
    }

    #[test]
    fn test_load_missing_file_falls_back_to_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = load_or_default(&dir.path().join("absent.toml")).unwrap();
        assert!(config.stations.is_empty());
        assert!(config.dst_intervals.is_empty());
    }
}
