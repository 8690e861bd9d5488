//! Time resolution against per-station DST and monitoring-start tables
//!
//! Pure lookups over tables loaded once per run. Two jobs:
//! - decide whether an absolute local clock time is ambiguous because it falls
//!   in the repeated hour of a DST fall-back transition, and
//! - convert elapsed (relative) clip times into absolute timestamps using the
//!   night's monitoring start time.

use chrono::{Datelike, Duration, NaiveDate, NaiveDateTime, NaiveTime};
use nocturn_common::config::{DstIntervalEntry, MonitoringStartEntry, TomlConfig};
use nocturn_common::{Error, Result};
use std::collections::HashMap;
use thiserror::Error as ThisError;

/// Recoverable resolution failure; the clip is rejected, the walk continues.
#[derive(Debug, Clone, ThisError, PartialEq, Eq)]
pub enum ResolveError {
    /// The DST table knows nothing about this year.
    #[error("no DST interval table for year {0}")]
    UnsupportedYear(i32),
}

/// Daylight-saving interval for one station-year
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DstInterval {
    pub start: NaiveDateTime,
    pub end: NaiveDateTime,
}

/// DST intervals per (station, year).
///
/// Lookup precedence: explicit per-station interval for the year, then the
/// shared per-year default, then no interval. An explicit "not observed" entry
/// overrides the default and disables DST reasoning for that station-year.
#[derive(Debug, Clone, Default)]
pub struct DstTable {
    defaults: HashMap<i32, Option<DstInterval>>,
    by_station: HashMap<i32, HashMap<String, Option<DstInterval>>>,
}

impl DstTable {
    pub fn from_entries(entries: &[DstIntervalEntry]) -> Result<Self> {
        let mut table = Self::default();
        for entry in entries {
            let interval = if entry.observed {
                match (entry.start, entry.end) {
                    (Some(start), Some(end)) => Some(DstInterval { start, end }),
                    _ => {
                        return Err(Error::Config(format!(
                            "DST interval for year {} is missing start or end",
                            entry.year
                        )))
                    }
                }
            } else {
                None
            };

            match &entry.station {
                Some(station) => {
                    let year_map = table.by_station.entry(entry.year).or_default();
                    if year_map.insert(station.clone(), interval).is_some() {
                        return Err(Error::Config(format!(
                            "duplicate DST interval for station {} year {}",
                            station, entry.year
                        )));
                    }
                }
                None => {
                    if table.defaults.insert(entry.year, interval).is_some() {
                        return Err(Error::Config(format!(
                            "duplicate default DST interval for year {}",
                            entry.year
                        )));
                    }
                }
            }
        }
        Ok(table)
    }

    /// True when the table has no entries at all (DST reasoning unconfigured).
    pub fn is_empty(&self) -> bool {
        self.defaults.is_empty() && self.by_station.is_empty()
    }

    /// The interval applying to (station, year), or an error when the table
    /// does not cover the year at all.
    fn interval_for(&self, station: &str, year: i32) -> std::result::Result<Option<DstInterval>, ResolveError> {
        let stations = self.by_station.get(&year);
        let default = self.defaults.get(&year);
        if stations.is_none() && default.is_none() {
            return Err(ResolveError::UnsupportedYear(year));
        }
        if let Some(explicit) = stations.and_then(|m| m.get(station)) {
            return Ok(*explicit);
        }
        Ok(default.copied().flatten())
    }
}

/// Start time-of-day for one station-year: every date, or an explicit set.
#[derive(Debug, Clone)]
enum YearStartTimes {
    AllDates(NaiveTime),
    ByDate(HashMap<NaiveDate, NaiveTime>),
}

/// Monitoring start times per (station, year, date)
#[derive(Debug, Clone, Default)]
pub struct MonitoringStartTable {
    map: HashMap<i32, HashMap<String, YearStartTimes>>,
}

impl MonitoringStartTable {
    pub fn from_entries(entries: &[MonitoringStartEntry]) -> Result<Self> {
        let mut table = Self::default();
        for entry in entries {
            let mut dates: HashMap<NaiveDate, NaiveTime> = HashMap::new();
            for date in &entry.dates {
                if dates.insert(*date, entry.time).is_some() {
                    return Err(Error::Config(format!(
                        "duplicate monitoring start date {} for station {}",
                        date, entry.station
                    )));
                }
            }
            for range in &entry.ranges {
                if range.start > range.end {
                    return Err(Error::Config(format!(
                        "monitoring start date range for station {} year {} has start {} > end {}",
                        entry.station, entry.year, range.start, range.end
                    )));
                }
                let mut date = range.start;
                while date <= range.end {
                    if dates.insert(date, entry.time).is_some() {
                        return Err(Error::Config(format!(
                            "duplicate monitoring start date {} for station {}",
                            date, entry.station
                        )));
                    }
                    date = match date.succ_opt() {
                        Some(next) => next,
                        None => break,
                    };
                }
            }

            let times = if dates.is_empty() {
                // No dates listed: the time applies to every date of the year.
                YearStartTimes::AllDates(entry.time)
            } else {
                YearStartTimes::ByDate(dates)
            };

            let year_map = table.map.entry(entry.year).or_default();
            if year_map.insert(entry.station.clone(), times).is_some() {
                return Err(Error::Config(format!(
                    "duplicate monitoring start entry for station {} year {}",
                    entry.station, entry.year
                )));
            }
        }
        Ok(table)
    }

    fn start_time(&self, station: &str, date: NaiveDate) -> Option<NaiveTime> {
        match self.map.get(&date.year())?.get(station)? {
            YearStartTimes::AllDates(time) => Some(*time),
            YearStartTimes::ByDate(dates) => dates.get(&date).copied(),
        }
    }
}

/// Resolver over the preloaded tables
#[derive(Debug, Clone, Default)]
pub struct TimeResolver {
    dst: DstTable,
    starts: MonitoringStartTable,
}

impl TimeResolver {
    pub fn new(dst: DstTable, starts: MonitoringStartTable) -> Self {
        Self { dst, starts }
    }

    /// Build both tables from a validated configuration.
    pub fn from_config(config: &TomlConfig) -> Result<Self> {
        Ok(Self {
            dst: DstTable::from_entries(&config.dst_intervals)?,
            starts: MonitoringStartTable::from_entries(&config.monitoring_start_times)?,
        })
    }

    /// True when a DST-interval table was configured at all.
    pub fn has_dst_table(&self) -> bool {
        !self.dst.is_empty()
    }

    /// True iff `local` falls in the repeated hour `[dst_end - 1h, dst_end)`
    /// of the station's DST fall-back that year. Stations without a DST
    /// interval that year are never ambiguous; a year the table does not
    /// cover is an error.
    pub fn is_time_ambiguous(
        &self,
        local: NaiveDateTime,
        station: &str,
    ) -> std::result::Result<bool, ResolveError> {
        match self.dst.interval_for(station, local.year())? {
            Some(interval) => {
                Ok(local >= interval.end - Duration::hours(1) && local < interval.end)
            }
            None => Ok(false),
        }
    }

    /// The monitoring start instant for (station, date), when configured.
    pub fn monitoring_start_time(&self, station: &str, date: NaiveDate) -> Option<NaiveDateTime> {
        self.starts
            .start_time(station, date)
            .map(|time| date.and_time(time))
    }

    /// Convert an elapsed clip time to an absolute timestamp, or `None` when
    /// no monitoring start time is known for (station, date).
    pub fn resolve_elapsed_time(
        &self,
        station: &str,
        date: NaiveDate,
        elapsed: Duration,
    ) -> Option<NaiveDateTime> {
        self.monitoring_start_time(station, date)
            .map(|start| start + elapsed)
    }
}
