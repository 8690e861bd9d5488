//! Core types shared across the import pipeline

use chrono::{DateTime, Duration, NaiveDateTime, Utc};
use std::fmt;
use std::path::PathBuf;

/// Directory levels of an archive tree, leaf last.
///
/// Replaces the historical runtime method-name dispatch with a fixed enum so
/// level handlers are resolved at compile time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LevelKind {
    Year,
    Station,
    Month,
    Day,
    ClipClass,
    Clip,
}

impl LevelKind {
    /// Levels for which a failed parse triggers a clip-file count of the
    /// skipped subtree, so operators know the blast radius of one bad
    /// directory name.
    pub fn is_countable(self) -> bool {
        matches!(self, LevelKind::Day | LevelKind::ClipClass)
    }
}

impl fmt::Display for LevelKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            LevelKind::Year => "year",
            LevelKind::Station => "station",
            LevelKind::Month => "month",
            LevelKind::Day => "day",
            LevelKind::ClipClass => "classification",
            LevelKind::Clip => "clip",
        };
        f.write_str(name)
    }
}

/// Clip time as encoded by the file name
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClipTime {
    /// Absolute station-local timestamp, 100 ms resolution
    Absolute(NaiveDateTime),
    /// Elapsed time since the night's monitoring start
    Relative(Duration),
}

/// A parsed clip ready for merging.
///
/// Identity key is (station, detector, time); a second descriptor with the
/// same key is a duplicate observation of the same physical clip, never a new
/// entity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClipDescriptor {
    pub station: String,
    pub detector: String,
    /// Absolute UTC instant of the clip start
    pub time: DateTime<Utc>,
    /// Hierarchical dot-separated classification, e.g. `Call.WIWA`;
    /// `None` means unclassified
    pub clip_class: Option<String>,
    /// Source audio file
    pub path: PathBuf,
}

impl ClipDescriptor {
    /// The unique identity key within a destination store.
    pub fn key(&self) -> (String, String, DateTime<Utc>) {
        (self.station.clone(), self.detector.clone(), self.time)
    }
}

/// True when `new` is a strict dot-separated specialization of `old`
/// (e.g. `Call.WIWA` specializes `Call`).
pub fn is_specialization(old: &str, new: &str) -> bool {
    new.len() > old.len() + 1 && new.starts_with(old) && new.as_bytes()[old.len()] == b'.'
}
