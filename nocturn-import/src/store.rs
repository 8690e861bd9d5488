//! Destination clip store interface
//!
//! The persistent storage engine and its SQL schema are external
//! collaborators; the pipeline sees only this trait. `MemoryStore` is the
//! in-process implementation used by tests and the CLI's validation passes.

use crate::types::{is_specialization, ClipDescriptor};
use chrono::{DateTime, NaiveDate, Utc};
use nocturn_common::time::night_of;
use std::collections::{BTreeMap, HashMap};
use std::io::Write;
use thiserror::Error;
use uuid::Uuid;

/// Store operation failure. Recoverable at clip granularity during a merge
/// (the clip is skipped and counted); fatal only when opening the store.
#[derive(Debug, Error)]
pub enum StoreError {
    /// A clip with the same (station, detector, time) key already exists
    #[error("duplicate clip key: {station}/{detector}/{time}")]
    DuplicateKey {
        station: String,
        detector: String,
        time: DateTime<Utc>,
    },

    /// No clip with the given id
    #[error("clip not found: {0}")]
    NotFound(ClipId),

    /// Backend failure
    #[error("store error: {0}")]
    Backend(String),

    /// I/O failure
    #[error("store IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Opaque clip identity within a store
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ClipId(Uuid);

impl ClipId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for ClipId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for ClipId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

/// Existing store entry as seen by the merge rule
#[derive(Debug, Clone)]
pub struct StoredClip {
    pub id: ClipId,
    pub clip_class: Option<String>,
}

/// Count group: one station-night
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct CountKey {
    pub station: String,
    pub night: NaiveDate,
}

/// Filter for count queries. `clip_class` matches the class itself and any
/// specialization of it.
#[derive(Debug, Clone, Default)]
pub struct CountFilter {
    pub station: Option<String>,
    pub detector: Option<String>,
    /// Inclusive night range
    pub night_range: Option<(NaiveDate, NaiveDate)>,
    pub clip_class: Option<String>,
}

impl CountFilter {
    fn matches(&self, station: &str, detector: &str, night: NaiveDate, class: Option<&str>) -> bool {
        if let Some(s) = &self.station {
            if s != station {
                return false;
            }
        }
        if let Some(d) = &self.detector {
            if d != detector {
                return false;
            }
        }
        if let Some((start, end)) = self.night_range {
            if night < start || night > end {
                return false;
            }
        }
        if let Some(want) = &self.clip_class {
            match class {
                Some(have) => {
                    if have != want && !is_specialization(want, have) {
                        return false;
                    }
                }
                None => return false,
            }
        }
        true
    }
}

/// Destination clip store, exclusively owned by the importing process for the
/// duration of a run.
pub trait ClipStore {
    /// Look up the entry holding a (station, detector, time) key.
    fn find_clip(
        &self,
        station: &str,
        detector: &str,
        time: DateTime<Utc>,
    ) -> Result<Option<StoredClip>, StoreError>;

    /// Add a new clip with its decoded samples. Fails on a duplicate key.
    fn add_clip(
        &mut self,
        descriptor: &ClipDescriptor,
        samples: &[f32],
        sample_rate: u32,
    ) -> Result<ClipId, StoreError>;

    /// Overwrite a clip's classification.
    fn set_classification(
        &mut self,
        id: ClipId,
        clip_class: Option<String>,
    ) -> Result<(), StoreError>;

    /// Clip counts per (station, night), narrowed by `filter`.
    fn clip_counts(&self, filter: &CountFilter) -> Result<BTreeMap<CountKey, u64>, StoreError>;

    /// Ids and times of the clips in one count group (same class filter
    /// semantics as [`ClipStore::clip_counts`]).
    fn clips_in_group(
        &self,
        key: &CountKey,
        clip_class: Option<&str>,
    ) -> Result<Vec<(ClipId, DateTime<Utc>)>, StoreError>;

    /// Delete a batch of clips, all-or-nothing: either every deletion
    /// succeeds and is committed, or the store is left untouched.
    fn delete_clips(&mut self, ids: &[ClipId]) -> Result<(), StoreError>;

    /// Flush pending writes.
    fn flush(&mut self) -> Result<(), StoreError>;
}

#[derive(Debug, Clone)]
struct MemClip {
    station: String,
    detector: String,
    time: DateTime<Utc>,
    clip_class: Option<String>,
    samples: Vec<f32>,
    sample_rate: u32,
}

/// In-memory clip store
#[derive(Debug, Default)]
pub struct MemoryStore {
    clips: HashMap<ClipId, MemClip>,
    by_key: HashMap<(String, String, DateTime<Utc>), ClipId>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.clips.len()
    }

    pub fn is_empty(&self) -> bool {
        self.clips.is_empty()
    }

    /// Stored classification for a clip, for assertions and reporting.
    pub fn classification(&self, id: ClipId) -> Option<Option<&str>> {
        self.clips.get(&id).map(|c| c.clip_class.as_deref())
    }

    /// Sample count and rate for a clip.
    pub fn audio(&self, id: ClipId) -> Option<(usize, u32)> {
        self.clips.get(&id).map(|c| (c.samples.len(), c.sample_rate))
    }
}

impl ClipStore for MemoryStore {
    fn find_clip(
        &self,
        station: &str,
        detector: &str,
        time: DateTime<Utc>,
    ) -> Result<Option<StoredClip>, StoreError> {
        let key = (station.to_string(), detector.to_string(), time);
        Ok(self.by_key.get(&key).and_then(|id| {
            self.clips.get(id).map(|clip| StoredClip {
                id: *id,
                clip_class: clip.clip_class.clone(),
            })
        }))
    }

    fn add_clip(
        &mut self,
        descriptor: &ClipDescriptor,
        samples: &[f32],
        sample_rate: u32,
    ) -> Result<ClipId, StoreError> {
        let key = descriptor.key();
        if self.by_key.contains_key(&key) {
            return Err(StoreError::DuplicateKey {
                station: descriptor.station.clone(),
                detector: descriptor.detector.clone(),
                time: descriptor.time,
            });
        }
        let id = ClipId::new();
        self.clips.insert(
            id,
            MemClip {
                station: descriptor.station.clone(),
                detector: descriptor.detector.clone(),
                time: descriptor.time,
                clip_class: descriptor.clip_class.clone(),
                samples: samples.to_vec(),
                sample_rate,
            },
        );
        self.by_key.insert(key, id);
        Ok(id)
    }

    fn set_classification(
        &mut self,
        id: ClipId,
        clip_class: Option<String>,
    ) -> Result<(), StoreError> {
        let clip = self.clips.get_mut(&id).ok_or(StoreError::NotFound(id))?;
        clip.clip_class = clip_class;
        Ok(())
    }

    fn clip_counts(&self, filter: &CountFilter) -> Result<BTreeMap<CountKey, u64>, StoreError> {
        let mut counts = BTreeMap::new();
        for clip in self.clips.values() {
            let night = night_of(clip.time.naive_utc());
            if filter.matches(&clip.station, &clip.detector, night, clip.clip_class.as_deref()) {
                let key = CountKey {
                    station: clip.station.clone(),
                    night,
                };
                *counts.entry(key).or_insert(0) += 1;
            }
        }
        Ok(counts)
    }

    fn clips_in_group(
        &self,
        key: &CountKey,
        clip_class: Option<&str>,
    ) -> Result<Vec<(ClipId, DateTime<Utc>)>, StoreError> {
        let filter = CountFilter {
            station: Some(key.station.clone()),
            clip_class: clip_class.map(str::to_string),
            ..Default::default()
        };
        let mut clips: Vec<(ClipId, DateTime<Utc>)> = self
            .clips
            .iter()
            .filter(|(_, clip)| {
                let night = night_of(clip.time.naive_utc());
                night == key.night
                    && filter.matches(&clip.station, &clip.detector, night, clip.clip_class.as_deref())
            })
            .map(|(id, clip)| (*id, clip.time))
            .collect();
        clips.sort_by_key(|(id, time)| (*time, *id));
        Ok(clips)
    }

    fn delete_clips(&mut self, ids: &[ClipId]) -> Result<(), StoreError> {
        // Validate the whole batch before touching anything, so a bad id
        // leaves the store unchanged.
        for id in ids {
            if !self.clips.contains_key(id) {
                return Err(StoreError::NotFound(*id));
            }
        }
        for id in ids {
            if let Some(clip) = self.clips.remove(id) {
                self.by_key.remove(&(clip.station, clip.detector, clip.time));
            }
        }
        Ok(())
    }

    fn flush(&mut self) -> Result<(), StoreError> {
        Ok(())
    }
}

/// Write per-group clip counts as CSV: a header of the group dimensions and a
/// count column, rows sorted by the group key tuple.
pub fn write_counts_csv<W: Write>(
    writer: &mut W,
    counts: &BTreeMap<CountKey, u64>,
) -> std::io::Result<()> {
    writeln!(writer, "station,night,count")?;
    for (key, count) in counts {
        writeln!(writer, "{},{},{}", key.station, key.night, count)?;
    }
    Ok(())
}
