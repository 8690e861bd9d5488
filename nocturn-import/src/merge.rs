//! Merge of parsed clips into the destination store
//!
//! The central rule: a (station, detector, time) key is unique in the store.
//! A second clip with the same key is a duplicate observation of the same
//! physical clip: its classification may refine the stored one (strict
//! dot-specialization, or the stored class was unset) but may never replace
//! it with anything else. Conflicting reclassifications are logged and leave
//! the stored data untouched.

use crate::decode::AudioDecoder;
use crate::store::ClipStore;
use crate::types::{is_specialization, ClipDescriptor};
use crate::walk::Visitor;
use serde::Serialize;
use tracing::{debug, info, warn};

/// Merge outcome counters, reported at the end of a run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct MergeCounters {
    /// New clips added to the store
    pub merged: u64,
    /// Clips whose key already existed
    pub duplicates: u64,
    /// Clips whose audio failed to decode
    pub bad_files: u64,
    /// Clips the store refused to add or update
    pub add_errors: u64,
    /// Duplicate clips whose classification conflicted with the stored one
    pub conflicts: u64,
}

/// Visitor that commits clips into a destination store.
pub struct MergeVisitor<S: ClipStore, D: AudioDecoder> {
    store: S,
    decoder: D,
    counters: MergeCounters,
}

impl<S: ClipStore, D: AudioDecoder> MergeVisitor<S, D> {
    pub fn new(store: S, decoder: D) -> Self {
        Self {
            store,
            decoder,
            counters: MergeCounters::default(),
        }
    }

    pub fn counters(&self) -> MergeCounters {
        self.counters
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Give the store back once the walk is finished.
    pub fn into_store(self) -> S {
        self.store
    }

    fn merge_new(&mut self, clip: &ClipDescriptor) {
        let audio = match self.decoder.read(&clip.path) {
            Ok(audio) => audio,
            Err(e) => {
                self.counters.bad_files += 1;
                warn!("cannot decode {}: {}", clip.path.display(), e);
                return;
            }
        };
        match self.store.add_clip(clip, &audio.samples, audio.sample_rate) {
            Ok(id) => {
                self.counters.merged += 1;
                debug!(
                    clip = %id,
                    station = %clip.station,
                    detector = %clip.detector,
                    "added clip"
                );
            }
            Err(e) => {
                self.counters.add_errors += 1;
                warn!("store rejected {}: {}", clip.path.display(), e);
            }
        }
    }

    fn merge_duplicate(&mut self, clip: &ClipDescriptor, existing: crate::store::StoredClip) {
        self.counters.duplicates += 1;
        let old = existing.clip_class.as_deref();
        let new = clip.clip_class.as_deref();

        let refine = match (old, new) {
            (old, new) if old == new => None,
            (None, Some(_)) => Some(clip.clip_class.clone()),
            (Some(old), Some(new)) if is_specialization(old, new) => {
                Some(clip.clip_class.clone())
            }
            _ => {
                self.counters.conflicts += 1;
                warn!(
                    "reclassification conflict for {}: stored {:?}, incoming {:?} \
                     (keeping stored)",
                    clip.path.display(),
                    old,
                    new
                );
                None
            }
        };

        if let Some(class) = refine {
            if let Err(e) = self.store.set_classification(existing.id, class) {
                self.counters.add_errors += 1;
                warn!("cannot reclassify {}: {}", clip.path.display(), e);
            }
        }
    }
}

impl<S: ClipStore, D: AudioDecoder> Visitor for MergeVisitor<S, D> {
    fn visit_clip(&mut self, clip: &ClipDescriptor) {
        match self.store.find_clip(&clip.station, &clip.detector, clip.time) {
            Ok(None) => self.merge_new(clip),
            Ok(Some(existing)) => self.merge_duplicate(clip, existing),
            Err(e) => {
                self.counters.add_errors += 1;
                warn!("store lookup failed for {}: {}", clip.path.display(), e);
            }
        }
    }

    fn end_visits(&mut self) {
        if let Err(e) = self.store.flush() {
            warn!("store flush failed: {}", e);
        }
        let c = self.counters;
        info!(
            merged = c.merged,
            duplicates = c.duplicates,
            bad_files = c.bad_files,
            add_errors = c.add_errors,
            conflicts = c.conflicts,
            "merge complete"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::decode::ClipAudio;
    use crate::store::MemoryStore;
    use chrono::NaiveDate;
    use nocturn_common::time::utc_from_naive;
    use std::path::{Path, PathBuf};

    /// Decoder stub: succeeds unless the file name contains "corrupt".
    struct FakeDecoder;

    impl AudioDecoder for FakeDecoder {
        fn read(&self, path: &Path) -> anyhow::Result<ClipAudio> {
            if path.to_string_lossy().contains("corrupt") {
                anyhow::bail!("corrupt file")
            }
            Ok(ClipAudio {
                samples: vec![0.0; 4],
                sample_rate: 22050,
            })
        }
    }

    fn clip(class: Option<&str>) -> ClipDescriptor {
        ClipDescriptor {
            station: "Ridge".to_string(),
            detector: "Tseep".to_string(),
            time: utc_from_naive(
                NaiveDate::from_ymd_opt(2012, 9, 15)
                    .unwrap()
                    .and_hms_opt(22, 0, 0)
                    .unwrap(),
            ),
            clip_class: class.map(str::to_string),
            path: PathBuf::from("Tseep_2012-09-15_22.00.00_00.wav"),
        }
    }

    #[test]
    fn test_new_clip_added() {
        let mut visitor = MergeVisitor::new(MemoryStore::new(), FakeDecoder);
        visitor.visit_clip(&clip(Some("Call")));
        assert_eq!(visitor.counters().merged, 1);
        assert_eq!(visitor.store().len(), 1);
    }

    #[test]
    fn test_duplicate_specialization_refines_class() {
        let mut visitor = MergeVisitor::new(MemoryStore::new(), FakeDecoder);
        visitor.visit_clip(&clip(Some("Call")));
        visitor.visit_clip(&clip(Some("Call.WIWA")));

        let c = visitor.counters();
        assert_eq!(c.merged, 1);
        assert_eq!(c.duplicates, 1);
        assert_eq!(c.conflicts, 0);

        let store = visitor.into_store();
        let stored = store
            .find_clip("Ridge", "Tseep", clip(None).time)
            .unwrap()
            .unwrap();
        assert_eq!(stored.clip_class.as_deref(), Some("Call.WIWA"));
    }

    #[test]
    fn test_duplicate_unset_class_takes_incoming() {
        let mut visitor = MergeVisitor::new(MemoryStore::new(), FakeDecoder);
        visitor.visit_clip(&clip(None));
        visitor.visit_clip(&clip(Some("Noise")));

        let store = visitor.into_store();
        let stored = store
            .find_clip("Ridge", "Tseep", clip(None).time)
            .unwrap()
            .unwrap();
        assert_eq!(stored.clip_class.as_deref(), Some("Noise"));
    }

    #[test]
    fn test_duplicate_conflict_keeps_stored_class() {
        let mut visitor = MergeVisitor::new(MemoryStore::new(), FakeDecoder);
        visitor.visit_clip(&clip(Some("Call")));
        visitor.visit_clip(&clip(Some("Noise")));

        let c = visitor.counters();
        assert_eq!(c.duplicates, 1);
        assert_eq!(c.conflicts, 1);

        let store = visitor.into_store();
        let stored = store
            .find_clip("Ridge", "Tseep", clip(None).time)
            .unwrap()
            .unwrap();
        assert_eq!(stored.clip_class.as_deref(), Some("Call"));
    }

    #[test]
    fn test_duplicate_generalization_is_conflict() {
        let mut visitor = MergeVisitor::new(MemoryStore::new(), FakeDecoder);
        visitor.visit_clip(&clip(Some("Call.WIWA")));
        visitor.visit_clip(&clip(Some("Call")));

        assert_eq!(visitor.counters().conflicts, 1);
        let store = visitor.into_store();
        let stored = store
            .find_clip("Ridge", "Tseep", clip(None).time)
            .unwrap()
            .unwrap();
        assert_eq!(stored.clip_class.as_deref(), Some("Call.WIWA"));
    }

    #[test]
    fn test_duplicate_same_class_is_not_conflict() {
        let mut visitor = MergeVisitor::new(MemoryStore::new(), FakeDecoder);
        visitor.visit_clip(&clip(Some("Call")));
        visitor.visit_clip(&clip(Some("Call")));

        let c = visitor.counters();
        assert_eq!(c.duplicates, 1);
        assert_eq!(c.conflicts, 0);
    }

    #[test]
    fn test_bad_file_counted_and_skipped() {
        let mut visitor = MergeVisitor::new(MemoryStore::new(), FakeDecoder);
        let mut bad = clip(None);
        bad.path = PathBuf::from("corrupt.wav");
        visitor.visit_clip(&bad);

        let c = visitor.counters();
        assert_eq!(c.bad_files, 1);
        assert_eq!(c.merged, 0);
        assert!(visitor.store().is_empty());
    }
}
