//! Apply a retention plan against the destination store
//!
//! Planning is pure; this module turns a plan into one all-or-nothing
//! deletion batch. Within a group the oldest clips are retained, so repeated
//! prunes over an unchanged archive delete nothing new.

use crate::retention;
use crate::store::{ClipStore, CountFilter, CountKey, StoreError};
use std::collections::BTreeMap;
use tracing::{debug, info};

/// What a prune pass decided and did.
#[derive(Debug, Clone)]
pub struct PruneOutcome {
    /// Per-group retained counts
    pub plan: BTreeMap<CountKey, u64>,
    /// Clips deleted from the store
    pub deleted: u64,
}

/// Shrink the clips matching `clip_class` (and its specializations) to at
/// most `desired_total`, spread fairly across (station, night) groups.
///
/// The deletion batch is committed atomically: either every planned deletion
/// succeeds, or the store is left untouched.
pub fn prune_to_total<S: ClipStore>(
    store: &mut S,
    clip_class: Option<&str>,
    desired_total: u64,
) -> Result<PruneOutcome, StoreError> {
    let filter = CountFilter {
        clip_class: clip_class.map(str::to_string),
        ..Default::default()
    };
    let counts = store.clip_counts(&filter)?;
    let plan = retention::plan(&counts, desired_total);

    let mut victims = Vec::new();
    for (key, &retained) in &plan {
        let count = counts[key];
        if retained >= count {
            continue;
        }
        // clips_in_group returns oldest first; keep the first `retained`.
        let clips = store.clips_in_group(key, clip_class)?;
        victims.extend(
            clips
                .into_iter()
                .skip(retained as usize)
                .map(|(id, _)| id),
        );
        debug!(
            station = %key.station,
            night = %key.night,
            kept = retained,
            dropped = count - retained,
            "planned group reduction"
        );
    }

    store.delete_clips(&victims)?;
    let deleted = victims.len() as u64;
    info!(deleted = deleted, target = desired_total, "prune complete");

    Ok(PruneOutcome { plan, deleted })
}
