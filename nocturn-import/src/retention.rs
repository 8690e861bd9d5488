//! Quota-based retention planning
//!
//! Computes, for a collection of per-group clip counts, how many clips each
//! group may retain so the archive shrinks to a target total while spreading
//! the reduction as evenly as possible across groups (max-min fairness).

use std::collections::BTreeMap;

/// Plan retained counts per group.
///
/// When the counts already fit the target, the plan is the counts unchanged.
/// Otherwise every group is capped to `L` or `L + 1`, where `L` is the
/// largest cap whose capped total stays within the target and the remainder
/// goes to the first capped groups in ascending key order. The result sums to
/// exactly `min(desired_total, Σ counts)`, never raises a group above its
/// original count, and retained counts among capped groups differ by at most
/// one.
pub fn plan<K: Ord + Clone>(counts: &BTreeMap<K, u64>, desired_total: u64) -> BTreeMap<K, u64> {
    let total: u64 = counts.values().sum();
    if total <= desired_total {
        return counts.clone();
    }

    // Binary search the largest cap L with capped_total(L) <= desired_total.
    // capped_total is nondecreasing in L; L = 0 always fits and the full
    // maximum never does (total > desired_total here).
    let max_count = counts.values().copied().max().unwrap_or(0);
    let mut lo = 0u64;
    let mut hi = max_count;
    while hi - lo > 1 {
        let mid = lo + (hi - lo) / 2;
        if capped_total(counts, mid) <= desired_total {
            lo = mid;
        } else {
            hi = mid;
        }
    }
    let cap = lo;
    let base = capped_total(counts, cap);
    let mut remainder = desired_total - base;

    let mut plan = BTreeMap::new();
    for (key, &count) in counts {
        let retained = if count <= cap {
            count
        } else if remainder > 0 {
            remainder -= 1;
            cap + 1
        } else {
            cap
        };
        plan.insert(key.clone(), retained);
    }
    plan
}

fn capped_total<K>(counts: &BTreeMap<K, u64>, cap: u64) -> u64 {
    counts.values().map(|&count| count.min(cap)).sum()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn counts(pairs: &[(&str, u64)]) -> BTreeMap<String, u64> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), *v))
            .collect()
    }

    fn assert_plan_properties(counts_map: &BTreeMap<String, u64>, desired: u64) {
        let plan = plan(counts_map, desired);
        let total: u64 = counts_map.values().sum();

        assert_eq!(plan.len(), counts_map.len());
        assert_eq!(
            plan.values().sum::<u64>(),
            total.min(desired),
            "plan for {:?} at {} must sum to min(desired, total)",
            counts_map,
            desired
        );
        for (key, retained) in &plan {
            assert!(
                *retained <= counts_map[key],
                "group {} raised above its original count",
                key
            );
        }
        // Reduced groups differ by at most one.
        let reduced: Vec<u64> = plan
            .iter()
            .filter(|(k, v)| **v < counts_map[*k])
            .map(|(_, v)| *v)
            .collect();
        if let (Some(min), Some(max)) = (reduced.iter().min(), reduced.iter().max()) {
            assert!(max - min <= 1, "uneven reduction in {:?}", plan);
        }
    }

    #[test]
    fn test_no_pruning_when_counts_fit() {
        let c = counts(&[("A", 5), ("B", 3)]);
        assert_eq!(plan(&c, 8), c);
        assert_eq!(plan(&c, 100), c);
    }

    #[test]
    fn test_even_reduction() {
        let c = counts(&[("A", 10), ("B", 10), ("C", 10)]);
        let p = plan(&c, 15);
        assert_eq!(p.values().sum::<u64>(), 15);
        assert_eq!(p["A"], 5);
        assert_eq!(p["B"], 5);
        assert_eq!(p["C"], 5);
    }

    #[test]
    fn test_small_groups_kept_whole() {
        let c = counts(&[("A", 2), ("B", 100), ("C", 50)]);
        let p = plan(&c, 60);
        assert_eq!(p["A"], 2);
        assert_eq!(p.values().sum::<u64>(), 60);
        // remaining 58 split evenly between the two large groups
        assert_eq!(p["B"].max(p["C"]) - p["B"].min(p["C"]), 0);
    }

    #[test]
    fn test_remainder_goes_to_ascending_keys() {
        let c = counts(&[("A", 10), ("B", 10), ("C", 10)]);
        let p = plan(&c, 16);
        // cap 5, remainder 1 goes to the first capped group
        assert_eq!(p["A"], 6);
        assert_eq!(p["B"], 5);
        assert_eq!(p["C"], 5);
    }

    #[test]
    fn test_target_zero() {
        let c = counts(&[("A", 4), ("B", 1)]);
        let p = plan(&c, 0);
        assert_eq!(p.values().sum::<u64>(), 0);
    }

    #[test]
    fn test_target_smaller_than_group_count() {
        let c = counts(&[("A", 5), ("B", 7), ("C", 9), ("D", 2)]);
        let p = plan(&c, 3);
        assert_eq!(p.values().sum::<u64>(), 3);
        assert!(p.values().all(|&v| v <= 1));
    }

    #[test]
    fn test_empty_counts() {
        let c: BTreeMap<String, u64> = BTreeMap::new();
        assert!(plan(&c, 10).is_empty());
    }

    #[test]
    fn test_zero_count_groups_survive() {
        let c = counts(&[("A", 0), ("B", 6)]);
        let p = plan(&c, 4);
        assert_eq!(p["A"], 0);
        assert_eq!(p["B"], 4);
    }

    #[test]
    fn test_properties_over_small_grid() {
        // Exhaustive sweep of three-group count maps and targets.
        for a in 0..5u64 {
            for b in 0..5u64 {
                for c in 0..5u64 {
                    let m = counts(&[("A", a), ("B", b), ("C", c)]);
                    for desired in 0..=(a + b + c + 2) {
                        assert_plan_properties(&m, desired);
                    }
                }
            }
        }
    }
}
