// SPDX-License-Identifier: MPL-2.0

//! Proptest strategies for version sets.

use std::ops::Bound::{self, Excluded, Included, Unbounded};

use proptest::prelude::*;

use crate::Ranges;

/// A strategy producing arbitrary canonical sets of `u32` versions.
///
/// Sorted, distinct points are paired into intervals, each end randomly inclusive or
/// exclusive. The first interval may start at minus infinity and an unpaired last point
/// opens an interval up to infinity.
pub fn proptest_strategy() -> impl Strategy<Value = Ranges<u32>> {
    (
        any::<bool>(),
        prop::collection::vec((any::<u32>(), any::<bool>()), 0..10),
    )
        .prop_map(|(open_start, mut points)| {
            points.sort_unstable();
            points.dedup_by_key(|(v, _)| *v);
            let mut set = Ranges::<u32>::empty();
            let mut pending: Option<Bound<u32>> = open_start.then_some(Unbounded);
            for (v, inclusive) in points {
                let bound = if inclusive { Included(v) } else { Excluded(v) };
                match pending.take() {
                    None => pending = Some(bound),
                    Some(start) => {
                        set = set.union(&Ranges::from_range_bounds((start, bound)));
                    }
                }
            }
            if let Some(start) = pending {
                set = set.union(&Ranges::from_range_bounds((start, Unbounded)));
            }
            set.check_invariants()
        })
}
