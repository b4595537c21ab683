//! Per-event and per-run search bookkeeping.

use std::collections::BTreeMap;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Counters collected while searching one event.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct EventStatistics {
    /// Hits indexed for the search.
    pub hits_loaded: usize,
    /// Hits dropped at or below the photo-electron threshold.
    pub noise_hits: usize,
    /// Hits dropped for a layer or strip outside the geometry.
    pub out_of_range_hits: usize,
    /// Hits displaced by a later hit with the same key.
    pub overwritten_hits: usize,
    /// Seeds handed to the cone search.
    pub seeds_tried: usize,
    /// Layers removed from the seed search as exhausted.
    pub layers_exhausted: usize,
    /// Seeds banned because the cone found too few hits.
    pub cone_failures: usize,
    /// Seeds banned because the extended track was rejected.
    pub acceptance_failures: usize,
    /// Extension windows that held more than one MIP cluster.
    pub ambiguous_matches: usize,
    /// Accepted tracks.
    pub tracks_found: usize,
    /// Hits removed from the index by accepted tracks.
    pub hits_claimed: usize,
    /// Attempts to remove a hit that was no longer indexed.
    pub erase_violations: usize,
}

impl EventStatistics {
    /// Adds another event's counters to this one.
    pub fn merge(&mut self, other: &EventStatistics) {
        self.hits_loaded += other.hits_loaded;
        self.noise_hits += other.noise_hits;
        self.out_of_range_hits += other.out_of_range_hits;
        self.overwritten_hits += other.overwritten_hits;
        self.seeds_tried += other.seeds_tried;
        self.layers_exhausted += other.layers_exhausted;
        self.cone_failures += other.cone_failures;
        self.acceptance_failures += other.acceptance_failures;
        self.ambiguous_matches += other.ambiguous_matches;
        self.tracks_found += other.tracks_found;
        self.hits_claimed += other.hits_claimed;
        self.erase_violations += other.erase_violations;
    }
}

/// Aggregate over many events, owned by the caller.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct RunStatistics {
    /// Events absorbed.
    pub events: usize,
    /// Summed event counters.
    pub totals: EventStatistics,
    /// Number of events per reconstructed track multiplicity.
    pub tracks_per_event: BTreeMap<usize, usize>,
}

impl RunStatistics {
    /// Creates an empty aggregate.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Folds one event into the aggregate.
    pub fn absorb(&mut self, event: &EventStatistics) {
        self.events += 1;
        self.totals.merge(event);
        *self.tracks_per_event.entry(event.tracks_found).or_insert(0) += 1;
    }

    /// Combines two aggregates.
    pub fn merge(&mut self, other: &RunStatistics) {
        self.events += other.events;
        self.totals.merge(&other.totals);
        for (&tracks, &count) in &other.tracks_per_event {
            *self.tracks_per_event.entry(tracks).or_insert(0) += count;
        }
    }

    /// Mean number of tracks per event (0 for an empty run).
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn mean_tracks_per_event(&self) -> f64 {
        if self.events == 0 {
            0.0
        } else {
            self.totals.tracks_found as f64 / self.events as f64
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_absorb_builds_histogram() {
        let mut run = RunStatistics::new();
        run.absorb(&EventStatistics {
            tracks_found: 1,
            hits_claimed: 10,
            ..Default::default()
        });
        run.absorb(&EventStatistics::default());
        run.absorb(&EventStatistics {
            tracks_found: 1,
            hits_claimed: 12,
            ..Default::default()
        });

        assert_eq!(run.events, 3);
        assert_eq!(run.totals.tracks_found, 2);
        assert_eq!(run.totals.hits_claimed, 22);
        assert_eq!(run.tracks_per_event.get(&0), Some(&1));
        assert_eq!(run.tracks_per_event.get(&1), Some(&2));
        assert_relative_eq!(run.mean_tracks_per_event(), 2.0 / 3.0);
    }

    #[test]
    fn test_merge_runs() {
        let mut a = RunStatistics::new();
        a.absorb(&EventStatistics {
            tracks_found: 2,
            ..Default::default()
        });
        let mut b = RunStatistics::new();
        b.absorb(&EventStatistics {
            tracks_found: 2,
            cone_failures: 3,
            ..Default::default()
        });

        a.merge(&b);
        assert_eq!(a.events, 2);
        assert_eq!(a.totals.cone_failures, 3);
        assert_eq!(a.tracks_per_event.get(&2), Some(&2));
    }

    #[test]
    fn test_empty_run_mean() {
        assert_relative_eq!(RunStatistics::new().mean_tracks_per_event(), 0.0);
    }
}
