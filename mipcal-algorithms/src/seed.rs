//! Seed selection.
//!
//! A seed is the first MIP cluster of a chosen layer whose key has not been
//! banned by an earlier failed attempt. Layers with nothing left to offer are
//! dropped from the search so the loop always terminates.

use std::collections::BTreeSet;

use log::trace;
use mipcal_core::{HitKey, MipCluster, SeedPolicy};

use crate::{HitIndex, MipClusterBuilder};

/// Per-section search state shared by the seed, cone, and extension stages.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SeedState {
    /// Layers still eligible for seeding and scanning.
    pub layer_check: BTreeSet<u32>,
    /// Seed keys that already failed.
    pub bad_seeds: BTreeSet<HitKey>,
    /// Layer to try before falling back to the policy.
    pub cursor: Option<u32>,
}

impl SeedState {
    /// State covering layers `1..=num_layers`, starting at `first_seed_layer`.
    #[must_use]
    pub fn new(num_layers: u32, first_seed_layer: u32) -> Self {
        Self {
            layer_check: (1..=num_layers).collect(),
            bad_seeds: BTreeSet::new(),
            cursor: Some(first_seed_layer),
        }
    }

    /// Bans a seed key for the rest of the section.
    pub fn ban(&mut self, key: HitKey) {
        self.bad_seeds.insert(key);
    }

    /// Returns true if `key` failed before.
    #[must_use]
    pub fn is_banned(&self, key: HitKey) -> bool {
        self.bad_seeds.contains(&key)
    }

    /// Clears the cursor so the next search starts from the policy pick.
    pub fn reset_cursor(&mut self) {
        self.cursor = None;
    }
}

/// A seed cluster and its principal key.
#[derive(Debug, Clone, PartialEq)]
pub struct Seed {
    /// Seed cluster.
    pub cluster: MipCluster,
    /// Key of the cluster's lowest strip.
    pub key: HitKey,
}

impl Seed {
    /// Seed layer.
    #[must_use]
    pub fn layer(&self) -> u32 {
        self.cluster.layer
    }

    /// Seed strip used as the cone apex.
    #[must_use]
    pub fn strip(&self) -> u32 {
        self.cluster.low_strip
    }
}

/// Outcome of one seed search.
#[derive(Debug, Clone, PartialEq)]
pub struct SeedSearch {
    /// Seed found, or `None` once every layer is exhausted.
    pub seed: Option<Seed>,
    /// Layers removed during this search.
    pub layers_exhausted: usize,
}

/// Picks seed clusters layer by layer.
#[derive(Debug, Clone, Copy)]
pub struct SeedFinder {
    policy: SeedPolicy,
    builder: MipClusterBuilder,
}

impl SeedFinder {
    /// Creates a seed finder.
    #[must_use]
    pub fn new(policy: SeedPolicy, builder: MipClusterBuilder) -> Self {
        Self { policy, builder }
    }

    /// Layer choice policy.
    #[must_use]
    pub fn policy(&self) -> SeedPolicy {
        self.policy
    }

    /// Finds the next seed.
    ///
    /// Every pass either returns a seed or removes one layer from
    /// `state.layer_check`, so at most `|layer_check|` layers are scanned.
    pub fn find(&self, index: &HitIndex<'_>, state: &mut SeedState) -> SeedSearch {
        let scheme = index.scheme();
        let mut layers_exhausted = 0;

        loop {
            let layer = match state.cursor.filter(|layer| state.layer_check.contains(layer)) {
                Some(layer) => layer,
                None => match self.pick_layer(&state.layer_check) {
                    Some(layer) => layer,
                    None => {
                        return SeedSearch {
                            seed: None,
                            layers_exhausted,
                        }
                    }
                },
            };

            let candidate = self
                .builder
                .build_layer(index, layer)
                .into_iter()
                .map(|cluster| {
                    let key = cluster.key(scheme);
                    Seed { cluster, key }
                })
                .find(|seed| !state.is_banned(seed.key));

            if let Some(seed) = candidate {
                trace!("{} seed at layer {layer}, key {}", index.section(), seed.key);
                state.cursor = Some(layer);
                return SeedSearch {
                    seed: Some(seed),
                    layers_exhausted,
                };
            }

            trace!("{} layer {layer} has no usable seed", index.section());
            state.layer_check.remove(&layer);
            state.cursor = None;
            layers_exhausted += 1;
        }
    }

    fn pick_layer(&self, layers: &BTreeSet<u32>) -> Option<u32> {
        match self.policy {
            SeedPolicy::Lowest => layers.first().copied(),
            SeedPolicy::Median => layers.iter().nth(layers.len().checked_sub(1)? / 2).copied(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mipcal_core::{HitArena, HitRecord, KeyScheme, Section};

    fn arena(hits: &[(u32, u32)]) -> HitArena {
        hits.iter()
            .map(|&(layer, strip)| HitRecord::new(Section::Back, layer, strip, 1.0, 10.0))
            .collect()
    }

    fn index_of(arena: &HitArena) -> HitIndex<'_> {
        let mut index = HitIndex::new(arena, Section::Back, KeyScheme::new(100, 34).unwrap());
        for (id, _) in arena.iter() {
            index.insert(id);
        }
        index
    }

    fn finder(policy: SeedPolicy) -> SeedFinder {
        SeedFinder::new(policy, MipClusterBuilder::new(100.0))
    }

    #[test]
    fn test_first_cluster_of_first_layer() {
        let arena = arena(&[(1, 9), (1, 3), (2, 1)]);
        let index = index_of(&arena);
        let mut state = SeedState::new(5, 1);

        let search = finder(SeedPolicy::Lowest).find(&index, &mut state);
        let seed = search.seed.unwrap();
        assert_eq!(seed.key, HitKey(103));
        assert_eq!(seed.strip(), 3);
        assert_eq!(search.layers_exhausted, 0);
        assert_eq!(state.cursor, Some(1));
    }

    #[test]
    fn test_banned_seed_moves_on() {
        let arena = arena(&[(1, 3), (1, 9), (4, 2)]);
        let index = index_of(&arena);
        let mut state = SeedState::new(5, 1);
        let finder = finder(SeedPolicy::Lowest);

        state.ban(HitKey(103));
        assert_eq!(finder.find(&index, &mut state).seed.unwrap().key, HitKey(109));

        state.ban(HitKey(109));
        let search = finder.find(&index, &mut state);
        assert_eq!(search.seed.unwrap().key, HitKey(402));
        // layers 1, 2 and 3 were dropped on the way
        assert_eq!(search.layers_exhausted, 3);
        assert!(!state.layer_check.contains(&1));
        assert!(state.layer_check.contains(&4));
    }

    #[test]
    fn test_terminates_when_nothing_left() {
        let arena = arena(&[(2, 3), (2, 4), (2, 5)]);
        let index = index_of(&arena);
        let mut state = SeedState::new(6, 1);

        let search = finder(SeedPolicy::Lowest).find(&index, &mut state);
        assert!(search.seed.is_none());
        assert_eq!(search.layers_exhausted, 6);
        assert!(state.layer_check.is_empty());
    }

    #[test]
    fn test_median_policy() {
        let arena = arena(&[(1, 1), (2, 1), (3, 1), (4, 1)]);
        let index = index_of(&arena);
        let finder = finder(SeedPolicy::Median);

        let mut state = SeedState::new(4, 1);
        state.cursor = None;
        // lower median of {1, 2, 3, 4}
        assert_eq!(finder.find(&index, &mut state).seed.unwrap().layer(), 2);

        state.layer_check.remove(&2);
        state.cursor = None;
        assert_eq!(finder.find(&index, &mut state).seed.unwrap().layer(), 3);
    }

    #[test]
    fn test_cursor_outside_layers_falls_back() {
        let arena = arena(&[(2, 7)]);
        let index = index_of(&arena);
        let mut state = SeedState::new(3, 9);

        let search = finder(SeedPolicy::Lowest).find(&index, &mut state);
        assert_eq!(search.seed.unwrap().layer(), 2);
        assert_eq!(search.layers_exhausted, 1);

        state.reset_cursor();
        assert_eq!(state.cursor, None);
    }

    #[test]
    fn test_reset_cursor_defers_to_policy() {
        let arena = arena(&[(1, 1), (3, 1), (5, 1), (6, 1), (7, 1)]);
        let index = index_of(&arena);
        let mut state = SeedState::new(7, 6);

        let lowest = finder(SeedPolicy::Lowest);
        assert_eq!(lowest.find(&index, &mut state).seed.unwrap().layer(), 6);
        state.reset_cursor();
        assert_eq!(lowest.find(&index, &mut state).seed.unwrap().layer(), 1);

        let mut state = SeedState::new(7, 6);
        let median = finder(SeedPolicy::Median);
        assert_eq!(median.find(&index, &mut state).seed.unwrap().layer(), 6);
        state.reset_cursor();
        // layer 4 is the median but empty; the median of the rest is layer 3
        let search = median.find(&index, &mut state);
        assert_eq!(search.seed.unwrap().layer(), 3);
        assert_eq!(search.layers_exhausted, 1);
    }
}
