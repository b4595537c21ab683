//! Angular window search around a seed.
//!
//! Layers within `cone_depth` of the seed are scanned in a strip window that
//! widens linearly with the layer distance, reaching `cone_angle / 2` strips
//! on either side at the cone's far end.

use std::ops::RangeInclusive;

use log::debug;
use mipcal_core::Track;

use crate::{HitIndex, MipClusterBuilder, Seed, SeedState};

/// Partial track collected inside the cone.
#[derive(Debug, Clone, PartialEq)]
pub struct Cone {
    /// Track holding every cluster found in the cone.
    pub track: Track,
    /// Layers the cone covered; the extender skips them.
    pub span: RangeInclusive<u32>,
    min_hits: usize,
}

impl Cone {
    /// Returns true if the cone collected at least the minimum hit count.
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.track.len() >= self.min_hits
    }

    /// Returns true if `layer` lies inside the cone.
    #[must_use]
    pub fn covers(&self, layer: u32) -> bool {
        self.span.contains(&layer)
    }
}

/// Cone search parameters.
#[derive(Debug, Clone, Copy)]
pub struct ConeSearch {
    depth: u32,
    angle: f64,
    min_hits: usize,
    builder: MipClusterBuilder,
}

impl ConeSearch {
    /// Creates a cone search. `depth` must be at least 1.
    #[must_use]
    pub fn new(depth: u32, angle: f64, min_hits: usize, builder: MipClusterBuilder) -> Self {
        Self {
            depth,
            angle,
            min_hits,
            builder,
        }
    }

    /// Layers on either side of the seed.
    #[must_use]
    pub fn depth(&self) -> u32 {
        self.depth
    }

    /// Strip half-width of the window `distance` layers away from the seed.
    #[must_use]
    pub fn half_width(&self, distance: u32) -> f64 {
        self.angle * f64::from(distance) / (2.0 * f64::from(self.depth))
    }

    /// Collects every MIP cluster in the cone of `seed`.
    ///
    /// Only layers still in `state.layer_check` are scanned. The seed layer
    /// itself has a zero-width window, so the seed cluster is always part of
    /// the result.
    #[allow(clippy::cast_possible_truncation)]
    pub fn search(&self, index: &HitIndex<'_>, state: &SeedState, seed: &Seed) -> Cone {
        let seed_layer = seed.layer();
        let seed_strip = f64::from(seed.strip());
        let span = seed_layer.saturating_sub(self.depth)..=seed_layer.saturating_add(self.depth);

        let mut track = Track::new(index.section(), seed.key, seed_layer, seed.strip());
        for layer in state.layer_check.range(span.clone()) {
            let h = self.half_width(layer.abs_diff(seed_layer));
            let low = (seed_strip - h).floor() as i64;
            let up = (seed_strip + h).ceil() as i64;
            for cluster in self.builder.build(index, *layer, low, up) {
                track.push_cluster(&cluster);
            }
        }

        if track.len() < self.min_hits {
            debug!(
                "{} cone at seed {} holds {} hits, {} required",
                index.section(),
                seed.key,
                track.len(),
                self.min_hits
            );
        }

        Cone {
            track,
            span,
            min_hits: self.min_hits,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use mipcal_core::{HitArena, HitKey, HitRecord, KeyScheme, Section, SeedPolicy};

    use crate::SeedFinder;

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

    fn seed_of(index: &HitIndex<'_>, state: &mut SeedState) -> Seed {
        SeedFinder::new(SeedPolicy::Lowest, MipClusterBuilder::new(100.0))
            .find(index, state)
            .seed
            .unwrap()
    }

    #[test]
    fn test_half_width_grows_linearly() {
        let cone = ConeSearch::new(3, 3.0, 3, MipClusterBuilder::new(100.0));
        assert_relative_eq!(cone.half_width(0), 0.0);
        assert_relative_eq!(cone.half_width(1), 0.5);
        assert_relative_eq!(cone.half_width(3), 1.5);
    }

    #[test]
    fn test_collects_hits_inside_window() {
        // seed at layer 4 strip 10; layer 7 is 3 away with half-width 1.5
        let arena = arena(&[(4, 10), (5, 11), (6, 9), (7, 12), (7, 20), (8, 10)]);
        let index = index_of(&arena);
        let mut state = SeedState::new(10, 4);
        let seed = seed_of(&index, &mut state);
        assert_eq!(seed.key, HitKey(410));

        let cone = ConeSearch::new(3, 3.0, 3, MipClusterBuilder::new(100.0)).search(&index, &state, &seed);

        assert_eq!(cone.span, 1..=7);
        let layers: Vec<u32> = cone.track.records(&arena).map(|hit| hit.layer).collect();
        assert_eq!(layers, vec![4, 5, 6, 7]);
        assert!(cone.is_complete());
        assert!(cone.covers(1));
        assert!(!cone.covers(8));
    }

    #[test]
    fn test_incomplete_cone() {
        let arena = arena(&[(2, 10), (3, 15)]);
        let index = index_of(&arena);
        let mut state = SeedState::new(10, 2);
        let seed = seed_of(&index, &mut state);

        let cone = ConeSearch::new(3, 3.0, 3, MipClusterBuilder::new(100.0)).search(&index, &state, &seed);
        assert_eq!(cone.track.len(), 1);
        assert!(!cone.is_complete());
        assert_eq!(cone.span, 0..=5);
    }

    #[test]
    fn test_skips_layers_out_of_check() {
        let arena = arena(&[(2, 10), (3, 10), (4, 10)]);
        let index = index_of(&arena);
        let mut state = SeedState::new(10, 2);
        let seed = seed_of(&index, &mut state);
        state.layer_check.remove(&3);

        let cone = ConeSearch::new(3, 3.0, 2, MipClusterBuilder::new(100.0)).search(&index, &state, &seed);
        let layers: Vec<u32> = cone.track.records(&arena).map(|hit| hit.layer).collect();
        assert_eq!(layers, vec![2, 4]);
    }
}
