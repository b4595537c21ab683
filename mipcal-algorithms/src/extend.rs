//! Linear extrapolation of a cone track through the remaining layers.

use log::debug;
use mipcal_core::{AmbiguityPolicy, HitKey, MipCluster, Track};

use crate::{Cone, HitIndex, MipClusterBuilder, SeedState};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// What the extension pass did to a track.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct ExtensionSummary {
    /// Layers searched outside the cone.
    pub layers_scanned: usize,
    /// Layers that contributed a cluster.
    pub layers_added: usize,
    /// Windows that held more than one cluster.
    pub ambiguous_matches: usize,
}

/// A member hit used to anchor one edge of the track.
#[derive(Debug, Clone, Copy, PartialEq)]
struct Anchor {
    layer: u32,
    strip: u32,
}

/// One edge line: an anchor and the strip slope per layer.
#[derive(Debug, Clone, Copy, PartialEq)]
struct Edge {
    anchor: Anchor,
    slope: f64,
}

impl Edge {
    /// Fits an edge from hits sorted so that the edge hit comes first.
    fn fit(sorted: &[Anchor]) -> Option<Self> {
        let anchor = *sorted.first()?;
        let slope = sorted
            .iter()
            .find(|hit| hit.layer != anchor.layer)
            .map_or(0.0, |partner| {
                (f64::from(partner.strip) - f64::from(anchor.strip))
                    / (f64::from(partner.layer) - f64::from(anchor.layer))
            });
        Some(Self { anchor, slope })
    }

    fn at(&self, layer: u32) -> f64 {
        f64::from(self.anchor.strip) + self.slope * (f64::from(layer) - f64::from(self.anchor.layer))
    }
}

/// Left and right edge lines of a track.
#[derive(Debug, Clone, Copy, PartialEq)]
struct Edges {
    left: Edge,
    right: Edge,
}

impl Edges {
    fn fit(track: &Track, index: &HitIndex<'_>) -> Option<Self> {
        let mut hits: Vec<Anchor> = track
            .records(index.arena())
            .map(|hit| Anchor {
                layer: hit.layer,
                strip: hit.strip,
            })
            .collect();

        hits.sort_by_key(|hit| (hit.strip, hit.layer));
        let left = Edge::fit(&hits)?;

        hits.sort_by_key(|hit| (std::cmp::Reverse(hit.strip), hit.layer));
        let right = Edge::fit(&hits)?;

        Some(Self { left, right })
    }

    fn center(&self, layer: u32) -> f64 {
        (self.left.at(layer) + self.right.at(layer)) / 2.0
    }
}

/// Extends cone tracks layer by layer along their fitted edges.
#[derive(Debug, Clone, Copy)]
pub struct TrackExtender {
    width: u32,
    policy: AmbiguityPolicy,
    builder: MipClusterBuilder,
}

impl TrackExtender {
    /// Creates an extender with a search window `width` strips wide.
    #[must_use]
    pub fn new(width: u32, policy: AmbiguityPolicy, builder: MipClusterBuilder) -> Self {
        Self {
            width,
            policy,
            builder,
        }
    }

    /// Search window width in strips.
    #[must_use]
    pub fn width(&self) -> u32 {
        self.width
    }

    /// Extends the cone track through every checked layer outside the cone.
    ///
    /// Layers are visited in ascending order. Edges are refitted after each
    /// layer that contributed hits.
    #[allow(clippy::cast_possible_truncation)]
    pub fn extend(&self, index: &HitIndex<'_>, state: &SeedState, cone: Cone) -> (Track, ExtensionSummary) {
        let mut summary = ExtensionSummary::default();
        let mut track = cone.track;
        let Some(mut edges) = Edges::fit(&track, index) else {
            return (track, summary);
        };

        let scheme = index.scheme();
        let half = f64::from(self.width) / 2.0;
        let worklist: Vec<u32> = state
            .layer_check
            .iter()
            .copied()
            .filter(|layer| !cone.span.contains(layer))
            .collect();

        for layer in worklist {
            summary.layers_scanned += 1;
            let center = edges.center(layer);
            let low = (center - half).floor() as i64;
            let up = (center + half).ceil() as i64;

            let mut clusters = self.builder.build(index, layer, low, up);
            let chosen = match clusters.len() {
                0 => continue,
                1 => clusters.swap_remove(0),
                n => {
                    summary.ambiguous_matches += 1;
                    let Some(chosen) = self.choose(clusters, center, |cluster| cluster.key(scheme))
                    else {
                        continue;
                    };
                    debug!(
                        "{} layer {layer}: {n} clusters around strip {center:.1}, kept strips {}-{}",
                        index.section(),
                        chosen.low_strip,
                        chosen.up_strip
                    );
                    chosen
                }
            };

            track.push_cluster(&chosen);
            summary.layers_added += 1;
            if let Some(refit) = Edges::fit(&track, index) {
                edges = refit;
            }
        }

        (track, summary)
    }

    fn choose(
        &self,
        clusters: Vec<MipCluster>,
        center: f64,
        key: impl Fn(&MipCluster) -> HitKey,
    ) -> Option<MipCluster> {
        match self.policy {
            AmbiguityPolicy::LowestKey => clusters.into_iter().min_by_key(|cluster| key(cluster)),
            AmbiguityPolicy::NearestCenter => {
                let distance = |cluster: &MipCluster| (cluster.center_strip() - center).abs();
                clusters.into_iter().min_by(|a, b| {
                    distance(a)
                        .total_cmp(&distance(b))
                        .then_with(|| key(a).cmp(&key(b)))
                })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mipcal_core::{HitArena, HitRecord, KeyScheme, Section, SeedPolicy};

    use crate::{ConeSearch, SeedFinder};

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

    fn run(arena: &HitArena, angle: f64, width: u32, policy: AmbiguityPolicy) -> (Track, ExtensionSummary) {
        let index = index_of(arena);
        let builder = MipClusterBuilder::new(100.0);
        let mut state = SeedState::new(20, 1);
        let seed = SeedFinder::new(SeedPolicy::Lowest, builder)
            .find(&index, &mut state)
            .seed
            .unwrap();
        let cone = ConeSearch::new(3, angle, 3, builder).search(&index, &state, &seed);
        TrackExtender::new(width, policy, builder).extend(&index, &state, cone)
    }

    fn layers_and_strips(track: &Track, arena: &HitArena) -> Vec<(u32, u32)> {
        track.records(arena).map(|hit| (hit.layer, hit.strip)).collect()
    }

    #[test]
    fn test_straight_extension() {
        let hits: Vec<(u32, u32)> = (1..=10).map(|layer| (layer, 12)).collect();
        let arena = arena(&hits);
        let (track, summary) = run(&arena, 3.0, 2, AmbiguityPolicy::LowestKey);

        assert_eq!(track.len(), 10);
        assert_eq!(track.num_layers_hit(), 10);
        // layers 5..=20 lie outside the cone 0..=4
        assert_eq!(summary.layers_scanned, 16);
        assert_eq!(summary.layers_added, 6);
        assert_eq!(summary.ambiguous_matches, 0);
    }

    #[test]
    fn test_follows_slope() {
        // one strip per layer, inside a cone opening one strip per layer
        let hits: Vec<(u32, u32)> = (1..=10).map(|layer| (layer, layer + 2)).collect();
        let arena = arena(&hits);
        let (track, _) = run(&arena, 6.0, 2, AmbiguityPolicy::LowestKey);

        assert_eq!(track.len(), 10);
        assert_eq!(layers_and_strips(&track, &arena)[9], (10, 12));
    }

    #[test]
    fn test_ambiguity_lowest_key() {
        let mut hits: Vec<(u32, u32)> = (1..=4).map(|layer| (layer, 12)).collect();
        hits.extend([(6, 14), (6, 11)]);
        let arena = arena(&hits);
        let (track, summary) = run(&arena, 3.0, 6, AmbiguityPolicy::LowestKey);

        assert_eq!(summary.ambiguous_matches, 1);
        assert_eq!(layers_and_strips(&track, &arena).last(), Some(&(6, 11)));
    }

    #[test]
    fn test_ambiguity_nearest_center() {
        let mut hits: Vec<(u32, u32)> = (1..=4).map(|layer| (layer, 12)).collect();
        hits.extend([(6, 10), (6, 13)]);
        let arena = arena(&hits);
        let (track, summary) = run(&arena, 3.0, 6, AmbiguityPolicy::NearestCenter);

        assert_eq!(summary.ambiguous_matches, 1);
        assert_eq!(layers_and_strips(&track, &arena).last(), Some(&(6, 13)));
    }

    #[test]
    fn test_nearest_center_tie_goes_to_lowest_key() {
        let mut hits: Vec<(u32, u32)> = (1..=4).map(|layer| (layer, 12)).collect();
        hits.extend([(6, 10), (6, 14)]);
        let arena = arena(&hits);
        let (track, _) = run(&arena, 3.0, 6, AmbiguityPolicy::NearestCenter);

        assert_eq!(layers_and_strips(&track, &arena).last(), Some(&(6, 10)));
    }

    #[test]
    fn test_edges_without_partner_layer_are_flat() {
        let arena = arena(&[(3, 7), (3, 8)]);
        let index = index_of(&arena);
        let mut track = Track::new(Section::Back, HitKey(307), 3, 7);
        track.push_cluster(&MipClusterBuilder::new(100.0).build_layer(&index, 3)[0]);

        let edges = Edges::fit(&track, &index).unwrap();
        assert!(edges.left.slope.abs() < f64::EPSILON);
        assert!(edges.right.slope.abs() < f64::EPSILON);
        assert!((edges.center(10) - 7.5).abs() < f64::EPSILON);
    }
}
