//! Track hypotheses and per-event results.

use std::collections::BTreeSet;

use crate::{EventStatistics, HitArena, HitId, HitKey, HitRecord, MipCluster, Section};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// A straight-line track hypothesis confined to one section.
///
/// Built incrementally by the track finder; treated as immutable once
/// accepted. Member hits are arena references in insertion order.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Track {
    section: Section,
    seed: HitKey,
    seed_layer: u32,
    seed_strip: u32,
    hits: Vec<HitId>,
    layers: BTreeSet<u32>,
}

impl Track {
    /// Starts an empty track from a seed position.
    #[must_use]
    pub fn new(section: Section, seed: HitKey, seed_layer: u32, seed_strip: u32) -> Self {
        Self {
            section,
            seed,
            seed_layer,
            seed_strip,
            hits: Vec::new(),
            layers: BTreeSet::new(),
        }
    }

    /// Appends every member of a cluster and records its layer.
    pub fn push_cluster(&mut self, cluster: &MipCluster) {
        self.hits.extend_from_slice(&cluster.members);
        self.layers.insert(cluster.layer);
    }

    /// Section the track lives in.
    #[must_use]
    pub fn section(&self) -> Section {
        self.section
    }

    /// Key of the seed cluster.
    #[must_use]
    pub fn seed(&self) -> HitKey {
        self.seed
    }

    /// Layer of the seed cluster.
    #[must_use]
    pub fn seed_layer(&self) -> u32 {
        self.seed_layer
    }

    /// Lowest strip of the seed cluster.
    #[must_use]
    pub fn seed_strip(&self) -> u32 {
        self.seed_strip
    }

    /// Member hits in insertion order.
    #[must_use]
    pub fn hits(&self) -> &[HitId] {
        &self.hits
    }

    /// Distinct layers containing at least one member hit.
    #[must_use]
    pub fn layers(&self) -> &BTreeSet<u32> {
        &self.layers
    }

    /// Total number of member hits.
    #[must_use]
    pub fn len(&self) -> usize {
        self.hits.len()
    }

    /// Returns true if the track has no hits.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.hits.is_empty()
    }

    /// Number of distinct layers hit.
    #[must_use]
    pub fn num_layers_hit(&self) -> usize {
        self.layers.len()
    }

    /// Resolves member hits against the event arena.
    pub fn records<'a>(&'a self, arena: &'a HitArena) -> impl Iterator<Item = &'a HitRecord> + 'a {
        self.hits.iter().map(move |&id| arena.get(id))
    }
}

/// Reconstruction output for one event.
#[derive(Debug, Clone, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct EventTracks {
    /// Event number assigned upstream.
    pub event_id: u64,
    /// Every hit of the event; tracks refer into it.
    pub arena: HitArena,
    /// Accepted tracks in the order they were found.
    pub tracks: Vec<Track>,
    /// Search bookkeeping for this event.
    pub stats: EventStatistics,
}

impl EventTracks {
    /// Number of accepted tracks.
    #[must_use]
    pub fn len(&self) -> usize {
        self.tracks.len()
    }

    /// Returns true if no track was accepted.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.tracks.is_empty()
    }

    /// Iterates over tracks with their resolved member records.
    pub fn iter_resolved(&self) -> impl Iterator<Item = (&Track, Vec<&HitRecord>)> {
        self.tracks
            .iter()
            .map(|track| (track, track.records(&self.arena).collect()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cluster(layer: u32, strip: u32, members: Vec<HitId>) -> MipCluster {
        MipCluster {
            section: Section::Back,
            layer,
            low_strip: strip,
            up_strip: strip + members.len() as u32 - 1,
            total_energy: 1.0,
            members,
        }
    }

    #[test]
    fn test_track_accumulates_layers() {
        let mut track = Track::new(Section::Back, HitKey(105), 1, 5);
        assert!(track.is_empty());

        track.push_cluster(&cluster(1, 5, vec![HitId(0)]));
        track.push_cluster(&cluster(2, 5, vec![HitId(1), HitId(2)]));
        track.push_cluster(&cluster(2, 9, vec![HitId(3)]));

        assert_eq!(track.len(), 4);
        assert_eq!(track.num_layers_hit(), 2);
        assert_eq!(track.hits(), &[HitId(0), HitId(1), HitId(2), HitId(3)]);
        assert_eq!(track.seed(), HitKey(105));
        assert_eq!(track.seed_layer(), 1);
    }

    #[test]
    fn test_track_resolves_records() {
        let arena: HitArena = vec![
            HitRecord::new(Section::Back, 1, 5, 1.0, 10.0),
            HitRecord::new(Section::Back, 2, 5, 1.1, 11.0),
        ]
        .into();
        let mut track = Track::new(Section::Back, HitKey(105), 1, 5);
        track.push_cluster(&cluster(1, 5, vec![HitId(0)]));
        track.push_cluster(&cluster(2, 5, vec![HitId(1)]));

        let layers: Vec<u32> = track.records(&arena).map(|hit| hit.layer).collect();
        assert_eq!(layers, vec![1, 2]);

        let event = EventTracks {
            event_id: 7,
            arena,
            tracks: vec![track],
            stats: EventStatistics::default(),
        };
        let (_, records) = event.iter_resolved().next().unwrap();
        assert_eq!(records.len(), 2);
    }
}
