//! Per-event track search.
//!
//! The finder runs one search per section present in the event. Each search
//! is a small state machine:
//!
//! ```text
//! SeekSeed -> ConeSearch -> Extend -> Accept -> SeekSeed
//!    |            |            |
//!    v            +-> Reject <-+-> SeekSeed
//!   Done
//! ```
//!
//! Rejected seeds are banned for the rest of the section. Accepted tracks
//! claim their hits, which leave the index so later tracks cannot reuse them.

use std::collections::BTreeSet;

use log::{debug, error};
use mipcal_core::{
    EventHits, EventStatistics, EventTracks, HitArena, HitKey, KeyScheme, Result, Section, Track,
    TrackingConfig,
};

use crate::{
    AcceptanceEvaluator, Cone, ConeSearch, HitIndex, MipClusterBuilder, Seed, SeedFinder, SeedState,
    TrackExtender, TrackGate, Verdict,
};

/// Why a seed was abandoned.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Rejection {
    SparseCone(usize),
    Verdict(Verdict),
}

/// Search state of one section.
#[derive(Debug)]
enum SearchState {
    SeekSeed,
    ConeSearch(Seed),
    Extend(Seed, Cone),
    Accept(Track),
    Reject(HitKey, Rejection),
    Done,
}

/// Finds straight MIP tracks in calorimeter events.
///
/// A finder is immutable once built and can be shared across threads; each
/// [`reconstruct`](Self::reconstruct) call owns its own search state.
#[derive(Debug)]
pub struct TrackFinder {
    config: TrackingConfig,
    scheme: KeyScheme,
    seed_finder: SeedFinder,
    cone: ConeSearch,
    extender: TrackExtender,
    acceptance: AcceptanceEvaluator,
}

impl TrackFinder {
    /// Builds a finder from a validated configuration.
    ///
    /// # Errors
    /// Returns [`mipcal_core::Error::InvalidConfig`] if the configuration is
    /// inconsistent.
    pub fn new(config: TrackingConfig) -> Result<Self> {
        config.validate()?;
        let scheme = config.key_scheme()?;
        let builder = MipClusterBuilder::new(config.max_energy);

        Ok(Self {
            scheme,
            seed_finder: SeedFinder::new(config.seed_policy, builder),
            cone: ConeSearch::new(
                config.cone_depth,
                config.cone_angle,
                config.min_cone_hits,
                builder,
            ),
            extender: TrackExtender::new(config.track_width, config.ambiguity_policy, builder),
            acceptance: AcceptanceEvaluator::new(config.min_track_layer_hits),
            config,
        })
    }

    /// Adds an acceptance gate.
    #[must_use]
    pub fn with_gate(mut self, gate: impl TrackGate + 'static) -> Self {
        self.acceptance.push_gate(Box::new(gate));
        self
    }

    /// Active configuration.
    #[must_use]
    pub fn config(&self) -> &TrackingConfig {
        &self.config
    }

    /// Key scheme derived from the configuration.
    #[must_use]
    pub fn scheme(&self) -> &KeyScheme {
        &self.scheme
    }

    /// Reconstructs every track of one event.
    ///
    /// Never fails: unusable hits are skipped and counted, and an event
    /// without tracks is a valid result.
    pub fn reconstruct(&self, event: EventHits) -> EventTracks {
        let arena = HitArena::from(event.hits);
        let mut stats = EventStatistics::default();
        let mut tracks = Vec::new();

        let sections: BTreeSet<Section> = arena.iter().map(|(_, hit)| hit.section).collect();
        for section in sections {
            if tracks.len() >= self.config.max_track_count {
                debug!(
                    "Event {}: track limit {} reached, skipping {section}",
                    event.event_id, self.config.max_track_count
                );
                break;
            }
            self.search_section(&arena, section, &mut stats, &mut tracks);
        }

        stats.tracks_found = tracks.len();
        debug!(
            "Event {}: {} hits, {} tracks, {} seeds tried",
            event.event_id,
            arena.len(),
            tracks.len(),
            stats.seeds_tried
        );

        EventTracks {
            event_id: event.event_id,
            arena,
            tracks,
            stats,
        }
    }

    /// Runs the search over one section, appending accepted tracks.
    pub fn search_section(
        &self,
        arena: &HitArena,
        section: Section,
        stats: &mut EventStatistics,
        tracks: &mut Vec<Track>,
    ) {
        let mut index = HitIndex::load(arena, section, self.scheme, &self.config, stats);
        if index.is_empty() {
            return;
        }
        let mut seeds = SeedState::new(self.config.num_layers, self.config.first_seed_layer);

        let mut state = SearchState::SeekSeed;
        loop {
            state = match state {
                SearchState::SeekSeed => {
                    let search = self.seed_finder.find(&index, &mut seeds);
                    stats.layers_exhausted += search.layers_exhausted;
                    match search.seed {
                        Some(seed) => {
                            stats.seeds_tried += 1;
                            SearchState::ConeSearch(seed)
                        }
                        None => SearchState::Done,
                    }
                }
                SearchState::ConeSearch(seed) => {
                    let cone = self.cone.search(&index, &seeds, &seed);
                    if cone.is_complete() {
                        SearchState::Extend(seed, cone)
                    } else {
                        SearchState::Reject(seed.key, Rejection::SparseCone(cone.track.len()))
                    }
                }
                SearchState::Extend(seed, cone) => {
                    let (track, summary) = self.extender.extend(&index, &seeds, cone);
                    stats.ambiguous_matches += summary.ambiguous_matches;
                    match self.acceptance.evaluate(&track, arena) {
                        Verdict::Accepted => SearchState::Accept(track),
                        verdict => SearchState::Reject(seed.key, Rejection::Verdict(verdict)),
                    }
                }
                SearchState::Accept(track) => {
                    debug!(
                        "{section} track from seed {}: {} hits on {} layers",
                        track.seed(),
                        track.len(),
                        track.num_layers_hit()
                    );
                    Self::claim(&mut index, &track, stats);
                    tracks.push(track);
                    if tracks.len() >= self.config.max_track_count {
                        SearchState::Done
                    } else {
                        seeds.reset_cursor();
                        SearchState::SeekSeed
                    }
                }
                SearchState::Reject(key, rejection) => {
                    match rejection {
                        Rejection::SparseCone(hits) => {
                            debug!("{section} seed {key}: cone holds only {hits} hits");
                            stats.cone_failures += 1;
                        }
                        Rejection::Verdict(verdict) => {
                            debug!("{section} seed {key}: {verdict}");
                            stats.acceptance_failures += 1;
                        }
                    }
                    seeds.ban(key);
                    SearchState::SeekSeed
                }
                SearchState::Done => break,
            };
        }
    }

    /// Removes every member hit of an accepted track from the index.
    fn claim(index: &mut HitIndex<'_>, track: &Track, stats: &mut EventStatistics) {
        for &id in track.hits() {
            let key = index.key_of(id);
            let erased = index.erase(key);
            debug_assert!(erased.is_some(), "hit {id:?} at key {key} claimed twice");
            if erased.is_some() {
                stats.hits_claimed += 1;
            } else {
                error!(
                    "{} track from seed {}: hit {id:?} at key {key} is no longer indexed",
                    index.section(),
                    track.seed()
                );
                stats.erase_violations += 1;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mipcal_core::{Error, HitRecord};

    fn config() -> TrackingConfig {
        TrackingConfig::new()
            .with_geometry(20, 34)
            .with_min_pe(1.0)
            .with_cone(3, 3.0, 3)
            .with_track_width(2)
            .with_min_track_layer_hits(5)
    }

    fn line(section: Section, layers: std::ops::RangeInclusive<u32>, strip: u32) -> Vec<HitRecord> {
        layers
            .map(|layer| HitRecord::new(section, layer, strip, 1.0, 10.0))
            .collect()
    }

    #[test]
    fn test_rejects_invalid_config() {
        let result = TrackFinder::new(TrackingConfig::new().with_cone(0, 3.0, 3));
        assert!(matches!(result, Err(Error::InvalidConfig(_))));
    }

    #[test]
    fn test_single_track_claims_hits() {
        let finder = TrackFinder::new(config()).unwrap();
        let event = finder.reconstruct(EventHits::new(4, line(Section::Back, 1..=10, 12)));

        assert_eq!(event.event_id, 4);
        assert_eq!(event.tracks.len(), 1);
        assert_eq!(event.tracks[0].len(), 10);
        assert_eq!(event.stats.tracks_found, 1);
        assert_eq!(event.stats.hits_claimed, 10);
        assert_eq!(event.stats.erase_violations, 0);
    }

    #[test]
    fn test_short_track_is_rejected() {
        let finder = TrackFinder::new(config()).unwrap();
        let event = finder.reconstruct(EventHits::new(1, line(Section::Back, 1..=5, 12)));

        // seeds at layers 1-3 reach the extender, layers 4-5 fail in the cone
        assert!(event.tracks.is_empty());
        assert_eq!(event.stats.seeds_tried, 5);
        assert_eq!(event.stats.acceptance_failures, 3);
        assert_eq!(event.stats.cone_failures, 2);
        assert_eq!(event.stats.hits_claimed, 0);
    }

    #[test]
    fn test_sections_are_searched_separately() {
        let mut hits = line(Section::Top, 1..=10, 3);
        hits.extend(line(Section::Back, 1..=10, 3));
        let finder = TrackFinder::new(config()).unwrap();
        let event = finder.reconstruct(EventHits::new(1, hits));

        let sections: Vec<Section> = event.tracks.iter().map(Track::section).collect();
        assert_eq!(sections, vec![Section::Back, Section::Top]);
    }

    #[test]
    fn test_track_cap_spans_sections() {
        let mut hits = line(Section::Top, 1..=10, 3);
        hits.extend(line(Section::Back, 1..=10, 3));
        let finder = TrackFinder::new(config().with_max_track_count(1)).unwrap();
        let event = finder.reconstruct(EventHits::new(1, hits));

        assert_eq!(event.tracks.len(), 1);
        assert_eq!(event.tracks[0].section(), Section::Back);
    }

    fn seeds(event: &EventTracks) -> Vec<(u32, u32)> {
        event
            .tracks
            .iter()
            .map(|track| (track.seed_layer(), track.seed_strip()))
            .collect()
    }

    fn two_full_tracks() -> Vec<HitRecord> {
        let mut hits = line(Section::Back, 1..=20, 3);
        hits.extend(line(Section::Back, 1..=20, 20));
        hits
    }

    #[test]
    fn test_later_seeds_follow_lowest_policy() {
        let finder = TrackFinder::new(config().with_first_seed_layer(5)).unwrap();
        let event = finder.reconstruct(EventHits::new(1, two_full_tracks()));

        assert_eq!(seeds(&event), vec![(5, 3), (1, 20)]);
        assert!(event.tracks.iter().all(|track| track.len() == 20));
    }

    #[test]
    fn test_later_seeds_follow_median_policy() {
        let finder =
            TrackFinder::new(config().with_seed_policy(mipcal_core::SeedPolicy::Median)).unwrap();
        let event = finder.reconstruct(EventHits::new(1, two_full_tracks()));

        // first seed from the configured layer, then the lower median of 1..=20
        assert_eq!(seeds(&event), vec![(1, 3), (10, 20)]);
        assert!(event.tracks.iter().all(|track| track.len() == 20));
    }

    #[test]
    fn test_gate_vetoes_track() {
        struct Veto;
        impl TrackGate for Veto {
            fn name(&self) -> &'static str {
                "veto"
            }
            fn accepts(&self, _track: &Track, _arena: &HitArena) -> bool {
                false
            }
        }

        let finder = TrackFinder::new(config()).unwrap().with_gate(Veto);
        let event = finder.reconstruct(EventHits::new(1, line(Section::Back, 1..=10, 12)));
        assert!(event.tracks.is_empty());
        assert!(event.stats.acceptance_failures > 0);
    }
}
