//! Ordered key index over one section's hits.
//!
//! Keys are `layer * modulus + strip`, so a `BTreeMap` over keys answers
//! "every hit of layer L between strips a and b" as one contiguous range.

use std::collections::BTreeMap;

use log::{debug, warn};
use mipcal_core::{
    EventStatistics, HitArena, HitId, HitKey, HitRecord, KeyScheme, Section, TrackingConfig,
};

/// Mutable key to hit map for one section of one event.
///
/// The index borrows the event arena and only stores ids. Hits leave the
/// index when an accepted track claims them; the arena itself is untouched.
#[derive(Debug, Clone)]
pub struct HitIndex<'a> {
    arena: &'a HitArena,
    section: Section,
    scheme: KeyScheme,
    entries: BTreeMap<HitKey, HitId>,
}

impl<'a> HitIndex<'a> {
    /// Creates an empty index for `section`.
    #[must_use]
    pub fn new(arena: &'a HitArena, section: Section, scheme: KeyScheme) -> Self {
        Self {
            arena,
            section,
            scheme,
            entries: BTreeMap::new(),
        }
    }

    /// Indexes every usable hit of `section`.
    ///
    /// Hits at or below the photo-electron threshold are noise. Hits outside
    /// `1..=num_layers` or `0..=num_strips` are skipped with a warning.
    #[must_use]
    pub fn load(
        arena: &'a HitArena,
        section: Section,
        scheme: KeyScheme,
        config: &TrackingConfig,
        stats: &mut EventStatistics,
    ) -> Self {
        let mut index = Self::new(arena, section, scheme);

        for (id, hit) in arena.iter().filter(|(_, hit)| hit.section == section) {
            if hit.pe <= config.min_pe {
                stats.noise_hits += 1;
                continue;
            }
            if hit.layer == 0 || hit.layer > config.num_layers || hit.strip > config.num_strips {
                warn!(
                    "Skipping {} hit outside geometry: layer {}, strip {}",
                    section, hit.layer, hit.strip
                );
                stats.out_of_range_hits += 1;
                continue;
            }
            if index.insert(id).is_some() {
                stats.overwritten_hits += 1;
            }
        }

        stats.hits_loaded += index.len();
        index
    }

    /// Inserts a hit under its (layer, strip) key.
    ///
    /// A later insert with the same key replaces the earlier one; the
    /// displaced id is returned.
    pub fn insert(&mut self, id: HitId) -> Option<HitId> {
        let hit = self.arena.get(id);
        let key = self.scheme.key(hit.layer, hit.strip);
        let previous = self.entries.insert(key, id);
        if let Some(previous) = previous {
            debug!(
                "Hit {:?} overwrites {:?} at key {} ({} layer {}, strip {})",
                id, previous, key, self.section, hit.layer, hit.strip
            );
        }
        previous
    }

    /// Entries with `low <= key <= up` in key order.
    ///
    /// An inverted range is a caller error and yields nothing.
    pub fn range(&self, low: HitKey, up: HitKey) -> impl Iterator<Item = (HitKey, HitId)> + '_ {
        if low > up {
            debug!("Range query with inverted bounds {low} -> {up}, returning nothing");
        }
        (low <= up)
            .then(|| self.entries.range(low..=up))
            .into_iter()
            .flatten()
            .map(|(&key, &id)| (key, id))
    }

    /// Removes the entry under `key`.
    ///
    /// Returns `None` if the key is not indexed, which callers treat as a
    /// hit being claimed twice.
    pub fn erase(&mut self, key: HitKey) -> Option<HitId> {
        self.entries.remove(&key)
    }

    /// Id stored under `key`.
    #[must_use]
    pub fn get(&self, key: HitKey) -> Option<HitId> {
        self.entries.get(&key).copied()
    }

    /// Returns true if `key` is indexed.
    #[must_use]
    pub fn contains(&self, key: HitKey) -> bool {
        self.entries.contains_key(&key)
    }

    /// Record behind an id.
    #[must_use]
    pub fn hit(&self, id: HitId) -> &'a HitRecord {
        self.arena.get(id)
    }

    /// Key of an arena hit under this index's scheme.
    #[must_use]
    pub fn key_of(&self, id: HitId) -> HitKey {
        let hit = self.arena.get(id);
        self.scheme.key(hit.layer, hit.strip)
    }

    /// Number of indexed hits.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true if nothing is indexed.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Drops every entry.
    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// Section covered by this index.
    #[must_use]
    pub fn section(&self) -> Section {
        self.section
    }

    /// Key scheme in use.
    #[must_use]
    pub fn scheme(&self) -> &KeyScheme {
        &self.scheme
    }

    /// Arena the ids refer to.
    #[must_use]
    pub fn arena(&self) -> &'a HitArena {
        self.arena
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scheme() -> KeyScheme {
        KeyScheme::new(100, 34).unwrap()
    }

    fn arena(hits: &[(u32, u32)]) -> HitArena {
        hits.iter()
            .map(|&(layer, strip)| HitRecord::new(Section::Back, layer, strip, 1.0, 10.0))
            .collect()
    }

    #[test]
    fn test_range_in_key_order() {
        let arena = arena(&[(2, 5), (1, 7), (1, 3), (3, 0)]);
        let mut index = HitIndex::new(&arena, Section::Back, scheme());
        for (id, _) in arena.iter() {
            assert!(index.insert(id).is_none());
        }

        let keys: Vec<u64> = index
            .range(HitKey(100), HitKey(299))
            .map(|(key, _)| key.as_u64())
            .collect();
        assert_eq!(keys, vec![103, 107, 205]);

        assert_eq!(index.range(HitKey(104), HitKey(106)).count(), 0);
        assert_eq!(index.range(HitKey(300), HitKey(100)).count(), 0);
    }

    #[test]
    fn test_last_insert_wins() {
        let arena = arena(&[(4, 9), (4, 9)]);
        let mut index = HitIndex::new(&arena, Section::Back, scheme());

        assert!(index.insert(HitId(0)).is_none());
        assert_eq!(index.insert(HitId(1)), Some(HitId(0)));

        let found: Vec<HitId> = index.range(HitKey(409), HitKey(409)).map(|(_, id)| id).collect();
        assert_eq!(found, vec![HitId(1)]);
        assert_eq!(index.len(), 1);
    }

    #[test]
    fn test_erase() {
        let arena = arena(&[(1, 1)]);
        let mut index = HitIndex::new(&arena, Section::Back, scheme());
        index.insert(HitId(0));

        assert!(index.contains(HitKey(101)));
        assert_eq!(index.erase(HitKey(101)), Some(HitId(0)));
        assert_eq!(index.erase(HitKey(101)), None);
        assert!(index.is_empty());
    }

    #[test]
    fn test_load_filters_hits() {
        let arena: HitArena = vec![
            HitRecord::new(Section::Back, 1, 3, 1.0, 10.0),
            HitRecord::new(Section::Back, 1, 4, 1.0, 2.0),
            HitRecord::new(Section::Back, 0, 4, 1.0, 10.0),
            HitRecord::new(Section::Back, 82, 4, 1.0, 10.0),
            HitRecord::new(Section::Back, 5, 35, 1.0, 10.0),
            HitRecord::new(Section::Top, 1, 3, 1.0, 10.0),
            HitRecord::new(Section::Back, 1, 3, 1.2, 11.0),
        ]
        .into();
        let config = TrackingConfig::default();
        let mut stats = EventStatistics::default();

        let index = HitIndex::load(&arena, Section::Back, scheme(), &config, &mut stats);

        assert_eq!(index.len(), 1);
        assert_eq!(index.get(HitKey(103)), Some(HitId(6)));
        assert_eq!(stats.hits_loaded, 1);
        assert_eq!(stats.noise_hits, 1);
        assert_eq!(stats.out_of_range_hits, 3);
        assert_eq!(stats.overwritten_hits, 1);
    }
}
