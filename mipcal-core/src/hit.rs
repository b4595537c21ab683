//! Hit records and the event-scoped hit arena.

use std::fmt;
use std::str::FromStr;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::Error;

/// Coarse detector partition sharing one local coordinate frame.
///
/// Every section is one orientation group: tracks never span two sections.
/// The declaration order is the order in which sections are searched.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum Section {
    /// Downstream section behind the inner calorimeter.
    Back,
    /// Side section above the beam line.
    Top,
    /// Side section below the beam line.
    Bottom,
    /// Side section on the left.
    Left,
    /// Side section on the right.
    Right,
}

impl Section {
    /// All sections in search order.
    pub const ALL: [Section; 5] = [
        Section::Back,
        Section::Top,
        Section::Bottom,
        Section::Left,
        Section::Right,
    ];

    /// Numeric identifier used by the digitization stage.
    #[inline]
    #[must_use]
    pub fn id(self) -> u8 {
        match self {
            Section::Back => 0,
            Section::Top => 1,
            Section::Bottom => 2,
            Section::Left => 3,
            Section::Right => 4,
        }
    }

    /// Looks up a section from its numeric identifier.
    #[must_use]
    pub fn from_id(id: u8) -> Option<Self> {
        Self::ALL.get(usize::from(id)).copied()
    }

    /// Lower-case section name.
    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            Section::Back => "back",
            Section::Top => "top",
            Section::Bottom => "bottom",
            Section::Left => "left",
            Section::Right => "right",
        }
    }
}

impl fmt::Display for Section {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Section {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        if let Ok(id) = trimmed.parse::<u8>() {
            return Self::from_id(id)
                .ok_or_else(|| Error::UnknownSection(id.to_string()));
        }
        Self::ALL
            .into_iter()
            .find(|section| section.name().eq_ignore_ascii_case(trimmed))
            .ok_or_else(|| Error::UnknownSection(trimmed.to_string()))
    }
}

/// Real-space position hint of a hit (mm).
#[derive(Debug, Clone, Copy, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Position {
    /// X coordinate.
    pub x: f64,
    /// Y coordinate.
    pub y: f64,
    /// Z coordinate (beam axis).
    pub z: f64,
}

impl Position {
    /// Creates a new position.
    #[inline]
    #[must_use]
    pub fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }

    /// Returns the coordinates as an array.
    #[inline]
    #[must_use]
    pub fn to_array(self) -> [f64; 3] {
        [self.x, self.y, self.z]
    }
}

/// A single digitized energy deposit.
///
/// Records are created upstream and never modified by the track finder.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct HitRecord {
    /// Detector section.
    pub section: Section,
    /// Depth index within the section (1-based).
    pub layer: u32,
    /// Transverse segment index within the layer.
    pub strip: u32,
    /// Reconstructed energy (MeV).
    pub energy: f32,
    /// Photo-electron yield.
    pub pe: f32,
    /// Optional real-space position hint.
    pub position: Option<Position>,
}

impl HitRecord {
    /// Creates a hit without a position hint.
    #[inline]
    #[must_use]
    pub fn new(section: Section, layer: u32, strip: u32, energy: f32, pe: f32) -> Self {
        Self {
            section,
            layer,
            strip,
            energy,
            pe,
            position: None,
        }
    }

    /// Attaches a real-space position hint.
    #[inline]
    #[must_use]
    pub fn with_position(mut self, position: Position) -> Self {
        self.position = Some(position);
        self
    }
}

/// Index of a [`HitRecord`] inside its event's [`HitArena`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct HitId(pub u32);

impl HitId {
    /// Returns the arena slot.
    #[inline]
    #[must_use]
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// Owned, append-only storage for one event's hits.
///
/// Clusters and tracks refer to hits by [`HitId`], never by value.
#[derive(Debug, Clone, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct HitArena {
    hits: Vec<HitRecord>,
}

impl HitArena {
    /// Creates an empty arena with pre-allocated capacity.
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            hits: Vec::with_capacity(capacity),
        }
    }

    /// Appends a hit and returns its id.
    ///
    /// # Panics
    /// Panics if the arena already holds `u32::MAX` hits.
    pub fn push(&mut self, hit: HitRecord) -> HitId {
        let id = u32::try_from(self.hits.len()).expect("hit arena exceeds u32::MAX entries");
        self.hits.push(hit);
        HitId(id)
    }

    /// Returns the hit stored under `id`.
    ///
    /// # Panics
    /// Panics if `id` was not issued by this arena.
    #[inline]
    #[must_use]
    pub fn get(&self, id: HitId) -> &HitRecord {
        &self.hits[id.index()]
    }

    /// Returns the hit stored under `id`, if any.
    #[inline]
    #[must_use]
    pub fn try_get(&self, id: HitId) -> Option<&HitRecord> {
        self.hits.get(id.index())
    }

    /// Number of hits in the arena.
    #[must_use]
    pub fn len(&self) -> usize {
        self.hits.len()
    }

    /// Returns true if the arena is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.hits.is_empty()
    }

    /// Iterates over `(id, hit)` pairs in insertion order.
    #[allow(clippy::cast_possible_truncation)]
    pub fn iter(&self) -> impl Iterator<Item = (HitId, &HitRecord)> {
        self.hits
            .iter()
            .enumerate()
            .map(|(i, hit)| (HitId(i as u32), hit))
    }

    /// Returns the underlying records.
    #[must_use]
    pub fn as_slice(&self) -> &[HitRecord] {
        &self.hits
    }
}

impl From<Vec<HitRecord>> for HitArena {
    fn from(hits: Vec<HitRecord>) -> Self {
        Self { hits }
    }
}

impl FromIterator<HitRecord> for HitArena {
    fn from_iter<I: IntoIterator<Item = HitRecord>>(iter: I) -> Self {
        Self {
            hits: iter.into_iter().collect(),
        }
    }
}

/// One event's worth of input hits.
#[derive(Debug, Clone, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct EventHits {
    /// Event number assigned upstream.
    pub event_id: u64,
    /// Hits in digitization order.
    pub hits: Vec<HitRecord>,
}

impl EventHits {
    /// Creates an event from its hits.
    #[must_use]
    pub fn new(event_id: u64, hits: Vec<HitRecord>) -> Self {
        Self { event_id, hits }
    }

    /// Number of hits.
    #[must_use]
    pub fn len(&self) -> usize {
        self.hits.len()
    }

    /// Returns true if the event carries no hits.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.hits.is_empty()
    }
}
