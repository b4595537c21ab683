//! Final accept/reject decision for extended tracks.

use std::fmt;

use mipcal_core::{BoundingBox, HitArena, Ray, Track};

/// Extra acceptance condition evaluated after the layer count.
pub trait TrackGate: Send + Sync {
    /// Short name used in diagnostics.
    fn name(&self) -> &'static str;

    /// Returns true if the track passes this gate.
    fn accepts(&self, track: &Track, arena: &HitArena) -> bool;
}

/// Result of evaluating a track.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    /// Every condition holds.
    Accepted,
    /// The track does not hit more than the required number of layers.
    TooFewLayers {
        /// Distinct layers hit.
        layers: usize,
        /// Count that must be exceeded.
        required: usize,
    },
    /// A gate rejected the track.
    Gated(&'static str),
}

impl Verdict {
    /// Returns true for [`Verdict::Accepted`].
    #[must_use]
    pub fn is_accepted(&self) -> bool {
        matches!(self, Verdict::Accepted)
    }
}

impl fmt::Display for Verdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Verdict::Accepted => write!(f, "accepted"),
            Verdict::TooFewLayers { layers, required } => {
                write!(f, "{layers} layers hit, more than {required} required")
            }
            Verdict::Gated(name) => write!(f, "rejected by {name}"),
        }
    }
}

/// Layer-count threshold plus optional gates.
pub struct AcceptanceEvaluator {
    min_layer_hits: usize,
    gates: Vec<Box<dyn TrackGate>>,
}

impl AcceptanceEvaluator {
    /// Accepts tracks hitting strictly more than `min_layer_hits` layers.
    #[must_use]
    pub fn new(min_layer_hits: usize) -> Self {
        Self {
            min_layer_hits,
            gates: Vec::new(),
        }
    }

    /// Adds a gate; gates run in insertion order.
    pub fn push_gate(&mut self, gate: Box<dyn TrackGate>) {
        self.gates.push(gate);
    }

    /// Names of the installed gates.
    pub fn gate_names(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.gates.iter().map(|gate| gate.name())
    }

    /// Evaluates a track.
    #[must_use]
    pub fn evaluate(&self, track: &Track, arena: &HitArena) -> Verdict {
        let layers = track.num_layers_hit();
        if layers <= self.min_layer_hits {
            return Verdict::TooFewLayers {
                layers,
                required: self.min_layer_hits,
            };
        }
        self.gates
            .iter()
            .find(|gate| !gate.accepts(track, arena))
            .map_or(Verdict::Accepted, |gate| Verdict::Gated(gate.name()))
    }
}

impl fmt::Debug for AcceptanceEvaluator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AcceptanceEvaluator")
            .field("min_layer_hits", &self.min_layer_hits)
            .field("gates", &self.gate_names().collect::<Vec<_>>())
            .finish()
    }
}

/// Requires the straight line through the track to cross a fiducial box.
///
/// The line runs from the latest-layer to the earliest-layer member hit that
/// carries a position. Tracks with fewer than two positioned hits on distinct
/// layers cannot be judged and pass.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FiducialGate {
    region: BoundingBox,
}

impl FiducialGate {
    /// Creates a gate for `region`.
    #[must_use]
    pub fn new(region: BoundingBox) -> Self {
        Self { region }
    }

    /// Fiducial region.
    #[must_use]
    pub fn region(&self) -> &BoundingBox {
        &self.region
    }

    fn line(track: &Track, arena: &HitArena) -> Option<Ray> {
        let positioned = || {
            track
                .records(arena)
                .filter_map(|hit| hit.position.map(|position| (hit.layer, position)))
        };
        let (first_layer, earliest) = positioned().min_by_key(|(layer, _)| *layer)?;
        let (last_layer, latest) = positioned().max_by_key(|(layer, _)| *layer)?;
        (first_layer != last_layer).then(|| Ray::through(latest, earliest))
    }
}

impl TrackGate for FiducialGate {
    fn name(&self) -> &'static str {
        "fiducial"
    }

    fn accepts(&self, track: &Track, arena: &HitArena) -> bool {
        match Self::line(track, arena) {
            Some(ray) => self.region.intersects_ray(&ray),
            None => true,
        }
    }
}
