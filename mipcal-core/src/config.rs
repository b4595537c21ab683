//! Track finder configuration.

use crate::{Error, KeyScheme, Result};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Which layer the seed finder falls back to once its current layer is spent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum SeedPolicy {
    /// Lowest layer not yet exhausted.
    #[default]
    Lowest,
    /// Lower median of the layers not yet exhausted.
    Median,
}

/// How the extender chooses among several MIP clusters in one search window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum AmbiguityPolicy {
    /// Keep the cluster with the lowest principal key.
    #[default]
    LowestKey,
    /// Keep the cluster whose strip centre is closest to the projected track
    /// centre; ties go to the lowest key.
    NearestCenter,
}

/// Configuration for the MIP track finder.
///
/// All thresholds are resolved numbers; reading them from a file is the
/// caller's business.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct TrackingConfig {
    /// Number of layers per section; layers are numbered `1..=num_layers`.
    pub num_layers: u32,
    /// Highest strip index; strips are numbered `0..=num_strips`.
    pub num_strips: u32,
    /// Key modulus; must exceed `num_strips`. Derived when `None`.
    pub layer_modulus: Option<u32>,
    /// Hits at or below this photo-electron yield are noise.
    pub min_pe: f32,
    /// Clusters at or above this summed energy are not MIPs.
    pub max_energy: f32,
    /// Layer searched first for a seed in every section.
    pub first_seed_layer: u32,
    /// Number of layers on each side of the seed covered by the cone.
    pub cone_depth: u32,
    /// Strip opening of the cone across `2 * cone_depth` layers.
    pub cone_angle: f64,
    /// Minimum number of hits the cone must collect.
    pub min_cone_hits: usize,
    /// Strip width of the extension search window.
    pub track_width: u32,
    /// A track must hit strictly more distinct layers than this.
    pub min_track_layer_hits: usize,
    /// Stop searching an event after this many tracks.
    pub max_track_count: usize,
    /// Seed layer fallback policy.
    pub seed_policy: SeedPolicy,
    /// Tie-break for ambiguous extension matches.
    pub ambiguity_policy: AmbiguityPolicy,
}

impl Default for TrackingConfig {
    fn default() -> Self {
        Self {
            num_layers: 81,
            num_strips: 34,
            layer_modulus: None,
            min_pe: 5.5,
            max_energy: 4000.0,
            first_seed_layer: 1,
            cone_depth: 3,
            cone_angle: 3.0,
            min_cone_hits: 3,
            track_width: 6,
            min_track_layer_hits: 20,
            max_track_count: 100,
            seed_policy: SeedPolicy::Lowest,
            ambiguity_policy: AmbiguityPolicy::LowestKey,
        }
    }
}

impl TrackingConfig {
    /// Creates a configuration with default values.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the detector geometry.
    #[must_use]
    pub fn with_geometry(mut self, num_layers: u32, num_strips: u32) -> Self {
        self.num_layers = num_layers;
        self.num_strips = num_strips;
        self
    }

    /// Sets an explicit key modulus.
    #[must_use]
    pub fn with_layer_modulus(mut self, modulus: u32) -> Self {
        self.layer_modulus = Some(modulus);
        self
    }

    /// Sets the noise threshold.
    #[must_use]
    pub fn with_min_pe(mut self, min_pe: f32) -> Self {
        self.min_pe = min_pe;
        self
    }

    /// Sets the MIP energy ceiling.
    #[must_use]
    pub fn with_max_energy(mut self, max_energy: f32) -> Self {
        self.max_energy = max_energy;
        self
    }

    /// Sets the first seed layer.
    #[must_use]
    pub fn with_first_seed_layer(mut self, layer: u32) -> Self {
        self.first_seed_layer = layer;
        self
    }

    /// Sets the search cone shape.
    #[must_use]
    pub fn with_cone(mut self, depth: u32, angle: f64, min_hits: usize) -> Self {
        self.cone_depth = depth;
        self.cone_angle = angle;
        self.min_cone_hits = min_hits;
        self
    }

    /// Sets the extension window width.
    #[must_use]
    pub fn with_track_width(mut self, width: u32) -> Self {
        self.track_width = width;
        self
    }

    /// Sets the acceptance threshold on distinct layers.
    #[must_use]
    pub fn with_min_track_layer_hits(mut self, layers: usize) -> Self {
        self.min_track_layer_hits = layers;
        self
    }

    /// Sets the per-event track cap.
    #[must_use]
    pub fn with_max_track_count(mut self, count: usize) -> Self {
        self.max_track_count = count;
        self
    }

    /// Sets the seed policy.
    #[must_use]
    pub fn with_seed_policy(mut self, policy: SeedPolicy) -> Self {
        self.seed_policy = policy;
        self
    }

    /// Sets the ambiguity policy.
    #[must_use]
    pub fn with_ambiguity_policy(mut self, policy: AmbiguityPolicy) -> Self {
        self.ambiguity_policy = policy;
        self
    }

    /// Effective key modulus, or `None` if no power of ten above the strip
    /// count fits in a `u32`.
    #[must_use]
    pub fn modulus(&self) -> Option<u32> {
        self.layer_modulus
            .or_else(|| KeyScheme::default_modulus(self.num_strips))
    }

    /// Key scheme implied by this configuration.
    ///
    /// # Errors
    /// Returns [`Error::InvalidConfig`] if no modulus can be derived or the
    /// modulus does not exceed the strip count.
    pub fn key_scheme(&self) -> Result<KeyScheme> {
        let modulus = self.modulus().ok_or_else(|| {
            Error::InvalidConfig(format!(
                "no layer modulus fits num_strips {}",
                self.num_strips
            ))
        })?;
        KeyScheme::new(modulus, self.num_strips).ok_or_else(|| {
            Error::InvalidConfig(format!(
                "layer modulus {modulus} must exceed the strip count {}",
                self.num_strips
            ))
        })
    }

    /// Checks every parameter for consistency.
    ///
    /// # Errors
    /// Returns [`Error::InvalidConfig`] naming the first offending parameter.
    pub fn validate(&self) -> Result<()> {
        if self.num_layers == 0 {
            return Err(invalid("num_layers must be at least 1"));
        }
        if self.num_strips == 0 {
            return Err(invalid("num_strips must be at least 1"));
        }
        self.key_scheme()?;
        if !(1..=self.num_layers).contains(&self.first_seed_layer) {
            return Err(Error::InvalidConfig(format!(
                "first_seed_layer {} outside 1..={}",
                self.first_seed_layer, self.num_layers
            )));
        }
        if self.cone_depth == 0 {
            return Err(invalid("cone_depth must be at least 1"));
        }
        if !self.cone_angle.is_finite() || self.cone_angle < 0.0 {
            return Err(Error::InvalidConfig(format!(
                "cone_angle must be finite and non-negative, got {}",
                self.cone_angle
            )));
        }
        if self.track_width == 0 {
            return Err(invalid("track_width must be at least 1"));
        }
        if self.max_track_count == 0 {
            return Err(invalid("max_track_count must be at least 1"));
        }
        if !self.min_pe.is_finite() {
            return Err(invalid("min_pe must be finite"));
        }
        if !self.max_energy.is_finite() || self.max_energy <= 0.0 {
            return Err(Error::InvalidConfig(format!(
                "max_energy must be finite and positive, got {}",
                self.max_energy
            )));
        }
        Ok(())
    }
}

fn invalid(message: &str) -> Error {
    Error::InvalidConfig(message.to_string())
}
