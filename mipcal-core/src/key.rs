//! Composite (layer, strip) keys.
//!
//! Keys pack a layer and a strip into one integer so that an ordered map over
//! keys is also ordered lexicographically by (layer, strip). Range queries over
//! a single layer then become contiguous key ranges.

use std::fmt;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Packed `layer * modulus + strip` key within one section.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct HitKey(pub u64);

impl HitKey {
    /// Returns the raw key value.
    #[inline]
    #[must_use]
    pub fn as_u64(self) -> u64 {
        self.0
    }
}

impl fmt::Display for HitKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Key generator for one detector geometry.
///
/// The modulus must exceed the largest strip index so that distinct
/// (layer, strip) pairs never collide.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeyScheme {
    modulus: u64,
    num_strips: u32,
}

impl KeyScheme {
    /// Creates a key scheme.
    ///
    /// Returns `None` if `modulus <= num_strips`.
    #[must_use]
    pub fn new(modulus: u32, num_strips: u32) -> Option<Self> {
        (modulus > num_strips).then_some(Self {
            modulus: u64::from(modulus),
            num_strips,
        })
    }

    /// Smallest power of ten strictly greater than `num_strips`, or `None`
    /// when that power does not fit in a `u32`.
    #[must_use]
    pub fn default_modulus(num_strips: u32) -> Option<u32> {
        let mut modulus: u32 = 10;
        while modulus <= num_strips {
            modulus = modulus.checked_mul(10)?;
        }
        Some(modulus)
    }

    /// Layer modulus.
    #[inline]
    #[must_use]
    pub fn modulus(&self) -> u64 {
        self.modulus
    }

    /// Highest valid strip index.
    #[inline]
    #[must_use]
    pub fn num_strips(&self) -> u32 {
        self.num_strips
    }

    /// Key of a (layer, strip) pair.
    #[inline]
    #[must_use]
    pub fn key(&self, layer: u32, strip: u32) -> HitKey {
        HitKey(u64::from(layer) * self.modulus + u64::from(strip))
    }

    /// Layer encoded in a key.
    #[inline]
    #[must_use]
    #[allow(clippy::cast_possible_truncation)]
    pub fn layer_of(&self, key: HitKey) -> u32 {
        (key.0 / self.modulus) as u32
    }

    /// Strip encoded in a key.
    #[inline]
    #[must_use]
    #[allow(clippy::cast_possible_truncation)]
    pub fn strip_of(&self, key: HitKey) -> u32 {
        (key.0 % self.modulus) as u32
    }

    /// Inclusive key bounds covering every strip of `layer`.
    #[inline]
    #[must_use]
    pub fn layer_bounds(&self, layer: u32) -> (HitKey, HitKey) {
        (self.key(layer, 0), self.key(layer, self.num_strips))
    }

    /// Inclusive key bounds for a strip window, clamped to `[0, num_strips]`.
    #[must_use]
    pub fn window(&self, layer: u32, low_strip: i64, up_strip: i64) -> (HitKey, HitKey) {
        let low = self.clamp_strip(low_strip);
        let up = self.clamp_strip(up_strip);
        (self.key(layer, low), self.key(layer, up))
    }

    /// Clamps a (possibly negative) strip number into `[0, num_strips]`.
    #[inline]
    #[must_use]
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    pub fn clamp_strip(&self, strip: i64) -> u32 {
        strip.clamp(0, i64::from(self.num_strips)) as u32
    }
}
