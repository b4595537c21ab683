//! MIP candidate clusters.

use crate::{HitId, HitKey, KeyScheme, Section};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Maximum number of adjacent-strip hits a MIP deposit may span.
pub const MAX_MIP_HITS: usize = 2;

/// A group of adjacent-strip hits in one layer compatible with a MIP.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct MipCluster {
    /// Section of every member.
    pub section: Section,
    /// Layer of every member.
    pub layer: u32,
    /// Lowest member strip.
    pub low_strip: u32,
    /// Highest member strip.
    pub up_strip: u32,
    /// Summed member energy.
    pub total_energy: f32,
    /// Member hits in strip order.
    pub members: Vec<HitId>,
}

impl MipCluster {
    /// Principal key of the cluster (key of its lowest strip).
    #[inline]
    #[must_use]
    pub fn key(&self, scheme: &KeyScheme) -> HitKey {
        scheme.key(self.layer, self.low_strip)
    }

    /// Strip centre of the cluster.
    #[inline]
    #[must_use]
    pub fn center_strip(&self) -> f64 {
        (f64::from(self.low_strip) + f64::from(self.up_strip)) / 2.0
    }

    /// Number of member hits.
    #[must_use]
    pub fn len(&self) -> usize {
        self.members.len()
    }

    /// Returns true if the cluster has no members.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    /// Strip span, counting both ends.
    #[must_use]
    pub fn width(&self) -> u32 {
        self.up_strip - self.low_strip + 1
    }
}
