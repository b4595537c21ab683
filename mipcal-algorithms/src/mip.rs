//! Grouping of adjacent-strip hits into MIP candidate clusters.

use log::debug;
use mipcal_core::{HitId, MipCluster, MAX_MIP_HITS};

use crate::HitIndex;

/// Builds MIP clusters from the hits of one layer.
///
/// A candidate is an isolated run of strictly adjacent strips. Runs are grown
/// past the edges of the requested window so a wide deposit is never cut into
/// an apparently narrow one.
#[derive(Debug, Clone, Copy)]
pub struct MipClusterBuilder {
    max_energy: f32,
}

impl MipClusterBuilder {
    /// Create a builder with the given energy ceiling.
    #[must_use]
    pub fn new(max_energy: f32) -> Self {
        Self { max_energy }
    }

    /// Energy ceiling; a run at or above it is not a MIP.
    #[must_use]
    pub fn max_energy(&self) -> f32 {
        self.max_energy
    }

    /// MIP clusters touching the strip window `[low, up]` of `layer`.
    ///
    /// The window is clamped to the strip range first; a window lying wholly
    /// outside the range is empty. Clusters come back in ascending key order.
    #[must_use]
    pub fn build(&self, index: &HitIndex<'_>, layer: u32, low: i64, up: i64) -> Vec<MipCluster> {
        let scheme = index.scheme();
        if up < 0 || low > i64::from(scheme.num_strips()) || low > up {
            return Vec::new();
        }
        let (low_key, up_key) = scheme.window(layer, low, up);

        let mut strips: Vec<(u32, HitId)> = index
            .range(low_key, up_key)
            .map(|(key, id)| (scheme.strip_of(key), id))
            .collect();
        if strips.is_empty() {
            return Vec::new();
        }

        self.grow_edges(index, layer, &mut strips);

        let mut clusters = Vec::new();
        let mut run_start = 0;
        for i in 1..=strips.len() {
            let run_ends = i == strips.len() || strips[i].0 != strips[i - 1].0 + 1;
            if run_ends {
                if let Some(cluster) = self.classify(index, layer, &strips[run_start..i]) {
                    clusters.push(cluster);
                }
                run_start = i;
            }
        }
        clusters
    }

    /// Every MIP cluster of `layer`.
    #[must_use]
    pub fn build_layer(&self, index: &HitIndex<'_>, layer: u32) -> Vec<MipCluster> {
        self.build(index, layer, 0, i64::from(index.scheme().num_strips()))
    }

    /// Extends the outermost runs with indexed neighbours outside the window.
    fn grow_edges(&self, index: &HitIndex<'_>, layer: u32, strips: &mut Vec<(u32, HitId)>) {
        let scheme = index.scheme();

        let mut below = Vec::new();
        let mut strip = strips[0].0;
        while strip > 0 {
            match index.get(scheme.key(layer, strip - 1)) {
                Some(id) => below.push((strip - 1, id)),
                None => break,
            }
            strip -= 1;
        }
        if !below.is_empty() {
            below.reverse();
            strips.splice(0..0, below);
        }

        let mut strip = strips[strips.len() - 1].0;
        while strip < scheme.num_strips() {
            match index.get(scheme.key(layer, strip + 1)) {
                Some(id) => strips.push((strip + 1, id)),
                None => break,
            }
            strip += 1;
        }
    }

    fn classify(&self, index: &HitIndex<'_>, layer: u32, run: &[(u32, HitId)]) -> Option<MipCluster> {
        let (low_strip, up_strip) = (run[0].0, run[run.len() - 1].0);

        if run.len() > MAX_MIP_HITS {
            debug!(
                "Layer {layer} strips {low_strip}-{up_strip}: {} hits is too wide for a MIP",
                run.len()
            );
            return None;
        }

        let total_energy: f32 = run.iter().map(|&(_, id)| index.hit(id).energy).sum();
        if total_energy >= self.max_energy {
            debug!(
                "Layer {layer} strips {low_strip}-{up_strip}: energy {total_energy} too high for a MIP"
            );
            return None;
        }

        Some(MipCluster {
            section: index.section(),
            layer,
            low_strip,
            up_strip,
            total_energy,
            members: run.iter().map(|&(_, id)| id).collect(),
        })
    }
}
