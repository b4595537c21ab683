//! Real-space helpers for fiducial checks.

use crate::Position;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Axis-aligned box in real space (mm).
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct BoundingBox {
    /// Lower corner.
    pub min: [f64; 3],
    /// Upper corner.
    pub max: [f64; 3],
}

/// Parametric line `origin + t * direction`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Ray {
    /// Point at `t = 0`.
    pub origin: [f64; 3],
    /// Direction, not necessarily normalized.
    pub direction: [f64; 3],
}

impl Ray {
    /// Ray starting at `from` and passing through `to` at `t = 1`.
    #[must_use]
    pub fn through(from: Position, to: Position) -> Self {
        Self {
            origin: from.to_array(),
            direction: [to.x - from.x, to.y - from.y, to.z - from.z],
        }
    }

    /// Point at parameter `t`.
    #[must_use]
    pub fn at(&self, t: f64) -> [f64; 3] {
        [
            self.origin[0] + t * self.direction[0],
            self.origin[1] + t * self.direction[1],
            self.origin[2] + t * self.direction[2],
        ]
    }

    /// Returns true if the direction vector is zero.
    #[must_use]
    pub fn is_degenerate(&self) -> bool {
        self.direction.iter().all(|&d| d == 0.0)
    }
}

impl BoundingBox {
    /// Creates a box from two corners in any order.
    #[must_use]
    pub fn new(a: [f64; 3], b: [f64; 3]) -> Self {
        Self {
            min: [a[0].min(b[0]), a[1].min(b[1]), a[2].min(b[2])],
            max: [a[0].max(b[0]), a[1].max(b[1]), a[2].max(b[2])],
        }
    }

    /// Returns true if `point` lies inside or on the box.
    #[must_use]
    pub fn contains(&self, point: [f64; 3]) -> bool {
        (0..3).all(|axis| point[axis] >= self.min[axis] && point[axis] <= self.max[axis])
    }

    /// Slab test of the infinite line carrying `ray`.
    ///
    /// Returns the entry and exit parameters, which may be negative.
    #[must_use]
    pub fn intersect_line(&self, ray: &Ray) -> Option<(f64, f64)> {
        let mut t_enter = f64::NEG_INFINITY;
        let mut t_exit = f64::INFINITY;

        for axis in 0..3 {
            let origin = ray.origin[axis];
            let direction = ray.direction[axis];
            if direction == 0.0 {
                // parallel to this slab
                if origin < self.min[axis] || origin > self.max[axis] {
                    return None;
                }
                continue;
            }
            let inv = 1.0 / direction;
            let mut t0 = (self.min[axis] - origin) * inv;
            let mut t1 = (self.max[axis] - origin) * inv;
            if t0 > t1 {
                std::mem::swap(&mut t0, &mut t1);
            }
            t_enter = t_enter.max(t0);
            t_exit = t_exit.min(t1);
            if t_enter > t_exit {
                return None;
            }
        }

        Some((t_enter, t_exit))
    }

    /// Slab test of the half-line `t >= 0`.
    #[must_use]
    pub fn intersects_ray(&self, ray: &Ray) -> bool {
        self.intersect_line(ray)
            .is_some_and(|(_, t_exit)| t_exit >= 0.0)
    }
}
