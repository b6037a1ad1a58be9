//! Axis-aligned and oriented bounds with SAT overlap testing
//!
//! Oriented bounds are the 8 world-space corners of a rotated box. Overlap
//! uses the separating axis theorem over the face normals and edge cross
//! products of both boxes.

use glam::Vec3;
use serde::{Deserialize, Serialize};

use super::rotation::AxisAngle;
use crate::core::types::Axis;

/// Axis-aligned box in an entity's local frame
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Aabb {
    pub min: Vec3,
    pub max: Vec3,
}

impl Aabb {
    pub const ZERO: Aabb = Aabb {
        min: Vec3::ZERO,
        max: Vec3::ZERO,
    };

    pub fn new(min: Vec3, max: Vec3) -> Self {
        Self { min, max }
    }

    /// Box centered on the local origin with the given full extents
    pub fn centered(size: Vec3) -> Self {
        Self {
            min: -size * 0.5,
            max: size * 0.5,
        }
    }

    pub fn size(&self) -> Vec3 {
        self.max - self.min
    }

    pub fn center(&self) -> Vec3 {
        (self.min + self.max) * 0.5
    }

    pub fn half_extents(&self) -> Vec3 {
        (self.max - self.min) * 0.5
    }

    /// Extent along one axis
    pub fn extent(&self, axis: Axis) -> f32 {
        self.max[axis.index()] - self.min[axis.index()]
    }

    /// Bounds scaled component-wise about the local origin
    pub fn scaled(&self, scale: Vec3) -> Aabb {
        Aabb {
            min: self.min * scale,
            max: self.max * scale,
        }
    }

    /// Bounds grown by a uniform margin on every face
    pub fn inflated(&self, margin: f32) -> Aabb {
        Aabb {
            min: self.min - Vec3::splat(margin),
            max: self.max + Vec3::splat(margin),
        }
    }

    /// Smallest box containing both
    pub fn union(&self, other: &Aabb) -> Aabb {
        Aabb {
            min: self.min.min(other.min),
            max: self.max.max(other.max),
        }
    }

    pub fn contains_point(&self, p: Vec3) -> bool {
        p.cmpge(self.min).all() && p.cmple(self.max).all()
    }

    /// True when `inner`, offset by `inner_pos`, fits inside `self` with
    /// `buffer` clearance on every face
    pub fn contains_with_buffer(&self, inner: &Aabb, inner_pos: Vec3, buffer: f32) -> bool {
        let lo = inner.min + inner_pos;
        let hi = inner.max + inner_pos;
        lo.cmpge(self.min + Vec3::splat(buffer)).all() && hi.cmple(self.max - Vec3::splat(buffer)).all()
    }
}

/// A rotated box in some shared frame, stored as center/half-extents/axes
#[derive(Debug, Clone, Copy)]
pub struct OrientedBounds {
    pub center: Vec3,
    pub half_extents: Vec3,
    /// Local x/y/z directions in the shared frame, unit length
    pub axes: [Vec3; 3],
}

impl OrientedBounds {
    /// Build from a local AABB placed at `position` with `rotation` and
    /// `scale` applied in that order
    pub fn from_local(local: &Aabb, position: Vec3, rotation: &AxisAngle, scale: Vec3) -> Self {
        let scaled = local.scaled(scale);
        let center = position + rotation.rotate(scaled.center());
        Self {
            center,
            half_extents: scaled.half_extents(),
            axes: [
                rotation.rotate(Vec3::X),
                rotation.rotate(Vec3::Y),
                rotation.rotate(Vec3::Z),
            ],
        }
    }

    /// Axis-aligned box (identity rotation)
    pub fn axis_aligned(aabb: &Aabb) -> Self {
        Self {
            center: aabb.center(),
            half_extents: aabb.half_extents(),
            axes: [Vec3::X, Vec3::Y, Vec3::Z],
        }
    }

    /// The 8 corners in the shared frame
    pub fn corners(&self) -> [Vec3; 8] {
        let mut out = [Vec3::ZERO; 8];
        let h = self.half_extents;
        for (i, corner) in out.iter_mut().enumerate() {
            let sx = if i & 1 == 0 { -1.0 } else { 1.0 };
            let sy = if i & 2 == 0 { -1.0 } else { 1.0 };
            let sz = if i & 4 == 0 { -1.0 } else { 1.0 };
            *corner = self.center
                + self.axes[0] * (sx * h.x)
                + self.axes[1] * (sy * h.y)
                + self.axes[2] * (sz * h.z);
        }
        out
    }

    /// Half-length of this box's projection onto a unit axis
    fn projected_radius(&self, axis: Vec3) -> f32 {
        self.half_extents.x * self.axes[0].dot(axis).abs()
            + self.half_extents.y * self.axes[1].dot(axis).abs()
            + self.half_extents.z * self.axes[2].dot(axis).abs()
    }

    /// True if the interiors overlap. Touching faces do not count.
    pub fn intersects(&self, other: &OrientedBounds) -> bool {
        let delta = other.center - self.center;

        let mut test = |axis: Vec3| -> bool {
            let len_sq = axis.length_squared();
            if len_sq < 1e-10 {
                // Degenerate cross product: axes were parallel, skip
                return true;
            }
            let axis = axis / len_sq.sqrt();
            let dist = delta.dot(axis).abs();
            dist < self.projected_radius(axis) + other.projected_radius(axis) - 1e-6
        };

        for a in self.axes {
            if !test(a) {
                return false;
            }
        }
        for b in other.axes {
            if !test(b) {
                return false;
            }
        }
        for a in self.axes {
            for b in other.axes {
                if !test(a.cross(b)) {
                    return false;
                }
            }
        }
        true
    }

    /// Fraction of this box's horizontal (x/z) footprint area that overlaps
    /// the other's, treating both as axis-aligned in the shared frame
    ///
    /// Used by the stacking rule; upright entities make the axis-aligned
    /// approximation exact.
    pub fn footprint_overlap_fraction(&self, other: &OrientedBounds) -> f32 {
        let (a_min, a_max) = self.aabb_in_frame();
        let (b_min, b_max) = other.aabb_in_frame();
        let ox = (a_max.x.min(b_max.x) - a_min.x.max(b_min.x)).max(0.0);
        let oz = (a_max.z.min(b_max.z) - a_min.z.max(b_min.z)).max(0.0);
        let own = (a_max.x - a_min.x) * (a_max.z - a_min.z);
        if own <= 0.0 {
            return 0.0;
        }
        (ox * oz) / own
    }

    /// Enclosing axis-aligned min/max in the shared frame
    pub fn aabb_in_frame(&self) -> (Vec3, Vec3) {
        let r = Vec3::new(
            self.projected_radius(Vec3::X),
            self.projected_radius(Vec3::Y),
            self.projected_radius(Vec3::Z),
        );
        (self.center - r, self.center + r)
    }
}

/// Closest point on the segment `[a, b]` to `p`
pub fn closest_point_on_segment(p: Vec3, a: Vec3, b: Vec3) -> Vec3 {
    let ab = b - a;
    let len_sq = ab.length_squared();
    if len_sq <= f32::EPSILON {
        return a;
    }
    let t = ((p - a).dot(ab) / len_sq).clamp(0.0, 1.0);
    a + ab * t
}

/// Squared distance from `p` to the segment `[a, b]`
pub fn point_to_segment_distance_squared(p: Vec3, a: Vec3, b: Vec3) -> f32 {
    (p - closest_point_on_segment(p, a, b)).length_squared()
}
