//! Axis-angle rotation with quaternion-based composition
//!
//! Rotations are stored as axis + angle because that is the form the scene
//! model exchanges with its callers, but all composition goes through
//! quaternions so the antiparallel-axis case stays exact.

use glam::{Quat, Vec3};
use serde::{Deserialize, Serialize};

/// Rotation about an arbitrary axis, angle in radians
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct AxisAngle {
    pub axis: Vec3,
    pub angle: f32,
}

impl AxisAngle {
    pub const IDENTITY: AxisAngle = AxisAngle {
        axis: Vec3::Y,
        angle: 0.0,
    };

    pub fn new(axis: Vec3, angle: f32) -> Self {
        Self { axis, angle }
    }

    /// Rotation about +Y, the common case for upright entities
    pub fn about_y(angle: f32) -> Self {
        Self {
            axis: Vec3::Y,
            angle,
        }
    }

    pub fn is_identity(&self) -> bool {
        self.angle.abs() < 1e-6 || self.axis.length_squared() < 1e-12
    }

    pub fn to_quat(&self) -> Quat {
        if self.is_identity() {
            return Quat::IDENTITY;
        }
        Quat::from_axis_angle(self.axis.normalize(), self.angle)
    }

    /// Recover axis + angle from a quaternion
    ///
    /// A near-identity quaternion has no well-defined axis; we return a zero
    /// rotation about +Y. An exact half-turn keeps whatever perpendicular
    /// axis the quaternion carries.
    pub fn from_quat(q: Quat) -> Self {
        let (axis, angle) = q.to_axis_angle();
        if angle.abs() < 1e-6 {
            return Self::IDENTITY;
        }
        Self { axis, angle }
    }

    /// Compose two rotations: `self` applied first, then `outer`
    pub fn then(&self, outer: &AxisAngle) -> AxisAngle {
        Self::from_quat(outer.to_quat() * self.to_quat())
    }

    /// Rotate a vector by this rotation
    pub fn rotate(&self, v: Vec3) -> Vec3 {
        self.to_quat() * v
    }

    /// Inverse rotation
    pub fn inverse(&self) -> AxisAngle {
        Self {
            axis: self.axis,
            angle: -self.angle,
        }
    }

    /// Rotation carrying unit vector `from` onto unit vector `to`
    ///
    /// Antiparallel inputs rotate by pi about a stable perpendicular axis
    /// instead of collapsing to a degenerate zero-axis result.
    pub fn between(from: Vec3, to: Vec3) -> AxisAngle {
        let from = from.normalize_or_zero();
        let to = to.normalize_or_zero();
        if from == Vec3::ZERO || to == Vec3::ZERO {
            return Self::IDENTITY;
        }
        let dot = from.dot(to).clamp(-1.0, 1.0);
        if dot > 1.0 - 1e-6 {
            return Self::IDENTITY;
        }
        if dot < -1.0 + 1e-6 {
            return Self {
                axis: from.any_orthonormal_vector(),
                angle: std::f32::consts::PI,
            };
        }
        Self {
            axis: from.cross(to).normalize(),
            angle: dot.acos(),
        }
    }
}

impl Default for AxisAngle {
    fn default() -> Self {
        Self::IDENTITY
    }
}

impl PartialEq for AxisAngle {
    fn eq(&self, other: &Self) -> bool {
        // Compare as rotations, not as raw fields
        self.to_quat().dot(other.to_quat()).abs() > 1.0 - 1e-6
    }
}
