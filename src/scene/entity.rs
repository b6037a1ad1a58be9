//! Scene entities and their local transforms

use glam::Vec3;
use serde::{Deserialize, Serialize};

use super::props::{PropertyBag, keys};
use crate::core::types::EntityId;
use crate::geom::{Aabb, AxisAngle};

/// What role an entity plays in the scene tree
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EntityKind {
    /// Root coordinate frame (wall, floor). No parent.
    Zone,
    /// Structural wall segment inside a zone
    SegmentWall,
    /// Positionable product
    Product,
    /// Corner point between wall segments
    Vertex,
}

/// Local transform, always relative to the immediate parent
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Transform {
    pub position: Vec3,
    pub rotation: AxisAngle,
    pub scale: Vec3,
}

impl Transform {
    pub const IDENTITY: Transform = Transform {
        position: Vec3::ZERO,
        rotation: AxisAngle::IDENTITY,
        scale: Vec3::ONE,
    };

    pub fn at(position: Vec3) -> Self {
        Self {
            position,
            ..Self::IDENTITY
        }
    }

    /// Compose with a parent transform: maps this local frame into the
    /// parent's parent frame
    pub fn compose(&self, parent: &Transform) -> Transform {
        Transform {
            position: parent.position + parent.rotation.rotate(self.position * parent.scale),
            rotation: self.rotation.then(&parent.rotation),
            // Scale does not accumulate down the tree: child bounds are
            // authored in absolute units, only positions inherit scale.
            scale: self.scale,
        }
    }

    /// Map a local point into the frame this transform is expressed in
    pub fn apply(&self, p: Vec3) -> Vec3 {
        self.position + self.rotation.rotate(p * self.scale)
    }
}

impl Default for Transform {
    fn default() -> Self {
        Self::IDENTITY
    }
}

/// A node in the scene tree
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Entity {
    pub id: EntityId,
    pub parent: Option<EntityId>,
    pub kind: EntityKind,
    pub transform: Transform,
    /// Local bounds before scale is applied
    pub bounds: Aabb,
    pub props: PropertyBag,
}

impl Entity {
    pub fn new(kind: EntityKind) -> Self {
        Self {
            id: EntityId::new(),
            parent: None,
            kind,
            transform: Transform::IDENTITY,
            bounds: Aabb::ZERO,
            props: PropertyBag::new(),
        }
    }

    pub fn with_bounds(mut self, bounds: Aabb) -> Self {
        self.bounds = bounds;
        self
    }

    pub fn with_transform(mut self, transform: Transform) -> Self {
        self.transform = transform;
        self
    }

    /// Effective local bounds with the current scale applied
    pub fn scaled_bounds(&self) -> Aabb {
        self.bounds.scaled(self.transform.scale)
    }

    pub fn is_auto_added(&self) -> bool {
        self.props.flag(keys::AUTO_ADDED)
    }

    pub fn is_complex_subpart(&self) -> bool {
        self.props.flag(keys::COMPLEX_SUBPART)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f32::consts::FRAC_PI_2;

    #[test]
    fn test_transform_compose_translation() {
        let child = Transform::at(Vec3::new(1.0, 0.0, 0.0));
        let parent = Transform::at(Vec3::new(0.0, 2.0, 0.0));
        let composed = child.compose(&parent);
        assert!((composed.position - Vec3::new(1.0, 2.0, 0.0)).length() < 1e-5);
    }

    #[test]
    fn test_transform_compose_rotation() {
        let child = Transform::at(Vec3::new(1.0, 0.0, 0.0));
        let parent = Transform {
            position: Vec3::ZERO,
            rotation: AxisAngle::about_y(FRAC_PI_2),
            scale: Vec3::ONE,
        };
        let composed = child.compose(&parent);
        assert!((composed.position - Vec3::new(0.0, 0.0, -1.0)).length() < 1e-5);
    }

    #[test]
    fn test_scaled_bounds() {
        let mut e = Entity::new(EntityKind::Product).with_bounds(Aabb::centered(Vec3::splat(2.0)));
        e.transform.scale = Vec3::new(2.0, 1.0, 1.0);
        let b = e.scaled_bounds();
        assert_eq!(b.size(), Vec3::new(4.0, 2.0, 2.0));
    }
}
