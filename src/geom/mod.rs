//! Geometry utilities: axis-angle rotation and oriented-bounds math

pub mod bounds;
pub mod rotation;

pub use bounds::{
    Aabb, OrientedBounds, closest_point_on_segment, point_to_segment_distance_squared,
};
pub use rotation::AxisAngle;
