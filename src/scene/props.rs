//! Typed property bag for per-entity configuration
//!
//! Properties drive which rules apply to an entity: classification tags,
//! size limits, snap tables, relationship rules, auto-add flags. The engine
//! only reads them; the hosting application owns the schema and fills the
//! bag when it builds entities. Type mismatches are logged and treated as
//! absent rather than failing the whole evaluation.

use ahash::AHashMap;
use glam::Vec3;
use serde::{Deserialize, Serialize};

use crate::core::types::Axis;

/// Well-known property keys
pub mod keys {
    /// TextList: classification tags this entity carries
    pub const CLASSIFICATION: &str = "classification";
    /// Bool: child must stay inside its parent's bounds
    pub const MUST_FIT_PARENT: &str = "must_fit_parent";
    /// SizeLimits: min/max entity size per axis
    pub const SIZE_LIMITS: &str = "size_limits";
    /// Snap: per-axis snap configuration
    pub const SNAP: &str = "snap";
    /// Relationships: which neighboring classifications may touch this entity
    pub const RELATIONSHIPS: &str = "relationships";
    /// AutoAdd: auto-placement specs triggered by scale/move of this entity
    pub const AUTO_ADD: &str = "auto_add";
    /// Stack: classifications this entity may stack on top of
    pub const STACK: &str = "stack";
    /// Overhang: allowed overhang past the supporting entity's edge
    pub const OVERHANG: &str = "overhang";
    /// Bool: entity was synthesized by an auto-placement pass
    pub const AUTO_ADDED: &str = "auto_added";
    /// Bool: entity is a structural subpart, exempt from cascade correction
    pub const COMPLEX_SUBPART: &str = "complex_subpart";
}

/// Snap configuration for one axis
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum AxisSnap {
    /// Snap to the closest value in a sorted table, offset by a centering
    /// buffer
    Absolute { values: Vec<f32>, buffer: f32 },
    /// Snap to multiples of `step` from `buffer`, skipping excluded index
    /// ranges (inclusive start, inclusive end)
    Incremental {
        step: f32,
        buffer: f32,
        exclusions: Vec<(i32, i32)>,
    },
}

/// Per-axis snap configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SnapSpec {
    pub x: Option<AxisSnap>,
    pub y: Option<AxisSnap>,
    pub z: Option<AxisSnap>,
}

impl SnapSpec {
    pub fn axis(&self, axis: Axis) -> Option<&AxisSnap> {
        match axis {
            Axis::X => self.x.as_ref(),
            Axis::Y => self.y.as_ref(),
            Axis::Z => self.z.as_ref(),
        }
    }
}

/// How a relationship rule's count is interpreted
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CountModifier {
    Exact,
    AtLeast,
    AtMost,
    /// Zero contacts of any kind is itself legal (floating placement)
    None,
}

/// One permitted-contact declaration: which classification may touch this
/// entity and how many instances of it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RelationshipRule {
    pub classification: String,
    pub count: u32,
    pub modifier: CountModifier,
}

/// Auto-placement configuration carried by a host entity
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum AutoAddSpec {
    /// Distribute `tool` instances at `interval` across the host's length
    /// along `axis`
    Span {
        tool: String,
        axis: Axis,
        interval: f32,
    },
    /// Place `tool` at multiples of `step` along `axis`, validating each
    /// placement against collisions and overhang
    CollisionFit {
        tool: String,
        axis: Axis,
        step: f32,
    },
    /// Place `tool` at explicit local offsets
    Position { tool: String, offsets: Vec<Vec3> },
}

impl AutoAddSpec {
    pub fn tool(&self) -> &str {
        match self {
            AutoAddSpec::Span { tool, .. } => tool,
            AutoAddSpec::CollisionFit { tool, .. } => tool,
            AutoAddSpec::Position { tool, .. } => tool,
        }
    }
}

/// Stacking configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StackSpec {
    /// Classifications this entity may sit on top of
    pub targets: Vec<String>,
    /// Overrides the engine-wide minimum overlap fraction when set
    pub min_overlap: Option<f32>,
}

/// Overhang configuration
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct OverhangSpec {
    /// Maximum extent past the supporting entity's edge (world units)
    pub limit: f32,
    /// Whether the overhang rule may shrink this entity to fit instead of
    /// rejecting outright
    pub allow_shrink: bool,
}

/// Per-axis entity size limits
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SizeLimits {
    pub min: Vec3,
    pub max: Vec3,
}

/// A single typed property value
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum PropValue {
    Bool(bool),
    Float(f32),
    Vec3(Vec3),
    FloatList(Vec<f32>),
    Text(String),
    TextList(Vec<String>),
    Snap(SnapSpec),
    Relationships(Vec<RelationshipRule>),
    AutoAdd(Vec<AutoAddSpec>),
    Stack(StackSpec),
    Overhang(OverhangSpec),
    SizeLimits(SizeLimits),
}

/// String-keyed typed property storage
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PropertyBag {
    values: AHashMap<String, PropValue>,
}

macro_rules! typed_getter {
    ($name:ident, $variant:ident, $ty:ty) => {
        pub fn $name(&self, key: &str) -> Option<$ty> {
            match self.values.get(key) {
                Some(PropValue::$variant(v)) => Some(v),
                Some(other) => {
                    tracing::warn!(
                        key,
                        found = ?other,
                        concat!("property type mismatch, expected ", stringify!($variant))
                    );
                    None
                }
                None => None,
            }
        }
    };
}

impl PropertyBag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&mut self, key: impl Into<String>, value: PropValue) -> &mut Self {
        self.values.insert(key.into(), value);
        self
    }

    pub fn remove(&mut self, key: &str) -> Option<PropValue> {
        self.values.remove(key)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.values.contains_key(key)
    }

    pub fn get(&self, key: &str) -> Option<&PropValue> {
        self.values.get(key)
    }

    typed_getter!(float, Float, &f32);
    typed_getter!(vec3, Vec3, &Vec3);
    typed_getter!(float_list, FloatList, &Vec<f32>);
    typed_getter!(text, Text, &String);
    typed_getter!(text_list, TextList, &Vec<String>);
    typed_getter!(snap, Snap, &SnapSpec);
    typed_getter!(relationships, Relationships, &Vec<RelationshipRule>);
    typed_getter!(auto_add, AutoAdd, &Vec<AutoAddSpec>);
    typed_getter!(stack, Stack, &StackSpec);
    typed_getter!(overhang, Overhang, &OverhangSpec);
    typed_getter!(size_limits, SizeLimits, &SizeLimits);

    /// Bool properties default to false when absent
    pub fn flag(&self, key: &str) -> bool {
        match self.values.get(key) {
            Some(PropValue::Bool(v)) => *v,
            Some(other) => {
                tracing::warn!(key, found = ?other, "property type mismatch, expected Bool");
                false
            }
            None => false,
        }
    }

    /// Classification tags, empty when undeclared
    pub fn classifications(&self) -> &[String] {
        self.text_list(keys::CLASSIFICATION)
            .map(|v| v.as_slice())
            .unwrap_or(&[])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_typed_getter_returns_value() {
        let mut bag = PropertyBag::new();
        bag.set(keys::OVERHANG, PropValue::Overhang(OverhangSpec {
            limit: 0.1,
            allow_shrink: true,
        }));
        let spec = bag.overhang(keys::OVERHANG).unwrap();
        assert_eq!(spec.limit, 0.1);
    }

    #[test]
    fn test_type_mismatch_is_none() {
        let mut bag = PropertyBag::new();
        bag.set(keys::SIZE_LIMITS, PropValue::Bool(true));
        assert!(bag.size_limits(keys::SIZE_LIMITS).is_none());
    }

    #[test]
    fn test_flag_defaults_false() {
        let bag = PropertyBag::new();
        assert!(!bag.flag(keys::AUTO_ADDED));
    }

    #[test]
    fn test_classifications_empty_when_absent() {
        let bag = PropertyBag::new();
        assert!(bag.classifications().is_empty());
    }
}
