//! Engine configuration with documented constants
//!
//! All magic numbers are collected here with explanations of their purpose
//! and how they interact with each other.

/// Configuration for the constraint-evaluation engine
///
/// These values have been tuned against real planogram layouts.
/// Changing them affects how aggressively corrections fire.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    // === STACKING ===
    /// Vertical sink applied when re-seating a stacked entity (world units)
    ///
    /// The stacked entity is placed at target-top + |own bottom| minus this
    /// epsilon so the two bounds register as touching for subsequent
    /// collision queries instead of floating a hair apart.
    pub stack_epsilon: f32,

    /// Minimum fraction of the candidate's footprint that must overlap the
    /// stack target before a stack re-parent is accepted
    ///
    /// Below this threshold the drop is treated as a normal placement next
    /// to the target rather than on top of it.
    pub min_stack_overlap: f32,

    // === CONTAINMENT ===
    /// Gap kept between a contained child's bounds and its parent's bounds
    /// (world units, per axis)
    pub containment_buffer: f32,

    /// How far a parent may shrink past its children's combined envelope
    /// before the parent's own scale gets clamped (world units)
    ///
    /// Children flush with the parent edge stay legal within this tolerance.
    pub edge_tolerance: f32,

    // === SNAPPING ===
    /// Fraction of a snap step the raw value must travel past the midpoint
    /// toward the neighboring index before a settled sticky index releases
    ///
    /// 0.0 releases exactly at the midpoint; larger values resist jitter
    /// harder but make the drag feel heavier. Keep well below 0.5.
    pub sticky_hysteresis: f32,

    // === OVERHANG ===
    /// Default allowed overhang past a supporting entity's edge when the
    /// entity declares no overhang limit of its own (world units)
    pub default_overhang_limit: f32,

    // === COLLISION ===
    /// Margin added to the candidate's bounds for "extended" collision
    /// queries (world units)
    ///
    /// Used by rules that need to know about near-contacts, e.g. finding
    /// the supports an overhanging shelf should shrink between.
    pub extended_margin: f32,

    /// Two floats closer than this are considered equal in geometric
    /// comparisons
    pub geom_epsilon: f32,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            stack_epsilon: 0.001,
            min_stack_overlap: 0.5,
            containment_buffer: 0.0,
            edge_tolerance: 0.01,
            sticky_hysteresis: 0.15,
            default_overhang_limit: 0.05,
            extended_margin: 0.02,
            geom_epsilon: 1e-5,
        }
    }
}
