//! Evaluation context and per-gesture state

use ahash::AHashMap;

use crate::autoplace::EntityBuilder;
use crate::collision::CollisionChecker;
use crate::core::config::EngineConfig;
use crate::core::types::{Axis, EntityId};
use crate::feedback::FeedbackSink;
use crate::scene::{Entity, SceneTree};

/// Mutable state scoped to one logical drag gesture
///
/// Created at drag start, discarded at drag end. Holds the sticky-snap
/// index cache and auto-add children side-pocketed during transient
/// evaluation. Nothing in here survives an abandoned gesture.
#[derive(Debug, Default)]
pub struct GestureState {
    sticky: AHashMap<(EntityId, Axis), i32>,
    pocketed: AHashMap<EntityId, Vec<Entity>>,
}

impl GestureState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Settled snap index for an entity's axis, if any
    pub fn sticky_index(&self, entity: EntityId, axis: Axis) -> Option<i32> {
        self.sticky.get(&(entity, axis)).copied()
    }

    pub fn set_sticky_index(&mut self, entity: EntityId, axis: Axis, index: i32) {
        self.sticky.insert((entity, axis), index);
    }

    /// Stash auto-add children removed for the duration of the drag,
    /// keyed by their host
    pub fn pocket(&mut self, host: EntityId, children: Vec<Entity>) {
        self.pocketed.entry(host).or_default().extend(children);
    }

    /// Reclaim side-pocketed children for final placement or restoration
    pub fn take_pocketed(&mut self, host: EntityId) -> Vec<Entity> {
        self.pocketed.remove(&host).unwrap_or_default()
    }

    pub fn has_pocketed(&self, host: EntityId) -> bool {
        self.pocketed.get(&host).map(|v| !v.is_empty()).unwrap_or(false)
    }

    /// Drop all gesture state; call when the drag ends or is abandoned
    pub fn end_gesture(&mut self) {
        self.sticky.clear();
        self.pocketed.clear();
    }
}

/// Everything a rule may touch during one evaluation
///
/// Owned borrows only; no rule reaches global state. The collision checker
/// is created fresh per evaluation so surrogate overlays cannot leak
/// between commands.
pub struct EvalContext<'a> {
    pub tree: &'a mut SceneTree,
    pub checker: CollisionChecker,
    pub gesture: &'a mut GestureState,
    pub feedback: &'a dyn FeedbackSink,
    pub builder: &'a dyn EntityBuilder,
    pub config: &'a EngineConfig,
}

impl<'a> EvalContext<'a> {
    pub fn new(
        tree: &'a mut SceneTree,
        gesture: &'a mut GestureState,
        feedback: &'a dyn FeedbackSink,
        builder: &'a dyn EntityBuilder,
        config: &'a EngineConfig,
    ) -> Self {
        Self {
            tree,
            checker: CollisionChecker::new(),
            gesture,
            feedback,
            builder,
            config,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::Vec3;

    use crate::geom::Aabb;
    use crate::scene::EntityKind;

    #[test]
    fn test_sticky_cache_round_trip() {
        let mut g = GestureState::new();
        let id = EntityId::new();
        assert_eq!(g.sticky_index(id, Axis::X), None);
        g.set_sticky_index(id, Axis::X, 3);
        assert_eq!(g.sticky_index(id, Axis::X), Some(3));
        assert_eq!(g.sticky_index(id, Axis::Y), None);
        g.end_gesture();
        assert_eq!(g.sticky_index(id, Axis::X), None);
    }

    #[test]
    fn test_pocketed_children() {
        let mut g = GestureState::new();
        let host = EntityId::new();
        let child = Entity::new(EntityKind::Product).with_bounds(Aabb::centered(Vec3::ONE));
        g.pocket(host, vec![child]);
        assert!(g.has_pocketed(host));
        let out = g.take_pocketed(host);
        assert_eq!(out.len(), 1);
        assert!(!g.has_pocketed(host));
    }
}
