//! Arena-backed scene tree
//!
//! Entities live in slot storage with stable indices; parent pointers and
//! child lists are kept per slot so reparenting is O(1) and zone-relative
//! transforms are derived on demand. Parent walks carry a cycle guard so a
//! corrupted tree degrades to an error instead of a hang.

use ahash::AHashMap;

use super::entity::{Entity, EntityKind, Transform};
use crate::core::error::{PlanError, Result};
use crate::core::types::EntityId;
use crate::geom::OrientedBounds;

#[derive(Debug, Default)]
struct Slot {
    entity: Option<Entity>,
    children: Vec<EntityId>,
}

/// The scene: a forest of zone-rooted entity trees
#[derive(Debug, Default)]
pub struct SceneTree {
    slots: Vec<Slot>,
    index: AHashMap<EntityId, usize>,
    free: Vec<usize>,
}

impl SceneTree {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert an entity. Its `parent` field must already name an entity in
    /// the tree (or be `None` for a zone root).
    pub fn insert(&mut self, entity: Entity) -> Result<EntityId> {
        if let Some(parent) = entity.parent {
            if !self.index.contains_key(&parent) {
                return Err(PlanError::EntityNotFound(parent));
            }
        }
        let id = entity.id;
        let slot_idx = match self.free.pop() {
            Some(idx) => {
                self.slots[idx] = Slot {
                    entity: Some(entity),
                    children: Vec::new(),
                };
                idx
            }
            None => {
                self.slots.push(Slot {
                    entity: Some(entity),
                    children: Vec::new(),
                });
                self.slots.len() - 1
            }
        };
        self.index.insert(id, slot_idx);
        if let Some(parent) = self.get(id).ok().and_then(|e| e.parent) {
            let pidx = self.index[&parent];
            self.slots[pidx].children.push(id);
        }
        Ok(id)
    }

    fn slot_of(&self, id: EntityId) -> Result<usize> {
        self.index
            .get(&id)
            .copied()
            .ok_or(PlanError::EntityNotFound(id))
    }

    pub fn contains(&self, id: EntityId) -> bool {
        self.index.contains_key(&id)
    }

    pub fn get(&self, id: EntityId) -> Result<&Entity> {
        let idx = self.slot_of(id)?;
        self.slots[idx]
            .entity
            .as_ref()
            .ok_or(PlanError::EntityNotFound(id))
    }

    pub fn get_mut(&mut self, id: EntityId) -> Result<&mut Entity> {
        let idx = self.slot_of(id)?;
        self.slots[idx]
            .entity
            .as_mut()
            .ok_or(PlanError::EntityNotFound(id))
    }

    pub fn children(&self, id: EntityId) -> &[EntityId] {
        match self.index.get(&id) {
            Some(&idx) => &self.slots[idx].children,
            None => &[],
        }
    }

    /// All entity ids currently in the tree
    pub fn ids(&self) -> impl Iterator<Item = EntityId> + '_ {
        self.index.keys().copied()
    }

    pub fn len(&self) -> usize {
        self.index.len()
    }

    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    /// Ids of `id` and every entity beneath it, depth-first
    pub fn subtree(&self, id: EntityId) -> Vec<EntityId> {
        let mut out = Vec::new();
        let mut stack = vec![id];
        while let Some(next) = stack.pop() {
            if !self.contains(next) {
                continue;
            }
            out.push(next);
            stack.extend(self.children(next).iter().copied());
        }
        out
    }

    /// Remove an entity and its whole subtree, returning the removed
    /// entities (root first)
    pub fn remove_subtree(&mut self, id: EntityId) -> Result<Vec<Entity>> {
        let ids = self.subtree(id);
        if ids.is_empty() {
            return Err(PlanError::EntityNotFound(id));
        }
        // Unlink the root from its parent's child list
        if let Some(parent) = self.get(id)?.parent {
            let pidx = self.slot_of(parent)?;
            self.slots[pidx].children.retain(|c| *c != id);
        }
        let mut removed = Vec::with_capacity(ids.len());
        for rid in ids {
            let idx = self.slot_of(rid)?;
            if let Some(entity) = self.slots[idx].entity.take() {
                removed.push(entity);
            }
            self.slots[idx].children.clear();
            self.index.remove(&rid);
            self.free.push(idx);
        }
        Ok(removed)
    }

    /// Move `child` under `new_parent`, keeping its local transform as-is.
    /// Rejects cycles (reparenting under one's own descendant) and zone
    /// roots.
    pub fn reparent(&mut self, child: EntityId, new_parent: EntityId) -> Result<()> {
        if self.get(child)?.kind == EntityKind::Zone {
            return Err(PlanError::InvalidReparent {
                child,
                parent: new_parent,
                reason: "zone roots cannot be reparented".into(),
            });
        }
        if self.subtree(child).contains(&new_parent) {
            return Err(PlanError::InvalidReparent {
                child,
                parent: new_parent,
                reason: "new parent is a descendant of the child".into(),
            });
        }
        let old_parent = self.get(child)?.parent;
        if let Some(old) = old_parent {
            let oidx = self.slot_of(old)?;
            self.slots[oidx].children.retain(|c| *c != child);
        }
        let nidx = self.slot_of(new_parent)?;
        self.slots[nidx].children.push(child);
        self.get_mut(child)?.parent = Some(new_parent);
        Ok(())
    }

    /// The zone root containing `id`
    pub fn zone_of(&self, id: EntityId) -> Result<EntityId> {
        let mut current = id;
        let mut hops = 0;
        loop {
            let entity = self.get(current)?;
            match entity.parent {
                None => {
                    return if entity.kind == EntityKind::Zone {
                        Ok(current)
                    } else {
                        Err(PlanError::MissingZone(id))
                    };
                }
                Some(parent) => {
                    hops += 1;
                    if hops > self.len() {
                        tracing::warn!(?id, "parent chain does not terminate");
                        return Err(PlanError::CycleDetected(id));
                    }
                    current = parent;
                }
            }
        }
    }

    /// Transform of the entity's parent frame expressed in zone coordinates
    ///
    /// Composing an entity's local transform with this yields its
    /// zone-relative placement. For zone roots this is the identity.
    pub fn parent_zone_transform(&self, id: EntityId) -> Result<Transform> {
        match self.get(id)?.parent {
            None => Ok(Transform::IDENTITY),
            Some(parent) => self.zone_transform(parent),
        }
    }

    /// The entity's own transform expressed in zone coordinates
    pub fn zone_transform(&self, id: EntityId) -> Result<Transform> {
        let mut chain = Vec::new();
        let mut current = id;
        let mut hops = 0;
        loop {
            let entity = self.get(current)?;
            chain.push(entity.transform);
            match entity.parent {
                None => break,
                Some(parent) => {
                    hops += 1;
                    if hops > self.len() {
                        tracing::warn!(?id, "parent chain does not terminate");
                        return Err(PlanError::CycleDetected(id));
                    }
                    current = parent;
                }
            }
        }
        // chain is leaf-to-root; fold root-down
        let mut acc = Transform::IDENTITY;
        for t in chain.iter().rev() {
            acc = t.compose(&acc);
        }
        Ok(acc)
    }

    /// Entity bounds as an oriented box in zone coordinates
    pub fn world_bounds(&self, id: EntityId) -> Result<OrientedBounds> {
        let entity = self.get(id)?;
        self.world_bounds_with(id, &entity.transform)
    }

    /// Like [`world_bounds`](Self::world_bounds) but with the entity's local
    /// transform replaced, without touching stored state
    pub fn world_bounds_with(&self, id: EntityId, local: &Transform) -> Result<OrientedBounds> {
        let entity = self.get(id)?;
        let zone = local.compose(&self.parent_zone_transform(id)?);
        Ok(OrientedBounds::from_local(
            &entity.bounds,
            zone.position,
            &zone.rotation,
            zone.scale,
        ))
    }
}
