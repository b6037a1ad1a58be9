//! Collision queries against the scene tree
//!
//! All queries are what-if: the candidate transform comes from the command
//! (start or end state, selectable) and never touches persisted entities.
//! Surrogate overlays extend that to third parties: a temporary transform
//! override for any entity, pushed for the duration of one query scope and
//! guaranteed to be cleared afterwards.

use ahash::AHashMap;

use crate::command::{Command, CommandKind};
use crate::core::error::{PlanError, Result};
use crate::core::types::EntityId;
use crate::geom::OrientedBounds;
use crate::scene::{SceneTree, Transform};

/// Query options for [`CollisionChecker::check`]
#[derive(Debug, Clone, Copy, Default)]
pub struct CheckOptions {
    /// Also report collisions with the candidate's own descendants
    pub include_children: bool,
    /// Inflate the candidate bounds by this margin (near-contact queries)
    pub extended_margin: f32,
    /// Evaluate the command's start geometry instead of its end geometry
    pub use_start_state: bool,
}

/// Collision query engine with surrogate overlays
#[derive(Debug, Default)]
pub struct CollisionChecker {
    surrogates: AHashMap<EntityId, Transform>,
}

impl CollisionChecker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Temporarily override an entity's local transform for subsequent
    /// queries. Must be paired with removal; prefer
    /// [`with_surrogates`](Self::with_surrogates).
    pub fn push_surrogate(&mut self, id: EntityId, transform: Transform) {
        tracing::debug!(?id, "surrogate pushed");
        self.surrogates.insert(id, transform);
    }

    pub fn remove_surrogate(&mut self, id: EntityId) {
        self.surrogates.remove(&id);
    }

    pub fn clear_surrogates(&mut self) {
        if !self.surrogates.is_empty() {
            tracing::debug!(count = self.surrogates.len(), "surrogates cleared");
            self.surrogates.clear();
        }
    }

    pub fn has_surrogates(&self) -> bool {
        !self.surrogates.is_empty()
    }

    /// Run `f` with the given overlays applied, clearing them on every exit
    /// path so they cannot leak into unrelated queries
    pub fn with_surrogates<T>(
        &mut self,
        overlays: &[(EntityId, Transform)],
        f: impl FnOnce(&mut Self) -> T,
    ) -> T {
        for (id, t) in overlays {
            self.push_surrogate(*id, *t);
        }
        let out = f(self);
        for (id, _) in overlays {
            self.remove_surrogate(*id);
        }
        out
    }

    /// Zone-frame transform of `id` with surrogate overlays applied along
    /// the whole parent chain, so an overlaid ancestor carries its subtree
    /// with it
    fn effective_zone_transform(&self, tree: &SceneTree, id: EntityId) -> Result<Transform> {
        let mut chain = Vec::new();
        let mut current = id;
        let mut hops = 0;
        loop {
            let entity = tree.get(current)?;
            let local = self
                .surrogates
                .get(&current)
                .copied()
                .unwrap_or(entity.transform);
            chain.push(local);
            match entity.parent {
                None => break,
                Some(parent) => {
                    hops += 1;
                    if hops > tree.len() {
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

    /// World bounds of `id` honoring surrogate overlays
    fn effective_bounds(&self, tree: &SceneTree, id: EntityId) -> Result<OrientedBounds> {
        let entity = tree.get(id)?;
        let zone = self.effective_zone_transform(tree, id)?;
        Ok(OrientedBounds::from_local(
            &entity.bounds,
            zone.position,
            &zone.rotation,
            zone.scale,
        ))
    }

    /// Candidate bounds for the command's target under the selected state
    fn candidate_bounds(
        &self,
        tree: &SceneTree,
        cmd: &Command,
        opts: CheckOptions,
    ) -> Result<OrientedBounds> {
        let (transform, parent) = if opts.use_start_state {
            (cmd.start, cmd.start_parent)
        } else {
            (cmd.end, cmd.end_parent)
        };
        let entity = tree.get(cmd.target)?;
        let effective_parent = match parent {
            Some(p) if Some(p) != entity.parent => Some(p),
            _ => entity.parent,
        };
        let parent_frame = match effective_parent {
            Some(p) => self.effective_zone_transform(tree, p)?,
            None => Transform::IDENTITY,
        };
        let zone = transform.compose(&parent_frame);
        let local = if opts.extended_margin > 0.0 {
            entity.bounds.inflated(opts.extended_margin)
        } else {
            entity.bounds
        };
        Ok(OrientedBounds::from_local(
            &local,
            zone.position,
            &zone.rotation,
            zone.scale,
        ))
    }

    /// Entities whose current world bounds intersect the command's
    /// candidate placement, restricted to the candidate's zone
    pub fn check(
        &self,
        tree: &SceneTree,
        cmd: &Command,
        opts: CheckOptions,
    ) -> Result<Vec<EntityId>> {
        let candidate = self.candidate_bounds(tree, cmd, opts)?;
        let effective_parent = match if opts.use_start_state {
            cmd.start_parent
        } else {
            cmd.end_parent
        } {
            Some(p) => Some(p),
            None => tree.get(cmd.target)?.parent,
        };
        let zone = match effective_parent {
            Some(p) => tree.zone_of(p)?,
            None => tree.zone_of(cmd.target)?,
        };
        let own_subtree = tree.subtree(cmd.target);

        // Ancestors contain the candidate by construction; containment is
        // the bounds rule's business, not a collision.
        let mut ancestors = Vec::new();
        let mut cur = effective_parent;
        while let Some(p) = cur {
            ancestors.push(p);
            cur = tree.get(p)?.parent;
        }

        let mut hits = Vec::new();
        for other in tree.ids() {
            if other == cmd.target || ancestors.contains(&other) {
                continue;
            }
            if !opts.include_children && own_subtree.contains(&other) {
                continue;
            }
            if tree.zone_of(other).map(|z| z != zone).unwrap_or(true) {
                continue;
            }
            let other_bounds = self.effective_bounds(tree, other)?;
            if candidate.intersects(&other_bounds) {
                hits.push(other);
            }
        }
        Ok(hits)
    }

    /// Contacts that are illegal at the command's end geometry but were
    /// absent or legal at its start geometry
    ///
    /// Separating the two states lets rules correct only the violations a
    /// move introduces, instead of re-litigating pre-existing contact.
    pub fn newly_illegal(&self, tree: &SceneTree, cmd: &Command) -> Result<Vec<EntityId>> {
        let end_hits = self.check(tree, cmd, CheckOptions::default())?;
        let end_result = super::legality::analyze(tree, cmd.target, &end_hits)?;
        if end_result.illegal.is_empty() {
            return Ok(Vec::new());
        }
        // An Add has no prior placement; every illegal end contact is new.
        if cmd.kind == CommandKind::Add {
            return Ok(end_result.illegal);
        }
        let start_hits = self.check(
            tree,
            cmd,
            CheckOptions {
                use_start_state: true,
                ..CheckOptions::default()
            },
        )?;
        let start_result = super::legality::analyze(tree, cmd.target, &start_hits)?;
        Ok(end_result
            .illegal
            .into_iter()
            .filter(|id| !start_result.illegal.contains(id))
            .collect())
    }
}
