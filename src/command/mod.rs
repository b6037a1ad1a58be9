//! Proposed scene mutations
//!
//! A command describes one candidate edit: what kind of mutation, which
//! entity, the transform before and after, and whether it is a transient
//! drag preview or a final commit. Rules mutate the end state in place;
//! the command is discarded after one pipeline run.

use ahash::AHashSet;
use serde::{Deserialize, Serialize};

use crate::core::types::EntityId;
use crate::rules::RuleId;
use crate::scene::Transform;

/// Which mutation a command proposes
///
/// Closed sum type: adding a kind is a compile-time-checked change at every
/// dispatch site.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CommandKind {
    /// Place a newly built entity
    Add,
    /// Translate an existing entity
    Move,
    /// Resize an existing entity
    Scale,
    /// Rotate an existing entity
    Rotate,
    /// Move an entity from one parent to another; the parents ride on the
    /// command's `start_parent`/`end_parent` fields
    Reparent,
    /// Remove an entity (and its subtree)
    RemoveChild,
}

/// Transient preview vs. committed step
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CommandPhase {
    /// In-progress interactive drag; re-evaluated every frame, may be
    /// abandoned without rollback
    Transient,
    /// Committed step; may trigger cascading side effects
    Final,
}

/// One proposed mutation travelling through the rule pipeline
#[derive(Debug, Clone)]
pub struct Command {
    pub kind: CommandKind,
    pub target: EntityId,
    pub phase: CommandPhase,
    /// Transform before the mutation
    pub start: Transform,
    /// Candidate transform after the mutation; rules correct this in place
    pub end: Transform,
    /// Parent before the mutation
    pub start_parent: Option<EntityId>,
    /// Candidate parent after the mutation
    pub end_parent: Option<EntityId>,
    /// Rules that must skip this command (correction-loop prevention)
    pub ignored_rules: AHashSet<RuleId>,
}

impl Command {
    pub fn new(kind: CommandKind, target: EntityId, start: Transform, end: Transform) -> Self {
        Self {
            kind,
            target,
            phase: CommandPhase::Final,
            start,
            end,
            start_parent: None,
            end_parent: None,
            ignored_rules: AHashSet::new(),
        }
    }

    pub fn transient(mut self) -> Self {
        self.phase = CommandPhase::Transient;
        self
    }

    pub fn with_parents(mut self, start: Option<EntityId>, end: Option<EntityId>) -> Self {
        self.start_parent = start;
        self.end_parent = end;
        self
    }

    pub fn ignoring(mut self, rule: RuleId) -> Self {
        self.ignored_rules.insert(rule);
        self
    }

    pub fn is_transient(&self) -> bool {
        self.phase == CommandPhase::Transient
    }

    pub fn is_final(&self) -> bool {
        self.phase == CommandPhase::Final
    }

    /// Discard all corrections: end state back to start state
    pub fn reset_to_start(&mut self) {
        self.end = self.start;
        self.end_parent = self.start_parent;
    }

    /// Convenience constructor for a move of `target` from `start` to `end`
    pub fn move_to(target: EntityId, start: Transform, end_position: glam::Vec3) -> Self {
        let end = Transform {
            position: end_position,
            ..start
        };
        Self::new(CommandKind::Move, target, start, end)
    }

    /// Convenience constructor for a scale of `target`
    pub fn scale_to(target: EntityId, start: Transform, end_scale: glam::Vec3) -> Self {
        let end = Transform {
            scale: end_scale,
            ..start
        };
        Self::new(CommandKind::Scale, target, start, end)
    }

    /// Convenience constructor for removing `target`
    pub fn remove(target: EntityId) -> Self {
        Self::new(
            CommandKind::RemoveChild,
            target,
            Transform::IDENTITY,
            Transform::IDENTITY,
        )
    }
}
