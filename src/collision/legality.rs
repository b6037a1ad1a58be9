//! Legal/illegal partition of colliding entities
//!
//! A collision is legal when the colliding entity's classification appears
//! in the evaluated entity's declared relationship rules with remaining
//! count budget. The partition only consults the evaluated entity's rules;
//! the converse direction is never required to hold.

use crate::core::error::Result;
use crate::core::types::EntityId;
use crate::scene::{CountModifier, RelationshipRule, SceneTree, keys};

/// Outcome of classifying a set of colliding entities
#[derive(Debug, Clone, Default)]
pub struct CollisionResult {
    pub legal: Vec<EntityId>,
    pub illegal: Vec<EntityId>,
    /// Declared rules whose minimum contact count was not reached
    pub unmet: Vec<RelationshipRule>,
}

impl CollisionResult {
    /// No illegal contacts and every minimum satisfied
    pub fn is_clean(&self) -> bool {
        self.illegal.is_empty() && self.unmet.is_empty()
    }
}

/// Remaining contact budget for one declared rule
struct Budget<'a> {
    rule: &'a RelationshipRule,
    used: u32,
}

impl Budget<'_> {
    fn has_room(&self) -> bool {
        match self.rule.modifier {
            CountModifier::Exact | CountModifier::AtMost => self.used < self.rule.count,
            CountModifier::AtLeast => true,
            CountModifier::None => false,
        }
    }

    fn minimum_met(&self) -> bool {
        match self.rule.modifier {
            CountModifier::Exact => self.used == self.rule.count,
            CountModifier::AtLeast => self.used >= self.rule.count,
            CountModifier::AtMost | CountModifier::None => true,
        }
    }
}

/// Partition `colliding` into legal and illegal contacts of `subject`
///
/// A `None`-modifier rule makes zero contacts of any kind legal in itself;
/// it never grants budget for an actual contact.
pub fn analyze(
    tree: &SceneTree,
    subject: EntityId,
    colliding: &[EntityId],
) -> Result<CollisionResult> {
    let declared = tree
        .get(subject)?
        .props
        .relationships(keys::RELATIONSHIPS)
        .cloned()
        .unwrap_or_default();

    let mut budgets: Vec<Budget> = declared.iter().map(|rule| Budget { rule, used: 0 }).collect();
    let mut result = CollisionResult::default();

    for &other in colliding {
        let tags = tree.get(other)?.props.classifications().to_vec();
        let slot = budgets
            .iter_mut()
            .find(|b| b.has_room() && tags.iter().any(|t| *t == b.rule.classification));
        match slot {
            Some(budget) => {
                budget.used += 1;
                result.legal.push(other);
            }
            None => result.illegal.push(other),
        }
    }

    // Floating placement: zero contacts with a None modifier declared
    let floating_permitted = declared
        .iter()
        .any(|r| r.modifier == CountModifier::None);
    if colliding.is_empty() && floating_permitted {
        return Ok(result);
    }

    for budget in &budgets {
        if !budget.minimum_met() {
            result.unmet.push(budget.rule.clone());
        }
    }

    Ok(result)
}
