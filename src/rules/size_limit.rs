//! Entity size limits: clamp requested scale, recenter the placement

use crate::command::{Command, CommandKind};
use crate::core::types::Axis;
use crate::pipeline::EvalContext;
use crate::scene::keys;

use super::{Rule, RuleClass, RuleId, RuleOutcome};

/// Clamps a Scale command to the entity's declared min/max size and
/// compensates the position for the clamped portion of the resize
pub struct SizeLimitRule;

impl Rule for SizeLimitRule {
    fn id(&self) -> RuleId {
        RuleId::SizeLimit
    }

    fn class(&self) -> RuleClass {
        RuleClass::Standard
    }

    fn applies_to(&self, kind: CommandKind) -> bool {
        matches!(kind, CommandKind::Scale | CommandKind::Add)
    }

    fn evaluate(
        &self,
        ctx: &mut EvalContext<'_>,
        cmd: &mut Command,
        _prior: &RuleOutcome,
    ) -> RuleOutcome {
        let (base_size, limits) = match ctx.tree.get(cmd.target) {
            Ok(entity) => {
                let limits = match entity.props.size_limits(keys::SIZE_LIMITS) {
                    Some(l) => *l,
                    None => return RuleOutcome::approved(),
                };
                (entity.bounds.size(), limits)
            }
            Err(_) => return RuleOutcome::approved(),
        };

        let mut corrected = false;
        for axis in Axis::ALL {
            let idx = axis.index();
            if base_size[idx] <= 0.0 {
                continue;
            }
            let requested = base_size[idx] * cmd.end.scale[idx];
            let clamped = requested.clamp(limits.min[idx], limits.max[idx]);
            if (clamped - requested).abs() <= ctx.config.geom_epsilon {
                continue;
            }
            cmd.end.scale[idx] = clamped / base_size[idx];

            // A resize drag moves the center by half the growth; give back
            // the clamped-away half so the held edge stays under the cursor.
            let drag = cmd.end.position[idx] - cmd.start.position[idx];
            if drag.abs() > ctx.config.geom_epsilon {
                let start_size = base_size[idx] * cmd.start.scale[idx];
                cmd.end.position[idx] =
                    cmd.start.position[idx] + drag.signum() * (clamped - start_size) * 0.5;
            }
            corrected = true;
        }

        if corrected {
            RuleOutcome::corrected()
        } else {
            RuleOutcome::approved()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::autoplace::NullBuilder;
    use crate::feedback::NullSink;
    use crate::core::config::EngineConfig;
    use crate::geom::Aabb;
    use crate::pipeline::GestureState;
    use crate::scene::{Entity, EntityKind, PropValue, SceneTree, SizeLimits, Transform};
    use glam::Vec3;

    fn limited_scene() -> (SceneTree, crate::core::types::EntityId) {
        let mut tree = SceneTree::new();
        let z = tree
            .insert(
                Entity::new(EntityKind::Zone)
                    .with_bounds(Aabb::new(Vec3::splat(-50.0), Vec3::splat(50.0))),
            )
            .unwrap();
        let mut e = Entity::new(EntityKind::Product).with_bounds(Aabb::centered(Vec3::ONE));
        e.parent = Some(z);
        e.props.set(
            keys::SIZE_LIMITS,
            PropValue::SizeLimits(SizeLimits {
                min: Vec3::splat(0.5),
                max: Vec3::splat(2.0),
            }),
        );
        let p = tree.insert(e).unwrap();
        (tree, p)
    }

    fn eval(tree: &mut SceneTree, cmd: &mut Command) -> RuleOutcome {
        let mut gesture = GestureState::new();
        let config = EngineConfig::default();
        let mut ctx = EvalContext::new(tree, &mut gesture, &NullSink, &NullBuilder, &config);
        SizeLimitRule.evaluate(&mut ctx, cmd, &RuleOutcome::approved())
    }

    #[test]
    fn test_oversize_scale_clamped_and_recentered() {
        let (mut tree, p) = limited_scene();
        let start = Transform::IDENTITY;
        let mut cmd = Command::scale_to(p, start, Vec3::new(3.0, 1.0, 1.0));
        // Resize drag carried the center along by half the requested growth
        cmd.end.position.x = start.position.x + 1.0;

        let outcome = eval(&mut tree, &mut cmd);
        assert!(outcome.approved);
        assert!(outcome.corrected);
        // Size 3.0 clamped to 2.0; center pulled back by half the clamp
        assert!((cmd.end.scale.x - 2.0).abs() < 1e-5);
        assert!((cmd.end.position.x - 0.5).abs() < 1e-5);
    }

    #[test]
    fn test_undersize_scale_clamped() {
        let (mut tree, p) = limited_scene();
        let mut cmd = Command::scale_to(p, Transform::IDENTITY, Vec3::new(0.1, 1.0, 1.0));
        let outcome = eval(&mut tree, &mut cmd);
        assert!(outcome.corrected);
        assert!((cmd.end.scale.x - 0.5).abs() < 1e-5);
    }

    #[test]
    fn test_in_range_scale_untouched() {
        let (mut tree, p) = limited_scene();
        let mut cmd = Command::scale_to(p, Transform::IDENTITY, Vec3::new(1.5, 1.0, 1.0));
        let outcome = eval(&mut tree, &mut cmd);
        assert!(!outcome.corrected);
        assert!((cmd.end.scale.x - 1.5).abs() < 1e-5);
    }

    #[test]
    fn test_no_limits_no_op() {
        let (mut tree, _) = limited_scene();
        let mut plain = Entity::new(EntityKind::Product).with_bounds(Aabb::centered(Vec3::ONE));
        plain.parent = Some(tree.ids().find(|&i| tree.get(i).unwrap().kind == EntityKind::Zone).unwrap());
        let q = tree.insert(plain).unwrap();
        let mut cmd = Command::scale_to(q, Transform::IDENTITY, Vec3::splat(40.0));
        let outcome = eval(&mut tree, &mut cmd);
        assert!(!outcome.corrected);
    }
}
