//! Auto-placement through the full pipeline
//!
//! Hosts with auto-add configuration get their supports regenerated on
//! committed geometry changes and side-pocketed during drags.

use glam::Vec3;

use planfix::autoplace::NullBuilder;
use planfix::command::{Command, CommandKind};
use planfix::core::config::EngineConfig;
use planfix::core::types::{Axis, EntityId};
use planfix::feedback::RecordingSink;
use planfix::geom::Aabb;
use planfix::pipeline::{EvalState, GestureState, RulePipeline};
use planfix::scene::{AutoAddSpec, Entity, EntityKind, PropValue, SceneTree, Transform, keys};

fn shelf_scene(spec: AutoAddSpec) -> (SceneTree, EntityId) {
    let mut tree = SceneTree::new();
    let z = tree
        .insert(
            Entity::new(EntityKind::Zone)
                .with_bounds(Aabb::new(Vec3::splat(-50.0), Vec3::splat(50.0))),
        )
        .unwrap();
    let mut shelf = Entity::new(EntityKind::Product)
        .with_bounds(Aabb::centered(Vec3::new(4.0, 0.2, 0.5)))
        .with_transform(Transform::at(Vec3::new(0.0, 1.0, 0.0)));
    shelf.parent = Some(z);
    shelf.props.set(keys::AUTO_ADD, PropValue::AutoAdd(vec![spec]));
    let host = tree.insert(shelf).unwrap();
    (tree, host)
}

fn span_spec() -> AutoAddSpec {
    AutoAddSpec::Span {
        tool: "bracket".into(),
        axis: Axis::X,
        interval: 1.0,
    }
}

fn supports(tree: &SceneTree, host: EntityId, tool: &str) -> Vec<EntityId> {
    tree.children(host)
        .iter()
        .copied()
        .filter(|&c| {
            tree.get(c)
                .map(|e| {
                    e.is_auto_added() && e.props.classifications().iter().any(|t| t == tool)
                })
                .unwrap_or(false)
        })
        .collect()
}

#[test]
fn test_final_scale_regenerates_span_supports() {
    let (mut tree, host) = shelf_scene(span_spec());
    let pipeline = RulePipeline::new(EngineConfig::default());
    let mut gesture = GestureState::new();
    let sink = RecordingSink::new();
    let start = tree.get(host).unwrap().transform;
    let mut cmd = Command::new(
        CommandKind::Scale,
        host,
        start,
        Transform {
            scale: Vec3::new(2.0, 1.0, 1.0),
            ..start
        },
    );

    let result = pipeline.evaluate(&mut tree, &mut gesture, &sink, &NullBuilder, &mut cmd);
    assert!(result.approved);
    RulePipeline::commit(&mut tree, &cmd, result.side_effects).unwrap();

    // Width 8 at interval 1: nine supports, end to end
    let brackets = supports(&tree, host, "bracket");
    assert_eq!(brackets.len(), 9);
    let mut xs: Vec<f32> = brackets
        .iter()
        .map(|&b| tree.get(b).unwrap().transform.position.x)
        .collect();
    xs.sort_by(f32::total_cmp);
    // Local offsets stay on the unscaled host; the host frame scales them
    // out to the full width 8 extent.
    assert_eq!(xs.first(), Some(&-2.0));
    assert_eq!(xs.last(), Some(&2.0));
    let scale_x = tree.get(host).unwrap().transform.scale.x;
    for x in &xs {
        assert!((x * scale_x).abs() <= 4.0 + 1e-5);
    }
}

#[test]
fn test_drag_pockets_interior_and_commit_restores() {
    let (mut tree, host) = shelf_scene(span_spec());
    let pipeline = RulePipeline::new(EngineConfig::default());
    let mut gesture = GestureState::new();
    let sink = RecordingSink::new();
    let start = tree.get(host).unwrap().transform;

    // Seed the support set with a committed no-op move
    let mut seed = Command::move_to(host, start, start.position);
    let result = pipeline.evaluate(&mut tree, &mut gesture, &sink, &NullBuilder, &mut seed);
    assert!(result.approved);
    assert_eq!(supports(&tree, host, "bracket").len(), 5);

    // During the drag only the two end supports stay in the tree
    let mut drag =
        Command::move_to(host, start, start.position + Vec3::new(1.0, 0.0, 0.0)).transient();
    pipeline.evaluate(&mut tree, &mut gesture, &sink, &NullBuilder, &mut drag);
    assert_eq!(supports(&tree, host, "bracket").len(), 2);

    // The commit at drag end regenerates the full set
    let mut drop =
        Command::move_to(host, start, start.position + Vec3::new(1.0, 0.0, 0.0));
    let result = pipeline.evaluate(&mut tree, &mut gesture, &sink, &NullBuilder, &mut drop);
    assert!(result.approved);
    RulePipeline::commit(&mut tree, &drop, result.side_effects).unwrap();
    gesture.end_gesture();
    assert_eq!(supports(&tree, host, "bracket").len(), 5);
}

#[test]
fn test_position_table_regenerates_in_place() {
    let spec = AutoAddSpec::Position {
        tool: "peg".into(),
        offsets: vec![Vec3::new(-1.5, 0.0, 0.0), Vec3::new(1.5, 0.0, 0.0)],
    };
    let (mut tree, host) = shelf_scene(spec);
    let pipeline = RulePipeline::new(EngineConfig::default());
    let mut gesture = GestureState::new();
    let sink = RecordingSink::new();
    let start = tree.get(host).unwrap().transform;

    for step in 1..=2 {
        let mut cmd = Command::move_to(
            host,
            tree.get(host).unwrap().transform,
            start.position + Vec3::new(step as f32, 0.0, 0.0),
        );
        let result = pipeline.evaluate(&mut tree, &mut gesture, &sink, &NullBuilder, &mut cmd);
        assert!(result.approved);
        RulePipeline::commit(&mut tree, &cmd, result.side_effects).unwrap();
    }
    // Regeneration replaces, never accumulates
    assert_eq!(supports(&tree, host, "peg").len(), 2);
}

#[test]
fn test_collision_fit_spans_clear_hosts() {
    let spec = AutoAddSpec::CollisionFit {
        tool: "bracket".into(),
        axis: Axis::X,
        step: 2.0,
    };
    let (mut tree, host) = shelf_scene(spec);
    let pipeline = RulePipeline::new(EngineConfig::default());
    let mut gesture = GestureState::new();
    let sink = RecordingSink::new();
    let start = tree.get(host).unwrap().transform;
    let mut cmd = Command::new(CommandKind::Scale, host, start, start);

    let result = pipeline.evaluate(&mut tree, &mut gesture, &sink, &NullBuilder, &mut cmd);
    assert_eq!(result.state, EvalState::Approved);
    assert_eq!(supports(&tree, host, "bracket").len(), 3);
}
