//! Stacking through the full pipeline

use glam::Vec3;

use planfix::autoplace::NullBuilder;
use planfix::command::Command;
use planfix::core::config::EngineConfig;
use planfix::core::types::EntityId;
use planfix::feedback::RecordingSink;
use planfix::geom::Aabb;
use planfix::pipeline::{EvalState, GestureState, RulePipeline};
use planfix::scene::{Entity, EntityKind, PropValue, SceneTree, StackSpec, Transform, keys};

fn stack_scene(min_overlap: Option<f32>) -> (SceneTree, EntityId, EntityId) {
    let mut tree = SceneTree::new();
    let z = tree
        .insert(
            Entity::new(EntityKind::Zone)
                .with_bounds(Aabb::new(Vec3::splat(-50.0), Vec3::splat(50.0))),
        )
        .unwrap();
    let mut pallet = Entity::new(EntityKind::Product)
        .with_bounds(Aabb::centered(Vec3::new(2.0, 1.0, 2.0)))
        .with_transform(Transform::at(Vec3::new(5.0, 0.5, 0.0)));
    pallet.parent = Some(z);
    pallet.props.set(
        keys::CLASSIFICATION,
        PropValue::TextList(vec!["pallet".into()]),
    );
    let pallet = tree.insert(pallet).unwrap();

    let mut box_ = Entity::new(EntityKind::Product)
        .with_bounds(Aabb::centered(Vec3::ONE))
        .with_transform(Transform::at(Vec3::new(0.0, 0.5, 0.0)));
    box_.parent = Some(z);
    box_.props.set(
        keys::STACK,
        PropValue::Stack(StackSpec {
            targets: vec!["pallet".into()],
            min_overlap,
        }),
    );
    let box_ = tree.insert(box_).unwrap();
    (tree, pallet, box_)
}

#[test]
fn test_stack_commits_as_child_of_target() {
    let (mut tree, pallet, box_) = stack_scene(None);
    let pipeline = RulePipeline::new(EngineConfig::default());
    let mut gesture = GestureState::new();
    let sink = RecordingSink::new();
    let start = tree.get(box_).unwrap().transform;
    let mut cmd = Command::move_to(box_, start, Vec3::new(5.0, 1.2, 0.0));

    let result = pipeline.evaluate(&mut tree, &mut gesture, &sink, &NullBuilder, &mut cmd);
    assert_eq!(result.state, EvalState::Corrected);
    RulePipeline::commit(&mut tree, &cmd, result.side_effects).unwrap();

    assert_eq!(tree.get(box_).unwrap().parent, Some(pallet));
    let local = tree.get(box_).unwrap().transform.position;
    assert!((local.y - 0.999).abs() < 1e-5);
    assert!(local.x.abs() < 1e-5);
}

#[test]
fn test_stacked_box_world_height() {
    let (mut tree, pallet, box_) = stack_scene(None);
    let pipeline = RulePipeline::new(EngineConfig::default());
    let mut gesture = GestureState::new();
    let sink = RecordingSink::new();
    let start = tree.get(box_).unwrap().transform;
    let mut cmd = Command::move_to(box_, start, Vec3::new(5.3, 1.2, 0.2));

    let result = pipeline.evaluate(&mut tree, &mut gesture, &sink, &NullBuilder, &mut cmd);
    assert_eq!(result.state, EvalState::Corrected);
    RulePipeline::commit(&mut tree, &cmd, result.side_effects).unwrap();

    // Box bottom rests on the pallet top (1.0), sunk by the stack epsilon
    let box_zone = tree
        .get(box_)
        .unwrap()
        .transform
        .compose(&tree.get(pallet).unwrap().transform);
    let bottom = box_zone.position.y - 0.5;
    assert!((bottom - (1.0 - 0.001)).abs() < 1e-4);
    // The horizontal drop position is preserved in zone space
    assert!((box_zone.position.x - 5.3).abs() < 1e-4);
    assert!((box_zone.position.z - 0.2).abs() < 1e-4);
}

#[test]
fn test_beside_target_does_not_stack() {
    let (mut tree, _pallet, box_) = stack_scene(None);
    let pipeline = RulePipeline::new(EngineConfig::default());
    let mut gesture = GestureState::new();
    let sink = RecordingSink::new();
    let start = tree.get(box_).unwrap().transform;
    // Clear of the pallet's footprint and bounds
    let mut cmd = Command::move_to(box_, start, Vec3::new(6.6, 0.5, 0.0));

    let result = pipeline.evaluate(&mut tree, &mut gesture, &sink, &NullBuilder, &mut cmd);
    assert_eq!(result.state, EvalState::Approved);
    assert_eq!(cmd.end_parent, None);
    assert_eq!(cmd.end.position, Vec3::new(6.6, 0.5, 0.0));
}

#[test]
fn test_min_overlap_not_met_falls_through_to_collision() {
    // The box demands 90% footprint overlap; an offset drop gives ~70%
    let (mut tree, _pallet, box_) = stack_scene(Some(0.9));
    let pipeline = RulePipeline::new(EngineConfig::default());
    let mut gesture = GestureState::new();
    let sink = RecordingSink::new();
    let start = tree.get(box_).unwrap().transform;
    let mut cmd = Command::move_to(box_, start, Vec3::new(5.8, 1.2, 0.0));

    let result = pipeline.evaluate(&mut tree, &mut gesture, &sink, &NullBuilder, &mut cmd);
    // Not stacked, so the penetration into the pallet is an illegal contact
    assert_eq!(result.state, EvalState::Rejected);
    assert_eq!(cmd.end.position, start.position);
}
