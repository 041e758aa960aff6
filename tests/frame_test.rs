use frost_ngin::config::{Preset, SceneConfig};
use frost_ngin::diagnostics::DebugLogs;
use frost_ngin::input::InputEvent;
use frost_ngin::objects::lod::LodLevel;
use frost_ngin::render::{FrameGraph, RenderNode};
use frost_ngin::resources::glb::GltfAsset;
use frost_ngin::scene::Scene;

mod common;

use common::test_utils::{dense_config, skinned_triangle_glb};

fn config(objects: usize, flakes: usize) -> SceneConfig {
    let mut config = SceneConfig::default();
    config.performance.apply_preset(Preset::Custom);
    config.performance.object_count = objects;
    config.snow.simulation.count = flakes;
    config.snow.simulation.frustum_cull = false;
    config
}

fn scene(config: SceneConfig) -> Scene {
    Scene::new(config, 1280, 720).with_debug_logs(DebugLogs::new(false))
}

fn rank(node: &RenderNode) -> usize {
    match node {
        RenderNode::Ground => 0,
        RenderNode::Instanced { level: LodLevel::High, .. } => 1,
        RenderNode::Instanced { level: LodLevel::Medium, .. } => 2,
        RenderNode::Instanced { level: LodLevel::Low, .. } => 3,
        RenderNode::Model { .. } => 4,
        RenderNode::Particles { .. } => 5,
        RenderNode::Puffs { .. } => 6,
        RenderNode::Overlay => 7,
    }
}

#[test]
fn dense_scene_needs_at_most_three_instanced_draws() {
    let mut scene = scene(dense_config());
    scene.update(0.016);
    let graph = FrameGraph::build(&scene.render_inputs());
    assert_eq!(graph.instanced_draws(), 3);

    let counts = scene.field().counts();
    for node in graph.nodes() {
        if let RenderNode::Instanced { level, count } = node {
            assert_eq!(*count as usize, counts.get(*level));
        }
    }
}

#[test]
fn zero_objects_issue_no_instanced_draws() {
    let mut scene = scene(config(0, 0));
    scene.update(0.016);
    let graph = FrameGraph::build(&scene.render_inputs());
    assert_eq!(graph.instanced_draws(), 0);
    assert_eq!(graph.nodes(), &[RenderNode::Ground]);
}

#[test]
fn nodes_follow_the_frame_order() {
    let mut scene = scene(config(20_000, 400));
    let asset = GltfAsset::from_glb_bytes(&skinned_triangle_glb(), "tri", None).unwrap();
    assert_eq!(scene.add_model(asset), 0);
    scene.handle(InputEvent::ToggleOverlay);
    for _ in 0..3 {
        scene.update(0.05);
    }

    let graph = FrameGraph::build(&scene.render_inputs());
    let nodes = graph.nodes();
    assert_eq!(nodes.first(), Some(&RenderNode::Ground));
    assert_eq!(nodes.last(), Some(&RenderNode::Overlay));
    assert!(graph.nodes().contains(&RenderNode::Model { slot: 0 }));
    assert!(graph.nodes().contains(&RenderNode::Particles { count: 400 }));
    assert!(nodes.windows(2).all(|pair| rank(&pair[0]) < rank(&pair[1])));
}

#[test]
fn debug_switches_hide_ground_and_puffs() {
    let mut config = config(0, 50);
    config.debug_visual.show_ground = false;
    config.debug_visual.show_puffs = false;
    config.snow.simulation.fall_speed = 50.0;
    config.snow.simulation.puff_lifetime = 10.0;
    let mut scene = scene(config);
    for _ in 0..20 {
        scene.update(0.05);
    }
    assert!(!scene.snow().puffs().is_empty());

    let graph = FrameGraph::build(&scene.render_inputs());
    assert!(!graph.nodes().contains(&RenderNode::Ground));
    assert!(
        !graph
            .nodes()
            .iter()
            .any(|node| matches!(node, RenderNode::Puffs { .. }))
    );
}

#[test]
fn models_stand_on_the_floor_in_a_row() {
    let mut config = config(0, 0);
    config.snow.simulation.floor_y = -1.0;
    let mut scene = scene(config);
    for expected in 0..2 {
        let asset = GltfAsset::from_glb_bytes(&skinned_triangle_glb(), "tri", None).unwrap();
        assert_eq!(scene.add_model(asset), expected);
    }
    let inputs = scene.render_inputs();
    assert_eq!(inputs.floor_y, -1.0);
    let placements: Vec<_> = inputs.models.iter().map(|m| m.placement.w).collect();
    assert_eq!(placements[0].y, -1.0);
    assert!(placements[1].x > placements[0].x);
}

#[test]
fn hud_title_reports_distribution_and_flashlight() {
    let mut scene = scene(config(100, 20));
    scene.update(0.016);
    let title = scene.hud_title();
    let counts = scene.field().counts();
    assert!(title.contains(&format!("of 100 ({} visible)", counts.visible)), "{title}");
    assert!(title.contains("snow 20"), "{title}");

    let before = scene.config().flashlight.enabled;
    scene.handle(InputEvent::ToggleFlashlight);
    let expected = if before { "flashlight off" } else { "flashlight on" };
    assert!(scene.hud_title().ends_with(expected));
}
