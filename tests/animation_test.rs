use approx::assert_relative_eq;
use cgmath::Vector4;
use frost_ngin::animation::player::{AnimationPlayer, PlaybackState, WrapMode};
use frost_ngin::data_structures::instance::Trs;
use frost_ngin::resources::glb::GltfAsset;
use frost_ngin::scene::ModelSlot;

mod common;

use common::test_utils::skinned_triangle_glb;

fn assert_point(got: Vector4<f32>, want: [f32; 3], epsilon: f32) {
    assert_relative_eq!(got.x, want[0], epsilon = epsilon);
    assert_relative_eq!(got.y, want[1], epsilon = epsilon);
    assert_relative_eq!(got.z, want[2], epsilon = epsilon);
    assert_relative_eq!(got.w, 1.0, epsilon = epsilon);
}

fn triangle() -> GltfAsset {
    GltfAsset::from_glb_bytes(&skinned_triangle_glb(), "tri", None).unwrap()
}

#[test]
fn loads_the_skinned_triangle() {
    let asset = triangle();
    assert_eq!(asset.primitives.len(), 1);
    assert_eq!(asset.primitives[0].skin, Some(0));
    assert_eq!(asset.skins.len(), 1);
    assert_eq!(asset.skins[0].palette_len(), 2);
    assert_eq!(asset.clips.len(), 1);
    assert_eq!(asset.clips[0].name, "wave");
    assert_relative_eq!(asset.clips[0].duration(), 1.0);
    assert_eq!(asset.materials[asset.primitives[0].material].name, "snowman");
}

#[test]
fn weights_are_normalised_on_load() {
    let asset = triangle();
    for vertex in &asset.primitives[0].mesh.vertices {
        let sum: f32 = vertex.weights.iter().sum();
        assert!((sum - 1.0).abs() < 1e-4, "weights {:?}", vertex.weights);
        assert!(vertex.joints.iter().all(|&j| j < 2));
    }
    assert_eq!(asset.primitives[0].mesh.vertices[2].weights, [0.5, 0.5, 0.0, 0.0]);
}

#[test]
fn looping_clock_wraps_to_zero() {
    let asset = triangle();
    let duration = asset.clips[0].duration();
    let mut player = AnimationPlayer::new(WrapMode::Loop);
    player.play();

    let mut times = Vec::new();
    for _ in 0..4 {
        player.advance_time(0.25, duration);
        times.push(player.time());
    }
    for (got, want) in times.iter().zip([0.25, 0.5, 0.75, 0.0]) {
        assert!((got - want).abs() < 1e-6, "{times:?}");
    }
}

#[test]
fn once_stops_at_the_end() {
    let mut player = AnimationPlayer::new(WrapMode::Once);
    player.play();
    player.advance_time(0.75, 1.0);
    player.advance_time(0.75, 1.0);
    assert_eq!(player.time(), 1.0);
    assert_eq!(player.state(), PlaybackState::Stopped);
}

#[test]
fn bind_pose_palette_is_identity() {
    let slot = ModelSlot::new(triangle(), Trs::identity());
    assert_eq!(slot.palettes().len(), 1);
    assert_eq!(slot.palettes()[0].len(), 2);
    for matrix in &slot.palettes()[0] {
        let p = matrix * Vector4::new(0.3, 1.7, 0.0, 1.0);
        assert_point(p, [0.3, 1.7, 0.0], 1e-5);
    }
}

#[test]
fn halfway_through_the_clip_the_bone_is_at_45_degrees() {
    let mut slot = ModelSlot::new(triangle(), Trs::identity());
    slot.update(0.5);
    assert!((slot.player.time() - 0.5).abs() < 1e-6);

    let joint = slot.palettes()[0][1];
    // The joint pivots about its own origin at (0, 1, 0).
    let pivot = joint * Vector4::new(0.0, 1.0, 0.0, 1.0);
    assert_point(pivot, [0.0, 1.0, 0.0], 1e-5);

    let tip = joint * Vector4::new(0.0, 2.0, 0.0, 1.0);
    let half = std::f32::consts::FRAC_1_SQRT_2;
    assert_point(tip, [-half, 1.0 + half, 0.0], 1e-4);

    // Joint 0 is the unanimated root.
    let root = slot.palettes()[0][0] * Vector4::new(1.0, 0.0, 0.0, 1.0);
    assert_point(root, [1.0, 0.0, 0.0], 1e-5);
}

#[test]
fn disabled_player_holds_the_rest_pose() {
    let mut slot = ModelSlot::new(triangle(), Trs::identity());
    slot.player.set_enabled(false);
    slot.update(0.5);
    assert_eq!(slot.player.time(), 0.0);
    let tip = slot.palettes()[0][1] * Vector4::new(0.0, 2.0, 0.0, 1.0);
    assert_point(tip, [0.0, 2.0, 0.0], 1e-5);
}

#[test]
fn switching_to_ping_pong_bounces_off_the_end() {
    let mut player = AnimationPlayer::new(WrapMode::Loop);
    player.play();
    player.advance_time(0.5, 1.0);
    player.set_wrap(WrapMode::PingPong);

    player.advance_time(0.75, 1.0);
    assert!((player.time() - 0.75).abs() < 1e-6, "{}", player.time());
    player.advance_time(0.5, 1.0);
    assert!((player.time() - 0.25).abs() < 1e-6, "{}", player.time());
    assert_eq!(player.state(), PlaybackState::Playing);
}
