use frost_ngin::config::{Preset, SceneConfig};
use frost_ngin::diagnostics::DebugLogs;
use frost_ngin::input::InputEvent;
use frost_ngin::scene::Scene;

fn overlay_scene() -> Scene {
    let mut config = SceneConfig::default();
    config.performance.apply_preset(Preset::Custom);
    config.performance.object_count = 100;
    config.snow.simulation.count = 10;
    config.snow.overlay.enabled = true;
    config.snow.overlay.trail_gain = 0.8;
    Scene::new(config, 640, 480).with_debug_logs(DebugLogs::new(false))
}

#[test]
fn first_frame_clears_then_advects() {
    let mut scene = overlay_scene();
    scene.update(0.016);
    let first = *scene.overlay_frame().unwrap();
    assert!(first.clear);
    assert!(!first.advect);
    assert_eq!(first.uniform.trail_gain(), 0.0);

    scene.update(0.016);
    let second = *scene.overlay_frame().unwrap();
    assert!(!second.clear);
    assert!(second.advect);
    assert_eq!(second.read, first.write);
    assert!((second.uniform.trail_gain() - 0.8).abs() < 1e-6);
    assert!(second.uniform.decay() > 0.0 && second.uniform.decay() < 1.0);
}

#[test]
fn clear_key_wipes_the_trail_on_the_next_frame() {
    let mut scene = overlay_scene();
    for _ in 0..5 {
        scene.update(0.016);
    }
    assert!(!scene.overlay_frame().unwrap().clear);

    scene.handle(InputEvent::ClearAccumulation);
    assert!(scene.accumulation().clear_pending());
    scene.update(0.016);
    let frame = *scene.overlay_frame().unwrap();
    assert!(frame.clear);
    assert!(!frame.advect);
    assert_eq!(frame.uniform.trail_gain(), 0.0);
    assert!(!scene.accumulation().clear_pending());

    scene.update(0.016);
    assert!(scene.overlay_frame().unwrap().advect);
}

#[test]
fn resizing_requests_a_clear() {
    let mut scene = overlay_scene();
    scene.update(0.016);
    scene.update(0.016);
    scene.resize(1024, 768);
    scene.update(0.016);
    assert!(scene.overlay_frame().unwrap().clear);
}

#[test]
fn disabling_the_overlay_drops_the_plan() {
    let mut scene = overlay_scene();
    scene.update(0.016);
    scene.handle(InputEvent::ToggleOverlay);
    scene.update(0.016);
    assert!(scene.overlay_frame().is_none());
    assert!(scene.render_inputs().overlay.is_none());
}

#[test]
fn advection_offset_scales_with_frame_time() {
    let mut scene = overlay_scene();
    scene.update(0.016);
    scene.update(0.05);
    let frame = *scene.overlay_frame().unwrap();
    let [u, v] = frame.uniform.uv_offset();
    let expected = scene.config().snow.overlay.advection_scale * 0.05;
    assert!(((u * u + v * v).sqrt() - expected).abs() < 1e-6);
}
