//! The authoritative per-frame state.
//!
//! A [`Scene`] owns every simulation component and advances them in a fixed
//! order each frame: input, camera, flashlight, animation, culling/LOD,
//! particles and finally the overlay plan. The renderer never reaches into
//! it; it reads the [`RenderInputs`] snapshot built by
//! [`Scene::render_inputs`].

use std::path::{Path, PathBuf};

use cgmath::{Deg, Matrix4, Vector3};

use crate::animation::player::{AnimationPlayer, WrapMode};
use crate::animation::pose::PoseEvaluator;
use crate::camera::{Camera, CameraController, CameraUniform, Projection};
use crate::config::{DEFAULT_CONFIG_FILE, SceneConfig};
use crate::data_structures::instance::Trs;
use crate::diagnostics::DebugLogs;
use crate::input::InputEvent;
use crate::lighting::{LightingBlock, sun::Sun};
use crate::objects::field::ObjectField;
use crate::particles::snow::SnowSimulator;
use crate::pipelines::accumulation::{AccumulationFrame, AccumulationState};
use crate::render::{ModelFrame, RenderInputs, SnowFrame};
use crate::resources::glb::GltfAsset;

/// Half extent of the ground quad; covers the largest object grid.
pub const GROUND_HALF_EXTENT: f32 = 1200.0;
/// Distance between consecutive model slots along +X.
pub const MODEL_SPACING: f32 = 4.0;
pub const Z_NEAR: f32 = 0.1;

/// One loaded glTF model, its playback clock and its current pose.
#[derive(Debug)]
pub struct ModelSlot {
    pub asset: GltfAsset,
    pub player: AnimationPlayer,
    pub placement: Trs,
    pose: PoseEvaluator,
    palettes: Vec<Vec<Matrix4<f32>>>,
}

impl ModelSlot {
    /// Clip 0 (if any) starts playing under [`WrapMode::Loop`].
    pub fn new(asset: GltfAsset, placement: Trs) -> Self {
        let mut player = AnimationPlayer::new(WrapMode::Loop);
        if !asset.clips.is_empty() {
            player.set_clip(0);
            player.play();
        }
        let pose = asset.pose_evaluator();
        let palettes = vec![Vec::new(); asset.skins.len()];
        let mut slot = Self {
            asset,
            player,
            placement,
            pose,
            palettes,
        };
        slot.update(0.0);
        slot
    }

    /// Advance the clock, re-pose the hierarchy and rebuild every palette.
    pub fn update(&mut self, dt: f32) {
        let clip = self.asset.clips.get(self.player.active_clip());
        match clip {
            Some(clip) if self.player.enabled() => {
                self.player.advance_time(dt, clip.duration());
                self.pose.evaluate(Some(clip), self.player.time());
            }
            _ => self.pose.evaluate(None, 0.0),
        }
        for (skin, palette) in self.asset.skins.iter().zip(&mut self.palettes) {
            self.pose.palette(skin, palette);
        }
    }

    pub fn palettes(&self) -> &[Vec<Matrix4<f32>>] {
        &self.palettes
    }

    pub fn pose(&self) -> &PoseEvaluator {
        &self.pose
    }
}

#[derive(Debug)]
pub struct Scene {
    config: SceneConfig,
    config_path: PathBuf,
    camera: Camera,
    projection: Projection,
    controller: CameraController,
    field: ObjectField,
    applied_count: Option<usize>,
    field_rebuilt: bool,
    models: Vec<ModelSlot>,
    snow: SnowSimulator,
    sun: Sun,
    accumulation: AccumulationState,
    overlay_frame: Option<AccumulationFrame>,
    debug: DebugLogs,
    ui_visible: bool,
    quit: bool,
    fps: f32,
}

impl Scene {
    pub fn new(config: SceneConfig, width: u32, height: u32) -> Self {
        let camera_settings = &config.camera;
        let mut scene = Self {
            camera: Camera::new(
                camera_settings.position,
                Deg(camera_settings.yaw_deg),
                Deg(camera_settings.pitch_deg),
            ),
            projection: Projection::new(width, height, Deg(camera_settings.fov_deg), Z_NEAR, far_plane(&config)),
            controller: CameraController::new(camera_settings.speed, camera_settings.sensitivity),
            field: ObjectField::new(),
            applied_count: None,
            field_rebuilt: false,
            models: Vec::new(),
            snow: SnowSimulator::new(config.snow.simulation.clone(), GROUND_HALF_EXTENT),
            sun: Sun::default(),
            accumulation: AccumulationState::new(),
            overlay_frame: None,
            debug: DebugLogs::from_env(),
            ui_visible: true,
            quit: false,
            fps: 0.0,
            config_path: PathBuf::from(DEFAULT_CONFIG_FILE),
            config: SceneConfig::default(),
        };
        scene.apply_config(config);
        scene
    }

    pub fn with_config_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.config_path = path.into();
        self
    }

    pub fn with_debug_logs(mut self, debug: DebugLogs) -> Self {
        self.debug = debug;
        self
    }

    /// Derive all runtime state from `config`. The single place where
    /// configuration turns into component settings.
    pub fn apply_config(&mut self, config: SceneConfig) {
        let performance = &config.performance;
        if self.applied_count != Some(performance.object_count) {
            self.field.set_object_count(performance.object_count as i64);
            self.applied_count = Some(performance.object_count);
            self.field_rebuilt = true;
        }
        self.field.set_culling_enabled(performance.culling_enabled);
        self.field.set_lod_enabled(performance.lod_enabled);
        if performance.distances() != self.config.performance.distances() {
            self.field.invalidate_lod();
        }

        self.snow.set_settings(config.snow.simulation.clone());

        let camera = &config.camera;
        self.camera = Camera::new(camera.position, Deg(camera.yaw_deg), Deg(camera.pitch_deg));
        self.projection.set_fovy(Deg(camera.fov_deg.clamp(10.0, 150.0)));
        self.projection.set_far(far_plane(&config));
        self.controller.speed = camera.speed;
        self.controller.sensitivity = camera.sensitivity;

        if config.snow.overlay.enabled && !self.config.snow.overlay.enabled {
            self.accumulation.request_clear();
        }
        self.config = config;
    }

    /// The current configuration with the live camera pose folded in.
    pub fn snapshot(&self) -> SceneConfig {
        let mut config = self.config.clone();
        config.camera.position = self.camera.position.into();
        config.camera.yaw_deg = Deg::from(self.camera.yaw).0;
        config.camera.pitch_deg = Deg::from(self.camera.pitch).0;
        config
    }

    pub fn save_config(&self, path: impl AsRef<Path>) -> anyhow::Result<()> {
        self.snapshot().save(path)
    }

    pub fn load_config(&mut self, path: impl AsRef<Path>) -> anyhow::Result<()> {
        let config = SceneConfig::load(path)?;
        self.apply_config(config);
        Ok(())
    }

    /// Load a model into the next slot along +X.
    pub fn add_model(&mut self, asset: GltfAsset) -> usize {
        let index = self.models.len();
        let placement = Trs::from(Vector3::new(
            MODEL_SPACING * (index as f32 + 1.0),
            self.config.snow.simulation.floor_y,
            -4.0,
        ));
        self.models.push(ModelSlot::new(asset, placement));
        index
    }

    /// React to one input event. Camera events go to the controller.
    pub fn handle(&mut self, event: InputEvent) {
        if self.controller.process_event(&event) {
            return;
        }
        match event {
            InputEvent::ToggleFlashlight => {
                self.config.flashlight.toggle();
                log::info!("flashlight {}", if self.config.flashlight.enabled { "on" } else { "off" });
            }
            InputEvent::ToggleUi => self.ui_visible = !self.ui_visible,
            InputEvent::ToggleOverlay => {
                let overlay = &mut self.config.snow.overlay;
                overlay.enabled = !overlay.enabled;
                if overlay.enabled {
                    self.accumulation.request_clear();
                }
            }
            InputEvent::ClearAccumulation => self.accumulation.request_clear(),
            InputEvent::CyclePreset => {
                let mut config = self.snapshot();
                let next = config.performance.preset.next();
                config.performance.apply_preset(next);
                log::info!("preset {next:?}: {} objects", config.performance.object_count);
                self.apply_config(config);
            }
            InputEvent::ToggleLod => {
                let performance = &mut self.config.performance;
                performance.lod_enabled = !performance.lod_enabled;
                self.field.set_lod_enabled(performance.lod_enabled);
            }
            InputEvent::ToggleCulling => {
                let performance = &mut self.config.performance;
                performance.culling_enabled = !performance.culling_enabled;
                self.field.set_culling_enabled(performance.culling_enabled);
            }
            InputEvent::SaveConfig => match self.save_config(&self.config_path) {
                Ok(()) => log::info!("saved config to {}", self.config_path.display()),
                Err(e) => log::error!("{e:#}"),
            },
            InputEvent::LoadConfig => {
                let path = self.config_path.clone();
                match self.load_config(&path) {
                    Ok(()) => log::info!("loaded config from {}", path.display()),
                    Err(e) => log::error!("{e:#}"),
                }
            }
            InputEvent::Quit => self.quit = true,
            InputEvent::CameraMove { .. } | InputEvent::CameraLook { .. } => {}
        }
    }

    pub fn resize(&mut self, width: u32, height: u32) {
        self.projection.resize(width, height);
        self.accumulation.request_clear();
    }

    /// Advance one frame of `dt` seconds.
    pub fn update(&mut self, dt: f32) {
        let dt = if dt.is_finite() { dt.max(0.0) } else { 0.0 };
        if dt > 0.0 {
            let instant = 1.0 / dt;
            self.fps = if self.fps == 0.0 { instant } else { self.fps * 0.9 + instant * 0.1 };
        }

        self.controller.update(&mut self.camera, dt);

        if self.config.flashlight.follow_camera {
            self.config.flashlight.follow_camera(
                self.camera.position,
                self.camera.front(),
                self.camera.right(),
                self.camera.up(),
            );
        }

        for model in &mut self.models {
            model.update(dt);
        }

        self.field
            .update_with(self.camera.position, self.config.performance.distances(), dt);

        let view_proj = self.view_proj();
        let cull = self.config.snow.simulation.frustum_cull.then_some(&view_proj);
        self.snow.step(dt, cull);

        self.overlay_frame = self.config.snow.overlay.enabled.then(|| {
            self.accumulation
                .begin_frame(dt, &self.config.snow.overlay, self.projection.aspect())
        });

        self.debug.tick(&self.config.flashlight, &self.field.counts());
    }

    pub fn view_proj(&self) -> Matrix4<f32> {
        self.projection.calc_matrix() * self.camera.calc_matrix()
    }

    pub fn camera_uniform(&self) -> CameraUniform {
        let mut uniform = CameraUniform::new();
        uniform.update_view_proj(&self.camera, &self.projection);
        uniform
    }

    pub fn lighting(&self) -> LightingBlock {
        LightingBlock::new(&self.config.fog, &self.sun, &self.config.flashlight)
    }

    /// Snapshot of everything the renderer reads this frame.
    pub fn render_inputs(&self) -> RenderInputs<'_> {
        let simulation = &self.config.snow.simulation;
        let debug = &self.config.debug_visual;
        RenderInputs {
            camera: self.camera_uniform(),
            lighting: self.lighting(),
            material: self.config.material.to_uniform(),
            show_ground: debug.show_ground,
            floor_y: simulation.floor_y,
            lod_tint: debug.lod_tint,
            batches: self.field.batches(),
            models: self
                .models
                .iter()
                .enumerate()
                .map(|(slot, model)| ModelFrame {
                    slot,
                    placement: model.placement.to_matrix(),
                    palettes: model.palettes(),
                })
                .collect(),
            snow: simulation.enabled.then(|| SnowFrame {
                particles: self.snow.instances(),
                puffs: self.snow.puff_instances(),
                particle_size: simulation.particle_size,
                time: self.snow.time(),
            }),
            show_puffs: debug.show_puffs,
            overlay: self.overlay_frame,
        }
    }

    /// Window title while the UI is visible.
    pub fn hud_title(&self) -> String {
        let counts = self.field.counts();
        format!(
            "frost-ngin | {:.0} fps | {:?} | lod {}/{}/{} of {} ({} visible) | snow {} | flashlight {}",
            self.fps,
            self.config.performance.preset,
            counts.high,
            counts.medium,
            counts.low,
            counts.total,
            counts.visible,
            self.snow.instances().len(),
            if self.config.flashlight.enabled { "on" } else { "off" },
        )
    }

    /// True once after the object population was rebuilt.
    pub fn take_field_rebuilt(&mut self) -> bool {
        std::mem::take(&mut self.field_rebuilt)
    }

    pub fn config(&self) -> &SceneConfig {
        &self.config
    }

    pub fn camera(&self) -> &Camera {
        &self.camera
    }

    pub fn camera_mut(&mut self) -> &mut Camera {
        &mut self.camera
    }

    pub fn projection(&self) -> &Projection {
        &self.projection
    }

    pub fn field(&self) -> &ObjectField {
        &self.field
    }

    pub fn models(&self) -> &[ModelSlot] {
        &self.models
    }

    pub fn snow(&self) -> &SnowSimulator {
        &self.snow
    }

    pub fn accumulation(&self) -> &AccumulationState {
        &self.accumulation
    }

    pub fn overlay_frame(&self) -> Option<&AccumulationFrame> {
        self.overlay_frame.as_ref()
    }

    pub fn ui_visible(&self) -> bool {
        self.ui_visible
    }

    pub fn should_quit(&self) -> bool {
        self.quit
    }
}

fn far_plane(config: &SceneConfig) -> f32 {
    (config.performance.cull_distance + 100.0).max(600.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Preset;

    fn small_config() -> SceneConfig {
        let mut config = SceneConfig::default();
        config.performance.apply_preset(Preset::Custom);
        config.performance.object_count = 400;
        config.snow.simulation.count = 100;
        config
    }

    #[test]
    fn toggles_flip_config_state() {
        let mut scene = Scene::new(small_config(), 800, 600).with_debug_logs(DebugLogs::new(false));
        let enabled = scene.config().flashlight.enabled;
        scene.handle(InputEvent::ToggleFlashlight);
        assert_eq!(scene.config().flashlight.enabled, !enabled);
        scene.handle(InputEvent::ToggleCulling);
        assert!(!scene.config().performance.culling_enabled);
        scene.handle(InputEvent::Quit);
        assert!(scene.should_quit());
    }

    #[test]
    fn preset_cycle_rebuilds_field() {
        let mut scene = Scene::new(small_config(), 800, 600).with_debug_logs(DebugLogs::new(false));
        assert!(scene.take_field_rebuilt());
        scene.handle(InputEvent::CyclePreset);
        assert_eq!(scene.config().performance.preset, Preset::Low);
        assert!(scene.take_field_rebuilt());
        assert_eq!(scene.field().len(), 10_000);
    }

    #[test]
    fn snapshot_tracks_live_camera() {
        let mut scene = Scene::new(small_config(), 800, 600).with_debug_logs(DebugLogs::new(false));
        scene.camera_mut().position.x = 12.0;
        assert_eq!(scene.snapshot().camera.position[0], 12.0);
    }

    #[test]
    fn overlay_plan_only_when_enabled() {
        let mut scene = Scene::new(small_config(), 800, 600).with_debug_logs(DebugLogs::new(false));
        scene.update(0.016);
        assert!(scene.overlay_frame().is_none());
        scene.handle(InputEvent::ToggleOverlay);
        scene.update(0.016);
        let frame = scene.overlay_frame().copied().unwrap();
        assert!(frame.clear);
        assert_eq!(frame.uniform.trail_gain(), 0.0);
    }
}
