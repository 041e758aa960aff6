//! Persistent scene configuration.
//!
//! A [`SceneConfig`] is the authoritative, serialisable description of
//! everything tweakable at runtime. It is written and read as JSON on
//! explicit save/load; absent fields fall back to their defaults.

use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::data_structures::model::MaterialUniform;
use crate::lighting::flashlight::Flashlight;
use crate::lighting::fog::FogParams;
use crate::objects::lod::LodDistances;
use crate::particles::snow::SnowSettings;

pub const DEFAULT_CONFIG_FILE: &str = "frost_scene.json";

#[derive(Clone, Copy, Debug, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Preset {
    Low,
    #[default]
    Medium,
    High,
    Ultra,
    Extreme,
    /// Keep whatever count and distances are set.
    Custom,
}

impl Preset {
    /// Object count and LOD distances of a fixed preset.
    pub fn values(self) -> Option<(usize, LodDistances)> {
        let (count, cull, high, medium) = match self {
            Preset::Low => (10_000, 300.0, 60.0, 160.0),
            Preset::Medium => (50_000, 350.0, 55.0, 155.0),
            Preset::High => (100_000, 400.0, 50.0, 150.0),
            Preset::Ultra => (250_000, 400.0, 50.0, 150.0),
            Preset::Extreme => (500_000, 400.0, 50.0, 150.0),
            Preset::Custom => return None,
        };
        Some((count, LodDistances { cull, high, medium }))
    }

    /// Next fixed preset; `Custom` restarts at `Low`.
    pub fn next(self) -> Self {
        match self {
            Preset::Low => Preset::Medium,
            Preset::Medium => Preset::High,
            Preset::High => Preset::Ultra,
            Preset::Ultra => Preset::Extreme,
            Preset::Extreme | Preset::Custom => Preset::Low,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct PerformanceSettings {
    pub preset: Preset,
    pub object_count: usize,
    pub cull_distance: f32,
    pub high_lod_distance: f32,
    pub med_lod_distance: f32,
    pub lod_enabled: bool,
    pub culling_enabled: bool,
}

impl Default for PerformanceSettings {
    fn default() -> Self {
        let mut settings = Self {
            preset: Preset::default(),
            object_count: 0,
            cull_distance: 0.0,
            high_lod_distance: 0.0,
            med_lod_distance: 0.0,
            lod_enabled: true,
            culling_enabled: true,
        };
        settings.apply_preset(Preset::default());
        settings
    }
}

impl PerformanceSettings {
    /// Switch presets. Fixed presets overwrite the count and distances.
    pub fn apply_preset(&mut self, preset: Preset) {
        self.preset = preset;
        if let Some((count, distances)) = preset.values() {
            self.object_count = count;
            self.cull_distance = distances.cull;
            self.high_lod_distance = distances.high;
            self.med_lod_distance = distances.medium;
        }
    }

    pub fn distances(&self) -> LodDistances {
        LodDistances {
            cull: self.cull_distance,
            high: self.high_lod_distance,
            medium: self.med_lod_distance,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct OverlaySettings {
    pub enabled: bool,
    pub advection_scale: f32,
    pub decay_per_sec: f32,
    pub snow_speed: f32,
    pub direction_deg: f32,
    pub trail_gain: f32,
}

impl Default for OverlaySettings {
    fn default() -> Self {
        Self {
            enabled: false,
            advection_scale: 0.15,
            decay_per_sec: 1.2,
            snow_speed: 1.0,
            direction_deg: 250.0,
            trail_gain: 0.8,
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct SnowConfig {
    #[serde(flatten)]
    pub simulation: SnowSettings,
    pub overlay: OverlaySettings,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct MaterialSettings {
    pub base_color_factor: [f32; 4],
    pub metallic_factor: f32,
    pub roughness_factor: f32,
    pub occlusion_strength: f32,
    pub normal_scale: f32,
}

impl Default for MaterialSettings {
    fn default() -> Self {
        Self {
            base_color_factor: [0.78, 0.8, 0.84, 1.0],
            metallic_factor: 0.0,
            roughness_factor: 0.8,
            occlusion_strength: 1.0,
            normal_scale: 1.0,
        }
    }
}

impl MaterialSettings {
    pub fn to_uniform(&self) -> MaterialUniform {
        MaterialUniform::new(
            self.base_color_factor,
            self.metallic_factor.clamp(0.0, 1.0),
            self.roughness_factor.clamp(0.0, 1.0),
            self.occlusion_strength.clamp(0.0, 1.0),
            self.normal_scale,
        )
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct CameraSettings {
    pub position: [f32; 3],
    pub yaw_deg: f32,
    pub pitch_deg: f32,
    pub fov_deg: f32,
    pub speed: f32,
    pub sensitivity: f32,
}

impl Default for CameraSettings {
    fn default() -> Self {
        Self {
            position: [0.0, 1.6, 3.0],
            yaw_deg: -90.0,
            pitch_deg: 0.0,
            fov_deg: 60.0,
            speed: 10.0,
            sensitivity: 0.4,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct DebugVisual {
    pub lod_tint: bool,
    pub show_puffs: bool,
    pub show_ground: bool,
}

impl Default for DebugVisual {
    fn default() -> Self {
        Self {
            lod_tint: false,
            show_puffs: true,
            show_ground: true,
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct SceneConfig {
    pub fog: FogParams,
    pub flashlight: Flashlight,
    pub performance: PerformanceSettings,
    pub snow: SnowConfig,
    pub material: MaterialSettings,
    pub camera: CameraSettings,
    pub debug_visual: DebugVisual,
}

impl SceneConfig {
    pub fn to_json_string(&self) -> Result<String> {
        serde_json::to_string_pretty(self).context("serialising scene config")
    }

    pub fn from_json_str(json: &str) -> Result<Self> {
        serde_json::from_str(json).context("parsing scene config")
    }

    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        std::fs::write(path, self.to_json_string()?)
            .with_context(|| format!("writing scene config {}", path.display()))
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path)
            .with_context(|| format!("reading scene config {}", path.display()))?;
        Self::from_json_str(&json)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn presets_cycle_through_every_fixed_level() {
        let mut preset = Preset::Low;
        let mut counts = Vec::new();
        for _ in 0..5 {
            counts.push(preset.values().unwrap().0);
            preset = preset.next();
        }
        assert_eq!(counts, vec![10_000, 50_000, 100_000, 250_000, 500_000]);
        assert_eq!(preset, Preset::Low);
        assert_eq!(Preset::Custom.next(), Preset::Low);
    }

    #[test]
    fn custom_preset_keeps_values() {
        let mut perf = PerformanceSettings::default();
        perf.object_count = 1234;
        perf.apply_preset(Preset::Custom);
        assert_eq!(perf.object_count, 1234);
    }

    #[test]
    fn keys_are_camel_case() {
        let json = SceneConfig::default().to_json_string().unwrap();
        for key in [
            "\"debugVisual\"",
            "\"desaturationStrength\"",
            "\"innerCutoffCos\"",
            "\"highLodDistance\"",
            "\"settleDuration\"",
            "\"trailGain\"",
            "\"baseColorFactor\"",
        ] {
            assert!(json.contains(key), "missing {key}");
        }
    }

    #[test]
    fn partial_documents_fill_defaults() {
        let config = SceneConfig::from_json_str(r#"{"fog": {"density": 0.5}}"#).unwrap();
        assert_eq!(config.fog.density, 0.5);
        assert_eq!(config.fog.enabled, FogParams::default().enabled);
        assert_eq!(config.performance, PerformanceSettings::default());
    }
}
