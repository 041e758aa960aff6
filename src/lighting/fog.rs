//! Two-stage fog: desaturation toward the fog and background colors, and
//! absorption of direct light.

use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct FogParams {
    pub enabled: bool,
    pub color: [f32; 3],
    pub density: f32,
    /// `[0, 1]`
    pub desaturation_strength: f32,
    pub absorption_density: f32,
    /// `[0, 1]`
    pub absorption_strength: f32,
    pub background_color: [f32; 3],
}

impl Default for FogParams {
    fn default() -> Self {
        Self {
            enabled: true,
            color: [0.72, 0.76, 0.82],
            density: 0.012,
            desaturation_strength: 0.85,
            absorption_density: 0.02,
            absorption_strength: 0.6,
            background_color: [0.62, 0.67, 0.74],
        }
    }
}

/// std140 fog block, `@group(2) @binding(0)`.
#[repr(C)]
#[derive(Copy, Clone, Debug, Default, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct FogUniform {
    // rgb fog color, a density
    pub color_density: [f32; 4],
    // enabled, desaturation strength, absorption density, absorption strength
    pub params: [f32; 4],
    pub background: [f32; 4],
}

impl FogParams {
    /// Copy with the strengths clamped to `[0, 1]` and densities to `>= 0`.
    pub fn sanitized(&self) -> Self {
        Self {
            density: self.density.max(0.0),
            desaturation_strength: self.desaturation_strength.clamp(0.0, 1.0),
            absorption_density: self.absorption_density.max(0.0),
            absorption_strength: self.absorption_strength.clamp(0.0, 1.0),
            ..self.clone()
        }
    }

    pub fn to_uniform(&self) -> FogUniform {
        let fog = self.sanitized();
        let [r, g, b] = fog.color;
        let [br, bg, bb] = fog.background_color;
        FogUniform {
            color_density: [r, g, b, fog.density],
            params: [
                fog.enabled as u32 as f32,
                fog.desaturation_strength,
                fog.absorption_density,
                fog.absorption_strength,
            ],
            background: [br, bg, bb, 1.0],
        }
    }

    /// `1 - exp(-density * viewZ)`
    pub fn fog_factor(&self, view_z: f32) -> f32 {
        1.0 - (-self.density.max(0.0) * view_z.max(0.0)).exp()
    }

    /// `1 - exp(-absorptionDensity * viewZ)`
    pub fn absorption(&self, view_z: f32) -> f32 {
        1.0 - (-self.absorption_density.max(0.0) * view_z.max(0.0)).exp()
    }

    /// Factor applied to direct light (sun and flashlight) at depth `view_z`.
    pub fn direct_light_scale(&self, view_z: f32) -> f32 {
        if !self.enabled {
            return 1.0;
        }
        1.0 - self.absorption(view_z) * self.absorption_strength.clamp(0.0, 1.0)
    }

    /// Fog a lit surface color seen at depth `view_z`.
    pub fn apply(&self, color: [f32; 3], view_z: f32) -> [f32; 3] {
        if !self.enabled {
            return color;
        }
        let strength = self.desaturation_strength.clamp(0.0, 1.0);
        let f = self.fog_factor(view_z);
        let fogged = mix(color, self.color, f * strength);
        mix(fogged, self.background_color, f * f * strength)
    }
}

fn mix(a: [f32; 3], b: [f32; 3], t: f32) -> [f32; 3] {
    [0, 1, 2].map(|i| a[i] + (b[i] - a[i]) * t)
}
