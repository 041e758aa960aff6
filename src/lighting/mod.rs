//! The lighting contract shared by every surface program.
//!
//! One [`LightingBlock`] is derived per frame from the authoritative fog,
//! sun and flashlight state and bound at group 2: binding 0 fog, binding 1
//! sun, binding 2 flashlight. The CPU functions here mirror the shader math.

pub mod flashlight;
pub mod fog;
pub mod sun;

use flashlight::{Flashlight, FlashlightUniform};
use fog::{FogParams, FogUniform};
use sun::{Sun, SunUniform};

#[derive(Copy, Clone, Debug, Default, PartialEq)]
pub struct LightingBlock {
    pub fog: FogUniform,
    pub sun: SunUniform,
    pub flashlight: FlashlightUniform,
}

impl LightingBlock {
    pub fn new(fog: &FogParams, sun: &Sun, flashlight: &Flashlight) -> Self {
        Self {
            fog: fog.to_uniform(),
            sun: sun.to_uniform(),
            flashlight: flashlight.to_uniform(),
        }
    }

    /// Clear color matching the fog background, so fully fogged surfaces
    /// vanish into it.
    pub fn clear_color(&self) -> wgpu::Color {
        let [r, g, b, a] = self.fog.background;
        wgpu::Color {
            r: r as f64,
            g: g as f64,
            b: b as f64,
            a: a as f64,
        }
    }
}
