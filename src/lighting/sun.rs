use cgmath::{InnerSpace, Vector3};

/// Directional light with an ambient floor. Direct sun light is scaled by
/// the fog absorption term like the flashlight.
#[derive(Clone, Debug, PartialEq)]
pub struct Sun {
    /// Direction the light travels in.
    pub direction: Vector3<f32>,
    pub color: [f32; 3],
    pub intensity: f32,
    pub ambient: f32,
}

impl Default for Sun {
    fn default() -> Self {
        Self {
            direction: Vector3::new(-0.3, -1.0, -0.4).normalize(),
            color: [0.85, 0.9, 1.0],
            intensity: 0.55,
            ambient: 0.35,
        }
    }
}

/// std140 sun block, `@group(2) @binding(1)`.
#[repr(C)]
#[derive(Copy, Clone, Debug, Default, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct SunUniform {
    // xyz direction, w ambient
    pub direction_ambient: [f32; 4],
    pub color_intensity: [f32; 4],
}

impl Sun {
    pub fn to_uniform(&self) -> SunUniform {
        let d = self.direction.normalize();
        let [r, g, b] = self.color;
        SunUniform {
            direction_ambient: [d.x, d.y, d.z, self.ambient],
            color_intensity: [r, g, b, self.intensity],
        }
    }

    /// Lambert term for a surface with normal `normal`.
    pub fn diffuse(&self, normal: Vector3<f32>) -> f32 {
        normal.normalize().dot(-self.direction.normalize()).max(0.0) * self.intensity
    }
}
