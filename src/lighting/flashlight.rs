use cgmath::{InnerSpace, MetricSpace, Point3, Vector3};
use serde::{Deserialize, Serialize};

/// Linear and quadratic distance attenuation terms.
pub const ATTENUATION_LINEAR: f32 = 0.02;
pub const ATTENUATION_QUADRATIC: f32 = 0.002;
/// Cones narrower than this (in cosine) are hard-edged.
const HARD_EDGE: f32 = 1e-6;

/// A spot light. `inner_cutoff_cos >= outer_cutoff_cos` always holds after
/// [`sanitized`](Self::sanitized).
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Flashlight {
    pub enabled: bool,
    pub position: [f32; 3],
    pub direction: [f32; 3],
    pub color: [f32; 3],
    pub brightness: f32,
    pub inner_cutoff_cos: f32,
    pub outer_cutoff_cos: f32,
    /// Re-aim from the camera every frame.
    pub follow_camera: bool,
}

impl Default for Flashlight {
    fn default() -> Self {
        Self {
            enabled: true,
            position: [0.0, 1.6, 3.0],
            direction: [0.0, 0.0, -1.0],
            color: [1.0, 0.95, 0.85],
            brightness: 3.0,
            inner_cutoff_cos: 12.5f32.to_radians().cos(),
            outer_cutoff_cos: 17.5f32.to_radians().cos(),
            follow_camera: true,
        }
    }
}

/// std140 flashlight block, `@group(2) @binding(2)`.
#[repr(C)]
#[derive(Copy, Clone, Debug, Default, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct FlashlightUniform {
    pub position: [f32; 4],
    pub direction: [f32; 4],
    pub color_brightness: [f32; 4],
    // enabled, inner cos, outer cos, brightness
    pub params: [f32; 4],
}

impl Flashlight {
    /// Copy with the cutoffs clamped to `[-1, 1]` and ordered.
    pub fn sanitized(&self) -> Self {
        let inner = self.inner_cutoff_cos.clamp(-1.0, 1.0);
        let outer = self.outer_cutoff_cos.clamp(-1.0, 1.0);
        Self {
            inner_cutoff_cos: inner.max(outer),
            outer_cutoff_cos: inner.min(outer),
            brightness: self.brightness.max(0.0),
            ..self.clone()
        }
    }

    /// Place the light just right of and below the eye, aimed along `front`.
    pub fn follow_camera(&mut self, eye: Point3<f32>, front: Vector3<f32>, right: Vector3<f32>, up: Vector3<f32>) {
        let position = eye + right * 0.15 - up * 0.1;
        self.position = position.into();
        self.direction = front.normalize().into();
    }

    pub fn toggle(&mut self) {
        self.enabled = !self.enabled;
    }

    pub fn to_uniform(&self) -> FlashlightUniform {
        let light = self.sanitized();
        let [px, py, pz] = light.position;
        let d = safe_direction(light.direction);
        let [r, g, b] = light.color;
        FlashlightUniform {
            position: [px, py, pz, 1.0],
            direction: [d.x, d.y, d.z, 0.0],
            color_brightness: [r, g, b, light.brightness],
            params: [
                light.enabled as u32 as f32,
                light.inner_cutoff_cos,
                light.outer_cutoff_cos,
                light.brightness,
            ],
        }
    }

    /// Cone intensity at `frag`: falloff times brightness, 0 when disabled.
    pub fn intensity(&self, frag: Point3<f32>) -> f32 {
        if !self.enabled {
            return 0.0;
        }
        let light = self.sanitized();
        let to_light = Point3::from(light.position) - frag;
        if to_light.magnitude2() <= f32::EPSILON {
            return light.brightness;
        }
        let cos_theta = to_light.normalize().dot(-safe_direction(light.direction));
        cone_falloff(cos_theta, light.inner_cutoff_cos, light.outer_cutoff_cos) * light.brightness
    }

    /// Full contribution at `frag`: cone intensity times distance attenuation.
    pub fn contribution(&self, frag: Point3<f32>) -> f32 {
        self.intensity(frag) * attenuation(Point3::from(self.position).distance(frag))
    }
}

fn safe_direction(direction: [f32; 3]) -> Vector3<f32> {
    let d = Vector3::from(direction);
    if d.magnitude2() > f32::EPSILON {
        d.normalize()
    } else {
        Vector3::new(0.0, 0.0, -1.0)
    }
}

/// `smoothstep(outer, inner, cos_theta)`, degenerating to a hard step when
/// the band is empty.
pub fn cone_falloff(cos_theta: f32, inner: f32, outer: f32) -> f32 {
    if inner - outer <= HARD_EDGE {
        return if cos_theta >= outer { 1.0 } else { 0.0 };
    }
    let t = ((cos_theta - outer) / (inner - outer)).clamp(0.0, 1.0);
    t * t * (3.0 - 2.0 * t)
}

/// `1 / (1 + 0.02 d + 0.002 d^2)`
pub fn attenuation(distance: f32) -> f32 {
    let d = distance.max(0.0);
    1.0 / (1.0 + ATTENUATION_LINEAR * d + ATTENUATION_QUADRATIC * d * d)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn uniform_is_four_vec4s() {
        assert_eq!(std::mem::size_of::<FlashlightUniform>(), 64);
    }

    #[test]
    fn swapped_cutoffs_are_reordered() {
        let light = Flashlight {
            inner_cutoff_cos: 0.8,
            outer_cutoff_cos: 0.9,
            ..Default::default()
        }
        .sanitized();
        assert_eq!(light.inner_cutoff_cos, 0.9);
        assert_eq!(light.outer_cutoff_cos, 0.8);
    }
}
