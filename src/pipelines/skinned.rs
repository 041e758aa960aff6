use anyhow::Result;
use cgmath::{Matrix4, SquareMatrix};
use wgpu::util::DeviceExt;

use crate::animation::skin::MAX_JOINTS;
use crate::data_structures::model::{SkinnedVertex, Vertex};
use crate::pipelines::basic::{PipelineOptions, compose, mk_pipeline_layout, mk_render_pipeline, validated};

pub const SOURCE_PARTS: [&str; 4] = [
    include_str!("camera.wgsl"),
    include_str!("lighting.wgsl"),
    include_str!("material.wgsl"),
    include_str!("skinned.wgsl"),
];

/// Per-draw block at group 3: placement, skinning flags and the joint
/// palette.
#[repr(C)]
#[derive(Debug, Copy, Clone, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct SkinUniform {
    pub model: [[f32; 4]; 4],
    // skinned, joint count
    pub flags: [u32; 4],
    pub joints: [[[f32; 4]; 4]; MAX_JOINTS],
}

impl Default for SkinUniform {
    fn default() -> Self {
        Self::rigid(Matrix4::identity())
    }
}

impl SkinUniform {
    /// A primitive drawn in mesh space with `model` applied, no skinning.
    pub fn rigid(model: Matrix4<f32>) -> Self {
        Self {
            model: model.into(),
            flags: [0; 4],
            joints: [Matrix4::identity().into(); MAX_JOINTS],
        }
    }

    /// A skinned primitive. An empty palette falls back to [`rigid`](Self::rigid).
    pub fn skinned(model: Matrix4<f32>, palette: &[Matrix4<f32>]) -> Self {
        let mut uniform = Self::rigid(model);
        let count = palette.len().min(MAX_JOINTS);
        if count == 0 {
            return uniform;
        }
        for (slot, matrix) in uniform.joints.iter_mut().zip(&palette[..count]) {
            *slot = (*matrix).into();
        }
        uniform.flags = [1, count as u32, 0, 0];
        uniform
    }

    pub fn is_skinned(&self) -> bool {
        self.flags[0] == 1
    }

    pub fn joint_count(&self) -> usize {
        self.flags[1] as usize
    }
}

pub fn mk_draw_layout(device: &wgpu::Device) -> wgpu::BindGroupLayout {
    device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
        entries: &[wgpu::BindGroupLayoutEntry {
            binding: 0,
            visibility: wgpu::ShaderStages::VERTEX,
            ty: wgpu::BindingType::Buffer {
                ty: wgpu::BufferBindingType::Uniform,
                has_dynamic_offset: false,
                min_binding_size: None,
            },
            count: None,
        }],
        label: Some("skin_bind_group_layout"),
    })
}

/// The uniform buffer and bind group of one glTF primitive.
#[derive(Debug)]
pub struct SkinBinding {
    pub buffer: wgpu::Buffer,
    pub bind_group: wgpu::BindGroup,
}

impl SkinBinding {
    pub fn new(device: &wgpu::Device, layout: &wgpu::BindGroupLayout, label: &str) -> Self {
        let buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some(label),
            contents: bytemuck::bytes_of(&SkinUniform::default()),
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
        });
        let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: buffer.as_entire_binding(),
            }],
            label: Some(label),
        });
        Self { buffer, bind_group }
    }

    pub fn write(&self, queue: &wgpu::Queue, uniform: &SkinUniform) {
        queue.write_buffer(&self.buffer, 0, bytemuck::bytes_of(uniform));
    }
}

#[derive(Debug)]
pub struct SkinnedPipeline {
    pub pipeline: wgpu::RenderPipeline,
    pub draw_layout: wgpu::BindGroupLayout,
}

impl SkinnedPipeline {
    pub fn new(
        device: &wgpu::Device,
        color_format: wgpu::TextureFormat,
        material_layout: &wgpu::BindGroupLayout,
        camera_layout: &wgpu::BindGroupLayout,
        lighting_layout: &wgpu::BindGroupLayout,
    ) -> Result<Self> {
        let draw_layout = mk_draw_layout(device);
        let pipeline = validated(device, "skinned surface program", || {
            let layout = mk_pipeline_layout(
                device,
                "Skinned Pipeline Layout",
                &[material_layout, camera_layout, lighting_layout, &draw_layout],
            );
            let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
                label: Some("Skinned Surface Shader"),
                source: wgpu::ShaderSource::Wgsl(compose(&SOURCE_PARTS).into()),
            });
            mk_render_pipeline(
                device,
                &layout,
                &shader,
                color_format,
                &[SkinnedVertex::desc()],
                PipelineOptions {
                    label: "Skinned Pipeline",
                    // glTF materials may be double sided.
                    cull_mode: None,
                    ..Default::default()
                },
            )
        })?;
        Ok(Self { pipeline, draw_layout })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn uniform_matches_shader_block_size() {
        // mat4 + vec4<u32> + 64 mat4
        assert_eq!(std::mem::size_of::<SkinUniform>(), 64 + 16 + 64 * 64);
    }

    #[test]
    fn palette_is_truncated_to_joint_limit() {
        let palette = vec![Matrix4::from_scale(2.0); 80];
        let uniform = SkinUniform::skinned(Matrix4::identity(), &palette);
        assert!(uniform.is_skinned());
        assert_eq!(uniform.joint_count(), MAX_JOINTS);
    }

    #[test]
    fn empty_palette_disables_skinning() {
        let uniform = SkinUniform::skinned(Matrix4::identity(), &[]);
        assert!(!uniform.is_skinned());
        assert_eq!(uniform.joint_count(), 0);
    }
}
