use anyhow::Result;
use wgpu::util::DeviceExt;

use crate::data_structures::texture::{SamplerKind, Texture, create_sampler};
use crate::pipelines::basic::{PipelineOptions, compose, mk_pipeline_layout, mk_render_pipeline, validated};

pub const SOURCE_PARTS: [&str; 3] = [
    include_str!("camera.wgsl"),
    include_str!("lighting.wgsl"),
    include_str!("snow.wgsl"),
];

/// Six vertices per billboard quad, generated from `vertex_index`.
pub const QUAD_VERTICES: u32 = 6;

/// Both streams are `vec4<f32>` per instance at location 0: `(x, y, z, seed)`
/// for flakes, `(x, y, z, age / lifetime)` for impact puffs.
pub fn billboard_desc() -> wgpu::VertexBufferLayout<'static> {
    wgpu::VertexBufferLayout {
        array_stride: std::mem::size_of::<[f32; 4]>() as wgpu::BufferAddress,
        step_mode: wgpu::VertexStepMode::Instance,
        attributes: &[wgpu::VertexAttribute {
            offset: 0,
            shader_location: 0,
            format: wgpu::VertexFormat::Float32x4,
        }],
    }
}

#[repr(C)]
#[derive(Debug, Copy, Clone, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct SnowUniform {
    // particle size, time, puff size, has texture
    pub params: [f32; 4],
    pub color: [f32; 4],
}

impl SnowUniform {
    pub fn new(particle_size: f32, time: f32, has_texture: bool) -> Self {
        Self {
            params: [particle_size, time, particle_size * 4.0, has_texture as u32 as f32],
            color: [0.95, 0.97, 1.0, 0.9],
        }
    }
}

/// Flake and puff billboard programs plus their parameter group.
#[derive(Debug)]
pub struct SnowPipeline {
    pub particles: wgpu::RenderPipeline,
    pub puffs: wgpu::RenderPipeline,
    pub params_layout: wgpu::BindGroupLayout,
    pub params_buffer: wgpu::Buffer,
    pub params_bind_group: wgpu::BindGroup,
    has_texture: bool,
}

impl SnowPipeline {
    /// Without a `flake` texture the fragment program draws soft discs.
    pub fn new(
        device: &wgpu::Device,
        color_format: wgpu::TextureFormat,
        flake: &Texture,
        has_texture: bool,
        camera_layout: &wgpu::BindGroupLayout,
        lighting_layout: &wgpu::BindGroupLayout,
    ) -> Result<Self> {
        let params_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            entries: &[
                wgpu::BindGroupLayoutEntry {
                    binding: 0,
                    visibility: wgpu::ShaderStages::VERTEX | wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Buffer {
                        ty: wgpu::BufferBindingType::Uniform,
                        has_dynamic_offset: false,
                        min_binding_size: None,
                    },
                    count: None,
                },
                wgpu::BindGroupLayoutEntry {
                    binding: 1,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Texture {
                        multisampled: false,
                        view_dimension: wgpu::TextureViewDimension::D2,
                        sample_type: wgpu::TextureSampleType::Float { filterable: true },
                    },
                    count: None,
                },
                wgpu::BindGroupLayoutEntry {
                    binding: 2,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering),
                    count: None,
                },
            ],
            label: Some("snow_bind_group_layout"),
        });
        let params_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Snow Params Buffer"),
            contents: bytemuck::bytes_of(&SnowUniform::new(0.08, 0.0, has_texture)),
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
        });
        let sampler = create_sampler(device, SamplerKind::Repeat);
        let params_bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            layout: &params_layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: params_buffer.as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: wgpu::BindingResource::TextureView(&flake.view),
                },
                wgpu::BindGroupEntry {
                    binding: 2,
                    resource: wgpu::BindingResource::Sampler(&sampler),
                },
            ],
            label: Some("snow_bind_group"),
        });

        let (particles, puffs) = validated(device, "snow billboard program", || {
            let layout = mk_pipeline_layout(
                device,
                "Snow Pipeline Layout",
                &[&params_layout, camera_layout, lighting_layout],
            );
            let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
                label: Some("Snow Shader"),
                source: wgpu::ShaderSource::Wgsl(compose(&SOURCE_PARTS).into()),
            });
            let billboard = PipelineOptions {
                blend: Some(wgpu::BlendState::ALPHA_BLENDING),
                cull_mode: None,
                // Tested against the scene but never occlude each other.
                depth_write: Some(false),
                ..Default::default()
            };
            let particles = mk_render_pipeline(
                device,
                &layout,
                &shader,
                color_format,
                &[billboard_desc()],
                PipelineOptions {
                    label: "Snow Particle Pipeline",
                    ..billboard
                },
            );
            let puffs = mk_render_pipeline(
                device,
                &layout,
                &shader,
                color_format,
                &[billboard_desc()],
                PipelineOptions {
                    label: "Snow Puff Pipeline",
                    vs_entry: "vs_puff",
                    fs_entry: "fs_puff",
                    ..billboard
                },
            );
            (particles, puffs)
        })?;

        Ok(Self {
            particles,
            puffs,
            params_layout,
            params_buffer,
            params_bind_group,
            has_texture,
        })
    }

    pub fn write_params(&self, queue: &wgpu::Queue, particle_size: f32, time: f32) {
        let uniform = SnowUniform::new(particle_size, time, self.has_texture);
        queue.write_buffer(&self.params_buffer, 0, bytemuck::bytes_of(&uniform));
    }
}
