//! Motion-trail overlay.
//!
//! Two Rgba16Float targets alternate as read/write. Every frame the advection
//! program samples the previous target shifted along the overlay direction,
//! decays it and adds a procedural snow layer; the composite program then
//! alpha-blends the latest target over the scene scaled by the trail gain.
//!
//! [`AccumulationState`] owns the ping-pong bookkeeping and is plain data, so
//! the frame sequencing is testable without a device.

use anyhow::Result;
use wgpu::util::DeviceExt;

use crate::config::OverlaySettings;
use crate::data_structures::texture::{SamplerKind, Texture, create_sampler};
use crate::pipelines::basic::{PipelineOptions, mk_pipeline_layout, mk_render_pipeline, validated};

const SOURCE: &str = include_str!("accumulation.wgsl");

#[repr(C)]
#[derive(Debug, Copy, Clone, Default, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct AccumulationUniform {
    // uv offset xy, decay factor, time
    pub advect: [f32; 4],
    // snow speed, direction in radians, layer opacity, advection enabled
    pub snow: [f32; 4],
    // trail gain, aspect ratio
    pub composite: [f32; 4],
}

impl AccumulationUniform {
    pub fn trail_gain(&self) -> f32 {
        self.composite[0]
    }

    pub fn decay(&self) -> f32 {
        self.advect[2]
    }

    pub fn uv_offset(&self) -> [f32; 2] {
        [self.advect[0], self.advect[1]]
    }
}

/// What the GPU side does this frame.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct AccumulationFrame {
    /// Target sampled by the advection pass.
    pub read: usize,
    /// Target written by the advection pass and sampled by the composite.
    pub write: usize,
    /// Clear both targets to transparent black first.
    pub clear: bool,
    /// Run the advection pass; false on clear frames.
    pub advect: bool,
    pub uniform: AccumulationUniform,
}

#[derive(Debug, Clone, PartialEq)]
pub struct AccumulationState {
    latest: usize,
    clear_pending: bool,
    time: f32,
}

impl Default for AccumulationState {
    fn default() -> Self {
        Self::new()
    }
}

impl AccumulationState {
    /// Fresh targets hold garbage, so the first frame clears.
    pub fn new() -> Self {
        Self {
            latest: 0,
            clear_pending: true,
            time: 0.0,
        }
    }

    /// Clear both targets on the next frame. Also used after a resize.
    pub fn request_clear(&mut self) {
        self.clear_pending = true;
    }

    pub fn clear_pending(&self) -> bool {
        self.clear_pending
    }

    /// Index of the target written last.
    pub fn latest(&self) -> usize {
        self.latest
    }

    pub fn time(&self) -> f32 {
        self.time
    }

    /// Plan one frame and swap read/write.
    pub fn begin_frame(&mut self, dt: f32, settings: &OverlaySettings, aspect: f32) -> AccumulationFrame {
        let dt = dt.max(0.0);
        let read = self.latest;
        let write = 1 - read;
        let clear = self.clear_pending;
        self.clear_pending = false;
        self.latest = write;
        self.time += dt;

        let direction = settings.direction_deg.to_radians();
        let (sin, cos) = direction.sin_cos();
        let shift = settings.advection_scale * dt;
        let decay = (-settings.decay_per_sec.max(0.0) * dt).exp();
        let opacity = (0.35 * settings.snow_speed.max(0.0)).clamp(0.0, 1.0);
        let advect = !clear;

        let uniform = AccumulationUniform {
            advect: [cos * shift, sin * shift, if advect { decay } else { 0.0 }, self.time],
            snow: [settings.snow_speed, direction, opacity, advect as u32 as f32],
            composite: [if clear { 0.0 } else { settings.trail_gain.max(0.0) }, aspect.max(1e-3), 0.0, 0.0],
        };
        AccumulationFrame {
            read,
            write,
            clear,
            advect,
            uniform,
        }
    }
}

/// GPU half of the overlay: both programs and the ping-pong targets.
#[derive(Debug)]
pub struct AccumulationPass {
    advect: wgpu::RenderPipeline,
    composite: wgpu::RenderPipeline,
    layout: wgpu::BindGroupLayout,
    uniform_buffer: wgpu::Buffer,
    targets: [Texture; 2],
    // bind_groups[i] samples targets[i]
    bind_groups: [wgpu::BindGroup; 2],
    size: [u32; 2],
}

impl AccumulationPass {
    pub fn new(device: &wgpu::Device, surface_format: wgpu::TextureFormat, size: [u32; 2]) -> Result<Self> {
        let layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            entries: &[
                wgpu::BindGroupLayoutEntry {
                    binding: 0,
                    visibility: wgpu::ShaderStages::FRAGMENT,
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
            label: Some("accumulation_bind_group_layout"),
        });
        let uniform_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Accumulation Buffer"),
            contents: bytemuck::bytes_of(&AccumulationUniform::default()),
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
        });

        let (advect, composite) = validated(device, "accumulation programs", || {
            let pipeline_layout = mk_pipeline_layout(device, "Accumulation Pipeline Layout", &[&layout]);
            let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
                label: Some("Accumulation Shader"),
                source: wgpu::ShaderSource::Wgsl(SOURCE.into()),
            });
            let fullscreen = PipelineOptions {
                cull_mode: None,
                depth_write: None,
                ..Default::default()
            };
            let advect = mk_render_pipeline(
                device,
                &pipeline_layout,
                &shader,
                Texture::ACCUMULATION_FORMAT,
                &[],
                PipelineOptions {
                    label: "Accumulation Advect Pipeline",
                    fs_entry: "fs_advect",
                    ..fullscreen
                },
            );
            let composite = mk_render_pipeline(
                device,
                &pipeline_layout,
                &shader,
                surface_format,
                &[],
                PipelineOptions {
                    label: "Accumulation Composite Pipeline",
                    fs_entry: "fs_composite",
                    blend: Some(wgpu::BlendState::ALPHA_BLENDING),
                    ..fullscreen
                },
            );
            (advect, composite)
        })?;

        let targets = Self::mk_targets(device, size);
        let bind_groups = Self::mk_bind_groups(device, &layout, &uniform_buffer, &targets);
        Ok(Self {
            advect,
            composite,
            layout,
            uniform_buffer,
            targets,
            bind_groups,
            size,
        })
    }

    fn mk_targets(device: &wgpu::Device, size: [u32; 2]) -> [Texture; 2] {
        [0, 1].map(|i| {
            Texture::render_target(
                device,
                size,
                Texture::ACCUMULATION_FORMAT,
                &format!("accumulation_target_{i}"),
            )
        })
    }

    fn mk_bind_groups(
        device: &wgpu::Device,
        layout: &wgpu::BindGroupLayout,
        uniform_buffer: &wgpu::Buffer,
        targets: &[Texture; 2],
    ) -> [wgpu::BindGroup; 2] {
        let sampler = create_sampler(device, SamplerKind::Clamp);
        [0, 1].map(|i| {
            device.create_bind_group(&wgpu::BindGroupDescriptor {
                layout,
                entries: &[
                    wgpu::BindGroupEntry {
                        binding: 0,
                        resource: uniform_buffer.as_entire_binding(),
                    },
                    wgpu::BindGroupEntry {
                        binding: 1,
                        resource: wgpu::BindingResource::TextureView(&targets[i].view),
                    },
                    wgpu::BindGroupEntry {
                        binding: 2,
                        resource: wgpu::BindingResource::Sampler(&sampler),
                    },
                ],
                label: Some(&format!("accumulation_bind_group_{i}")),
            })
        })
    }

    /// Reallocate both targets. Content is lost; callers request a clear.
    pub fn resize(&mut self, device: &wgpu::Device, size: [u32; 2]) {
        if size == self.size {
            return;
        }
        self.targets = Self::mk_targets(device, size);
        self.bind_groups = Self::mk_bind_groups(device, &self.layout, &self.uniform_buffer, &self.targets);
        self.size = size;
    }

    pub fn size(&self) -> [u32; 2] {
        self.size
    }

    /// Record the clear/advect passes and the composite onto `surface`.
    pub fn encode(
        &self,
        encoder: &mut wgpu::CommandEncoder,
        queue: &wgpu::Queue,
        frame: &AccumulationFrame,
        surface: &wgpu::TextureView,
    ) {
        queue.write_buffer(&self.uniform_buffer, 0, bytemuck::bytes_of(&frame.uniform));

        if frame.clear {
            for target in &self.targets {
                encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                    label: Some("Accumulation Clear Pass"),
                    color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                        view: &target.view,
                        resolve_target: None,
                        ops: wgpu::Operations {
                            load: wgpu::LoadOp::Clear(wgpu::Color::TRANSPARENT),
                            store: wgpu::StoreOp::Store,
                        },
                        depth_slice: None,
                    })],
                    depth_stencil_attachment: None,
                    occlusion_query_set: None,
                    timestamp_writes: None,
                });
            }
        }

        if frame.advect {
            let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("Accumulation Advect Pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: &self.targets[frame.write].view,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(wgpu::Color::TRANSPARENT),
                        store: wgpu::StoreOp::Store,
                    },
                    depth_slice: None,
                })],
                depth_stencil_attachment: None,
                occlusion_query_set: None,
                timestamp_writes: None,
            });
            pass.set_pipeline(&self.advect);
            pass.set_bind_group(0, &self.bind_groups[frame.read], &[]);
            pass.draw(0..3, 0..1);
        }

        let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some("Accumulation Composite Pass"),
            color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                view: surface,
                resolve_target: None,
                ops: wgpu::Operations {
                    load: wgpu::LoadOp::Load,
                    store: wgpu::StoreOp::Store,
                },
                depth_slice: None,
            })],
            depth_stencil_attachment: None,
            occlusion_query_set: None,
            timestamp_writes: None,
        });
        pass.set_pipeline(&self.composite);
        pass.set_bind_group(0, &self.bind_groups[frame.write], &[]);
        pass.draw(0..3, 0..1);
    }
}
