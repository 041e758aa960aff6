use anyhow::Result;

use crate::data_structures::{
    instance::InstanceRaw,
    model::{ModelVertex, Vertex},
};
use crate::pipelines::basic::{PipelineOptions, compose, mk_pipeline_layout, mk_render_pipeline, validated};

pub const SOURCE_PARTS: [&str; 4] = [
    include_str!("camera.wgsl"),
    include_str!("lighting.wgsl"),
    include_str!("material.wgsl"),
    include_str!("surface.wgsl"),
];

/// Opaque surface program for rigid instances: prism LOD batches and the
/// single-instance ground quad.
#[derive(Debug)]
pub struct InstancedPipeline {
    pub pipeline: wgpu::RenderPipeline,
}

impl InstancedPipeline {
    pub fn new(
        device: &wgpu::Device,
        color_format: wgpu::TextureFormat,
        material_layout: &wgpu::BindGroupLayout,
        camera_layout: &wgpu::BindGroupLayout,
        lighting_layout: &wgpu::BindGroupLayout,
    ) -> Result<Self> {
        let pipeline = validated(device, "instanced surface program", || {
            let layout = mk_pipeline_layout(
                device,
                "Instanced Pipeline Layout",
                &[material_layout, camera_layout, lighting_layout],
            );
            let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
                label: Some("Instanced Surface Shader"),
                source: wgpu::ShaderSource::Wgsl(compose(&SOURCE_PARTS).into()),
            });
            mk_render_pipeline(
                device,
                &layout,
                &shader,
                color_format,
                &[ModelVertex::desc(), InstanceRaw::desc()],
                PipelineOptions {
                    label: "Instanced Pipeline",
                    ..Default::default()
                },
            )
        })?;
        Ok(Self { pipeline })
    }
}
