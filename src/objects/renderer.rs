//! GPU side of the object field: one prism mesh, one instance stream and one
//! instanced draw per non-empty LOD bucket.

use anyhow::{Context, Result};

use crate::data_structures::{
    instance::DynamicBuffer,
    model::{DefaultTextures, DrawMesh, Material, MaterialUniform, Mesh},
    prism::PrismSet,
};
use crate::objects::{field::LodBatches, lod::LodLevel};
use crate::pipelines::instanced::InstancedPipeline;

#[derive(Debug)]
struct LodResources {
    pipeline: InstancedPipeline,
    meshes: [Mesh; 3],
    plain: Material,
    tinted: [Material; 3],
    buffers: [DynamicBuffer; 3],
}

/// Draws the object field. An uninitialized renderer (no surface program)
/// turns every draw into a no-op that logs once.
#[derive(Debug)]
pub struct ObjectRenderer {
    resources: Option<LodResources>,
    warned: bool,
    factors: MaterialUniform,
}

fn tinted(factors: MaterialUniform, level: LodLevel) -> MaterialUniform {
    let tint = level.tint();
    let mut base = factors.base_color_factor;
    for (channel, t) in base.iter_mut().zip(tint) {
        *channel *= t;
    }
    MaterialUniform {
        base_color_factor: base,
        ..factors
    }
}

impl ObjectRenderer {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        device: &wgpu::Device,
        color_format: wgpu::TextureFormat,
        material_layout: &wgpu::BindGroupLayout,
        camera_layout: &wgpu::BindGroupLayout,
        lighting_layout: &wgpu::BindGroupLayout,
        defaults: &DefaultTextures,
        factors: MaterialUniform,
    ) -> Result<Self> {
        let pipeline = InstancedPipeline::new(device, color_format, material_layout, camera_layout, lighting_layout)
            .context("object renderer not initialized")?;

        let prisms = PrismSet::new();
        let meshes = LodLevel::ALL.map(|level| Mesh::upload(device, &format!("prism_{level}"), prisms.mesh(level)));
        let plain = Material::new(device, "object", factors, [None; 4], defaults, material_layout);
        let tinted = LodLevel::ALL.map(|level| {
            Material::new(
                device,
                &format!("object_{level}"),
                tinted(factors, level),
                [None; 4],
                defaults,
                material_layout,
            )
        });
        let buffers = LodLevel::ALL.map(|level| DynamicBuffer::new(format!("{level} Instance Buffer")));

        Ok(Self {
            resources: Some(LodResources {
                pipeline,
                meshes,
                plain,
                tinted,
                buffers,
            }),
            warned: false,
            factors,
        })
    }

    pub fn uninitialized(factors: MaterialUniform) -> Self {
        Self {
            resources: None,
            warned: false,
            factors,
        }
    }

    pub fn is_initialized(&self) -> bool {
        self.resources.is_some()
    }

    fn warn_once(&mut self) {
        if !self.warned {
            log::warn!("object renderer is not initialized, skipping object draws");
            self.warned = true;
        }
    }

    /// The rigid surface program, shared with the ground quad.
    pub fn pipeline(&self) -> Option<&wgpu::RenderPipeline> {
        self.resources.as_ref().map(|resources| &resources.pipeline.pipeline)
    }

    /// Rewrite the material factors if they changed.
    pub fn set_material(&mut self, queue: &wgpu::Queue, factors: MaterialUniform) {
        let changed = factors.base_color_factor != self.factors.base_color_factor || factors.factors != self.factors.factors;
        if !changed {
            return;
        }
        self.factors = factors;
        if let Some(resources) = &mut self.resources {
            resources.plain.write_factors(queue, factors);
            for level in LodLevel::ALL {
                resources.tinted[level.index()].write_factors(queue, tinted(factors, level));
            }
        }
    }

    /// Upload this frame's batches. Empty buckets upload nothing.
    pub fn prepare(&mut self, device: &wgpu::Device, queue: &wgpu::Queue, batches: &LodBatches) {
        let Some(resources) = &mut self.resources else {
            self.warn_once();
            return;
        };
        for level in LodLevel::ALL {
            resources.buffers[level.index()].upload(device, queue, batches.get(level));
        }
    }

    /// Release every instance buffer, e.g. when the population is rebuilt.
    /// Buffers are recreated on the next upload.
    pub fn release_buffers(&mut self) {
        if let Some(resources) = &mut self.resources {
            for buffer in &mut resources.buffers {
                buffer.destroy();
            }
        }
    }

    /// Instances uploaded for `level` by the last [`prepare`](Self::prepare).
    pub fn uploaded(&self, level: LodLevel) -> u32 {
        self.resources
            .as_ref()
            .map_or(0, |resources| resources.buffers[level.index()].len())
    }

    /// Draw one bucket; camera and lighting groups must already be bound.
    /// Returns the number of instances drawn, 0 when the bucket is skipped.
    pub fn draw<'a>(&'a self, pass: &mut wgpu::RenderPass<'a>, level: LodLevel, lod_tint: bool) -> u32 {
        let Some(resources) = &self.resources else {
            return 0;
        };
        let buffer = &resources.buffers[level.index()];
        let Some(instances) = buffer.buffer() else {
            return 0;
        };
        if buffer.is_empty() {
            return 0;
        }
        let material = if lod_tint {
            &resources.tinted[level.index()]
        } else {
            &resources.plain
        };
        pass.set_pipeline(&resources.pipeline.pipeline);
        pass.set_vertex_buffer(1, instances.slice(..));
        pass.draw_mesh_instanced(&resources.meshes[level.index()], material, 0..buffer.len());
        buffer.len()
    }
}
