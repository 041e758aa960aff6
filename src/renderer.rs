//! GPU side of a frame.
//!
//! [`Renderer`] owns every device resource: the shared camera and lighting
//! groups, the object field renderer, the ground, uploaded glTF models, the
//! snow billboards and the accumulation overlay. Each frame it uploads the
//! dynamic data of a [`RenderInputs`] snapshot and executes the
//! [`FrameGraph`] built from it in one main pass, followed by the overlay.

use std::collections::HashMap;

use anyhow::{Context as _, Result};
use cgmath::Point3;

use crate::camera::{CameraResources, CameraUniform};
use crate::data_structures::{
    instance::{DynamicBuffer, InstanceRaw},
    model::{DefaultTextures, DrawMesh, Material, MaterialUniform, Mesh, TextureSlot, material_layout},
    prism::ground_quad,
    texture::Texture,
};
use crate::lighting::LightingBlock;
use crate::objects::renderer::ObjectRenderer;
use crate::pipelines::{
    accumulation::AccumulationPass,
    lighting::LightingResources,
    skinned::{SkinBinding, SkinUniform, SkinnedPipeline},
    snow::{QUAD_VERTICES, SnowPipeline},
};
use crate::render::{FrameGraph, RenderInputs, RenderNode};
use crate::resources::{glb::GltfAsset, texture};
use crate::scene::GROUND_HALF_EXTENT;

pub const GROUND_TEXTURE: &str = "ground.png";
pub const SNOWFLAKE_TEXTURE: &str = "snowflake.png";

#[derive(Debug)]
struct Ground {
    mesh: Mesh,
    material: Material,
    instance: DynamicBuffer,
}

#[derive(Debug)]
struct PrimitiveGpu {
    mesh: Mesh,
    material: usize,
    skin: Option<usize>,
    binding: SkinBinding,
}

#[derive(Debug)]
struct ModelGpu {
    name: String,
    primitives: Vec<PrimitiveGpu>,
    materials: Vec<Material>,
}

#[derive(Debug)]
struct SnowGpu {
    pipeline: SnowPipeline,
    particles: DynamicBuffer,
    puffs: DynamicBuffer,
}

#[derive(Debug)]
pub struct Renderer {
    color_format: wgpu::TextureFormat,
    size: [u32; 2],
    camera: CameraResources,
    lighting: LightingResources,
    material_layout: wgpu::BindGroupLayout,
    defaults: DefaultTextures,
    objects: ObjectRenderer,
    ground: Ground,
    skinned: SkinnedPipeline,
    models: Vec<ModelGpu>,
    snow: SnowGpu,
    accumulation: Option<AccumulationPass>,
    depth: Texture,
}

impl Renderer {
    /// The surface, skinned and snow programs are required; the overlay is
    /// optional and is logged and skipped when it fails validation.
    pub fn new(
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        color_format: wgpu::TextureFormat,
        size: [u32; 2],
        material: MaterialUniform,
    ) -> Result<Self> {
        let camera = CameraResources::new(device, &CameraUniform::new());
        let lighting = LightingResources::new(device, &LightingBlock::default());
        let material_layout = material_layout(device);
        let defaults = DefaultTextures::new(device, queue);

        let objects = ObjectRenderer::new(
            device,
            color_format,
            &material_layout,
            &camera.bind_group_layout,
            &lighting.bind_group_layout,
            &defaults,
            material,
        )?;

        let ground_texture = texture::load_optional_texture(GROUND_TEXTURE, false, device, queue);
        let ground = Ground {
            mesh: Mesh::upload(device, "ground", &ground_quad(GROUND_HALF_EXTENT, 0.0, GROUND_HALF_EXTENT / 4.0)),
            material: Material::new(
                device,
                "ground",
                MaterialUniform::new([0.92, 0.94, 0.97, 1.0], 0.0, 0.95, 1.0, 1.0),
                [ground_texture.as_ref(), None, None, None],
                &defaults,
                &material_layout,
            ),
            instance: DynamicBuffer::new("Ground Instance Buffer"),
        };

        let skinned = SkinnedPipeline::new(
            device,
            color_format,
            &material_layout,
            &camera.bind_group_layout,
            &lighting.bind_group_layout,
        )
        .context("model program")?;

        let flake = texture::load_optional_texture(SNOWFLAKE_TEXTURE, false, device, queue);
        let has_flake = flake.is_some();
        let flake = flake.unwrap_or_else(|| defaults.white_srgb.clone());
        let snow = SnowPipeline::new(
            device,
            color_format,
            &flake,
            has_flake,
            &camera.bind_group_layout,
            &lighting.bind_group_layout,
        )
        .context("snow program")?;
        let snow = SnowGpu {
            pipeline: snow,
            particles: DynamicBuffer::new("Snow Particle Buffer"),
            puffs: DynamicBuffer::new("Snow Puff Buffer"),
        };

        let accumulation = AccumulationPass::new(device, color_format, size)
            .inspect_err(|e| log::error!("accumulation overlay disabled: {e:#}"))
            .ok();

        Ok(Self {
            color_format,
            size,
            depth: Texture::depth(device, size),
            camera,
            lighting,
            material_layout,
            defaults,
            objects,
            ground,
            skinned,
            models: Vec::new(),
            snow,
            accumulation,
        })
    }

    pub fn color_format(&self) -> wgpu::TextureFormat {
        self.color_format
    }

    pub fn size(&self) -> [u32; 2] {
        self.size
    }

    pub fn objects(&self) -> &ObjectRenderer {
        &self.objects
    }

    /// Upload `asset` into the next model slot. Slots line up with the
    /// scene's model list; an asset whose images fail to upload keeps the
    /// affected slots on the default textures.
    pub fn add_model(&mut self, device: &wgpu::Device, queue: &wgpu::Queue, asset: &GltfAsset) -> usize {
        let slot = self.models.len();

        let mut textures: HashMap<(usize, bool), Texture> = HashMap::new();
        for desc in &asset.materials {
            for material_slot in TextureSlot::ALL {
                let Some(image_index) = desc.textures[material_slot as usize] else {
                    continue;
                };
                let linear = !material_slot.is_srgb();
                if textures.contains_key(&(image_index, linear)) {
                    continue;
                }
                let Some(Some(image)) = asset.images.get(image_index) else {
                    continue;
                };
                let label = format!("{} image {image_index}", asset.name);
                match texture::upload_image(image, linear, &label, device, queue) {
                    Ok(uploaded) => {
                        textures.insert((image_index, linear), uploaded);
                    }
                    Err(e) => log::warn!("{label}: {e:#}"),
                }
            }
        }

        let mut materials: Vec<Material> = asset
            .materials
            .iter()
            .map(|desc| {
                let bound = TextureSlot::ALL.map(|material_slot| {
                    desc.textures[material_slot as usize]
                        .and_then(|image| textures.get(&(image, !material_slot.is_srgb())))
                });
                Material::new(
                    device,
                    &desc.name,
                    desc.factors,
                    bound,
                    &self.defaults,
                    &self.material_layout,
                )
            })
            .collect();
        if materials.is_empty() {
            materials.push(Material::new(
                device,
                "default",
                MaterialUniform::default(),
                [None; 4],
                &self.defaults,
                &self.material_layout,
            ));
        }

        let primitives = asset
            .primitives
            .iter()
            .filter(|primitive| primitive.mesh.is_valid() && !primitive.mesh.indices.is_empty())
            .map(|primitive| PrimitiveGpu {
                mesh: Mesh::upload(device, &primitive.name, &primitive.mesh),
                material: primitive.material.min(materials.len() - 1),
                skin: primitive.skin,
                binding: SkinBinding::new(device, &self.skinned.draw_layout, &format!("{} Skin Buffer", primitive.name)),
            })
            .collect::<Vec<_>>();

        log::info!(
            "uploaded model {}: {} primitives, {} materials, {} textures",
            asset.name,
            primitives.len(),
            materials.len(),
            textures.len()
        );
        self.models.push(ModelGpu {
            name: asset.name.clone(),
            primitives,
            materials,
        });
        slot
    }

    /// Drop the object instance buffers after the population was rebuilt.
    pub fn release_object_buffers(&mut self) {
        self.objects.release_buffers();
    }

    /// Recreate the size dependent targets. Zero extents are ignored.
    pub fn resize(&mut self, device: &wgpu::Device, size: [u32; 2]) {
        if size[0] == 0 || size[1] == 0 || size == self.size {
            return;
        }
        self.size = size;
        self.depth = Texture::depth(device, size);
        if let Some(accumulation) = &mut self.accumulation {
            accumulation.resize(device, size);
        }
    }

    /// Upload the frame's dynamic data, record every pass into one encoder
    /// and submit it. Returns the executed graph.
    pub fn render(
        &mut self,
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        target: &wgpu::TextureView,
        inputs: &RenderInputs,
    ) -> FrameGraph {
        self.prepare(device, queue, inputs);
        let graph = FrameGraph::build(inputs);

        let mut encoder = device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
            label: Some("Frame Encoder"),
        });
        self.encode_main(&mut encoder, target, inputs, &graph);
        if let (Some(frame), Some(accumulation)) = (&inputs.overlay, &self.accumulation) {
            accumulation.encode(&mut encoder, queue, frame, target);
        }
        queue.submit(std::iter::once(encoder.finish()));
        graph
    }

    fn prepare(&mut self, device: &wgpu::Device, queue: &wgpu::Queue, inputs: &RenderInputs) {
        self.camera.write(queue, &inputs.camera);
        self.lighting.write(queue, &inputs.lighting);
        self.objects.set_material(queue, inputs.material);
        self.objects.prepare(device, queue, inputs.batches);
        if inputs.show_ground {
            let placement = InstanceRaw::from_position(Point3::new(0.0, inputs.floor_y, 0.0));
            self.ground.instance.upload(device, queue, &[placement]);
        }

        for frame in &inputs.models {
            let Some(model) = self.models.get(frame.slot) else {
                continue;
            };
            for primitive in &model.primitives {
                let uniform = match primitive.skin {
                    Some(skin) => SkinUniform::skinned(
                        frame.placement,
                        frame.palettes.get(skin).map(Vec::as_slice).unwrap_or_default(),
                    ),
                    None => SkinUniform::rigid(frame.placement),
                };
                primitive.binding.write(queue, &uniform);
            }
        }

        if let Some(frame) = &inputs.snow {
            let snow = &mut self.snow;
            snow.particles.upload(device, queue, frame.particles);
            snow.puffs.upload(device, queue, frame.puffs);
            snow.pipeline.write_params(queue, frame.particle_size, frame.time);
        }
    }

    fn encode_main(
        &self,
        encoder: &mut wgpu::CommandEncoder,
        target: &wgpu::TextureView,
        inputs: &RenderInputs,
        graph: &FrameGraph,
    ) {
        let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some("Main Pass"),
            color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                view: target,
                resolve_target: None,
                ops: wgpu::Operations {
                    load: wgpu::LoadOp::Clear(inputs.lighting.clear_color()),
                    store: wgpu::StoreOp::Store,
                },
                depth_slice: None,
            })],
            depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                view: &self.depth.view,
                depth_ops: Some(wgpu::Operations {
                    load: wgpu::LoadOp::Clear(1.0),
                    store: wgpu::StoreOp::Store,
                }),
                stencil_ops: None,
            }),
            occlusion_query_set: None,
            timestamp_writes: None,
        });
        pass.set_bind_group(1, &self.camera.bind_group, &[]);
        pass.set_bind_group(2, &self.lighting.bind_group, &[]);

        for node in graph.nodes() {
            match *node {
                RenderNode::Ground => self.draw_ground(&mut pass),
                RenderNode::Instanced { level, .. } => {
                    self.objects.draw(&mut pass, level, inputs.lod_tint);
                }
                RenderNode::Model { slot } => self.draw_model(&mut pass, slot),
                RenderNode::Particles { count } => {
                    let snow = &self.snow;
                    draw_billboards(&mut pass, &snow.pipeline, &snow.pipeline.particles, &snow.particles, count);
                }
                RenderNode::Puffs { count } => {
                    let snow = &self.snow;
                    draw_billboards(&mut pass, &snow.pipeline, &snow.pipeline.puffs, &snow.puffs, count);
                }
                // Recorded after the main pass.
                RenderNode::Overlay => {}
            }
        }
    }

    fn draw_ground<'a>(&'a self, pass: &mut wgpu::RenderPass<'a>) {
        let (Some(pipeline), Some(instance)) = (self.objects.pipeline(), self.ground.instance.buffer()) else {
            return;
        };
        pass.set_pipeline(pipeline);
        pass.set_vertex_buffer(1, instance.slice(..));
        pass.draw_mesh_instanced(&self.ground.mesh, &self.ground.material, 0..1);
    }

    fn draw_model<'a>(&'a self, pass: &mut wgpu::RenderPass<'a>, slot: usize) {
        let Some(model) = self.models.get(slot) else {
            return;
        };
        pass.set_pipeline(&self.skinned.pipeline);
        for primitive in &model.primitives {
            pass.set_bind_group(3, &primitive.binding.bind_group, &[]);
            pass.draw_mesh_instanced(&primitive.mesh, &model.materials[primitive.material], 0..1);
        }
        log::trace!("drew model {} ({} primitives)", model.name, model.primitives.len());
    }
}

fn draw_billboards<'a>(
    pass: &mut wgpu::RenderPass<'a>,
    snow: &'a SnowPipeline,
    pipeline: &'a wgpu::RenderPipeline,
    instances: &'a DynamicBuffer,
    count: u32,
) {
    let Some(buffer) = instances.buffer() else {
        return;
    };
    let count = count.min(instances.len());
    if count == 0 {
        return;
    }
    pass.set_pipeline(pipeline);
    pass.set_bind_group(0, &snow.params_bind_group, &[]);
    pass.set_vertex_buffer(0, buffer.slice(..));
    pass.draw(0..QUAD_VERTICES, 0..count);
}

/// Map a render result onto a pixel readback size: wgpu requires rows of
/// 256-byte multiples when copying textures into buffers.
pub fn padded_bytes_per_row(width: u32) -> u32 {
    let unpadded = width * 4;
    let align = wgpu::COPY_BYTES_PER_ROW_ALIGNMENT;
    unpadded.div_ceil(align) * align
}

/// Render `inputs` into an offscreen texture and read it back as RGBA8.
/// Used by headless checks; the caller's device must support the target
/// format.
pub fn render_offscreen(
    device: &wgpu::Device,
    queue: &wgpu::Queue,
    renderer: &mut Renderer,
    inputs: &RenderInputs,
) -> Result<(FrameGraph, image::RgbaImage)> {
    let [width, height] = renderer.size();
    let extent = wgpu::Extent3d {
        width,
        height,
        depth_or_array_layers: 1,
    };
    let target = device.create_texture(&wgpu::TextureDescriptor {
        label: Some("Offscreen Target"),
        size: extent,
        mip_level_count: 1,
        sample_count: 1,
        dimension: wgpu::TextureDimension::D2,
        format: renderer.color_format(),
        usage: wgpu::TextureUsages::COPY_SRC | wgpu::TextureUsages::RENDER_ATTACHMENT,
        view_formats: &[],
    });
    let view = target.create_view(&wgpu::TextureViewDescriptor::default());
    let graph = renderer.render(device, queue, &view, inputs);

    let bytes_per_row = padded_bytes_per_row(width);
    let output = device.create_buffer(&wgpu::BufferDescriptor {
        label: Some("Offscreen Readback"),
        size: (bytes_per_row * height) as wgpu::BufferAddress,
        usage: wgpu::BufferUsages::COPY_DST | wgpu::BufferUsages::MAP_READ,
        mapped_at_creation: false,
    });
    let mut encoder = device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
        label: Some("Readback Encoder"),
    });
    encoder.copy_texture_to_buffer(
        wgpu::TexelCopyTextureInfo {
            aspect: wgpu::TextureAspect::All,
            texture: &target,
            mip_level: 0,
            origin: wgpu::Origin3d::ZERO,
        },
        wgpu::TexelCopyBufferInfo {
            buffer: &output,
            layout: wgpu::TexelCopyBufferLayout {
                offset: 0,
                bytes_per_row: Some(bytes_per_row),
                rows_per_image: Some(height),
            },
        },
        extent,
    );
    queue.submit(std::iter::once(encoder.finish()));

    let slice = output.slice(..);
    let (sender, receiver) = futures::channel::oneshot::channel();
    slice.map_async(wgpu::MapMode::Read, move |result| {
        let _ = sender.send(result);
    });
    device.poll(wgpu::PollType::Wait {
        submission_index: None,
        timeout: Some(std::time::Duration::from_secs(3)),
    })?;
    futures::executor::block_on(receiver)??;

    let data = slice.get_mapped_range();
    let mut pixels = Vec::with_capacity((width * height * 4) as usize);
    for row in data.chunks(bytes_per_row as usize).take(height as usize) {
        pixels.extend_from_slice(&row[..(width * 4) as usize]);
    }
    drop(data);
    output.unmap();

    let image = image::RgbaImage::from_raw(width, height, pixels)
        .ok_or_else(|| anyhow::anyhow!("readback size mismatch"))?;
    Ok((graph, image))
}
