use anyhow::{Result, anyhow};

use crate::data_structures::texture::Texture;

/// Per-pipeline knobs on top of the shared defaults (triangle lists, CCW
/// front faces, single sample).
#[derive(Debug, Clone, Copy)]
pub struct PipelineOptions<'a> {
    pub label: &'a str,
    pub vs_entry: &'a str,
    pub fs_entry: &'a str,
    pub blend: Option<wgpu::BlendState>,
    pub cull_mode: Option<wgpu::Face>,
    /// `None` disables depth testing entirely.
    pub depth_write: Option<bool>,
}

impl Default for PipelineOptions<'_> {
    fn default() -> Self {
        Self {
            label: "Render Pipeline",
            vs_entry: "vs_main",
            fs_entry: "fs_main",
            blend: Some(wgpu::BlendState::REPLACE),
            cull_mode: Some(wgpu::Face::Back),
            depth_write: Some(true),
        }
    }
}

pub fn mk_pipeline_layout(
    device: &wgpu::Device,
    label: &str,
    bind_group_layouts: &[&wgpu::BindGroupLayout],
) -> wgpu::PipelineLayout {
    device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
        label: Some(label),
        bind_group_layouts,
        push_constant_ranges: &[],
    })
}

pub fn mk_render_pipeline(
    device: &wgpu::Device,
    layout: &wgpu::PipelineLayout,
    shader: &wgpu::ShaderModule,
    color_format: wgpu::TextureFormat,
    vertex_layouts: &[wgpu::VertexBufferLayout],
    options: PipelineOptions,
) -> wgpu::RenderPipeline {
    device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
        cache: None,
        label: Some(options.label),
        layout: Some(layout),
        vertex: wgpu::VertexState {
            module: shader,
            entry_point: Some(options.vs_entry),
            buffers: vertex_layouts,
            compilation_options: Default::default(),
        },
        fragment: Some(wgpu::FragmentState {
            module: shader,
            entry_point: Some(options.fs_entry),
            targets: &[Some(wgpu::ColorTargetState {
                format: color_format,
                blend: options.blend,
                write_mask: wgpu::ColorWrites::ALL,
            })],
            compilation_options: Default::default(),
        }),
        primitive: wgpu::PrimitiveState {
            topology: wgpu::PrimitiveTopology::TriangleList,
            strip_index_format: None,
            front_face: wgpu::FrontFace::Ccw,
            cull_mode: options.cull_mode,
            polygon_mode: wgpu::PolygonMode::Fill,
            unclipped_depth: false,
            conservative: false,
        },
        depth_stencil: options.depth_write.map(|depth_write_enabled| wgpu::DepthStencilState {
            format: Texture::DEPTH_FORMAT,
            depth_write_enabled,
            depth_compare: wgpu::CompareFunction::Less,
            stencil: wgpu::StencilState::default(),
            bias: wgpu::DepthBiasState::default(),
        }),
        multisample: wgpu::MultisampleState {
            count: 1,
            mask: !0,
            alpha_to_coverage_enabled: false,
        },
        multiview: None,
    })
}

/// Join WGSL fragments into one module source. Shared declarations come
/// first so later fragments can use them.
pub fn compose(parts: &[&str]) -> String {
    parts.join("\n")
}

/// Run `build` inside a validation error scope so shader compile and
/// pipeline link errors surface as `Err` instead of the uncaptured handler.
pub fn validated<T>(device: &wgpu::Device, what: &str, build: impl FnOnce() -> T) -> Result<T> {
    device.push_error_scope(wgpu::ErrorFilter::Validation);
    let value = build();
    match futures::executor::block_on(device.pop_error_scope()) {
        Some(error) => Err(anyhow!("{what} failed validation: {error}")),
        None => Ok(value),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn compose_keeps_fragment_order() {
        let source = compose(&["struct A { x: f32 }", "fn f(a: A) -> f32 { return a.x; }"]);
        assert!(source.find("struct A").unwrap() < source.find("fn f").unwrap());
    }

    #[test]
    fn shared_fragments_declare_every_group() {
        let camera = include_str!("camera.wgsl");
        let lighting = include_str!("lighting.wgsl");
        assert!(camera.contains("@group(1) @binding(0)"));
        for binding in 0..3 {
            assert!(lighting.contains(&format!("@group(2) @binding({binding})")));
        }
    }

    #[test]
    fn every_material_factor_reaches_the_shading() {
        let material = include_str!("material.wgsl");
        for factor in ["factors.x", "factors.y", "factors.z", "factors.w"] {
            assert!(material.contains(&format!("material.{factor}")), "{factor} is never read");
        }
        assert!(material.contains("shade(base.rgb, n, frag, camera.view_pos.xyz, metallic, roughness"));
    }
}
