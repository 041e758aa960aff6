//! Per-frame render composition.
//!
//! The scene builds one immutable [`RenderInputs`] snapshot per frame; the
//! renderer only reads from it. [`FrameGraph::build`] turns the snapshot into
//! an ordered list of [`RenderNode`]s, one per draw the frame needs, so
//! which passes run (and in which order) is decided without a device.
//!
//! Node order follows the frame contract: ground, the three LOD buckets,
//! glTF models, snow particles, impact puffs and finally the overlay.

use cgmath::Matrix4;

use crate::camera::CameraUniform;
use crate::data_structures::model::MaterialUniform;
use crate::lighting::LightingBlock;
use crate::objects::{field::LodBatches, lod::LodLevel};
use crate::pipelines::accumulation::AccumulationFrame;

/// Pose of one loaded model for this frame.
#[derive(Debug, Clone, Copy)]
pub struct ModelFrame<'a> {
    pub slot: usize,
    pub placement: Matrix4<f32>,
    /// Joint palette per skin of the model, each at most 64 entries.
    pub palettes: &'a [Vec<Matrix4<f32>>],
}

#[derive(Debug, Clone, Copy)]
pub struct SnowFrame<'a> {
    pub particles: &'a [[f32; 4]],
    pub puffs: &'a [[f32; 4]],
    pub particle_size: f32,
    pub time: f32,
}

/// Everything the renderer reads in one frame.
#[derive(Debug, Clone)]
pub struct RenderInputs<'a> {
    pub camera: CameraUniform,
    pub lighting: LightingBlock,
    pub material: MaterialUniform,
    pub show_ground: bool,
    /// Height of the ground plane.
    pub floor_y: f32,
    pub lod_tint: bool,
    pub batches: &'a LodBatches,
    pub models: Vec<ModelFrame<'a>>,
    pub snow: Option<SnowFrame<'a>>,
    pub show_puffs: bool,
    pub overlay: Option<AccumulationFrame>,
}

/// The closed set of things a frame can draw.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RenderNode {
    Ground,
    Instanced { level: LodLevel, count: u32 },
    Model { slot: usize },
    Particles { count: u32 },
    Puffs { count: u32 },
    Overlay,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FrameGraph {
    nodes: Vec<RenderNode>,
}

impl FrameGraph {
    pub fn build(inputs: &RenderInputs) -> Self {
        let mut nodes = Vec::new();
        if inputs.show_ground {
            nodes.push(RenderNode::Ground);
        }
        for level in LodLevel::ALL {
            let count = inputs.batches.get(level).len() as u32;
            // Empty buckets never produce a zero-instance draw.
            if count > 0 {
                nodes.push(RenderNode::Instanced { level, count });
            }
        }
        nodes.extend(inputs.models.iter().map(|model| RenderNode::Model { slot: model.slot }));
        if let Some(snow) = &inputs.snow {
            if !snow.particles.is_empty() {
                nodes.push(RenderNode::Particles {
                    count: snow.particles.len() as u32,
                });
            }
            if inputs.show_puffs && !snow.puffs.is_empty() {
                nodes.push(RenderNode::Puffs {
                    count: snow.puffs.len() as u32,
                });
            }
        }
        if inputs.overlay.is_some() {
            nodes.push(RenderNode::Overlay);
        }
        Self { nodes }
    }

    pub fn nodes(&self) -> &[RenderNode] {
        &self.nodes
    }

    /// Instanced draws issued for the object field.
    pub fn instanced_draws(&self) -> usize {
        self.nodes
            .iter()
            .filter(|node| matches!(node, RenderNode::Instanced { .. }))
            .count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn inputs(batches: &LodBatches) -> RenderInputs<'_> {
        RenderInputs {
            camera: CameraUniform::new(),
            lighting: LightingBlock::default(),
            material: MaterialUniform::default(),
            show_ground: true,
            floor_y: 0.0,
            lod_tint: false,
            batches,
            models: Vec::new(),
            snow: None,
            show_puffs: true,
            overlay: None,
        }
    }

    #[test]
    fn empty_field_draws_no_instances() {
        let batches = LodBatches::default();
        let graph = FrameGraph::build(&inputs(&batches));
        assert_eq!(graph.instanced_draws(), 0);
        assert_eq!(graph.nodes(), &[RenderNode::Ground]);
    }

    #[test]
    fn snow_nodes_follow_models() {
        let batches = LodBatches::default();
        let particles = [[0.0, 1.0, 0.0, 0.5]];
        let palettes: Vec<Vec<Matrix4<f32>>> = Vec::new();
        let mut frame = inputs(&batches);
        frame.models.push(ModelFrame {
            slot: 0,
            placement: Matrix4::from_scale(1.0),
            palettes: &palettes,
        });
        frame.snow = Some(SnowFrame {
            particles: &particles,
            puffs: &[],
            particle_size: 0.1,
            time: 0.0,
        });
        let graph = FrameGraph::build(&frame);
        assert_eq!(
            graph.nodes(),
            &[
                RenderNode::Ground,
                RenderNode::Model { slot: 0 },
                RenderNode::Particles { count: 1 }
            ]
        );
    }
}
