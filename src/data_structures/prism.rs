//! Procedural geometry: the three-level prism set drawn by the object field
//! and the ground quad.
//!
//! A prism with `n` sides has radius 0.5 and height 1, centered at the
//! origin, with flat normals. Its triangle count is `2n` for the walls plus
//! `2(n - 2)` for the two fan caps, so a higher side count is always at least
//! as heavy as a lower one.

use std::f32::consts::TAU;

use crate::data_structures::model::{MeshData, ModelVertex};
use crate::objects::lod::LodLevel;

pub const PRISM_RADIUS: f32 = 0.5;
pub const PRISM_HEIGHT: f32 = 1.0;

/// Number of sides of the prism drawn at `level`.
pub const fn sides_for(level: LodLevel) -> u32 {
    match level {
        LodLevel::High => 32,
        LodLevel::Medium => 12,
        LodLevel::Low => 4,
    }
}

/// The immutable mesh set, indexed by [`LodLevel::index`].
#[derive(Clone, Debug)]
pub struct PrismSet {
    meshes: [MeshData<ModelVertex>; 3],
}

impl PrismSet {
    pub fn new() -> Self {
        Self {
            meshes: LodLevel::ALL.map(|level| prism(sides_for(level))),
        }
    }

    pub fn mesh(&self, level: LodLevel) -> &MeshData<ModelVertex> {
        &self.meshes[level.index()]
    }
}

impl Default for PrismSet {
    fn default() -> Self {
        Self::new()
    }
}

/// Build an `n`-sided prism. `sides` below 3 is raised to 3.
pub fn prism(sides: u32) -> MeshData<ModelVertex> {
    let sides = sides.max(3);
    let half = PRISM_HEIGHT * 0.5;
    let corner = |i: u32| {
        // Offset by half a step so the 4-sided prism is axis aligned.
        let angle = (i as f32 + 0.5) / sides as f32 * TAU;
        (angle.cos() * PRISM_RADIUS, angle.sin() * PRISM_RADIUS)
    };

    let mut mesh = MeshData::default();

    for i in 0..sides {
        let (x0, z0) = corner(i);
        let (x1, z1) = corner((i + 1) % sides);
        let mid = (i as f32 + 1.0) / sides as f32 * TAU;
        let normal = [mid.cos(), 0.0, mid.sin()];
        let u0 = i as f32 / sides as f32;
        let u1 = (i + 1) as f32 / sides as f32;
        let base = mesh.vertices.len() as u32;
        mesh.vertices.extend_from_slice(&[
            ModelVertex {
                position: [x0, -half, z0],
                normal,
                tex_coords: [u0, 1.0],
            },
            ModelVertex {
                position: [x1, -half, z1],
                normal,
                tex_coords: [u1, 1.0],
            },
            ModelVertex {
                position: [x1, half, z1],
                normal,
                tex_coords: [u1, 0.0],
            },
            ModelVertex {
                position: [x0, half, z0],
                normal,
                tex_coords: [u0, 0.0],
            },
        ]);
        // Counter-clockwise seen from outside.
        mesh.indices
            .extend_from_slice(&[base, base + 2, base + 1, base, base + 3, base + 2]);
    }

    for (y, normal_y) in [(half, 1.0f32), (-half, -1.0)] {
        let base = mesh.vertices.len() as u32;
        for i in 0..sides {
            let (x, z) = corner(i);
            mesh.vertices.push(ModelVertex {
                position: [x, y, z],
                normal: [0.0, normal_y, 0.0],
                tex_coords: [x + 0.5, z + 0.5],
            });
        }
        for i in 1..sides - 1 {
            if normal_y > 0.0 {
                mesh.indices.extend_from_slice(&[base, base + i + 1, base + i]);
            } else {
                mesh.indices.extend_from_slice(&[base, base + i, base + i + 1]);
            }
        }
    }

    mesh
}

/// Horizontal quad of side `2 * half_extent` at height `y`, facing up, with
/// UVs repeating `uv_repeat` times across.
pub fn ground_quad(half_extent: f32, y: f32, uv_repeat: f32) -> MeshData<ModelVertex> {
    let h = half_extent;
    let r = uv_repeat;
    let up = [0.0, 1.0, 0.0];
    MeshData {
        vertices: vec![
            ModelVertex {
                position: [-h, y, -h],
                normal: up,
                tex_coords: [0.0, 0.0],
            },
            ModelVertex {
                position: [h, y, -h],
                normal: up,
                tex_coords: [r, 0.0],
            },
            ModelVertex {
                position: [h, y, h],
                normal: up,
                tex_coords: [r, r],
            },
            ModelVertex {
                position: [-h, y, h],
                normal: up,
                tex_coords: [0.0, r],
            },
        ],
        indices: vec![0, 2, 1, 0, 3, 2],
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn triangle_counts_are_ordered_by_level() {
        let set = PrismSet::new();
        let high = set.mesh(LodLevel::High).triangle_count();
        let medium = set.mesh(LodLevel::Medium).triangle_count();
        let low = set.mesh(LodLevel::Low).triangle_count();
        assert_eq!(high, 4 * 32 - 4);
        assert_eq!(medium, 4 * 12 - 4);
        assert_eq!(low, 4 * 4 - 4);
        assert!(high >= medium && medium >= low);
    }

    #[test]
    fn every_mesh_is_valid_and_fits_the_unit_box() {
        let set = PrismSet::new();
        for level in LodLevel::ALL {
            let mesh = set.mesh(level);
            assert!(mesh.is_valid());
            for v in &mesh.vertices {
                assert!(v.position[1].abs() <= 0.5 + 1e-6);
                let r = (v.position[0].powi(2) + v.position[2].powi(2)).sqrt();
                assert!(r <= PRISM_RADIUS + 1e-5);
                let n = v.normal;
                let len = (n[0] * n[0] + n[1] * n[1] + n[2] * n[2]).sqrt();
                assert!((len - 1.0).abs() < 1e-5);
            }
        }
    }

    #[test]
    fn walls_face_outwards() {
        let mesh = prism(6);
        for tri in mesh.indices.chunks(3) {
            let [a, b, c] = [0, 1, 2].map(|k| mesh.vertices[tri[k] as usize].position);
            let e1 = [b[0] - a[0], b[1] - a[1], b[2] - a[2]];
            let e2 = [c[0] - a[0], c[1] - a[1], c[2] - a[2]];
            let face = [
                e1[1] * e2[2] - e1[2] * e2[1],
                e1[2] * e2[0] - e1[0] * e2[2],
                e1[0] * e2[1] - e1[1] * e2[0],
            ];
            let n = mesh.vertices[tri[0] as usize].normal;
            let dot = face[0] * n[0] + face[1] * n[1] + face[2] * n[2];
            assert!(dot > 0.0, "triangle {tri:?} winds against its normal");
        }
    }
}
