//! The instanced object field: a grid of prisms culled by distance and
//! drawn in three LOD buckets.

pub mod field;
pub mod lod;
pub mod renderer;

pub use field::{LodBatches, LodCounts, ObjectField};
pub use lod::{LodDistances, LodLevel};
pub use renderer::ObjectRenderer;
