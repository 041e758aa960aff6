//! frost-ngin
//!
//! A real-time snow scene viewer built on instancing. Up to half a million
//! objects are frustum culled and bucketed into three levels of detail, each
//! bucket drawn with a single instanced call; skinned glTF models animate on
//! the CPU; a snow particle simulator lands flakes on the ground with impact
//! puffs, lit by a camera-following flashlight under a two-stage fog.
//!
//! High-level modules
//! - `scene`: the authoritative per-frame state and its update order
//! - `objects`: LOD + culling engine and its instanced renderer
//! - `animation`: clips, playback, pose evaluation and joint palettes
//! - `particles`: the snow simulator
//! - `lighting`: fog, sun and flashlight blocks shared by every program
//! - `render` / `renderer`: the frame snapshot, its frame graph and the GPU side
//! - `pipelines`: wgpu pipelines and WGSL programs, including the overlay
//! - `resources`: file lookup, textures and glTF loading
//! - `config`: the JSON configuration snapshot
//! - `flow`: the winit event loop
//!

pub mod animation;
pub mod camera;
pub mod config;
pub mod context;
pub mod data_structures;
pub mod diagnostics;
pub mod flow;
pub mod input;
pub mod lighting;
pub mod objects;
pub mod particles;
pub mod pipelines;
pub mod render;
pub mod renderer;
pub mod resources;
pub mod scene;

// Re-exports commonly used types for convenience in downstream code.
pub use config::SceneConfig;
pub use scene::Scene;
