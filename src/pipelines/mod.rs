//! Render pipelines and their WGSL programs.
//!
//! Every surface program shares three groups: material (0), camera (1) and
//! lighting (2). The skinned program adds its per-draw block at group 3.

pub mod accumulation;
pub mod basic;
pub mod instanced;
pub mod lighting;
pub mod skinned;
pub mod snow;
