//! Engine data structures shared by every component.
//!
//! - `handle`: generational entity handles and their slot pool
//! - `instance`: TRS transforms and the per-instance GPU record
//! - `model`: vertex layouts, meshes and materials
//! - `prism`: procedural LOD prisms and the ground quad
//! - `frustum`: view-frustum planes
//! - `texture`: GPU texture wrapper and creation utilities

pub mod frustum;
pub mod handle;
pub mod instance;
pub mod model;
pub mod prism;
pub mod texture;
