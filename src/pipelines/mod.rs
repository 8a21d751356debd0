//! wgpu pipelines of the renderer.
//!
//! - `basic` has the shared pipeline and bind group layout helpers
//! - `sprite` draws instanced unit quads, one batch per texture
//! - `tile` draws the static per-chunk tile meshes

pub mod basic;
pub mod sprite;
pub mod tile;
