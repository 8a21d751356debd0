//! Engine data structures: entities, sprites, textures and GPU vertex layouts.
//!
//! - `entity` is the fixed-shape entity record with optional component slots
//! - `instance` holds transforms, sprites and the per-instance GPU layouts
//! - `rect` is the pixel-space rectangle used for atlas regions
//! - `texture` contains texture handles and the GPU texture wrapper

pub mod entity;
pub mod instance;
pub mod rect;
pub mod texture;

/// Anything that can be bound as a vertex buffer.
///
/// As vertex data lives directly in GPU memory we need to tell wgpu what the
/// bytes refer to: stride, step mode and the shader location of every attribute.
pub trait Vertex {
    fn desc() -> wgpu::VertexBufferLayout<'static>;
}
