//! The draw, upload and frame-bracket seam between the renderer and the GPU.
//!
//! [`RenderBackend`] is everything the rendering core needs from a graphics API.
//! The wgpu implementation is [`crate::gpu::GpuBufferManager`]; tests drive the
//! same code through a recording backend.
//!
//! # Key types
//!
//! - [`RenderBackend`] is the backend trait
//! - [`ChunkBufferHandle`] names a static vertex buffer owned by the backend
//! - [`DrawCommand`] is one draw recorded between frame start and frame end
//!

use std::ops::Range;

use cgmath::Matrix4;

use crate::{
    data_structures::{
        instance::{ModelRaw, TintRaw, UvRaw},
        texture::Texture,
    },
    error::RenderError,
    tiles::TileVertex,
};

/// Backend-owned static vertex buffer, as returned by [`RenderBackend::upload_chunk`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ChunkBufferHandle(pub u32);

/// One draw of a frame, in submission order.
///
/// Instanced draws refer to a range of the frame's shared instance arrays so
/// every batch of a frame ends up in the same three GPU buffers.
#[derive(Clone, Debug, PartialEq)]
pub enum DrawCommand {
    Instanced {
        texture: Texture,
        instances: Range<u32>,
    },
    StaticMesh {
        texture: Texture,
        buffer: ChunkBufferHandle,
        vertex_count: u32,
        model: Matrix4<f32>,
    },
}

/// Check the three parallel instance arrays of one draw against `count`.
pub fn validate_instances(
    texture: Texture,
    models: &[ModelRaw],
    uvs: &[UvRaw],
    tints: &[TintRaw],
    count: usize,
) -> Result<(), RenderError> {
    if models.len() != count || uvs.len() != count || tints.len() != count {
        return Err(RenderError::BufferMismatch {
            texture: texture.id,
            models: models.len(),
            uvs: uvs.len(),
            tints: tints.len(),
            count,
        });
    }
    Ok(())
}

/// A graphics backend able to draw batched sprites and static chunk meshes.
///
/// Draws are only valid between [`RenderBackend::render_frame_start`] and
/// [`RenderBackend::render_frame_end`]; outside of that they fail with
/// [`RenderError::FrameNotStarted`].
pub trait RenderBackend {
    /// Set the view-projection matrix used by every following draw.
    fn set_projection_matrix(&mut self, view_projection: &Matrix4<f32>);

    /// Resize the render target.
    fn update_viewport_size(&mut self, width: u32, height: u32);

    /// Current size of the render target, if the backend owns one.
    fn target_size(&self) -> Option<(u32, u32)> {
        None
    }

    /// Open a frame.
    fn render_frame_start(&mut self) -> Result<(), RenderError>;

    /// Draw `count` unit quads textured with `texture`, one per instance.
    ///
    /// The three instance arrays must all hold exactly `count` entries.
    fn draw_instanced(
        &mut self,
        texture: Texture,
        models: &[ModelRaw],
        uvs: &[UvRaw],
        tints: &[TintRaw],
        count: usize,
    ) -> Result<(), RenderError>;

    /// Create or overwrite a static vertex buffer.
    ///
    /// Passing the handle of a previous upload reuses that buffer.
    fn upload_chunk(
        &mut self,
        buffer: Option<ChunkBufferHandle>,
        vertices: &[TileVertex],
    ) -> Result<ChunkBufferHandle, RenderError>;

    /// Draw `vertex_count` vertices of an uploaded buffer as triangles.
    fn draw_static_mesh(
        &mut self,
        texture: Texture,
        buffer: ChunkBufferHandle,
        vertex_count: u32,
        model: &Matrix4<f32>,
    ) -> Result<(), RenderError>;

    /// Submit everything drawn since the frame was opened.
    fn render_frame_end(&mut self) -> Result<(), RenderError>;
}
