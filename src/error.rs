//! Error taxonomy of the rendering core.
//!
//! Only [`RenderError::UninitializedContext`] is fatal: it is returned while the
//! graphics context is being created and aborts startup. Every other variant is
//! recoverable and is absorbed (and logged) by [`crate::renderer::Renderer2D`]
//! so that a broken sprite, batch or chunk never costs more than its own pixels.

use thiserror::Error;

use crate::{data_structures::texture::TextureId, tiles::ChunkId};

#[derive(Debug, Error)]
pub enum RenderError {
    /// No adapter, device or surface could be obtained. Fatal.
    #[error("graphics context is not initialized: {0}")]
    UninitializedContext(String),

    /// A sprite or draw referenced a texture that is not resolved.
    #[error("texture {texture:?} is not resolved ({reason})")]
    MissingResource {
        texture: TextureId,
        reason: &'static str,
    },

    /// The parallel per-instance arrays of one batch disagree in length.
    #[error(
        "instance arrays for texture {texture:?} do not line up: {models} models, {uvs} uvs, {tints} tints, {count} requested"
    )]
    BufferMismatch {
        texture: TextureId,
        models: usize,
        uvs: usize,
        tints: usize,
        count: usize,
    },

    /// A tile write supplied a texture other than the one its chunk is bound to.
    #[error(
        "chunk {chunk:?} is bound to texture {bound:?}, refusing tile with texture {supplied:?}"
    )]
    AmbiguousChunkTexture {
        chunk: ChunkId,
        bound: TextureId,
        supplied: TextureId,
    },

    #[error("entity `{entity}` is missing its {component} component")]
    MissingComponent {
        entity: String,
        component: &'static str,
    },

    #[error("draw issued outside of render_frame_start/render_frame_end")]
    FrameNotStarted,

    #[error("chunk buffer {0} does not exist")]
    UnknownChunkBuffer(u32),

    #[error("surface error: {0}")]
    Surface(#[from] wgpu::SurfaceError),

    #[error("frame readback failed: {0}")]
    Readback(String),
}

impl RenderError {
    /// Whether the frame loop may keep going after this error.
    pub fn is_recoverable(&self) -> bool {
        !matches!(self, RenderError::UninitializedContext(_))
    }
}
