#![allow(dead_code)]

use cgmath::Matrix4;
use flow2d::{
    Renderer2D, Texture, TextureId,
    data_structures::instance::{ModelRaw, TintRaw, UvRaw},
    error::RenderError,
    render::{ChunkBufferHandle, RenderBackend, validate_instances},
    tiles::TileVertex,
};

/// Everything a [`RecordingBackend`] was asked to do, in order.
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Call {
    Projection(Matrix4<f32>),
    Viewport(u32, u32),
    FrameStart,
    Instanced {
        texture: Texture,
        models: Vec<ModelRaw>,
        uvs: Vec<UvRaw>,
        tints: Vec<TintRaw>,
    },
    Upload {
        buffer: ChunkBufferHandle,
        vertices: usize,
    },
    StaticMesh {
        texture: Texture,
        buffer: ChunkBufferHandle,
        vertex_count: u32,
        model: Matrix4<f32>,
    },
    FrameEnd,
}

/// A GPU-less backend that records calls and enforces the frame bracket.
#[derive(Debug, Default)]
pub(crate) struct RecordingBackend {
    pub(crate) calls: Vec<Call>,
    pub(crate) fail_uploads: bool,
    /// Instanced draws of this texture fail with `MissingResource`.
    pub(crate) reject: Option<TextureId>,
    pub(crate) target: Option<(u32, u32)>,
    next_buffer: u32,
    frame_open: bool,
}

impl RecordingBackend {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn with_target(width: u32, height: u32) -> Self {
        Self {
            target: Some((width, height)),
            ..Self::default()
        }
    }

    pub(crate) fn clear(&mut self) {
        self.calls.clear();
    }

    pub(crate) fn instanced(&self) -> Vec<(&Texture, &[ModelRaw], &[UvRaw], &[TintRaw])> {
        self.calls
            .iter()
            .filter_map(|call| match call {
                Call::Instanced {
                    texture,
                    models,
                    uvs,
                    tints,
                } => Some((texture, models.as_slice(), uvs.as_slice(), tints.as_slice())),
                _ => None,
            })
            .collect()
    }

    pub(crate) fn uploads(&self) -> usize {
        self.calls
            .iter()
            .filter(|call| matches!(call, Call::Upload { .. }))
            .count()
    }

    pub(crate) fn static_meshes(&self) -> Vec<&Call> {
        self.calls
            .iter()
            .filter(|call| matches!(call, Call::StaticMesh { .. }))
            .collect()
    }
}

impl RenderBackend for RecordingBackend {
    fn set_projection_matrix(&mut self, view_projection: &Matrix4<f32>) {
        self.calls.push(Call::Projection(*view_projection));
    }

    fn update_viewport_size(&mut self, width: u32, height: u32) {
        self.calls.push(Call::Viewport(width, height));
    }

    fn target_size(&self) -> Option<(u32, u32)> {
        self.target
    }

    fn render_frame_start(&mut self) -> Result<(), RenderError> {
        self.frame_open = true;
        self.calls.push(Call::FrameStart);
        Ok(())
    }

    fn draw_instanced(
        &mut self,
        texture: Texture,
        models: &[ModelRaw],
        uvs: &[UvRaw],
        tints: &[TintRaw],
        count: usize,
    ) -> Result<(), RenderError> {
        if !self.frame_open {
            return Err(RenderError::FrameNotStarted);
        }
        if self.reject == Some(texture.id) {
            return Err(RenderError::MissingResource {
                texture: texture.id,
                reason: "rejected by the recording backend",
            });
        }
        validate_instances(texture, models, uvs, tints, count)?;
        self.calls.push(Call::Instanced {
            texture,
            models: models.to_vec(),
            uvs: uvs.to_vec(),
            tints: tints.to_vec(),
        });
        Ok(())
    }

    fn upload_chunk(
        &mut self,
        buffer: Option<ChunkBufferHandle>,
        vertices: &[TileVertex],
    ) -> Result<ChunkBufferHandle, RenderError> {
        if self.fail_uploads {
            return Err(RenderError::UnknownChunkBuffer(u32::MAX));
        }
        let buffer = buffer.unwrap_or_else(|| {
            self.next_buffer += 1;
            ChunkBufferHandle(self.next_buffer - 1)
        });
        self.calls.push(Call::Upload {
            buffer,
            vertices: vertices.len(),
        });
        Ok(buffer)
    }

    fn draw_static_mesh(
        &mut self,
        texture: Texture,
        buffer: ChunkBufferHandle,
        vertex_count: u32,
        model: &Matrix4<f32>,
    ) -> Result<(), RenderError> {
        if !self.frame_open {
            return Err(RenderError::FrameNotStarted);
        }
        self.calls.push(Call::StaticMesh {
            texture,
            buffer,
            vertex_count,
            model: *model,
        });
        Ok(())
    }

    fn render_frame_end(&mut self) -> Result<(), RenderError> {
        if !self.frame_open {
            return Err(RenderError::FrameNotStarted);
        }
        self.frame_open = false;
        self.calls.push(Call::FrameEnd);
        Ok(())
    }
}

pub(crate) fn recording_renderer() -> Renderer2D<RecordingBackend> {
    Renderer2D::new(RecordingBackend::new(), flow2d::RenderConfig::default())
}

pub(crate) fn texture(id: u32) -> Texture {
    Texture::new(TextureId(id), 64, 64)
}

/// Translation column of an instance's model matrix.
pub(crate) fn position_of(model: &ModelRaw) -> (f32, f32) {
    (model.model[3][0], model.model[3][1])
}
