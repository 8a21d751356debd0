//! Per-sprite data and its GPU instance layout.
//!
//! A sprite is drawn as one instance of a fixed unit quad. Each instance carries
//! three attributes, each living in its own vertex buffer stepped per instance:
//! the model matrix ([`ModelRaw`]), the UV rectangle ([`UvRaw`]) and the tint
//! ([`TintRaw`]).

use cgmath::{Matrix4, Rad, Vector2, Vector3};

use crate::data_structures::{Vertex, rect::Rect, texture::Texture};

/// Position, rotation (radians) and scale of an entity.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Transform {
    pub position: Vector2<f32>,
    pub rotation: f32,
    pub scale: Vector2<f32>,
}

impl Transform {
    /// Identity transformation (no move, rotate, or scale).
    pub fn new() -> Self {
        Self {
            position: Vector2::new(0.0, 0.0),
            rotation: 0.0,
            scale: Vector2::new(1.0, 1.0),
        }
    }

    pub fn at(x: f32, y: f32) -> Self {
        Self {
            position: Vector2::new(x, y),
            ..Self::new()
        }
    }
}

impl Default for Transform {
    fn default() -> Self {
        Self::new()
    }
}

/// The drawable part of an entity.
///
/// The texture is fixed once the sprite exists; the source rectangle and the
/// tint are free to change every frame (animation writes `source_rect`).
#[derive(Clone, Debug, PartialEq)]
pub struct SpriteInstance {
    texture: Texture,
    pub source_rect: Rect,
    /// Normalized anchor inside the source rectangle, `(0, 0)` is the top-left corner.
    pub pivot: Vector2<f32>,
    pub tint: [f32; 4],
    /// Primary sort key, lower layers are drawn first.
    pub layer: i32,
}

impl SpriteInstance {
    /// A sprite showing its whole texture, untinted, anchored top-left on layer 0.
    pub fn new(texture: Texture) -> Self {
        Self {
            texture,
            source_rect: Rect::new(0.0, 0.0, texture.width as f32, texture.height as f32),
            pivot: Vector2::new(0.0, 0.0),
            tint: [1.0, 1.0, 1.0, 1.0],
            layer: 0,
        }
    }

    pub fn with_source_rect(mut self, rect: Rect) -> Self {
        self.source_rect = rect;
        self
    }

    pub fn with_pivot(mut self, x: f32, y: f32) -> Self {
        self.pivot = Vector2::new(x, y);
        self
    }

    pub fn with_tint(mut self, tint: [f32; 4]) -> Self {
        self.tint = tint;
        self
    }

    pub fn with_layer(mut self, layer: i32) -> Self {
        self.layer = layer;
        self
    }

    pub fn texture(&self) -> Texture {
        self.texture
    }

    /// World matrix of the unit quad for this sprite.
    ///
    /// Applied to a quad vertex, the steps run in this order: shift by the
    /// negative pivot in unscaled local space, scale to the source rectangle
    /// times the transform scale, rotate around Z, translate to the position.
    pub fn model_matrix(&self, transform: &Transform) -> Matrix4<f32> {
        let pivot = Matrix4::from_translation(Vector3::new(-self.pivot.x, -self.pivot.y, 0.0));
        let scale = Matrix4::from_nonuniform_scale(
            self.source_rect.width * transform.scale.x,
            self.source_rect.height * transform.scale.y,
            1.0,
        );
        let rotation = Matrix4::from_angle_z(Rad(transform.rotation));
        let position = Vector3::new(transform.position.x, transform.position.y, 0.0);
        let translation = Matrix4::from_translation(position);
        translation * rotation * scale * pivot
    }

    /// UV rectangle of the source rect inside the texture.
    pub fn uv_rect(&self) -> [f32; 4] {
        self.source_rect
            .to_uv(self.texture.width as f32, self.texture.height as f32)
    }
}

/// Column-major model matrix as stored in the instance buffer.
#[repr(C)]
#[derive(Debug, Copy, Clone, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct ModelRaw {
    pub model: [[f32; 4]; 4],
}

impl From<Matrix4<f32>> for ModelRaw {
    fn from(matrix: Matrix4<f32>) -> Self {
        Self {
            model: matrix.into(),
        }
    }
}

/// `[u, v, u_span, v_span]` of the atlas region.
#[repr(C)]
#[derive(Debug, Copy, Clone, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct UvRaw {
    pub rect: [f32; 4],
}

/// Straight RGBA multiplier applied to the sampled texel.
#[repr(C)]
#[derive(Debug, Copy, Clone, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct TintRaw {
    pub color: [f32; 4],
}

/// A mat4 takes up four vertex slots as it is technically four vec4s.
impl Vertex for ModelRaw {
    fn desc() -> wgpu::VertexBufferLayout<'static> {
        use std::mem;
        wgpu::VertexBufferLayout {
            array_stride: mem::size_of::<ModelRaw>() as wgpu::BufferAddress,
            // Advance once per instance, i.e. an attribute divisor of one.
            step_mode: wgpu::VertexStepMode::Instance,
            attributes: &[
                wgpu::VertexAttribute {
                    offset: 0,
                    shader_location: 2,
                    format: wgpu::VertexFormat::Float32x4,
                },
                wgpu::VertexAttribute {
                    offset: mem::size_of::<[f32; 4]>() as wgpu::BufferAddress,
                    shader_location: 3,
                    format: wgpu::VertexFormat::Float32x4,
                },
                wgpu::VertexAttribute {
                    offset: mem::size_of::<[f32; 8]>() as wgpu::BufferAddress,
                    shader_location: 4,
                    format: wgpu::VertexFormat::Float32x4,
                },
                wgpu::VertexAttribute {
                    offset: mem::size_of::<[f32; 12]>() as wgpu::BufferAddress,
                    shader_location: 5,
                    format: wgpu::VertexFormat::Float32x4,
                },
            ],
        }
    }
}

impl Vertex for UvRaw {
    fn desc() -> wgpu::VertexBufferLayout<'static> {
        wgpu::VertexBufferLayout {
            array_stride: std::mem::size_of::<UvRaw>() as wgpu::BufferAddress,
            step_mode: wgpu::VertexStepMode::Instance,
            attributes: &[wgpu::VertexAttribute {
                offset: 0,
                shader_location: 6,
                format: wgpu::VertexFormat::Float32x4,
            }],
        }
    }
}

impl Vertex for TintRaw {
    fn desc() -> wgpu::VertexBufferLayout<'static> {
        wgpu::VertexBufferLayout {
            array_stride: std::mem::size_of::<TintRaw>() as wgpu::BufferAddress,
            step_mode: wgpu::VertexStepMode::Instance,
            attributes: &[wgpu::VertexAttribute {
                offset: 0,
                shader_location: 7,
                format: wgpu::VertexFormat::Float32x4,
            }],
        }
    }
}

/// Corner of the shared unit quad. Position doubles as texture coordinate.
#[repr(C)]
#[derive(Debug, Copy, Clone, bytemuck::Pod, bytemuck::Zeroable)]
pub struct QuadVertex {
    pub position: [f32; 2],
    pub tex_coords: [f32; 2],
}

/// Two triangles covering `[0, 1]²`, y pointing down like the screen.
#[rustfmt::skip]
pub const UNIT_QUAD: [QuadVertex; 6] = [
    QuadVertex { position: [0.0, 1.0], tex_coords: [0.0, 1.0] },
    QuadVertex { position: [0.0, 0.0], tex_coords: [0.0, 0.0] },
    QuadVertex { position: [1.0, 0.0], tex_coords: [1.0, 0.0] },
    QuadVertex { position: [0.0, 1.0], tex_coords: [0.0, 1.0] },
    QuadVertex { position: [1.0, 0.0], tex_coords: [1.0, 0.0] },
    QuadVertex { position: [1.0, 1.0], tex_coords: [1.0, 1.0] },
];

impl Vertex for QuadVertex {
    fn desc() -> wgpu::VertexBufferLayout<'static> {
        use std::mem;
        wgpu::VertexBufferLayout {
            array_stride: mem::size_of::<QuadVertex>() as wgpu::BufferAddress,
            step_mode: wgpu::VertexStepMode::Vertex,
            attributes: &[
                wgpu::VertexAttribute {
                    offset: 0,
                    shader_location: 0,
                    format: wgpu::VertexFormat::Float32x2,
                },
                wgpu::VertexAttribute {
                    offset: mem::size_of::<[f32; 2]>() as wgpu::BufferAddress,
                    shader_location: 1,
                    format: wgpu::VertexFormat::Float32x2,
                },
            ],
        }
    }
}
