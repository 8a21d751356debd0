//! flow2d
//!
//! The rendering core of a 2D engine. It turns per-frame entity state (transform,
//! sprite, animation) and an edited tile grid into as few GPU draw calls as
//! possible: sprites are sorted and batched per texture into instanced draws,
//! tiles are meshed per chunk and cached on the GPU until they change.
//!
//! High-level modules
//! - `animation`: sprite-sheet playback state and the system driving it
//! - `buffer`: growable instance buffers and static vertex buffers
//! - `camera`: orthographic 2D camera and its GPU uniform
//! - `context`: device, queue and render target, plus `RenderConfig`
//! - `data_structures`: entities, sprites, textures and vertex layouts
//! - `error`: the `RenderError` taxonomy
//! - `gpu`: the wgpu implementation of the render backend
//! - `pipelines`: sprite and tile render pipelines and their shaders
//! - `render`: the `RenderBackend` trait every draw goes through
//! - `renderer`: the `Renderer2D` facade used by the rest of an engine
//! - `sprite_batch`: sorting and per-texture batching of sprites
//! - `tiles`: chunked tilemap meshing
//!

pub mod animation;
pub mod buffer;
pub mod camera;
pub mod context;
pub mod data_structures;
pub mod error;
pub mod gpu;
pub mod pipelines;
pub mod render;
pub mod renderer;
pub mod sprite_batch;
pub mod tiles;

pub use animation::{AnimationFrame, AnimationState, AnimationSystem};
pub use camera::Camera2D;
pub use context::{Context, RenderConfig};
pub use data_structures::{
    entity::{Entity, EntityId},
    instance::{SpriteInstance, Transform},
    rect::Rect,
    texture::{GpuTexture, Texture, TextureId},
};
pub use error::RenderError;
pub use gpu::GpuBufferManager;
pub use render::RenderBackend;
pub use renderer::{Renderer2D, init_logging};
pub use sprite_batch::{RenderBatch, SpriteBatcher};
pub use tiles::{ChunkId, TileChunkMesher};

// Re-exports commonly used crates for convenience in downstream code.
pub use cgmath;
pub use wgpu;
pub use winit;
