//! The collaborator-facing renderer.
//!
//! [`Renderer2D`] ties the pieces together: it owns the registered entities, the
//! camera, the animation system, the sprite batcher and the tile mesher, and
//! drives them against a [`RenderBackend`] it receives at construction.
//!
//! A frame runs as
//!
//! ```text
//! update_animation_frames(dt)
//! update_sprite_batch_by_texture()
//! render_frame_start()      // also uploads the camera projection
//! render_tiles()
//! render_sprites()
//! render_frame_end()
//! ```
//!
//! or as a single [`Renderer2D::render_frame`]. Recoverable errors of single
//! sprites, batches or chunks are logged and skipped; only frame bracket
//! failures reach the caller.

use instant::Duration;

use crate::{
    animation::AnimationSystem,
    camera::Camera2D,
    context::RenderConfig,
    data_structures::{
        entity::{Entity, EntityId},
        rect::Rect,
        texture::Texture,
    },
    error::RenderError,
    render::RenderBackend,
    sprite_batch::SpriteBatcher,
    tiles::{ChunkId, TileChunkMesher},
};

pub struct Renderer2D<B: RenderBackend> {
    backend: B,
    camera: Camera2D,
    entities: Vec<Entity>,
    sprites: Vec<EntityId>,
    animations: AnimationSystem,
    batcher: SpriteBatcher,
    tiles: TileChunkMesher,
}

impl<B: RenderBackend> Renderer2D<B> {
    /// The camera starts at the backend's target size, or at the configured
    /// viewport when the backend has no target of its own.
    pub fn new(backend: B, config: RenderConfig) -> Self {
        let (width, height) = backend
            .target_size()
            .filter(|&(w, h)| w > 0 && h > 0)
            .unwrap_or((config.viewport_width, config.viewport_height));
        Self {
            backend,
            camera: Camera2D::new("main", width, height),
            entities: Vec::new(),
            sprites: Vec::new(),
            animations: AnimationSystem::new(),
            batcher: SpriteBatcher::new(),
            tiles: TileChunkMesher::new(config.chunk_size, config.tile_size),
        }
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn backend_mut(&mut self) -> &mut B {
        &mut self.backend
    }

    pub fn camera(&self) -> &Camera2D {
        &self.camera
    }

    pub fn camera_mut(&mut self) -> &mut Camera2D {
        &mut self.camera
    }

    pub fn batcher(&self) -> &SpriteBatcher {
        &self.batcher
    }

    pub fn tiles(&self) -> &TileChunkMesher {
        &self.tiles
    }

    pub fn animations(&self) -> &AnimationSystem {
        &self.animations
    }

    /// Enroll an entity into sprite and animation tracking.
    ///
    /// An animation needs a sprite to write its frames into, so an entity with an
    /// animation but no sprite is rejected.
    pub fn register_object(&mut self, entity: Entity) -> Result<EntityId, RenderError> {
        if entity.animation.is_some() && entity.sprite.is_none() {
            return Err(RenderError::MissingComponent {
                entity: entity.name,
                component: "sprite",
            });
        }

        let id = EntityId(self.entities.len() as u32);
        if entity.sprite.is_some() {
            self.sprites.push(id);
        }
        if entity.animation.is_some() {
            self.animations.track(id);
        }
        log::debug!("Registered `{}` as {id:?} with {:?}", entity.name, entity.describe());
        self.entities.push(entity);
        Ok(id)
    }

    pub fn entity(&self, id: EntityId) -> Option<&Entity> {
        self.entities.get(id.0 as usize)
    }

    pub fn entity_mut(&mut self, id: EntityId) -> Option<&mut Entity> {
        self.entities.get_mut(id.0 as usize)
    }

    pub fn entities(&self) -> &[Entity] {
        &self.entities
    }

    /// Forward a window resize to the camera and the backend.
    pub fn update_viewport_size(&mut self, width: u32, height: u32) {
        self.camera.update_viewport_size(width, height);
        self.backend.update_viewport_size(width, height);
    }

    /// Advance every animation by `dt`. Returns how many sprites changed frame.
    pub fn update_animation_frames(&mut self, dt: Duration) -> usize {
        self.animations.update(&mut self.entities, dt)
    }

    /// Rebuild the per-texture batches from the current sprite state.
    pub fn update_sprite_batch_by_texture(&mut self) -> usize {
        let entities = &self.entities;
        let sprites = self.sprites.iter().filter_map(|id| {
            let entity = entities.get(id.0 as usize)?;
            Some((&entity.transform, entity.sprite.as_ref()?))
        });
        self.batcher.build(sprites)
    }

    /// Open a frame and upload the camera projection for it.
    pub fn render_frame_start(&mut self) -> Result<(), RenderError> {
        self.backend.render_frame_start()?;
        let view_projection = self.camera.get_view_projection_matrix();
        self.backend.set_projection_matrix(&view_projection);
        Ok(())
    }

    /// Draw the batches of the last [`Renderer2D::update_sprite_batch_by_texture`].
    ///
    /// Returns the number of batches drawn.
    pub fn render_sprites(&mut self) -> usize {
        let mut drawn = 0;
        for batch in self.batcher.batches() {
            match self.backend.draw_instanced(
                batch.texture,
                &batch.models,
                &batch.uvs,
                &batch.tints,
                batch.len(),
            ) {
                Ok(()) => drawn += 1,
                Err(e) => log::warn!("Skipping sprite batch: {e}"),
            }
        }
        drawn
    }

    /// Upload dirty chunks and draw all tiles. Returns the number of chunks drawn.
    pub fn render_tiles(&mut self) -> usize {
        self.tiles.render_tiles(&mut self.backend)
    }

    pub fn render_frame_end(&mut self) -> Result<(), RenderError> {
        self.backend.render_frame_end()
    }

    pub fn set_tile(
        &mut self,
        x: i32,
        y: i32,
        texture: Texture,
        source_rect: Rect,
        visible: bool,
    ) -> Result<ChunkId, RenderError> {
        self.tiles
            .set_tile(x, y, texture, source_rect, visible)
            .inspect_err(|e| log::warn!("Rejected tile ({x}, {y}): {e}"))
    }

    pub fn set_tile_size(&mut self, tile_size: u32) {
        self.tiles.set_tile_size(tile_size);
    }

    /// Run one complete frame: animate, batch, then draw tiles below sprites.
    pub fn render_frame(&mut self, dt: Duration) -> Result<(), RenderError> {
        self.update_animation_frames(dt);
        self.update_sprite_batch_by_texture();
        self.render_frame_start()?;
        self.render_tiles();
        self.render_sprites();
        self.render_frame_end()
    }

    /// Stop tracking every entity.
    pub fn shutdown(&mut self) {
        self.animations.shutdown();
        self.batcher.clear();
        self.sprites.clear();
        self.entities.clear();
    }
}

/// Install the platform logger: `env_logger` natively, the browser console on wasm.
///
/// Calling it twice only prints a warning.
pub fn init_logging() {
    #[cfg(not(target_arch = "wasm32"))]
    {
        if let Err(e) = env_logger::try_init() {
            println!("Warning: Could not initialize logger: {}", e);
        };
    }

    #[cfg(target_arch = "wasm32")]
    {
        if let Err(e) = console_log::init_with_level(log::Level::Info) {
            log::warn!("Could not initialize logger: {}", e);
        }
    }
}
