//! Sorting sprites and grouping them into per-texture instance batches.
//!
//! Every frame the visible sprites are sorted by `(layer, y)` and bucketed by
//! texture. Each bucket turns into one instanced draw, so the number of draw
//! calls depends on the number of distinct textures rather than on the number
//! of sprites.

use std::{cmp::Ordering, collections::HashMap};

use crate::data_structures::{
    instance::{ModelRaw, SpriteInstance, TintRaw, Transform, UvRaw},
    texture::{Texture, TextureId},
};

/// Instance data for one texture, three parallel arrays of equal length.
#[derive(Debug, Clone)]
pub struct RenderBatch {
    pub texture: Texture,
    pub models: Vec<ModelRaw>,
    pub uvs: Vec<UvRaw>,
    pub tints: Vec<TintRaw>,
}

impl RenderBatch {
    fn new(texture: Texture) -> Self {
        Self {
            texture,
            models: Vec::new(),
            uvs: Vec::new(),
            tints: Vec::new(),
        }
    }

    fn clear(&mut self, texture: Texture) {
        self.texture = texture;
        self.models.clear();
        self.uvs.clear();
        self.tints.clear();
    }

    fn push(&mut self, transform: &Transform, sprite: &SpriteInstance) {
        self.models.push(sprite.model_matrix(transform).into());
        self.uvs.push(UvRaw {
            rect: sprite.uv_rect(),
        });
        self.tints.push(TintRaw { color: sprite.tint });
    }

    pub fn len(&self) -> usize {
        self.models.len()
    }

    pub fn is_empty(&self) -> bool {
        self.models.is_empty()
    }

    /// All three arrays describe the same instances.
    pub fn is_consistent(&self) -> bool {
        self.models.len() == self.uvs.len() && self.uvs.len() == self.tints.len()
    }
}

/// Sort order of sprites: by layer, then by the y coordinate of the transform.
pub fn draw_order(
    (a_transform, a_sprite): (&Transform, &SpriteInstance),
    (b_transform, b_sprite): (&Transform, &SpriteInstance),
) -> Ordering {
    // `+ 0.0` folds -0.0 into 0.0 so equal heights tie
    let a_y = a_transform.position.y + 0.0;
    let b_y = b_transform.position.y + 0.0;
    a_sprite
        .layer
        .cmp(&b_sprite.layer)
        .then_with(|| a_y.total_cmp(&b_y))
}

/// Rebuilds the per-texture batches every frame.
///
/// Batch storage is kept between frames and only cleared, so a steady scene
/// does not allocate.
#[derive(Debug, Default)]
pub struct SpriteBatcher {
    batches: Vec<RenderBatch>,
    active: usize,
    slots: HashMap<TextureId, usize>,
}

impl SpriteBatcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sort `sprites` and regroup them by texture.
    ///
    /// `sprites` must be given in registration order; the sort is stable, so
    /// sprites with equal keys keep that order inside their batch. Batches are
    /// laid out in the order their texture first shows up in the sorted list.
    /// Sprites whose texture has no size are skipped. Returns the number of
    /// sprites batched.
    pub fn build<'a, I>(&mut self, sprites: I) -> usize
    where
        I: IntoIterator<Item = (&'a Transform, &'a SpriteInstance)>,
    {
        let mut sorted: Vec<(&Transform, &SpriteInstance)> = sprites.into_iter().collect();
        sorted.sort_by(|a, b| draw_order(*a, *b));

        self.active = 0;
        self.slots.clear();

        let mut batched = 0;
        for (transform, sprite) in sorted {
            let texture = sprite.texture();
            if !texture.is_resolved() {
                log::warn!("Skipping sprite with unresolved texture {:?}", texture.id);
                continue;
            }

            let slot = match self.slots.get(&texture.id) {
                Some(&slot) => slot,
                None => {
                    let slot = self.active;
                    match self.batches.get_mut(slot) {
                        Some(batch) => batch.clear(texture),
                        None => self.batches.push(RenderBatch::new(texture)),
                    }
                    self.slots.insert(texture.id, slot);
                    self.active += 1;
                    slot
                }
            };
            self.batches[slot].push(transform, sprite);
            batched += 1;
        }
        log::trace!("Batched {batched} sprites into {} batches", self.active);
        batched
    }

    /// Batches built by the last [`SpriteBatcher::build`].
    pub fn batches(&self) -> &[RenderBatch] {
        &self.batches[..self.active]
    }

    pub fn batch(&self, texture: TextureId) -> Option<&RenderBatch> {
        self.slots.get(&texture).map(|&slot| &self.batches[slot])
    }

    pub fn len(&self) -> usize {
        self.active
    }

    pub fn is_empty(&self) -> bool {
        self.active == 0
    }

    /// Drop the batches of the last build. Storage is kept.
    pub fn clear(&mut self) {
        self.active = 0;
        self.slots.clear();
    }
}
