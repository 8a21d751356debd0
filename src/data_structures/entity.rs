//! Fixed-shape entity records.
//!
//! An entity is a transform plus optional sprite and animation slots. The scene
//! collaborator builds one, hands it to [`crate::renderer::Renderer2D::register_object`]
//! and gets an [`EntityId`] back to mutate it between frames.

use crate::{
    animation::AnimationState,
    data_structures::instance::{SpriteInstance, Transform},
};

/// Index of a registered entity. Ids are handed out in registration order.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct EntityId(pub u32);

#[derive(Clone, Debug, Default)]
pub struct Entity {
    pub name: String,
    pub transform: Transform,
    pub sprite: Option<SpriteInstance>,
    pub animation: Option<AnimationState>,
}

impl Entity {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    pub fn with_transform(mut self, transform: Transform) -> Self {
        self.transform = transform;
        self
    }

    pub fn with_sprite(mut self, sprite: SpriteInstance) -> Self {
        self.sprite = Some(sprite);
        self
    }

    pub fn with_animation(mut self, animation: AnimationState) -> Self {
        self.animation = Some(animation);
        self
    }

    /// Component names present on this entity, for tooling and log output.
    pub fn describe(&self) -> Vec<&'static str> {
        let mut components = vec!["transform"];
        if self.sprite.is_some() {
            components.push("sprite");
        }
        if self.animation.is_some() {
            components.push("animation");
        }
        components
    }
}
