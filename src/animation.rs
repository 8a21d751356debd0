//! Sprite-sheet animation.
//!
//! [`AnimationState`] is the per-entity playback state: a set of named frame
//! sequences, the selected sequence, the frame index and a time accumulator.
//! [`AnimationSystem`] advances every tracked entity once per frame and writes the
//! current frame's source rectangle into the entity's sprite.

use std::collections::HashMap;

use instant::Duration;

use crate::data_structures::{
    entity::{Entity, EntityId},
    instance::SpriteInstance,
    rect::Rect,
};

/// One cell of a sprite sheet and how long it stays on screen (seconds).
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct AnimationFrame {
    pub source_rect: Rect,
    pub duration: f32,
}

impl AnimationFrame {
    pub const fn new(source_rect: Rect, duration: f32) -> Self {
        Self {
            source_rect,
            duration,
        }
    }
}

#[derive(Clone, Debug, Default)]
pub struct AnimationState {
    animations: HashMap<String, Vec<AnimationFrame>>,
    current: Option<String>,
    frame_index: usize,
    accumulator: f32,
    playing: bool,
}

impl AnimationState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `frames` under `name`, replacing any sequence of that name.
    ///
    /// The very first sequence ever added becomes current and starts playing.
    /// Empty names and empty frame lists are ignored.
    pub fn add_animation(&mut self, name: impl Into<String>, frames: Vec<AnimationFrame>) {
        let name = name.into();
        if name.trim().is_empty() || frames.is_empty() {
            log::warn!("Ignoring animation `{name}` with {} frames", frames.len());
            return;
        }
        if self.current.as_deref() == Some(name.as_str()) {
            // the running sequence was swapped out under us
            self.frame_index = self.frame_index.min(frames.len() - 1);
        }
        self.animations.insert(name.clone(), frames);
        if self.current.is_none() {
            self.current = Some(name);
            self.playing = true;
        }
    }

    pub fn with_animation(mut self, name: impl Into<String>, frames: Vec<AnimationFrame>) -> Self {
        self.add_animation(name, frames);
        self
    }

    /// Switch to `name` and play it from its first frame.
    ///
    /// Returns `false` and changes nothing if no such sequence exists.
    pub fn play(&mut self, name: &str) -> bool {
        if !self.animations.contains_key(name) {
            log::warn!("Animation `{name}` does not exist");
            return false;
        }
        self.current = Some(name.to_string());
        self.frame_index = 0;
        self.accumulator = 0.0;
        self.playing = true;
        true
    }

    pub fn pause(&mut self) {
        self.playing = false;
    }

    pub fn resume(&mut self) {
        self.playing = self.current.is_some();
    }

    /// Pause and rewind to the first frame.
    pub fn stop(&mut self) {
        self.playing = false;
        self.frame_index = 0;
        self.accumulator = 0.0;
    }

    pub fn is_playing(&self) -> bool {
        self.playing
    }

    pub fn current_animation(&self) -> Option<&str> {
        self.current.as_deref()
    }

    pub fn current_frame(&self) -> usize {
        self.frame_index
    }

    pub fn accumulator(&self) -> f32 {
        self.accumulator
    }

    pub fn frames(&self, name: &str) -> Option<&[AnimationFrame]> {
        self.animations.get(name).map(Vec::as_slice)
    }

    pub fn current_source_rect(&self) -> Option<Rect> {
        let frames = self.animations.get(self.current.as_deref()?)?;
        frames.get(self.frame_index).map(|frame| frame.source_rect)
    }

    /// Advance playback by `delta` seconds and sync `sprite` on any frame change.
    ///
    /// Drains the accumulator completely, so a step spanning several frames (or
    /// several whole cycles) lands on the same frame as many small steps would.
    /// Returns whether the frame index moved.
    pub fn advance(&mut self, delta: f32, sprite: &mut SpriteInstance) -> bool {
        if !self.playing {
            return false;
        }
        let Some(frames) = self.current.as_ref().and_then(|name| self.animations.get(name)) else {
            return false;
        };
        if frames.len() < 2 {
            return false;
        }
        let cycle: f32 = frames.iter().map(|frame| frame.duration).sum();
        if !(cycle > 0.0) {
            return false;
        }

        self.accumulator += delta;
        if self.accumulator >= cycle {
            // whole cycles end on the frame they started from
            self.accumulator %= cycle;
        }

        let mut advanced = false;
        while self.accumulator >= frames[self.frame_index].duration {
            self.accumulator -= frames[self.frame_index].duration;
            self.frame_index = (self.frame_index + 1) % frames.len();
            advanced = true;
        }
        if advanced {
            sprite.source_rect = frames[self.frame_index].source_rect;
        }
        advanced
    }
}

/// Drives every animated entity once per frame.
#[derive(Debug, Default)]
pub struct AnimationSystem {
    tracked: Vec<EntityId>,
}

impl AnimationSystem {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn track(&mut self, id: EntityId) {
        self.tracked.push(id);
    }

    pub fn tracked(&self) -> &[EntityId] {
        &self.tracked
    }

    /// Advance all tracked entities by `dt`.
    ///
    /// `entities` is indexed by [`EntityId`]. Returns how many sprites changed frame.
    pub fn update(&mut self, entities: &mut [Entity], dt: Duration) -> usize {
        let delta = dt.as_secs_f32();
        let mut changed = 0;
        for id in &self.tracked {
            let Some(entity) = entities.get_mut(id.0 as usize) else {
                log::warn!("Animated entity {id:?} is gone");
                continue;
            };
            if let (Some(animation), Some(sprite)) = (&mut entity.animation, &mut entity.sprite) {
                if animation.advance(delta, sprite) {
                    changed += 1;
                }
            }
        }
        changed
    }

    pub fn shutdown(&mut self) {
        self.tracked.clear();
    }
}

#[cfg(test)]
mod tests {
    use approx::assert_relative_eq;

    use super::*;
    use crate::data_structures::texture::{Texture, TextureId};

    fn frames() -> Vec<AnimationFrame> {
        vec![
            AnimationFrame::new(Rect::new(0.0, 0.0, 16.0, 16.0), 0.1),
            AnimationFrame::new(Rect::new(16.0, 0.0, 16.0, 16.0), 0.2),
            AnimationFrame::new(Rect::new(32.0, 0.0, 16.0, 16.0), 0.3),
        ]
    }

    fn sprite() -> SpriteInstance {
        SpriteInstance::new(Texture::new(TextureId(1), 48, 16))
    }

    #[test]
    fn first_animation_autoplays() {
        let mut state = AnimationState::new();
        state.add_animation("walk", frames());
        state.add_animation("idle", frames());
        assert_eq!(state.current_animation(), Some("walk"));
        assert!(state.is_playing());
    }

    #[test]
    fn empty_animations_are_ignored() {
        let mut state = AnimationState::new();
        state.add_animation("", frames());
        state.add_animation("walk", vec![]);
        assert_eq!(state.current_animation(), None);
        assert!(!state.is_playing());
    }

    #[test]
    fn adding_under_existing_name_overwrites() {
        let mut state = AnimationState::new().with_animation("walk", frames());
        state.add_animation("walk", frames()[..1].to_vec());
        assert_eq!(state.frames("walk").unwrap().len(), 1);
    }

    #[test]
    fn partial_step_leaves_residual() {
        let mut state = AnimationState::new().with_animation("walk", frames());
        let mut sprite = sprite();
        assert!(state.advance(0.15, &mut sprite));
        assert_eq!(state.current_frame(), 1);
        assert_relative_eq!(state.accumulator(), 0.05, epsilon = 1e-5);
        assert_eq!(sprite.source_rect, Rect::new(16.0, 0.0, 16.0, 16.0));
    }

    #[test]
    fn large_step_is_drained_modulo_cycle() {
        let mut state = AnimationState::new().with_animation("walk", frames());
        let mut sprite = sprite();
        state.advance(1.0, &mut sprite);
        // 1.0 mod 0.6 = 0.4, past frame 0 (0.1) and frame 1 (0.2)
        assert_eq!(state.current_frame(), 2);
        assert_relative_eq!(state.accumulator(), 0.1, epsilon = 1e-5);
        assert_eq!(sprite.source_rect, Rect::new(32.0, 0.0, 16.0, 16.0));
    }

    #[test]
    fn many_small_steps_match_one_large_step() {
        let mut stepped = AnimationState::new().with_animation("walk", frames());
        let mut sprite = sprite();
        for _ in 0..40 {
            stepped.advance(0.025, &mut sprite);
        }
        let mut jumped = AnimationState::new().with_animation("walk", frames());
        jumped.advance(1.0, &mut sprite.clone());
        assert_eq!(stepped.current_frame(), jumped.current_frame());
    }

    #[test]
    fn paused_and_single_frame_animations_do_not_move() {
        let mut state = AnimationState::new().with_animation("walk", frames());
        let mut sprite = sprite();
        state.pause();
        assert!(!state.advance(1.0, &mut sprite));
        assert_eq!(state.current_frame(), 0);

        let mut still = AnimationState::new().with_animation("still", frames()[..1].to_vec());
        assert!(!still.advance(1.0, &mut sprite));
        assert_relative_eq!(still.accumulator(), 0.0);
    }

    #[test]
    fn zero_length_cycle_never_advances() {
        let zero = vec![
            AnimationFrame::new(Rect::default(), 0.0),
            AnimationFrame::new(Rect::default(), 0.0),
        ];
        let mut state = AnimationState::new().with_animation("blink", zero);
        assert!(!state.advance(1.0, &mut sprite()));
    }

    #[test]
    fn play_switches_and_rewinds() {
        let mut state = AnimationState::new()
            .with_animation("walk", frames())
            .with_animation("run", frames());
        let mut sprite = sprite();
        state.advance(0.15, &mut sprite);
        assert!(state.play("run"));
        assert_eq!(state.current_animation(), Some("run"));
        assert_eq!(state.current_frame(), 0);
        assert!(!state.play("swim"));
        assert_eq!(state.current_animation(), Some("run"));
    }

    #[test]
    fn system_updates_tracked_entities_only() {
        let animated = Entity::new("hero")
            .with_sprite(sprite())
            .with_animation(AnimationState::new().with_animation("walk", frames()));
        let mut entities = vec![animated.clone(), animated];
        let mut system = AnimationSystem::new();
        system.track(EntityId(1));

        let changed = system.update(&mut entities, Duration::from_millis(150));
        assert_eq!(changed, 1);
        assert_eq!(entities[0].animation.as_ref().unwrap().current_frame(), 0);
        assert_eq!(entities[1].animation.as_ref().unwrap().current_frame(), 1);

        system.shutdown();
        assert!(system.tracked().is_empty());
    }
}
