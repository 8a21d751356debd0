use std::time::Duration;

use flow2d::{
    AnimationFrame, AnimationState, Entity, Rect, RenderConfig, RenderError, Renderer2D,
    SpriteInstance, Texture, TextureId, Transform, cgmath::Vector2, tiles::ChunkId,
};

use crate::common::test_utils::{Call, RecordingBackend, position_of, recording_renderer, texture};

mod common;

#[test]
fn hundred_sprites_over_three_textures_make_three_draws() {
    let mut renderer = recording_renderer();
    for i in 0..100 {
        let entity = Entity::new(format!("sprite {i}"))
            .with_transform(Transform::at(i as f32, (i % 7) as f32))
            .with_sprite(SpriteInstance::new(texture(i % 3)));
        renderer.register_object(entity).unwrap();
    }

    assert_eq!(renderer.update_sprite_batch_by_texture(), 100);
    renderer.render_frame_start().unwrap();
    assert_eq!(renderer.render_sprites(), 3);
    renderer.render_frame_end().unwrap();

    let draws = renderer.backend().instanced();
    assert_eq!(draws.len(), 3);
    let mut total = 0;
    for (_, models, uvs, tints) in &draws {
        assert_eq!(models.len(), uvs.len());
        assert_eq!(uvs.len(), tints.len());
        total += models.len();
    }
    assert_eq!(total, 100);
}

#[test]
fn projection_is_uploaded_before_the_first_draw() {
    let mut renderer = recording_renderer();
    renderer
        .register_object(Entity::new("hero").with_sprite(SpriteInstance::new(texture(1))))
        .unwrap();
    renderer
        .set_tile(0, 0, texture(2), Rect::new(0.0, 0.0, 32.0, 32.0), true)
        .unwrap();

    renderer.render_frame(Duration::from_millis(16)).unwrap();

    let calls = &renderer.backend().calls;
    assert_eq!(calls[0], Call::FrameStart);
    assert!(matches!(calls[1], Call::Projection(_)));
    assert_eq!(calls.last(), Some(&Call::FrameEnd));
    let first_draw = calls
        .iter()
        .position(|call| matches!(call, Call::Instanced { .. } | Call::StaticMesh { .. }))
        .unwrap();
    assert!(first_draw > 1);
}

#[test]
fn tiles_are_drawn_below_sprites() {
    let mut renderer = recording_renderer();
    renderer
        .register_object(Entity::new("hero").with_sprite(SpriteInstance::new(texture(1))))
        .unwrap();
    renderer
        .set_tile(3, 3, texture(2), Rect::new(0.0, 0.0, 32.0, 32.0), true)
        .unwrap();

    renderer.render_frame(Duration::ZERO).unwrap();

    let calls = &renderer.backend().calls;
    let tile = calls
        .iter()
        .position(|call| matches!(call, Call::StaticMesh { .. }))
        .unwrap();
    let sprite = calls
        .iter()
        .position(|call| matches!(call, Call::Instanced { .. }))
        .unwrap();
    assert!(tile < sprite);
}

#[test]
fn tied_sprites_keep_registration_order() {
    let mut renderer = recording_renderer();
    for i in 0..5 {
        let entity = Entity::new(format!("tie {i}"))
            .with_transform(Transform::at(i as f32 * 10.0, 100.0))
            .with_sprite(SpriteInstance::new(texture(1)));
        renderer.register_object(entity).unwrap();
    }
    let front = Entity::new("front")
        .with_transform(Transform::at(999.0, 0.0))
        .with_sprite(SpriteInstance::new(texture(1)).with_layer(-1));
    renderer.register_object(front).unwrap();

    renderer.render_frame(Duration::ZERO).unwrap();

    let draws = renderer.backend().instanced();
    let xs: Vec<f32> = draws[0].1.iter().map(|m| position_of(m).0).collect();
    assert_eq!(xs, vec![999.0, 0.0, 10.0, 20.0, 30.0, 40.0]);
}

#[test]
fn sprite_changes_between_frames_show_up_in_the_next_batch() {
    let mut renderer = recording_renderer();
    let id = renderer
        .register_object(Entity::new("hero").with_sprite(SpriteInstance::new(texture(1))))
        .unwrap();

    renderer.render_frame(Duration::ZERO).unwrap();
    renderer.backend_mut().clear();

    let hero = renderer.entity_mut(id).unwrap();
    hero.transform.position = Vector2::new(5.0, 6.0);
    if let Some(sprite) = hero.sprite.as_mut() {
        sprite.tint = [0.5, 0.5, 0.5, 1.0];
    }
    renderer.render_frame(Duration::ZERO).unwrap();

    let draws = renderer.backend().instanced();
    assert_eq!(position_of(&draws[0].1[0]), (5.0, 6.0));
    assert_eq!(draws[0].3[0].color, [0.5, 0.5, 0.5, 1.0]);
}

#[test]
fn animation_drives_the_uploaded_uvs() {
    let sheet = Texture::new(TextureId(1), 64, 16);
    let frames = (0..4)
        .map(|i| AnimationFrame::new(Rect::new(i as f32 * 16.0, 0.0, 16.0, 16.0), 0.1))
        .collect();
    let hero = Entity::new("hero")
        .with_sprite(SpriteInstance::new(sheet).with_source_rect(Rect::new(0.0, 0.0, 16.0, 16.0)))
        .with_animation(AnimationState::new().with_animation("walk", frames));

    let mut renderer = recording_renderer();
    let id = renderer.register_object(hero).unwrap();
    assert_eq!(renderer.animations().tracked(), &[id]);

    renderer.render_frame(Duration::from_millis(250)).unwrap();

    let entity = renderer.entity(id).unwrap();
    assert_eq!(entity.animation.as_ref().unwrap().current_frame(), 2);
    let draws = renderer.backend().instanced();
    assert_eq!(draws[0].2[0].rect, [0.5, 0.0, 0.25, 1.0]);
}

#[test]
fn animation_without_sprite_is_rejected() {
    let mut renderer = recording_renderer();
    let frames = vec![AnimationFrame::new(Rect::default(), 0.1)];
    let err = renderer
        .register_object(
            Entity::new("ghost")
                .with_animation(AnimationState::new().with_animation("idle", frames)),
        )
        .unwrap_err();
    assert!(matches!(err, RenderError::MissingComponent { component: "sprite", .. }));
    assert!(renderer.entities().is_empty());
}

#[test]
fn unresolved_sprite_does_not_hide_the_others() {
    let mut renderer = recording_renderer();
    renderer
        .register_object(
            Entity::new("broken")
                .with_sprite(SpriteInstance::new(Texture::new(TextureId(9), 0, 0))),
        )
        .unwrap();
    renderer
        .register_object(Entity::new("fine").with_sprite(SpriteInstance::new(texture(1))))
        .unwrap();

    renderer.render_frame(Duration::ZERO).unwrap();

    let draws = renderer.backend().instanced();
    assert_eq!(draws.len(), 1);
    assert_eq!(draws[0].0.id, TextureId(1));
}

#[test]
fn clean_chunks_are_not_uploaded_again() {
    let mut renderer = recording_renderer();
    renderer
        .set_tile(0, 0, texture(1), Rect::new(0.0, 0.0, 32.0, 32.0), true)
        .unwrap();

    renderer.render_frame(Duration::ZERO).unwrap();
    assert_eq!(renderer.backend().uploads(), 1);
    assert_eq!(renderer.backend().static_meshes().len(), 1);

    renderer.backend_mut().clear();
    renderer.render_frame(Duration::ZERO).unwrap();
    assert_eq!(renderer.backend().uploads(), 0);
    assert_eq!(renderer.backend().static_meshes().len(), 1);

    renderer.backend_mut().clear();
    renderer
        .set_tile(1, 0, texture(1), Rect::new(32.0, 0.0, 32.0, 32.0), true)
        .unwrap();
    renderer.render_frame(Duration::ZERO).unwrap();
    assert!(matches!(
        renderer.backend().calls[2],
        Call::Upload { vertices: 12, .. }
    ));
}

#[test]
fn failed_upload_keeps_the_chunk_dirty() {
    let mut renderer = recording_renderer();
    renderer
        .set_tile(0, 0, texture(1), Rect::new(0.0, 0.0, 32.0, 32.0), true)
        .unwrap();
    renderer.backend_mut().fail_uploads = true;

    renderer.render_frame(Duration::ZERO).unwrap();
    assert!(renderer.backend().static_meshes().is_empty());
    assert!(renderer.tiles().chunk(ChunkId { x: 0, y: 0 }).unwrap().is_dirty());

    renderer.backend_mut().fail_uploads = false;
    renderer.render_frame(Duration::ZERO).unwrap();
    assert_eq!(renderer.backend().uploads(), 1);
    assert!(!renderer.tiles().chunk(ChunkId { x: 0, y: 0 }).unwrap().is_dirty());
}

#[test]
fn chunks_are_drawn_grouped_by_texture() {
    let mut renderer = recording_renderer();
    let rect = Rect::new(0.0, 0.0, 32.0, 32.0);
    renderer.set_tile(0, 0, texture(2), rect, true).unwrap();
    renderer.set_tile(40, 0, texture(1), rect, true).unwrap();
    renderer.set_tile(80, 0, texture(2), rect, true).unwrap();
    renderer.set_tile(-40, 0, texture(1), rect, true).unwrap();

    renderer.render_frame(Duration::ZERO).unwrap();

    let order: Vec<(u32, f32)> = renderer
        .backend()
        .static_meshes()
        .into_iter()
        .filter_map(|call| match call {
            Call::StaticMesh { texture, model, .. } => Some((texture.id.0, model.w.x)),
            _ => None,
        })
        .collect();
    assert_eq!(
        order,
        vec![(1, -2048.0), (1, 1024.0), (2, 0.0), (2, 2048.0)]
    );
}

#[test]
fn hidden_only_chunks_are_skipped() {
    let mut renderer = recording_renderer();
    renderer
        .set_tile(0, 0, texture(1), Rect::new(0.0, 0.0, 32.0, 32.0), false)
        .unwrap();
    renderer.render_frame(Duration::ZERO).unwrap();
    assert_eq!(renderer.backend().uploads(), 0);
    assert!(renderer.backend().static_meshes().is_empty());
}

#[test]
fn resize_reaches_camera_and_backend() {
    let mut renderer = recording_renderer();
    renderer.update_viewport_size(640, 480);
    assert_eq!(renderer.camera().viewport_size(), (640, 480));
    assert_eq!(renderer.backend().calls, vec![Call::Viewport(640, 480)]);
}

#[test]
fn mismatched_tile_texture_is_reported() {
    let mut renderer = recording_renderer();
    let rect = Rect::new(0.0, 0.0, 32.0, 32.0);
    renderer.set_tile(0, 0, texture(1), rect, true).unwrap();
    let err = renderer.set_tile(1, 1, texture(2), rect, true).unwrap_err();
    assert!(matches!(err, RenderError::AmbiguousChunkTexture { .. }));
}

#[test]
fn rejected_batch_does_not_stop_the_others() {
    let mut renderer = recording_renderer();
    for i in 0..9 {
        let entity = Entity::new(format!("sprite {i}"))
            .with_transform(Transform::at(i as f32, 0.0))
            .with_sprite(SpriteInstance::new(texture(i % 3)));
        renderer.register_object(entity).unwrap();
    }
    renderer.backend_mut().reject = Some(TextureId(1));

    renderer.update_sprite_batch_by_texture();
    renderer.render_frame_start().unwrap();
    assert_eq!(renderer.render_sprites(), 2);
    renderer.render_frame_end().unwrap();

    let drawn: Vec<TextureId> = renderer
        .backend()
        .instanced()
        .iter()
        .map(|(texture, ..)| texture.id)
        .collect();
    assert_eq!(drawn, vec![TextureId(0), TextureId(2)]);

    renderer.backend_mut().clear();
    assert!(renderer.render_frame(Duration::ZERO).is_ok());
    assert_eq!(renderer.backend().instanced().len(), 2);
    assert_eq!(renderer.backend().calls.last(), Some(&Call::FrameEnd));
}

#[test]
fn camera_starts_at_the_backend_target_size() {
    let backend = RecordingBackend::with_target(800, 600);
    let renderer = Renderer2D::new(backend, RenderConfig::default());
    assert_eq!(renderer.camera().viewport_size(), (800, 600));

    let renderer = recording_renderer();
    let config = RenderConfig::default();
    assert_eq!(
        renderer.camera().viewport_size(),
        (config.viewport_width, config.viewport_height)
    );
}

#[test]
fn minimized_window_keeps_a_finite_projection() {
    let mut renderer = recording_renderer();
    renderer.update_viewport_size(0, 0);
    assert_eq!(renderer.camera().viewport_size(), (1280, 720));

    renderer.render_frame(Duration::ZERO).unwrap();
    let projection = renderer
        .backend()
        .calls
        .iter()
        .find_map(|call| match call {
            Call::Projection(m) => Some(*m),
            _ => None,
        })
        .unwrap();
    let columns: [[f32; 4]; 4] = projection.into();
    assert!(columns.iter().flatten().all(|v| v.is_finite()));
}
