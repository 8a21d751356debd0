//! Orthographic 2D camera.
//!
//! World space is measured in pixels with y growing downwards, so at zoom 1 and
//! position (0, 0) one world unit maps to one screen pixel and the world origin
//! sits in the top-left corner of the viewport.

use cgmath::{Matrix4, SquareMatrix, Vector2, Vector3, Vector4};

/// Maps OpenGL's clip-space depth range of [-1, 1] onto wgpu's [0, 1].
///
/// Applied by the GPU backend right before upload; [`Camera2D`] itself stays in
/// the OpenGL convention.
#[rustfmt::skip]
pub const OPENGL_TO_WGPU_MATRIX: Matrix4<f32> = Matrix4::new(
    1.0, 0.0, 0.0, 0.0,
    0.0, 1.0, 0.0, 0.0,
    0.0, 0.0, 0.5, 0.0,
    0.0, 0.0, 0.5, 1.0,
);

/// The view-projection matrix as uploaded to the GPU, already in wgpu's depth range.
#[repr(C)]
#[derive(Debug, Copy, Clone, bytemuck::Pod, bytemuck::Zeroable)]
pub struct CameraUniform {
    pub view_proj: [[f32; 4]; 4],
}

impl CameraUniform {
    pub fn new() -> Self {
        Self {
            view_proj: Matrix4::identity().into(),
        }
    }

    pub fn update_view_proj(&mut self, view_projection: &Matrix4<f32>) {
        self.view_proj = (OPENGL_TO_WGPU_MATRIX * view_projection).into();
    }
}

impl Default for CameraUniform {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Clone, Debug)]
pub struct Camera2D {
    pub name: String,
    pub position: Vector2<f32>,
    /// Must stay above zero.
    pub zoom: f32,
    width: u32,
    height: u32,
}

impl Camera2D {
    pub fn new(name: impl Into<String>, width: u32, height: u32) -> Self {
        Self {
            name: name.into(),
            position: Vector2::new(0.0, 0.0),
            zoom: 1.0,
            width,
            height,
        }
    }

    /// Replace the viewport dimensions; the next matrix query picks them up.
    ///
    /// A zero dimension (a minimized window) is ignored and the previous
    /// viewport is kept.
    pub fn update_viewport_size(&mut self, width: u32, height: u32) {
        if width == 0 || height == 0 {
            log::debug!("Camera `{}` keeps its viewport, got {width}x{height}", self.name);
            return;
        }
        self.width = width;
        self.height = height;
    }

    pub fn viewport_size(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    /// Combined view-projection matrix.
    ///
    /// Projects `[0, width/zoom] x [height/zoom, 0]` onto clip space with depth
    /// in [-1, 1]. The view translation uses the camera position truncated to
    /// whole pixels so scrolling never samples between texels.
    pub fn get_view_projection_matrix(&self) -> Matrix4<f32> {
        let scaled_width = self.width as f32 / self.zoom;
        let scaled_height = self.height as f32 / self.zoom;
        let projection = cgmath::ortho(0.0, scaled_width, scaled_height, 0.0, -1.0, 1.0);

        let snapped = Vector3::new(-self.position.x.trunc(), -self.position.y.trunc(), 0.0);
        let view = Matrix4::from_translation(snapped);
        projection * view
    }

    /// Convert a pixel coordinate on the viewport into world space.
    ///
    /// Returns `None` when the viewport is degenerate.
    pub fn screen_to_world(&self, screen: Vector2<f32>) -> Option<Vector2<f32>> {
        if self.width == 0 || self.height == 0 {
            return None;
        }
        let inverse = self.get_view_projection_matrix().invert()?;
        let clip = Vector4::new(
            screen.x / self.width as f32 * 2.0 - 1.0,
            1.0 - screen.y / self.height as f32 * 2.0,
            0.0,
            1.0,
        );
        let world = inverse * clip;
        Some(Vector2::new(world.x / world.w, world.y / world.w))
    }

    /// Convert a world position into a pixel coordinate on the viewport.
    pub fn world_to_screen(&self, world: Vector2<f32>) -> Vector2<f32> {
        let clip = self.get_view_projection_matrix() * Vector4::new(world.x, world.y, 0.0, 1.0);
        Vector2::new(
            (clip.x / clip.w + 1.0) * 0.5 * self.width as f32,
            (1.0 - clip.y / clip.w) * 0.5 * self.height as f32,
        )
    }
}

#[cfg(test)]
mod tests {
    use approx::assert_relative_eq;

    use super::*;

    fn clip(camera: &Camera2D, x: f32, y: f32) -> Vector4<f32> {
        camera.get_view_projection_matrix() * Vector4::new(x, y, 0.0, 1.0)
    }

    #[test]
    fn viewport_corners_map_to_clip_corners() {
        let camera = Camera2D::new("main", 800, 600);
        let top_left = clip(&camera, 0.0, 0.0);
        assert_relative_eq!(top_left.x, -1.0);
        assert_relative_eq!(top_left.y, 1.0);
        let bottom_right = clip(&camera, 800.0, 600.0);
        assert_relative_eq!(bottom_right.x, 1.0);
        assert_relative_eq!(bottom_right.y, -1.0);
    }

    #[test]
    fn zoom_shrinks_the_visible_area() {
        let mut camera = Camera2D::new("main", 800, 600);
        camera.zoom = 2.0;
        let p = clip(&camera, 400.0, 300.0);
        assert_relative_eq!(p.x, 1.0);
        assert_relative_eq!(p.y, -1.0);
    }

    #[test]
    fn position_is_truncated_to_whole_pixels() {
        let mut camera = Camera2D::new("main", 800, 600);
        camera.position = Vector2::new(10.9, -3.7);
        let snapped = {
            let mut c = camera.clone();
            c.position = Vector2::new(10.0, -3.0);
            c.get_view_projection_matrix()
        };
        assert_eq!(camera.get_view_projection_matrix(), snapped);
        let p = clip(&camera, 10.0, -3.0);
        assert_relative_eq!(p.x, -1.0);
        assert_relative_eq!(p.y, 1.0);
    }

    #[test]
    fn resize_takes_effect_on_next_query() {
        let mut camera = Camera2D::new("main", 800, 600);
        camera.update_viewport_size(400, 300);
        let p = clip(&camera, 400.0, 300.0);
        assert_relative_eq!(p.x, 1.0);
        assert_relative_eq!(p.y, -1.0);
        assert_eq!(camera.viewport_size(), (400, 300));
    }

    #[test]
    fn screen_and_world_round_trip() {
        let mut camera = Camera2D::new("main", 800, 600);
        camera.position = Vector2::new(120.0, 40.0);
        camera.zoom = 2.0;
        let world = camera.screen_to_world(Vector2::new(200.0, 100.0)).unwrap();
        assert_relative_eq!(world.x, 220.0, epsilon = 1e-3);
        assert_relative_eq!(world.y, 90.0, epsilon = 1e-3);
        let screen = camera.world_to_screen(world);
        assert_relative_eq!(screen.x, 200.0, epsilon = 1e-3);
        assert_relative_eq!(screen.y, 100.0, epsilon = 1e-3);
    }

    #[test]
    fn uniform_maps_depth_into_wgpu_range() {
        let camera = Camera2D::new("main", 800, 600);
        let mut uniform = CameraUniform::new();
        uniform.update_view_proj(&camera.get_view_projection_matrix());
        let m = Matrix4::from(uniform.view_proj);
        let p = m * Vector4::new(0.0, 0.0, 0.0, 1.0);
        assert_relative_eq!(p.z, 0.5);
        assert_relative_eq!(p.x, -1.0);
    }

    #[test]
    fn zero_sized_resize_keeps_the_previous_viewport() {
        let mut camera = Camera2D::new("main", 800, 600);
        let before = camera.get_view_projection_matrix();
        camera.update_viewport_size(0, 0);
        camera.update_viewport_size(0, 300);
        assert_eq!(camera.viewport_size(), (800, 600));
        let after = camera.get_view_projection_matrix();
        assert_eq!(before, after);
        let p = clip(&camera, 800.0, 600.0);
        assert!(p.x.is_finite() && p.y.is_finite());
    }

    #[test]
    fn degenerate_viewport_has_no_world_mapping() {
        let camera = Camera2D::new("main", 0, 600);
        assert!(camera.screen_to_world(Vector2::new(1.0, 1.0)).is_none());
    }
}
