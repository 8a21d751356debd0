/// Pixel-space rectangle, used for atlas sub-regions.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Rect {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl Rect {
    pub const fn new(x: f32, y: f32, width: f32, height: f32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Normalize against a texture of `tex_width` x `tex_height` pixels.
    ///
    /// Returns `[u, v, u_span, v_span]`, the layout the sprite and tile shaders expect.
    pub fn to_uv(&self, tex_width: f32, tex_height: f32) -> [f32; 4] {
        [
            self.x / tex_width,
            self.y / tex_height,
            self.width / tex_width,
            self.height / tex_height,
        ]
    }
}
