//! Texture handles and GPU textures.
//!
//! The rendering core never looks at pixels. It batches by [`TextureId`] and
//! computes UVs from the [`Texture`] dimensions; the actual wgpu resources live
//! in [`GpuTexture`], which the asset side creates from decoded RGBA data and
//! hands to [`crate::gpu::GpuBufferManager::register_texture`].

use anyhow::*;

/// Opaque, session-stable texture identity. This is the batching key.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TextureId(pub u32);

/// A resolved texture handle: identity plus pixel dimensions.
///
/// Equality and hashing only ever look at the handle value, never at GPU memory.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Texture {
    pub id: TextureId,
    pub width: u32,
    pub height: u32,
}

impl Texture {
    pub const fn new(id: TextureId, width: u32, height: u32) -> Self {
        Self { id, width, height }
    }

    /// A handle without pixel dimensions cannot produce UVs.
    pub fn is_resolved(&self) -> bool {
        self.width > 0 && self.height > 0
    }
}

/// A GPU texture with a view and optional sampler.
#[derive(Clone, Debug)]
pub struct GpuTexture {
    #[allow(unused)]
    pub texture: wgpu::Texture,
    pub view: wgpu::TextureView,
    pub sampler: Option<wgpu::Sampler>,
    pub width: u32,
    pub height: u32,
}

impl GpuTexture {
    /// Standard depth buffer texture format (32-bit float).
    pub const DEPTH_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Depth32Float;

    /// Create a depth texture matching the render target.
    ///
    /// # Arguments
    ///
    /// * `size` is [width, height] of the texture in pixels
    /// * `label` is used as a debug label for the GPU resource
    pub fn create_depth_texture(device: &wgpu::Device, size: [u32; 2], label: &str) -> Self {
        let extent = wgpu::Extent3d {
            width: size[0].max(1),
            height: size[1].max(1),
            depth_or_array_layers: 1,
        };
        let desc = wgpu::TextureDescriptor {
            label: Some(label),
            size: extent,
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: Self::DEPTH_FORMAT,
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT | wgpu::TextureUsages::TEXTURE_BINDING,
            view_formats: &[Self::DEPTH_FORMAT],
        };
        let texture = device.create_texture(&desc);
        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());

        Self {
            texture,
            view,
            sampler: None,
            width: extent.width,
            height: extent.height,
        }
    }

    /// Upload already decoded, tightly packed RGBA8 pixels.
    ///
    /// # Arguments
    ///
    /// * `rgba` holds `width * height * 4` bytes, row-major, top row first
    /// * `label` is used as a debug name for the GPU resource
    pub fn from_rgba8(
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        width: u32,
        height: u32,
        rgba: &[u8],
        label: &str,
    ) -> Result<Self> {
        ensure!(width > 0 && height > 0, "texture `{label}` has no pixels");
        ensure!(
            rgba.len() == width as usize * height as usize * 4,
            "texture `{label}` expects {} bytes of RGBA8, got {}",
            width as usize * height as usize * 4,
            rgba.len()
        );

        let size = wgpu::Extent3d {
            width,
            height,
            depth_or_array_layers: 1,
        };
        let texture = device.create_texture(&wgpu::TextureDescriptor {
            label: Some(label),
            size,
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: wgpu::TextureFormat::Rgba8UnormSrgb,
            usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
            view_formats: &[],
        });

        queue.write_texture(
            wgpu::TexelCopyTextureInfo {
                aspect: wgpu::TextureAspect::All,
                texture: &texture,
                mip_level: 0,
                origin: wgpu::Origin3d::ZERO,
            },
            rgba,
            wgpu::TexelCopyBufferLayout {
                offset: 0,
                bytes_per_row: Some(4 * width),
                rows_per_image: Some(height),
            },
            size,
        );

        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
        let sampler = Some(create_pixel_sampler(device));

        Ok(Self {
            texture,
            view,
            sampler,
            width,
            height,
        })
    }

    /// A single opaque white texel, handy for untextured quads and tests.
    pub fn white(device: &wgpu::Device, queue: &wgpu::Queue) -> Result<Self> {
        Self::from_rgba8(device, queue, 1, 1, &[255, 255, 255, 255], "white texel")
    }
}

/// Atlas-friendly sampler: clamp at the edges and keep texels crisp so
/// neighbouring atlas cells never bleed into each other.
pub fn create_pixel_sampler(device: &wgpu::Device) -> wgpu::Sampler {
    device.create_sampler(&wgpu::SamplerDescriptor {
        address_mode_u: wgpu::AddressMode::ClampToEdge,
        address_mode_v: wgpu::AddressMode::ClampToEdge,
        address_mode_w: wgpu::AddressMode::ClampToEdge,
        mag_filter: wgpu::FilterMode::Nearest,
        min_filter: wgpu::FilterMode::Nearest,
        mipmap_filter: wgpu::FilterMode::Nearest,
        ..Default::default()
    })
}
