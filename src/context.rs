//! Graphics context: device, queue and the render target frames are drawn into.
//!
//! A context either presents to a window surface or renders into an offscreen
//! texture that can be read back (used by the headless GPU tests).

use std::sync::Arc;

use winit::window::Window;

use crate::{
    buffer::DEFAULT_INSTANCE_CAPACITY,
    data_structures::texture::GpuTexture,
    error::RenderError,
    tiles::{DEFAULT_CHUNK_SIZE, DEFAULT_TILE_SIZE},
};

/// Tunables of the renderer. Mutable at runtime through [`Context::config`].
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct RenderConfig {
    pub clear_colour: wgpu::Color,
    /// Edge length of a tile chunk in tiles.
    pub chunk_size: u32,
    /// Edge length of a tile in pixels.
    pub tile_size: u32,
    /// Instances the GPU instance buffers hold before the first growth.
    pub initial_instance_capacity: usize,
    pub viewport_width: u32,
    pub viewport_height: u32,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            // cornflower blue
            clear_colour: wgpu::Color {
                r: 100.0 / 255.0,
                g: 149.0 / 255.0,
                b: 237.0 / 255.0,
                a: 1.0,
            },
            chunk_size: DEFAULT_CHUNK_SIZE,
            tile_size: DEFAULT_TILE_SIZE,
            initial_instance_capacity: DEFAULT_INSTANCE_CAPACITY,
            viewport_width: 1280,
            viewport_height: 720,
        }
    }
}

#[derive(Debug)]
pub enum RenderTarget {
    Surface {
        window: Arc<Window>,
        surface: wgpu::Surface<'static>,
    },
    Offscreen {
        texture: wgpu::Texture,
    },
}

/// The texture a single frame is drawn into.
pub enum FrameTarget {
    Surface(wgpu::SurfaceTexture),
    Offscreen,
}

#[derive(Debug)]
pub struct Context {
    pub(crate) target: RenderTarget,
    pub(crate) depth_texture: GpuTexture,
    pub device: wgpu::Device,
    pub queue: wgpu::Queue,
    pub surface_config: wgpu::SurfaceConfiguration,
    pub config: RenderConfig,
}

impl Context {
    /// Create a context presenting to `window`.
    pub async fn new(window: Arc<Window>, config: RenderConfig) -> Result<Self, RenderError> {
        let size = window.inner_size();

        log::info!("WGPU setup");
        let instance = Self::mk_instance();
        let surface = instance
            .create_surface(window.clone())
            .map_err(|e| RenderError::UninitializedContext(format!("no surface: {e}")))?;

        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: wgpu::PowerPreference::default(),
                compatible_surface: Some(&surface),
                force_fallback_adapter: false,
            })
            .await
            .map_err(|e| RenderError::UninitializedContext(format!("no adapter: {e}")))?;
        let (device, queue) = Self::mk_device(&adapter).await?;

        let surface_caps = surface.get_capabilities(&adapter);
        // The shaders assume an sRGB target, anything else comes out too dark.
        let Some(&fallback) = surface_caps.formats.first() else {
            return Err(RenderError::UninitializedContext(
                "surface is incompatible with the adapter".into(),
            ));
        };
        let surface_format = surface_caps
            .formats
            .iter()
            .copied()
            .find(|f| f.is_srgb())
            .unwrap_or(fallback);
        let surface_config = wgpu::SurfaceConfiguration {
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            format: surface_format,
            width: size.width.max(1),
            height: size.height.max(1),
            present_mode: surface_caps
                .present_modes
                .first()
                .copied()
                .unwrap_or(wgpu::PresentMode::Fifo),
            alpha_mode: surface_caps
                .alpha_modes
                .first()
                .copied()
                .unwrap_or(wgpu::CompositeAlphaMode::Auto),
            view_formats: vec![],
            desired_maximum_frame_latency: 2,
        };
        surface.configure(&device, &surface_config);

        let depth_texture = GpuTexture::create_depth_texture(
            &device,
            [surface_config.width, surface_config.height],
            "depth_texture",
        );

        Ok(Self {
            target: RenderTarget::Surface { window, surface },
            depth_texture,
            device,
            queue,
            surface_config,
            config,
        })
    }

    /// Create a windowless context rendering into an offscreen RGBA8 texture.
    pub async fn new_headless(
        width: u32,
        height: u32,
        config: RenderConfig,
    ) -> Result<Self, RenderError> {
        log::info!("WGPU headless setup");
        let instance = Self::mk_instance();
        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: wgpu::PowerPreference::default(),
                compatible_surface: None,
                force_fallback_adapter: false,
            })
            .await
            .map_err(|e| RenderError::UninitializedContext(format!("no adapter: {e}")))?;
        let (device, queue) = Self::mk_device(&adapter).await?;

        let format = wgpu::TextureFormat::Rgba8UnormSrgb;
        let surface_config = wgpu::SurfaceConfiguration {
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT | wgpu::TextureUsages::COPY_SRC,
            format,
            width: width.max(1),
            height: height.max(1),
            present_mode: wgpu::PresentMode::Fifo,
            alpha_mode: wgpu::CompositeAlphaMode::Auto,
            view_formats: vec![],
            desired_maximum_frame_latency: 2,
        };
        let texture = Self::mk_offscreen_texture(&device, &surface_config);
        let depth_texture = GpuTexture::create_depth_texture(
            &device,
            [surface_config.width, surface_config.height],
            "depth_texture",
        );

        Ok(Self {
            target: RenderTarget::Offscreen { texture },
            depth_texture,
            device,
            queue,
            surface_config,
            config,
        })
    }

    fn mk_instance() -> wgpu::Instance {
        wgpu::Instance::new(&wgpu::InstanceDescriptor {
            #[cfg(not(target_arch = "wasm32"))]
            backends: wgpu::Backends::PRIMARY,
            #[cfg(target_arch = "wasm32")]
            backends: wgpu::Backends::GL,
            ..Default::default()
        })
    }

    async fn mk_device(
        adapter: &wgpu::Adapter,
    ) -> Result<(wgpu::Device, wgpu::Queue), RenderError> {
        let info = adapter.get_info();
        log::info!("Using adapter \"{}\" ({:?})", info.name, info.backend);
        let (device, queue) = adapter
            .request_device(&wgpu::DeviceDescriptor {
                label: Some("flow2d device"),
                required_features: wgpu::Features::empty(),
                // WebGL doesn't support all of wgpu's features
                required_limits: if cfg!(target_arch = "wasm32") {
                    wgpu::Limits::downlevel_webgl2_defaults()
                } else {
                    wgpu::Limits::default()
                },
                memory_hints: Default::default(),
                trace: wgpu::Trace::Off,
                ..Default::default()
            })
            .await
            .map_err(|e| RenderError::UninitializedContext(format!("no device: {e}")))?;
        Ok((device, queue))
    }

    fn mk_offscreen_texture(
        device: &wgpu::Device,
        surface_config: &wgpu::SurfaceConfiguration,
    ) -> wgpu::Texture {
        device.create_texture(&wgpu::TextureDescriptor {
            label: Some("offscreen render target"),
            size: wgpu::Extent3d {
                width: surface_config.width,
                height: surface_config.height,
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: surface_config.format,
            usage: wgpu::TextureUsages::COPY_SRC | wgpu::TextureUsages::RENDER_ATTACHMENT,
            view_formats: &[],
        })
    }

    pub fn size(&self) -> (u32, u32) {
        (self.surface_config.width, self.surface_config.height)
    }

    pub fn format(&self) -> wgpu::TextureFormat {
        self.surface_config.format
    }

    pub fn window(&self) -> Option<&Arc<Window>> {
        match &self.target {
            RenderTarget::Surface { window, .. } => Some(window),
            RenderTarget::Offscreen { .. } => None,
        }
    }

    pub fn is_headless(&self) -> bool {
        matches!(self.target, RenderTarget::Offscreen { .. })
    }

    /// Resize the render target and its depth buffer. Zero sizes are ignored.
    pub fn resize(&mut self, width: u32, height: u32) {
        if width == 0 || height == 0 {
            log::warn!("Ignoring resize to {width}x{height}");
            return;
        }
        self.surface_config.width = width;
        self.surface_config.height = height;
        match &mut self.target {
            RenderTarget::Surface { surface, .. } => {
                surface.configure(&self.device, &self.surface_config);
            }
            RenderTarget::Offscreen { texture } => {
                *texture = Self::mk_offscreen_texture(&self.device, &self.surface_config);
            }
        }
        self.depth_texture = GpuTexture::create_depth_texture(
            &self.device,
            [self.surface_config.width, self.surface_config.height],
            "depth_texture",
        );
    }

    /// Acquire the texture the next frame is drawn into, plus a view on it.
    pub(crate) fn acquire_frame(&self) -> Result<(FrameTarget, wgpu::TextureView), RenderError> {
        match &self.target {
            RenderTarget::Surface { surface, .. } => {
                let output = surface.get_current_texture()?;
                let view = output
                    .texture
                    .create_view(&wgpu::TextureViewDescriptor::default());
                Ok((FrameTarget::Surface(output), view))
            }
            RenderTarget::Offscreen { texture } => {
                let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
                Ok((FrameTarget::Offscreen, view))
            }
        }
    }

    pub(crate) fn offscreen_texture(&self) -> Option<&wgpu::Texture> {
        match &self.target {
            RenderTarget::Offscreen { texture } => Some(texture),
            RenderTarget::Surface { .. } => None,
        }
    }
}
