//! The wgpu implementation of [`RenderBackend`].
//!
//! Draws issued between frame start and frame end are recorded, not executed.
//! Instance data of every instanced draw is appended to three staging arrays.
//! At frame end the shared instance buffers are grown to fit the whole frame,
//! uploaded once, and a single render pass replays the recorded draws, each
//! one reading its own instance range.

use std::{collections::HashMap, iter};

use cgmath::Matrix4;
use wgpu::util::DeviceExt;

use crate::{
    buffer::{GrowableBuffer, StaticBuffer},
    camera::CameraUniform,
    context::{Context, FrameTarget},
    data_structures::{
        instance::{ModelRaw, TintRaw, UNIT_QUAD, UvRaw},
        texture::{GpuTexture, Texture, TextureId, create_pixel_sampler},
    },
    error::RenderError,
    pipelines::{
        basic::{
            mk_texture_bind_group, mk_texture_bind_group_layout, mk_uniform_bind_group_layout,
        },
        sprite::mk_sprite_pipeline,
        tile::{ChunkUniform, mk_tile_pipeline},
    },
    render::{ChunkBufferHandle, DrawCommand, RenderBackend, validate_instances},
    tiles::TileVertex,
};

/// A uniform buffer together with the bind group exposing it.
#[derive(Debug)]
pub struct UniformBinding {
    pub buffer: wgpu::Buffer,
    pub bind_group: wgpu::BindGroup,
}

impl UniformBinding {
    pub fn new(
        device: &wgpu::Device,
        layout: &wgpu::BindGroupLayout,
        label: &str,
        contents: &[u8],
    ) -> Self {
        let buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some(label),
            contents,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
        });
        let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: buffer.as_entire_binding(),
            }],
            label: Some(label),
        });
        Self { buffer, bind_group }
    }
}

#[derive(Debug)]
struct TextureEntry {
    texture: Texture,
    bind_group: wgpu::BindGroup,
}

#[derive(Debug)]
struct ChunkEntry {
    vertices: StaticBuffer,
    model: UniformBinding,
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum Bound {
    Sprite,
    Tile,
}

#[derive(Debug)]
pub struct GpuBufferManager {
    ctx: Context,
    sprite_pipeline: wgpu::RenderPipeline,
    tile_pipeline: wgpu::RenderPipeline,
    texture_layout: wgpu::BindGroupLayout,
    chunk_layout: wgpu::BindGroupLayout,
    sprite_camera: UniformBinding,
    tile_camera: UniformBinding,
    quad: wgpu::Buffer,
    models: GrowableBuffer<ModelRaw>,
    uvs: GrowableBuffer<UvRaw>,
    tints: GrowableBuffer<TintRaw>,
    textures: HashMap<TextureId, TextureEntry>,
    next_texture: u32,
    chunks: Vec<ChunkEntry>,
    staged_models: Vec<ModelRaw>,
    staged_uvs: Vec<UvRaw>,
    staged_tints: Vec<TintRaw>,
    commands: Vec<DrawCommand>,
    frame_open: bool,
}

impl GpuBufferManager {
    /// Build pipelines and buffers on top of an initialized context.
    pub fn new(ctx: Context) -> Self {
        let device = &ctx.device;
        let texture_layout = mk_texture_bind_group_layout(device);
        let camera_layout = mk_uniform_bind_group_layout(device, "camera_bind_group_layout");
        let chunk_layout = mk_uniform_bind_group_layout(device, "chunk_bind_group_layout");

        let sprite_pipeline =
            mk_sprite_pipeline(device, ctx.format(), &texture_layout, &camera_layout);
        let tile_pipeline =
            mk_tile_pipeline(device, ctx.format(), &texture_layout, &camera_layout, &chunk_layout);

        let camera = CameraUniform::new();
        let sprite_camera = UniformBinding::new(
            device,
            &camera_layout,
            "sprite camera",
            bytemuck::cast_slice(&[camera]),
        );
        let tile_camera = UniformBinding::new(
            device,
            &camera_layout,
            "tile camera",
            bytemuck::cast_slice(&[camera]),
        );

        let quad = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("unit quad"),
            contents: bytemuck::cast_slice(&UNIT_QUAD),
            usage: wgpu::BufferUsages::VERTEX,
        });

        let capacity = ctx.config.initial_instance_capacity;
        let models = GrowableBuffer::new(device, "model instances", capacity);
        let uvs = GrowableBuffer::new(device, "uv instances", capacity);
        let tints = GrowableBuffer::new(device, "tint instances", capacity);
        log::info!("GPU buffers ready, {capacity} instances preallocated");

        Self {
            ctx,
            sprite_pipeline,
            tile_pipeline,
            texture_layout,
            chunk_layout,
            sprite_camera,
            tile_camera,
            quad,
            models,
            uvs,
            tints,
            textures: HashMap::new(),
            next_texture: 0,
            chunks: Vec::new(),
            staged_models: Vec::new(),
            staged_uvs: Vec::new(),
            staged_tints: Vec::new(),
            commands: Vec::new(),
            frame_open: false,
        }
    }

    pub fn context(&self) -> &Context {
        &self.ctx
    }

    pub fn context_mut(&mut self) -> &mut Context {
        &mut self.ctx
    }

    /// Make a GPU texture drawable and hand out the handle sprites and tiles refer to.
    pub fn register_texture(&mut self, texture: GpuTexture) -> Texture {
        let id = TextureId(self.next_texture);
        self.next_texture += 1;

        let fallback;
        let sampler = match &texture.sampler {
            Some(sampler) => sampler,
            None => {
                fallback = create_pixel_sampler(&self.ctx.device);
                &fallback
            }
        };
        let bind_group =
            mk_texture_bind_group(&self.ctx.device, &self.texture_layout, &texture, sampler);
        let handle = Texture::new(id, texture.width, texture.height);
        log::debug!("Registered texture {id:?} ({}x{})", texture.width, texture.height);
        self.textures.insert(
            id,
            TextureEntry {
                texture: handle,
                bind_group,
            },
        );
        handle
    }

    pub fn texture(&self, id: TextureId) -> Option<Texture> {
        self.textures.get(&id).map(|entry| entry.texture)
    }

    /// Instances the shared instance buffers currently have room for.
    pub fn instance_capacity(&self) -> usize {
        self.models.capacity()
    }

    fn resolve(&self, texture: Texture) -> Result<(), RenderError> {
        if !texture.is_resolved() {
            return Err(RenderError::MissingResource {
                texture: texture.id,
                reason: "zero-sized texture",
            });
        }
        if !self.textures.contains_key(&texture.id) {
            return Err(RenderError::MissingResource {
                texture: texture.id,
                reason: "not registered with the GPU backend",
            });
        }
        Ok(())
    }

    fn upload_instances(&mut self) {
        let device = &self.ctx.device;
        let queue = &self.ctx.queue;
        self.models.upload(device, queue, &self.staged_models);
        self.uvs.upload(device, queue, &self.staged_uvs);
        self.tints.upload(device, queue, &self.staged_tints);
    }

    fn encode_pass(&self, encoder: &mut wgpu::CommandEncoder, view: &wgpu::TextureView) {
        let mut render_pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some("Render Pass"),
            color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                view,
                resolve_target: None,
                ops: wgpu::Operations {
                    load: wgpu::LoadOp::Clear(self.ctx.config.clear_colour),
                    store: wgpu::StoreOp::Store,
                },
                depth_slice: None,
            })],
            depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                view: &self.ctx.depth_texture.view,
                depth_ops: Some(wgpu::Operations {
                    load: wgpu::LoadOp::Clear(1.0),
                    store: wgpu::StoreOp::Store,
                }),
                stencil_ops: None,
            }),
            occlusion_query_set: None,
            timestamp_writes: None,
        });

        let mut bound = None;
        for command in &self.commands {
            match command {
                DrawCommand::Instanced { texture, instances } => {
                    let Some(entry) = self.textures.get(&texture.id) else {
                        continue;
                    };
                    if bound != Some(Bound::Sprite) {
                        render_pass.set_pipeline(&self.sprite_pipeline);
                        render_pass.set_bind_group(1, &self.sprite_camera.bind_group, &[]);
                        render_pass.set_vertex_buffer(0, self.quad.slice(..));
                        render_pass.set_vertex_buffer(1, self.models.buffer().slice(..));
                        render_pass.set_vertex_buffer(2, self.uvs.buffer().slice(..));
                        render_pass.set_vertex_buffer(3, self.tints.buffer().slice(..));
                        bound = Some(Bound::Sprite);
                    }
                    render_pass.set_bind_group(0, &entry.bind_group, &[]);
                    render_pass.draw(0..UNIT_QUAD.len() as u32, instances.clone());
                }
                DrawCommand::StaticMesh {
                    texture,
                    buffer,
                    vertex_count,
                    ..
                } => {
                    let (Some(entry), Some(chunk)) =
                        (self.textures.get(&texture.id), self.chunks.get(buffer.0 as usize))
                    else {
                        continue;
                    };
                    if bound != Some(Bound::Tile) {
                        render_pass.set_pipeline(&self.tile_pipeline);
                        render_pass.set_bind_group(1, &self.tile_camera.bind_group, &[]);
                        bound = Some(Bound::Tile);
                    }
                    render_pass.set_bind_group(0, &entry.bind_group, &[]);
                    render_pass.set_bind_group(2, &chunk.model.bind_group, &[]);
                    render_pass.set_vertex_buffer(0, chunk.vertices.buffer().slice(..));
                    render_pass.draw(0..*vertex_count, 0..1);
                }
            }
        }
    }

    /// Read the last submitted frame of a headless context as tightly packed RGBA8 rows.
    pub async fn read_frame(&self) -> Result<Vec<u8>, RenderError> {
        let Some(texture) = self.ctx.offscreen_texture() else {
            return Err(RenderError::Readback("only offscreen targets can be read back".into()));
        };
        let (width, height) = self.ctx.size();
        let u32_size = std::mem::size_of::<u32>() as u32;
        let unpadded_row = u32_size * width;
        let align = wgpu::COPY_BYTES_PER_ROW_ALIGNMENT;
        let padded_row = unpadded_row.div_ceil(align) * align;

        let output_buffer = self.ctx.device.create_buffer(&wgpu::BufferDescriptor {
            size: (padded_row * height) as wgpu::BufferAddress,
            usage: wgpu::BufferUsages::COPY_DST | wgpu::BufferUsages::MAP_READ,
            label: Some("readback buffer"),
            mapped_at_creation: false,
        });

        let mut encoder = self
            .ctx
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("Readback Encoder"),
            });
        encoder.copy_texture_to_buffer(
            wgpu::TexelCopyTextureInfo {
                aspect: wgpu::TextureAspect::All,
                texture,
                mip_level: 0,
                origin: wgpu::Origin3d::ZERO,
            },
            wgpu::TexelCopyBufferInfo {
                buffer: &output_buffer,
                layout: wgpu::TexelCopyBufferLayout {
                    offset: 0,
                    bytes_per_row: Some(padded_row),
                    rows_per_image: Some(height),
                },
            },
            wgpu::Extent3d {
                width,
                height,
                depth_or_array_layers: 1,
            },
        );
        self.ctx.queue.submit(iter::once(encoder.finish()));

        let (tx, rx) = futures_intrusive::channel::shared::oneshot_channel();
        let buffer_slice = output_buffer.slice(..);
        buffer_slice.map_async(wgpu::MapMode::Read, move |result| {
            // the receiver only goes away if the caller stopped waiting
            let _ = tx.send(result);
        });
        self.ctx
            .device
            .poll(wgpu::PollType::Wait {
                submission_index: None,
                timeout: Some(std::time::Duration::from_secs(3)),
            })
            .map_err(|e| RenderError::Readback(e.to_string()))?;
        match rx.receive().await {
            Some(Ok(())) => {}
            Some(Err(e)) => return Err(RenderError::Readback(e.to_string())),
            None => return Err(RenderError::Readback("buffer mapping was dropped".into())),
        }

        let pixels = {
            let data = buffer_slice.get_mapped_range();
            data.chunks(padded_row as usize)
                .flat_map(|row| &row[..unpadded_row as usize])
                .copied()
                .collect::<Vec<u8>>()
        };
        output_buffer.unmap();
        Ok(pixels)
    }
}

impl RenderBackend for GpuBufferManager {
    fn set_projection_matrix(&mut self, view_projection: &Matrix4<f32>) {
        let mut uniform = CameraUniform::new();
        uniform.update_view_proj(view_projection);
        // sprites and tiles each keep their own copy
        for binding in [&self.sprite_camera, &self.tile_camera] {
            self.ctx
                .queue
                .write_buffer(&binding.buffer, 0, bytemuck::cast_slice(&[uniform]));
        }
    }

    fn update_viewport_size(&mut self, width: u32, height: u32) {
        self.ctx.resize(width, height);
    }

    fn target_size(&self) -> Option<(u32, u32)> {
        Some(self.ctx.size())
    }

    fn render_frame_start(&mut self) -> Result<(), RenderError> {
        if self.frame_open {
            log::warn!("Frame started twice, dropping {} recorded draws", self.commands.len());
        }
        self.staged_models.clear();
        self.staged_uvs.clear();
        self.staged_tints.clear();
        self.commands.clear();
        self.frame_open = true;
        Ok(())
    }

    fn draw_instanced(
        &mut self,
        texture: Texture,
        models: &[ModelRaw],
        uvs: &[UvRaw],
        tints: &[TintRaw],
        count: usize,
    ) -> Result<(), RenderError> {
        if !self.frame_open {
            return Err(RenderError::FrameNotStarted);
        }
        validate_instances(texture, models, uvs, tints, count)?;
        self.resolve(texture)?;
        if count == 0 {
            return Ok(());
        }

        let start = self.staged_models.len() as u32;
        self.staged_models.extend_from_slice(models);
        self.staged_uvs.extend_from_slice(uvs);
        self.staged_tints.extend_from_slice(tints);
        self.commands.push(DrawCommand::Instanced {
            texture,
            instances: start..start + count as u32,
        });
        Ok(())
    }

    fn upload_chunk(
        &mut self,
        buffer: Option<ChunkBufferHandle>,
        vertices: &[TileVertex],
    ) -> Result<ChunkBufferHandle, RenderError> {
        let contents: &[u8] = bytemuck::cast_slice(vertices);
        match buffer {
            Some(handle) => {
                let Some(chunk) = self.chunks.get_mut(handle.0 as usize) else {
                    return Err(RenderError::UnknownChunkBuffer(handle.0));
                };
                chunk
                    .vertices
                    .write(&self.ctx.device, &self.ctx.queue, "chunk vertices", contents);
                Ok(handle)
            }
            None => {
                let handle = ChunkBufferHandle(self.chunks.len() as u32);
                let vertices = StaticBuffer::new(&self.ctx.device, "chunk vertices", contents);
                let model = UniformBinding::new(
                    &self.ctx.device,
                    &self.chunk_layout,
                    "chunk model",
                    bytemuck::cast_slice(&[ChunkUniform::from(Matrix4::from_scale(1.0))]),
                );
                self.chunks.push(ChunkEntry { vertices, model });
                log::debug!("Created chunk buffer {handle:?}");
                Ok(handle)
            }
        }
    }

    fn draw_static_mesh(
        &mut self,
        texture: Texture,
        buffer: ChunkBufferHandle,
        vertex_count: u32,
        model: &Matrix4<f32>,
    ) -> Result<(), RenderError> {
        if !self.frame_open {
            return Err(RenderError::FrameNotStarted);
        }
        self.resolve(texture)?;
        let Some(chunk) = self.chunks.get(buffer.0 as usize) else {
            return Err(RenderError::UnknownChunkBuffer(buffer.0));
        };
        if vertex_count == 0 {
            return Ok(());
        }
        self.ctx.queue.write_buffer(
            &chunk.model.buffer,
            0,
            bytemuck::cast_slice(&[ChunkUniform::from(*model)]),
        );
        self.commands.push(DrawCommand::StaticMesh {
            texture,
            buffer,
            vertex_count,
            model: *model,
        });
        Ok(())
    }

    fn render_frame_end(&mut self) -> Result<(), RenderError> {
        if !self.frame_open {
            return Err(RenderError::FrameNotStarted);
        }
        self.frame_open = false;
        self.upload_instances();

        let acquired = self.ctx.acquire_frame();
        if let Err(RenderError::Surface(wgpu::SurfaceError::Lost | wgpu::SurfaceError::Outdated)) =
            &acquired
        {
            let (width, height) = self.ctx.size();
            log::warn!("Surface lost or outdated, reconfiguring at {width}x{height}");
            self.ctx.resize(width, height);
            return Ok(());
        }
        let (frame, view) = acquired?;

        let mut encoder = self
            .ctx
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("Render Encoder"),
            });
        self.encode_pass(&mut encoder, &view);
        self.ctx.queue.submit(iter::once(encoder.finish()));
        log::trace!(
            "Submitted {} draws with {} instances",
            self.commands.len(),
            self.staged_models.len()
        );

        if let FrameTarget::Surface(output) = frame {
            output.present();
        }
        Ok(())
    }
}
