//! Chunked tilemap meshing.
//!
//! The unbounded tile grid is split into `C x C` chunks. Each chunk keeps a sparse
//! map of its tiles and a baked triangle list, regenerated whenever one of its
//! tiles changes and re-uploaded to the GPU only while its dirty flag is set.
//! Tile geometry is static between edits, so the per-chunk cache turns a map of
//! thousands of tiles into a handful of plain draws per frame.

use std::collections::{BTreeMap, HashMap};

use cgmath::{Matrix4, Vector3};

use crate::{
    data_structures::{
        Vertex,
        rect::Rect,
        texture::{Texture, TextureId},
    },
    error::RenderError,
    render::{ChunkBufferHandle, RenderBackend},
};

pub const DEFAULT_CHUNK_SIZE: u32 = 32;
pub const DEFAULT_TILE_SIZE: u32 = 32;

/// Chunk grid coordinates: `(floor(x / C), floor(y / C))`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ChunkId {
    pub x: i32,
    pub y: i32,
}

/// Tile coordinates inside a chunk, ordered row first.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct LocalTile {
    pub y: u32,
    pub x: u32,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct TileData {
    pub texture: Texture,
    pub source_rect: Rect,
    pub visible: bool,
}

/// One vertex of a baked chunk mesh, in chunk-local pixels.
#[repr(C)]
#[derive(Copy, Clone, Debug, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct TileVertex {
    pub position: [f32; 2],
    pub tex_coords: [f32; 2],
}

impl TileVertex {
    pub const fn new(position: [f32; 2], tex_coords: [f32; 2]) -> Self {
        Self {
            position,
            tex_coords,
        }
    }
}

impl Vertex for TileVertex {
    fn desc() -> wgpu::VertexBufferLayout<'static> {
        use std::mem;
        wgpu::VertexBufferLayout {
            array_stride: mem::size_of::<TileVertex>() as wgpu::BufferAddress,
            step_mode: wgpu::VertexStepMode::Vertex,
            attributes: &[
                wgpu::VertexAttribute {
                    offset: 0,
                    shader_location: 0,
                    format: wgpu::VertexFormat::Float32x2,
                },
                wgpu::VertexAttribute {
                    offset: mem::size_of::<[f32; 2]>() as wgpu::BufferAddress,
                    shader_location: 1,
                    format: wgpu::VertexFormat::Float32x2,
                },
            ],
        }
    }
}

#[derive(Debug)]
pub struct TileChunk {
    id: ChunkId,
    texture: Texture,
    tiles: BTreeMap<LocalTile, TileData>,
    vertices: Vec<TileVertex>,
    buffer: Option<ChunkBufferHandle>,
    dirty: bool,
}

impl TileChunk {
    fn new(id: ChunkId, texture: Texture) -> Self {
        Self {
            id,
            texture,
            tiles: BTreeMap::new(),
            vertices: Vec::new(),
            buffer: None,
            dirty: true,
        }
    }

    pub fn id(&self) -> ChunkId {
        self.id
    }

    /// The texture bound by the chunk's first tile write.
    pub fn texture(&self) -> Texture {
        self.texture
    }

    pub fn tiles(&self) -> &BTreeMap<LocalTile, TileData> {
        &self.tiles
    }

    pub fn vertices(&self) -> &[TileVertex] {
        &self.vertices
    }

    pub fn vertex_count(&self) -> u32 {
        self.vertices.len() as u32
    }

    pub fn buffer(&self) -> Option<ChunkBufferHandle> {
        self.buffer
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// Rebuild the triangle list: six vertices per visible tile, nothing for hidden ones.
    fn regenerate(&mut self, tile_size: f32) {
        self.vertices.clear();
        let tex_w = self.texture.width as f32;
        let tex_h = self.texture.height as f32;

        for (local, tile) in self.tiles.iter().filter(|(_, tile)| tile.visible) {
            let left = local.x as f32 * tile_size;
            let top = local.y as f32 * tile_size;
            let right = left + tile_size;
            let bottom = top + tile_size;

            let [u, v, u_span, v_span] = tile.source_rect.to_uv(tex_w, tex_h);
            let (u_left, u_right) = (u, u + u_span);
            let (v_top, v_bottom) = (v, v + v_span);

            self.vertices.extend_from_slice(&[
                TileVertex::new([left, bottom], [u_left, v_bottom]),
                TileVertex::new([left, top], [u_left, v_top]),
                TileVertex::new([right, top], [u_right, v_top]),
                TileVertex::new([left, bottom], [u_left, v_bottom]),
                TileVertex::new([right, top], [u_right, v_top]),
                TileVertex::new([right, bottom], [u_right, v_bottom]),
            ]);
        }
        self.dirty = true;
    }
}

/// Owns all chunks of the tilemap and turns them into static draws.
#[derive(Debug)]
pub struct TileChunkMesher {
    chunks: HashMap<ChunkId, TileChunk>,
    chunk_size: u32,
    tile_size: u32,
}

impl TileChunkMesher {
    pub fn new(chunk_size: u32, tile_size: u32) -> Self {
        Self {
            chunks: HashMap::new(),
            chunk_size: chunk_size.max(1),
            tile_size,
        }
    }

    pub fn chunk_size(&self) -> u32 {
        self.chunk_size
    }

    pub fn tile_size(&self) -> u32 {
        self.tile_size
    }

    /// Which chunk a map tile belongs to, and where inside it.
    pub fn locate(&self, map_x: i32, map_y: i32) -> (ChunkId, LocalTile) {
        let c = self.chunk_size as i32;
        let id = ChunkId {
            x: map_x.div_euclid(c),
            y: map_y.div_euclid(c),
        };
        let local = LocalTile {
            x: map_x.rem_euclid(c) as u32,
            y: map_y.rem_euclid(c) as u32,
        };
        (id, local)
    }

    /// Insert or replace one tile and rebake its chunk.
    ///
    /// The first write into a chunk creates it and binds its texture; a later write
    /// with a different texture is rejected and leaves the chunk untouched.
    pub fn set_tile(
        &mut self,
        map_x: i32,
        map_y: i32,
        texture: Texture,
        source_rect: Rect,
        visible: bool,
    ) -> Result<ChunkId, RenderError> {
        if !texture.is_resolved() {
            return Err(RenderError::MissingResource {
                texture: texture.id,
                reason: "tile texture has no size",
            });
        }
        let (id, local) = self.locate(map_x, map_y);
        let tile_size = self.tile_size as f32;
        let chunk = self.chunks.entry(id).or_insert_with(|| {
            log::debug!("Creating tile chunk {id:?} for texture {:?}", texture.id);
            TileChunk::new(id, texture)
        });
        if chunk.texture.id != texture.id {
            return Err(RenderError::AmbiguousChunkTexture {
                chunk: id,
                bound: chunk.texture.id,
                supplied: texture.id,
            });
        }

        chunk.tiles.insert(
            local,
            TileData {
                texture,
                source_rect,
                visible,
            },
        );
        chunk.regenerate(tile_size);
        Ok(id)
    }

    /// Change the edge length of a tile in pixels. Existing chunks are rebaked.
    pub fn set_tile_size(&mut self, tile_size: u32) {
        if tile_size == self.tile_size {
            return;
        }
        self.tile_size = tile_size;
        let size = tile_size as f32;
        self.chunks
            .values_mut()
            .for_each(|chunk| chunk.regenerate(size));
    }

    pub fn chunk(&self, id: ChunkId) -> Option<&TileChunk> {
        self.chunks.get(&id)
    }

    pub fn chunks(&self) -> impl Iterator<Item = &TileChunk> {
        self.chunks.values()
    }

    pub fn tile(&self, map_x: i32, map_y: i32) -> Option<&TileData> {
        let (id, local) = self.locate(map_x, map_y);
        self.chunks.get(&id)?.tiles.get(&local)
    }

    /// World-space origin of a chunk, used as the model matrix of its draw.
    pub fn chunk_model_matrix(&self, id: ChunkId) -> Matrix4<f32> {
        let extent = (self.chunk_size * self.tile_size) as f32;
        Matrix4::from_translation(Vector3::new(
            id.x as f32 * extent,
            id.y as f32 * extent,
            0.0,
        ))
    }

    /// Upload dirty chunks and issue one static draw per non-empty chunk.
    ///
    /// Chunks are visited ordered by texture to keep texture switches down. A
    /// chunk stays dirty if its upload fails and is skipped for this frame.
    /// Returns the number of draws issued.
    pub fn render_tiles<B: RenderBackend + ?Sized>(&mut self, backend: &mut B) -> usize {
        let mut order: Vec<(TextureId, ChunkId)> = self
            .chunks
            .values()
            .filter(|chunk| !chunk.vertices.is_empty())
            .map(|chunk| (chunk.texture.id, chunk.id))
            .collect();
        order.sort_unstable();

        let mut draws = 0;
        for (_, id) in order {
            let model = self.chunk_model_matrix(id);
            let Some(chunk) = self.chunks.get_mut(&id) else {
                continue;
            };

            if chunk.dirty || chunk.buffer.is_none() {
                match backend.upload_chunk(chunk.buffer, &chunk.vertices) {
                    Ok(handle) => {
                        chunk.buffer = Some(handle);
                        chunk.dirty = false;
                    }
                    Err(e) => {
                        log::warn!("Uploading tile chunk {id:?} failed, retrying next frame: {e}");
                        continue;
                    }
                }
            }
            let Some(handle) = chunk.buffer else {
                continue;
            };

            match backend.draw_static_mesh(chunk.texture, handle, chunk.vertex_count(), &model) {
                Ok(()) => draws += 1,
                Err(e) => log::warn!("Skipping tile chunk {id:?}: {e}"),
            }
        }
        draws
    }
}

impl Default for TileChunkMesher {
    fn default() -> Self {
        Self::new(DEFAULT_CHUNK_SIZE, DEFAULT_TILE_SIZE)
    }
}
