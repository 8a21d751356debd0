use crate::{
    data_structures::Vertex,
    pipelines::basic::mk_blended_pipeline,
    tiles::TileVertex,
};

/// Per-chunk uniform placing chunk-local vertices in the world.
#[repr(C)]
#[derive(Debug, Copy, Clone, bytemuck::Pod, bytemuck::Zeroable)]
pub struct ChunkUniform {
    pub model: [[f32; 4]; 4],
}

impl From<cgmath::Matrix4<f32>> for ChunkUniform {
    fn from(model: cgmath::Matrix4<f32>) -> Self {
        Self {
            model: model.into(),
        }
    }
}

/// Static chunk mesh pipeline.
///
/// Bind group 0 is the texture, 1 the camera and 2 the chunk's model uniform.
pub fn mk_tile_pipeline(
    device: &wgpu::Device,
    color_format: wgpu::TextureFormat,
    texture_bind_group_layout: &wgpu::BindGroupLayout,
    camera_bind_group_layout: &wgpu::BindGroupLayout,
    chunk_bind_group_layout: &wgpu::BindGroupLayout,
) -> wgpu::RenderPipeline {
    let layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
        label: Some("Tile Pipeline Layout"),
        bind_group_layouts: &[
            texture_bind_group_layout,
            camera_bind_group_layout,
            chunk_bind_group_layout,
        ],
        push_constant_ranges: &[],
    });

    let shader = wgpu::ShaderModuleDescriptor {
        label: Some("Tile Shader"),
        source: wgpu::ShaderSource::Wgsl(include_str!("tile.wgsl").into()),
    };

    mk_blended_pipeline(
        device,
        "Tile Pipeline",
        &layout,
        color_format,
        &[TileVertex::desc()],
        shader,
    )
}
