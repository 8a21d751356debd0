use crate::{
    data_structures::{
        Vertex,
        instance::{ModelRaw, QuadVertex, TintRaw, UvRaw},
    },
    pipelines::basic::mk_blended_pipeline,
};

/// Instanced unit-quad pipeline.
///
/// Bind group 0 is the texture, bind group 1 the camera. Vertex buffer slot 0
/// holds the quad, slots 1 to 3 the model, UV and tint instance arrays.
pub fn mk_sprite_pipeline(
    device: &wgpu::Device,
    color_format: wgpu::TextureFormat,
    texture_bind_group_layout: &wgpu::BindGroupLayout,
    camera_bind_group_layout: &wgpu::BindGroupLayout,
) -> wgpu::RenderPipeline {
    let layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
        label: Some("Sprite Pipeline Layout"),
        bind_group_layouts: &[texture_bind_group_layout, camera_bind_group_layout],
        push_constant_ranges: &[],
    });

    let shader = wgpu::ShaderModuleDescriptor {
        label: Some("Sprite Shader"),
        source: wgpu::ShaderSource::Wgsl(include_str!("sprite.wgsl").into()),
    };

    mk_blended_pipeline(
        device,
        "Sprite Pipeline",
        &layout,
        color_format,
        &[
            QuadVertex::desc(),
            ModelRaw::desc(),
            UvRaw::desc(),
            TintRaw::desc(),
        ],
        shader,
    )
}
