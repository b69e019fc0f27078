use crate::device::{GpuDevice, ValidationError};

use super::{ShaderModules, Vertex, ENTRY_POINT};

/// Resource binding layout shared by the pipeline and the command list.
///
/// The triangle reads nothing but vertex attributes, so the layout is empty.
pub struct RootSignature {
    layout: wgpu::PipelineLayout,
}

impl RootSignature {
    pub(crate) fn new(gpu: &GpuDevice) -> Result<Self, ValidationError> {
        let layout = gpu.validated(|device| {
            device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
                label: Some("trigon root signature"),
                bind_group_layouts: &[],
                immediate_size: 0,
            })
        })?;
        Ok(Self { layout })
    }

    #[inline]
    pub fn raw(&self) -> &wgpu::PipelineLayout {
        &self.layout
    }
}

/// Compiled render pipeline: both shader stages, vertex layout, fixed-function state.
pub struct PipelineState {
    pipeline: wgpu::RenderPipeline,
}

impl PipelineState {
    /// Fails when wgpu rejects the combination, e.g. a pixel input the
    /// vertex stage never writes.
    pub(crate) fn new(
        gpu: &GpuDevice,
        root_signature: &RootSignature,
        shaders: &ShaderModules,
        format: wgpu::TextureFormat,
    ) -> Result<Self, ValidationError> {
        let buffers = [Vertex::layout()];
        let targets = [Some(wgpu::ColorTargetState {
            format,
            blend: None,
            write_mask: wgpu::ColorWrites::ALL,
        })];

        let descriptor = wgpu::RenderPipelineDescriptor {
            label: Some("trigon pipeline state"),
            layout: Some(root_signature.raw()),

            vertex: wgpu::VertexState {
                module: &shaders.vertex,
                entry_point: Some(ENTRY_POINT),
                compilation_options: Default::default(),
                buffers: &buffers,
            },

            fragment: Some(wgpu::FragmentState {
                module: &shaders.pixel,
                entry_point: Some(ENTRY_POINT),
                compilation_options: Default::default(),
                targets: &targets,
            }),

            primitive: wgpu::PrimitiveState {
                topology: wgpu::PrimitiveTopology::TriangleList,
                strip_index_format: None,
                front_face: wgpu::FrontFace::Ccw,
                cull_mode: None,
                polygon_mode: wgpu::PolygonMode::Fill,
                unclipped_depth: false,
                conservative: false,
            },

            depth_stencil: None,
            multisample: wgpu::MultisampleState::default(),
            multiview_mask: None,
            cache: None,
        };

        let pipeline = gpu.validated(|device| device.create_render_pipeline(&descriptor))?;
        Ok(Self { pipeline })
    }

    #[inline]
    pub fn raw(&self) -> &wgpu::RenderPipeline {
        &self.pipeline
    }
}
