use thiserror::Error;

use crate::coords::{ScissorRect, Viewport};
use crate::device::{BackBufferIndex, RtvHandle};
use crate::pipeline::VertexBufferView;

use super::{Command, ResourceId, ResourceState, Topology};

/// A recorded list that cannot be turned into GPU work.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum EncodeError {
    #[error("{0:?} is not available to this submission")]
    MissingResource(ResourceId),

    #[error("draw issued without a bound {0}")]
    Unbound(&'static str),

    #[error("draw issued without a render target")]
    NoRenderTarget,
}

/// GPU objects that recorded commands refer to by id.
#[derive(Default)]
pub struct ResourceTable<'a> {
    pub back_buffer: Option<(BackBufferIndex, &'a wgpu::TextureView)>,
    pub vertex_buffer: Option<&'a wgpu::Buffer>,
    pub upload_buffer: Option<&'a wgpu::Buffer>,
    pub root_signature: Option<&'a wgpu::PipelineLayout>,
    pub pipeline: Option<&'a wgpu::RenderPipeline>,
}

impl<'a> ResourceTable<'a> {
    fn buffer(&self, id: ResourceId) -> Result<&'a wgpu::Buffer, EncodeError> {
        let found = match id {
            ResourceId::VertexBuffer => self.vertex_buffer,
            ResourceId::UploadBuffer => self.upload_buffer,
            ResourceId::BackBuffer(_) => None,
        };
        found.ok_or(EncodeError::MissingResource(id))
    }

    fn target_view(&self, rtv: RtvHandle) -> Result<&'a wgpu::TextureView, EncodeError> {
        match self.back_buffer {
            Some((index, view)) if index == rtv.index() => Ok(view),
            _ => Err(EncodeError::MissingResource(ResourceId::BackBuffer(rtv.index()))),
        }
    }
}

/// One draw together with the state bound when it was recorded.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct DrawCall {
    pub viewport: Viewport,
    pub scissor: ScissorRect,
    pub vertex_buffer: VertexBufferView,
    pub vertex_count: u32,
    pub instance_count: u32,
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct PassPlan {
    pub target: RtvHandle,
    pub clear: Option<wgpu::Color>,
    pub draws: Vec<DrawCall>,
}

/// Unit of encoded work: a buffer copy or a render pass.
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Step {
    Copy {
        dst: ResourceId,
        src: ResourceId,
        size: u64,
    },
    Pass(PassPlan),
}

#[derive(Default)]
struct Bindings {
    target: Option<RtvHandle>,
    viewport: Option<Viewport>,
    scissor: Option<ScissorRect>,
    pipeline: bool,
    root_signature: bool,
    vertex_buffer: Option<VertexBufferView>,
    topology: Option<Topology>,
}

fn flush(pass: &mut Option<PassPlan>, steps: &mut Vec<Step>) {
    if let Some(p) = pass.take() {
        steps.push(Step::Pass(p));
    }
}

/// Groups recorded commands into copies and render passes.
///
/// A pass ends when its target leaves the render-target state, when another
/// target is bound, before a copy, and before a clear that follows draws
/// (clears become the pass load op).
pub(crate) fn plan(commands: &[Command]) -> Result<Vec<Step>, EncodeError> {
    let mut steps = Vec::new();
    let mut pass: Option<PassPlan> = None;
    let mut bound = Bindings::default();

    for cmd in commands {
        match *cmd {
            Command::Transition(barrier) => {
                if let ResourceId::BackBuffer(index) = barrier.resource {
                    let leaving = barrier.before == ResourceState::RenderTarget;
                    if leaving && pass.as_ref().is_some_and(|p| p.target.index() == index) {
                        flush(&mut pass, &mut steps);
                    }
                }
            }
            Command::SetRenderTarget(rtv) => {
                if pass.as_ref().is_some_and(|p| p.target != rtv) {
                    flush(&mut pass, &mut steps);
                }
                bound.target = Some(rtv);
            }
            Command::SetViewport(v) => bound.viewport = Some(v),
            Command::SetScissor(s) => bound.scissor = Some(s),
            Command::ClearRenderTarget { target, color } => {
                if pass
                    .as_ref()
                    .is_some_and(|p| p.target != target || !p.draws.is_empty())
                {
                    flush(&mut pass, &mut steps);
                }
                pass.get_or_insert_with(|| PassPlan {
                    target,
                    clear: None,
                    draws: Vec::new(),
                })
                .clear = Some(color);
            }
            Command::SetPipelineState => bound.pipeline = true,
            Command::SetRootSignature => bound.root_signature = true,
            Command::SetVertexBuffer(view) => bound.vertex_buffer = Some(view),
            Command::SetTopology(t) => bound.topology = Some(t),
            Command::Draw {
                vertex_count,
                instance_count,
            } => {
                let target = bound.target.ok_or(EncodeError::NoRenderTarget)?;
                if !bound.pipeline {
                    return Err(EncodeError::Unbound("pipeline state"));
                }
                if !bound.root_signature {
                    return Err(EncodeError::Unbound("root signature"));
                }
                let vertex_buffer = bound.vertex_buffer.ok_or(EncodeError::Unbound("vertex buffer"))?;
                bound.topology.ok_or(EncodeError::Unbound("primitive topology"))?;
                let viewport = bound.viewport.ok_or(EncodeError::Unbound("viewport"))?;
                let scissor = bound.scissor.ok_or(EncodeError::Unbound("scissor rect"))?;

                if pass.as_ref().is_some_and(|p| p.target != target) {
                    flush(&mut pass, &mut steps);
                }
                pass.get_or_insert_with(|| PassPlan {
                    target,
                    clear: None,
                    draws: Vec::new(),
                })
                .draws
                .push(DrawCall {
                    viewport,
                    scissor,
                    vertex_buffer,
                    vertex_count,
                    instance_count,
                });
            }
            Command::CopyBuffer { dst, src, size } => {
                flush(&mut pass, &mut steps);
                steps.push(Step::Copy { dst, src, size });
            }
        }
    }

    flush(&mut pass, &mut steps);
    Ok(steps)
}

/// Turns a closed command list into a wgpu command buffer.
pub fn encode(
    device: &wgpu::Device,
    commands: &[Command],
    resources: &ResourceTable<'_>,
) -> Result<wgpu::CommandBuffer, EncodeError> {
    let steps = plan(commands)?;

    let mut encoder = device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
        label: Some("trigon command list"),
    });

    for step in &steps {
        match step {
            Step::Copy { dst, src, size } => {
                let src = resources.buffer(*src)?;
                let dst = resources.buffer(*dst)?;
                encoder.copy_buffer_to_buffer(src, 0, dst, 0, *size);
            }
            Step::Pass(pass) => encode_pass(&mut encoder, pass, resources)?,
        }
    }

    Ok(encoder.finish())
}

fn encode_pass(
    encoder: &mut wgpu::CommandEncoder,
    pass: &PassPlan,
    resources: &ResourceTable<'_>,
) -> Result<(), EncodeError> {
    let view = resources.target_view(pass.target)?;

    // Resolve everything before the pass borrows the encoder.
    let draw_state = if pass.draws.is_empty() {
        None
    } else {
        resources.root_signature.ok_or(EncodeError::Unbound("root signature"))?;
        let pipeline = resources.pipeline.ok_or(EncodeError::Unbound("pipeline state"))?;
        let vertex_buffer = resources.buffer(ResourceId::VertexBuffer)?;
        Some((pipeline, vertex_buffer))
    };

    let load = match pass.clear {
        Some(color) => wgpu::LoadOp::Clear(color),
        None => wgpu::LoadOp::Load,
    };

    let mut rpass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
        label: Some("trigon frame pass"),
        color_attachments: &[Some(wgpu::RenderPassColorAttachment {
            view,
            resolve_target: None,
            ops: wgpu::Operations {
                load,
                store: wgpu::StoreOp::Store,
            },
            depth_slice: None,
        })],
        depth_stencil_attachment: None,
        timestamp_writes: None,
        occlusion_query_set: None,
        multiview_mask: None,
    });

    let Some((pipeline, vertex_buffer)) = draw_state else {
        return Ok(());
    };

    for d in &pass.draws {
        let vp = d.viewport;
        rpass.set_viewport(vp.x, vp.y, vp.width, vp.height, vp.min_depth, vp.max_depth);
        let s = d.scissor;
        rpass.set_scissor_rect(s.x, s.y, s.width, s.height);
        rpass.set_pipeline(pipeline);
        rpass.set_vertex_buffer(0, vertex_buffer.slice(..d.vertex_buffer.size_in_bytes));
        rpass.draw(0..d.vertex_count, 0..d.instance_count);
    }

    Ok(())
}
