use crate::coords::{ScissorRect, Viewport};
use crate::device::{BackBufferIndex, RtvHandle};
use crate::pipeline::VertexBufferView;

/// GPU resources a recorded command can refer to.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum ResourceId {
    BackBuffer(BackBufferIndex),
    VertexBuffer,
    UploadBuffer,
}

/// Usage state of a GPU resource.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum ResourceState {
    Present,
    RenderTarget,
    CopySource,
    CopyDest,
    VertexAndConstantBuffer,
}

/// Resource state transition.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub struct Barrier {
    pub resource: ResourceId,
    pub before: ResourceState,
    pub after: ResourceState,
}

#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum Topology {
    TriangleList,
}

/// A single recorded GPU command.
///
/// Command lists hold these in recording order; `command::encode` turns them
/// into wgpu passes and copies at submission time.
#[derive(Debug, Copy, Clone, PartialEq)]
pub enum Command {
    Transition(Barrier),
    SetRenderTarget(RtvHandle),
    SetViewport(Viewport),
    SetScissor(ScissorRect),
    ClearRenderTarget { target: RtvHandle, color: wgpu::Color },
    SetPipelineState,
    SetRootSignature,
    SetVertexBuffer(VertexBufferView),
    SetTopology(Topology),
    Draw { vertex_count: u32, instance_count: u32 },
    CopyBuffer { dst: ResourceId, src: ResourceId, size: u64 },
}

impl Command {
    /// Returns the barrier if this command is a transition.
    #[inline]
    pub fn as_transition(&self) -> Option<&Barrier> {
        match self {
            Command::Transition(b) => Some(b),
            _ => None,
        }
    }
}
