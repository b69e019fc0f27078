use crate::coords::{ScissorRect, Viewport};
use crate::device::{Fence, FenceValue, FrameError, RtvHandle};
use crate::pipeline::VertexBufferView;

use super::{Barrier, Command, ResourceId, Topology};

/// Backing memory for a command list.
///
/// The allocator remembers the fence value of the last submission recorded
/// against it and refuses to reset until the fence has passed that value.
#[derive(Debug, Default)]
pub struct CommandAllocator {
    pending: Option<FenceValue>,
    resets: u64,
}

impl CommandAllocator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fence value of a submission that may still be executing.
    #[inline]
    pub fn pending(&self) -> Option<FenceValue> {
        self.pending
    }

    #[inline]
    pub fn resets(&self) -> u64 {
        self.resets
    }

    /// Records that the list built from this allocator was submitted.
    pub fn mark_submitted(&mut self, value: FenceValue) {
        self.pending = Some(value);
    }

    /// Releases the allocator's memory for reuse.
    pub fn reset(&mut self, fence: &Fence) -> Result<(), FrameError> {
        if let Some(pending) = self.pending {
            let completed = fence.completed_value();
            if completed < pending {
                return Err(FrameError::AllocatorInFlight { pending, completed });
            }
        }
        self.pending = None;
        self.resets += 1;
        Ok(())
    }
}

#[derive(Debug, Copy, Clone, Eq, PartialEq)]
enum ListState {
    Recording,
    Closed,
}

/// Recording buffer for GPU commands.
///
/// A list is either recording or closed. Recording into a closed list is not
/// an immediate error; it is reported by the next [`close`](Self::close), the
/// way native command lists report recording errors.
///
/// Storage capacity is kept across resets, so steady-state frames do not allocate.
#[derive(Debug)]
pub struct CommandList {
    state: ListState,
    commands: Vec<Command>,
    recorded_while_closed: bool,
}

impl CommandList {
    /// Creates a list in the closed state.
    pub fn new_closed() -> Self {
        Self {
            state: ListState::Closed,
            commands: Vec::new(),
            recorded_while_closed: false,
        }
    }

    #[inline]
    pub fn is_closed(&self) -> bool {
        self.state == ListState::Closed
    }

    #[inline]
    pub fn is_recording(&self) -> bool {
        self.state == ListState::Recording
    }

    #[inline]
    pub fn commands(&self) -> &[Command] {
        &self.commands
    }

    #[inline]
    pub fn capacity(&self) -> usize {
        self.commands.capacity()
    }

    /// Barriers recorded so far, in order.
    pub fn transitions(&self) -> impl Iterator<Item = &Barrier> {
        self.commands.iter().filter_map(Command::as_transition)
    }

    /// Reopens a closed list for recording against `allocator`.
    ///
    /// The allocator must have been reset since its last submission.
    pub fn reset(&mut self, allocator: &CommandAllocator) -> Result<(), FrameError> {
        if self.state != ListState::Closed {
            return Err(FrameError::CommandListState("already recording"));
        }
        if allocator.pending().is_some() {
            return Err(FrameError::CommandListState("bound to an allocator that was not reset"));
        }

        self.commands.clear();
        self.recorded_while_closed = false;
        self.state = ListState::Recording;
        Ok(())
    }

    /// Drops everything recorded so far without leaving the recording state.
    pub fn discard(&mut self) {
        self.commands.clear();
        self.recorded_while_closed = false;
    }

    /// Ends recording. Fails if commands were recorded while closed.
    pub fn close(&mut self) -> Result<(), FrameError> {
        if self.state == ListState::Closed {
            return Err(FrameError::CommandListState("already closed"));
        }
        self.state = ListState::Closed;
        if self.recorded_while_closed {
            return Err(FrameError::CommandListState("recorded while closed"));
        }
        Ok(())
    }

    fn push(&mut self, cmd: Command) {
        if self.state == ListState::Closed {
            self.recorded_while_closed = true;
            return;
        }
        self.commands.push(cmd);
    }

    pub fn transition(&mut self, barrier: Barrier) {
        self.push(Command::Transition(barrier));
    }

    pub fn set_render_target(&mut self, rtv: RtvHandle) {
        self.push(Command::SetRenderTarget(rtv));
    }

    pub fn set_viewport(&mut self, viewport: Viewport) {
        self.push(Command::SetViewport(viewport));
    }

    pub fn set_scissor(&mut self, scissor: ScissorRect) {
        self.push(Command::SetScissor(scissor));
    }

    pub fn clear_render_target(&mut self, target: RtvHandle, color: wgpu::Color) {
        self.push(Command::ClearRenderTarget { target, color });
    }

    pub fn set_pipeline_state(&mut self) {
        self.push(Command::SetPipelineState);
    }

    pub fn set_root_signature(&mut self) {
        self.push(Command::SetRootSignature);
    }

    pub fn set_vertex_buffer(&mut self, view: VertexBufferView) {
        self.push(Command::SetVertexBuffer(view));
    }

    pub fn set_topology(&mut self, topology: Topology) {
        self.push(Command::SetTopology(topology));
    }

    pub fn draw(&mut self, vertex_count: u32, instance_count: u32) {
        self.push(Command::Draw {
            vertex_count,
            instance_count,
        });
    }

    pub fn copy_buffer(&mut self, dst: ResourceId, src: ResourceId, size: u64) {
        self.push(Command::CopyBuffer { dst, src, size });
    }
}
