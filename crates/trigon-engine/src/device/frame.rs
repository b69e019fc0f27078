use crate::command::{CommandAllocator, CommandList, ResourceState, ResourceTable, Topology};
use crate::coords::{Extent, ScissorRect, Viewport};
use crate::pipeline::{PipelineState, RootSignature, VertexBuffer, VertexBufferView};

use super::{
    BackBufferIndex, BackBufferStates, CommandQueue, DescriptorHeap, Fence, FenceValue,
    FrameError, GpuDevice, RtvHandle, SwapChain,
};

/// Outcome of one rendered frame.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub struct FrameReport {
    /// Back buffer the frame was drawn into.
    pub back_buffer: BackBufferIndex,
    /// Fence value the frame waited on.
    pub fence_value: FenceValue,
    /// Successful frames so far, this one included.
    pub frame_number: u64,
}

/// Sizes of the renderer's reusable storage.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub struct ResourceCounts {
    pub descriptors: usize,
    pub command_capacity: usize,
}

/// Everything `record_frame` needs to know about the current frame.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct FrameParams {
    pub back_buffer: BackBufferIndex,
    pub target: RtvHandle,
    pub viewport: Viewport,
    pub scissor: ScissorRect,
    pub clear_color: wgpu::Color,
    pub vertex_buffer: VertexBufferView,
}

/// Records the commands of one frame into an open list and closes it.
///
/// `states` is updated as the barriers are recorded. When the back buffer is
/// not in the present state nothing is recorded and `states` is untouched.
pub fn record_frame(
    list: &mut CommandList,
    states: &mut BackBufferStates,
    params: &FrameParams,
) -> Result<(), FrameError> {
    let index = params.back_buffer;
    let to_target = states.transition(index, ResourceState::Present, ResourceState::RenderTarget)?;

    list.transition(to_target);

    list.set_render_target(params.target);
    list.set_viewport(params.viewport);
    list.set_scissor(params.scissor);
    list.clear_render_target(params.target, params.clear_color);

    list.set_pipeline_state();
    list.set_root_signature();
    list.set_vertex_buffer(params.vertex_buffer);
    list.set_topology(Topology::TriangleList);
    list.draw(params.vertex_buffer.vertex_count(), 1);

    let to_present = states.transition(index, ResourceState::RenderTarget, ResourceState::Present)?;
    list.transition(to_present);

    list.close()
}

/// Draws the triangle into a double-buffered swap chain, one frame at a time.
///
/// Built only through [`RendererBuilder`](super::RendererBuilder), so every
/// resource exists once a value of this type does. Each frame is fully waited
/// on before `render` returns.
pub struct FrameRenderer<'w> {
    pub(super) gpu: GpuDevice,
    pub(super) queue: CommandQueue,
    pub(super) fence: Fence,
    pub(super) swap_chain: SwapChain<'w>,
    pub(super) rtv_heap: DescriptorHeap,
    pub(super) root_signature: RootSignature,
    pub(super) pipeline: PipelineState,
    pub(super) allocator: CommandAllocator,
    pub(super) list: CommandList,
    pub(super) vertex_buffer: VertexBuffer,
    pub(super) clear_color: wgpu::Color,
    pub(super) frames: u64,
}

impl<'w> FrameRenderer<'w> {
    /// Renders and presents one frame, then waits for the GPU to finish it.
    ///
    /// Any error skips the frame; the renderer stays usable.
    pub fn render(&mut self) -> Result<FrameReport, FrameError> {
        self.ensure_recording()?;

        let buffer = self.swap_chain.acquire(&self.gpu)?;
        let index = buffer.index();
        let view = self.swap_chain.create_view(&buffer, &self.rtv_heap);

        let snapshot = self.swap_chain.states().clone();
        let value = match self.record_and_submit(index, &view) {
            Ok(value) => value,
            Err(err) => {
                // Nothing reached the GPU, so the recorded transitions never happened.
                *self.swap_chain.states_mut() = snapshot;
                return Err(err);
            }
        };
        drop(view);
        self.allocator.mark_submitted(value);

        let presented = self.swap_chain.present(buffer);

        self.fence.wait(&self.gpu, value)?;
        self.allocator.reset(&self.fence)?;
        self.list.reset(&self.allocator)?;
        presented?;

        self.frames += 1;
        log::trace!("frame {} on back buffer {index}, fence {value}", self.frames);

        Ok(FrameReport {
            back_buffer: index,
            fence_value: value,
            frame_number: self.frames,
        })
    }

    fn record_and_submit(
        &mut self,
        index: BackBufferIndex,
        view: &wgpu::TextureView,
    ) -> Result<FenceValue, FrameError> {
        let extent = self.swap_chain.extent();
        let params = FrameParams {
            back_buffer: index,
            target: self.rtv_heap.handle(index),
            viewport: Viewport::from_extent(extent),
            scissor: ScissorRect::full(extent),
            clear_color: self.clear_color,
            vertex_buffer: self.vertex_buffer.view(),
        };
        record_frame(&mut self.list, self.swap_chain.states_mut(), &params)?;

        let resources = ResourceTable {
            back_buffer: Some((index, view)),
            vertex_buffer: Some(self.vertex_buffer.raw()),
            upload_buffer: None,
            root_signature: Some(self.root_signature.raw()),
            pipeline: Some(self.pipeline.raw()),
        };
        self.queue
            .execute(&self.gpu, &self.list, &resources, &mut self.fence)
    }

    /// Leaves the list open and empty, whatever the previous frame did.
    fn ensure_recording(&mut self) -> Result<(), FrameError> {
        if self.list.is_recording() {
            self.list.discard();
            return Ok(());
        }

        if let Some(pending) = self.allocator.pending() {
            self.fence.wait(&self.gpu, pending)?;
        }
        self.allocator.reset(&self.fence)?;
        self.list.reset(&self.allocator)
    }

    /// Resizes the swap chain after the GPU has gone idle.
    ///
    /// A zero extent is accepted; frames are skipped until a real size arrives.
    pub fn resize(&mut self, extent: Extent) -> Result<(), FrameError> {
        if extent == self.swap_chain.extent() {
            return Ok(());
        }

        self.wait_idle()?;
        self.swap_chain.resize(&self.gpu, extent);
        log::debug!("swap chain resized to {extent}");
        Ok(())
    }

    /// Blocks until every submission so far has completed.
    pub fn wait_idle(&self) -> Result<(), FrameError> {
        self.fence.wait_idle(&self.gpu)?;
        Ok(())
    }

    pub fn resource_counts(&self) -> ResourceCounts {
        ResourceCounts {
            descriptors: self.rtv_heap.descriptor_count(),
            command_capacity: self.list.capacity(),
        }
    }

    #[inline]
    pub fn gpu(&self) -> &GpuDevice {
        &self.gpu
    }

    #[inline]
    pub fn queue(&self) -> &CommandQueue {
        &self.queue
    }

    #[inline]
    pub fn fence(&self) -> &Fence {
        &self.fence
    }

    #[inline]
    pub fn swap_chain(&self) -> &SwapChain<'w> {
        &self.swap_chain
    }

    #[inline]
    pub fn vertex_buffer(&self) -> &VertexBuffer {
        &self.vertex_buffer
    }

    /// Successful frames so far.
    #[inline]
    pub fn frames(&self) -> u64 {
        self.frames
    }
}

impl Drop for FrameRenderer<'_> {
    fn drop(&mut self) {
        if let Err(err) = self.fence.wait_idle(&self.gpu) {
            log::warn!("GPU did not drain before shutdown: {err}");
        }
    }
}
