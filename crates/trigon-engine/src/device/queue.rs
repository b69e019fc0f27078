use crate::command::{self, CommandList, ResourceTable};

use super::{Fence, FenceValue, FrameError, GpuDevice};

/// Ordered submission channel for recorded command lists.
///
/// Lists execute in submission order. Every submission is followed by a fence
/// signal so the caller can wait for it.
pub struct CommandQueue {
    queue: wgpu::Queue,
    submissions: u64,
}

impl CommandQueue {
    pub(crate) fn new(queue: wgpu::Queue) -> Self {
        Self {
            queue,
            submissions: 0,
        }
    }

    /// Returns the underlying wgpu queue.
    pub fn raw(&self) -> &wgpu::Queue {
        &self.queue
    }

    /// Number of command lists submitted so far.
    pub fn submissions(&self) -> u64 {
        self.submissions
    }

    /// Encodes a closed list, submits it, and signals `fence`.
    ///
    /// Returns the fence value that marks completion of this submission. A
    /// list wgpu rejects is reported as [`FrameError::Validation`]; the fence
    /// is not signaled for it.
    pub fn execute(
        &mut self,
        gpu: &GpuDevice,
        list: &CommandList,
        resources: &ResourceTable<'_>,
        fence: &mut Fence,
    ) -> Result<FenceValue, FrameError> {
        if !list.is_closed() {
            return Err(FrameError::CommandListState("still recording"));
        }

        gpu.validated(|device| -> Result<(), FrameError> {
            let buffer = command::encode(device, list.commands(), resources)?;
            self.queue.submit(std::iter::once(buffer));
            Ok(())
        })??;
        self.submissions += 1;

        Ok(self.signal(fence))
    }

    /// Signals the next fence value once all previously submitted work completes.
    pub fn signal(&self, fence: &mut Fence) -> FenceValue {
        let (value, on_done) = fence.next_signal();
        self.queue.on_submitted_work_done(on_done);
        log::trace!("queue signal {value}");
        value
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::command::{CommandAllocator, ResourceId};
    use crate::device::gpu::test_device;

    fn buffer(device: &wgpu::Device, usage: wgpu::BufferUsages) -> wgpu::Buffer {
        device.create_buffer(&wgpu::BufferDescriptor {
            label: None,
            size: 16,
            usage,
            mapped_at_creation: false,
        })
    }

    fn copy_list() -> CommandList {
        let allocator = CommandAllocator::new();
        let mut list = CommandList::new_closed();
        list.reset(&allocator).unwrap();
        list.copy_buffer(ResourceId::VertexBuffer, ResourceId::UploadBuffer, 16);
        list.close().unwrap();
        list
    }

    #[test]
    fn valid_copy_is_submitted_and_signaled() {
        let (gpu, raw) = test_device::noop();
        let mut queue = CommandQueue::new(raw);
        let mut fence = Fence::new(0);

        let dst = buffer(gpu.device(), wgpu::BufferUsages::VERTEX | wgpu::BufferUsages::COPY_DST);
        let src = buffer(gpu.device(), wgpu::BufferUsages::COPY_SRC);
        let resources = ResourceTable {
            vertex_buffer: Some(&dst),
            upload_buffer: Some(&src),
            ..Default::default()
        };

        let value = queue.execute(&gpu, &copy_list(), &resources, &mut fence).unwrap();
        assert_eq!(value, 1);
        assert_eq!(queue.submissions(), 1);
        fence.wait(&gpu, value).unwrap();
    }

    #[test]
    fn rejected_submission_is_a_frame_error() {
        let (gpu, raw) = test_device::noop();
        let mut queue = CommandQueue::new(raw);
        let mut fence = Fence::new(0);

        // Copy destination without COPY_DST usage.
        let dst = buffer(gpu.device(), wgpu::BufferUsages::VERTEX);
        let src = buffer(gpu.device(), wgpu::BufferUsages::COPY_SRC);
        let resources = ResourceTable {
            vertex_buffer: Some(&dst),
            upload_buffer: Some(&src),
            ..Default::default()
        };

        let err = queue
            .execute(&gpu, &copy_list(), &resources, &mut fence)
            .unwrap_err();
        assert!(matches!(err, FrameError::Validation(_)), "{err}");
        assert_eq!(queue.submissions(), 0);
        assert_eq!(fence.last_signaled(), 0);
    }
}
