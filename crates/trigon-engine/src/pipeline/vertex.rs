use anyhow::{anyhow, Context, Result};
use bytemuck::{Pod, Zeroable};
use wgpu::util::DeviceExt;

use crate::command::{
    Barrier, CommandAllocator, CommandList, ResourceId, ResourceState, ResourceTable,
};
use crate::device::{CommandQueue, Fence, GpuDevice};

/// Number of vertex attributes a shader may read (`position`, `color`).
pub const VERTEX_ATTRIBUTE_COUNT: u32 = 2;

#[repr(C)]
#[derive(Debug, Copy, Clone, PartialEq, Pod, Zeroable)]
pub struct Vertex {
    pub position: [f32; 3],
    pub color: [f32; 4],
}

impl Vertex {
    const ATTRS: [wgpu::VertexAttribute; VERTEX_ATTRIBUTE_COUNT as usize] =
        wgpu::vertex_attr_array![0 => Float32x3, 1 => Float32x4];

    /// Bytes between consecutive vertices.
    pub const STRIDE: u64 = std::mem::size_of::<Vertex>() as u64;

    pub fn layout() -> wgpu::VertexBufferLayout<'static> {
        wgpu::VertexBufferLayout {
            array_stride: Self::STRIDE,
            step_mode: wgpu::VertexStepMode::Vertex,
            attributes: &Self::ATTRS,
        }
    }
}

/// Top red, bottom-right green, bottom-left blue. Clip-space coordinates.
pub const TRIANGLE_VERTICES: [Vertex; 3] = [
    Vertex {
        position: [0.0, 0.5, 0.0],
        color: [1.0, 0.0, 0.0, 1.0],
    },
    Vertex {
        position: [0.5, -0.5, 0.0],
        color: [0.0, 1.0, 0.0, 1.0],
    },
    Vertex {
        position: [-0.5, -0.5, 0.0],
        color: [0.0, 0.0, 1.0, 1.0],
    },
];

/// Location and layout of vertex data as bound by the input assembler.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub struct VertexBufferView {
    pub size_in_bytes: u64,
    pub stride_in_bytes: u64,
}

impl VertexBufferView {
    #[inline]
    pub fn vertex_count(&self) -> u32 {
        if self.stride_in_bytes == 0 {
            return 0;
        }
        (self.size_in_bytes / self.stride_in_bytes) as u32
    }
}

/// GPU-resident vertex data, immutable after upload.
pub struct VertexBuffer {
    buffer: wgpu::Buffer,
    view: VertexBufferView,
}

impl VertexBuffer {
    /// Copies `vertices` into a device-local buffer and blocks until the copy is done.
    ///
    /// The data goes through a staging buffer. The copy and the transition into
    /// the vertex-buffer state are recorded on `list`, submitted on `queue`, and
    /// awaited on `fence` before the staging buffer is released.
    pub fn upload(
        gpu: &GpuDevice,
        queue: &mut CommandQueue,
        fence: &mut Fence,
        allocator: &mut CommandAllocator,
        list: &mut CommandList,
        vertices: &[Vertex],
    ) -> Result<Self> {
        let bytes: &[u8] = bytemuck::cast_slice(vertices);
        let size = bytes.len() as u64;
        let device = gpu.device();

        let buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("trigon vertex buffer"),
            size,
            usage: wgpu::BufferUsages::VERTEX
                | wgpu::BufferUsages::COPY_DST
                | wgpu::BufferUsages::COPY_SRC,
            mapped_at_creation: false,
        });

        let upload = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("trigon vertex upload"),
            contents: bytes,
            usage: wgpu::BufferUsages::COPY_SRC,
        });

        allocator.reset(fence)?;
        list.reset(allocator)?;
        list.copy_buffer(ResourceId::VertexBuffer, ResourceId::UploadBuffer, size);
        list.transition(Barrier {
            resource: ResourceId::VertexBuffer,
            before: ResourceState::CopyDest,
            after: ResourceState::VertexAndConstantBuffer,
        });
        list.close()?;

        let resources = ResourceTable {
            vertex_buffer: Some(&buffer),
            upload_buffer: Some(&upload),
            ..Default::default()
        };
        let value = queue.execute(gpu, list, &resources, fence)?;
        allocator.mark_submitted(value);

        // The staging buffer must outlive the copy.
        fence.wait(gpu, value)?;
        drop(upload);

        log::debug!("uploaded {} vertices ({size} bytes)", vertices.len());

        Ok(Self {
            buffer,
            view: VertexBufferView {
                size_in_bytes: size,
                stride_in_bytes: Vertex::STRIDE,
            },
        })
    }

    #[inline]
    pub fn view(&self) -> VertexBufferView {
        self.view
    }

    #[inline]
    pub fn raw(&self) -> &wgpu::Buffer {
        &self.buffer
    }

    #[inline]
    pub fn vertex_count(&self) -> u32 {
        self.view.vertex_count()
    }

    /// Copies the buffer contents back to the CPU. Blocks until done.
    pub fn read_back(&self, gpu: &GpuDevice, queue: &CommandQueue) -> Result<Vec<u8>> {
        let device = gpu.device();
        let size = self.view.size_in_bytes;

        let staging = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("trigon vertex readback"),
            size,
            usage: wgpu::BufferUsages::MAP_READ | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        let mut encoder = device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
            label: Some("trigon vertex readback"),
        });
        encoder.copy_buffer_to_buffer(&self.buffer, 0, &staging, 0, size);
        let submission = queue.raw().submit(std::iter::once(encoder.finish()));

        let slice = staging.slice(..);
        let (tx, rx) = std::sync::mpsc::channel();
        slice.map_async(wgpu::MapMode::Read, move |result| {
            let _ = tx.send(result);
        });

        device
            .poll(wgpu::PollType::Wait {
                submission_index: Some(submission),
                timeout: None,
            })
            .map_err(|e| anyhow!("device poll failed: {e:?}"))?;

        rx.recv()
            .context("readback callback dropped")?
            .context("failed to map readback buffer")?;

        let bytes = {
            let mapped = slice.get_mapped_range();
            mapped.to_vec()
        };
        staging.unmap();
        Ok(bytes)
    }
}
