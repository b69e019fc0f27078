//! GPU device, swap chain, and the frame renderer.
//!
//! This module is responsible for:
//! - creating the wgpu instance/adapter/device and the command queue
//! - the fence that paces the CPU against the GPU
//! - the double-buffered swap chain and its render-target descriptors
//! - staged initialization ([`RendererBuilder`]) and per-frame rendering ([`FrameRenderer`])

mod back_buffer;
mod builder;
mod descriptor;
mod error;
mod fence;
mod frame;
mod gpu;
mod init;
mod queue;
mod surface;

pub use back_buffer::{BackBufferIndex, BackBufferStates, BackBuffers, FRAME_COUNT};
pub use builder::{
    CommandListStage, DeviceStage, FenceStage, HeapStage, PipelineStage, QueueStage,
    RendererBuilder, RootSignatureStage, ShaderStage, SwapChainStage,
};
pub use descriptor::{DescriptorHeap, RenderTargetDescriptor, RtvHandle};
pub use error::{FrameError, InitError, InitStage, ValidationError, WaitError};
pub use fence::{Fence, FenceValue};
pub use frame::{record_frame, FrameParams, FrameRenderer, FrameReport, ResourceCounts};
pub use gpu::GpuDevice;
pub use init::{RendererInit, DEFAULT_SHADER_DIR};
pub use queue::CommandQueue;
pub use surface::{AcquiredBuffer, SwapChain};
