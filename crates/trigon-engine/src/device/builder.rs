//! Staged renderer initialization.
//!
//! Each stage owns everything created so far and exposes only the next step,
//! so the order of initialization is fixed by the types. Every step returns
//! [`InitError`] tagged with the stage that failed.

use anyhow::Context;
use raw_window_handle::{HasDisplayHandle, HasWindowHandle};

use crate::command::{CommandAllocator, CommandList};
use crate::coords::Extent;
use crate::pipeline::{
    shader_capabilities, PipelineState, RootSignature, ShaderModules, ShaderPair, VertexBuffer,
    TRIANGLE_VERTICES,
};

use super::error::StageExt;
use super::{
    CommandQueue, DescriptorHeap, Fence, FrameRenderer, GpuDevice, InitError, InitStage,
    RendererInit, SwapChain,
};

/// Entry point of initialization. Call [`build`](Self::build) to run every
/// step, or walk the stages one by one starting at [`create_device`](Self::create_device).
pub struct RendererBuilder<'w> {
    init: RendererInit,
    extent: Extent,
    target: Option<wgpu::SurfaceTarget<'w>>,
}

impl<'w> RendererBuilder<'w> {
    /// Renders into `window`. The renderer borrows it for `'w`.
    pub fn for_window<W>(window: W, extent: Extent, init: RendererInit) -> Self
    where
        W: HasWindowHandle + HasDisplayHandle + Send + Sync + 'w,
    {
        Self {
            init,
            extent,
            target: Some(wgpu::SurfaceTarget::from(window)),
        }
    }

    /// Renders into two offscreen textures instead of a window.
    pub fn offscreen(extent: Extent, init: RendererInit) -> Self {
        Self {
            init,
            extent,
            target: None,
        }
    }

    /// Runs all ten initialization steps in order.
    pub fn build(self) -> Result<FrameRenderer<'w>, InitError> {
        self.create_device()?
            .create_command_queue()?
            .create_fence()?
            .create_swap_chain()?
            .create_descriptor_heaps()?
            .load_shaders()?
            .create_root_signature()?
            .create_pipeline_state()?
            .create_command_list()?
            .upload_vertex_buffer()
    }

    /// Step 1: instance, adapter, logical device.
    ///
    /// The window surface is created here so the adapter can be checked
    /// against it; it is configured later by the swap-chain step.
    pub fn create_device(self) -> Result<DeviceStage<'w>, InitError> {
        let stage = InitStage::Device;
        log::debug!("init: {stage}");

        let instance = GpuDevice::create_instance(&self.init);
        let surface = self
            .target
            .map(|t| instance.create_surface(t).context("failed to create window surface"))
            .transpose()
            .stage(stage)?;

        let (gpu, queue) =
            pollster::block_on(GpuDevice::request(instance, surface.as_ref(), &self.init))
                .stage(stage)?;

        Ok(DeviceStage {
            init: self.init,
            extent: self.extent,
            surface,
            gpu,
            queue,
        })
    }
}

pub struct DeviceStage<'w> {
    init: RendererInit,
    extent: Extent,
    surface: Option<wgpu::Surface<'w>>,
    gpu: GpuDevice,
    queue: wgpu::Queue,
}

impl<'w> DeviceStage<'w> {
    #[inline]
    pub fn gpu(&self) -> &GpuDevice {
        &self.gpu
    }

    /// Step 2.
    pub fn create_command_queue(self) -> Result<QueueStage<'w>, InitError> {
        log::debug!("init: {}", InitStage::CommandQueue);

        Ok(QueueStage {
            init: self.init,
            extent: self.extent,
            surface: self.surface,
            gpu: self.gpu,
            queue: CommandQueue::new(self.queue),
        })
    }
}

pub struct QueueStage<'w> {
    init: RendererInit,
    extent: Extent,
    surface: Option<wgpu::Surface<'w>>,
    gpu: GpuDevice,
    queue: CommandQueue,
}

impl<'w> QueueStage<'w> {
    /// Step 3. The fence starts at zero.
    pub fn create_fence(self) -> Result<FenceStage<'w>, InitError> {
        log::debug!("init: {}", InitStage::Fence);

        Ok(FenceStage {
            init: self.init,
            extent: self.extent,
            surface: self.surface,
            gpu: self.gpu,
            queue: self.queue,
            fence: Fence::new(0),
        })
    }
}

pub struct FenceStage<'w> {
    init: RendererInit,
    extent: Extent,
    surface: Option<wgpu::Surface<'w>>,
    gpu: GpuDevice,
    queue: CommandQueue,
    fence: Fence,
}

impl<'w> FenceStage<'w> {
    #[inline]
    pub fn fence(&self) -> &Fence {
        &self.fence
    }

    /// Step 4: two back buffers at the requested extent.
    pub fn create_swap_chain(self) -> Result<SwapChainStage<'w>, InitError> {
        let stage = InitStage::SwapChain;
        log::debug!("init: {stage}");

        let swap_chain = match self.surface {
            Some(surface) => SwapChain::for_surface(surface, &self.gpu, &self.init, self.extent),
            None => SwapChain::offscreen(&self.gpu, &self.init, self.extent),
        }
        .stage(stage)?;

        Ok(SwapChainStage {
            base: Base {
                init: self.init,
                gpu: self.gpu,
                queue: self.queue,
                fence: self.fence,
                swap_chain,
            },
        })
    }
}

/// Objects every later stage carries along unchanged.
struct Base<'w> {
    init: RendererInit,
    gpu: GpuDevice,
    queue: CommandQueue,
    fence: Fence,
    swap_chain: SwapChain<'w>,
}

pub struct SwapChainStage<'w> {
    base: Base<'w>,
}

impl<'w> SwapChainStage<'w> {
    #[inline]
    pub fn swap_chain(&self) -> &SwapChain<'w> {
        &self.base.swap_chain
    }

    /// Step 5: one render-target descriptor per back buffer.
    pub fn create_descriptor_heaps(self) -> Result<HeapStage<'w>, InitError> {
        let stage = InitStage::DescriptorHeaps;
        log::debug!("init: {stage}");

        let format = self.base.swap_chain.format();
        let renderable = format
            .guaranteed_format_features(self.base.gpu.device().features())
            .allowed_usages
            .contains(wgpu::TextureUsages::RENDER_ATTACHMENT);
        if !renderable {
            return Err(InitError::new(
                stage,
                anyhow::anyhow!("back buffer format {format:?} cannot be a render target"),
            ));
        }

        Ok(HeapStage {
            base: self.base,
            rtv_heap: DescriptorHeap::new(format),
        })
    }
}

pub struct HeapStage<'w> {
    base: Base<'w>,
    rtv_heap: DescriptorHeap,
}

impl<'w> HeapStage<'w> {
    /// Step 6: read and compile `vertex.wgsl` and `pixel.wgsl`.
    ///
    /// Sources are validated against what the device supports before wgpu
    /// sees them.
    pub fn load_shaders(self) -> Result<ShaderStage<'w>, InitError> {
        let stage = InitStage::Shaders;
        let dir = &self.base.init.shader_dir;
        log::debug!("init: {stage} from {}", dir.display());

        let caps = shader_capabilities(self.base.gpu.device().features());
        let pair = ShaderPair::load(dir, caps).stage(stage)?;
        let shaders = ShaderModules::create(&self.base.gpu, &pair).stage(stage)?;

        Ok(ShaderStage {
            base: self.base,
            rtv_heap: self.rtv_heap,
            shaders,
        })
    }
}

pub struct ShaderStage<'w> {
    base: Base<'w>,
    rtv_heap: DescriptorHeap,
    shaders: ShaderModules,
}

impl<'w> ShaderStage<'w> {
    /// Step 7: empty binding layout.
    pub fn create_root_signature(self) -> Result<RootSignatureStage<'w>, InitError> {
        let stage = InitStage::RootSignature;
        log::debug!("init: {stage}");

        let root_signature = RootSignature::new(&self.base.gpu).stage(stage)?;

        Ok(RootSignatureStage {
            base: self.base,
            rtv_heap: self.rtv_heap,
            shaders: self.shaders,
            root_signature,
        })
    }
}

pub struct RootSignatureStage<'w> {
    base: Base<'w>,
    rtv_heap: DescriptorHeap,
    shaders: ShaderModules,
    root_signature: RootSignature,
}

impl<'w> RootSignatureStage<'w> {
    /// Step 8. Shader modules are released once the pipeline holds them.
    pub fn create_pipeline_state(self) -> Result<PipelineStage<'w>, InitError> {
        let stage = InitStage::PipelineState;
        log::debug!("init: {stage}");

        let pipeline = PipelineState::new(
            &self.base.gpu,
            &self.root_signature,
            &self.shaders,
            self.base.swap_chain.format(),
        )
        .stage(stage)?;

        Ok(PipelineStage {
            base: self.base,
            rtv_heap: self.rtv_heap,
            root_signature: self.root_signature,
            pipeline,
        })
    }
}

pub struct PipelineStage<'w> {
    base: Base<'w>,
    rtv_heap: DescriptorHeap,
    root_signature: RootSignature,
    pipeline: PipelineState,
}

impl<'w> PipelineStage<'w> {
    /// Step 9: allocator and a closed command list.
    pub fn create_command_list(self) -> Result<CommandListStage<'w>, InitError> {
        log::debug!("init: {}", InitStage::CommandList);

        Ok(CommandListStage {
            base: self.base,
            rtv_heap: self.rtv_heap,
            root_signature: self.root_signature,
            pipeline: self.pipeline,
            allocator: CommandAllocator::new(),
            list: CommandList::new_closed(),
        })
    }
}

pub struct CommandListStage<'w> {
    base: Base<'w>,
    rtv_heap: DescriptorHeap,
    root_signature: RootSignature,
    pipeline: PipelineState,
    allocator: CommandAllocator,
    list: CommandList,
}

impl<'w> CommandListStage<'w> {
    /// Step 10: upload the triangle and wait for it. Yields the renderer.
    pub fn upload_vertex_buffer(self) -> Result<FrameRenderer<'w>, InitError> {
        let stage = InitStage::VertexUpload;
        log::debug!("init: {stage}");

        let Self {
            base:
                Base {
                    init,
                    gpu,
                    mut queue,
                    mut fence,
                    swap_chain,
                },
            rtv_heap,
            root_signature,
            pipeline,
            mut allocator,
            mut list,
        } = self;

        let vertex_buffer = VertexBuffer::upload(
            &gpu,
            &mut queue,
            &mut fence,
            &mut allocator,
            &mut list,
            &TRIANGLE_VERTICES,
        )
        .stage(stage)?;

        log::info!(
            "renderer ready: {} {:?}",
            swap_chain.extent(),
            swap_chain.format()
        );

        Ok(FrameRenderer {
            gpu,
            queue,
            fence,
            swap_chain,
            rtv_heap,
            root_signature,
            pipeline,
            allocator,
            list,
            vertex_buffer,
            clear_color: init.clear_color,
            frames: 0,
        })
    }
}
