use anyhow::{Context, Result};

use crate::coords::Extent;

use super::{
    BackBufferIndex, BackBufferStates, BackBuffers, DescriptorHeap, FrameError, GpuDevice,
    RendererInit, FRAME_COUNT,
};

enum Target<'w> {
    /// Presentable surface bound to a native window.
    Window {
        surface: wgpu::Surface<'w>,
        config: wgpu::SurfaceConfiguration,
    },
    /// Two plain textures standing in for a window; presenting only rotates.
    Offscreen { textures: BackBuffers<wgpu::Texture> },
}

/// Back buffer handed out for one frame.
///
/// Holding a window surface texture blocks acquisition of the next one, so this
/// must be presented or dropped before the next frame begins.
pub struct AcquiredBuffer {
    index: BackBufferIndex,
    texture: wgpu::Texture,
    surface_texture: Option<wgpu::SurfaceTexture>,
}

impl AcquiredBuffer {
    #[inline]
    pub fn index(&self) -> BackBufferIndex {
        self.index
    }
}

/// Rotating pair of presentable back buffers.
///
/// Tracks which buffer is current and the usage state of each buffer. The
/// current index advances by one on every successful present.
pub struct SwapChain<'w> {
    target: Target<'w>,
    format: wgpu::TextureFormat,
    extent: Extent,
    current: BackBufferIndex,
    states: BackBufferStates,
    presents: u64,
}

impl<'w> SwapChain<'w> {
    /// Configures a window surface with `FRAME_COUNT` buffers.
    pub(crate) fn for_surface(
        surface: wgpu::Surface<'w>,
        gpu: &GpuDevice,
        init: &RendererInit,
        extent: Extent,
    ) -> Result<Self> {
        anyhow::ensure!(!extent.is_zero(), "window has zero size ({extent})");

        let caps = surface.get_capabilities(gpu.adapter());
        let format = choose_surface_format(&caps, &init.preferred_formats)
            .context("no supported surface formats")?;
        let present_mode = choose_present_mode(&caps, init.present_mode());
        let alpha_mode = caps
            .alpha_modes
            .first()
            .copied()
            .unwrap_or(wgpu::CompositeAlphaMode::Auto);

        let config = wgpu::SurfaceConfiguration {
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            format,
            width: extent.width,
            height: extent.height,
            present_mode,
            alpha_mode,
            view_formats: vec![],
            desired_maximum_frame_latency: FRAME_COUNT as u32,
        };
        surface.configure(gpu.device(), &config);

        log::debug!("swap chain {extent} {format:?} {present_mode:?}");

        Ok(Self::with_target(
            Target::Window { surface, config },
            format,
            extent,
        ))
    }

    /// Creates an offscreen swap chain backed by two textures.
    pub(crate) fn offscreen(gpu: &GpuDevice, init: &RendererInit, extent: Extent) -> Result<Self> {
        anyhow::ensure!(!extent.is_zero(), "offscreen target has zero size ({extent})");

        let format = init
            .preferred_formats
            .first()
            .copied()
            .unwrap_or(wgpu::TextureFormat::Rgba8Unorm);
        let textures = create_offscreen_textures(gpu.device(), format, extent);

        log::debug!("offscreen swap chain {extent} {format:?}");

        Ok(Self::with_target(Target::Offscreen { textures }, format, extent))
    }

    fn with_target(target: Target<'w>, format: wgpu::TextureFormat, extent: Extent) -> Self {
        Self {
            target,
            format,
            extent,
            current: BackBufferIndex::FIRST,
            states: BackBufferStates::new(),
            presents: 0,
        }
    }

    #[inline]
    pub fn format(&self) -> wgpu::TextureFormat {
        self.format
    }

    #[inline]
    pub fn extent(&self) -> Extent {
        self.extent
    }

    /// Index of the buffer the next frame renders into.
    #[inline]
    pub fn current_index(&self) -> BackBufferIndex {
        self.current
    }

    #[inline]
    pub fn states(&self) -> &BackBufferStates {
        &self.states
    }

    #[inline]
    pub(crate) fn states_mut(&mut self) -> &mut BackBufferStates {
        &mut self.states
    }

    /// Number of successful presents.
    #[inline]
    pub fn presents(&self) -> u64 {
        self.presents
    }

    /// Acquires the current back buffer.
    ///
    /// Lost or outdated surfaces are reconfigured before the error is returned;
    /// the frame is skipped either way.
    pub(crate) fn acquire(&mut self, gpu: &GpuDevice) -> Result<AcquiredBuffer, FrameError> {
        if self.extent.is_zero() {
            return Err(FrameError::ZeroExtent);
        }

        match &self.target {
            Target::Window { surface, config } => match surface.get_current_texture() {
                Ok(surface_texture) => {
                    if surface_texture.suboptimal {
                        log::debug!("surface texture is suboptimal");
                    }
                    Ok(AcquiredBuffer {
                        index: self.current,
                        texture: surface_texture.texture.clone(),
                        surface_texture: Some(surface_texture),
                    })
                }
                Err(err) => {
                    if matches!(err, wgpu::SurfaceError::Lost | wgpu::SurfaceError::Outdated) {
                        surface.configure(gpu.device(), config);
                        self.current = BackBufferIndex::FIRST;
                        self.states.reset();
                    }
                    Err(err.into())
                }
            },
            Target::Offscreen { textures } => Ok(AcquiredBuffer {
                index: self.current,
                texture: textures[self.current].clone(),
                surface_texture: None,
            }),
        }
    }

    /// Creates the render-target view for an acquired buffer.
    pub(crate) fn create_view(
        &self,
        buffer: &AcquiredBuffer,
        heap: &DescriptorHeap,
    ) -> wgpu::TextureView {
        buffer
            .texture
            .create_view(&heap.view_descriptor(heap.handle(buffer.index)))
    }

    /// Presents an acquired buffer and advances the current index.
    ///
    /// The buffer must be back in the present state.
    pub(crate) fn present(&mut self, buffer: AcquiredBuffer) -> Result<(), FrameError> {
        self.states.ensure_presentable(buffer.index)?;

        if let Some(surface_texture) = buffer.surface_texture {
            surface_texture.present();
        }

        self.current = self.current.next();
        self.presents += 1;
        Ok(())
    }

    /// Resizes every back buffer.
    ///
    /// The caller must ensure the GPU is idle. A zero extent is stored but not
    /// applied; frames fail with [`FrameError::ZeroExtent`] until a real size arrives.
    pub(crate) fn resize(&mut self, gpu: &GpuDevice, extent: Extent) {
        self.extent = extent;
        self.current = BackBufferIndex::FIRST;
        self.states.reset();

        if extent.is_zero() {
            return;
        }

        match &mut self.target {
            Target::Window { surface, config } => {
                config.width = extent.width;
                config.height = extent.height;
                surface.configure(gpu.device(), config);
            }
            Target::Offscreen { textures } => {
                *textures = create_offscreen_textures(gpu.device(), self.format, extent);
            }
        }
    }
}

fn create_offscreen_textures(
    device: &wgpu::Device,
    format: wgpu::TextureFormat,
    extent: Extent,
) -> BackBuffers<wgpu::Texture> {
    BackBuffers::from_fn(|i| {
        device.create_texture(&wgpu::TextureDescriptor {
            label: Some(&format!("trigon offscreen back buffer {i}")),
            size: wgpu::Extent3d {
                width: extent.width,
                height: extent.height,
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format,
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT | wgpu::TextureUsages::COPY_SRC,
            view_formats: &[],
        })
    })
}

pub(crate) fn choose_surface_format(
    caps: &wgpu::SurfaceCapabilities,
    preferred: &[wgpu::TextureFormat],
) -> Option<wgpu::TextureFormat> {
    if caps.formats.is_empty() {
        return None;
    }

    preferred
        .iter()
        .copied()
        .find(|f| caps.formats.contains(f))
        .or_else(|| caps.formats.first().copied())
}

/// Auto modes are resolved by wgpu itself. FIFO is always supported, so it is the fallback.
pub(crate) fn choose_present_mode(
    caps: &wgpu::SurfaceCapabilities,
    requested: wgpu::PresentMode,
) -> wgpu::PresentMode {
    let auto = matches!(
        requested,
        wgpu::PresentMode::AutoVsync | wgpu::PresentMode::AutoNoVsync
    );
    if auto || caps.present_modes.contains(&requested) {
        requested
    } else {
        wgpu::PresentMode::Fifo
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn caps(formats: &[wgpu::TextureFormat], modes: &[wgpu::PresentMode]) -> wgpu::SurfaceCapabilities {
        wgpu::SurfaceCapabilities {
            formats: formats.to_vec(),
            present_modes: modes.to_vec(),
            ..Default::default()
        }
    }

    #[test]
    fn picks_first_preferred_supported_format() {
        use wgpu::TextureFormat::*;
        let c = caps(&[Bgra8UnormSrgb, Bgra8Unorm, Rgba8Unorm], &[]);
        assert_eq!(choose_surface_format(&c, &[Rgba8Unorm, Bgra8Unorm]), Some(Rgba8Unorm));
        assert_eq!(choose_surface_format(&c, &[Rgba16Float, Bgra8Unorm]), Some(Bgra8Unorm));
    }

    #[test]
    fn falls_back_to_surface_format() {
        use wgpu::TextureFormat::*;
        let c = caps(&[Bgra8UnormSrgb], &[]);
        assert_eq!(choose_surface_format(&c, &[Rgba8Unorm]), Some(Bgra8UnormSrgb));
        assert_eq!(choose_surface_format(&caps(&[], &[]), &[Rgba8Unorm]), None);
    }

    #[test]
    fn unsupported_present_mode_falls_back_to_fifo() {
        use wgpu::PresentMode::*;
        let c = caps(&[], &[Fifo, Mailbox]);
        assert_eq!(choose_present_mode(&c, Mailbox), Mailbox);
        assert_eq!(choose_present_mode(&c, Immediate), Fifo);
        assert_eq!(choose_present_mode(&c, AutoNoVsync), AutoNoVsync);
    }
}
