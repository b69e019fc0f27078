use anyhow::{Context, Result};

use super::{RendererInit, ValidationError};

/// Owns the adapter and logical device.
///
/// Every other GPU object is created from this device; it is dropped last.
pub struct GpuDevice {
    /// Selected adapter.
    adapter: wgpu::Adapter,

    /// Logical device.
    device: wgpu::Device,
}

impl GpuDevice {
    /// Creates the wgpu instance for the configured backends.
    pub(crate) fn create_instance(init: &RendererInit) -> wgpu::Instance {
        wgpu::Instance::new(&wgpu::InstanceDescriptor {
            backends: init.backends,
            backend_options: init.backend_options.clone(),
            ..Default::default()
        })
    }

    /// Selects an adapter and opens a device on it.
    ///
    /// Adapter/device acquisition is asynchronous under wgpu. The queue is
    /// returned separately so the caller can wrap it as its own stage.
    pub(crate) async fn request(
        instance: wgpu::Instance,
        compatible_surface: Option<&wgpu::Surface<'_>>,
        init: &RendererInit,
    ) -> Result<(Self, wgpu::Queue)> {
        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: init.power_preference,
                compatible_surface,
                force_fallback_adapter: init.force_fallback_adapter,
            })
            .await
            .context("failed to find a suitable GPU adapter")?;

        let info = adapter.get_info();
        log::info!("using adapter {:?} ({:?})", info.name, info.backend);

        let (device, queue) = adapter
            .request_device(&wgpu::DeviceDescriptor {
                label: Some("trigon device"),
                required_features: wgpu::Features::empty(),
                required_limits: init.required_limits.clone().using_resolution(adapter.limits()),
                experimental_features: wgpu::ExperimentalFeatures::disabled(),
                memory_hints: wgpu::MemoryHints::Performance,
                trace: wgpu::Trace::Off,
            })
            .await
            .context("failed to create wgpu device/queue")?;

        Ok((
            Self { adapter, device },
            queue,
        ))
    }

    pub fn adapter(&self) -> &wgpu::Adapter {
        &self.adapter
    }

    /// Returns a reference to the logical device.
    pub fn device(&self) -> &wgpu::Device {
        &self.device
    }

    /// Runs `create` inside a validation error scope.
    ///
    /// wgpu reports invalid descriptors through the device error sink, which
    /// panics when nothing captures them. The first error raised while
    /// `create` runs is returned instead.
    pub(crate) fn validated<T>(
        &self,
        create: impl FnOnce(&wgpu::Device) -> T,
    ) -> Result<T, ValidationError> {
        let scope = self.device.push_error_scope(wgpu::ErrorFilter::Validation);
        let value = create(&self.device);
        match pollster::block_on(scope.pop()) {
            Some(err) => Err(ValidationError(err.to_string())),
            None => Ok(value),
        }
    }
}

#[cfg(test)]
pub(crate) mod test_device {
    use super::*;

    /// Device on wgpu's noop backend. Needs no GPU.
    pub(crate) fn noop() -> (GpuDevice, wgpu::Queue) {
        let init = RendererInit {
            backends: wgpu::Backends::NOOP,
            backend_options: wgpu::BackendOptions {
                noop: wgpu::NoopBackendOptions { enable: true },
                ..Default::default()
            },
            ..Default::default()
        };
        let instance = GpuDevice::create_instance(&init);
        pollster::block_on(GpuDevice::request(instance, None, &init)).unwrap()
    }

    #[test]
    fn invalid_buffer_is_captured() {
        let (gpu, _queue) = noop();
        let err = gpu
            .validated(|device| {
                device.create_buffer(&wgpu::BufferDescriptor {
                    label: Some("unaligned mapped buffer"),
                    size: 3,
                    usage: wgpu::BufferUsages::VERTEX,
                    mapped_at_creation: true,
                })
            })
            .map(|_| ())
            .unwrap_err();
        assert!(!err.0.is_empty());
    }

    #[test]
    fn valid_creation_passes_through() {
        let (gpu, _queue) = noop();
        let buffer = gpu
            .validated(|device| {
                device.create_buffer(&wgpu::BufferDescriptor {
                    label: None,
                    size: 16,
                    usage: wgpu::BufferUsages::VERTEX,
                    mapped_at_creation: false,
                })
            })
            .unwrap();
        assert_eq!(buffer.size(), 16);
    }
}
