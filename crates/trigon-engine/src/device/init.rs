use std::path::PathBuf;

/// Directory holding `vertex.wgsl` and `pixel.wgsl` unless overridden.
pub const DEFAULT_SHADER_DIR: &str = concat!(env!("CARGO_MANIFEST_DIR"), "/shaders");

/// Initialization parameters for the renderer.
///
/// Keep this structure small. Add fields only when a concrete platform or
/// backend requirement exists.
#[derive(Debug, Clone)]
pub struct RendererInit {
    /// Backends wgpu may pick an adapter from.
    pub backends: wgpu::Backends,

    /// Per-backend instance options. The noop backend is enabled here.
    pub backend_options: wgpu::BackendOptions,

    pub power_preference: wgpu::PowerPreference,

    /// Force a software adapter (WARP, lavapipe, ...).
    pub force_fallback_adapter: bool,

    /// Surface formats in order of preference. The first supported one wins;
    /// if none is supported, the surface's preferred format is used.
    pub preferred_formats: Vec<wgpu::TextureFormat>,

    /// Vertical sync interval. `0` presents immediately, anything else waits
    /// for the display refresh.
    pub sync_interval: u32,

    /// Limits requested from the adapter/device.
    ///
    /// Downlevel defaults are enough for a single triangle and keep software
    /// adapters usable.
    pub required_limits: wgpu::Limits,

    /// Directory containing the vertex and pixel shader sources.
    pub shader_dir: PathBuf,

    /// Color the back buffer is cleared to every frame.
    pub clear_color: wgpu::Color,
}

impl Default for RendererInit {
    fn default() -> Self {
        Self {
            backends: wgpu::Backends::PRIMARY,
            backend_options: wgpu::BackendOptions::default(),
            power_preference: wgpu::PowerPreference::HighPerformance,
            force_fallback_adapter: false,
            preferred_formats: vec![
                wgpu::TextureFormat::Rgba8Unorm,
                wgpu::TextureFormat::Bgra8Unorm,
            ],
            sync_interval: 1,
            required_limits: wgpu::Limits::downlevel_defaults(),
            shader_dir: PathBuf::from(DEFAULT_SHADER_DIR),
            clear_color: wgpu::Color {
                r: 0.0,
                g: 0.2,
                b: 0.4,
                a: 1.0,
            },
        }
    }
}

impl RendererInit {
    /// Present mode implied by `sync_interval`.
    pub fn present_mode(&self) -> wgpu::PresentMode {
        if self.sync_interval == 0 {
            wgpu::PresentMode::AutoNoVsync
        } else {
            wgpu::PresentMode::Fifo
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_use_vsync() {
        let init = RendererInit::default();
        assert_eq!(init.sync_interval, 1);
        assert_eq!(init.present_mode(), wgpu::PresentMode::Fifo);
    }

    #[test]
    fn zero_interval_disables_vsync() {
        let init = RendererInit {
            sync_interval: 0,
            ..Default::default()
        };
        assert_eq!(init.present_mode(), wgpu::PresentMode::AutoNoVsync);
    }

    #[test]
    fn default_shader_dir_has_both_stages() {
        let dir = RendererInit::default().shader_dir;
        assert!(dir.join("vertex.wgsl").is_file());
        assert!(dir.join("pixel.wgsl").is_file());
    }
}
