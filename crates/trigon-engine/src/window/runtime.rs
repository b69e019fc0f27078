use anyhow::{Context, Result};
use ouroboros::self_referencing;

use winit::application::ApplicationHandler;
use winit::dpi::LogicalSize;
use winit::event::WindowEvent;
use winit::event_loop::{ActiveEventLoop, ControlFlow, EventLoop};
use winit::window::{Window, WindowId};

use crate::coords::Extent;
use crate::device::{FrameError, FrameRenderer, RendererBuilder, RendererInit};

/// Window/runtime configuration.
#[derive(Debug, Clone)]
pub struct RuntimeConfig {
    pub title: String,
    pub initial_size: LogicalSize<f64>,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            title: "trigon".to_string(),
            initial_size: LogicalSize::new(1280.0, 720.0),
        }
    }
}

/// Entry point for the runtime.
pub struct Runtime;

impl Runtime {
    /// Opens the window and renders until it is closed.
    ///
    /// A renderer initialization failure ends the loop and is returned as an
    /// [`InitError`](crate::device::InitError) inside the `anyhow::Error`.
    pub fn run(config: RuntimeConfig, init: RendererInit) -> Result<()> {
        let event_loop = EventLoop::new().context("failed to create winit EventLoop")?;
        let mut state = AppState::new(config, init);

        event_loop
            .run_app(&mut state)
            .context("winit event loop terminated with error")?;

        match state.fatal.take() {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }
}

#[self_referencing]
struct WindowEntry {
    window: Window,

    #[borrows(window)]
    #[covariant]
    renderer: FrameRenderer<'this>,
}

struct AppState {
    config: RuntimeConfig,
    init: RendererInit,

    window: Option<WindowEntry>,
    fatal: Option<anyhow::Error>,
}

impl AppState {
    fn new(config: RuntimeConfig, init: RendererInit) -> Self {
        Self {
            config,
            init,
            window: None,
            fatal: None,
        }
    }

    fn create_window_entry(&mut self, event_loop: &ActiveEventLoop) -> Result<WindowId> {
        let attrs = Window::default_attributes()
            .with_title(self.config.title.clone())
            .with_inner_size(self.config.initial_size);

        let window = event_loop
            .create_window(attrs)
            .context("failed to create window")?;

        let id = window.id();
        let extent = Extent::from(window.inner_size());
        let init = self.init.clone();

        let entry = WindowEntryTryBuilder {
            window,
            renderer_builder: |w| RendererBuilder::for_window(w, extent, init).build(),
        }
        .try_build()?;

        self.window = Some(entry);
        Ok(id)
    }

    fn fail(&mut self, event_loop: &ActiveEventLoop, err: anyhow::Error) {
        log::error!("{err:#}");
        self.fatal = Some(err);
        self.window = None;
        event_loop.exit();
    }

    fn close(&mut self, event_loop: &ActiveEventLoop) {
        // Dropping the renderer drains the GPU before the window goes away.
        self.window = None;
        event_loop.exit();
    }
}

impl ApplicationHandler for AppState {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.window.is_some() || self.fatal.is_some() {
            return;
        }

        match self.create_window_entry(event_loop) {
            Ok(id) => log::debug!("window {id:?} ready"),
            Err(e) => self.fail(event_loop, e),
        }

        if let Some(entry) = &self.window {
            entry.with_window(|w| w.request_redraw());
        }
    }

    fn about_to_wait(&mut self, event_loop: &ActiveEventLoop) {
        event_loop.set_control_flow(ControlFlow::Wait);

        // Continuous redraw.
        if let Some(entry) = &self.window {
            entry.with_window(|w| w.request_redraw());
        }
    }

    fn window_event(
        &mut self,
        event_loop: &ActiveEventLoop,
        window_id: WindowId,
        event: WindowEvent,
    ) {
        let Some(entry) = self.window.as_mut() else {
            return;
        };
        if entry.with_window(|w| w.id()) != window_id {
            return;
        }

        match event {
            WindowEvent::CloseRequested => self.close(event_loop),

            WindowEvent::Resized(size) => {
                resize(entry, Extent::from(size));
            }

            WindowEvent::ScaleFactorChanged { .. } => {
                let size = entry.with_window(|w| w.inner_size());
                resize(entry, Extent::from(size));
            }

            WindowEvent::RedrawRequested => {
                match entry.with_renderer_mut(|r| r.render()) {
                    Ok(report) => log::trace!(
                        "frame {} presented from back buffer {}",
                        report.frame_number,
                        report.back_buffer
                    ),
                    // Minimized; skipped quietly until the window is restored.
                    Err(FrameError::ZeroExtent) => log::debug!("skipping frame: zero-sized window"),
                    Err(e) => log::warn!("skipping frame: {e}"),
                }
            }

            _ => {}
        }
    }
}

fn resize(entry: &mut WindowEntry, extent: Extent) {
    if let Err(e) = entry.with_renderer_mut(|r| r.resize(extent)) {
        log::warn!("resize to {extent} failed: {e}");
    }
    entry.with_window(|w| w.request_redraw());
}
