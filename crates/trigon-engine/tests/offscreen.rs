//! End-to-end checks rendering into offscreen back buffers.
//!
//! Renderers run on wgpu's noop backend, so every test runs without a GPU.

use std::path::{Path, PathBuf};

use trigon_engine::command::ResourceState;
use trigon_engine::coords::{Extent, LEGACY_VIEWPORT};
use trigon_engine::device::{
    BackBufferIndex, DEFAULT_SHADER_DIR, FRAME_COUNT, FrameError, FrameRenderer, InitError,
    InitStage, RendererBuilder, RendererInit,
};
use trigon_engine::pipeline::TRIANGLE_VERTICES;

const EXTENT: Extent = Extent::new(1280, 720);

fn noop_init() -> RendererInit {
    RendererInit {
        backends: wgpu::Backends::NOOP,
        backend_options: wgpu::BackendOptions {
            noop: wgpu::NoopBackendOptions { enable: true },
            ..Default::default()
        },
        ..Default::default()
    }
}

fn renderer() -> FrameRenderer<'static> {
    RendererBuilder::offscreen(EXTENT, noop_init())
        .build()
        .unwrap_or_else(|e| panic!("renderer initialization failed: {e}"))
}

fn build_err(init: RendererInit) -> InitError {
    match RendererBuilder::offscreen(EXTENT, init).build() {
        Ok(_) => panic!("renderer built from invalid input"),
        Err(e) => e,
    }
}

/// Shader directory with the bundled vertex stage and `pixel` as the pixel stage.
fn with_pixel_shader(dir: &Path, pixel: &str) -> RendererInit {
    std::fs::copy(
        Path::new(DEFAULT_SHADER_DIR).join("vertex.wgsl"),
        dir.join("vertex.wgsl"),
    )
    .unwrap();
    std::fs::write(dir.join("pixel.wgsl"), pixel).unwrap();

    RendererInit {
        shader_dir: PathBuf::from(dir),
        ..noop_init()
    }
}

#[test]
fn hundred_frames_alternate_back_buffers() {
    let mut r = renderer();

    let first = r.render().unwrap();
    assert_eq!(first.back_buffer, BackBufferIndex::FIRST);
    let counts = r.resource_counts();
    assert_eq!(counts.descriptors, FRAME_COUNT);

    let mut previous = first;
    for _ in 1..100 {
        let report = r.render().unwrap();
        assert_eq!(report.back_buffer, previous.back_buffer.next());
        assert!(report.fence_value > previous.fence_value);
        assert_eq!(report.frame_number, previous.frame_number + 1);
        assert!(r.fence().completed_value() >= report.fence_value);
        assert_eq!(r.resource_counts(), counts);
        previous = report;
    }

    assert_eq!(r.frames(), 100);
    assert_eq!(r.swap_chain().presents(), 100);
    for i in BackBufferIndex::all() {
        assert_eq!(r.swap_chain().states().state(i), ResourceState::Present);
    }
}

#[test]
fn viewport_follows_the_swap_chain() {
    let r = renderer();
    assert_eq!(r.swap_chain().extent(), EXTENT);
    assert_ne!(r.swap_chain().extent(), LEGACY_VIEWPORT);
}

#[test]
fn uploaded_vertices_match_the_triangle() {
    let r = renderer();

    assert_eq!(r.vertex_buffer().vertex_count(), 3);
    let bytes = r.vertex_buffer().read_back(r.gpu(), r.queue()).unwrap();
    assert_eq!(bytes, bytemuck::cast_slice::<_, u8>(&TRIANGLE_VERTICES));
}

#[test]
fn missing_shaders_fail_at_the_shader_stage() {
    let dir = tempfile::tempdir().unwrap();
    let err = build_err(RendererInit {
        shader_dir: PathBuf::from(dir.path()),
        ..noop_init()
    });

    assert_eq!(err.stage, InitStage::Shaders);
    assert!(err.to_string().contains("shader"), "{err}");
}

#[test]
fn unsupported_shader_feature_fails_at_the_shader_stage() {
    let dir = tempfile::tempdir().unwrap();
    let init = with_pixel_shader(
        dir.path(),
        r#"
enable f16;

@fragment
fn main() -> @location(0) vec4<f32> {
    let half: f16 = 1.0h;
    return vec4<f32>(f32(half));
}
"#,
    );

    let err = build_err(init);
    assert_eq!(err.stage, InitStage::Shaders);
    assert!(err.to_string().contains("pixel shader"), "{err}");
}

#[test]
fn mismatched_stage_interface_fails_at_the_pipeline_stage() {
    let dir = tempfile::tempdir().unwrap();
    // The vertex stage never writes location 3.
    let init = with_pixel_shader(
        dir.path(),
        r#"
@fragment
fn main(@location(3) tint: vec4<f32>) -> @location(0) vec4<f32> {
    return tint;
}
"#,
    );

    let err = build_err(init);
    assert_eq!(err.stage, InitStage::PipelineState);
    assert!(err.to_string().contains("pipeline"), "{err}");
}

#[test]
fn resize_restarts_at_the_first_buffer() {
    let mut r = renderer();

    r.render().unwrap();
    assert_eq!(r.swap_chain().current_index().get(), 1);

    r.resize(Extent::new(640, 480)).unwrap();
    assert_eq!(r.swap_chain().extent(), Extent::new(640, 480));
    assert_eq!(r.swap_chain().current_index(), BackBufferIndex::FIRST);

    let report = r.render().unwrap();
    assert_eq!(report.back_buffer, BackBufferIndex::FIRST);
}

#[test]
fn zero_extent_skips_frames_until_restored() {
    let mut r = renderer();

    r.resize(Extent::new(0, 0)).unwrap();
    assert!(matches!(r.render(), Err(FrameError::ZeroExtent)));
    assert!(matches!(r.render(), Err(FrameError::ZeroExtent)));
    assert_eq!(r.frames(), 0);

    r.resize(EXTENT).unwrap();
    let report = r.render().unwrap();
    assert_eq!(report.frame_number, 1);
}
