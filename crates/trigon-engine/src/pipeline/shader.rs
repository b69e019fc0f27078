use std::borrow::Cow;
use std::path::{Path, PathBuf};

use anyhow::{anyhow, bail, Context, Result};
use naga::valid::Capabilities;

use crate::device::{GpuDevice, ValidationError};

use super::VERTEX_ATTRIBUTE_COUNT;

/// Entry function every stage must expose.
pub const ENTRY_POINT: &str = "main";

#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum ShaderKind {
    Vertex,
    Pixel,
}

impl ShaderKind {
    /// File name of this stage inside the shader directory.
    pub fn file_name(self) -> &'static str {
        match self {
            ShaderKind::Vertex => "vertex.wgsl",
            ShaderKind::Pixel => "pixel.wgsl",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            ShaderKind::Vertex => "vertex shader",
            ShaderKind::Pixel => "pixel shader",
        }
    }

    fn naga_stage(self) -> naga::ShaderStage {
        match self {
            ShaderKind::Vertex => naga::ShaderStage::Vertex,
            ShaderKind::Pixel => naga::ShaderStage::Fragment,
        }
    }
}

/// Shader capabilities a device with `features` accepts.
///
/// Validating against these instead of every capability naga knows keeps
/// shaders the device would reject out of wgpu.
pub fn shader_capabilities(features: wgpu::Features) -> Capabilities {
    let mut caps = Capabilities::default();
    caps.set(
        Capabilities::SHADER_FLOAT16,
        features.contains(wgpu::Features::SHADER_F16),
    );
    caps.set(
        Capabilities::FLOAT64,
        features.contains(wgpu::Features::SHADER_F64),
    );
    caps.set(
        Capabilities::SHADER_INT64,
        features.contains(wgpu::Features::SHADER_INT64),
    );
    caps
}

/// WGSL source that parsed, validated, and exposes a matching `main`.
#[derive(Debug)]
pub struct CompiledShader {
    kind: ShaderKind,
    source: String,
}

impl CompiledShader {
    /// Reads and compiles the stage at `path`.
    pub fn from_file(kind: ShaderKind, path: &Path, caps: Capabilities) -> Result<Self> {
        let source = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read {} at {}", kind.label(), path.display()))?;
        Self::from_source(kind, path, source, caps)
    }

    /// Compiles in-memory source. `path` is only used in diagnostics.
    pub fn from_source(
        kind: ShaderKind,
        path: impl Into<PathBuf>,
        source: String,
        caps: Capabilities,
    ) -> Result<Self> {
        let path = path.into();

        let module = naga::front::wgsl::parse_str(&source).map_err(|e| {
            anyhow!(
                "{} {} failed to compile:\n{}",
                kind.label(),
                path.display(),
                e.emit_to_string(&source)
            )
        })?;

        naga::valid::Validator::new(naga::valid::ValidationFlags::all(), caps)
        .validate(&module)
        .map_err(|e| {
            anyhow!(
                "{} {} failed validation:\n{}",
                kind.label(),
                path.display(),
                e.emit_to_string(&source)
            )
        })?;

        check_entry_point(kind, &module)
            .with_context(|| format!("{} {}", kind.label(), path.display()))?;

        Ok(Self { kind, source })
    }

    pub(crate) fn create_module(&self, device: &wgpu::Device) -> wgpu::ShaderModule {
        device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some(self.kind.label()),
            source: wgpu::ShaderSource::Wgsl(Cow::Borrowed(&self.source)),
        })
    }
}

/// Both stages, compiled from one directory.
#[derive(Debug)]
pub struct ShaderPair {
    pub vertex: CompiledShader,
    pub pixel: CompiledShader,
}

impl ShaderPair {
    pub fn load(dir: &Path, caps: Capabilities) -> Result<Self> {
        let load =
            |kind: ShaderKind| CompiledShader::from_file(kind, &dir.join(kind.file_name()), caps);
        Ok(Self {
            vertex: load(ShaderKind::Vertex)?,
            pixel: load(ShaderKind::Pixel)?,
        })
    }
}

/// GPU shader modules created from a validated [`ShaderPair`].
pub struct ShaderModules {
    pub vertex: wgpu::ShaderModule,
    pub pixel: wgpu::ShaderModule,
}

impl ShaderModules {
    pub(crate) fn create(gpu: &GpuDevice, shaders: &ShaderPair) -> Result<Self, ValidationError> {
        gpu.validated(|device| Self {
            vertex: shaders.vertex.create_module(device),
            pixel: shaders.pixel.create_module(device),
        })
    }
}

fn check_entry_point(kind: ShaderKind, module: &naga::Module) -> Result<()> {
    let ep = module
        .entry_points
        .iter()
        .find(|ep| ep.name == ENTRY_POINT)
        .ok_or_else(|| anyhow!("no entry point named `{ENTRY_POINT}`"))?;

    if ep.stage != kind.naga_stage() {
        bail!(
            "entry point `{ENTRY_POINT}` is a {:?} stage, expected {:?}",
            ep.stage,
            kind.naga_stage()
        );
    }

    match kind {
        ShaderKind::Vertex => {
            let mut inputs = Vec::new();
            for arg in &ep.function.arguments {
                collect_locations(module, arg.ty, arg.binding.as_ref(), &mut inputs);
            }
            if let Some(loc) = inputs.iter().find(|&&l| l >= VERTEX_ATTRIBUTE_COUNT) {
                bail!("vertex input @location({loc}) has no matching vertex attribute");
            }
        }
        ShaderKind::Pixel => {
            let mut outputs = Vec::new();
            if let Some(result) = &ep.function.result {
                collect_locations(module, result.ty, result.binding.as_ref(), &mut outputs);
            }
            if outputs != [0] {
                bail!("pixel shader must write exactly one color to @location(0)");
            }
        }
    }

    Ok(())
}

/// Gathers `@location` bindings from an argument or result, looking through structs.
fn collect_locations(
    module: &naga::Module,
    ty: naga::Handle<naga::Type>,
    binding: Option<&naga::Binding>,
    out: &mut Vec<u32>,
) {
    match binding {
        Some(naga::Binding::Location { location, .. }) => out.push(*location),
        Some(naga::Binding::BuiltIn(_)) => {}
        None => {
            if let naga::TypeInner::Struct { members, .. } = &module.types[ty].inner {
                for m in members {
                    if let Some(naga::Binding::Location { location, .. }) = &m.binding {
                        out.push(*location);
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::device::DEFAULT_SHADER_DIR;

    const VS_OK: &str = r#"
struct VsIn {
    @location(0) position: vec3<f32>,
    @location(1) color: vec4<f32>,
};

@vertex
fn main(v: VsIn) -> @builtin(position) vec4<f32> {
    return vec4<f32>(v.position, 1.0);
}
"#;

    fn caps() -> Capabilities {
        shader_capabilities(wgpu::Features::empty())
    }

    #[test]
    fn bundled_shaders_compile() {
        ShaderPair::load(Path::new(DEFAULT_SHADER_DIR), caps()).unwrap();
    }

    #[test]
    fn capabilities_follow_device_features() {
        assert!(!caps().contains(Capabilities::SHADER_FLOAT16));
        assert!(!caps().contains(Capabilities::FLOAT64));

        let f16 = shader_capabilities(wgpu::Features::SHADER_F16);
        assert!(f16.contains(Capabilities::SHADER_FLOAT16));
        assert!(!f16.contains(Capabilities::FLOAT64));
    }

    #[test]
    fn f16_needs_the_device_feature() {
        let src = r#"
enable f16;

@fragment
fn main() -> @location(0) vec4<f32> {
    let half: f16 = 1.0h;
    return vec4<f32>(f32(half));
}
"#
        .to_string();
        let err = CompiledShader::from_source(ShaderKind::Pixel, "ps.wgsl", src, caps()).unwrap_err();
        let msg = format!("{err:#}");
        assert!(msg.contains("pixel shader"), "{msg}");
        assert!(msg.contains("ps.wgsl"), "{msg}");
    }

    #[test]
    fn missing_file_names_the_shader() {
        let dir = tempfile::tempdir().unwrap();
        let err = ShaderPair::load(dir.path(), caps()).unwrap_err();
        let msg = format!("{err:#}");
        assert!(msg.contains("vertex shader"), "{msg}");
        assert!(msg.contains("vertex.wgsl"), "{msg}");
    }

    #[test]
    fn missing_pixel_stage_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("vertex.wgsl"), VS_OK).unwrap();
        let err = ShaderPair::load(dir.path(), caps()).unwrap_err();
        assert!(format!("{err:#}").contains("pixel shader"));
    }

    #[test]
    fn syntax_error_carries_diagnostic() {
        let src = "@vertex fn main( -> @builtin(position) vec4<f32> {}".to_string();
        let err = CompiledShader::from_source(ShaderKind::Vertex, "broken.wgsl", src, caps()).unwrap_err();
        let msg = format!("{err:#}");
        assert!(msg.contains("failed to compile"), "{msg}");
        assert!(msg.contains("broken.wgsl"), "{msg}");
    }

    #[test]
    fn entry_point_must_be_main() {
        let src = VS_OK.replace("fn main", "fn vs_main");
        let err = CompiledShader::from_source(ShaderKind::Vertex, "vs.wgsl", src, caps()).unwrap_err();
        assert!(format!("{err:#}").contains("no entry point named `main`"));
    }

    #[test]
    fn stage_must_match_kind() {
        let src = VS_OK.to_string();
        let err = CompiledShader::from_source(ShaderKind::Pixel, "ps.wgsl", src, caps()).unwrap_err();
        assert!(format!("{err:#}").contains("expected Fragment"));
    }

    #[test]
    fn unknown_vertex_location_is_rejected() {
        let src = VS_OK.replace("@location(1)", "@location(5)");
        let err = CompiledShader::from_source(ShaderKind::Vertex, "vs.wgsl", src, caps()).unwrap_err();
        assert!(format!("{err:#}").contains("@location(5)"));
    }

    #[test]
    fn pixel_must_write_location_zero() {
        let src = r#"
@fragment
fn main() -> @location(1) vec4<f32> {
    return vec4<f32>(1.0);
}
"#
        .to_string();
        let err = CompiledShader::from_source(ShaderKind::Pixel, "ps.wgsl", src, caps()).unwrap_err();
        assert!(format!("{err:#}").contains("@location(0)"));
    }
}
