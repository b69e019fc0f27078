use thiserror::Error;

use crate::command::{EncodeError, ResourceId, ResourceState};
use crate::device::{BackBufferIndex, FenceValue};

/// Initialization steps, in the order they must run.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum InitStage {
    Device,
    CommandQueue,
    Fence,
    SwapChain,
    DescriptorHeaps,
    Shaders,
    RootSignature,
    PipelineState,
    CommandList,
    VertexUpload,
}

impl InitStage {
    pub const ALL: [InitStage; 10] = [
        InitStage::Device,
        InitStage::CommandQueue,
        InitStage::Fence,
        InitStage::SwapChain,
        InitStage::DescriptorHeaps,
        InitStage::Shaders,
        InitStage::RootSignature,
        InitStage::PipelineState,
        InitStage::CommandList,
        InitStage::VertexUpload,
    ];

    pub fn name(self) -> &'static str {
        match self {
            InitStage::Device => "device creation",
            InitStage::CommandQueue => "command queue creation",
            InitStage::Fence => "fence creation",
            InitStage::SwapChain => "swap chain creation",
            InitStage::DescriptorHeaps => "descriptor heap creation",
            InitStage::Shaders => "shader compilation",
            InitStage::RootSignature => "root signature creation",
            InitStage::PipelineState => "pipeline state creation",
            InitStage::CommandList => "command list creation",
            InitStage::VertexUpload => "vertex buffer upload",
        }
    }
}

impl std::fmt::Display for InitStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Startup failure. Always fatal: no renderer exists when this is returned.
#[derive(Debug, Error)]
#[error("{stage} failed: {source:#}")]
pub struct InitError {
    pub stage: InitStage,
    #[source]
    pub source: anyhow::Error,
}

impl InitError {
    pub fn new(stage: InitStage, source: impl Into<anyhow::Error>) -> Self {
        Self {
            stage,
            source: source.into(),
        }
    }
}

/// Attaches the failing stage to a fallible initialization step.
pub(crate) trait StageExt<T> {
    fn stage(self, stage: InitStage) -> Result<T, InitError>;
}

impl<T, E> StageExt<T> for Result<T, E>
where
    E: Into<anyhow::Error>,
{
    fn stage(self, stage: InitStage) -> Result<T, InitError> {
        self.map_err(|e| InitError::new(stage, e))
    }
}

/// Fence wait failure.
#[derive(Debug, Error)]
pub enum WaitError {
    #[error("device poll failed: {0}")]
    Poll(String),

    #[error("fence value {expected} not reached after wait (completed {completed})")]
    NotSignaled {
        expected: FenceValue,
        completed: FenceValue,
    },
}

/// Validation error raised by wgpu while an error scope was open.
#[derive(Debug, Error)]
#[error("wgpu validation failed: {0}")]
pub struct ValidationError(pub String);

/// Per-frame failure. The frame is skipped and the next one is attempted.
#[derive(Debug, Error)]
pub enum FrameError {
    #[error("failed to acquire back buffer: {0}")]
    Acquire(#[from] wgpu::SurfaceError),

    #[error("swap chain has a zero extent")]
    ZeroExtent,

    #[error("invalid transition of {resource:?}: expected {expected:?}, found {actual:?}")]
    InvalidTransition {
        resource: ResourceId,
        expected: ResourceState,
        actual: ResourceState,
    },

    #[error("back buffer {0} is not in the present state")]
    NotPresentable(BackBufferIndex),

    #[error("command list is {0}")]
    CommandListState(&'static str),

    #[error("command allocator still in flight (pending {pending}, completed {completed})")]
    AllocatorInFlight {
        pending: FenceValue,
        completed: FenceValue,
    },

    #[error("failed to encode command list: {0}")]
    Encode(#[from] EncodeError),

    #[error("fence wait failed: {0}")]
    Wait(#[from] WaitError),

    #[error("submission rejected: {0}")]
    Validation(#[from] ValidationError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn init_error_names_stage() {
        let err = InitError::new(InitStage::SwapChain, anyhow::anyhow!("surface unsupported"));
        let msg = err.to_string();
        assert!(msg.starts_with("swap chain creation failed"));
        assert!(msg.contains("surface unsupported"));
    }

    #[test]
    fn shader_stage_mentions_shader() {
        let err = InitError::new(InitStage::Shaders, anyhow::anyhow!("file not found"));
        assert!(err.to_string().contains("shader"));
    }

    #[test]
    fn stage_ext_wraps_errors() {
        let r: Result<(), anyhow::Error> = Err(anyhow::anyhow!("boom"));
        let err = r.stage(InitStage::Fence).unwrap_err();
        assert_eq!(err.stage, InitStage::Fence);
    }

    #[test]
    fn validation_error_keeps_wgpu_message() {
        let err = InitError::new(
            InitStage::PipelineState,
            ValidationError("Error matching ShaderStages(FRAGMENT) shader requirements".into()),
        );
        let msg = err.to_string();
        assert!(msg.starts_with("pipeline state creation failed"));
        assert!(msg.contains("FRAGMENT"));
    }

    #[test]
    fn stages_are_distinct_and_ordered() {
        for (i, a) in InitStage::ALL.iter().enumerate() {
            for b in &InitStage::ALL[i + 1..] {
                assert_ne!(a, b);
                assert_ne!(a.name(), b.name());
            }
        }
        assert_eq!(InitStage::ALL[0], InitStage::Device);
        assert_eq!(InitStage::ALL[9], InitStage::VertexUpload);
    }
}
