//! Shaders, vertex data, and the fixed pipeline that draws the triangle.

mod shader;
mod state;
mod vertex;

pub use shader::{
    shader_capabilities, CompiledShader, ShaderKind, ShaderModules, ShaderPair, ENTRY_POINT,
};
pub use state::{PipelineState, RootSignature};
pub use vertex::{
    Vertex, VertexBuffer, VertexBufferView, TRIANGLE_VERTICES, VERTEX_ATTRIBUTE_COUNT,
};
