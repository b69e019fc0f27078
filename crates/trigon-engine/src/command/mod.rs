//! Command recording.
//!
//! Responsibilities:
//! - model command lists, their allocator, and resource barriers as values
//! - enforce "no reuse while in flight" against the fence
//! - translate closed lists into wgpu copies and render passes

mod cmd;
mod encode;
mod list;

pub use cmd::{Barrier, Command, ResourceId, ResourceState, Topology};
pub use encode::{encode, EncodeError, ResourceTable};
pub use list::{CommandAllocator, CommandList};
