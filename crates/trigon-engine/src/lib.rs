//! Trigon engine crate.
//!
//! Draws a single colored triangle through an explicit, D3D12-shaped frame
//! loop: staged initialization, recorded command lists, resource barriers,
//! a fence, and a double-buffered swap chain, all on top of wgpu.

pub mod command;
pub mod coords;
pub mod device;
pub mod logging;
pub mod pipeline;
pub mod window;
