//! Back-buffer geometry.
//!
//! Everything here is in physical pixels with a top-left origin; viewport and
//! scissor are always derived from the swap-chain extent.

mod extent;
mod viewport;

pub use extent::Extent;
pub use viewport::{ScissorRect, Viewport, LEGACY_VIEWPORT};
