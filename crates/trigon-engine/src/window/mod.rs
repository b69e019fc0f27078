//! Window + runtime loop.
//!
//! Owns the `winit` event loop and the single window, and drives the
//! renderer from window events.

mod runtime;

pub use runtime::{Runtime, RuntimeConfig};
