use super::Extent;

/// Extent the renderer used for its viewport before it was derived from the
/// swap chain. Kept so tests can pin the divergence from the window size.
pub const LEGACY_VIEWPORT: Extent = Extent::new(800, 600);

/// Viewport rectangle in physical pixels plus its depth range.
#[derive(Debug, Copy, Clone, Default, PartialEq)]
pub struct Viewport {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
    pub min_depth: f32,
    pub max_depth: f32,
}

impl Viewport {
    #[inline]
    pub const fn new(width: f32, height: f32) -> Self {
        Self {
            x: 0.0,
            y: 0.0,
            width,
            height,
            min_depth: 0.0,
            max_depth: 1.0,
        }
    }

    /// Full-target viewport for a back buffer of `extent`.
    #[inline]
    pub fn from_extent(extent: Extent) -> Self {
        Self::new(extent.width as f32, extent.height as f32)
    }
}

/// Scissor rectangle in physical pixels.
#[derive(Debug, Copy, Clone, Default, Eq, PartialEq)]
pub struct ScissorRect {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl ScissorRect {
    /// Scissor covering the whole back buffer.
    #[inline]
    pub const fn full(extent: Extent) -> Self {
        Self {
            x: 0,
            y: 0,
            width: extent.width,
            height: extent.height,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn viewport_covers_extent() {
        let vp = Viewport::from_extent(Extent::new(1280, 720));
        assert_eq!((vp.x, vp.y), (0.0, 0.0));
        assert_eq!((vp.width, vp.height), (1280.0, 720.0));
        assert_eq!((vp.min_depth, vp.max_depth), (0.0, 1.0));
    }

    #[test]
    fn viewport_follows_back_buffer_not_legacy_size() {
        // The window is created at 1280x720; the old fixed 800x600 viewport
        // only covered part of it.
        let window = Extent::new(1280, 720);
        let vp = Viewport::from_extent(window);
        let legacy = Viewport::from_extent(LEGACY_VIEWPORT);
        assert_ne!(vp, legacy);
        assert!(vp.width > legacy.width && vp.height > legacy.height);
    }

    #[test]
    fn scissor_matches_viewport() {
        let extent = Extent::new(640, 480);
        let s = ScissorRect::full(extent);
        assert_eq!(s, ScissorRect { x: 0, y: 0, width: 640, height: 480 });
    }
}
