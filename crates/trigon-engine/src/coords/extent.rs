use winit::dpi::PhysicalSize;

/// Size of a back buffer in physical pixels.
#[derive(Debug, Copy, Clone, Default, Eq, PartialEq, Hash)]
pub struct Extent {
    pub width: u32,
    pub height: u32,
}

impl Extent {
    #[inline]
    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    /// A minimized window reports a zero extent; surfaces cannot be configured with it.
    #[inline]
    pub const fn is_zero(self) -> bool {
        self.width == 0 || self.height == 0
    }
}

impl From<PhysicalSize<u32>> for Extent {
    #[inline]
    fn from(size: PhysicalSize<u32>) -> Self {
        Self::new(size.width, size.height)
    }
}

impl std::fmt::Display for Extent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}
