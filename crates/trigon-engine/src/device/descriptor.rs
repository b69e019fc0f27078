use super::{BackBufferIndex, BackBuffers};

/// Handle to one render-target descriptor slot.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub struct RtvHandle {
    index: BackBufferIndex,
}

impl RtvHandle {
    #[inline]
    pub(crate) const fn new(index: BackBufferIndex) -> Self {
        Self { index }
    }

    /// Back buffer this descriptor views.
    #[inline]
    pub fn index(self) -> BackBufferIndex {
        self.index
    }
}

/// Description of a render-target view onto one back buffer.
#[derive(Debug, Clone, PartialEq)]
pub struct RenderTargetDescriptor {
    pub label: String,
    pub format: wgpu::TextureFormat,
}

/// Render-target descriptors, one per back buffer.
///
/// Views are created from these descriptors when a back buffer is acquired;
/// the heap itself never grows after creation.
#[derive(Debug, Clone)]
pub struct DescriptorHeap {
    descriptors: BackBuffers<RenderTargetDescriptor>,
}

impl DescriptorHeap {
    pub fn new(format: wgpu::TextureFormat) -> Self {
        Self {
            descriptors: BackBuffers::from_fn(|i| RenderTargetDescriptor {
                label: format!("trigon back buffer {i} rtv"),
                format,
            }),
        }
    }

    /// Number of descriptors in the heap. Always one per back buffer.
    #[inline]
    pub fn descriptor_count(&self) -> usize {
        self.descriptors.len()
    }

    #[inline]
    pub fn handle(&self, index: BackBufferIndex) -> RtvHandle {
        RtvHandle::new(index)
    }

    #[inline]
    pub fn descriptor(&self, handle: RtvHandle) -> &RenderTargetDescriptor {
        &self.descriptors[handle.index]
    }

    pub(crate) fn view_descriptor(&self, handle: RtvHandle) -> wgpu::TextureViewDescriptor<'_> {
        let d = self.descriptor(handle);
        wgpu::TextureViewDescriptor {
            label: Some(&d.label),
            format: Some(d.format),
            dimension: Some(wgpu::TextureViewDimension::D2),
            ..Default::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::device::FRAME_COUNT;

    #[test]
    fn one_descriptor_per_back_buffer() {
        let heap = DescriptorHeap::new(wgpu::TextureFormat::Rgba8Unorm);
        assert_eq!(heap.descriptor_count(), FRAME_COUNT);
        for i in BackBufferIndex::all() {
            let h = heap.handle(i);
            assert_eq!(h.index(), i);
            assert_eq!(heap.descriptor(h).format, wgpu::TextureFormat::Rgba8Unorm);
        }
    }

    #[test]
    fn descriptors_are_distinct() {
        let heap = DescriptorHeap::new(wgpu::TextureFormat::Bgra8Unorm);
        let a = heap.descriptor(heap.handle(BackBufferIndex::FIRST));
        let b = heap.descriptor(heap.handle(BackBufferIndex::FIRST.next()));
        assert_ne!(a.label, b.label);
    }
}
