use std::ops::{Index, IndexMut};

use crate::command::{Barrier, ResourceId, ResourceState};

use super::FrameError;

/// Number of back buffers in the swap chain (double buffering).
pub const FRAME_COUNT: usize = 2;

/// Checked index of a swap-chain back buffer. Always `< FRAME_COUNT`.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash, Ord, PartialOrd)]
pub struct BackBufferIndex(u8);

impl BackBufferIndex {
    pub const FIRST: Self = Self(0);

    #[inline]
    pub fn new(index: usize) -> Option<Self> {
        (index < FRAME_COUNT).then(|| Self(index as u8))
    }

    #[inline]
    pub fn get(self) -> usize {
        self.0 as usize
    }

    /// Index selected after the next present.
    #[inline]
    pub fn next(self) -> Self {
        Self(((self.get() + 1) % FRAME_COUNT) as u8)
    }

    pub fn all() -> impl Iterator<Item = Self> {
        (0..FRAME_COUNT).map(|i| Self(i as u8))
    }
}

impl std::fmt::Display for BackBufferIndex {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// One value per back buffer, indexed only through [`BackBufferIndex`].
#[derive(Debug, Clone, PartialEq)]
pub struct BackBuffers<T>([T; FRAME_COUNT]);

impl<T> BackBuffers<T> {
    pub fn from_fn(mut f: impl FnMut(BackBufferIndex) -> T) -> Self {
        Self(std::array::from_fn(|i| f(BackBufferIndex(i as u8))))
    }

    #[inline]
    pub const fn len(&self) -> usize {
        FRAME_COUNT
    }

    pub fn iter(&self) -> impl Iterator<Item = (BackBufferIndex, &T)> {
        BackBufferIndex::all().zip(self.0.iter())
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = (BackBufferIndex, &mut T)> {
        BackBufferIndex::all().zip(self.0.iter_mut())
    }
}

impl<T> Index<BackBufferIndex> for BackBuffers<T> {
    type Output = T;

    #[inline]
    fn index(&self, index: BackBufferIndex) -> &T {
        &self.0[index.get()]
    }
}

impl<T> IndexMut<BackBufferIndex> for BackBuffers<T> {
    #[inline]
    fn index_mut(&mut self, index: BackBufferIndex) -> &mut T {
        &mut self.0[index.get()]
    }
}

/// Usage state of every back buffer, as implied by the barriers recorded so far.
///
/// Back buffers only ever move between `Present` and `RenderTarget`.
#[derive(Debug, Clone, PartialEq)]
pub struct BackBufferStates {
    states: BackBuffers<ResourceState>,
}

impl Default for BackBufferStates {
    fn default() -> Self {
        Self::new()
    }
}

impl BackBufferStates {
    pub fn new() -> Self {
        Self {
            states: BackBuffers::from_fn(|_| ResourceState::Present),
        }
    }

    #[inline]
    pub fn state(&self, index: BackBufferIndex) -> ResourceState {
        self.states[index]
    }

    /// Validates and applies a transition, returning the barrier to record.
    pub fn transition(
        &mut self,
        index: BackBufferIndex,
        before: ResourceState,
        after: ResourceState,
    ) -> Result<Barrier, FrameError> {
        let resource = ResourceId::BackBuffer(index);
        let actual = self.states[index];
        if actual != before {
            return Err(FrameError::InvalidTransition {
                resource,
                expected: before,
                actual,
            });
        }
        if !matches!(after, ResourceState::Present | ResourceState::RenderTarget) {
            return Err(FrameError::InvalidTransition {
                resource,
                expected: ResourceState::RenderTarget,
                actual: after,
            });
        }

        self.states[index] = after;
        Ok(Barrier {
            resource,
            before,
            after,
        })
    }

    /// Fails unless the buffer can be handed to the presentation engine.
    pub fn ensure_presentable(&self, index: BackBufferIndex) -> Result<(), FrameError> {
        match self.states[index] {
            ResourceState::Present => Ok(()),
            _ => Err(FrameError::NotPresentable(index)),
        }
    }

    /// Returns every buffer to `Present`, as after swap-chain (re)creation.
    pub fn reset(&mut self) {
        for (_, s) in self.states.iter_mut() {
            *s = ResourceState::Present;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn idx(i: usize) -> BackBufferIndex {
        BackBufferIndex::new(i).unwrap()
    }

    #[test]
    fn index_is_checked() {
        assert!(BackBufferIndex::new(0).is_some());
        assert!(BackBufferIndex::new(FRAME_COUNT - 1).is_some());
        assert!(BackBufferIndex::new(FRAME_COUNT).is_none());
        assert!(BackBufferIndex::new(usize::MAX).is_none());
    }

    #[test]
    fn next_alternates() {
        let mut i = BackBufferIndex::FIRST;
        let mut seen = Vec::new();
        for _ in 0..6 {
            seen.push(i.get());
            i = i.next();
        }
        assert_eq!(seen, [0, 1, 0, 1, 0, 1]);
    }

    #[test]
    fn back_buffers_index_by_checked_type() {
        let mut bufs = BackBuffers::from_fn(|i| i.get() * 10);
        assert_eq!(bufs[idx(1)], 10);
        bufs[idx(0)] = 7;
        assert_eq!(bufs.iter().map(|(_, v)| *v).collect::<Vec<_>>(), [7, 10]);
        assert_eq!(bufs.len(), FRAME_COUNT);
    }

    #[test]
    fn buffers_start_presentable() {
        let states = BackBufferStates::new();
        for i in BackBufferIndex::all() {
            assert_eq!(states.state(i), ResourceState::Present);
            assert!(states.ensure_presentable(i).is_ok());
        }
    }

    #[test]
    fn transition_round_trip() {
        let mut states = BackBufferStates::new();
        let b = states
            .transition(idx(0), ResourceState::Present, ResourceState::RenderTarget)
            .unwrap();
        assert_eq!(b.resource, ResourceId::BackBuffer(idx(0)));
        assert!(matches!(states.ensure_presentable(idx(0)), Err(FrameError::NotPresentable(_))));
        // The other buffer is untouched.
        assert_eq!(states.state(idx(1)), ResourceState::Present);

        states
            .transition(idx(0), ResourceState::RenderTarget, ResourceState::Present)
            .unwrap();
        assert!(states.ensure_presentable(idx(0)).is_ok());
    }

    #[test]
    fn transition_from_wrong_state_fails_without_change() {
        let mut states = BackBufferStates::new();
        let err = states
            .transition(idx(1), ResourceState::RenderTarget, ResourceState::Present)
            .unwrap_err();
        assert!(matches!(
            err,
            FrameError::InvalidTransition {
                expected: ResourceState::RenderTarget,
                actual: ResourceState::Present,
                ..
            }
        ));
        assert_eq!(states.state(idx(1)), ResourceState::Present);
    }

    #[test]
    fn back_buffer_cannot_enter_buffer_states() {
        let mut states = BackBufferStates::new();
        assert!(states
            .transition(idx(0), ResourceState::Present, ResourceState::CopyDest)
            .is_err());
        assert_eq!(states.state(idx(0)), ResourceState::Present);
    }

    #[test]
    fn reset_returns_all_to_present() {
        let mut states = BackBufferStates::new();
        states
            .transition(idx(1), ResourceState::Present, ResourceState::RenderTarget)
            .unwrap();
        states.reset();
        assert_eq!(states, BackBufferStates::new());
    }
}
