use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use super::{GpuDevice, WaitError};

/// Monotonic fence counter value.
pub type FenceValue = u64;

/// CPU/GPU synchronization counter.
///
/// The queue signals a new value after each submission; the GPU advances the
/// completed value once that work finishes (through the queue's work-done
/// callback). Completed values never decrease.
#[derive(Debug)]
pub struct Fence {
    completed: Arc<AtomicU64>,
    last_signaled: FenceValue,
}

impl Fence {
    pub fn new(initial: FenceValue) -> Self {
        Self {
            completed: Arc::new(AtomicU64::new(initial)),
            last_signaled: initial,
        }
    }

    /// Highest value the GPU has reported as done.
    #[inline]
    pub fn completed_value(&self) -> FenceValue {
        self.completed.load(Ordering::Acquire)
    }

    /// Most recent value handed to the queue.
    #[inline]
    pub fn last_signaled(&self) -> FenceValue {
        self.last_signaled
    }

    #[inline]
    pub fn is_complete(&self, value: FenceValue) -> bool {
        self.completed_value() >= value
    }

    /// Reserves the next value and returns it with the callback that marks it done.
    pub(crate) fn next_signal(&mut self) -> (FenceValue, impl FnOnce() + Send + 'static) {
        self.last_signaled += 1;
        let value = self.last_signaled;
        let completed = Arc::clone(&self.completed);
        (value, move || {
            completed.fetch_max(value, Ordering::AcqRel);
        })
    }

    /// Blocks until the GPU reaches `value`. There is no timeout.
    pub fn wait(&self, gpu: &GpuDevice, value: FenceValue) -> Result<(), WaitError> {
        if self.is_complete(value) {
            return Ok(());
        }

        gpu.device()
            .poll(wgpu::PollType::Wait {
                submission_index: None,
                timeout: None,
            })
            .map_err(|e| WaitError::Poll(format!("{e:?}")))?;

        let completed = self.completed_value();
        if completed < value {
            return Err(WaitError::NotSignaled {
                expected: value,
                completed,
            });
        }
        Ok(())
    }

    /// Waits for everything signaled so far.
    pub fn wait_idle(&self, gpu: &GpuDevice) -> Result<(), WaitError> {
        self.wait(gpu, self.last_signaled)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn starts_at_initial_value() {
        let fence = Fence::new(0);
        assert_eq!(fence.completed_value(), 0);
        assert_eq!(fence.last_signaled(), 0);
        assert!(fence.is_complete(0));
        assert!(!fence.is_complete(1));
    }

    #[test]
    fn signal_values_increase() {
        let mut fence = Fence::new(0);
        let (a, _) = fence.next_signal();
        let (b, _) = fence.next_signal();
        assert_eq!((a, b), (1, 2));
        assert_eq!(fence.last_signaled(), 2);
        assert_eq!(fence.completed_value(), 0);
    }

    #[test]
    fn completion_advances_counter() {
        let mut fence = Fence::new(0);
        let (v, done) = fence.next_signal();
        assert!(!fence.is_complete(v));
        done();
        assert!(fence.is_complete(v));
        assert_eq!(fence.completed_value(), 1);
    }

    #[test]
    fn completed_value_never_decreases() {
        let mut fence = Fence::new(0);
        let (_, first) = fence.next_signal();
        let (second_value, second) = fence.next_signal();
        // Callbacks firing out of order must not move the counter backwards.
        second();
        first();
        assert_eq!(fence.completed_value(), second_value);
    }
}
