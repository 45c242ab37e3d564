// SPDX-License-Identifier: GPL-3.0-only

//! Latest-wins hand-off between the capture thread and the display
//!
//! The exchange holds at most one [`ProcessedFrame`]. Each publish swaps in
//! a new descriptor and hands the displaced one back to the writer; nothing
//! is queued. Readers clone the descriptor (an `Arc` bump) so the lock is
//! held only for the swap or the clone, never for an upload or a transform.
//! Pixels and dimensions travel in the same `Arc`, so a reader always sees a
//! consistent triple.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use crate::processing::ProcessedFrame;

/// Snapshot of the slot contents
#[derive(Debug, Clone)]
pub struct FrameDescriptor {
    /// Increases by one with every publish, starting at 1
    pub generation: u64,
    pub frame: Arc<ProcessedFrame>,
}

impl FrameDescriptor {
    pub fn width(&self) -> u32 {
        self.frame.width
    }

    pub fn height(&self) -> u32 {
        self.frame.height
    }

    pub fn pixels(&self) -> &[u8] {
        &self.frame.pixels
    }
}

/// Counters describing how the slot was used
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ExchangeStats {
    pub published: u64,
    /// Frames replaced before any reader saw them
    pub overwritten_unread: u64,
    /// Distinct generations observed by readers
    pub consumed: u64,
}

#[derive(Debug, Default)]
struct Inner {
    slot: Mutex<Option<FrameDescriptor>>,
    next_generation: AtomicU64,
    last_read_generation: AtomicU64,
    overwritten_unread: AtomicU64,
    consumed: AtomicU64,
}

/// Single-slot frame exchange, cheap to clone
#[derive(Debug, Clone, Default)]
pub struct FrameBufferExchange {
    inner: Arc<Inner>,
}

impl FrameBufferExchange {
    pub fn new() -> Self {
        Self::default()
    }

    fn slot(&self) -> MutexGuard<'_, Option<FrameDescriptor>> {
        // A poisoned slot still holds either a complete descriptor or none
        self.inner
            .slot
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    /// Replace the current frame
    ///
    /// Returns the new generation and the frame it displaced, so the caller
    /// can drop or recycle it outside the lock.
    pub fn publish(&self, frame: ProcessedFrame) -> (u64, Option<Arc<ProcessedFrame>>) {
        let frame = Arc::new(frame);
        let (generation, previous) = {
            let mut slot = self.slot();
            let generation = self.inner.next_generation.fetch_add(1, Ordering::SeqCst) + 1;
            let previous = slot.replace(FrameDescriptor { generation, frame });
            // Readers mark generations under this lock, so the check cannot
            // race a read of the frame being displaced
            if let Some(old) = &previous {
                if old.generation > self.inner.last_read_generation.load(Ordering::SeqCst) {
                    self.inner.overwritten_unread.fetch_add(1, Ordering::Relaxed);
                }
            }
            (generation, previous)
        };

        (generation, previous.map(|old| old.frame))
    }

    /// Current frame, if any has been published since the last clear
    pub fn latest(&self) -> Option<FrameDescriptor> {
        let slot = self.slot();
        let current = slot.clone()?;
        let previous = self
            .inner
            .last_read_generation
            .fetch_max(current.generation, Ordering::SeqCst);
        if previous < current.generation {
            self.inner.consumed.fetch_add(1, Ordering::Relaxed);
        }
        drop(slot);
        Some(current)
    }

    /// Dimensions of the current frame without marking it read
    pub fn current_size(&self) -> Option<(u32, u32)> {
        self.slot().as_ref().map(|d| (d.width(), d.height()))
    }

    /// Generation of the current frame without marking it read
    pub fn current_generation(&self) -> Option<u64> {
        self.slot().as_ref().map(|d| d.generation)
    }

    /// Empty the slot
    pub fn clear(&self) {
        let old = self.slot().take();
        drop(old);
    }

    pub fn stats(&self) -> ExchangeStats {
        ExchangeStats {
            published: self.inner.next_generation.load(Ordering::SeqCst),
            overwritten_unread: self.inner.overwritten_unread.load(Ordering::Relaxed),
            consumed: self.inner.consumed.load(Ordering::Relaxed),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn solid(width: u32, height: u32, value: u8, sequence: u64) -> ProcessedFrame {
        ProcessedFrame::new(
            width,
            height,
            vec![value; (width * height * 4) as usize],
            sequence,
        )
        .unwrap()
    }

    #[test]
    fn test_empty_until_published() {
        let exchange = FrameBufferExchange::new();
        assert!(exchange.latest().is_none());
        assert_eq!(exchange.current_generation(), None);
    }

    #[test]
    fn test_last_write_wins() {
        let exchange = FrameBufferExchange::new();
        exchange.publish(solid(2, 2, 1, 0));
        let (generation, displaced) = exchange.publish(solid(4, 2, 2, 1));

        assert_eq!(generation, 2);
        assert_eq!(displaced.map(|f| f.sequence), Some(0));

        let latest = exchange.latest().unwrap();
        assert_eq!((latest.width(), latest.height()), (4, 2));
        assert_eq!(latest.pixels().len(), 32);
        assert!(latest.pixels().iter().all(|&p| p == 2));
    }

    #[test]
    fn test_read_does_not_consume() {
        let exchange = FrameBufferExchange::new();
        exchange.publish(solid(1, 1, 9, 0));
        let a = exchange.latest().unwrap();
        let b = exchange.latest().unwrap();
        assert_eq!(a.generation, b.generation);
        assert_eq!(exchange.stats().consumed, 1);
    }

    #[test]
    fn test_overwritten_unread_counted() {
        let exchange = FrameBufferExchange::new();
        exchange.publish(solid(1, 1, 0, 0));
        exchange.publish(solid(1, 1, 0, 1));
        exchange.latest();
        exchange.publish(solid(1, 1, 0, 2));

        let stats = exchange.stats();
        assert_eq!(stats.published, 3);
        assert_eq!(stats.overwritten_unread, 1);
    }

    #[test]
    fn test_reader_keeps_frame_alive_after_overwrite() {
        let exchange = FrameBufferExchange::new();
        exchange.publish(solid(1, 1, 5, 0));
        let held = exchange.latest().unwrap();
        let (_, displaced) = exchange.publish(solid(1, 1, 6, 1));

        // Still shared with the reader, so the writer cannot reclaim it
        let displaced = displaced.unwrap();
        assert!(Arc::try_unwrap(displaced).is_err());
        assert_eq!(held.pixels(), &[5, 5, 5, 5]);
    }

    #[test]
    fn test_read_frame_is_not_counted_as_overwritten() {
        let exchange = FrameBufferExchange::new();
        exchange.publish(solid(1, 1, 0, 0));
        assert_eq!(exchange.latest().unwrap().generation, 1);
        exchange.publish(solid(1, 1, 0, 1));

        let stats = exchange.stats();
        assert_eq!(stats.overwritten_unread, 0);
        assert_eq!(stats.consumed, 1);
    }

    #[test]
    fn test_current_size_does_not_mark_read() {
        let exchange = FrameBufferExchange::new();
        assert_eq!(exchange.current_size(), None);
        exchange.publish(solid(6, 4, 0, 0));
        assert_eq!(exchange.current_size(), Some((6, 4)));
        assert_eq!(exchange.stats().consumed, 0);

        exchange.publish(solid(2, 2, 0, 1));
        assert_eq!(exchange.stats().overwritten_unread, 1);
    }

    #[test]
    fn test_clear_empties_slot() {
        let exchange = FrameBufferExchange::new();
        exchange.publish(solid(1, 1, 0, 0));
        exchange.clear();
        assert!(exchange.latest().is_none());
        // Generations keep increasing across a clear
        assert_eq!(exchange.publish(solid(1, 1, 0, 1)).0, 2);
    }
}
