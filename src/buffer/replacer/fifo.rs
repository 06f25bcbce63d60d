//! FIFO (First-In-First-Out) replacement policy.

use std::collections::{HashSet, VecDeque};

use crate::common::FrameId;

/// Evicts frames in the order they entered the pool.
///
/// Pinned frames keep their place in the queue and are skipped until they
/// become evictable again.
#[derive(Debug, Default)]
pub struct FifoReplacer {
    /// Frame ids in arrival order (front = oldest). Each frame at most once.
    queue: VecDeque<FrameId>,

    /// Frames with pin_count == 0.
    evictable: HashSet<FrameId>,
}

impl FifoReplacer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record that a frame was accessed. Re-access does not reorder.
    pub fn record_access(&mut self, frame_id: FrameId) {
        if !self.queue.contains(&frame_id) {
            self.queue.push_back(frame_id);
        }
    }

    pub fn set_evictable(&mut self, frame_id: FrameId, evictable: bool) {
        if evictable {
            self.evictable.insert(frame_id);
        } else {
            self.evictable.remove(&frame_id);
        }
    }

    /// Pick the oldest evictable frame, or None if every frame is pinned.
    pub fn evict(&mut self) -> Option<FrameId> {
        let pos = self
            .queue
            .iter()
            .position(|frame_id| self.evictable.contains(frame_id))?;
        let frame_id = self.queue.remove(pos)?;
        self.evictable.remove(&frame_id);
        Some(frame_id)
    }

    /// Forget a frame entirely (its page left the pool without eviction).
    pub fn remove(&mut self, frame_id: FrameId) {
        self.queue.retain(|f| *f != frame_id);
        self.evictable.remove(&frame_id);
    }

    /// Number of evictable frames.
    pub fn size(&self) -> usize {
        self.evictable.len()
    }
}
