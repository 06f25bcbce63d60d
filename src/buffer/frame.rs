//! One slot of the buffer pool.
//!
//! A frame is either vacant or holds one page of one registered file. The
//! pool pins a frame for every outstanding guard or explicit pin; only
//! frames with no pins may be chosen for eviction.

use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};

use parking_lot::{Mutex, RwLock, RwLockReadGuard, RwLockWriteGuard};

use crate::common::{FileId, PageId};
use crate::storage::page::Page;

/// Page bytes plus residency, pin and dirty bookkeeping.
///
/// The bytes sit behind a `RwLock` that page guards hold for their
/// lifetime; the bookkeeping fields are updated without taking it.
pub struct Frame {
    page: RwLock<Page>,
    /// `(file, page)` held by the frame; `None` when vacant.
    resident: Mutex<Option<(FileId, PageId)>>,
    pins: AtomicU32,
    dirty: AtomicBool,
}

impl Frame {
    pub fn new() -> Self {
        Self {
            page: RwLock::new(Page::new()),
            resident: Mutex::new(None),
            pins: AtomicU32::new(0),
            dirty: AtomicBool::new(false),
        }
    }

    #[inline]
    pub fn page(&self) -> RwLockReadGuard<'_, Page> {
        self.page.read()
    }

    #[inline]
    pub fn page_mut(&self) -> RwLockWriteGuard<'_, Page> {
        self.page.write()
    }

    #[inline]
    pub fn resident(&self) -> Option<(FileId, PageId)> {
        *self.resident.lock()
    }

    /// Claim the frame for `page_id` of `file_id`, pinned once and clean.
    /// The caller fills in the page bytes.
    pub fn occupy(&self, file_id: FileId, page_id: PageId) {
        *self.resident.lock() = Some((file_id, page_id));
        self.pins.store(1, Ordering::Relaxed);
        self.dirty.store(false, Ordering::Relaxed);
    }

    /// Forget the resident page. The bytes are left as they are; whoever
    /// occupies the frame next overwrites them.
    pub fn vacate(&self) {
        *self.resident.lock() = None;
        self.dirty.store(false, Ordering::Relaxed);
    }

    /// Returns the new pin count.
    #[inline]
    pub fn pin(&self) -> u32 {
        self.pins.fetch_add(1, Ordering::Relaxed) + 1
    }

    /// Drop one pin and return the new count, or `None` if there was no
    /// pin to drop.
    #[inline]
    pub fn try_unpin(&self) -> Option<u32> {
        self.pins
            .fetch_update(Ordering::Relaxed, Ordering::Relaxed, |n| n.checked_sub(1))
            .ok()
            .map(|old| old - 1)
    }

    #[inline]
    pub fn pin_count(&self) -> u32 {
        self.pins.load(Ordering::Relaxed)
    }

    #[inline]
    pub fn is_pinned(&self) -> bool {
        self.pin_count() > 0
    }

    #[inline]
    pub fn mark_dirty(&self) {
        self.dirty.store(true, Ordering::Relaxed);
    }

    #[inline]
    pub fn clear_dirty(&self) {
        self.dirty.store(false, Ordering::Relaxed);
    }

    #[inline]
    pub fn is_dirty(&self) -> bool {
        self.dirty.load(Ordering::Relaxed)
    }

    /// Vacate and zero the frame, dropping any pins.
    ///
    /// Must not be called while a page guard holds the frame's lock.
    pub fn reset(&self) {
        self.page_mut().reset();
        self.vacate();
        self.pins.store(0, Ordering::Relaxed);
    }
}

impl Default for Frame {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_frame_is_vacant() {
        let frame = Frame::new();
        assert_eq!(frame.resident(), None);
        assert_eq!(frame.pin_count(), 0);
        assert!(!frame.is_dirty());
    }

    #[test]
    fn test_occupy_pins_once_and_cleans() {
        let frame = Frame::new();
        frame.mark_dirty();

        frame.occupy(FileId::new(2), PageId::new(7));

        assert_eq!(frame.resident(), Some((FileId::new(2), PageId::new(7))));
        assert_eq!(frame.pin_count(), 1);
        assert!(!frame.is_dirty());
    }

    #[test]
    fn test_unpin_below_zero_is_reported() {
        let frame = Frame::new();
        frame.occupy(FileId::new(0), PageId::new(1));

        assert_eq!(frame.pin(), 2);
        assert_eq!(frame.try_unpin(), Some(1));
        assert_eq!(frame.try_unpin(), Some(0));
        assert!(!frame.is_pinned());
        assert_eq!(frame.try_unpin(), None);
        assert_eq!(frame.pin_count(), 0);
    }

    #[test]
    fn test_vacate_keeps_bytes() {
        let frame = Frame::new();
        frame.occupy(FileId::new(1), PageId::new(3));
        frame.page_mut().as_mut_slice()[40] = 9;
        frame.mark_dirty();

        frame.vacate();

        assert_eq!(frame.resident(), None);
        assert!(!frame.is_dirty());
        assert_eq!(frame.page().as_slice()[40], 9);
    }

    #[test]
    fn test_reset_zeroes_and_unpins() {
        let frame = Frame::new();
        frame.occupy(FileId::new(0), PageId::new(99));
        frame.pin();
        frame.page_mut().as_mut_slice()[100] = 0xFF;

        frame.reset();

        assert_eq!(frame.resident(), None);
        assert!(!frame.is_pinned());
        assert_eq!(frame.page().as_slice()[100], 0);
    }
}
