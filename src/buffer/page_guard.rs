//! Scoped page access.
//!
//! A guard holds one pin and the frame's page lock. Dropping it releases
//! both, whichever way the holder exits. [`PageWriteGuard`] also marks the
//! page dirty on release.

use std::ops::{Deref, DerefMut};

use parking_lot::{RwLockReadGuard, RwLockWriteGuard};

use crate::common::{FileId, FrameId, PageId};
use crate::storage::page::Page;

use super::buffer_pool_manager::BufferPoolManager;

/// Which pinned frame a guard owns, and the page it holds.
struct Pinned<'a> {
    bpm: &'a BufferPoolManager,
    frame_id: FrameId,
    file_id: FileId,
    page_id: PageId,
}

impl Pinned<'_> {
    fn release(&self, dirty: bool) {
        self.bpm.unpin_page_internal(self.frame_id, dirty);
    }
}

/// Shared access to a resident page.
///
/// ```ignore
/// let guard = bpm.fetch_page_read(file, page_id)?;
/// let leaf = LeafNode::new(guard.as_slice(), capacity);
/// ```
pub struct PageReadGuard<'a> {
    pinned: Pinned<'a>,
    lock: RwLockReadGuard<'a, Page>,
}

impl<'a> PageReadGuard<'a> {
    pub(crate) fn new(
        bpm: &'a BufferPoolManager,
        frame_id: FrameId,
        file_id: FileId,
        page_id: PageId,
        lock: RwLockReadGuard<'a, Page>,
    ) -> Self {
        Self {
            pinned: Pinned {
                bpm,
                frame_id,
                file_id,
                page_id,
            },
            lock,
        }
    }

    #[inline]
    pub fn page_id(&self) -> PageId {
        self.pinned.page_id
    }

    #[inline]
    pub fn file_id(&self) -> FileId {
        self.pinned.file_id
    }
}

impl Deref for PageReadGuard<'_> {
    type Target = Page;

    #[inline]
    fn deref(&self) -> &Page {
        &self.lock
    }
}

impl Drop for PageReadGuard<'_> {
    fn drop(&mut self) {
        self.pinned.release(false);
    }
}

/// Exclusive access to a resident page.
pub struct PageWriteGuard<'a> {
    pinned: Pinned<'a>,
    lock: RwLockWriteGuard<'a, Page>,
}

impl<'a> PageWriteGuard<'a> {
    pub(crate) fn new(
        bpm: &'a BufferPoolManager,
        frame_id: FrameId,
        file_id: FileId,
        page_id: PageId,
        lock: RwLockWriteGuard<'a, Page>,
    ) -> Self {
        Self {
            pinned: Pinned {
                bpm,
                frame_id,
                file_id,
                page_id,
            },
            lock,
        }
    }

    #[inline]
    pub fn page_id(&self) -> PageId {
        self.pinned.page_id
    }

    #[inline]
    pub fn file_id(&self) -> FileId {
        self.pinned.file_id
    }
}

impl Deref for PageWriteGuard<'_> {
    type Target = Page;

    #[inline]
    fn deref(&self) -> &Page {
        &self.lock
    }
}

impl DerefMut for PageWriteGuard<'_> {
    #[inline]
    fn deref_mut(&mut self) -> &mut Page {
        &mut self.lock
    }
}

impl Drop for PageWriteGuard<'_> {
    fn drop(&mut self) {
        self.pinned.release(true);
    }
}
