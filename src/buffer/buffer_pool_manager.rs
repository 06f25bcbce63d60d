//! Buffer Pool Manager - the page caching layer shared by all page files.
//!
//! The [`BufferPoolManager`] provides:
//! - Page caching between disk and memory for any number of files
//! - Pin-based reference counting, through guards or explicit pin/unpin
//! - Dirty page write-back with a CRC32 stamp
//! - FIFO eviction of unpinned frames

use std::collections::HashMap;
use std::sync::atomic::{AtomicU32, Ordering};

use parking_lot::{Mutex, RwLock};

use crate::buffer::replacer::FifoReplacer;
use crate::buffer::{BufferPoolStats, Frame, PageReadGuard, PageWriteGuard};
use crate::common::{Error, FileId, FrameId, PageId, Result};
use crate::storage::DiskManager;

/// Manages a pool of buffer frames caching pages of registered files.
///
/// # Architecture
/// ```text
/// ┌──────────────────────────────────────────────────────────────┐
/// │                     BufferPoolManager                        │
/// │  ┌──────────────────┐  ┌─────────────────────────────────┐   │
/// │  │ page_table       │  │       frames: Vec<Frame>        │   │
/// │  │(File,Page) → Fid │─▶│  [Frame0] [Frame1] [Frame2] ... │   │
/// │  └──────────────────┘  └─────────────────────────────────┘   │
/// │  ┌──────────────┐  ┌──────────────┐  ┌──────────────────┐    │
/// │  │  free_list   │  │   replacer   │  │ files            │    │
/// │  │ Vec<FrameId> │  │ FifoReplacer │  │ FileId → DiskMgr │    │
/// │  └──────────────┘  └──────────────┘  └──────────────────┘    │
/// └──────────────────────────────────────────────────────────────┘
/// ```
///
/// # Usage
/// ```ignore
/// let bpm = BufferPoolManager::new(16);
/// let file = bpm.register_file(DiskManager::create("emp.0")?);
///
/// let mut guard = bpm.new_page(file)?;
/// guard.as_mut_slice()[20] = 0xAB;
/// // guard drops: page marked dirty, unpinned
///
/// let guard = bpm.fetch_page_read(file, PageId::new(0))?;
/// ```
///
/// A page must not be fetched through a second guard while a write guard
/// on it is alive in the same thread: the frame lock is not re-entrant.
pub struct BufferPoolManager {
    frames: Vec<Frame>,

    page_table: RwLock<HashMap<(FileId, PageId), FrameId>>,

    /// Stack of free frame IDs (LIFO for cache locality).
    free_list: Mutex<Vec<FrameId>>,

    replacer: Mutex<FifoReplacer>,

    files: Mutex<HashMap<FileId, DiskManager>>,

    next_file_id: AtomicU32,

    stats: BufferPoolStats,

    pool_size: usize,
}

impl BufferPoolManager {
    /// Create a new buffer pool manager with `pool_size` frames.
    ///
    /// # Panics
    /// Panics if `pool_size` is 0.
    pub fn new(pool_size: usize) -> Self {
        assert!(pool_size > 0, "pool_size must be > 0");

        let frames: Vec<Frame> = (0..pool_size).map(|_| Frame::new()).collect();
        let free_list: Vec<FrameId> = (0..pool_size).rev().map(FrameId::new).collect();

        Self {
            frames,
            page_table: RwLock::new(HashMap::new()),
            free_list: Mutex::new(free_list),
            replacer: Mutex::new(FifoReplacer::new()),
            files: Mutex::new(HashMap::new()),
            next_file_id: AtomicU32::new(0),
            stats: BufferPoolStats::new(),
            pool_size,
        }
    }

    // ========================================================================
    // Files
    // ========================================================================

    /// Hand a page file to the pool. All later page operations name it by
    /// the returned id.
    pub fn register_file(&self, disk_manager: DiskManager) -> FileId {
        let file_id = FileId::new(self.next_file_id.fetch_add(1, Ordering::Relaxed));
        tracing::debug!(%file_id, path = %disk_manager.path().display(), "registered page file");
        self.files.lock().insert(file_id, disk_manager);
        file_id
    }

    /// Number of pages in a registered file.
    pub fn file_page_count(&self, file_id: FileId) -> Result<u32> {
        let files = self.files.lock();
        let dm = files.get(&file_id).ok_or(Error::UnknownFile(file_id))?;
        Ok(dm.page_count())
    }

    /// Flush a file, drop its resident pages and close it.
    ///
    /// Pages still pinned are left resident (and logged); they are
    /// discarded when their frame is next evicted.
    pub fn close_file(&self, file_id: FileId) -> Result<()> {
        self.flush_file(file_id)?;

        for (page_id, frame_id) in self.resident_pages(file_id) {
            let frame = &self.frames[frame_id.0];
            if frame.is_pinned() {
                tracing::warn!(
                    %file_id,
                    %page_id,
                    pin_count = frame.pin_count(),
                    "closing file with a pinned page"
                );
                continue;
            }
            self.page_table.write().remove(&(file_id, page_id));
            self.replacer.lock().remove(frame_id);
            frame.reset();
            self.free_list.lock().push(frame_id);
        }

        self.files
            .lock()
            .remove(&file_id)
            .ok_or(Error::UnknownFile(file_id))?;
        Ok(())
    }

    // ========================================================================
    // Fetch pages
    // ========================================================================

    /// Fetch a page for reading (shared access).
    ///
    /// # Errors
    /// - `Error::PageNotFound` if the page doesn't exist on disk
    /// - `Error::NoFreeFrames` if all frames are pinned
    /// - `Error::ChecksumMismatch` if the stored page is corrupt
    pub fn fetch_page_read(&self, file_id: FileId, page_id: PageId) -> Result<PageReadGuard<'_>> {
        let frame_id = self.fetch_page_internal(file_id, page_id)?;
        let lock = self.frames[frame_id.0].page();

        Ok(PageReadGuard::new(self, frame_id, file_id, page_id, lock))
    }

    /// Fetch a page for writing (exclusive access).
    ///
    /// The page is marked dirty when the guard drops.
    pub fn fetch_page_write(&self, file_id: FileId, page_id: PageId) -> Result<PageWriteGuard<'_>> {
        let frame_id = self.fetch_page_internal(file_id, page_id)?;
        let lock = self.frames[frame_id.0].page_mut();

        Ok(PageWriteGuard::new(self, frame_id, file_id, page_id, lock))
    }

    /// Allocate a new zeroed page at the end of a file and pin it.
    pub fn new_page(&self, file_id: FileId) -> Result<PageWriteGuard<'_>> {
        let frame_id = self.get_free_frame()?;

        let allocated = {
            let mut files = self.files.lock();
            match files.get_mut(&file_id) {
                Some(dm) => dm.allocate_page(),
                None => Err(Error::UnknownFile(file_id)),
            }
        };
        let page_id = match allocated {
            Ok(page_id) => page_id,
            Err(e) => {
                self.free_list.lock().push(frame_id);
                return Err(e);
            }
        };
        BufferPoolStats::bump(&self.stats.pages_allocated);

        let frame = &self.frames[frame_id.0];
        frame.page_mut().reset();
        frame.occupy(file_id, page_id);

        self.page_table.write().insert((file_id, page_id), frame_id);
        {
            let mut replacer = self.replacer.lock();
            replacer.record_access(frame_id);
            replacer.set_evictable(frame_id, false);
        }

        let lock = frame.page_mut();
        Ok(PageWriteGuard::new(self, frame_id, file_id, page_id, lock))
    }

    // ========================================================================
    // Explicit pins
    // ========================================================================

    /// Pin a page without borrowing it. Pair with [`unpin_page`](Self::unpin_page).
    pub fn pin_page(&self, file_id: FileId, page_id: PageId) -> Result<()> {
        self.fetch_page_internal(file_id, page_id).map(|_| ())
    }

    /// Release one pin on a page.
    ///
    /// # Errors
    /// `Error::PageNotPinned` if the page is not resident or its pin count
    /// is already zero.
    pub fn unpin_page(&self, file_id: FileId, page_id: PageId, is_dirty: bool) -> Result<()> {
        let frame_id = self
            .page_table
            .read()
            .get(&(file_id, page_id))
            .copied()
            .ok_or(Error::PageNotPinned {
                file: file_id,
                page: page_id,
            })?;

        let frame = &self.frames[frame_id.0];
        if is_dirty {
            frame.mark_dirty();
        }
        match frame.try_unpin() {
            Some(0) => {
                self.replacer.lock().set_evictable(frame_id, true);
                Ok(())
            }
            Some(_) => Ok(()),
            None => {
                BufferPoolStats::bump(&self.stats.stray_unpins);
                Err(Error::PageNotPinned {
                    file: file_id,
                    page: page_id,
                })
            }
        }
    }

    /// Current pin count of a resident page, `None` if not resident.
    pub fn get_pin_count(&self, file_id: FileId, page_id: PageId) -> Option<u32> {
        let frame_id = self.page_table.read().get(&(file_id, page_id)).copied()?;
        Some(self.frames[frame_id.0].pin_count())
    }

    // ========================================================================
    // Flush pages
    // ========================================================================

    /// Flush a specific page to disk if it's dirty.
    pub fn flush_page(&self, file_id: FileId, page_id: PageId) -> Result<()> {
        let frame_id = match self.page_table.read().get(&(file_id, page_id)) {
            Some(&fid) => fid,
            None => return Ok(()),
        };

        self.flush_frame(frame_id, file_id, page_id)
    }

    /// Flush every dirty resident page of one file.
    pub fn flush_file(&self, file_id: FileId) -> Result<()> {
        if !self.files.lock().contains_key(&file_id) {
            return Err(Error::UnknownFile(file_id));
        }

        for (page_id, frame_id) in self.resident_pages(file_id) {
            self.flush_frame(frame_id, file_id, page_id)?;
        }
        Ok(())
    }

    /// Flush all dirty pages of all files.
    pub fn flush_all_pages(&self) -> Result<()> {
        let pages: Vec<((FileId, PageId), FrameId)> = {
            let pt = self.page_table.read();
            pt.iter().map(|(&key, &fid)| (key, fid)).collect()
        };

        for ((file_id, page_id), frame_id) in pages {
            self.flush_frame(frame_id, file_id, page_id)?;
        }
        Ok(())
    }

    // ========================================================================
    // Stats and info
    // ========================================================================

    pub fn stats(&self) -> &BufferPoolStats {
        &self.stats
    }

    pub fn pool_size(&self) -> usize {
        self.pool_size
    }

    pub fn free_frame_count(&self) -> usize {
        self.free_list.lock().len()
    }

    /// Number of pages resident in the pool.
    pub fn page_count(&self) -> usize {
        self.page_table.read().len()
    }

    // ========================================================================
    // Internal: Called by page guards on drop
    // ========================================================================

    /// Unpin a frame. A frame that is already unpinned is logged, not fatal.
    pub(crate) fn unpin_page_internal(&self, frame_id: FrameId, is_dirty: bool) {
        let frame = &self.frames[frame_id.0];

        if is_dirty {
            frame.mark_dirty();
        }

        match frame.try_unpin() {
            Some(0) => self.replacer.lock().set_evictable(frame_id, true),
            Some(_) => {}
            None => {
                BufferPoolStats::bump(&self.stats.stray_unpins);
                tracing::warn!(%frame_id, "guard released a frame that was not pinned");
            }
        }
    }

    // ========================================================================
    // Internal: Core fetch logic
    // ========================================================================

    fn fetch_page_internal(&self, file_id: FileId, page_id: PageId) -> Result<FrameId> {
        {
            let pt = self.page_table.read();
            if let Some(&frame_id) = pt.get(&(file_id, page_id)) {
                self.handle_cache_hit(frame_id);
                return Ok(frame_id);
            }
        }

        self.handle_cache_miss(file_id, page_id)
    }

    fn handle_cache_hit(&self, frame_id: FrameId) {
        self.frames[frame_id.0].pin();
        {
            let mut replacer = self.replacer.lock();
            replacer.record_access(frame_id);
            replacer.set_evictable(frame_id, false);
        }
        BufferPoolStats::bump(&self.stats.cache_hits);
    }

    fn handle_cache_miss(&self, file_id: FileId, page_id: PageId) -> Result<FrameId> {
        BufferPoolStats::bump(&self.stats.cache_misses);

        let frame_id = self.get_free_frame()?;

        let loaded = {
            let mut files = self.files.lock();
            match files.get_mut(&file_id) {
                Some(dm) => dm.read_page(page_id),
                None => Err(Error::UnknownFile(file_id)),
            }
        };
        let page_data = match loaded {
            Ok(page) if page.verify_checksum() => page,
            Ok(_) => {
                self.free_list.lock().push(frame_id);
                return Err(Error::ChecksumMismatch {
                    file: file_id,
                    page: page_id,
                });
            }
            Err(e) => {
                self.free_list.lock().push(frame_id);
                return Err(e);
            }
        };
        BufferPoolStats::bump(&self.stats.pages_read);

        let frame = &self.frames[frame_id.0];
        frame
            .page_mut()
            .as_mut_slice()
            .copy_from_slice(page_data.as_slice());
        frame.occupy(file_id, page_id);

        self.page_table.write().insert((file_id, page_id), frame_id);
        {
            let mut replacer = self.replacer.lock();
            replacer.record_access(frame_id);
            replacer.set_evictable(frame_id, false);
        }

        Ok(frame_id)
    }

    // ========================================================================
    // Internal: Frame allocation and eviction
    // ========================================================================

    fn get_free_frame(&self) -> Result<FrameId> {
        if let Some(frame_id) = self.free_list.lock().pop() {
            return Ok(frame_id);
        }

        self.evict_page()
    }

    fn evict_page(&self) -> Result<FrameId> {
        let frame_id = self.replacer.lock().evict().ok_or(Error::NoFreeFrames)?;

        BufferPoolStats::bump(&self.stats.evictions);

        let frame = &self.frames[frame_id.0];
        if let Some((file_id, page_id)) = frame.resident() {
            tracing::trace!(%frame_id, %file_id, %page_id, "evicting page");
            if let Err(e) = self.flush_frame(frame_id, file_id, page_id) {
                // Keep the victim resident so its contents are not lost.
                self.replacer.lock().record_access(frame_id);
                self.replacer.lock().set_evictable(frame_id, true);
                return Err(e);
            }
            self.page_table.write().remove(&(file_id, page_id));
        }

        frame.vacate();

        Ok(frame_id)
    }

    /// Write a frame back to its file if dirty, stamping its checksum first.
    fn flush_frame(&self, frame_id: FrameId, file_id: FileId, page_id: PageId) -> Result<()> {
        let frame = &self.frames[frame_id.0];

        if !frame.is_dirty() {
            return Ok(());
        }

        let mut page = frame.page_mut();
        page.update_checksum();
        {
            let mut files = self.files.lock();
            match files.get_mut(&file_id) {
                Some(dm) => dm.write_page(page_id, &page)?,
                None => {
                    tracing::warn!(%file_id, %page_id, "dropping dirty page of a closed file");
                }
            }
        }
        drop(page);

        tracing::trace!(%file_id, %page_id, "wrote back page");
        frame.clear_dirty();
        BufferPoolStats::bump(&self.stats.pages_written);

        Ok(())
    }

    /// `(page, frame)` pairs of one file currently in the pool.
    fn resident_pages(&self, file_id: FileId) -> Vec<(PageId, FrameId)> {
        let pt = self.page_table.read();
        let mut pages: Vec<(PageId, FrameId)> = pt
            .iter()
            .filter(|((fid, _), _)| *fid == file_id)
            .map(|(&(_, page_id), &frame_id)| (page_id, frame_id))
            .collect();
        pages.sort_by_key(|(page_id, _)| *page_id);
        pages
    }
}
