//! The index handle: open/create, bulk load, inspection and teardown.

use std::fs;
use std::sync::Arc;

use crate::buffer::BufferPoolManager;
use crate::common::config::{IndexConfig, MAX_RELATION_NAME_LEN};
use crate::common::{Datatype, Error, FileId, PageId, Result};
use crate::relation::Relation;
use crate::storage::page::PageType;
use crate::storage::DiskManager;

use super::meta::{IndexMeta, META_PAGE_ID};
use super::node::{expect_page_type, InternalNode, LeafNode, NodeLayout};
use super::scan::ScanState;

/// A B+-tree secondary index over one integer attribute of a relation.
///
/// The tree lives in its own page file, `<relation>.<attr_offset>` under the
/// configured data directory, and is read and written through a shared
/// [`BufferPoolManager`].
///
/// A handle is not meant to be shared between threads: every operation
/// takes `&mut self` or runs to completion before the next begins.
///
/// # Example
/// ```no_run
/// use std::sync::Arc;
/// use leafline::{BTreeIndex, BufferPoolManager, Datatype, IndexConfig, MemoryRelation, Operator};
///
/// let config = IndexConfig::default();
/// let bpm = Arc::new(BufferPoolManager::new(config.pool_size));
///
/// let mut relation = MemoryRelation::new("emp");
/// relation.push_int(0, 42, 16);
///
/// let mut index = BTreeIndex::open_or_create(bpm, &config, &relation, 0, Datatype::Integer)?;
/// let rids = index.scan_range(0, Operator::Gte, 100, Operator::Lt)?;
/// assert_eq!(rids.len(), 1);
/// # Ok::<(), leafline::Error>(())
/// ```
pub struct BTreeIndex {
    pub(super) bpm: Arc<BufferPoolManager>,
    pub(super) file_id: FileId,
    index_name: String,
    relation_name: String,
    pub(super) attr_offset: usize,
    attr_type: Datatype,
    pub(super) root_page_id: PageId,
    pub(super) layout: NodeLayout,
    pub(super) scan: Option<ScanState>,
}

impl BTreeIndex {
    /// Open the index on `relation` at `attr_offset`, creating and
    /// bulk-loading it if its file does not exist yet.
    ///
    /// # Errors
    /// - `Error::BadIndexInfo` if an existing file was built for a different
    ///   relation, offset or datatype
    /// - `Error::UnsupportedDatatype` when creating over a non-integer
    ///   attribute
    /// - `Error::RelationNameTooLong` if the name cannot be stored
    pub fn open_or_create<R>(
        bpm: Arc<BufferPoolManager>,
        config: &IndexConfig,
        relation: &R,
        attr_offset: usize,
        attr_type: Datatype,
    ) -> Result<Self>
    where
        R: Relation + ?Sized,
    {
        let relation_name = relation.name();
        if relation_name.len() > MAX_RELATION_NAME_LEN {
            return Err(Error::RelationNameTooLong {
                len: relation_name.len(),
                max: MAX_RELATION_NAME_LEN,
            });
        }
        let stored_offset = u32::try_from(attr_offset).map_err(|_| Error::BadIndexInfo {
            index: relation_name.to_string(),
            reason: format!("attribute offset {attr_offset} does not fit in 32 bits"),
        })?;

        let index_name = index_file_name(relation_name, attr_offset);
        fs::create_dir_all(&config.data_dir)?;
        let path = config.data_dir.join(&index_name);

        match DiskManager::create(&path) {
            Ok(disk_manager) => {
                if attr_type != Datatype::Integer {
                    drop(disk_manager);
                    fs::remove_file(&path)?;
                    return Err(Error::UnsupportedDatatype(attr_type));
                }
                let file_id = bpm.register_file(disk_manager);
                let meta = IndexMeta {
                    relation_name: relation_name.to_string(),
                    attr_offset: stored_offset,
                    attr_type,
                    root_page_id: PageId::INVALID,
                    layout: config.layout,
                };
                let mut index = Self::create(bpm, file_id, index_name, meta)?;
                index.bulk_load(relation)?;
                Ok(index)
            }
            Err(Error::FileExists(_)) => {
                let disk_manager = DiskManager::open(&path)?;
                let file_id = bpm.register_file(disk_manager);
                Self::open(bpm, file_id, index_name, relation_name, stored_offset, attr_type)
            }
            Err(e) => Err(e),
        }
    }

    /// Lay out a fresh file: metadata page, then an empty root one level
    /// above the (not yet existing) leaves.
    fn create(
        bpm: Arc<BufferPoolManager>,
        file_id: FileId,
        index_name: String,
        mut meta: IndexMeta,
    ) -> Result<Self> {
        let setup = (|| -> Result<PageId> {
            let mut meta_guard = bpm.new_page(file_id)?;
            let mut root_guard = bpm.new_page(file_id)?;
            let root_page_id = root_guard.page_id();
            debug_assert_eq!(meta_guard.page_id(), META_PAGE_ID);

            InternalNode::init(root_guard.as_mut_slice(), meta.layout.internal_capacity, true);
            meta.root_page_id = root_page_id;
            meta.write_to(meta_guard.as_mut_slice())?;
            Ok(root_page_id)
        })();
        let root_page_id = match setup {
            Ok(root_page_id) => root_page_id,
            Err(e) => {
                close_quietly(&bpm, file_id);
                return Err(e);
            }
        };

        tracing::info!(
            index = %index_name,
            root = %root_page_id,
            leaf_capacity = meta.layout.leaf_capacity,
            internal_capacity = meta.layout.internal_capacity,
            "created index"
        );

        Ok(Self {
            bpm,
            file_id,
            index_name,
            relation_name: meta.relation_name,
            attr_offset: meta.attr_offset as usize,
            attr_type: meta.attr_type,
            root_page_id,
            layout: meta.layout,
            scan: None,
        })
    }

    /// Adopt an existing file after checking it was built for this request.
    fn open(
        bpm: Arc<BufferPoolManager>,
        file_id: FileId,
        index_name: String,
        relation_name: &str,
        attr_offset: u32,
        attr_type: Datatype,
    ) -> Result<Self> {
        let meta = {
            let read = bpm
                .fetch_page_read(file_id, META_PAGE_ID)
                .and_then(|guard| IndexMeta::read_from(&index_name, guard.as_slice()));
            match read {
                Ok(meta) => meta,
                Err(e) => {
                    close_quietly(&bpm, file_id);
                    return Err(e);
                }
            }
        };

        if let Some(reason) = meta.mismatch(relation_name, attr_offset, attr_type) {
            close_quietly(&bpm, file_id);
            return Err(Error::BadIndexInfo {
                index: index_name,
                reason,
            });
        }

        tracing::info!(index = %index_name, root = %meta.root_page_id, "opened existing index");

        Ok(Self {
            bpm,
            file_id,
            index_name,
            relation_name: meta.relation_name,
            attr_offset: meta.attr_offset as usize,
            attr_type: meta.attr_type,
            root_page_id: meta.root_page_id,
            layout: meta.layout,
            scan: None,
        })
    }

    /// Insert every record of `relation`.
    fn bulk_load<R>(&mut self, relation: &R) -> Result<()>
    where
        R: Relation + ?Sized,
    {
        let mut scan = relation.scan()?;
        let mut loaded = 0usize;
        while let Some((rid, record)) = scan.next_record()? {
            if self.insert_record(&record, rid)? {
                loaded += 1;
            }
        }
        tracing::info!(index = %self.index_name, records = loaded, "bulk load complete");
        Ok(())
    }

    /// Store a new root in the metadata page.
    pub(super) fn persist_root(&self) -> Result<()> {
        let mut guard = self.bpm.fetch_page_write(self.file_id, META_PAGE_ID)?;
        IndexMeta::write_root(guard.as_mut_slice(), self.root_page_id);
        Ok(())
    }

    // ========================================================================
    // Inspection
    // ========================================================================

    /// File name of the index, `<relation>.<attr_offset>`.
    pub fn index_name(&self) -> &str {
        &self.index_name
    }

    pub fn relation_name(&self) -> &str {
        &self.relation_name
    }

    pub fn attr_offset(&self) -> usize {
        self.attr_offset
    }

    pub fn attr_type(&self) -> Datatype {
        self.attr_type
    }

    pub fn root_page_id(&self) -> PageId {
        self.root_page_id
    }

    pub fn layout(&self) -> NodeLayout {
        self.layout
    }

    /// File id of the index inside its buffer pool.
    pub fn file_id(&self) -> FileId {
        self.file_id
    }

    /// True while a range scan is active.
    pub fn is_scanning(&self) -> bool {
        self.scan.is_some()
    }

    /// Number of levels, counting the leaves. A tree with no entries yet
    /// has height 1 (just the root).
    pub fn height(&self) -> Result<u32> {
        let mut height = 1;
        let mut page_id = self.root_page_id;
        loop {
            let guard = self.bpm.fetch_page_read(self.file_id, page_id)?;
            expect_page_type(&guard, page_id, PageType::BTreeInternal)?;
            let node = InternalNode::new(guard.as_slice(), self.layout.internal_capacity);
            if node.is_empty() {
                return Ok(height);
            }
            height += 1;
            if node.is_above_leaves() {
                return Ok(height);
            }
            page_id = node.child(0);
        }
    }

    /// Keys of every leaf, following the sibling chain from the leftmost.
    pub fn leaf_chain(&self) -> Result<Vec<Vec<i32>>> {
        let mut page_id = self.root_page_id;
        let leftmost = loop {
            let guard = self.bpm.fetch_page_read(self.file_id, page_id)?;
            expect_page_type(&guard, page_id, PageType::BTreeInternal)?;
            let node = InternalNode::new(guard.as_slice(), self.layout.internal_capacity);
            let first = node.child(0);
            if !first.is_valid() || node.is_above_leaves() {
                break first;
            }
            page_id = first;
        };

        let mut chain = Vec::new();
        let mut page_id = leftmost;
        while page_id.is_valid() {
            let guard = self.bpm.fetch_page_read(self.file_id, page_id)?;
            expect_page_type(&guard, page_id, PageType::BTreeLeaf)?;
            let leaf = LeafNode::new(guard.as_slice(), self.layout.leaf_capacity);
            chain.push(leaf.keys());
            page_id = leaf.right_sibling();
        }
        Ok(chain)
    }
}

impl Drop for BTreeIndex {
    fn drop(&mut self) {
        if let Some(scan) = self.scan.take() {
            if scan.leaf.is_valid() {
                release_pin(&self.bpm, self.file_id, scan.leaf);
            }
        }
        if let Err(e) = self.bpm.flush_file(self.file_id) {
            tracing::warn!(index = %self.index_name, error = %e, "flush on close failed");
        }
        match self.bpm.close_file(self.file_id) {
            Ok(()) => tracing::info!(index = %self.index_name, "closed index"),
            Err(e) => tracing::warn!(index = %self.index_name, error = %e, "close failed"),
        }
    }
}

/// `<relation>.<attr_offset>`
pub fn index_file_name(relation_name: &str, attr_offset: usize) -> String {
    format!("{relation_name}.{attr_offset}")
}

/// Drop one explicit pin, downgrading failure to a warning.
pub(super) fn release_pin(bpm: &BufferPoolManager, file_id: FileId, page_id: PageId) {
    if let Err(e) = bpm.unpin_page(file_id, page_id, false) {
        tracing::warn!(%file_id, %page_id, error = %e, "ignoring failed page release");
    }
}

fn close_quietly(bpm: &BufferPoolManager, file_id: FileId) {
    if let Err(e) = bpm.close_file(file_id) {
        tracing::warn!(%file_id, error = %e, "failed to close index file");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::relation::MemoryRelation;
    use tempfile::tempdir;

    fn config(dir: &std::path::Path) -> IndexConfig {
        IndexConfig::default()
            .with_data_dir(dir)
            .with_layout(NodeLayout::new(4, 3).unwrap())
    }

    #[test]
    fn test_index_file_name() {
        assert_eq!(index_file_name("emp", 12), "emp.12");
    }

    #[test]
    fn test_create_empty_index() {
        let dir = tempdir().unwrap();
        let bpm = Arc::new(BufferPoolManager::new(8));
        let relation = MemoryRelation::new("empty");

        let index =
            BTreeIndex::open_or_create(bpm, &config(dir.path()), &relation, 0, Datatype::Integer)
                .unwrap();

        assert_eq!(index.index_name(), "empty.0");
        assert_eq!(index.root_page_id(), PageId::new(1));
        assert_eq!(index.height().unwrap(), 1);
        assert!(index.leaf_chain().unwrap().is_empty());
        assert!(dir.path().join("empty.0").exists());
    }

    #[test]
    fn test_create_rejects_non_integer_attribute() {
        let dir = tempdir().unwrap();
        let bpm = Arc::new(BufferPoolManager::new(8));
        let relation = MemoryRelation::new("prices");

        let result =
            BTreeIndex::open_or_create(bpm, &config(dir.path()), &relation, 8, Datatype::Double);

        assert!(matches!(result, Err(Error::UnsupportedDatatype(Datatype::Double))));
        assert!(!dir.path().join("prices.8").exists());
    }

    #[test]
    fn test_drop_closes_file() {
        let dir = tempdir().unwrap();
        let bpm = Arc::new(BufferPoolManager::new(8));
        let mut relation = MemoryRelation::new("emp");
        relation.push_int(0, 7, 8);

        let index = BTreeIndex::open_or_create(
            Arc::clone(&bpm),
            &config(dir.path()),
            &relation,
            0,
            Datatype::Integer,
        )
        .unwrap();
        let file_id = index.file_id();
        drop(index);

        assert!(matches!(bpm.flush_file(file_id), Err(Error::UnknownFile(_))));
        assert_eq!(bpm.page_count(), 0);
    }
}
