//! Insertion with cascading splits.
//!
//! ```text
//!   descend (read guards)      leaf insert           unwind path (write guards)
//!  root ─▶ ... ─▶ parent ─▶ leaf ── full? ──▶ split ─▶ parent.insert(slot, sep, new)
//!   │ path: [(root, slot), ..., (parent, slot)]         │ full? split, pop, repeat
//!   └──────────────────────────────────────────────────▶ path empty: grow root
//! ```
//!
//! The path keeps each ancestor's page id and the child slot taken from
//! it. A split child's new sibling goes directly right of that slot, so
//! parent order and sibling-chain order agree even among equal keys. Each
//! node is latched for the one step that reads or rewrites it.

use std::sync::Arc;

use crate::buffer::BufferPoolManager;
use crate::common::{Error, PageId, RecordId, Result};
use crate::relation::decode_int_attr;
use crate::storage::page::PageType;

use super::index::BTreeIndex;
use super::node::{expect_page_type, InternalNode, LeafNode};

impl BTreeIndex {
    /// Insert the key found at the index's attribute offset of `record`.
    ///
    /// A record too short to hold the attribute has no key; it is skipped
    /// and `Ok(false)` is returned.
    pub fn insert_record(&mut self, record: &[u8], rid: RecordId) -> Result<bool> {
        match decode_int_attr(record, self.attr_offset) {
            Some(key) => {
                self.insert_entry(key, rid)?;
                Ok(true)
            }
            None => {
                tracing::debug!(
                    %rid,
                    record_len = record.len(),
                    attr_offset = self.attr_offset,
                    "record has no key, skipped"
                );
                Ok(false)
            }
        }
    }

    /// Insert `(key, rid)`. Equal keys are kept; the newest sorts first.
    ///
    /// # Errors
    /// `Error::InvalidRecordId` if `rid` does not point at a page.
    pub fn insert_entry(&mut self, key: i32, rid: RecordId) -> Result<()> {
        if !rid.is_valid() {
            return Err(Error::InvalidRecordId(rid));
        }
        let bpm = Arc::clone(&self.bpm);
        let file_id = self.file_id;
        let internal_capacity = self.layout.internal_capacity;

        let mut path: Vec<(PageId, usize)> = Vec::new();
        let mut page_id = self.root_page_id;
        let leaf_id = loop {
            let guard = bpm.fetch_page_read(file_id, page_id)?;
            expect_page_type(&guard, page_id, PageType::BTreeInternal)?;
            let node = InternalNode::new(guard.as_slice(), internal_capacity);

            if node.is_empty() {
                drop(guard);
                path.push((page_id, 1));
                break self.bootstrap(&bpm, page_id, key)?;
            }
            let slot = node.insert_child_index(key);
            path.push((page_id, slot));
            let child = node.child(slot);
            if node.is_above_leaves() {
                break child;
            }
            page_id = child;
        };

        let Some((mut separator, mut new_child)) = self.insert_into_leaf(&bpm, leaf_id, key, rid)?
        else {
            return Ok(());
        };

        while let Some((parent_id, slot)) = path.pop() {
            match self.insert_into_internal(&bpm, parent_id, slot, separator, new_child)? {
                None => return Ok(()),
                Some((promoted, right_id)) => {
                    separator = promoted;
                    new_child = right_id;
                }
            }
        }

        self.grow_root(&bpm, separator, new_child)
    }

    /// Give an empty root its first two leaves, split at `key`, and return
    /// the right one as the insertion target.
    fn bootstrap(&self, bpm: &BufferPoolManager, root_id: PageId, key: i32) -> Result<PageId> {
        let leaf_capacity = self.layout.leaf_capacity;

        let mut root_guard = bpm.fetch_page_write(self.file_id, root_id)?;
        let mut left_guard = bpm.new_page(self.file_id)?;
        let mut right_guard = bpm.new_page(self.file_id)?;
        let left_id = left_guard.page_id();
        let right_id = right_guard.page_id();

        LeafNode::init(left_guard.as_mut_slice(), leaf_capacity).set_right_sibling(right_id);
        LeafNode::init(right_guard.as_mut_slice(), leaf_capacity);

        let mut root = InternalNode::new(root_guard.as_mut_slice(), self.layout.internal_capacity);
        root.set_child(0, left_id);
        root.set_key(0, key);
        root.set_child(1, right_id);

        tracing::debug!(root = %root_id, left = %left_id, right = %right_id, key, "bootstrapped first leaves");
        Ok(right_id)
    }

    /// Insert into a leaf, splitting it when full. Returns the separator
    /// and new right leaf to push into the parent, if a split happened.
    fn insert_into_leaf(
        &self,
        bpm: &BufferPoolManager,
        leaf_id: PageId,
        key: i32,
        rid: RecordId,
    ) -> Result<Option<(i32, PageId)>> {
        let leaf_capacity = self.layout.leaf_capacity;

        let mut guard = bpm.fetch_page_write(self.file_id, leaf_id)?;
        expect_page_type(&guard, leaf_id, PageType::BTreeLeaf)?;
        let mut leaf = LeafNode::new(guard.as_mut_slice(), leaf_capacity);
        if leaf.insert(key, rid) {
            return Ok(None);
        }

        let mut right_guard = bpm.new_page(self.file_id)?;
        let right_id = right_guard.page_id();
        let mut right = LeafNode::init(right_guard.as_mut_slice(), leaf_capacity);
        let separator = leaf.split_into(&mut right, right_id, key, rid);

        tracing::debug!(leaf = %leaf_id, new_leaf = %right_id, separator, "split leaf");
        Ok(Some((separator, right_id)))
    }

    /// Insert a separator and new child right of child `slot`, splitting
    /// the node when full. Returns the promoted key and new right node, if
    /// a split happened.
    fn insert_into_internal(
        &self,
        bpm: &BufferPoolManager,
        node_id: PageId,
        slot: usize,
        separator: i32,
        child: PageId,
    ) -> Result<Option<(i32, PageId)>> {
        let internal_capacity = self.layout.internal_capacity;

        let mut guard = bpm.fetch_page_write(self.file_id, node_id)?;
        expect_page_type(&guard, node_id, PageType::BTreeInternal)?;
        let mut node = InternalNode::new(guard.as_mut_slice(), internal_capacity);
        if node.insert(slot, separator, child) {
            return Ok(None);
        }

        let mut right_guard = bpm.new_page(self.file_id)?;
        let right_id = right_guard.page_id();
        let mut right =
            InternalNode::init(right_guard.as_mut_slice(), internal_capacity, node.is_above_leaves());
        let promoted = node.split_into(&mut right, slot, separator, child);

        tracing::debug!(node = %node_id, new_node = %right_id, promoted, "split internal node");
        Ok(Some((promoted, right_id)))
    }

    /// The old root split: put a new root above it and its new sibling.
    fn grow_root(&mut self, bpm: &BufferPoolManager, separator: i32, right: PageId) -> Result<()> {
        let old_root = self.root_page_id;
        let new_root = {
            let mut guard = bpm.new_page(self.file_id)?;
            let new_root = guard.page_id();
            let mut root =
                InternalNode::init(guard.as_mut_slice(), self.layout.internal_capacity, false);
            root.set_child(0, old_root);
            root.set_key(0, separator);
            root.set_child(1, right);
            new_root
        };

        self.root_page_id = new_root;
        self.persist_root()?;
        tracing::debug!(old_root = %old_root, new_root = %new_root, separator, "grew root");
        Ok(())
    }
}
