//! Range scans over the leaf chain.
//!
//! A scan is `Idle → Scanning → Idle`. While scanning, the leaf under the
//! cursor stays pinned in the buffer pool through an explicit pin, so it
//! cannot be evicted between calls to [`BTreeIndex::scan_next`].

use std::sync::Arc;

use crate::common::{Error, Operator, PageId, RecordId, Result};
use crate::storage::page::PageType;

use super::index::{release_pin, BTreeIndex};
use super::node::{expect_page_type, InternalNode, LeafNode};

/// Cursor and predicate of an active scan.
#[derive(Debug, Clone)]
pub(crate) struct ScanState {
    /// Pinned leaf under the cursor; `PageId::INVALID` once the chain is
    /// exhausted (nothing pinned).
    pub(crate) leaf: PageId,
    /// Next candidate slot in `leaf`.
    pub(crate) slot: usize,
    low: i32,
    low_op: Operator,
    high: i32,
    high_op: Operator,
}

impl BTreeIndex {
    /// Begin a scan over keys `k` with `k <low_op> low` and `k <high_op> high`.
    ///
    /// An active scan is ended first, but only once the new predicate has
    /// been validated.
    ///
    /// # Errors
    /// - `Error::BadOpcodes` unless `low_op` is `Gt`/`Gte` and `high_op` is
    ///   `Lt`/`Lte`
    /// - `Error::BadScanRange` if `low > high`
    pub fn start_scan(
        &mut self,
        low: i32,
        low_op: Operator,
        high: i32,
        high_op: Operator,
    ) -> Result<()> {
        if !low_op.is_lower_bound() || !high_op.is_upper_bound() {
            return Err(Error::BadOpcodes {
                low: low_op,
                high: high_op,
            });
        }
        if low > high {
            return Err(Error::BadScanRange { low, high });
        }
        if self.scan.is_some() {
            self.end_scan()?;
        }

        let bpm = Arc::clone(&self.bpm);
        let leaf_capacity = self.layout.leaf_capacity;

        let mut page_id = self.root_page_id;
        let leaf_id = loop {
            let guard = bpm.fetch_page_read(self.file_id, page_id)?;
            expect_page_type(&guard, page_id, PageType::BTreeInternal)?;
            let node = InternalNode::new(guard.as_slice(), self.layout.internal_capacity);
            if node.is_empty() {
                break PageId::INVALID;
            }
            let child = node.child(node.scan_child_index(low));
            if node.is_above_leaves() {
                break child;
            }
            page_id = child;
        };

        let slot = if leaf_id.is_valid() {
            let guard = bpm.fetch_page_read(self.file_id, leaf_id)?;
            expect_page_type(&guard, leaf_id, PageType::BTreeLeaf)?;
            let leaf = LeafNode::new(guard.as_slice(), leaf_capacity);
            let slot = match low_op {
                Operator::Gt => leaf.upper_bound(low),
                _ => leaf.lower_bound(low),
            };
            drop(guard);
            bpm.pin_page(self.file_id, leaf_id)?;
            slot
        } else {
            0
        };

        tracing::debug!(
            index = %self.index_name(),
            %low_op,
            low,
            %high_op,
            high,
            leaf = %leaf_id,
            slot,
            "scan started"
        );
        self.scan = Some(ScanState {
            leaf: leaf_id,
            slot,
            low,
            low_op,
            high,
            high_op,
        });
        Ok(())
    }

    /// Record id of the next qualifying entry.
    ///
    /// # Errors
    /// - `Error::ScanNotInitialized` if no scan is active
    /// - `Error::IndexScanCompleted` when no further entry qualifies
    pub fn scan_next(&mut self) -> Result<RecordId> {
        let bpm = Arc::clone(&self.bpm);
        let file_id = self.file_id;
        let leaf_capacity = self.layout.leaf_capacity;
        let state = self.scan.as_mut().ok_or(Error::ScanNotInitialized)?;

        loop {
            if !state.leaf.is_valid() {
                return Err(Error::IndexScanCompleted);
            }

            let guard = bpm.fetch_page_read(file_id, state.leaf)?;
            let leaf = LeafNode::new(guard.as_slice(), leaf_capacity);

            if state.slot >= leaf_capacity {
                let sibling = leaf.right_sibling();
                drop(guard);
                release_pin(&bpm, file_id, state.leaf);
                state.leaf = PageId::INVALID;
                if !sibling.is_valid() {
                    return Err(Error::IndexScanCompleted);
                }
                bpm.pin_page(file_id, sibling)?;
                state.leaf = sibling;
                state.slot = 0;
                continue;
            }

            if !leaf.is_occupied(state.slot) {
                state.slot = leaf_capacity;
                continue;
            }

            let key = leaf.key(state.slot);
            if !state.low_op.admits(key, state.low) {
                state.slot += 1;
                continue;
            }
            if !state.high_op.admits(key, state.high) {
                return Err(Error::IndexScanCompleted);
            }

            let rid = leaf.rid(state.slot);
            state.slot += 1;
            return Ok(rid);
        }
    }

    /// Finish the active scan and release its leaf.
    ///
    /// # Errors
    /// `Error::ScanNotInitialized` if no scan is active.
    pub fn end_scan(&mut self) -> Result<()> {
        let state = self.scan.take().ok_or(Error::ScanNotInitialized)?;
        if state.leaf.is_valid() {
            release_pin(&self.bpm, self.file_id, state.leaf);
        }
        tracing::debug!(index = %self.index_name(), "scan ended");
        Ok(())
    }

    /// Run a whole scan and collect the record ids, in key order.
    pub fn scan_range(
        &mut self,
        low: i32,
        low_op: Operator,
        high: i32,
        high_op: Operator,
    ) -> Result<Vec<RecordId>> {
        self.start_scan(low, low_op, high, high_op)?;
        let mut rids = Vec::new();
        let result = loop {
            match self.scan_next() {
                Ok(rid) => rids.push(rid),
                Err(e) if e.is_scan_completed() => break Ok(rids),
                Err(e) => break Err(e),
            }
        };
        self.end_scan()?;
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::buffer::BufferPoolManager;
    use crate::common::config::IndexConfig;
    use crate::common::Datatype;
    use crate::index::btree::NodeLayout;
    use crate::relation::MemoryRelation;
    use tempfile::{tempdir, TempDir};

    fn index_with(keys: &[i32]) -> (BTreeIndex, TempDir) {
        let dir = tempdir().unwrap();
        let config = IndexConfig::default()
            .with_data_dir(dir.path())
            .with_layout(NodeLayout::new(4, 3).unwrap());
        let mut relation = MemoryRelation::new("s");
        for k in keys {
            relation.push_int(0, *k, 4);
        }
        let bpm = Arc::new(BufferPoolManager::new(16));
        let index =
            BTreeIndex::open_or_create(bpm, &config, &relation, 0, Datatype::Integer).unwrap();
        (index, dir)
    }

    #[test]
    fn test_scan_on_empty_tree_completes() {
        let (mut index, _dir) = index_with(&[]);

        index.start_scan(0, Operator::Gte, 10, Operator::Lte).unwrap();
        assert!(matches!(index.scan_next(), Err(Error::IndexScanCompleted)));
        index.end_scan().unwrap();
    }

    #[test]
    fn test_scan_pins_one_leaf() {
        let keys: Vec<i32> = (0..20).collect();
        let (mut index, _dir) = index_with(&keys);
        let bpm = Arc::clone(&index.bpm);

        index.start_scan(0, Operator::Gte, 19, Operator::Lte).unwrap();
        let leaf = index.scan.as_ref().unwrap().leaf;
        assert_eq!(bpm.get_pin_count(index.file_id(), leaf), Some(1));

        index.end_scan().unwrap();
        assert_eq!(bpm.get_pin_count(index.file_id(), leaf), Some(0));
    }

    #[test]
    fn test_exhausted_chain_leaves_nothing_pinned() {
        let keys: Vec<i32> = (0..10).collect();
        let (mut index, _dir) = index_with(&keys);

        index.start_scan(0, Operator::Gte, 100, Operator::Lte).unwrap();
        let mut count = 0;
        while index.scan_next().is_ok() {
            count += 1;
        }
        assert_eq!(count, 10);
        assert_eq!(index.scan.as_ref().unwrap().leaf, PageId::INVALID);
        assert!(matches!(index.scan_next(), Err(Error::IndexScanCompleted)));
        index.end_scan().unwrap();
        assert_eq!(index.bpm.stats().snapshot().stray_unpins, 0);
    }

    #[test]
    fn test_gt_skips_equal_low_key() {
        let (mut index, _dir) = index_with(&[1, 2, 3]);

        let rids = index.scan_range(1, Operator::Gt, 3, Operator::Lte).unwrap();
        assert_eq!(rids.len(), 2);
        assert!(!index.is_scanning());
    }
}
