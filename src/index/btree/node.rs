//! B+-tree node codec and mutators.
//!
//! Nodes are views over the raw bytes of one page. Nothing is copied out:
//! [`LeafNode`] and [`InternalNode`] wrap `&[u8]` for reads and `&mut [u8]`
//! for writes, and interpret the bytes with the capacities of a
//! [`NodeLayout`].
//!
//! # Leaf layout
//! ```text
//! ┌─────────────┬───────────────┬──────────────┬──────────────────────┐
//! │ PageHeader  │ right_sibling │ keys[M] i32  │ rids[M] (u32, u16)   │
//! │ (13 bytes)  │ u32           │              │                      │
//! └─────────────┴───────────────┴──────────────┴──────────────────────┘
//! ```
//!
//! # Internal layout
//! ```text
//! ┌─────────────┬──────────┬──────────────┬────────────────────┐
//! │ PageHeader  │ level u8 │ keys[N] i32  │ children[N+1] u32  │
//! └─────────────┴──────────┴──────────────┴────────────────────┘
//! ```
//!
//! No occupancy count is stored. Occupied slots form a prefix; a leaf slot
//! is empty iff its record id is invalid, an internal slot iff its child
//! pointer is invalid. A node is full iff its last slot is occupied.

use crate::common::config::PAGE_SIZE;
use crate::common::{Error, PageId, RecordId, Result};
use crate::storage::page::{Page, PageHeader, PageType};

/// Key value stored in empty slots.
pub const EMPTY_KEY: i32 = -1;

const KEY_SIZE: usize = 4;

/// Right-sibling pointer.
const LEAF_HEADER_SIZE: usize = PageId::SIZE;

/// Level flag.
const INTERNAL_HEADER_SIZE: usize = 1;

const LEAF_DATA_OFFSET: usize = PageHeader::SIZE + LEAF_HEADER_SIZE;
const INTERNAL_DATA_OFFSET: usize = PageHeader::SIZE + INTERNAL_HEADER_SIZE;

/// Most `(key, rid)` pairs a leaf page can hold.
pub const MAX_LEAF_CAPACITY: usize = (PAGE_SIZE - LEAF_DATA_OFFSET) / (KEY_SIZE + RecordId::SIZE);

/// Most keys an internal page can hold, leaving room for the extra child.
pub const MAX_INTERNAL_CAPACITY: usize =
    (PAGE_SIZE - INTERNAL_DATA_OFFSET - PageId::SIZE) / (KEY_SIZE + PageId::SIZE);

const LEVEL_ABOVE_LEAVES: u8 = 1;
const LEVEL_ABOVE_INTERNAL: u8 = 0;

/// Node capacities used to interpret the pages of one index.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NodeLayout {
    /// Entries per leaf (M).
    pub leaf_capacity: usize,
    /// Keys per internal node (N); such a node has N+1 children.
    pub internal_capacity: usize,
}

impl NodeLayout {
    /// The capacities a full page allows.
    pub const PAGE: NodeLayout = NodeLayout {
        leaf_capacity: MAX_LEAF_CAPACITY,
        internal_capacity: MAX_INTERNAL_CAPACITY,
    };

    /// A layout with smaller nodes than a page allows.
    ///
    /// # Errors
    /// `Error::InvalidLayout` unless `2 <= leaf <= MAX_LEAF_CAPACITY` and
    /// `2 <= internal <= MAX_INTERNAL_CAPACITY`.
    pub fn new(leaf_capacity: usize, internal_capacity: usize) -> Result<Self> {
        if !(2..=MAX_LEAF_CAPACITY).contains(&leaf_capacity) {
            return Err(Error::InvalidLayout(format!(
                "leaf capacity {leaf_capacity} outside 2..={MAX_LEAF_CAPACITY}"
            )));
        }
        if !(2..=MAX_INTERNAL_CAPACITY).contains(&internal_capacity) {
            return Err(Error::InvalidLayout(format!(
                "internal capacity {internal_capacity} outside 2..={MAX_INTERNAL_CAPACITY}"
            )));
        }
        Ok(Self {
            leaf_capacity,
            internal_capacity,
        })
    }
}

impl Default for NodeLayout {
    fn default() -> Self {
        Self::PAGE
    }
}

/// Fail unless `page` carries the `expected` page type.
pub fn expect_page_type(page: &Page, page_id: PageId, expected: PageType) -> Result<()> {
    let found = page.page_type();
    if found != expected {
        return Err(Error::InvalidPageType {
            page: page_id,
            expected: expected.name(),
            found: found.name(),
        });
    }
    Ok(())
}

#[inline]
fn read_key(data: &[u8], offset: usize) -> i32 {
    let mut bytes = [0u8; KEY_SIZE];
    bytes.copy_from_slice(&data[offset..offset + KEY_SIZE]);
    i32::from_le_bytes(bytes)
}

#[inline]
fn write_key(data: &mut [u8], offset: usize, key: i32) {
    data[offset..offset + KEY_SIZE].copy_from_slice(&key.to_le_bytes());
}

/// First index in `0..len` for which `pred` is false, assuming `pred` holds
/// on a prefix.
fn partition_point(len: usize, mut pred: impl FnMut(usize) -> bool) -> usize {
    let (mut lo, mut hi) = (0, len);
    while lo < hi {
        let mid = lo + (hi - lo) / 2;
        if pred(mid) {
            lo = mid + 1;
        } else {
            hi = mid;
        }
    }
    lo
}

// ============================================================================
// Leaf
// ============================================================================

/// A leaf node viewed over page bytes.
pub struct LeafNode<B> {
    data: B,
    capacity: usize,
}

impl<B: AsRef<[u8]>> LeafNode<B> {
    /// View an existing leaf.
    pub fn new(data: B, capacity: usize) -> Self {
        Self { data, capacity }
    }

    #[inline]
    fn key_offset(&self, slot: usize) -> usize {
        LEAF_DATA_OFFSET + slot * KEY_SIZE
    }

    #[inline]
    fn rid_offset(&self, slot: usize) -> usize {
        LEAF_DATA_OFFSET + self.capacity * KEY_SIZE + slot * RecordId::SIZE
    }

    #[inline]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    #[inline]
    pub fn key(&self, slot: usize) -> i32 {
        read_key(self.data.as_ref(), self.key_offset(slot))
    }

    #[inline]
    pub fn rid(&self, slot: usize) -> RecordId {
        RecordId::read_from(self.data.as_ref(), self.rid_offset(slot))
    }

    #[inline]
    pub fn is_occupied(&self, slot: usize) -> bool {
        self.rid(slot).is_valid()
    }

    /// Next leaf in key order, `PageId::INVALID` for the last leaf.
    #[inline]
    pub fn right_sibling(&self) -> PageId {
        PageId::read_from(self.data.as_ref(), PageHeader::SIZE)
    }

    /// Number of occupied slots.
    pub fn len(&self) -> usize {
        partition_point(self.capacity, |slot| self.is_occupied(slot))
    }

    pub fn is_empty(&self) -> bool {
        !self.is_occupied(0)
    }

    pub fn is_full(&self) -> bool {
        self.is_occupied(self.capacity - 1)
    }

    /// First occupied slot whose key is `>= key`, or `len()`.
    pub fn lower_bound(&self, key: i32) -> usize {
        partition_point(self.len(), |slot| self.key(slot) < key)
    }

    /// First occupied slot whose key is `> key`, or `len()`.
    pub fn upper_bound(&self, key: i32) -> usize {
        partition_point(self.len(), |slot| self.key(slot) <= key)
    }

    /// Occupied keys in slot order.
    pub fn keys(&self) -> Vec<i32> {
        (0..self.len()).map(|slot| self.key(slot)).collect()
    }
}

impl<B: AsRef<[u8]> + AsMut<[u8]>> LeafNode<B> {
    /// Format `data` as an empty leaf with no sibling.
    pub fn init(mut data: B, capacity: usize) -> Self {
        data.as_mut()[PageHeader::OFFSET_PAGE_TYPE] = PageType::BTreeLeaf as u8;
        let mut leaf = Self { data, capacity };
        leaf.set_right_sibling(PageId::INVALID);
        for slot in 0..capacity {
            leaf.clear_slot(slot);
        }
        leaf
    }

    pub fn set_right_sibling(&mut self, page_id: PageId) {
        page_id.write_to(self.data.as_mut(), PageHeader::SIZE);
    }

    fn set_entry(&mut self, slot: usize, key: i32, rid: RecordId) {
        let key_offset = self.key_offset(slot);
        let rid_offset = self.rid_offset(slot);
        write_key(self.data.as_mut(), key_offset, key);
        rid.write_to(self.data.as_mut(), rid_offset);
    }

    /// Reset a slot to the empty sentinels.
    pub fn clear_slot(&mut self, slot: usize) {
        self.set_entry(slot, EMPTY_KEY, RecordId::INVALID);
    }

    /// Insert in sorted position, before any existing equal keys.
    ///
    /// Returns false (leaving the node untouched) if the leaf is full.
    pub fn insert(&mut self, key: i32, rid: RecordId) -> bool {
        if self.is_full() {
            return false;
        }
        let len = self.len();
        let pos = self.lower_bound(key);
        for slot in (pos..len).rev() {
            let (k, r) = (self.key(slot), self.rid(slot));
            self.set_entry(slot + 1, k, r);
        }
        self.set_entry(pos, key, rid);
        true
    }

    /// Split a full leaf around a pending entry.
    ///
    /// Entries from slot `ceil(M/2)` onward move to `right`, which must be
    /// freshly initialized and live at `right_page_id`. `right` is spliced
    /// into the sibling chain after `self` and the pending entry lands in
    /// whichever half it belongs to. Returns the key to promote, which is
    /// the first key of `right`.
    pub fn split_into<R>(
        &mut self,
        right: &mut LeafNode<R>,
        right_page_id: PageId,
        key: i32,
        rid: RecordId,
    ) -> i32
    where
        R: AsRef<[u8]> + AsMut<[u8]>,
    {
        let mid = (self.capacity + 1) / 2;
        for slot in mid..self.capacity {
            right.set_entry(slot - mid, self.key(slot), self.rid(slot));
            self.clear_slot(slot);
        }

        right.set_right_sibling(self.right_sibling());
        self.set_right_sibling(right_page_id);

        if key < right.key(0) {
            self.insert(key, rid);
        } else {
            right.insert(key, rid);
        }
        right.key(0)
    }
}

// ============================================================================
// Internal
// ============================================================================

/// An internal node viewed over page bytes.
pub struct InternalNode<B> {
    data: B,
    capacity: usize,
}

impl<B: AsRef<[u8]>> InternalNode<B> {
    /// View an existing internal node.
    pub fn new(data: B, capacity: usize) -> Self {
        Self { data, capacity }
    }

    #[inline]
    fn key_offset(&self, slot: usize) -> usize {
        INTERNAL_DATA_OFFSET + slot * KEY_SIZE
    }

    #[inline]
    fn child_offset(&self, slot: usize) -> usize {
        INTERNAL_DATA_OFFSET + self.capacity * KEY_SIZE + slot * PageId::SIZE
    }

    /// Key capacity (N).
    #[inline]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// True if the children of this node are leaves.
    #[inline]
    pub fn is_above_leaves(&self) -> bool {
        self.data.as_ref()[PageHeader::SIZE] == LEVEL_ABOVE_LEAVES
    }

    #[inline]
    pub fn key(&self, slot: usize) -> i32 {
        read_key(self.data.as_ref(), self.key_offset(slot))
    }

    #[inline]
    pub fn child(&self, slot: usize) -> PageId {
        PageId::read_from(self.data.as_ref(), self.child_offset(slot))
    }

    /// Number of occupied child pointers.
    pub fn child_count(&self) -> usize {
        partition_point(self.capacity + 1, |slot| self.child(slot).is_valid())
    }

    /// Number of occupied keys.
    pub fn len(&self) -> usize {
        self.child_count().saturating_sub(1)
    }

    /// True before the first insertion into a new tree.
    pub fn is_empty(&self) -> bool {
        !self.child(0).is_valid()
    }

    pub fn is_full(&self) -> bool {
        self.child(self.capacity).is_valid()
    }

    /// Occupied keys in slot order.
    pub fn keys(&self) -> Vec<i32> {
        (0..self.len()).map(|slot| self.key(slot)).collect()
    }

    /// Child to follow when inserting `key`: advance while the boundary is
    /// strictly less than `key` and a further child exists.
    pub fn insert_child_index(&self, key: i32) -> usize {
        let mut idx = 0;
        while idx < self.capacity && self.child(idx + 1).is_valid() && self.key(idx) < key {
            idx += 1;
        }
        idx
    }

    /// Child to follow when looking for the first key of a scan: advance
    /// while the boundary is at most `low` and a further child exists.
    pub fn scan_child_index(&self, low: i32) -> usize {
        let mut idx = 0;
        while idx < self.capacity && self.child(idx + 1).is_valid() && low >= self.key(idx) {
            idx += 1;
        }
        idx
    }
}

impl<B: AsRef<[u8]> + AsMut<[u8]>> InternalNode<B> {
    /// Format `data` as an internal node with no children.
    pub fn init(mut data: B, capacity: usize, above_leaves: bool) -> Self {
        data.as_mut()[PageHeader::OFFSET_PAGE_TYPE] = PageType::BTreeInternal as u8;
        let mut node = Self { data, capacity };
        node.set_above_leaves(above_leaves);
        for slot in 0..capacity {
            node.clear_slot(slot);
        }
        node.set_child(capacity, PageId::INVALID);
        node
    }

    pub fn set_above_leaves(&mut self, above_leaves: bool) {
        self.data.as_mut()[PageHeader::SIZE] = if above_leaves {
            LEVEL_ABOVE_LEAVES
        } else {
            LEVEL_ABOVE_INTERNAL
        };
    }

    pub fn set_key(&mut self, slot: usize, key: i32) {
        let offset = self.key_offset(slot);
        write_key(self.data.as_mut(), offset, key);
    }

    pub fn set_child(&mut self, slot: usize, child: PageId) {
        let offset = self.child_offset(slot);
        child.write_to(self.data.as_mut(), offset);
    }

    /// Reset key `slot` and child `slot` to the empty sentinels.
    ///
    /// The trailing child pointer (slot N) has no key; clear it with
    /// `set_child(N, PageId::INVALID)`.
    pub fn clear_slot(&mut self, slot: usize) {
        self.set_key(slot, EMPTY_KEY);
        self.set_child(slot, PageId::INVALID);
    }

    /// Insert a boundary key and a new child directly right of child
    /// `child_slot`, which is the child that split. The key lands in key
    /// slot `child_slot`.
    ///
    /// Placement is by position rather than by key so that a split child's
    /// new sibling stays next to it when equal boundaries repeat. Returns
    /// false (leaving the node untouched) if the node is full.
    pub fn insert(&mut self, child_slot: usize, key: i32, child: PageId) -> bool {
        if self.is_full() {
            return false;
        }
        let len = self.len();
        debug_assert!(child_slot <= len);
        for slot in (child_slot..len).rev() {
            let k = self.key(slot);
            self.set_key(slot + 1, k);
        }
        for slot in (child_slot + 1..=len).rev() {
            let c = self.child(slot);
            self.set_child(slot + 1, c);
        }
        self.set_key(child_slot, key);
        self.set_child(child_slot + 1, child);
        true
    }

    /// Split a full node around a pending `(key, child)` that belongs right
    /// of child `child_slot`.
    ///
    /// The N+1 keys and N+2 children are merged and split at the middle
    /// key, which is returned for promotion and kept in neither half.
    /// `right` must be freshly initialized; it takes the upper half and the
    /// level of `self`.
    pub fn split_into<R>(
        &mut self,
        right: &mut InternalNode<R>,
        child_slot: usize,
        key: i32,
        child: PageId,
    ) -> i32
    where
        R: AsRef<[u8]> + AsMut<[u8]>,
    {
        let n = self.len();
        let mut keys: Vec<i32> = (0..n).map(|slot| self.key(slot)).collect();
        let mut children: Vec<PageId> = (0..=n).map(|slot| self.child(slot)).collect();
        keys.insert(child_slot, key);
        children.insert(child_slot + 1, child);

        let mid = keys.len() / 2;
        let promoted = keys[mid];

        for slot in 0..self.capacity {
            self.clear_slot(slot);
        }
        self.set_child(self.capacity, PageId::INVALID);
        for (slot, k) in keys[..mid].iter().enumerate() {
            self.set_key(slot, *k);
        }
        for (slot, c) in children[..=mid].iter().enumerate() {
            self.set_child(slot, *c);
        }

        right.set_above_leaves(self.is_above_leaves());
        for (slot, k) in keys[mid + 1..].iter().enumerate() {
            right.set_key(slot, *k);
        }
        for (slot, c) in children[mid + 1..].iter().enumerate() {
            right.set_child(slot, *c);
        }
        promoted
    }
}
