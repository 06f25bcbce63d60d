//! B+-tree secondary index.
//!
//! # Page structure
//! ```text
//!                    ┌───────────────────┐
//!   page 0           │ IndexMeta         │ relation, offset, type, root
//!                    └───────────────────┘
//!                    ┌───────────────────┐
//!   root             │ InternalNode      │
//!                    └─┬───────┬───────┬─┘
//!            ┌─────────┘       │       └──────────┐
//!        ┌───▼───┐         ┌───▼───┐          ┌───▼───┐
//!        │ Leaf  │────────▶│ Leaf  │─────────▶│ Leaf  │────▶ INVALID
//!        └───────┘         └───────┘          └───────┘
//! ```
//!
//! # Modules
//! - `node` - page codec for leaf and internal nodes, slot mutators, splits
//! - `meta` - the metadata page
//! - `index` - [`BTreeIndex`]: open/create, bulk load, inspection, close
//! - `insert` - insertion with cascading splits and root growth
//! - `scan` - predicate-bounded range scans

mod index;
mod insert;
mod meta;
mod node;
mod scan;

pub use index::{index_file_name, BTreeIndex};
pub use meta::{IndexMeta, META_PAGE_ID};
pub use node::{
    InternalNode, LeafNode, NodeLayout, EMPTY_KEY, MAX_INTERNAL_CAPACITY, MAX_LEAF_CAPACITY,
};
