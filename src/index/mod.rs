//! Index structures.
//!
//! - [`btree`] - disk-resident B+-tree over an integer attribute

pub mod btree;

pub use btree::{BTreeIndex, NodeLayout};
