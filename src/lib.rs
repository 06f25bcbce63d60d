//! leafline - a disk-resident B+-tree secondary index.
//!
//! # Architecture
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                            leafline                             │
//! ├─────────────────────────────────────────────────────────────────┤
//! │  ┌──────────────────────┐        ┌──────────────────────────┐   │
//! │  │  Relation (relation) │ ─────▶ │  B+-tree (index/btree)   │   │
//! │  │  bulk-load records   │        │  insert, range scan      │   │
//! │  └──────────────────────┘        └──────────────────────────┘   │
//! │                                              ↓                  │
//! │  ┌─────────────────────────────────────────────────────────┐   │
//! │  │                 Buffer Pool (buffer/)                   │   │
//! │  │   BufferPoolManager + Frame + page guards + FIFO        │   │
//! │  └─────────────────────────────────────────────────────────┘   │
//! │                              ↓                                  │
//! │  ┌─────────────────────────────────────────────────────────┐   │
//! │  │           Storage Layer (storage/)                       │   │
//! │  │        DiskManager + Page + PageHeader (CRC32)           │   │
//! │  └─────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Modules
//! - [`error`] - The crate-wide error type
//! - [`common`] - Shared primitives (PageId, RecordId, config)
//! - [`storage`] - Disk I/O and page formats
//! - [`buffer`] - Buffer pool shared by index files
//! - [`relation`] - Record sources an index is built from
//! - [`index`] - The B+-tree index
//!
//! # Quick Start
//! ```no_run
//! use std::sync::Arc;
//! use leafline::{BTreeIndex, BufferPoolManager, Datatype, IndexConfig, MemoryRelation, Operator};
//!
//! let config = IndexConfig::from_env()?;
//! let bpm = Arc::new(BufferPoolManager::new(config.pool_size));
//!
//! let mut relation = MemoryRelation::new("emp");
//! for salary in [500, 1200, 800] {
//!     relation.push_int(4, salary, 32);
//! }
//!
//! let mut index = BTreeIndex::open_or_create(bpm, &config, &relation, 4, Datatype::Integer)?;
//! index.start_scan(600, Operator::Gte, 2000, Operator::Lt)?;
//! while let Ok(rid) = index.scan_next() {
//!     println!("{rid}");
//! }
//! index.end_scan()?;
//! # Ok::<(), leafline::Error>(())
//! ```

pub mod buffer;
pub mod common;
pub mod error;
pub mod index;
pub mod relation;
pub mod storage;

// Re-export commonly used items at crate root for convenience
pub use common::config::{IndexConfig, PAGE_SIZE};
pub use common::{Datatype, Error, FileId, FrameId, Operator, PageId, RecordId, Result};

pub use buffer::{BufferPoolManager, BufferPoolStats, StatsSnapshot};
pub use index::{BTreeIndex, NodeLayout};
pub use relation::{MemoryRelation, Relation, RelationScan};
pub use storage::page::{Page, PageHeader, PageType};
pub use storage::DiskManager;
