//! Common types and utilities shared across leafline.
//!
//! This module contains fundamental primitives used throughout the codebase:
//! - Configuration constants and [`IndexConfig`](config::IndexConfig)
//! - Re-exports of the crate [`Error`](crate::error::Error) type
//! - Identifiers (PageId, FrameId, FileId, RecordId)
//! - Attribute datatypes and scan operators

pub mod config;
mod ids;
mod page_id;
mod record_id;
pub mod types;

pub use crate::error::{Error, Result};
pub use ids::{FileId, FrameId};
pub use page_id::PageId;
pub use record_id::RecordId;
pub use types::{Datatype, Operator};
