//! Storage layer - page files and page formats.
//!
//! - [`DiskManager`] - One page file on disk
//! - [`page`] - Page types and layouts

mod disk_manager;
pub mod page;

pub use disk_manager::DiskManager;
