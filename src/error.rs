//! Error types for leafline.

use std::path::PathBuf;

use thiserror::Error;

use crate::common::types::{Datatype, Operator};
use crate::common::{FileId, PageId, RecordId};

/// Convenient Result type alias.
///
/// Instead of writing `Result<T, Error>` everywhere, we can write `Result<T>`.
pub type Result<T> = std::result::Result<T, Error>;

/// All possible errors in leafline.
///
/// A single enum covers the storage collaborators (disk, buffer pool) and the
/// index itself, so `?` works across layers.
#[derive(Debug, Error)]
pub enum Error {
    /// I/O error from disk operations.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Requested page does not exist in the file.
    #[error("{0} not found")]
    PageNotFound(PageId),

    /// Buffer pool has no free frames and cannot evict any pages.
    ///
    /// This happens when all frames are pinned.
    #[error("No free frames available in buffer pool")]
    NoFreeFrames,

    /// Attempted to unpin a page that wasn't pinned (or isn't resident).
    ///
    /// The index treats this as a best-effort condition and only logs it.
    #[error("{page} of {file} is not pinned")]
    PageNotPinned { file: FileId, page: PageId },

    /// The page file already exists and `create` refused to overwrite it.
    #[error("file already exists: {}", .0.display())]
    FileExists(PathBuf),

    /// The page file does not exist.
    #[error("file not found: {}", .0.display())]
    FileNotFound(PathBuf),

    /// The file id was never registered with the buffer pool, or was closed.
    #[error("{0} is not registered with the buffer pool")]
    UnknownFile(FileId),

    /// Stored checksum disagrees with the page contents.
    #[error("checksum mismatch on {page} of {file}")]
    ChecksumMismatch { file: FileId, page: PageId },

    /// A page was interpreted as the wrong kind of page.
    #[error("{page} has page type {found}, expected {expected}")]
    InvalidPageType {
        page: PageId,
        expected: &'static str,
        found: &'static str,
    },

    /// Stored index metadata disagrees with the parameters of an open request.
    #[error("bad index info for '{index}': {reason}")]
    BadIndexInfo { index: String, reason: String },

    /// Scan operators are not a (GT|GTE, LT|LTE) pair.
    #[error("bad scan operators: low {low}, high {high}")]
    BadOpcodes { low: Operator, high: Operator },

    /// Scan interval is inverted.
    #[error("bad scan range: low {low} > high {high}")]
    BadScanRange { low: i32, high: i32 },

    /// `scan_next` or `end_scan` called without an active scan.
    #[error("no scan has been initialized")]
    ScanNotInitialized,

    /// The active scan has no more qualifying entries.
    #[error("index scan completed")]
    IndexScanCompleted,

    /// A record id that points at no page; leaves use it to mark empty
    /// slots, so it cannot be stored.
    #[error("cannot index {0}: record id points at no page")]
    InvalidRecordId(RecordId),

    /// Only integer keys are indexable.
    #[error("unsupported key datatype: {0}")]
    UnsupportedDatatype(Datatype),

    /// Relation name does not fit in the metadata page.
    #[error("relation name is {len} bytes, at most {max} allowed")]
    RelationNameTooLong { len: usize, max: usize },

    /// Requested node capacities cannot be laid out in a page.
    #[error("invalid node layout: {0}")]
    InvalidLayout(String),

    /// Configuration value could not be used.
    #[error("invalid configuration for {name}: {message}")]
    InvalidConfig { name: String, message: String },
}

impl Error {
    /// True for the normal end-of-scan signal.
    pub fn is_scan_completed(&self) -> bool {
        matches!(self, Error::IndexScanCompleted)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = Error::PageNotFound(PageId::new(42));
        assert_eq!(format!("{}", err), "Page(42) not found");

        let err = Error::NoFreeFrames;
        assert_eq!(format!("{}", err), "No free frames available in buffer pool");

        let err = Error::BadScanRange { low: 20, high: 10 };
        assert_eq!(format!("{}", err), "bad scan range: low 20 > high 10");
    }

    #[test]
    fn test_io_error_conversion() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let err: Error = io_err.into();

        match err {
            Error::Io(_) => {} // Success
            _ => panic!("Expected Io error"),
        }
    }

    #[test]
    fn test_scan_completed_predicate() {
        assert!(Error::IndexScanCompleted.is_scan_completed());
        assert!(!Error::ScanNotInitialized.is_scan_completed());
    }

    #[test]
    fn test_common_reexports_crate_error() {
        let err: crate::common::Error = Error::NoFreeFrames;
        let result: crate::common::Result<()> = Err(err);
        assert!(matches!(result, Err(crate::error::Error::NoFreeFrames)));
    }

    #[test]
    fn test_bad_opcodes_display() {
        let err = Error::BadOpcodes {
            low: Operator::Lt,
            high: Operator::Lte,
        };
        assert_eq!(format!("{}", err), "bad scan operators: low LT, high LTE");
    }
}
