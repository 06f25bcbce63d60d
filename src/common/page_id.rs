//! Page identifier type.

use std::fmt;

/// Identifies a page within one page file.
///
/// Page `N` lives at byte offset `N × PAGE_SIZE`. On disk a page id is
/// stored as a little-endian `u32`, with `u32::MAX` meaning "no page".
///
/// # Example
/// ```
/// use leafline::PageId;
///
/// let page_id = PageId::new(42);
/// assert!(page_id.is_valid());
/// assert!(!PageId::INVALID.is_valid());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PageId(pub u32);

impl PageId {
    /// Invalid/sentinel page ID.
    ///
    /// Marks empty child slots, empty record slots and the end of the
    /// leaf sibling chain.
    pub const INVALID: PageId = PageId(u32::MAX);

    /// Encoded size in bytes.
    pub const SIZE: usize = 4;

    /// Create a new PageId.
    #[inline]
    pub fn new(id: u32) -> Self {
        PageId(id)
    }

    /// Check if this page ID is valid (not the sentinel value).
    #[inline]
    pub fn is_valid(&self) -> bool {
        *self != Self::INVALID
    }

    /// Read a page id stored at `offset`.
    #[inline]
    pub fn read_from(data: &[u8], offset: usize) -> Self {
        let mut bytes = [0u8; Self::SIZE];
        bytes.copy_from_slice(&data[offset..offset + Self::SIZE]);
        PageId(u32::from_le_bytes(bytes))
    }

    /// Store this page id at `offset`.
    #[inline]
    pub fn write_to(&self, data: &mut [u8], offset: usize) {
        data[offset..offset + Self::SIZE].copy_from_slice(&self.0.to_le_bytes());
    }
}

impl fmt::Display for PageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if *self == Self::INVALID {
            write!(f, "Page(INVALID)")
        } else {
            write!(f, "Page({})", self.0)
        }
    }
}
