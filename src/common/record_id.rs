//! Record identifier: a (page, slot) locator into a base relation.

use std::fmt;

use super::PageId;

/// Locates a record in the base relation's heap storage.
///
/// The index never interprets a record id; it stores it next to the key
/// and hands it back from scans.
///
/// # Layout (6 bytes)
/// ```text
/// Offset  Size  Field
/// ------  ----  -----
/// 0       4     page_number (little-endian)
/// 4       2     slot_number (little-endian)
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RecordId {
    pub page_number: PageId,
    pub slot_number: u16,
}

impl RecordId {
    /// Sentinel stored in empty leaf slots.
    pub const INVALID: RecordId = RecordId {
        page_number: PageId::INVALID,
        slot_number: Self::INVALID_SLOT,
    };

    /// Sentinel slot number.
    pub const INVALID_SLOT: u16 = u16::MAX;

    /// Encoded size in bytes.
    pub const SIZE: usize = 6;

    #[inline]
    pub fn new(page_number: PageId, slot_number: u16) -> Self {
        Self {
            page_number,
            slot_number,
        }
    }

    /// A slot is occupied iff its record points at a valid page.
    #[inline]
    pub fn is_valid(&self) -> bool {
        self.page_number.is_valid()
    }

    #[inline]
    pub fn read_from(data: &[u8], offset: usize) -> Self {
        let page_number = PageId::read_from(data, offset);
        let slot_number = u16::from_le_bytes([data[offset + 4], data[offset + 5]]);
        Self {
            page_number,
            slot_number,
        }
    }

    #[inline]
    pub fn write_to(&self, data: &mut [u8], offset: usize) {
        self.page_number.write_to(data, offset);
        data[offset + 4..offset + 6].copy_from_slice(&self.slot_number.to_le_bytes());
    }
}

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Rid({}, {})", self.page_number.0, self.slot_number)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_record() {
        assert!(!RecordId::INVALID.is_valid());
        assert!(RecordId::new(PageId::new(3), 0).is_valid());
    }

    #[test]
    fn test_record_id_byte_layout() {
        let rid = RecordId::new(PageId::new(7), 0x0201);
        let mut buf = [0u8; RecordId::SIZE];
        rid.write_to(&mut buf, 0);

        assert_eq!(buf, [7, 0, 0, 0, 0x01, 0x02]);
        assert_eq!(RecordId::read_from(&buf, 0), rid);
    }
}
