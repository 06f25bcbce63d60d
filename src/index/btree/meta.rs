//! Index metadata page.
//!
//! The first page of every index file describes the index:
//!
//! ```text
//! ┌────────────┬────────────────┬──────────────┬───────────┬───────────┬──────────┬──────────────┐
//! │ PageHeader │ relation name  │ attr offset  │ attr type │ root page │ leaf cap │ internal cap │
//! │ (13 bytes) │ 64 bytes, NUL  │ u32          │ u8        │ u32       │ u16      │ u16          │
//! └────────────┴────────────────┴──────────────┴───────────┴───────────┴──────────┴──────────────┘
//! ```

use crate::common::config::MAX_RELATION_NAME_LEN;
use crate::common::{Datatype, Error, PageId, Result};
use crate::storage::page::{PageHeader, PageType};

use super::node::NodeLayout;

/// The metadata page always lives at page 0 of the index file.
pub const META_PAGE_ID: PageId = PageId(0);

const NAME_OFFSET: usize = PageHeader::SIZE;
const ATTR_OFFSET_OFFSET: usize = NAME_OFFSET + MAX_RELATION_NAME_LEN;
const ATTR_TYPE_OFFSET: usize = ATTR_OFFSET_OFFSET + 4;
const ROOT_OFFSET: usize = ATTR_TYPE_OFFSET + 1;
const LEAF_CAP_OFFSET: usize = ROOT_OFFSET + PageId::SIZE;
const INTERNAL_CAP_OFFSET: usize = LEAF_CAP_OFFSET + 2;

/// Decoded contents of the metadata page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexMeta {
    pub relation_name: String,
    pub attr_offset: u32,
    pub attr_type: Datatype,
    pub root_page_id: PageId,
    pub layout: NodeLayout,
}

impl IndexMeta {
    /// Write the metadata into `data`, stamping the page type.
    ///
    /// # Errors
    /// `Error::RelationNameTooLong` if the name does not fit.
    pub fn write_to(&self, data: &mut [u8]) -> Result<()> {
        let name = self.relation_name.as_bytes();
        if name.len() > MAX_RELATION_NAME_LEN {
            return Err(Error::RelationNameTooLong {
                len: name.len(),
                max: MAX_RELATION_NAME_LEN,
            });
        }

        data[PageHeader::OFFSET_PAGE_TYPE] = PageType::IndexMeta as u8;

        let name_field = &mut data[NAME_OFFSET..NAME_OFFSET + MAX_RELATION_NAME_LEN];
        name_field.fill(0);
        name_field[..name.len()].copy_from_slice(name);

        data[ATTR_OFFSET_OFFSET..ATTR_OFFSET_OFFSET + 4]
            .copy_from_slice(&self.attr_offset.to_le_bytes());
        data[ATTR_TYPE_OFFSET] = self.attr_type as u8;
        self.root_page_id.write_to(data, ROOT_OFFSET);
        // Capacities never exceed the page-derived maximums, which fit in u16.
        data[LEAF_CAP_OFFSET..LEAF_CAP_OFFSET + 2]
            .copy_from_slice(&(self.layout.leaf_capacity as u16).to_le_bytes());
        data[INTERNAL_CAP_OFFSET..INTERNAL_CAP_OFFSET + 2]
            .copy_from_slice(&(self.layout.internal_capacity as u16).to_le_bytes());
        Ok(())
    }

    /// Decode the metadata of `index_name` from `data`.
    ///
    /// # Errors
    /// - `Error::InvalidPageType` if the page is not a metadata page
    /// - `Error::BadIndexInfo` if a stored field cannot be decoded
    pub fn read_from(index_name: &str, data: &[u8]) -> Result<Self> {
        let page_type = PageType::from_u8(data[PageHeader::OFFSET_PAGE_TYPE]);
        if page_type != PageType::IndexMeta {
            return Err(Error::InvalidPageType {
                page: META_PAGE_ID,
                expected: PageType::IndexMeta.name(),
                found: page_type.name(),
            });
        }

        let name_field = &data[NAME_OFFSET..NAME_OFFSET + MAX_RELATION_NAME_LEN];
        let name_len = name_field
            .iter()
            .position(|b| *b == 0)
            .unwrap_or(MAX_RELATION_NAME_LEN);
        let relation_name = String::from_utf8_lossy(&name_field[..name_len]).into_owned();

        let mut offset_bytes = [0u8; 4];
        offset_bytes.copy_from_slice(&data[ATTR_OFFSET_OFFSET..ATTR_OFFSET_OFFSET + 4]);
        let attr_offset = u32::from_le_bytes(offset_bytes);

        let tag = data[ATTR_TYPE_OFFSET];
        let attr_type = Datatype::from_u8(tag).ok_or_else(|| Error::BadIndexInfo {
            index: index_name.to_string(),
            reason: format!("unknown attribute type tag {tag}"),
        })?;

        let root_page_id = PageId::read_from(data, ROOT_OFFSET);
        let leaf_capacity =
            u16::from_le_bytes([data[LEAF_CAP_OFFSET], data[LEAF_CAP_OFFSET + 1]]) as usize;
        let internal_capacity =
            u16::from_le_bytes([data[INTERNAL_CAP_OFFSET], data[INTERNAL_CAP_OFFSET + 1]]) as usize;
        let layout = NodeLayout::new(leaf_capacity, internal_capacity)?;

        Ok(Self {
            relation_name,
            attr_offset,
            attr_type,
            root_page_id,
            layout,
        })
    }

    /// Rewrite only the root pointer of an encoded metadata page.
    pub fn write_root(data: &mut [u8], root_page_id: PageId) {
        root_page_id.write_to(data, ROOT_OFFSET);
    }

    /// Describe how a stored index differs from an open request, if at all.
    pub fn mismatch(
        &self,
        relation_name: &str,
        attr_offset: u32,
        attr_type: Datatype,
    ) -> Option<String> {
        if self.relation_name != relation_name {
            return Some(format!(
                "relation name is '{}', requested '{relation_name}'",
                self.relation_name
            ));
        }
        if self.attr_offset != attr_offset {
            return Some(format!(
                "attribute offset is {}, requested {attr_offset}",
                self.attr_offset
            ));
        }
        if self.attr_type != attr_type {
            return Some(format!(
                "attribute type is {}, requested {attr_type}",
                self.attr_type
            ));
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::page::Page;

    fn sample() -> IndexMeta {
        IndexMeta {
            relation_name: "employees".to_string(),
            attr_offset: 12,
            attr_type: Datatype::Integer,
            root_page_id: PageId::new(1),
            layout: NodeLayout::new(8, 5).unwrap(),
        }
    }

    #[test]
    fn test_write_then_read() {
        let mut page = Page::new();
        sample().write_to(page.as_mut_slice()).unwrap();

        assert_eq!(page.page_type(), PageType::IndexMeta);
        let meta = IndexMeta::read_from("employees.12", page.as_slice()).unwrap();
        assert_eq!(meta, sample());
    }

    #[test]
    fn test_write_root_only_touches_root() {
        let mut page = Page::new();
        sample().write_to(page.as_mut_slice()).unwrap();

        IndexMeta::write_root(page.as_mut_slice(), PageId::new(42));

        let meta = IndexMeta::read_from("employees.12", page.as_slice()).unwrap();
        assert_eq!(meta.root_page_id, PageId::new(42));
        assert_eq!(meta.attr_offset, 12);
        assert_eq!(meta.layout, sample().layout);
    }

    #[test]
    fn test_name_too_long() {
        let mut meta = sample();
        meta.relation_name = "r".repeat(MAX_RELATION_NAME_LEN + 1);

        let mut page = Page::new();
        assert!(matches!(
            meta.write_to(page.as_mut_slice()),
            Err(Error::RelationNameTooLong { len: 65, max: 64 })
        ));
    }

    #[test]
    fn test_full_length_name() {
        let mut meta = sample();
        meta.relation_name = "x".repeat(MAX_RELATION_NAME_LEN);

        let mut page = Page::new();
        meta.write_to(page.as_mut_slice()).unwrap();
        let decoded = IndexMeta::read_from("x", page.as_slice()).unwrap();
        assert_eq!(decoded.relation_name.len(), MAX_RELATION_NAME_LEN);
    }

    #[test]
    fn test_read_rejects_other_page_types() {
        let mut page = Page::new();
        page.set_page_type(PageType::BTreeLeaf);

        assert!(matches!(
            IndexMeta::read_from("t.0", page.as_slice()),
            Err(Error::InvalidPageType { .. })
        ));
    }

    #[test]
    fn test_mismatch_reports_field() {
        let meta = sample();
        assert_eq!(meta.mismatch("employees", 12, Datatype::Integer), None);

        let reason = meta.mismatch("employees", 16, Datatype::Integer).unwrap();
        assert!(reason.contains("offset"));

        let reason = meta.mismatch("employees", 12, Datatype::Double).unwrap();
        assert!(reason.contains("DOUBLE"));

        assert!(meta.mismatch("managers", 12, Datatype::Integer).is_some());
    }
}
