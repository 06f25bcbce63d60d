//! Base relations an index can be built over.
//!
//! An index only needs a forward scan over raw records, each tagged with
//! the [`RecordId`] it should store. [`MemoryRelation`] is an in-memory
//! implementation used to bulk-load indexes in tests, benchmarks and the
//! demo binary.

use crate::common::{PageId, RecordId, Result};

/// Forward scan over the records of a relation.
pub trait RelationScan {
    /// The next record, or `None` once every record has been returned.
    fn next_record(&mut self) -> Result<Option<(RecordId, Vec<u8>)>>;
}

/// A relation that can be scanned from the beginning.
pub trait Relation {
    fn name(&self) -> &str;

    /// Start a new scan at the first record.
    fn scan(&self) -> Result<Box<dyn RelationScan + '_>>;
}

/// Raw records kept in memory.
///
/// Record `i` is given the id `(i / records_per_page, i % records_per_page)`
/// as if the records were packed into heap pages.
#[derive(Debug, Clone)]
pub struct MemoryRelation {
    name: String,
    records: Vec<Vec<u8>>,
    records_per_page: u16,
}

impl MemoryRelation {
    pub const DEFAULT_RECORDS_PER_PAGE: u16 = 64;

    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            records: Vec::new(),
            records_per_page: Self::DEFAULT_RECORDS_PER_PAGE,
        }
    }

    /// Change how many records share a heap page. Zero is treated as one.
    pub fn with_records_per_page(mut self, records_per_page: u16) -> Self {
        self.records_per_page = records_per_page.max(1);
        self
    }

    /// Append a record, returning its id.
    pub fn push(&mut self, record: Vec<u8>) -> RecordId {
        self.records.push(record);
        self.record_id(self.records.len() - 1)
    }

    /// Append a `record_len`-byte record holding `value` at `attr_offset`.
    pub fn push_int(&mut self, attr_offset: usize, value: i32, record_len: usize) -> RecordId {
        self.push(encode_int_record(attr_offset, value, record_len))
    }

    /// Id of the `index`-th record.
    pub fn record_id(&self, index: usize) -> RecordId {
        let per_page = usize::from(self.records_per_page);
        RecordId::new(
            PageId::new((index / per_page) as u32),
            (index % per_page) as u16,
        )
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

impl Relation for MemoryRelation {
    fn name(&self) -> &str {
        &self.name
    }

    fn scan(&self) -> Result<Box<dyn RelationScan + '_>> {
        Ok(Box::new(MemoryScan {
            relation: self,
            next: 0,
        }))
    }
}

struct MemoryScan<'a> {
    relation: &'a MemoryRelation,
    next: usize,
}

impl RelationScan for MemoryScan<'_> {
    fn next_record(&mut self) -> Result<Option<(RecordId, Vec<u8>)>> {
        let Some(record) = self.relation.records.get(self.next) else {
            return Ok(None);
        };
        let rid = self.relation.record_id(self.next);
        self.next += 1;
        Ok(Some((rid, record.clone())))
    }
}

/// Build a zeroed record of `record_len` bytes (grown if too short) with
/// `value` stored little-endian at `attr_offset`.
pub fn encode_int_record(attr_offset: usize, value: i32, record_len: usize) -> Vec<u8> {
    let mut record = vec![0u8; record_len.max(attr_offset + 4)];
    record[attr_offset..attr_offset + 4].copy_from_slice(&value.to_le_bytes());
    record
}

/// Read the integer stored at `attr_offset`, or `None` if the record ends
/// before the attribute does.
pub fn decode_int_attr(record: &[u8], attr_offset: usize) -> Option<i32> {
    let bytes = record.get(attr_offset..attr_offset.checked_add(4)?)?;
    let mut value = [0u8; 4];
    value.copy_from_slice(bytes);
    Some(i32::from_le_bytes(value))
}
