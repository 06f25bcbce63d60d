//! Attribute datatypes and scan comparison operators.

use std::fmt;

/// Datatype of the indexed attribute, persisted as a one-byte tag.
///
/// Only [`Datatype::Integer`] keys can be indexed; the other tags exist so
/// that a stored index's metadata can be compared against a request.
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Datatype {
    Integer = 0,
    Double = 1,
    String = 2,
}

impl Datatype {
    /// Decode a stored tag.
    pub fn from_u8(value: u8) -> Option<Self> {
        match value {
            0 => Some(Datatype::Integer),
            1 => Some(Datatype::Double),
            2 => Some(Datatype::String),
            _ => None,
        }
    }
}

impl fmt::Display for Datatype {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Datatype::Integer => "INTEGER",
            Datatype::Double => "DOUBLE",
            Datatype::String => "STRING",
        };
        f.write_str(name)
    }
}

/// Comparison operator bounding one end of a range scan.
///
/// The low end takes `Gt`/`Gte`, the high end `Lt`/`Lte`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operator {
    Lt,
    Lte,
    Gte,
    Gt,
}

impl Operator {
    /// Valid as the lower bound of a scan.
    #[inline]
    pub fn is_lower_bound(self) -> bool {
        matches!(self, Operator::Gt | Operator::Gte)
    }

    /// Valid as the upper bound of a scan.
    #[inline]
    pub fn is_upper_bound(self) -> bool {
        matches!(self, Operator::Lt | Operator::Lte)
    }

    /// Does `key` satisfy `key <op> bound`?
    #[inline]
    pub fn admits(self, key: i32, bound: i32) -> bool {
        match self {
            Operator::Lt => key < bound,
            Operator::Lte => key <= bound,
            Operator::Gte => key >= bound,
            Operator::Gt => key > bound,
        }
    }
}

impl fmt::Display for Operator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Operator::Lt => "LT",
            Operator::Lte => "LTE",
            Operator::Gte => "GTE",
            Operator::Gt => "GT",
        };
        f.write_str(name)
    }
}
