//! Buffer-pool side identifiers: frames and registered files.

use std::fmt;

/// Identifies a frame in the buffer pool.
///
/// Frames live in a `Vec<Frame>`, so the id is a plain `usize` index:
/// `frames[frame_id.0]`.
///
/// # Example
/// ```
/// use leafline::FrameId;
///
/// let frame_id = FrameId::new(5);
/// assert_eq!(frame_id.0, 5);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FrameId(pub usize);

impl FrameId {
    /// Create a new FrameId.
    #[inline]
    pub fn new(id: usize) -> Self {
        FrameId(id)
    }
}

impl fmt::Display for FrameId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Frame({})", self.0)
    }
}

/// Identifies a page file registered with the buffer pool.
///
/// Handed out by `BufferPoolManager::register_file`; page ids are only
/// meaningful together with the file they belong to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FileId(pub u32);

impl FileId {
    /// Create a new FileId.
    #[inline]
    pub fn new(id: u32) -> Self {
        FileId(id)
    }
}

impl fmt::Display for FileId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "File({})", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_frame_id_new() {
        let fid = FrameId::new(10);
        assert_eq!(fid.0, 10);
        assert_eq!(FrameId::new(5), FrameId::new(5));
        assert_ne!(FrameId::new(5), FrameId::new(6));
    }

    #[test]
    fn test_display() {
        assert_eq!(format!("{}", FrameId::new(42)), "Frame(42)");
        assert_eq!(format!("{}", FileId::new(3)), "File(3)");
    }
}
