//! Configuration for leafline.
//!
//! Compile-time constants fix the page format; [`IndexConfig`] carries the
//! runtime knobs (where index files live, pool size, node fan-out).
//!
//! # Environment Variables
//!
//! - `LEAFLINE_DATA_DIR`: directory holding index files (default: `./data`)
//! - `LEAFLINE_POOL_SIZE`: buffer pool frames (default: `64`)

use std::path::{Path, PathBuf};

use crate::common::{Error, Result};
use crate::index::btree::NodeLayout;

/// Size of a page in bytes (4KB).
///
/// Every node of the tree and the metadata page occupy exactly one page.
/// Node capacities are derived from this value (see [`NodeLayout::PAGE`]).
pub const PAGE_SIZE: usize = 4096;

/// Maximum number of pages with u32 PageId (one id is reserved as INVALID).
pub const MAX_PAGES: u64 = u32::MAX as u64;

/// Longest relation name the metadata page can hold.
pub const MAX_RELATION_NAME_LEN: usize = 64;

/// Default number of buffer pool frames.
pub const DEFAULT_POOL_SIZE: usize = 64;

/// Runtime configuration for opening indexes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexConfig {
    /// Directory holding `<relation>.<offset>` index files.
    pub data_dir: PathBuf,
    /// Frames in a buffer pool built from this config.
    pub pool_size: usize,
    /// Node capacities used when a new index is created.
    pub layout: NodeLayout,
}

impl IndexConfig {
    /// Default data directory.
    pub const DEFAULT_DATA_DIR: &'static str = "./data";

    /// Load configuration from environment variables.
    ///
    /// # Errors
    /// Returns `Error::InvalidConfig` if `LEAFLINE_POOL_SIZE` is set but is
    /// not a positive integer.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Build a config from an arbitrary variable source.
    pub(crate) fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(dir) = lookup("LEAFLINE_DATA_DIR") {
            config.data_dir = PathBuf::from(dir);
        }

        if let Some(value) = lookup("LEAFLINE_POOL_SIZE") {
            config.pool_size = match value.trim().parse::<usize>() {
                Ok(n) if n > 0 => n,
                _ => {
                    return Err(Error::InvalidConfig {
                        name: "LEAFLINE_POOL_SIZE".to_string(),
                        message: format!("'{value}' is not a positive integer"),
                    })
                }
            };
        }

        Ok(config)
    }

    pub fn with_data_dir<P: AsRef<Path>>(mut self, dir: P) -> Self {
        self.data_dir = dir.as_ref().to_path_buf();
        self
    }

    pub fn with_pool_size(mut self, pool_size: usize) -> Self {
        self.pool_size = pool_size;
        self
    }

    pub fn with_layout(mut self, layout: NodeLayout) -> Self {
        self.layout = layout;
        self
    }
}

impl Default for IndexConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from(Self::DEFAULT_DATA_DIR),
            pool_size: DEFAULT_POOL_SIZE,
            layout: NodeLayout::PAGE,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name| map.get(name).cloned()
    }

    #[test]
    fn test_page_size_is_power_of_two() {
        assert!(PAGE_SIZE.is_power_of_two());
        assert_eq!(PAGE_SIZE, 4096);
    }

    #[test]
    fn test_defaults_without_env() {
        let config = IndexConfig::from_lookup(lookup_from(&[])).unwrap();
        assert_eq!(config, IndexConfig::default());
        assert_eq!(config.data_dir, PathBuf::from("./data"));
        assert_eq!(config.pool_size, DEFAULT_POOL_SIZE);
        assert_eq!(config.layout, NodeLayout::PAGE);
    }

    #[test]
    fn test_env_overrides() {
        let config = IndexConfig::from_lookup(lookup_from(&[
            ("LEAFLINE_DATA_DIR", "/tmp/idx"),
            ("LEAFLINE_POOL_SIZE", "128"),
        ]))
        .unwrap();
        assert_eq!(config.data_dir, PathBuf::from("/tmp/idx"));
        assert_eq!(config.pool_size, 128);
    }

    #[test]
    fn test_bad_pool_size_rejected() {
        for bad in ["zero", "0", "-3"] {
            let err = IndexConfig::from_lookup(lookup_from(&[("LEAFLINE_POOL_SIZE", bad)]))
                .unwrap_err();
            assert!(matches!(err, Error::InvalidConfig { .. }), "{bad}");
        }
    }

    #[test]
    fn test_builders() {
        let layout = NodeLayout::new(4, 3).unwrap();
        let config = IndexConfig::default()
            .with_data_dir("/var/lib/leafline")
            .with_pool_size(8)
            .with_layout(layout);
        assert_eq!(config.data_dir, PathBuf::from("/var/lib/leafline"));
        assert_eq!(config.pool_size, 8);
        assert_eq!(config.layout, layout);
    }
}
