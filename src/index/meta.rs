//! Index metadata stored in the record store's optional header

use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::StoreError;

use super::META_VERSION;

/// Bookkeeping the index keeps in the optional header
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexMeta {
    /// Metadata version; 0 means the index was never initialized
    pub version: u32,
    /// Record index of the root node
    pub root: u32,
    /// Number of keys currently mapped
    pub entries: u64,
}

impl IndexMeta {
    /// Metadata for a freshly created index
    pub fn new(root: u32) -> Self {
        Self {
            version: META_VERSION,
            root,
            entries: 0,
        }
    }

    /// Whether these bytes describe an index that was never set up
    pub fn is_uninitialized(&self) -> bool {
        self.version == 0 && self.root == 0
    }

    /// Decode from optional header bytes (trailing bytes are ignored)
    pub fn read_from(optional: &[u8]) -> Result<Self> {
        bincode::deserialize(optional).map_err(|e| StoreError::Serialization(e.to_string()))
    }

    /// Encode into optional header bytes
    pub fn write_to(&self, optional: &mut [u8]) -> Result<()> {
        let bytes = bincode::serialize(self).map_err(|e| StoreError::Serialization(e.to_string()))?;
        if bytes.len() > optional.len() {
            return Err(StoreError::Serialization(format!(
                "index metadata needs {} bytes, optional header has {}",
                bytes.len(),
                optional.len()
            )));
        }
        optional[..bytes.len()].copy_from_slice(&bytes);
        Ok(())
    }
}
