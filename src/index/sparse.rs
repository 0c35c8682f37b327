//! Sparse Index
//!
//! Put/get/remove over the node trie. Holds no file of its own; every
//! operation is a short chain of record store reads and writes.

use std::path::Path;

use tracing::{debug, info, trace};

use crate::config::Config;
use crate::error::Result;
use crate::file::{DiskFile, StoreFile};
use crate::record::{RecordId, RecordStore};
use crate::StoreError;

use super::{split_key, IndexMeta, TrieNode, LEVELS, META_VERSION, NODE_SIZE};

/// A `u32 → u32` map stored as a 4-level byte trie
///
/// Value 0 marks an absent slot on disk, so it cannot be stored; `put`
/// rejects it with `StoreError::ReservedValue`.
pub struct SparseIndex<F: StoreFile = DiskFile> {
    /// Record store holding the trie nodes
    store: RecordStore<F>,

    /// Cached copy of the optional header metadata
    meta: IndexMeta,
}

impl SparseIndex<DiskFile> {
    /// Open or create an index file with default config
    pub fn open(path: &Path) -> Result<Self> {
        Self::open_with_config(path, &Config::default())
    }

    /// Open or create an index file
    pub fn open_with_config(path: &Path, config: &Config) -> Result<Self> {
        let store = RecordStore::open_with_config(path, NODE_SIZE, config)?;
        Self::from_store(store)
    }
}

impl<F: StoreFile> SparseIndex<F> {
    /// Open an index on an arbitrary backend
    pub fn open_file(file: F, config: &Config) -> Result<Self> {
        let store = RecordStore::open_file(file, NODE_SIZE, config)?;
        Self::from_store(store)
    }

    /// Wrap a record store of trie nodes, allocating the root if needed
    fn from_store(mut store: RecordStore<F>) -> Result<Self> {
        let meta = IndexMeta::read_from(store.optional_header())?;

        if meta.is_uninitialized() {
            let root = store.create_record()?;
            store.put_record(root, &TrieNode::empty().to_bytes())?;

            let meta = IndexMeta::new(root.get());
            meta.write_to(store.optional_header_mut())?;
            store.mark_dirty();
            store.refresh()?;

            info!(root = root.get(), "Initialized sparse index");
            return Ok(Self { store, meta });
        }

        if meta.version != META_VERSION {
            return Err(StoreError::FormatMismatch(format!(
                "unsupported index metadata version: {}",
                meta.version
            )));
        }

        let root_live = RecordId::from_raw(meta.root).is_some_and(|root| store.is_live(root));
        if !root_live {
            return Err(StoreError::IndexCorruption(format!(
                "root node {} is not a live record",
                meta.root
            )));
        }

        debug!(root = meta.root, entries = meta.entries, "Opened sparse index");
        Ok(Self { store, meta })
    }

    /// Map `key` to `value`, creating intermediate nodes as needed
    ///
    /// `value` must be non-zero. `put(key, 0)` fails with
    /// `StoreError::ReservedValue` and leaves any existing mapping in place;
    /// use [`SparseIndex::remove`] to unmap a key.
    pub fn put(&mut self, key: u32, value: u32) -> Result<()> {
        if value == 0 {
            return Err(StoreError::ReservedValue);
        }

        let digits = split_key(key);
        let mut node_id = self.root()?;
        let mut node = self.read_node(node_id)?;

        for &digit in &digits[..LEVELS - 1] {
            let child = node.slot(digit);
            if child == 0 {
                // Zero the child before linking it: popped records hold stale bytes.
                // The allocation is flushed before any parent slot can point at it.
                let child_id = self.store.create_record()?;
                let child_node = TrieNode::empty();
                self.store.put_record(child_id, &child_node.to_bytes())?;
                self.store.refresh()?;

                node.set_slot(digit, child_id.get());
                self.store.put_record(node_id, &node.to_bytes())?;

                trace!(parent = node_id.get(), child = child_id.get(), digit, "Allocated trie node");
                node_id = child_id;
                node = child_node;
            } else {
                node_id = self.child_id(child)?;
                node = self.read_node(node_id)?;
            }
        }

        let leaf_digit = digits[LEVELS - 1];
        let previous = node.slot(leaf_digit);
        node.set_slot(leaf_digit, value);
        self.store.put_record(node_id, &node.to_bytes())?;

        if previous == 0 {
            self.meta.entries += 1;
            self.save_meta()?;
        }
        self.store.refresh()
    }

    /// Look up `key`; `None` when it was never mapped or was removed
    pub fn get(&mut self, key: u32) -> Result<Option<u32>> {
        let digits = split_key(key);
        let Some((_, leaf)) = self.find_leaf(&digits)? else {
            return Ok(None);
        };

        let value = leaf.slot(digits[LEVELS - 1]);
        Ok((value != 0).then_some(value))
    }

    /// Whether `key` is mapped
    pub fn contains(&mut self, key: u32) -> Result<bool> {
        Ok(self.get(key)?.is_some())
    }

    /// Unmap `key`, returning its previous value
    pub fn remove(&mut self, key: u32) -> Result<Option<u32>> {
        let digits = split_key(key);
        let Some((leaf_id, mut leaf)) = self.find_leaf(&digits)? else {
            return Ok(None);
        };

        let leaf_digit = digits[LEVELS - 1];
        let previous = leaf.slot(leaf_digit);
        if previous == 0 {
            return Ok(None);
        }

        leaf.set_slot(leaf_digit, 0);
        self.store.put_record(leaf_id, &leaf.to_bytes())?;

        self.meta.entries = self.meta.entries.saturating_sub(1);
        self.save_meta()?;
        self.store.refresh()?;

        Ok(Some(previous))
    }

    /// All mappings in ascending key order
    pub fn entries(&mut self) -> Result<Vec<(u32, u32)>> {
        let mut out = Vec::new();
        let root = self.read_node(self.root()?)?;
        self.collect(&root, 0, 0, &mut out)?;
        Ok(out)
    }

    /// Number of mapped keys
    pub fn len(&self) -> u64 {
        self.meta.entries
    }

    pub fn is_empty(&self) -> bool {
        self.meta.entries == 0
    }

    /// Number of trie nodes allocated, root included
    pub fn node_count(&self) -> u32 {
        self.store.entries_allocated()
    }

    /// The underlying record store
    pub fn store(&self) -> &RecordStore<F> {
        &self.store
    }

    /// Flush and close the underlying store
    pub fn close(self) -> Result<()> {
        self.store.close()
    }

    // =========================================================================
    // Private Helpers
    // =========================================================================

    fn root(&self) -> Result<RecordId> {
        RecordId::from_raw(self.meta.root).ok_or_else(|| {
            StoreError::IndexCorruption(format!("invalid root pointer {}", self.meta.root))
        })
    }

    fn child_id(&self, raw: u32) -> Result<RecordId> {
        RecordId::from_raw(raw)
            .filter(|id| self.store.is_live(*id))
            .ok_or_else(|| StoreError::IndexCorruption(format!("invalid child pointer {}", raw)))
    }

    fn read_node(&mut self, id: RecordId) -> Result<TrieNode> {
        TrieNode::from_bytes(&self.store.get_record(id)?)
    }

    /// Walk the first three levels read-only; `None` at the first absent child
    fn find_leaf(&mut self, digits: &[u8; LEVELS]) -> Result<Option<(RecordId, TrieNode)>> {
        let mut node_id = self.root()?;
        let mut node = self.read_node(node_id)?;

        for &digit in &digits[..LEVELS - 1] {
            let child = node.slot(digit);
            if child == 0 {
                return Ok(None);
            }
            node_id = self.child_id(child)?;
            node = self.read_node(node_id)?;
        }

        Ok(Some((node_id, node)))
    }

    fn collect(
        &mut self,
        node: &TrieNode,
        depth: usize,
        prefix: u32,
        out: &mut Vec<(u32, u32)>,
    ) -> Result<()> {
        let occupied: Vec<(u8, u32)> = node.occupied().collect();
        for (digit, slot) in occupied {
            let key = (prefix << 8) | digit as u32;
            if depth == LEVELS - 1 {
                out.push((key, slot));
            } else {
                let child = self.read_node(self.child_id(slot)?)?;
                self.collect(&child, depth + 1, key, out)?;
            }
        }
        Ok(())
    }

    fn save_meta(&mut self) -> Result<()> {
        self.meta.write_to(self.store.optional_header_mut())?;
        self.store.mark_dirty();
        Ok(())
    }
}
