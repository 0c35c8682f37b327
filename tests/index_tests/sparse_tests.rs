//! Tests for SparseIndex
//!
//! These tests verify:
//! - Index creation and root allocation
//! - Put/get/remove semantics and the reserved zero value
//! - Node allocation along shared key prefixes
//! - Persistence across reopen
//! - Rejection of mismatched or corrupted index files
//! - Consistency after a crash partway through a put

use std::io;
use std::path::PathBuf;

use flatstore::file::{MemoryFile, StoreFile};
use flatstore::index::{IndexMeta, SparseIndex, NODE_SIZE};
use flatstore::record::RecordStore;
use flatstore::{Config, StoreError};
use tempfile::TempDir;

// =============================================================================
// Helper Functions
// =============================================================================

fn setup_temp_index() -> (TempDir, PathBuf) {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("lookup.idx");
    (temp_dir, path)
}

fn memory_index() -> SparseIndex<MemoryFile> {
    SparseIndex::open_file(MemoryFile::new(), &Config::default()).unwrap()
}

/// Memory file whose writes start failing after a fixed number succeed
struct CrashingFile {
    inner: MemoryFile,
    writes_left: usize,
}

impl StoreFile for CrashingFile {
    fn read_exact_at(&mut self, offset: u64, buf: &mut [u8]) -> io::Result<()> {
        self.inner.read_exact_at(offset, buf)
    }

    fn write_all_at(&mut self, offset: u64, buf: &[u8]) -> io::Result<()> {
        if self.writes_left == 0 {
            return Err(io::Error::new(io::ErrorKind::Other, "crash"));
        }
        self.writes_left -= 1;
        self.inner.write_all_at(offset, buf)
    }

    fn len(&self) -> io::Result<u64> {
        self.inner.len()
    }

    fn sync(&mut self) -> io::Result<()> {
        self.inner.sync()
    }
}

// =============================================================================
// Open/Create Tests
// =============================================================================

#[test]
fn test_open_allocates_root() {
    let (_temp, path) = setup_temp_index();

    let index = SparseIndex::open(&path).unwrap();

    assert!(index.is_empty());
    assert_eq!(index.node_count(), 1);
    assert_eq!(index.store().entry_size(), NODE_SIZE);

    let meta = IndexMeta::read_from(index.store().optional_header()).unwrap();
    assert_eq!(meta.root, 1);
    assert!(!index.store().is_dirty(), "root is flushed on create");
}

#[test]
fn test_open_wrong_entry_size_fails() {
    let (_temp, path) = setup_temp_index();
    RecordStore::open(&path, 8).unwrap().close().unwrap();

    let result = SparseIndex::open(&path);

    assert!(matches!(result, Err(StoreError::FormatMismatch(_))));
}

#[test]
fn test_open_finishes_interrupted_create() {
    let (_temp, path) = setup_temp_index();

    // Store file exists but the root was never recorded
    RecordStore::open(&path, NODE_SIZE).unwrap().close().unwrap();

    let mut index = SparseIndex::open(&path).unwrap();
    index.put(5, 50).unwrap();
    assert_eq!(index.get(5).unwrap(), Some(50));
}

#[test]
fn test_open_unknown_meta_version_fails() {
    let file = MemoryFile::new();
    memory_index_on(&file).close().unwrap();

    {
        let mut store = RecordStore::open_file(file.clone(), NODE_SIZE, &Config::default()).unwrap();
        let mut meta = IndexMeta::read_from(store.optional_header()).unwrap();
        meta.version = 99;
        meta.write_to(store.optional_header_mut()).unwrap();
        store.mark_dirty();
        store.close().unwrap();
    }

    let result = SparseIndex::open_file(file, &Config::default());
    assert!(matches!(result, Err(StoreError::FormatMismatch(_))));
}

#[test]
fn test_open_dead_root_fails() {
    let file = MemoryFile::new();
    memory_index_on(&file).close().unwrap();

    {
        let mut store = RecordStore::open_file(file.clone(), NODE_SIZE, &Config::default()).unwrap();
        let mut meta = IndexMeta::read_from(store.optional_header()).unwrap();
        meta.root = 50;
        meta.write_to(store.optional_header_mut()).unwrap();
        store.mark_dirty();
        store.close().unwrap();
    }

    let result = SparseIndex::open_file(file, &Config::default());
    assert!(matches!(result, Err(StoreError::IndexCorruption(_))));
}

fn memory_index_on(file: &MemoryFile) -> SparseIndex<MemoryFile> {
    SparseIndex::open_file(file.clone(), &Config::default()).unwrap()
}

// =============================================================================
// Put/Get Tests
// =============================================================================

#[test]
fn test_put_and_get() {
    let mut index = memory_index();

    index.put(0x0000_0001, 42).unwrap();
    index.put(0x0000_0002, 7).unwrap();

    assert_eq!(index.get(0x0000_0001).unwrap(), Some(42));
    assert_eq!(index.get(0x0000_0002).unwrap(), Some(7));
    assert_eq!(index.get(0x0000_0003).unwrap(), None);
    assert_eq!(index.len(), 2);
}

#[test]
fn test_get_absent_on_empty_index() {
    let mut index = memory_index();

    assert_eq!(index.get(0).unwrap(), None);
    assert_eq!(index.get(0xDEAD_BEEF).unwrap(), None);
    assert!(!index.contains(0xDEAD_BEEF).unwrap());
}

#[test]
fn test_get_does_not_allocate() {
    let mut index = memory_index();

    index.get(0x0102_0304).unwrap();

    assert_eq!(index.node_count(), 1);
}

#[test]
fn test_put_zero_rejected() {
    let mut index = memory_index();

    let result = index.put(10, 0);

    assert!(matches!(result, Err(StoreError::ReservedValue)));
    assert_eq!(index.node_count(), 1);
    assert!(index.is_empty());
}

#[test]
fn test_put_zero_keeps_existing_mapping() {
    let mut index = memory_index();
    index.put(10, 5).unwrap();

    let result = index.put(10, 0);

    assert!(matches!(result, Err(StoreError::ReservedValue)));
    assert_eq!(index.get(10).unwrap(), Some(5));
    assert_eq!(index.remove(10).unwrap(), Some(5));
    assert_eq!(index.get(10).unwrap(), None);
}

#[test]
fn test_overwrite_keeps_count() {
    let mut index = memory_index();

    index.put(99, 1).unwrap();
    index.put(99, 2).unwrap();

    assert_eq!(index.get(99).unwrap(), Some(2));
    assert_eq!(index.len(), 1);
}

#[test]
fn test_boundary_keys() {
    let mut index = memory_index();

    index.put(0, 1).unwrap();
    index.put(u32::MAX, u32::MAX).unwrap();

    assert_eq!(index.get(0).unwrap(), Some(1));
    assert_eq!(index.get(u32::MAX).unwrap(), Some(u32::MAX));
}

#[test]
fn test_many_distinct_keys() {
    let mut index = memory_index();
    let keys: Vec<u32> = (0..500u32).map(|i| i.wrapping_mul(2_654_435_761)).collect();

    for (i, key) in keys.iter().enumerate() {
        index.put(*key, i as u32 + 1).unwrap();
    }

    for (i, key) in keys.iter().enumerate() {
        assert_eq!(index.get(*key).unwrap(), Some(i as u32 + 1));
    }
    assert_eq!(index.len(), 500);
}

// =============================================================================
// Node Allocation Tests
// =============================================================================

#[test]
fn test_nodes_shared_along_prefix() {
    let mut index = memory_index();

    index.put(0x0000_0001, 1).unwrap();
    assert_eq!(index.node_count(), 4); // root + 3 levels

    index.put(0x0000_0002, 2).unwrap();
    assert_eq!(index.node_count(), 4); // same leaf

    index.put(0x0100_0000, 3).unwrap();
    assert_eq!(index.node_count(), 7); // new branch under the root

    index.put(0x0001_0000, 4).unwrap();
    assert_eq!(index.node_count(), 9); // shares the level-2 node
}

#[test]
fn test_recycled_records_are_zeroed_before_use() {
    let file = MemoryFile::new();

    // Leave two dirty records on the free list
    {
        let mut store = RecordStore::open_file(file.clone(), NODE_SIZE, &Config::default()).unwrap();
        let a = store.create_record().unwrap();
        let b = store.create_record().unwrap();
        store.put_record(a, &vec![0xFF; NODE_SIZE as usize]).unwrap();
        store.put_record(b, &vec![0xFF; NODE_SIZE as usize]).unwrap();
        store.delete_record(b).unwrap();
        store.delete_record(a).unwrap();
        store.close().unwrap();
    }

    let mut index = SparseIndex::open_file(file, &Config::default()).unwrap();
    index.put(0x0102_0304, 9).unwrap();

    assert_eq!(index.get(0x0102_0304).unwrap(), Some(9));
    assert_eq!(index.get(0x01FF_0000).unwrap(), None);
    assert_eq!(index.get(0xFF00_0000).unwrap(), None);
    assert_eq!(index.entries().unwrap(), vec![(0x0102_0304, 9)]);
}

// =============================================================================
// Remove Tests
// =============================================================================

#[test]
fn test_remove_returns_previous() {
    let mut index = memory_index();
    index.put(500, 5).unwrap();

    assert_eq!(index.remove(500).unwrap(), Some(5));
    assert_eq!(index.get(500).unwrap(), None);
    assert!(index.is_empty());
}

#[test]
fn test_remove_absent_key() {
    let mut index = memory_index();
    index.put(0x0000_0001, 1).unwrap();

    assert_eq!(index.remove(0x0000_0002).unwrap(), None); // leaf exists, slot empty
    assert_eq!(index.remove(0x0500_0000).unwrap(), None); // no path
    assert_eq!(index.len(), 1);
}

#[test]
fn test_remove_keeps_nodes() {
    let mut index = memory_index();
    index.put(0x0A0B_0C0D, 1).unwrap();

    index.remove(0x0A0B_0C0D).unwrap();

    assert_eq!(index.node_count(), 4);
    assert!(index.entries().unwrap().is_empty());
}

// =============================================================================
// Iteration Tests
// =============================================================================

#[test]
fn test_entries_sorted_by_key() {
    let mut index = memory_index();
    for key in [0xFFFF_FFFFu32, 3, 0x0100_0000, 0x0000_0100, 2] {
        index.put(key, key ^ 0xAAAA_AAAA).unwrap();
    }

    let keys: Vec<u32> = index.entries().unwrap().into_iter().map(|(k, _)| k).collect();

    assert_eq!(keys, vec![2, 3, 0x0000_0100, 0x0100_0000, 0xFFFF_FFFF]);
}

// =============================================================================
// Persistence Tests
// =============================================================================

#[test]
fn test_persistence_after_close() {
    let (_temp, path) = setup_temp_index();

    {
        let mut index = SparseIndex::open(&path).unwrap();
        for key in 0..100u32 {
            index.put(key << 12, key + 1000).unwrap();
        }
        index.remove(0).unwrap();
        index.close().unwrap();
    }

    let mut index = SparseIndex::open(&path).unwrap();
    assert_eq!(index.len(), 99);
    assert_eq!(index.get(0).unwrap(), None);
    for key in 1..100u32 {
        assert_eq!(index.get(key << 12).unwrap(), Some(key + 1000));
    }
}

#[test]
fn test_each_put_leaves_header_clean() {
    let mut index = memory_index();

    index.put(0x1234_5678, 1).unwrap();

    assert!(!index.store().is_dirty());
}

// =============================================================================
// Crash Tests
// =============================================================================

#[test]
fn test_crash_mid_put_never_cross_links_keys() {
    let mut completed = false;

    for budget in 0..32 {
        let file = MemoryFile::new();
        {
            let mut index = SparseIndex::open_file(file.clone(), &Config::default()).unwrap();
            index.put(0x0300_0001, 33).unwrap();
            index.close().unwrap();
        }

        {
            let crashing = CrashingFile {
                inner: file.clone(),
                writes_left: budget,
            };
            let mut index = SparseIndex::open_file(crashing, &Config::default()).unwrap();
            completed = index.put(0x0100_0001, 11).is_ok();
            // Simulated crash: no close, no drop
            std::mem::forget(index);
        }

        let mut index = SparseIndex::open_file(file, &Config::default()).unwrap();
        let interrupted = index.get(0x0100_0001).unwrap();
        assert!(
            interrupted.is_none() || interrupted == Some(11),
            "budget {}: got {:?}",
            budget,
            interrupted
        );

        index.put(0x0200_0001, 22).unwrap();

        assert_eq!(index.get(0x0100_0001).unwrap(), interrupted, "budget {}", budget);
        assert_eq!(index.get(0x0200_0001).unwrap(), Some(22));
        assert_eq!(index.get(0x0300_0001).unwrap(), Some(33));
        let values: Vec<u32> = index.entries().unwrap().into_iter().map(|(_, v)| v).collect();
        assert_eq!(values.iter().filter(|&&v| v == 22).count(), 1);

        if completed {
            break;
        }
    }

    assert!(completed, "put never completed within the write budget");
}
