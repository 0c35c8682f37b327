//! Record Store
//!
//! Owns the store file, the cached header and the in-memory free set.

use std::collections::HashSet;
use std::path::Path;

use tracing::{debug, info, trace, warn};

use crate::config::{Config, SyncStrategy};
use crate::error::Result;
use crate::file::{DiskFile, StoreFile};
use crate::StoreError;

use super::free_list::{self, encode_link, record_offset};
use super::{RecordId, StoreHeader, DEAD_MAGIC, HEADER_SIZE, MAGIC, MAX_RECORDS, MIN_ENTRY_SIZE};

/// Snapshot of store bookkeeping
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StoreStats {
    /// Fixed size of every record in bytes
    pub entry_size: u32,
    /// One past the highest index ever allocated
    pub last_entry: u32,
    /// Live records
    pub entries_allocated: u32,
    /// Records on the free list
    pub entries_free: u32,
    /// Current file length in bytes
    pub file_len: u64,
}

/// A file of fixed-size records behind a cached header
///
/// ## Durability:
/// - Record writes (`put_record`, `delete_record`) go straight to the file
/// - Header bookkeeping (free list head, counters, optional header) is
///   buffered until `refresh` or `close`
/// - Dropping a store with a dirty header flushes it
pub struct RecordStore<F: StoreFile = DiskFile> {
    /// Backing file
    file: F,

    /// Cached header; authoritative while the store is open
    header: StoreHeader,

    /// Every index currently on the free list
    free: HashSet<u32>,

    /// When to fsync
    sync_strategy: SyncStrategy,

    /// Whether this open created the file
    created: bool,
}

impl RecordStore<DiskFile> {
    /// Open or create a store file with default config
    pub fn open(path: &Path, entry_size: u32) -> Result<Self> {
        Self::open_with_config(path, entry_size, &Config::default())
    }

    /// Open or create a store file
    ///
    /// An existing file must match tag, version and `entry_size`; a mismatch
    /// fails the open without writing anything to the file.
    pub fn open_with_config(path: &Path, entry_size: u32, config: &Config) -> Result<Self> {
        let file = if DiskFile::exists(path) {
            DiskFile::open(path)?
        } else if config.create_if_missing {
            DiskFile::create(path)?
        } else {
            return Err(StoreError::NotFound(path.to_path_buf()));
        };

        debug!(path = %path.display(), entry_size, "Opening record store");
        Self::open_file(file, entry_size, config)
    }
}

impl<F: StoreFile> RecordStore<F> {
    /// Open a store on an arbitrary backend.
    ///
    /// An empty file is initialized as a new store and its header flushed
    /// immediately. `entry_size` is clamped to [`MIN_ENTRY_SIZE`].
    pub fn open_file(mut file: F, entry_size: u32, config: &Config) -> Result<Self> {
        let entry_size = entry_size.max(MIN_ENTRY_SIZE);

        if file.is_empty()? {
            let mut store = Self {
                file,
                header: StoreHeader::new(entry_size),
                free: HashSet::new(),
                sync_strategy: config.sync_strategy,
                created: true,
            };
            store.refresh()?;
            info!(entry_size, "Created new record store");
            return Ok(store);
        }

        let file_len = file.len()?;
        if file_len < HEADER_SIZE {
            return Err(StoreError::FormatMismatch(format!(
                "file too short for header: {} bytes",
                file_len
            )));
        }

        let mut buf = vec![0u8; HEADER_SIZE as usize];
        file.read_exact_at(0, &mut buf)?;
        let header = StoreHeader::decode(&buf)?;
        header.validate_entry_size(entry_size)?;

        let free = free_list::walk(&mut file, &header)?;
        if free.len() as u32 != header.entries_free {
            debug!(
                walked = free.len(),
                recorded = header.entries_free,
                "Free counter differs from free list length"
            );
        }

        debug!(
            last_entry = header.last_entry,
            allocated = header.entries_allocated,
            free = free.len(),
            "Opened existing record store"
        );

        Ok(Self {
            file,
            header,
            free,
            sync_strategy: config.sync_strategy,
            created: false,
        })
    }

    /// Allocate a record.
    ///
    /// Pops the free list head when there is one, otherwise grows the store
    /// by one slot. The returned record's contents are undefined until the
    /// caller writes it. Marks the header dirty without flushing.
    pub fn create_record(&mut self) -> Result<RecordId> {
        self.ensure_live()?;

        let index = if self.header.first_free != 0 {
            let head = self.header.first_free;
            let next = free_list::read_link(&mut self.file, head, self.header.entry_size)?;
            if next >= self.header.last_entry {
                return Err(StoreError::FreeListCorruption(format!(
                    "record {} links to {} beyond last entry {}",
                    head, next, self.header.last_entry
                )));
            }

            self.header.first_free = next;
            self.header.entries_free = self.header.entries_free.saturating_sub(1);
            self.free.remove(&head);

            trace!(index = head, next, "Reusing record from free list");
            head
        } else {
            let index = self.header.last_entry;
            if index >= MAX_RECORDS {
                return Err(StoreError::CapacityExhausted);
            }
            self.header.last_entry += 1;

            trace!(index, "Allocating record from end");
            index
        };

        self.header.entries_allocated += 1;
        self.header.dirty = true;

        Ok(RecordId::new(index))
    }

    /// Read a copy of a record
    pub fn get_record(&mut self, id: RecordId) -> Result<Vec<u8>> {
        self.check_record(id)?;

        let mut data = vec![0u8; self.header.entry_size as usize];
        self.file.read_exact_at(self.offset(id), &mut data)?;
        Ok(data)
    }

    /// Overwrite a record; `data` must be exactly `entry_size` bytes
    pub fn put_record(&mut self, id: RecordId, data: &[u8]) -> Result<()> {
        self.check_record(id)?;

        let expected = self.header.entry_size as usize;
        if data.len() != expected {
            return Err(StoreError::RecordSize {
                expected,
                actual: data.len(),
            });
        }

        self.file.write_all_at(self.offset(id), data)?;
        if self.sync_strategy == SyncStrategy::EveryWrite {
            self.file.sync()?;
        }
        Ok(())
    }

    /// Recycle a record onto the free list.
    ///
    /// Only the first 4 bytes are overwritten (with the link). Marks the
    /// header dirty without flushing.
    pub fn delete_record(&mut self, id: RecordId) -> Result<()> {
        self.check_record(id)?;

        let index = id.get();
        self.file
            .write_all_at(self.offset(id), &encode_link(self.header.first_free))?;
        if self.sync_strategy == SyncStrategy::EveryWrite {
            self.file.sync()?;
        }

        self.header.first_free = index;
        self.header.entries_allocated = self.header.entries_allocated.saturating_sub(1);
        self.header.entries_free += 1;
        self.header.dirty = true;
        self.free.insert(index);

        trace!(index, "Record freed");
        Ok(())
    }

    /// Write the header back if it is dirty
    pub fn refresh(&mut self) -> Result<()> {
        self.ensure_live()?;

        if !self.header.dirty {
            return Ok(());
        }

        self.file.write_all_at(0, &self.header.encode())?;
        if self.sync_strategy != SyncStrategy::Never {
            self.file.sync()?;
        }
        self.header.dirty = false;

        debug!(
            first_free = self.header.first_free,
            last_entry = self.header.last_entry,
            "Header flushed"
        );
        Ok(())
    }

    /// Client-private header bytes
    pub fn optional_header(&self) -> &[u8] {
        &self.header.optional
    }

    /// Mutable client-private header bytes; call `mark_dirty` after changing
    pub fn optional_header_mut(&mut self) -> &mut [u8] {
        &mut self.header.optional
    }

    /// Flag the header as changed so the next `refresh` writes it
    pub fn mark_dirty(&mut self) {
        self.header.dirty = true;
    }

    /// Flush the header and release the file
    pub fn close(mut self) -> Result<()> {
        self.refresh()?;
        self.header.tag = DEAD_MAGIC;
        debug!(last_entry = self.header.last_entry, "Record store closed");
        Ok(())
    }

    // =========================================================================
    // Accessors
    // =========================================================================

    /// Whether `id` currently refers to a live record
    pub fn is_live(&self, id: RecordId) -> bool {
        id.get() < self.header.last_entry && !self.free.contains(&id.get())
    }

    /// Whether this open created the file
    pub fn was_created(&self) -> bool {
        self.created
    }

    pub fn entry_size(&self) -> u32 {
        self.header.entry_size
    }

    pub fn last_entry(&self) -> u32 {
        self.header.last_entry
    }

    pub fn entries_allocated(&self) -> u32 {
        self.header.entries_allocated
    }

    pub fn entries_free(&self) -> u32 {
        self.header.entries_free
    }

    pub fn is_dirty(&self) -> bool {
        self.header.dirty
    }

    /// The cached header
    pub fn header(&self) -> &StoreHeader {
        &self.header
    }

    /// Bookkeeping snapshot
    pub fn stats(&self) -> Result<StoreStats> {
        Ok(StoreStats {
            entry_size: self.header.entry_size,
            last_entry: self.header.last_entry,
            entries_allocated: self.header.entries_allocated,
            entries_free: self.header.entries_free,
            file_len: self.file.len()?,
        })
    }

    // =========================================================================
    // Private Helpers
    // =========================================================================

    fn ensure_live(&self) -> Result<()> {
        if self.header.tag != MAGIC {
            return Err(StoreError::BadHandle);
        }
        Ok(())
    }

    fn check_record(&self, id: RecordId) -> Result<()> {
        self.ensure_live()?;

        let index = id.get();
        if index >= self.header.last_entry {
            return Err(StoreError::OutOfBounds {
                index,
                last_entry: self.header.last_entry,
            });
        }
        if self.free.contains(&index) {
            return Err(StoreError::StaleRecord(index));
        }
        Ok(())
    }

    fn offset(&self, id: RecordId) -> u64 {
        record_offset(id.get(), self.header.entry_size)
    }
}

impl<F: StoreFile> Drop for RecordStore<F> {
    fn drop(&mut self) {
        if self.header.tag == MAGIC && self.header.dirty {
            if let Err(e) = self.refresh() {
                warn!("Failed to flush record store header on drop: {}", e);
            }
        }
    }
}
