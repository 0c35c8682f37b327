//! File Module
//!
//! Byte-oriented file abstraction consumed by the record store.
//!
//! ## Responsibilities
//! - Positional reads and writes of exact byte counts
//! - Size queries and durability (fsync)
//! - Swappable backends: disk for production, memory for crash tests
//!
//! Reads that run past the end of the file yield zeros for the missing
//! tail, so a record slot that was allocated but never written reads back
//! as an all-zero block.

mod disk;
mod memory;

use std::io;

pub use disk::DiskFile;
pub use memory::MemoryFile;

/// Storage backend for a record store
pub trait StoreFile {
    /// Read exactly `buf.len()` bytes starting at `offset`
    fn read_exact_at(&mut self, offset: u64, buf: &mut [u8]) -> io::Result<()>;

    /// Write all of `buf` starting at `offset`, growing the file if needed
    fn write_all_at(&mut self, offset: u64, buf: &[u8]) -> io::Result<()>;

    /// Current file length in bytes
    fn len(&self) -> io::Result<u64>;

    /// Whether the file holds no bytes at all
    fn is_empty(&self) -> io::Result<bool> {
        Ok(self.len()? == 0)
    }

    /// Flush file contents to durable storage
    fn sync(&mut self) -> io::Result<()>;
}
