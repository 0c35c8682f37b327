//! Record Module
//!
//! Fixed-record slotted file store.
//!
//! ## Responsibilities
//! - Fixed-size records addressed by integer index
//! - LIFO free-list threaded through deleted records
//! - Write-back cached header with explicit dirty tracking
//! - Optional header bytes reserved for the owning client
//!
//! ## File Format (V1)
//! ```text
//! ┌────────────────────────────────────────────────────────────┐
//! │ Header (128 bytes)                                         │
//! │   Tag (4) | Version (4) | FirstFree (4) | LastEntry (4)    │
//! │   Allocated (4) | Free (4) | EntrySize (4) | HdrSize (4)   │
//! │   Dirty (1) | Reserved (27) | CRC32 (4)                    │
//! │   Optional Header (64)                                     │
//! ├────────────────────────────────────────────────────────────┤
//! │ Record 0 (reserved, never issued)                          │
//! ├────────────────────────────────────────────────────────────┤
//! │ Record 1 .. LastEntry-1 (EntrySize bytes each, no padding) │
//! │   live:  client bytes                                      │
//! │   free:  [Next | 0xC0000000 (4)][stale bytes...]           │
//! └────────────────────────────────────────────────────────────┘
//! ```
//!
//! Record `i` lives at byte offset `HEADER_SIZE + i * EntrySize`.

mod free_list;
mod header;
mod store;

use std::fmt;

pub use header::StoreHeader;
pub use store::{RecordStore, StoreStats};

// =============================================================================
// Shared Constants (used by header, free list, store)
// =============================================================================

/// Tag identifying a valid, open store header ("FLAT")
pub const MAGIC: u32 = 0x464C_4154;

/// Tag written over the in-memory header when the store is closed
pub(crate) const DEAD_MAGIC: u32 = 0xDEAD_F1A7;

/// Current store format version
pub const VERSION: u32 = 1;

/// Total header size on disk, optional header included
pub const HEADER_SIZE: u64 = 128;

/// Capacity of the client-private optional header
pub const OPTIONAL_HEADER_SIZE: usize = 64;

/// Smallest record size; a free record must hold its 4-byte link
pub const MIN_ENTRY_SIZE: u32 = 4;

/// Tag bits OR'd into every free-list link
pub(crate) const FREE_LINK_TAG: u32 = 0xC000_0000;

/// Record indices must stay below the free-list tag bits
pub const MAX_RECORDS: u32 = 0x4000_0000;

// =============================================================================
// Record Handle
// =============================================================================

/// Index of a live record, issued by [`RecordStore::create_record`].
///
/// Index 0 is never issued, so it can serve as "no record" in client
/// structures built on top of the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct RecordId(u32);

impl RecordId {
    pub(crate) fn new(index: u32) -> Self {
        debug_assert!(index != 0 && index < MAX_RECORDS);
        Self(index)
    }

    /// Rebuild an id a client persisted earlier.
    ///
    /// Returns `None` for the reserved index 0 and for values that cannot
    /// be record indices. Liveness is checked by the store on use.
    pub fn from_raw(index: u32) -> Option<Self> {
        if index == 0 || index >= MAX_RECORDS {
            None
        } else {
            Some(Self(index))
        }
    }

    /// Raw index value
    pub fn get(self) -> u32 {
        self.0
    }
}

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}
