//! Free List
//!
//! Deleted records form a LIFO chain: the first 4 bytes of each free record
//! hold the next free index with the tag bits set. A link without the tag
//! means the chain runs through a record that was overwritten.

use std::collections::HashSet;

use tracing::warn;

use crate::error::Result;
use crate::file::StoreFile;
use crate::StoreError;

use super::{StoreHeader, FREE_LINK_TAG, HEADER_SIZE};

/// Encode a link to `next` (0 terminates the list)
pub(crate) fn encode_link(next: u32) -> [u8; 4] {
    (next | FREE_LINK_TAG).to_le_bytes()
}

/// Decode a link read from a free record, checking its tag bits
pub(crate) fn decode_link(index: u32, bytes: [u8; 4]) -> Result<u32> {
    let raw = u32::from_le_bytes(bytes);
    if raw & FREE_LINK_TAG != FREE_LINK_TAG {
        return Err(StoreError::FreeListCorruption(format!(
            "record {} carries untagged link {:#010x}",
            index, raw
        )));
    }
    Ok(raw & !FREE_LINK_TAG)
}

/// Byte offset of record `index`
pub(crate) fn record_offset(index: u32, entry_size: u32) -> u64 {
    HEADER_SIZE + index as u64 * entry_size as u64
}

/// Read the link stored in free record `index`
pub(crate) fn read_link<F: StoreFile>(file: &mut F, index: u32, entry_size: u32) -> Result<u32> {
    let mut link = [0u8; 4];
    file.read_exact_at(record_offset(index, entry_size), &mut link)?;
    decode_link(index, link)
}

/// Walk the on-disk free list and collect every free index.
///
/// A crash after a pop but before the next header flush leaves the on-disk
/// head naming a record that already holds client data. The walk stops at
/// the first bad link (untagged, past `last_entry`, or a cycle) and keeps
/// what it collected; the record holding the bad link is not counted as
/// free. `create_record` reports the corruption if it ever pops it.
pub(crate) fn walk<F: StoreFile>(file: &mut F, header: &StoreHeader) -> Result<HashSet<u32>> {
    let mut free = HashSet::new();
    let mut current = header.first_free;

    while current != 0 {
        if current >= header.last_entry {
            warn!(
                link = current,
                last_entry = header.last_entry,
                "Free list link beyond last entry; stopping walk"
            );
            break;
        }
        if free.contains(&current) {
            warn!(index = current, "Free list cycle; stopping walk");
            break;
        }

        match read_link(file, current, header.entry_size) {
            Ok(next) => {
                free.insert(current);
                current = next;
            }
            Err(StoreError::FreeListCorruption(reason)) => {
                warn!(%reason, "Stale free list; stopping walk");
                break;
            }
            Err(e) => return Err(e),
        }
    }

    Ok(free)
}
