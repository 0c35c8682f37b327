//! Store Header
//!
//! Encoding, decoding and validation of the fixed-size file header.

use bytes::{Buf, BufMut, BytesMut};

use crate::error::Result;
use crate::StoreError;

use super::{HEADER_SIZE, MAGIC, OPTIONAL_HEADER_SIZE, VERSION};

/// Byte offset of the header checksum
const CRC_OFFSET: usize = 60;

/// Reserved bytes between the dirty flag and the checksum
const RESERVED_SIZE: usize = 27;

/// In-memory copy of the store header
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreHeader {
    pub(crate) tag: u32,
    pub(crate) version: u32,
    /// Head of the free list, untagged; 0 means empty
    pub(crate) first_free: u32,
    /// One past the highest index ever allocated
    pub(crate) last_entry: u32,
    pub(crate) entries_allocated: u32,
    pub(crate) entries_free: u32,
    pub(crate) entry_size: u32,
    pub(crate) header_size: u32,
    pub(crate) dirty: bool,
    pub(crate) optional: [u8; OPTIONAL_HEADER_SIZE],
}

impl StoreHeader {
    /// Fresh header for a new store; starts dirty so it gets flushed
    pub fn new(entry_size: u32) -> Self {
        Self {
            tag: MAGIC,
            version: VERSION,
            first_free: 0,
            last_entry: 1,
            entries_allocated: 0,
            entries_free: 0,
            entry_size,
            header_size: HEADER_SIZE as u32,
            dirty: true,
            optional: [0u8; OPTIONAL_HEADER_SIZE],
        }
    }

    /// Serialize to the on-disk layout, checksum included
    pub fn encode(&self) -> Vec<u8> {
        let mut buf = BytesMut::with_capacity(HEADER_SIZE as usize);

        buf.put_u32_le(self.tag);
        buf.put_u32_le(self.version);
        buf.put_u32_le(self.first_free);
        buf.put_u32_le(self.last_entry);
        buf.put_u32_le(self.entries_allocated);
        buf.put_u32_le(self.entries_free);
        buf.put_u32_le(self.entry_size);
        buf.put_u32_le(self.header_size);
        // The flag on disk is always clean: writing it is what cleans it
        buf.put_u8(0);
        buf.put_bytes(0, RESERVED_SIZE);
        buf.put_u32_le(0); // Placeholder for CRC
        buf.put_slice(&self.optional);

        let crc = checksum(&buf);
        buf[CRC_OFFSET..CRC_OFFSET + 4].copy_from_slice(&crc.to_le_bytes());

        buf.to_vec()
    }

    /// Parse and verify a header read from disk.
    ///
    /// Checks tag, checksum, version and header size. The entry size is
    /// checked separately by [`StoreHeader::validate_entry_size`].
    pub fn decode(bytes: &[u8]) -> Result<Self> {
        if bytes.len() < HEADER_SIZE as usize {
            return Err(StoreError::FormatMismatch(format!(
                "truncated header: {} of {} bytes",
                bytes.len(),
                HEADER_SIZE
            )));
        }
        let bytes = &bytes[..HEADER_SIZE as usize];

        let mut cur = bytes;
        let tag = cur.get_u32_le();
        if tag != MAGIC {
            return Err(StoreError::FormatMismatch(format!(
                "invalid store tag: expected {:#010x}, got {:#010x}",
                MAGIC, tag
            )));
        }

        let stored_crc = u32::from_le_bytes(
            bytes[CRC_OFFSET..CRC_OFFSET + 4]
                .try_into()
                .map_err(|_| StoreError::HeaderCorruption("short checksum".to_string()))?,
        );
        let actual_crc = checksum(bytes);
        if stored_crc != actual_crc {
            return Err(StoreError::HeaderCorruption(format!(
                "checksum mismatch: stored {:#010x}, computed {:#010x}",
                stored_crc, actual_crc
            )));
        }

        let version = cur.get_u32_le();
        if version != VERSION {
            return Err(StoreError::FormatMismatch(format!(
                "unsupported store version: {}",
                version
            )));
        }

        let first_free = cur.get_u32_le();
        let last_entry = cur.get_u32_le();
        let entries_allocated = cur.get_u32_le();
        let entries_free = cur.get_u32_le();
        let entry_size = cur.get_u32_le();
        let header_size = cur.get_u32_le();
        if header_size as u64 != HEADER_SIZE {
            return Err(StoreError::FormatMismatch(format!(
                "unexpected header size: {}",
                header_size
            )));
        }

        cur.advance(1 + RESERVED_SIZE + 4);
        let mut optional = [0u8; OPTIONAL_HEADER_SIZE];
        cur.copy_to_slice(&mut optional);

        if last_entry == 0 || first_free >= last_entry {
            return Err(StoreError::HeaderCorruption(format!(
                "inconsistent entry bounds: first_free={}, last_entry={}",
                first_free, last_entry
            )));
        }

        Ok(Self {
            tag,
            version,
            first_free,
            last_entry,
            entries_allocated,
            entries_free,
            entry_size,
            header_size,
            dirty: false,
            optional,
        })
    }

    /// Reject a header whose record size differs from the caller's
    pub fn validate_entry_size(&self, entry_size: u32) -> Result<()> {
        if self.entry_size != entry_size {
            return Err(StoreError::FormatMismatch(format!(
                "entry size mismatch: file has {}, requested {}",
                self.entry_size, entry_size
            )));
        }
        Ok(())
    }

    pub fn tag(&self) -> u32 {
        self.tag
    }

    pub fn version(&self) -> u32 {
        self.version
    }

    /// Head of the free list (0 when empty)
    pub fn first_free(&self) -> u32 {
        self.first_free
    }

    pub fn last_entry(&self) -> u32 {
        self.last_entry
    }

    pub fn entries_allocated(&self) -> u32 {
        self.entries_allocated
    }

    pub fn entries_free(&self) -> u32 {
        self.entries_free
    }

    pub fn entry_size(&self) -> u32 {
        self.entry_size
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    pub fn optional(&self) -> &[u8] {
        &self.optional
    }
}

/// CRC32 over the header, skipping the checksum field itself
fn checksum(bytes: &[u8]) -> u32 {
    let mut hasher = crc32fast::Hasher::new();
    hasher.update(&bytes[..CRC_OFFSET]);
    hasher.update(&bytes[CRC_OFFSET + 4..HEADER_SIZE as usize]);
    hasher.finalize()
}
