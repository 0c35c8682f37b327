//! Trie node encoding

use std::fmt;

use bytes::{Buf, BufMut, BytesMut};

use crate::error::Result;
use crate::StoreError;

use super::{FANOUT, LEVELS, NODE_SIZE};

/// Split a key into its trie digits, most significant byte first
pub fn split_key(key: u32) -> [u8; LEVELS] {
    key.to_be_bytes()
}

/// A 256-slot trie node; slot value 0 means "absent"
#[derive(Clone, PartialEq, Eq)]
pub struct TrieNode {
    slots: Box<[u32; FANOUT]>,
}

impl TrieNode {
    /// Node with every slot absent
    pub fn empty() -> Self {
        Self {
            slots: Box::new([0u32; FANOUT]),
        }
    }

    /// Decode a node record
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        if bytes.len() != NODE_SIZE as usize {
            return Err(StoreError::RecordSize {
                expected: NODE_SIZE as usize,
                actual: bytes.len(),
            });
        }

        let mut node = Self::empty();
        let mut cur = bytes;
        for slot in node.slots.iter_mut() {
            *slot = cur.get_u32_le();
        }
        Ok(node)
    }

    /// Encode as a node record
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut buf = BytesMut::with_capacity(NODE_SIZE as usize);
        for slot in self.slots.iter() {
            buf.put_u32_le(*slot);
        }
        buf.to_vec()
    }

    pub fn slot(&self, digit: u8) -> u32 {
        self.slots[digit as usize]
    }

    pub fn set_slot(&mut self, digit: u8, value: u32) {
        self.slots[digit as usize] = value;
    }

    /// Non-absent slots in ascending digit order
    pub fn occupied(&self) -> impl Iterator<Item = (u8, u32)> + '_ {
        self.slots
            .iter()
            .enumerate()
            .filter(|(_, slot)| **slot != 0)
            .map(|(digit, slot)| (digit as u8, *slot))
    }

    /// Whether every slot is absent
    pub fn is_empty(&self) -> bool {
        self.slots.iter().all(|slot| *slot == 0)
    }
}

impl Default for TrieNode {
    fn default() -> Self {
        Self::empty()
    }
}

impl fmt::Debug for TrieNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TrieNode")
            .field("occupied", &self.occupied().count())
            .finish()
    }
}
