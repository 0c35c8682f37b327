//! Index Module
//!
//! Sparse 32-bit key index: a 4-level, 256-ary digit trie stored in a
//! record store.
//!
//! ## Responsibilities
//! - Map `u32` keys to non-zero `u32` values
//! - At most 4 node reads per lookup, no comparisons or rebalancing
//! - Keep the root pointer in the record store's optional header
//!
//! ## Layout
//! ```text
//! key = 0x12_34_56_78
//!
//!   root node ──[0x12]──▶ level 2 ──[0x34]──▶ level 3 ──[0x56]──▶ leaf
//!                                                                 │
//!                                                           slot[0x78] = value
//!
//! Node record (1024 bytes): 256 × u32 LE slots
//!   levels 1-3: child record index (0 = no child)
//!   level 4:    stored value       (0 = absent)
//! ```
//!
//! Nodes are never freed, even once every slot is empty again.

mod meta;
mod node;
mod sparse;

pub use meta::IndexMeta;
pub use node::{split_key, TrieNode};
pub use sparse::SparseIndex;

// =============================================================================
// Shared Constants
// =============================================================================

/// Slots per trie node (one per byte value)
pub const FANOUT: usize = 256;

/// Size of a trie node record in bytes
pub const NODE_SIZE: u32 = (FANOUT * 4) as u32;

/// Trie depth; one level per key byte
pub const LEVELS: usize = 4;

/// Version of the index metadata kept in the optional header
pub const META_VERSION: u32 = 1;
