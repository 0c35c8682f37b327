//! # FlatStore
//!
//! A minimal persistent storage engine with:
//! - Fixed-size records addressed by index, O(1) access
//! - Free-list recycling threaded through deleted records
//! - Write-back cached header with explicit `refresh`
//! - A sparse `u32 → u32` index with O(4) lookups on top
//!
//! ## Architecture Overview
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                      Sparse Index                            │
//! │           (4-level byte trie, root in optional header)       │
//! └─────────────────────┬───────────────────────────────────────┘
//!                       │ get/put node records
//! ┌─────────────────────▼───────────────────────────────────────┐
//! │                     Record Store                             │
//! │      (cached header, free list, fixed-size records)          │
//! └─────────────────────┬───────────────────────────────────────┘
//!                       │ positional read/write
//!          ┌────────────┴────────────┐
//!          │                         │
//!          ▼                         ▼
//!   ┌─────────────┐          ┌─────────────┐
//!   │  DiskFile   │          │ MemoryFile  │
//!   │ (std::fs)   │          │  (tests)    │
//!   └─────────────┘          └─────────────┘
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod config;

pub mod file;
pub mod record;
pub mod index;

// =============================================================================
// Public API Re-exports
// =============================================================================

pub use error::{StoreError, Result};
pub use config::{Config, SyncStrategy};
pub use record::{RecordId, RecordStore};
pub use index::SparseIndex;

// =============================================================================
// Version Info
// =============================================================================

/// Current version of FlatStore
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
