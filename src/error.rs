//! Error types for FlatStore
//!
//! Provides a unified error type for all operations.

use std::path::PathBuf;

use thiserror::Error;

/// Result type alias using StoreError
pub type Result<T> = std::result::Result<T, StoreError>;

/// Unified error type for FlatStore operations
#[derive(Debug, Error)]
pub enum StoreError {
    // -------------------------------------------------------------------------
    // I/O Errors
    // -------------------------------------------------------------------------
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Store file not found: {0}")]
    NotFound(PathBuf),

    // -------------------------------------------------------------------------
    // Handle / Format Errors
    // -------------------------------------------------------------------------
    #[error("Store handle is closed or invalid")]
    BadHandle,

    #[error("Store format mismatch: {0}")]
    FormatMismatch(String),

    #[error("Store header corruption detected: {0}")]
    HeaderCorruption(String),

    // -------------------------------------------------------------------------
    // Record Errors
    // -------------------------------------------------------------------------
    #[error("Record index {index} out of bounds (last entry {last_entry})")]
    OutOfBounds { index: u32, last_entry: u32 },

    #[error("Record {0} is on the free list")]
    StaleRecord(u32),

    #[error("Free list corruption detected: {0}")]
    FreeListCorruption(String),

    #[error("Record store capacity exhausted")]
    CapacityExhausted,

    #[error("Record size mismatch: expected {expected} bytes, got {actual}")]
    RecordSize { expected: usize, actual: usize },

    // -------------------------------------------------------------------------
    // Index Errors
    // -------------------------------------------------------------------------
    #[error("Value 0 is reserved as the absent marker")]
    ReservedValue,

    #[error("Index corruption detected: {0}")]
    IndexCorruption(String),

    // -------------------------------------------------------------------------
    // Serialization Errors
    // -------------------------------------------------------------------------
    #[error("Serialization error: {0}")]
    Serialization(String),

    // -------------------------------------------------------------------------
    // Configuration Errors
    // -------------------------------------------------------------------------
    #[error("Configuration error: {0}")]
    Config(String),
}
