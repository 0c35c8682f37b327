//! In-memory store file
//!
//! Clones share the same buffer. Tests use this to simulate a crash: leak
//! the store with `std::mem::forget` and reopen whatever bytes were written.

use std::io;
use std::sync::Arc;

use parking_lot::Mutex;

use super::StoreFile;

/// A store file held entirely in memory
#[derive(Debug, Clone, Default)]
pub struct MemoryFile {
    data: Arc<Mutex<Vec<u8>>>,
}

impl MemoryFile {
    /// Create an empty in-memory file
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an in-memory file with the given contents
    pub fn from_bytes(bytes: Vec<u8>) -> Self {
        Self {
            data: Arc::new(Mutex::new(bytes)),
        }
    }

    /// Copy of the current contents
    pub fn snapshot(&self) -> Vec<u8> {
        self.data.lock().clone()
    }
}

fn to_usize(offset: u64) -> io::Result<usize> {
    usize::try_from(offset)
        .map_err(|_| io::Error::new(io::ErrorKind::InvalidInput, "offset exceeds address space"))
}

impl StoreFile for MemoryFile {
    fn read_exact_at(&mut self, offset: u64, buf: &mut [u8]) -> io::Result<()> {
        let data = self.data.lock();
        let start = to_usize(offset)?;

        let available = data.len().saturating_sub(start).min(buf.len());
        if available > 0 {
            buf[..available].copy_from_slice(&data[start..start + available]);
        }
        buf[available..].fill(0);
        Ok(())
    }

    fn write_all_at(&mut self, offset: u64, buf: &[u8]) -> io::Result<()> {
        let mut data = self.data.lock();
        let start = to_usize(offset)?;
        let end = start + buf.len();

        if data.len() < end {
            data.resize(end, 0);
        }
        data[start..end].copy_from_slice(buf);
        Ok(())
    }

    fn len(&self) -> io::Result<u64> {
        Ok(self.data.lock().len() as u64)
    }

    fn sync(&mut self) -> io::Result<()> {
        Ok(())
    }
}
