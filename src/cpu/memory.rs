//! Main memory: 50 sixteen-bit words.

use crate::bits::BitVector;
use serde::{Serialize, Deserialize};
use thiserror::Error;

/// The number of addressable words.
pub const MEMORY_SIZE: usize = 50;

/// Word-addressed memory, every cell a 16-bit [`BitVector`].
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Memory {
    cells: Vec<BitVector>,
}

impl Memory {
    /// Create a new memory with all cells zeroed.
    pub fn new() -> Self {
        Self {
            cells: vec![BitVector::word(); MEMORY_SIZE],
        }
    }

    /// Borrow the word at `addr`.
    pub fn read(&self, addr: i32) -> Result<&BitVector, MemoryError> {
        let index = Self::index(addr)?;
        Ok(&self.cells[index])
    }

    /// Replace the word at `addr`.
    pub fn write(&mut self, addr: i32, word: BitVector) -> Result<(), MemoryError> {
        let index = Self::index(addr)?;
        self.cells[index] = word;
        Ok(())
    }

    /// Map a signed address onto a cell index.
    fn index(addr: i32) -> Result<usize, MemoryError> {
        usize::try_from(addr)
            .ok()
            .filter(|&index| index < MEMORY_SIZE)
            .ok_or(MemoryError::InvalidAddress(addr))
    }

    /// Clear all memory to zeros.
    pub fn clear(&mut self) {
        for cell in &mut self.cells {
            *cell = BitVector::word();
        }
    }

    /// Copy of every cell, address order.
    pub fn snapshot(&self) -> Vec<BitVector> {
        self.cells.clone()
    }

    /// Dump a window of memory as (address, word) pairs.
    pub fn dump(&self, start: usize, count: usize) -> Vec<(usize, BitVector)> {
        let end = start.saturating_add(count).min(MEMORY_SIZE);
        (start.min(end)..end)
            .map(|i| (i, self.cells[i].clone()))
            .collect()
    }
}

impl Default for Memory {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for Memory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let non_zero = self.cells.iter().filter(|cell| !cell.is_zero()).count();

        f.debug_struct("Memory")
            .field("non_zero_cells", &non_zero)
            .field("total_cells", &MEMORY_SIZE)
            .finish()
    }
}

/// Errors that can occur during memory operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MemoryError {
    #[error("invalid memory address {0} (valid range 0-{})", MEMORY_SIZE - 1)]
    InvalidAddress(i32),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_memory_read_write() {
        let mut mem = Memory::new();
        let value = BitVector::with_unsigned(16, 42).unwrap();

        mem.write(10, value).unwrap();
        assert_eq!(mem.read(10).unwrap().unsigned_value(), 42);
    }

    #[test]
    fn test_memory_starts_zeroed() {
        let mem = Memory::new();
        assert!(mem.snapshot().iter().all(|w| w.is_zero() && w.width() == 16));
        assert_eq!(mem.snapshot().len(), MEMORY_SIZE);
    }

    #[test]
    fn test_memory_bounds() {
        let mut mem = Memory::new();

        assert!(mem.read(0).is_ok());
        assert!(mem.read(49).is_ok());

        assert_eq!(mem.read(50), Err(MemoryError::InvalidAddress(50)));
        assert_eq!(mem.read(-1), Err(MemoryError::InvalidAddress(-1)));
        assert!(mem.write(50, BitVector::word()).is_err());
    }

    #[test]
    fn test_snapshot_is_a_copy() {
        let mem = Memory::new();
        let mut snap = mem.snapshot();
        snap[0].invert();
        assert!(mem.read(0).unwrap().is_zero());
    }

    #[test]
    fn test_dump_clamps() {
        let mem = Memory::new();
        assert_eq!(mem.dump(45, 10).len(), 5);
        assert!(mem.dump(60, 3).is_empty());
    }
}
