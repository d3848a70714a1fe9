use crate::error::{FsError, Result};

/// Fixed-size scratch memory that transfers move bytes into and out of.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Memory {
    cells: Vec<u8>,
}

impl Memory {
    /// Memory pre-filled with 1, 2, 3, ... so writes carry recognisable data.
    /// `size` is at most [`MAX_MEM_SIZE`](crate::config::MAX_MEM_SIZE).
    pub fn new(size: usize) -> Memory {
        Memory {
            cells: (1..=size).map(|i| i as u8).collect(),
        }
    }

    pub fn from_bytes(cells: Vec<u8>) -> Memory {
        Memory { cells }
    }

    pub fn size(&self) -> usize {
        self.cells.len()
    }

    pub fn as_slice(&self) -> &[u8] {
        &self.cells
    }

    pub fn check(&self, offset: usize, count: usize) -> Result<()> {
        match offset.checked_add(count) {
            Some(end) if end <= self.cells.len() => Ok(()),
            _ => Err(FsError::MemoryBoundsExceeded {
                offset,
                count,
                size: self.cells.len(),
            }),
        }
    }

    pub fn get_range(&self, offset: usize, count: usize) -> Result<&[u8]> {
        self.check(offset, count)?;
        Ok(&self.cells[offset..offset + count])
    }

    pub fn set_range(&mut self, offset: usize, data: &[u8]) -> Result<()> {
        self.check(offset, data.len())?;
        self.cells[offset..offset + data.len()].copy_from_slice(data);
        Ok(())
    }
}
