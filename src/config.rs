use std::path::PathBuf;

use crate::error::{FsError, Result};

pub const BLOCK_COUNT: usize = 1000;
pub const BLOCK_SIZE: usize = 10;
/// Blocks below this index belong to the system and are never handed to files.
pub const RESERVED_SIZE: usize = 20;
pub const FD_COUNT: usize = 10;
pub const MEM_SIZE: usize = 100;
/// Memory starts out holding 1, 2, ..., so every cell index must fit a byte.
pub const MAX_MEM_SIZE: usize = u8::MAX as usize;

pub const DIR_NAME: &str = "HOME";
pub const DISK_FILE: &str = "disk.txt";
pub const TABLE_FILE: &str = "file.txt";

/// Sizes of every fixed pool in the file system.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Geometry {
    pub block_count: usize,
    pub block_size: usize,
    pub reserved: usize,
    pub fd_count: usize,
    pub mem_size: usize,
}

impl Default for Geometry {
    fn default() -> Self {
        Geometry {
            block_count: BLOCK_COUNT,
            block_size: BLOCK_SIZE,
            reserved: RESERVED_SIZE,
            fd_count: FD_COUNT,
            mem_size: MEM_SIZE,
        }
    }
}

impl Geometry {
    pub fn validate(&self) -> Result<()> {
        if self.block_size == 0 {
            return Err(FsError::InvalidGeometry("block size must be positive"));
        }
        if self.reserved >= self.block_count {
            return Err(FsError::InvalidGeometry(
                "reserved region must leave at least one data block",
            ));
        }
        // slot 0 is the directory itself
        if self.fd_count < 2 {
            return Err(FsError::InvalidGeometry("need at least two descriptors"));
        }
        if self.mem_size == 0 {
            return Err(FsError::InvalidGeometry("memory size must be positive"));
        }
        if self.mem_size > MAX_MEM_SIZE {
            return Err(FsError::InvalidGeometry("memory size must not exceed 255"));
        }
        Ok(())
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    pub geometry: Geometry,
    pub disk_path: PathBuf,
    pub table_path: PathBuf,
    pub dir_name: String,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            geometry: Geometry::default(),
            disk_path: PathBuf::from(DISK_FILE),
            table_path: PathBuf::from(TABLE_FILE),
            dir_name: DIR_NAME.to_string(),
        }
    }
}
