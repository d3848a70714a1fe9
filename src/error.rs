use thiserror::Error;

use crate::descriptor::Handle;

#[derive(Error, Debug)]
#[non_exhaustive]
pub enum FsError {
    #[error("file {0} already exists")]
    NameExists(String),
    #[error("file {0} not found")]
    NotFound(String),
    #[error("no free file descriptor")]
    HandlesExhausted,
    #[error("no free block left outside the reserved region")]
    OutOfSpace,
    #[error("file {0} is already open")]
    AlreadyOpen(String),
    #[error("file {0} is not open")]
    NotOpen(String),
    #[error("descriptor {handle} is busy {active}, cannot start {requested}")]
    ModeConflict {
        handle: Handle,
        active: &'static str,
        requested: &'static str,
    },
    #[error("position {pos} out of range, must be within 0..={max}")]
    InvalidPosition { pos: usize, max: usize },
    #[error("memory range {offset}+{count} exceeds memory size {size}")]
    MemoryBoundsExceeded {
        offset: usize,
        count: usize,
        size: usize,
    },
    #[error("invalid file name {0:?}")]
    InvalidName(String),
    #[error("invalid geometry: {0}")]
    InvalidGeometry(&'static str),
    #[error("{artifact} line {line}: {reason}")]
    Corrupt {
        artifact: String,
        line: usize,
        reason: String,
    },
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, FsError>;
