//! A flat, single-directory file system kept in memory: a pool of fixed-size
//! blocks handed out by a bitmap, per-file block chains, a descriptor table
//! and buffered sequential I/O over open files.

pub mod block_store;
pub mod config;
pub mod descriptor;
pub mod directory;
pub mod error;
pub mod file;
pub mod file_system;
pub mod memory;
pub mod persist;
pub mod session;

pub use block_store::{BlockStore, Slot};
pub use config::{Config, Geometry};
pub use descriptor::{Descriptor, DescriptorTable, Handle, DIR_HANDLE};
pub use directory::Directory;
pub use error::{FsError, Result};
pub use file::File;
pub use file_system::{FileStatus, FileSystem, SessionStatus, Status};
pub use memory::Memory;
pub use session::{Mode, OpenFile};
