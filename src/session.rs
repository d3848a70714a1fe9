use std::fmt;

use crate::block_store::BlockStore;
use crate::descriptor::Handle;
use crate::error::{FsError, Result};
use crate::file::File;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    Idle,
    Reading,
    Writing,
}

impl Mode {
    pub fn as_str(self) -> &'static str {
        match self {
            Mode::Idle => "idle",
            Mode::Reading => "reading",
            Mode::Writing => "writing",
        }
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Per-handle state of an open file: cursors, the one-block buffer and the
/// read/write exclusion flag.
///
/// The buffer mirrors the live content of logical block `block_ptr`. Once a
/// session has read it stays a reader until close, and likewise for writers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OpenFile {
    handle: Handle,
    pub(crate) read_cursor: usize,
    pub(crate) write_cursor: usize,
    pub(crate) block_ptr: usize,
    pub(crate) buffer: Vec<u8>,
    mode: Mode,
}

impl OpenFile {
    pub(crate) fn new(file: &File, store: &BlockStore) -> OpenFile {
        OpenFile {
            handle: file.handle(),
            read_cursor: 0,
            write_cursor: 0,
            block_ptr: 0,
            buffer: store.live(file.get_block(0)),
            mode: Mode::Idle,
        }
    }

    pub fn handle(&self) -> Handle {
        self.handle
    }

    pub fn read_cursor(&self) -> usize {
        self.read_cursor
    }

    pub fn write_cursor(&self) -> usize {
        self.write_cursor
    }

    pub fn block_ptr(&self) -> usize {
        self.block_ptr
    }

    pub fn buffer(&self) -> &[u8] {
        &self.buffer
    }

    pub fn mode(&self) -> Mode {
        self.mode
    }

    /// Fails if the session is already committed to the opposite mode.
    pub fn permits(&self, wanted: Mode) -> Result<()> {
        let conflict = matches!(
            (self.mode, wanted),
            (Mode::Writing, Mode::Reading) | (Mode::Reading, Mode::Writing)
        );
        if conflict {
            return Err(FsError::ModeConflict {
                handle: self.handle,
                active: self.mode.as_str(),
                requested: wanted.as_str(),
            });
        }
        Ok(())
    }

    /// Only called once every other precondition of the operation holds, so a
    /// refused operation never leaves the flag behind.
    pub(crate) fn enter(&mut self, wanted: Mode) {
        self.mode = wanted;
    }

    pub fn enter_read(&mut self) -> Result<()> {
        self.permits(Mode::Reading)?;
        self.enter(Mode::Reading);
        Ok(())
    }

    pub fn enter_write(&mut self) -> Result<()> {
        self.permits(Mode::Writing)?;
        self.enter(Mode::Writing);
        Ok(())
    }

    pub(crate) fn load_block(&mut self, file: &File, store: &BlockStore, i: usize) {
        self.block_ptr = i;
        self.buffer = store.live(file.get_block(i));
    }

    pub(crate) fn load_tail(&mut self, file: &File, store: &BlockStore) {
        self.load_block(file, store, file.blocks().len() - 1);
    }

    pub(crate) fn next_block(&mut self, file: &File, store: &BlockStore) {
        self.load_block(file, store, self.block_ptr + 1);
    }

    fn is_full_tail(&self, file: &File, block_size: usize) -> bool {
        self.block_ptr == file.blocks().len() - 1 && self.buffer.len() == block_size
    }

    /// Blocks a flush right now would have to allocate.
    pub(crate) fn flush_demand(&self, file: &File, block_size: usize) -> usize {
        usize::from(self.is_full_tail(file, block_size))
    }

    /// Mirrors the buffer into its block without growing the file.
    pub(crate) fn sync(&self, file: &File, store: &mut BlockStore) {
        file.set_block(store, self.block_ptr, &self.buffer);
    }

    /// Writes the buffer back. A full tail block gets a fresh successor right
    /// away and the buffer moves onto it.
    pub(crate) fn flush(&mut self, file: &mut File, store: &mut BlockStore) -> Result<()> {
        self.sync(file, store);
        if self.is_full_tail(file, store.block_size()) {
            store.allocate_for(file)?;
            self.block_ptr += 1;
            self.buffer.clear();
        }
        Ok(())
    }
}
