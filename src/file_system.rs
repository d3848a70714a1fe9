use std::collections::BTreeMap;
use std::fmt;

use log::{info, warn};

use crate::block_store::{render_slot, BlockStore, Slot};
use crate::config::{Config, Geometry};
use crate::descriptor::{DescriptorTable, Handle};
use crate::directory::{validate_name, Directory};
use crate::error::{FsError, Result};
use crate::file::File;
use crate::memory::Memory;
use crate::session::{Mode, OpenFile};

/// Every piece of file system state, owned by whoever drives it.
#[derive(Debug)]
pub struct FileSystem {
    pub(crate) config: Config,
    pub(crate) store: BlockStore,
    pub(crate) table: DescriptorTable,
    pub(crate) directory: Directory,
    pub(crate) open_files: BTreeMap<Handle, OpenFile>,
    pub(crate) memory: Memory,
}

impl FileSystem {
    /// An empty file system: all blocks free, no files.
    pub fn new(config: Config) -> Result<FileSystem> {
        config.geometry.validate()?;
        let fs = FileSystem {
            store: BlockStore::new(&config.geometry),
            table: DescriptorTable::new(config.geometry.fd_count),
            directory: Directory::new(&config.dir_name),
            open_files: BTreeMap::new(),
            memory: Memory::new(config.geometry.mem_size),
            config,
        };
        info!(
            "directory {} created with descriptor {}",
            fs.directory.name(),
            fs.directory.handle()
        );
        Ok(fs)
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn geometry(&self) -> &Geometry {
        &self.config.geometry
    }

    pub fn store(&self) -> &BlockStore {
        &self.store
    }

    pub fn descriptors(&self) -> &DescriptorTable {
        &self.table
    }

    pub fn directory(&self) -> &Directory {
        &self.directory
    }

    pub fn memory(&self) -> &Memory {
        &self.memory
    }

    pub fn memory_mut(&mut self) -> &mut Memory {
        &mut self.memory
    }

    fn file(&self, name: &str) -> Result<&File> {
        let handle = self.directory.resolve(name)?;
        self.table
            .file(handle)
            .ok_or_else(|| FsError::NotFound(name.to_string()))
    }

    pub fn length(&self, name: &str) -> Result<usize> {
        Ok(self.file(name)?.length(&self.store))
    }

    pub fn blocks_of(&self, name: &str) -> Result<&[usize]> {
        Ok(self.file(name)?.blocks())
    }

    pub fn session(&self, name: &str) -> Result<&OpenFile> {
        let handle = self.directory.resolve(name)?;
        self.open_files
            .get(&handle)
            .ok_or_else(|| FsError::NotOpen(name.to_string()))
    }

    pub fn is_open(&self, name: &str) -> bool {
        self.session(name).is_ok()
    }

    pub fn create(&mut self, name: &str) -> Result<Handle> {
        validate_name(name)?;
        if self.directory.contains(name) {
            warn!("file {name} already exists, not created");
            return Err(FsError::NameExists(name.to_string()));
        }
        let handle = self.table.get_free_handle()?;
        if self.store.free_count() == 0 {
            return Err(FsError::OutOfSpace);
        }

        let mut file = File::new(handle, name);
        self.store.allocate_for(&mut file)?;
        self.directory.add(name, handle)?;
        self.table.bind(file)?;
        info!("file {name} created with descriptor {handle}");
        Ok(handle)
    }

    /// Removes the file, its blocks and its descriptor. An open session on
    /// the file is dropped with it.
    pub fn destroy(&mut self, name: &str) -> Result<()> {
        let handle = self.directory.remove(name)?;
        if self.open_files.remove(&handle).is_some() {
            warn!("file {name} was still open, session discarded");
        }
        if let Some(file) = self.table.release(handle) {
            self.store.free(file.blocks());
        }
        info!("file {name} deleted");
        Ok(())
    }

    pub fn open(&mut self, name: &str) -> Result<Handle> {
        let handle = self.directory.resolve(name)?;
        if self.open_files.contains_key(&handle) {
            return Err(FsError::AlreadyOpen(name.to_string()));
        }
        let file = self
            .table
            .file(handle)
            .ok_or_else(|| FsError::NotFound(name.to_string()))?;
        self.open_files
            .insert(handle, OpenFile::new(file, &self.store));
        info!("file {name} opened");
        Ok(handle)
    }

    /// Flushes the session buffer and drops the session.
    pub fn close(&mut self, name: &str) -> Result<()> {
        let handle = self.directory.resolve(name)?;
        let session = self
            .open_files
            .get_mut(&handle)
            .ok_or_else(|| FsError::NotOpen(name.to_string()))?;
        let file = self
            .table
            .file_mut(handle)
            .ok_or_else(|| FsError::NotFound(name.to_string()))?;

        if session.flush_demand(file, self.store.block_size()) > self.store.free_count() {
            return Err(FsError::OutOfSpace);
        }
        session.flush(file, &mut self.store)?;
        self.open_files.remove(&handle);
        info!("file {name} closed");
        Ok(())
    }

    /// Reads up to `count` bytes from the read cursor into memory at
    /// `mem_offset`. Hitting end of file just shortens the result.
    pub fn read(&mut self, name: &str, mem_offset: usize, count: usize) -> Result<Vec<u8>> {
        let handle = self.directory.resolve(name)?;
        let session = self
            .open_files
            .get_mut(&handle)
            .ok_or_else(|| FsError::NotOpen(name.to_string()))?;
        let file = self
            .table
            .file(handle)
            .ok_or_else(|| FsError::NotFound(name.to_string()))?;
        session.permits(Mode::Reading)?;

        let block_size = self.store.block_size();
        let length = file.length(&self.store);
        let count = count.min(length.saturating_sub(session.read_cursor));
        self.memory.check(mem_offset, count)?;
        session.enter(Mode::Reading);

        let mut contents = Vec::with_capacity(count);
        if count > 0 {
            session.load_block(file, &self.store, session.read_cursor / block_size);
        }
        let mut remaining = count;
        while remaining > 0 {
            let pos = session.read_cursor % block_size;
            let take = remaining.min(block_size - pos);
            contents.extend_from_slice(&session.buffer[pos..pos + take]);
            session.read_cursor += take;
            remaining -= take;
            if remaining > 0 {
                session.next_block(file, &self.store);
            }
        }

        self.memory.set_range(mem_offset, &contents)?;
        info!("read {} from file {name}: {}", contents.len(), join(&contents));
        Ok(contents)
    }

    /// Adds `count` bytes from memory at `mem_offset` after the current end
    /// of the file. Any earlier seek is ignored.
    pub fn append(&mut self, name: &str, mem_offset: usize, count: usize) -> Result<usize> {
        self.transfer(name, mem_offset, count, false)
    }

    /// Replaces the whole file with `count` bytes from memory at
    /// `mem_offset`.
    pub fn write(&mut self, name: &str, mem_offset: usize, count: usize) -> Result<usize> {
        self.transfer(name, mem_offset, count, true)
    }

    fn transfer(
        &mut self,
        name: &str,
        mem_offset: usize,
        count: usize,
        overwrite: bool,
    ) -> Result<usize> {
        let handle = self.directory.resolve(name)?;
        let session = self
            .open_files
            .get_mut(&handle)
            .ok_or_else(|| FsError::NotOpen(name.to_string()))?;
        let file = self
            .table
            .file_mut(handle)
            .ok_or_else(|| FsError::NotFound(name.to_string()))?;
        session.permits(Mode::Writing)?;
        let data = self.memory.get_range(mem_offset, count)?;

        let block_size = self.store.block_size();
        let length = file.length(&self.store);
        let truncating = overwrite && length != 0;
        // Every time the buffer fills up, the flush hangs a new block off the tail.
        let (tail_fill, reclaimed) = if truncating {
            (0, file.blocks().len() - 1)
        } else {
            (self.store.fill(file.last_block()), 0)
        };
        let needed = (tail_fill + count) / block_size;
        if needed > self.store.free_count() + reclaimed {
            warn!("file {name} needs {needed} more blocks, not enough space");
            return Err(FsError::OutOfSpace);
        }
        session.enter(Mode::Writing);

        if truncating {
            file.truncate(&mut self.store);
        }
        session.write_cursor = if overwrite { 0 } else { length };
        session.load_tail(file, &self.store);

        let mut rest = data;
        while !rest.is_empty() {
            let room = block_size - session.buffer.len();
            if rest.len() >= room {
                session.buffer.extend_from_slice(&rest[..room]);
                rest = &rest[room..];
                session.flush(file, &mut self.store)?;
            } else {
                session.buffer.extend_from_slice(rest);
                rest = &[];
                session.sync(file, &mut self.store);
            }
        }
        session.write_cursor += count;

        let verb = if overwrite { "wrote" } else { "appended" };
        info!("{verb} {count} to file {name}: {}", join(data));
        Ok(count)
    }

    /// Moves both cursors of an open file.
    pub fn seek(&mut self, name: &str, pos: usize) -> Result<()> {
        let handle = self.directory.resolve(name)?;
        let session = self
            .open_files
            .get_mut(&handle)
            .ok_or_else(|| FsError::NotOpen(name.to_string()))?;
        let file = self
            .table
            .file(handle)
            .ok_or_else(|| FsError::NotFound(name.to_string()))?;

        let max = file.length(&self.store).saturating_sub(1);
        if pos > max {
            return Err(FsError::InvalidPosition { pos, max });
        }
        session.read_cursor = pos;
        session.write_cursor = pos;
        Ok(())
    }

    /// Raw content: every slot of every block but the last, then the occupied
    /// slots of the last one.
    pub fn view(&self, name: &str) -> Result<Vec<Slot>> {
        let file = self.file(name)?;
        let (last, body) = file
            .blocks()
            .split_last()
            .ok_or_else(|| FsError::NotFound(name.to_string()))?;

        let mut contents: Vec<Slot> = body
            .iter()
            .flat_map(|&index| self.store.block(index).iter().copied())
            .collect();
        contents.extend(self.store.live(*last).into_iter().map(Some));

        let rendered: Vec<String> = contents.iter().copied().map(render_slot).collect();
        info!("content of file {name}: {}", rendered.join(" "));
        Ok(contents)
    }

    pub fn status(&self) -> Status {
        let files = self
            .table
            .files()
            .map(|file| FileStatus {
                handle: file.handle(),
                name: file.name().to_string(),
                length: file.length(&self.store),
                blocks: file.blocks().to_vec(),
            })
            .collect();
        let open = self
            .open_files
            .values()
            .filter_map(|session| {
                let file = self.table.file(session.handle())?;
                Some(SessionStatus {
                    handle: session.handle(),
                    name: file.name().to_string(),
                    read_cursor: session.read_cursor(),
                    write_cursor: session.write_cursor(),
                    mode: session.mode(),
                })
            })
            .collect();
        Status {
            dir_name: self.directory.name().to_string(),
            dir_handle: self.directory.handle(),
            free_blocks: self.store.free_count(),
            files,
            open,
        }
    }
}

fn join(bytes: &[u8]) -> String {
    bytes
        .iter()
        .map(u8::to_string)
        .collect::<Vec<_>>()
        .join(" ")
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileStatus {
    pub handle: Handle,
    pub name: String,
    pub length: usize,
    pub blocks: Vec<usize>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionStatus {
    pub handle: Handle,
    pub name: String,
    pub read_cursor: usize,
    pub write_cursor: usize,
    pub mode: Mode,
}

/// Snapshot of the directory and the open file table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Status {
    pub dir_name: String,
    pub dir_handle: Handle,
    pub free_blocks: usize,
    pub files: Vec<FileStatus>,
    pub open: Vec<SessionStatus>,
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{}", "*".repeat(30))?;
        writeln!(
            f,
            "directory {} descriptor {}, {} files, {} free blocks",
            self.dir_name,
            self.dir_handle,
            self.files.len(),
            self.free_blocks
        )?;
        for file in &self.files {
            writeln!(
                f,
                "  descriptor {} name {} size {} blocks {}",
                file.handle,
                file.name,
                file.length,
                file.blocks
                    .iter()
                    .map(usize::to_string)
                    .collect::<Vec<_>>()
                    .join(" ")
            )?;
        }
        writeln!(f, "{} open files", self.open.len())?;
        for session in &self.open {
            writeln!(
                f,
                "  descriptor {} name {} read {} write {} {}",
                session.handle,
                session.name,
                session.read_cursor,
                session.write_cursor,
                session.mode
            )?;
        }
        write!(f, "{}", "*".repeat(30))
    }
}
