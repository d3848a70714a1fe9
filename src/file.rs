use log::debug;

use crate::block_store::BlockStore;
use crate::descriptor::Handle;

/// A file is its name plus the chain of blocks it owns, in logical order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct File {
    handle: Handle,
    name: String,
    blocks: Vec<usize>,
}

impl File {
    /// A file with an empty chain. The caller hands it its first block.
    pub(crate) fn new(handle: Handle, name: &str) -> File {
        File {
            handle,
            name: name.to_string(),
            blocks: Vec::new(),
        }
    }

    pub(crate) fn with_blocks(handle: Handle, name: &str, blocks: Vec<usize>) -> File {
        File {
            handle,
            name: name.to_string(),
            blocks,
        }
    }

    pub fn handle(&self) -> Handle {
        self.handle
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn blocks(&self) -> &[usize] {
        &self.blocks
    }

    pub(crate) fn push_block(&mut self, index: usize) {
        self.blocks.push(index);
    }

    pub fn last_block(&self) -> usize {
        self.blocks[self.blocks.len() - 1]
    }

    /// Disk block holding the `i`-th logical block.
    pub fn get_block(&self, i: usize) -> usize {
        self.blocks[i]
    }

    /// Overwrites the head of the `i`-th logical block.
    pub fn set_block(&self, store: &mut BlockStore, i: usize, content: &[u8]) {
        store.store(self.blocks[i], content);
    }

    /// Full blocks before the last one, plus whatever the last one holds.
    pub fn length(&self, store: &BlockStore) -> usize {
        match self.blocks.last() {
            Some(&last) => store.fill(last) + store.block_size() * (self.blocks.len() - 1),
            None => 0,
        }
    }

    /// Drops every block but the first and empties that one.
    pub fn truncate(&mut self, store: &mut BlockStore) {
        if self.blocks.is_empty() {
            return;
        }
        let tail = self.blocks.split_off(1);
        for &index in &tail {
            debug!("file {} releases block {index}", self.name);
        }
        store.free(&tail);
        store.clear(self.blocks[0]);
    }
}
