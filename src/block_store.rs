use bitvec::vec::BitVec;
use log::{debug, info};

use crate::config::Geometry;
use crate::error::{FsError, Result};
use crate::file::File;

/// One storage slot. `None` marks a slot that holds nothing, so a stored
/// zero byte stays distinguishable from an absent one.
pub type Slot = Option<u8>;

/// Text form of a slot: `0` is empty, a stored zero is `00`, anything else
/// is the byte in decimal.
pub fn render_slot(slot: Slot) -> String {
    match slot {
        None => "0".to_string(),
        Some(0) => "00".to_string(),
        Some(byte) => byte.to_string(),
    }
}

/// The disk: a fixed pool of equal-size blocks and the bitmap that owns
/// their allocation state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlockStore {
    block_size: usize,
    reserved: usize,
    blocks: Vec<Vec<Slot>>,
    /// A set bit means the block belongs to some file.
    bitmap: BitVec,
}

impl BlockStore {
    pub fn new(geometry: &Geometry) -> BlockStore {
        BlockStore {
            block_size: geometry.block_size,
            reserved: geometry.reserved,
            blocks: vec![vec![None; geometry.block_size]; geometry.block_count],
            bitmap: BitVec::repeat(false, geometry.block_count),
        }
    }

    pub fn block_size(&self) -> usize {
        self.block_size
    }

    pub fn block_count(&self) -> usize {
        self.blocks.len()
    }

    pub fn reserved(&self) -> usize {
        self.reserved
    }

    pub fn is_allocated(&self, index: usize) -> bool {
        self.bitmap.get(index).is_some_and(|bit| *bit)
    }

    /// Number of blocks outside the reserved region still available.
    pub fn free_count(&self) -> usize {
        self.bitmap[self.reserved..].count_zeros()
    }

    /// First-fit search above the reserved region. The block joins the tail
    /// of `file`'s chain.
    pub fn allocate_for(&mut self, file: &mut File) -> Result<usize> {
        let Some(offset) = self.bitmap[self.reserved..].first_zero() else {
            return Err(FsError::OutOfSpace);
        };
        let index = self.reserved + offset;
        self.bitmap.set(index, true);
        file.push_block(index);
        info!("allocated block {index} to file {}", file.name());
        Ok(index)
    }

    /// Releases `indices` and wipes their contents. No file may still
    /// reference them.
    pub fn free(&mut self, indices: &[usize]) {
        for &index in indices {
            if index < self.reserved {
                continue;
            }
            self.bitmap.set(index, false);
            self.clear(index);
            debug!("freed block {index}");
        }
    }

    /// Marks a block as owned without touching its contents. Used when
    /// rebuilding the bitmap from a saved file table.
    pub(crate) fn mark_allocated(&mut self, index: usize) {
        self.bitmap.set(index, true);
    }

    pub fn block(&self, index: usize) -> &[Slot] {
        &self.blocks[index]
    }

    pub(crate) fn set_block(&mut self, index: usize, slots: Vec<Slot>) {
        debug_assert_eq!(slots.len(), self.block_size);
        self.blocks[index] = slots;
    }

    pub fn clear(&mut self, index: usize) {
        self.blocks[index].fill(None);
    }

    /// Count of occupied slots in a block.
    pub fn fill(&self, index: usize) -> usize {
        self.blocks[index].iter().filter(|slot| slot.is_some()).count()
    }

    /// The occupied slots of a block, in order.
    pub fn live(&self, index: usize) -> Vec<u8> {
        self.blocks[index].iter().flatten().copied().collect()
    }

    /// Occupied slots form a prefix of the block, with nothing after the
    /// first empty one.
    pub fn is_packed(&self, index: usize) -> bool {
        let block = &self.blocks[index];
        let fill = block.iter().take_while(|slot| slot.is_some()).count();
        block[fill..].iter().all(Option::is_none)
    }

    /// Writes `data` over the head of a block and leaves the rest alone.
    pub fn store(&mut self, index: usize, data: &[u8]) {
        let block = &mut self.blocks[index];
        for (slot, byte) in block.iter_mut().zip(data) {
            *slot = Some(*byte);
        }
    }

    pub(crate) fn blocks(&self) -> impl Iterator<Item = &[Slot]> {
        self.blocks.iter().map(Vec::as_slice)
    }
}
