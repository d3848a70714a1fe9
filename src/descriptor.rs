use log::debug;

use crate::error::{FsError, Result};
use crate::file::File;

pub type Handle = usize;

/// The directory always lives in this slot.
pub const DIR_HANDLE: Handle = 0;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Descriptor {
    Unused,
    Directory,
    File(File),
}

/// Fixed table of descriptor slots.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DescriptorTable {
    slots: Vec<Descriptor>,
}

impl DescriptorTable {
    pub fn new(fd_count: usize) -> DescriptorTable {
        let mut slots = vec![Descriptor::Unused; fd_count];
        slots[DIR_HANDLE] = Descriptor::Directory;
        DescriptorTable { slots }
    }

    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    pub fn is_used(&self, handle: Handle) -> bool {
        !matches!(self.slots.get(handle), None | Some(Descriptor::Unused))
    }

    /// Lowest unused slot.
    pub fn get_free_handle(&self) -> Result<Handle> {
        self.slots
            .iter()
            .position(|slot| matches!(slot, Descriptor::Unused))
            .ok_or(FsError::HandlesExhausted)
    }

    /// Binds `file` to its own handle, which must be free.
    pub(crate) fn bind(&mut self, file: File) -> Result<()> {
        let handle = file.handle();
        match self.slots.get(handle) {
            Some(Descriptor::Unused) => {
                self.slots[handle] = Descriptor::File(file);
                Ok(())
            }
            Some(_) => Err(FsError::Corrupt {
                artifact: "descriptor table".to_string(),
                line: handle,
                reason: format!("descriptor {handle} already in use"),
            }),
            None => Err(FsError::Corrupt {
                artifact: "descriptor table".to_string(),
                line: handle,
                reason: format!("descriptor must be below {}", self.slots.len()),
            }),
        }
    }

    /// Unbinds a file slot and hands the file back.
    pub(crate) fn release(&mut self, handle: Handle) -> Option<File> {
        let slot = self.slots.get_mut(handle)?;
        let Descriptor::File(_) = slot else {
            return None;
        };
        let Descriptor::File(file) = std::mem::replace(slot, Descriptor::Unused) else {
            unreachable!("slot {handle} checked to hold a file");
        };
        debug!("released descriptor {handle}");
        Some(file)
    }

    pub fn file(&self, handle: Handle) -> Option<&File> {
        match self.slots.get(handle) {
            Some(Descriptor::File(file)) => Some(file),
            _ => None,
        }
    }

    pub fn file_mut(&mut self, handle: Handle) -> Option<&mut File> {
        match self.slots.get_mut(handle) {
            Some(Descriptor::File(file)) => Some(file),
            _ => None,
        }
    }

    /// Bound files in handle order.
    pub fn files(&self) -> impl Iterator<Item = &File> {
        self.slots.iter().filter_map(|slot| match slot {
            Descriptor::File(file) => Some(file),
            _ => None,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn slot_zero_is_reserved_for_directory() {
        let table = DescriptorTable::new(3);
        assert!(table.is_used(DIR_HANDLE));
        assert_eq!(table.get_free_handle().unwrap(), 1);
    }

    #[test]
    fn exhausts_and_recovers() {
        let mut table = DescriptorTable::new(3);
        table.bind(File::new(1, "a")).unwrap();
        table.bind(File::new(2, "b")).unwrap();
        assert!(matches!(table.get_free_handle(), Err(FsError::HandlesExhausted)));

        let released = table.release(1).unwrap();
        assert_eq!(released.name(), "a");
        assert_eq!(table.get_free_handle().unwrap(), 1);
    }

    #[test]
    fn directory_slot_cannot_be_released_or_rebound() {
        let mut table = DescriptorTable::new(3);
        assert!(table.release(DIR_HANDLE).is_none());
        assert!(table.bind(File::new(DIR_HANDLE, "x")).is_err());
        assert!(table.bind(File::new(7, "x")).is_err());
    }
}
