use std::collections::HashMap;

use crate::descriptor::{Handle, DIR_HANDLE};
use crate::error::{FsError, Result};

/// The single flat namespace. Each instance owns its own map.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Directory {
    name: String,
    entries: HashMap<String, Handle>,
}

impl Directory {
    pub fn new(name: &str) -> Directory {
        Directory {
            name: name.to_string(),
            entries: HashMap::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn handle(&self) -> Handle {
        DIR_HANDLE
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }

    pub fn resolve(&self, name: &str) -> Result<Handle> {
        self.entries
            .get(name)
            .copied()
            .ok_or_else(|| FsError::NotFound(name.to_string()))
    }

    pub(crate) fn add(&mut self, name: &str, handle: Handle) -> Result<()> {
        if self.entries.contains_key(name) {
            return Err(FsError::NameExists(name.to_string()));
        }
        self.entries.insert(name.to_string(), handle);
        Ok(())
    }

    pub(crate) fn remove(&mut self, name: &str) -> Result<Handle> {
        self.entries
            .remove(name)
            .ok_or_else(|| FsError::NotFound(name.to_string()))
    }
}

/// Names end up as one whitespace-delimited token in the file table.
pub fn validate_name(name: &str) -> Result<()> {
    if name.is_empty() || name.chars().any(char::is_whitespace) {
        return Err(FsError::InvalidName(name.to_string()));
    }
    Ok(())
}
