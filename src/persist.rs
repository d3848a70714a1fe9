//! Plain-text snapshot of the disk and the file table.
//!
//! The disk artifact has one line per block with tab-separated slots. The
//! literal token `0` is an empty slot. Any other decimal byte is content,
//! and a stored zero byte is written as `00`.
//!
//! The file table artifact has one line per file: `<handle> <name> <block>...`.

use std::fs;
use std::path::Path;

use log::info;

use crate::block_store::{render_slot, BlockStore, Slot};
use crate::config::{Config, Geometry};
use crate::descriptor::{DescriptorTable, Handle};
use crate::directory::validate_name;
use crate::error::{FsError, Result};
use crate::file::File;
use crate::file_system::FileSystem;

const EMPTY_TOKEN: &str = "0";

fn corrupt(artifact: &Path, line: usize, reason: impl Into<String>) -> FsError {
    FsError::Corrupt {
        artifact: artifact.display().to_string(),
        line,
        reason: reason.into(),
    }
}

fn decode_slot(token: &str) -> Option<Slot> {
    if token == EMPTY_TOKEN {
        return Some(None);
    }
    token.parse::<u8>().ok().map(Some)
}

pub fn encode_blocks(store: &BlockStore) -> String {
    let mut out = String::new();
    for block in store.blocks() {
        let line: Vec<String> = block.iter().copied().map(render_slot).collect();
        out.push_str(&line.join("\t"));
        out.push('\n');
    }
    out
}

pub fn decode_blocks(
    text: &str,
    geometry: &Geometry,
    artifact: &Path,
) -> Result<Vec<Vec<Slot>>> {
    let mut blocks = Vec::with_capacity(geometry.block_count);
    for (n, line) in text.lines().enumerate() {
        let line_no = n + 1;
        if blocks.len() == geometry.block_count {
            return Err(corrupt(artifact, line_no, "more blocks than the disk holds"));
        }
        let slots = line
            .split('\t')
            .map(|token| {
                decode_slot(token.trim())
                    .ok_or_else(|| corrupt(artifact, line_no, format!("bad slot {token:?}")))
            })
            .collect::<Result<Vec<Slot>>>()?;
        if slots.len() != geometry.block_size {
            return Err(corrupt(
                artifact,
                line_no,
                format!("expected {} slots, found {}", geometry.block_size, slots.len()),
            ));
        }
        blocks.push(slots);
    }
    if blocks.len() != geometry.block_count {
        return Err(corrupt(
            artifact,
            blocks.len(),
            format!("expected {} blocks, found {}", geometry.block_count, blocks.len()),
        ));
    }
    Ok(blocks)
}

pub fn encode_table(table: &DescriptorTable) -> String {
    let mut out = String::new();
    for file in table.files() {
        out.push_str(&file.handle().to_string());
        out.push(' ');
        out.push_str(file.name());
        for index in file.blocks() {
            out.push(' ');
            out.push_str(&index.to_string());
        }
        out.push('\n');
    }
    out
}

/// One file table line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableEntry {
    pub line: usize,
    pub handle: Handle,
    pub name: String,
    pub blocks: Vec<usize>,
}

pub fn decode_table(text: &str, artifact: &Path) -> Result<Vec<TableEntry>> {
    let mut entries = Vec::new();
    for (n, line) in text.lines().enumerate() {
        let line_no = n + 1;
        let mut tokens = line.split_whitespace();
        let Some(handle) = tokens.next() else {
            continue;
        };
        let handle = handle
            .parse::<Handle>()
            .map_err(|_| corrupt(artifact, line_no, format!("bad descriptor {handle:?}")))?;
        let name = tokens
            .next()
            .ok_or_else(|| corrupt(artifact, line_no, "missing file name"))?;
        let blocks = tokens
            .map(|token| {
                token
                    .parse::<usize>()
                    .map_err(|_| corrupt(artifact, line_no, format!("bad block {token:?}")))
            })
            .collect::<Result<Vec<usize>>>()?;
        if blocks.is_empty() {
            return Err(corrupt(artifact, line_no, "file owns no blocks"));
        }
        entries.push(TableEntry {
            line: line_no,
            handle,
            name: name.to_string(),
            blocks,
        });
    }
    Ok(entries)
}

impl FileSystem {
    /// Writes both artifacts to the configured paths.
    pub fn save(&self) -> Result<()> {
        fs::write(&self.config.disk_path, encode_blocks(&self.store))?;
        fs::write(&self.config.table_path, encode_table(&self.table))?;
        info!(
            "saved disk to {} and file table to {}",
            self.config.disk_path.display(),
            self.config.table_path.display()
        );
        Ok(())
    }

    /// Restores a saved snapshot, or starts empty when either artifact is
    /// missing.
    pub fn load(config: Config) -> Result<FileSystem> {
        let mut loaded = FileSystem::new(config)?;
        let disk_path = loaded.config.disk_path.clone();
        let table_path = loaded.config.table_path.clone();
        if !disk_path.exists() || !table_path.exists() {
            info!("no saved snapshot, starting with an empty disk");
            return Ok(loaded);
        }

        let disk = fs::read_to_string(&disk_path)?;
        let blocks = decode_blocks(&disk, &loaded.config.geometry, &disk_path)?;
        let entries = decode_table(&fs::read_to_string(&table_path)?, &table_path)?;

        for (index, slots) in blocks.into_iter().enumerate() {
            loaded.store.set_block(index, slots);
        }
        for TableEntry {
            line,
            handle,
            name,
            blocks,
        } in entries
        {
            for &index in &blocks {
                if index < loaded.store.reserved() || index >= loaded.store.block_count() {
                    let reason = format!("block {index} not allocatable");
                    return Err(corrupt(&table_path, line, reason));
                }
                if loaded.store.is_allocated(index) {
                    let reason = format!("block {index} owned twice");
                    return Err(corrupt(&table_path, line, reason));
                }
                loaded.store.mark_allocated(index);
            }
            // only the tail of the last block may be empty
            let Some((&last, body)) = blocks.split_last() else {
                return Err(corrupt(&table_path, line, "file owns no blocks"));
            };
            let block_size = loaded.store.block_size();
            if let Some(&index) = body.iter().find(|&&i| loaded.store.fill(i) != block_size) {
                let reason = format!("block {index} of {name} is not full but is not the last");
                return Err(corrupt(&table_path, line, reason));
            }
            if !loaded.store.is_packed(last) {
                let reason = format!("block {last} of {name} has a hole");
                return Err(corrupt(&table_path, line, reason));
            }
            if handle == loaded.directory.handle() {
                return Err(corrupt(&table_path, line, "descriptor 0 belongs to the directory"));
            }
            validate_name(&name)?;
            loaded.directory.add(&name, handle)?;
            loaded.table.bind(File::with_blocks(handle, &name, blocks))?;
        }
        info!(
            "loaded {} files from {} and {}",
            loaded.directory.len(),
            disk_path.display(),
            table_path.display()
        );
        Ok(loaded)
    }
}
