/*
 * Copyright 2025 Luc Lenôtre
 *
 * This file is part of Maestro.
 *
 * Maestro is free software: you can redistribute it and/or modify it under the
 * terms of the GNU General Public License as published by the Free Software
 * Foundation, either version 3 of the License, or (at your option) any later
 * version.
 *
 * Maestro is distributed in the hope that it will be useful, but WITHOUT ANY
 * WARRANTY; without even the implied warranty of MERCHANTABILITY or FITNESS FOR
 * A PARTICULAR PURPOSE. See the GNU General Public License for more details.
 *
 * You should have received a copy of the GNU General Public License along with
 * Maestro. If not, see <https://www.gnu.org/licenses/>.
 */

//! A block-addressable storage emulator backed by a plain host file.
//!
//! Nothing above this layer ever touches the host file system directly; every
//! higher layer speaks in whole blocks through [`BlockDevice`].

use std::fs::{File, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::Path;

use crate::error::{Error, Result};

/// A disk image addressed in fixed-size blocks.
pub struct BlockDevice {
    file: File,
    block_size: usize,
    total_blocks: u32,
}

impl BlockDevice {
    /// Creates a new backing file sized to `block_size * total_blocks` bytes
    /// and zero-filled, then opens it as a block device.
    pub fn init_fresh_disk(name: &str, block_size: usize, total_blocks: u32) -> Result<Self> {
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(true)
            .open(name)?;
        let len = block_size as u64 * total_blocks as u64;
        file.set_len(len)?;
        log::debug!("formatted fresh disk image {name:?}: {total_blocks} blocks of {block_size} bytes");
        Ok(Self {
            file,
            block_size,
            total_blocks,
        })
    }

    /// Opens an existing backing file as a block device, validating that its
    /// length matches the geometry the caller expects.
    ///
    /// The original prototype trusts the file's length unconditionally; this
    /// rejects a truncated or foreign image up front instead of letting a
    /// later read run past the end of the file.
    pub fn init_disk(name: &str, block_size: usize, total_blocks: u32) -> Result<Self> {
        let file = OpenOptions::new().read(true).write(true).open(name)?;
        let expected_len = block_size as u64 * total_blocks as u64;
        let actual_len = file.metadata()?.len();
        if actual_len < expected_len {
            log::warn!(
                "disk image {name:?} is {actual_len} bytes, expected at least {expected_len}"
            );
            return Err(Error::DiskTooSmall);
        }
        log::debug!("opened existing disk image {name:?}: {total_blocks} blocks of {block_size} bytes");
        Ok(Self {
            file,
            block_size,
            total_blocks,
        })
    }

    /// Checks whether a disk image already exists at `name`.
    pub fn exists<P: AsRef<Path>>(name: P) -> bool {
        name.as_ref().is_file()
    }

    fn check_range(&self, start: u32, count: u32) -> Result<()> {
        if count == 0 || start.checked_add(count).is_none_or(|end| end > self.total_blocks) {
            return Err(Error::BlockOutOfRange(start));
        }
        Ok(())
    }

    /// Reads `count` contiguous blocks starting at `start` into `buf`, which
    /// must be exactly `count * block_size` bytes long.
    pub fn read_blocks(&mut self, start: u32, count: u32, buf: &mut [u8]) -> Result<()> {
        self.check_range(start, count)?;
        debug_assert_eq!(buf.len(), count as usize * self.block_size);
        self.file.seek(SeekFrom::Start(start as u64 * self.block_size as u64))?;
        self.file.read_exact(buf)?;
        log::trace!("read {count} block(s) starting at {start}");
        Ok(())
    }

    /// Writes `count` contiguous blocks starting at `start` from `buf`, which
    /// must be exactly `count * block_size` bytes long.
    pub fn write_blocks(&mut self, start: u32, count: u32, buf: &[u8]) -> Result<()> {
        self.check_range(start, count)?;
        debug_assert_eq!(buf.len(), count as usize * self.block_size);
        self.file.seek(SeekFrom::Start(start as u64 * self.block_size as u64))?;
        self.file.write_all(buf)?;
        self.file.flush()?;
        log::trace!("wrote {count} block(s) starting at {start}");
        Ok(())
    }

    pub fn block_size(&self) -> usize {
        self.block_size
    }

    pub fn total_blocks(&self) -> u32 {
        self.total_blocks
    }
}
