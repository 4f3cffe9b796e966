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

//! The free-block allocator: the one place inode pointers and bitmap bit
//! indices meet. Callers only ever see absolute block addresses; the
//! local/absolute translation lives entirely in this module.

use crate::bitmap::Bitmap;
use crate::block::BlockDevice;
use crate::constants::{BITMAP_BLOCKS, BITMAP_START, BLOCK_SIZE, DATA_BLOCKS, DATA_START};
use crate::error::{Error, Result};

/// Owns the in-memory bitmap image and translates data-block addresses.
pub struct Allocator {
    bitmap: Bitmap,
}

impl Allocator {
    /// Builds an allocator with every data block marked free.
    pub fn fresh() -> Self {
        Self {
            bitmap: Bitmap::fresh(BITMAP_BLOCKS as usize * BLOCK_SIZE),
        }
    }

    /// Loads the bitmap's on-disk image.
    pub fn load(device: &mut BlockDevice) -> Result<Self> {
        let mut buf = vec![0u8; BITMAP_BLOCKS as usize * BLOCK_SIZE];
        device.read_blocks(BITMAP_START, BITMAP_BLOCKS, &mut buf)?;
        Ok(Self {
            bitmap: Bitmap::from_bytes(buf),
        })
    }

    /// Persists the bitmap's current image.
    pub fn save(&self, device: &mut BlockDevice) -> Result<()> {
        device.write_blocks(BITMAP_START, BITMAP_BLOCKS, self.bitmap.as_bytes())
    }

    fn to_local(&self, absolute: u32) -> Result<u32> {
        absolute
            .checked_sub(DATA_START)
            .filter(|&local| local < DATA_BLOCKS)
            .ok_or(Error::BlockOutOfRange(absolute))
    }

    fn to_absolute(&self, local: u32) -> u32 {
        local + DATA_START
    }

    /// Number of data blocks not currently allocated.
    pub fn count_free(&self) -> u32 {
        self.bitmap.count_free(DATA_BLOCKS)
    }

    /// Claims the lowest-numbered free data block, returning its absolute
    /// address, or [`Error::OutOfSpace`] if none remain.
    pub fn allocate(&mut self) -> Result<u32> {
        let local = self.bitmap.first_free(DATA_BLOCKS).ok_or(Error::OutOfSpace)?;
        self.bitmap.set(local);
        let absolute = self.to_absolute(local);
        log::trace!("allocated data block {absolute}");
        Ok(absolute)
    }

    /// Releases a previously allocated data block back to the free pool.
    pub fn free(&mut self, absolute: u32) -> Result<()> {
        let local = self.to_local(absolute)?;
        self.bitmap.clear(local);
        log::trace!("freed data block {absolute}");
        Ok(())
    }
}
