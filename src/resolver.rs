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

//! Translates a file-relative block index into an absolute disk address,
//! following the twelve-direct-pointers-plus-one-indirect-block scheme.

use crate::block::BlockDevice;
use crate::constants::{BLOCK_SIZE, DIRECT_POINTERS, MAX_FILE_BLOCKS, POINTERS_PER_INDIRECT};
use crate::error::{Error, Result};
use crate::layout::Inode;

/// Reads the indirect block's pointer table off disk.
///
/// `indirect_addr == 0` means the inode has no indirect block yet; this
/// returns an all-zero table in that case rather than reading block 0 (the
/// superblock).
pub fn read_indirect(device: &mut BlockDevice, indirect_addr: u32) -> Result<[u32; POINTERS_PER_INDIRECT]> {
    let mut table = [0u32; POINTERS_PER_INDIRECT];
    if indirect_addr == 0 {
        return Ok(table);
    }
    let mut buf = vec![0u8; BLOCK_SIZE];
    device.read_blocks(indirect_addr, 1, &mut buf)?;
    for (i, chunk) in buf.chunks_exact(4).enumerate() {
        table[i] = u32::from_le_bytes(chunk.try_into().unwrap());
    }
    Ok(table)
}

/// Writes an indirect block's pointer table to disk.
pub fn write_indirect(device: &mut BlockDevice, indirect_addr: u32, table: &[u32; POINTERS_PER_INDIRECT]) -> Result<()> {
    let mut buf = vec![0u8; BLOCK_SIZE];
    for (i, slot) in table.iter().enumerate() {
        buf[i * 4..i * 4 + 4].copy_from_slice(&slot.to_le_bytes());
    }
    device.write_blocks(indirect_addr, 1, &buf)
}

/// Resolves the absolute address of the `index`-th data block of a file.
///
/// Returns `Ok(0)` when the slot exists within the addressing range but has
/// not been allocated yet (a hole that `fwrite` must fill in before use).
pub fn resolve(inode: &Inode, index: usize, device: &mut BlockDevice) -> Result<u32> {
    if index >= MAX_FILE_BLOCKS {
        return Err(Error::AddressingLimit);
    }
    if index < DIRECT_POINTERS {
        return Ok(inode.direct_at(index));
    }
    let table = read_indirect(device, inode.indirect)?;
    Ok(table[index - DIRECT_POINTERS])
}

/// Number of data blocks needed to hold `size_bytes` of file content.
pub fn blocks_needed(size_bytes: u32) -> u32 {
    crate::util::ceil_division(size_bytes, BLOCK_SIZE as u32)
}
