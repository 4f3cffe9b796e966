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

//! Fixed on-disk geometry. This is a fixed-geometry disk by design: every
//! constant here must match between a `fresh` `mksfs` call and every later
//! `mksfs(fresh: false)` remount of the same image.

/// Magic number stored in the superblock, used to sanity-check a mounted image.
pub const MAGIC: i32 = 0x5346_5301;

/// Size of a block, in bytes.
pub const BLOCK_SIZE: usize = 1024;

/// Number of direct block pointers in an inode.
pub const DIRECT_POINTERS: usize = 12;

/// Number of 32-bit pointers held by a single indirect block.
pub const POINTERS_PER_INDIRECT: usize = BLOCK_SIZE / 4;

/// Largest number of data blocks a file can span (direct + one indirect block's worth).
pub const MAX_FILE_BLOCKS: usize = DIRECT_POINTERS + POINTERS_PER_INDIRECT;

/// Largest file size in bytes addressable through the direct+indirect scheme.
pub const MAX_FILE_SIZE: usize = MAX_FILE_BLOCKS * BLOCK_SIZE;

/// Length of the inode table, in blocks (`M`). Sized to hold one inode per directory slot.
pub const INODE_TABLE_BLOCKS: u32 = 112;

/// Number of data blocks (`N`), including the blocks used by the root directory itself.
pub const DATA_BLOCKS: u32 = 8192;

/// Length of the free-block bitmap, in blocks (`L`).
pub const BITMAP_BLOCKS: u32 = 1;

/// Maximum number of files the root directory can hold.
pub const DIR_SIZE: usize = 2048;

/// Number of simultaneously open files.
pub const FDT_SIZE: usize = 10;

/// Longest filename, excluding the terminating nul byte.
pub const MAX_FILENAME: usize = 31;

/// Absolute block address of the superblock.
pub const SUPERBLOCK_ADDR: u32 = 0;

/// First block of the inode table.
pub const INODE_TABLE_START: u32 = SUPERBLOCK_ADDR + 1;

/// First data block.
pub const DATA_START: u32 = INODE_TABLE_START + INODE_TABLE_BLOCKS;

/// First block of the free-block bitmap.
pub const BITMAP_START: u32 = DATA_START + DATA_BLOCKS;

/// The final block of the disk, reserved and left unused.
pub const RESERVED_BLOCK: u32 = BITMAP_START + BITMAP_BLOCKS;

/// Total number of blocks the backing disk image must provide.
///
/// Derived from the inode table, data, and bitmap region sizes plus the
/// reserved trailing block, rather than hardcoded, so the regions always
/// tile without overlap regardless of how those sizes change.
pub const TOTAL_BLOCKS: u32 = RESERVED_BLOCK + 1;

/// Default name of the backing disk image file.
pub const DISK_NAME: &str = "SFS_DISK";
