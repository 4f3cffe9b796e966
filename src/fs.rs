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

//! The public filesystem API: `mksfs`, `fopen`, `fclose`, `fread`, `fwrite`,
//! `fseek`, `remove`, `getfilesize`, `getnextfilename`, composing every lower
//! layer in this crate.

use std::mem::size_of;

use crate::alloc::Allocator;
use crate::block::BlockDevice;
use crate::constants::{
    BLOCK_SIZE, DIRECT_POINTERS, INODE_TABLE_BLOCKS, INODE_TABLE_START, MAX_FILENAME,
    MAX_FILE_SIZE, POINTERS_PER_INDIRECT, SUPERBLOCK_ADDR, TOTAL_BLOCKS,
};
use crate::directory::Directory;
use crate::error::{Error, Result};
use crate::fdt::FileDescriptorTable;
use crate::layout::{Inode, Superblock, INODE_COUNT, ROOT_INODE_INDEX};
use crate::resolver;
use crate::util::{reinterpret, reinterpret_mut};

/// A mounted SimpleFS filesystem.
pub struct SimpleFs {
    device: BlockDevice,
    allocator: Allocator,
    inodes: Vec<Inode>,
    directory: Directory,
    fdt: FileDescriptorTable,
    dir_cursor: usize,
}

impl SimpleFs {
    /// Formats or mounts the disk image at `disk_name`.
    ///
    /// `fresh == true` creates a new, empty filesystem, overwriting whatever
    /// was at `disk_name`. `fresh == false` mounts an existing image,
    /// validating its superblock against this build's fixed geometry.
    pub fn mksfs(fresh: bool, disk_name: &str) -> Result<Self> {
        if fresh {
            Self::format(disk_name)
        } else {
            Self::mount(disk_name)
        }
    }

    fn format(disk_name: &str) -> Result<Self> {
        log::debug!("formatting fresh SimpleFS image at {disk_name:?}");
        let device = BlockDevice::init_fresh_disk(disk_name, BLOCK_SIZE, TOTAL_BLOCKS)?;
        let mut inodes = vec![Inode::free(); INODE_COUNT];
        inodes[ROOT_INODE_INDEX] = Inode::empty_file();
        let mut fs = Self {
            device,
            allocator: Allocator::fresh(),
            inodes,
            directory: Directory::fresh(),
            fdt: FileDescriptorTable::fresh(),
            dir_cursor: 0,
        };
        let empty_dir_bytes = Directory::fresh().to_bytes();
        fs.write_range(ROOT_INODE_INDEX, 0, &empty_dir_bytes)?;
        fs.write_superblock()?;
        Ok(fs)
    }

    fn mount(disk_name: &str) -> Result<Self> {
        log::debug!("mounting existing SimpleFS image at {disk_name:?}");
        let mut device = BlockDevice::init_disk(disk_name, BLOCK_SIZE, TOTAL_BLOCKS)?;
        let superblock = Self::read_superblock(&mut device)?;
        if !superblock.validate() {
            return Err(Error::BadMagic);
        }
        let inodes = Self::load_inode_table(&mut device)?;
        let allocator = Allocator::load(&mut device)?;
        let mut fs = Self {
            device,
            allocator,
            inodes,
            directory: Directory::fresh(),
            fdt: FileDescriptorTable::fresh(),
            dir_cursor: 0,
        };
        let dir_size = fs.inodes[ROOT_INODE_INDEX].size as usize;
        let mut dir_bytes = vec![0u8; dir_size];
        fs.read_range(ROOT_INODE_INDEX, 0, &mut dir_bytes)?;
        fs.directory = Directory::from_bytes(&dir_bytes);
        Ok(fs)
    }

    fn read_superblock(device: &mut BlockDevice) -> Result<Superblock> {
        let mut buf = vec![0u8; BLOCK_SIZE];
        device.read_blocks(SUPERBLOCK_ADDR, 1, &mut buf)?;
        let mut sb = Superblock::fresh(0);
        unsafe { reinterpret_mut(&mut sb) }.copy_from_slice(&buf[..size_of::<Superblock>()]);
        Ok(sb)
    }

    fn write_superblock(&mut self) -> Result<()> {
        let sb = Superblock::fresh(TOTAL_BLOCKS);
        let mut buf = vec![0u8; BLOCK_SIZE];
        buf[..size_of::<Superblock>()].copy_from_slice(unsafe { reinterpret(&sb) });
        self.device.write_blocks(SUPERBLOCK_ADDR, 1, &buf)
    }

    fn load_inode_table(device: &mut BlockDevice) -> Result<Vec<Inode>> {
        let mut buf = vec![0u8; INODE_TABLE_BLOCKS as usize * BLOCK_SIZE];
        device.read_blocks(INODE_TABLE_START, INODE_TABLE_BLOCKS, &mut buf)?;
        let entry_size = size_of::<Inode>();
        let mut inodes = Vec::with_capacity(INODE_COUNT);
        for chunk in buf.chunks_exact(entry_size).take(INODE_COUNT) {
            let mut inode = Inode::free();
            unsafe { reinterpret_mut(&mut inode) }.copy_from_slice(chunk);
            inodes.push(inode);
        }
        Ok(inodes)
    }

    fn persist_inode_table(&mut self) -> Result<()> {
        let mut buf = vec![0u8; INODE_TABLE_BLOCKS as usize * BLOCK_SIZE];
        for (i, inode) in self.inodes.iter().enumerate() {
            let entry_size = size_of::<Inode>();
            buf[i * entry_size..(i + 1) * entry_size].copy_from_slice(unsafe { reinterpret(inode) });
        }
        self.device.write_blocks(INODE_TABLE_START, INODE_TABLE_BLOCKS, &buf)
    }

    fn flush_directory(&mut self) -> Result<()> {
        let bytes = self.directory.to_bytes();
        self.write_range(ROOT_INODE_INDEX, 0, &bytes)?;
        Ok(())
    }

    fn find_free_inode(&self) -> Option<usize> {
        (ROOT_INODE_INDEX + 1..INODE_COUNT).find(|&i| self.inodes[i].is_free())
    }

    /// Writes `data` at byte offset `offset` into the inode at `inode_idx`,
    /// allocating new blocks (and growing `size`) as needed. Returns
    /// [`Error::QuotaExceeded`] rather than a short write when `offset +
    /// data.len()` would exceed [`MAX_FILE_SIZE`].
    ///
    /// Any block allocated during a write that later fails is freed again, so
    /// a partial write never leaves the allocator or inode table pointing at
    /// a block that isn't reachable from the file's final committed size.
    fn write_range(&mut self, inode_idx: usize, offset: u32, data: &[u8]) -> Result<usize> {
        if data.is_empty() {
            return Ok(0);
        }
        if offset as usize + data.len() > MAX_FILE_SIZE {
            return Err(Error::QuotaExceeded);
        }

        let mut inode = self.inodes[inode_idx];
        let mut allocated = Vec::new();
        let attempt = (|| -> Result<()> {
            let mut written = 0usize;
            while written < data.len() {
                let pos = offset as usize + written;
                let block_index = pos / BLOCK_SIZE;
                let block_offset = pos % BLOCK_SIZE;
                let chunk_len = (BLOCK_SIZE - block_offset).min(data.len() - written);

                let mut addr = resolver::resolve(&inode, block_index, &mut self.device)?;
                if addr == 0 {
                    if block_index >= DIRECT_POINTERS && inode.indirect == 0 {
                        let indirect_addr = self.allocator.allocate()?;
                        allocated.push(indirect_addr);
                        resolver::write_indirect(
                            &mut self.device,
                            indirect_addr,
                            &[0u32; POINTERS_PER_INDIRECT],
                        )?;
                        inode.indirect = indirect_addr;
                    }
                    let new_addr = self.allocator.allocate()?;
                    allocated.push(new_addr);
                    if block_index < DIRECT_POINTERS {
                        inode.set_direct(block_index, new_addr);
                    } else {
                        let mut table = resolver::read_indirect(&mut self.device, inode.indirect)?;
                        table[block_index - DIRECT_POINTERS] = new_addr;
                        resolver::write_indirect(&mut self.device, inode.indirect, &table)?;
                    }
                    addr = new_addr;
                }

                let mut block_buf = vec![0u8; BLOCK_SIZE];
                if chunk_len != BLOCK_SIZE {
                    self.device.read_blocks(addr, 1, &mut block_buf)?;
                }
                block_buf[block_offset..block_offset + chunk_len]
                    .copy_from_slice(&data[written..written + chunk_len]);
                self.device.write_blocks(addr, 1, &block_buf)?;
                written += chunk_len;
            }
            Ok(())
        })();

        if let Err(e) = attempt {
            log::warn!("write failed mid-operation, rolling back {} block(s)", allocated.len());
            for block in allocated {
                let _ = self.allocator.free(block);
            }
            return Err(e);
        }

        inode.size = inode.size.max((offset as usize + data.len()) as u32);
        self.inodes[inode_idx] = inode;
        self.persist_inode_table()?;
        self.allocator.save(&mut self.device)?;
        Ok(data.len())
    }

    /// Reads up to `buf.len()` bytes starting at `offset` from the inode at
    /// `inode_idx`, stopping at the inode's recorded size.
    fn read_range(&mut self, inode_idx: usize, offset: u32, buf: &mut [u8]) -> Result<usize> {
        let inode = self.inodes[inode_idx];
        let size = inode.size as usize;
        if offset as usize >= size {
            return Ok(0);
        }
        let len = buf.len().min(size - offset as usize);
        let mut read = 0usize;
        while read < len {
            let pos = offset as usize + read;
            let block_index = pos / BLOCK_SIZE;
            let block_offset = pos % BLOCK_SIZE;
            let chunk_len = (BLOCK_SIZE - block_offset).min(len - read);
            let addr = resolver::resolve(&inode, block_index, &mut self.device)?;
            let mut block_buf = vec![0u8; BLOCK_SIZE];
            if addr != 0 {
                self.device.read_blocks(addr, 1, &mut block_buf)?;
            }
            buf[read..read + chunk_len].copy_from_slice(&block_buf[block_offset..block_offset + chunk_len]);
            read += chunk_len;
        }
        Ok(read)
    }

    /// Opens `name`, creating it if it does not already exist, and returns a
    /// file descriptor positioned for append (`rw_head = size`), per this
    /// crate's append-on-open convention.
    pub fn fopen(&mut self, name: &str) -> Result<usize> {
        if name.is_empty() || name.len() > MAX_FILENAME {
            return Err(Error::NameTooLong);
        }
        let inode_index = match self.directory.lookup(name) {
            Some((_, entry)) => entry.inode as usize,
            None => {
                let inode_index = self.find_free_inode().ok_or(Error::DirectoryFull)?;
                let slot = self.directory.next_free_slot().ok_or(Error::DirectoryFull)?;
                self.inodes[inode_index] = Inode::empty_file();
                self.persist_inode_table()?;
                self.directory
                    .insert(slot, crate::layout::DirEntry::new(name, inode_index as u32));
                self.flush_directory()?;
                log::debug!("created {name:?} as inode {inode_index}");
                inode_index
            }
        };
        if let Some(fd) = self.fdt.find_open(inode_index as u32) {
            log::debug!("{name:?} already open on fd {fd}; returning the existing descriptor");
            return Ok(fd);
        }
        let fd = self.fdt.next_free_slot().ok_or(Error::FdtFull)?;
        let size = self.inodes[inode_index].size;
        self.fdt.open(fd, inode_index as u32, size);
        log::debug!("opened {name:?} as fd {fd} at offset {size}");
        Ok(fd)
    }

    /// Closes a file descriptor previously returned by [`Self::fopen`].
    pub fn fclose(&mut self, fd: usize) -> Result<()> {
        self.fdt.close(fd)
    }

    /// Writes `data` at the descriptor's current read/write head, advancing
    /// it by `data.len()`. Fails with [`Error::QuotaExceeded`] rather than
    /// writing a truncated prefix if the write would grow the file past
    /// [`MAX_FILE_SIZE`].
    pub fn fwrite(&mut self, fd: usize, data: &[u8]) -> Result<usize> {
        let open = *self.fdt.get(fd)?;
        let written = self.write_range(open.inode_index as usize, open.rw_head, data)?;
        self.fdt.get_mut(fd)?.rw_head += written as u32;
        Ok(written)
    }

    /// Reads up to `buf.len()` bytes from the descriptor's current read/write
    /// head, advancing it by the number of bytes actually read.
    pub fn fread(&mut self, fd: usize, buf: &mut [u8]) -> Result<usize> {
        let open = *self.fdt.get(fd)?;
        let read = self.read_range(open.inode_index as usize, open.rw_head, buf)?;
        self.fdt.get_mut(fd)?.rw_head += read as u32;
        Ok(read)
    }

    /// Moves the descriptor's read/write head to `offset`, which must fall
    /// within `[0, size]`.
    pub fn fseek(&mut self, fd: usize, offset: u32) -> Result<()> {
        let inode_index = self.fdt.get(fd)?.inode_index as usize;
        let size = self.inodes[inode_index].size;
        if offset > size {
            return Err(Error::InvalidPosition);
        }
        self.fdt.get_mut(fd)?.rw_head = offset;
        Ok(())
    }

    /// Deletes `name` and releases all blocks it owned.
    pub fn remove(&mut self, name: &str) -> Result<()> {
        let (slot, inode_index) = match self.directory.lookup(name) {
            Some((slot, entry)) => (slot, entry.inode as usize),
            None => return Err(Error::NotFound(name.to_owned())),
        };
        let inode = self.inodes[inode_index];
        let blocks_used = resolver::blocks_needed(inode.size) as usize;
        for block_index in 0..blocks_used.min(DIRECT_POINTERS) {
            let addr = inode.direct_at(block_index);
            if addr != 0 {
                self.allocator.free(addr)?;
            }
        }
        if blocks_used > DIRECT_POINTERS {
            let table = resolver::read_indirect(&mut self.device, inode.indirect)?;
            for &addr in table.iter().take(blocks_used - DIRECT_POINTERS) {
                if addr != 0 {
                    self.allocator.free(addr)?;
                }
            }
        }
        if inode.indirect != 0 {
            self.allocator.free(inode.indirect)?;
        }
        self.inodes[inode_index] = Inode::free();
        self.persist_inode_table()?;
        self.allocator.save(&mut self.device)?;
        self.directory.remove(slot);
        self.flush_directory()?;
        log::debug!("removed {name:?} (inode {inode_index})");
        Ok(())
    }

    /// Number of data blocks not currently allocated to any file or the
    /// root directory.
    pub fn allocator_free_blocks(&self) -> u32 {
        self.allocator.count_free()
    }

    /// Returns the current size, in bytes, of `name`.
    pub fn getfilesize(&self, name: &str) -> Result<u32> {
        let (_, entry) = self.directory.lookup(name).ok_or_else(|| Error::NotFound(name.to_owned()))?;
        Ok(self.inodes[entry.inode as usize].size)
    }

    /// Advances an internal cursor over the directory and returns the next
    /// occupied slot's name, or `None` once every name has been returned,
    /// at which point the cursor resets so the next call starts over.
    pub fn getnextfilename(&mut self) -> Option<String> {
        while self.dir_cursor < self.directory.len() {
            let entry = self.directory.entry_at(self.dir_cursor);
            self.dir_cursor += 1;
            if !entry.is_free() {
                return Some(entry.name_str().to_owned());
            }
        }
        self.dir_cursor = 0;
        None
    }
}
