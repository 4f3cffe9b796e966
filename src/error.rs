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

//! Errors produced by the filesystem core.

use crate::constants::{MAX_FILENAME, MAX_FILE_SIZE};

/// Every way a filesystem call can fail.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The underlying block device returned an I/O error.
    #[error("disk I/O error: {0}")]
    Io(#[from] std::io::Error),
    /// A filename exceeded [`MAX_FILENAME`] characters.
    #[error("file name exceeds {MAX_FILENAME} characters")]
    NameTooLong,
    /// The root directory has no free slot left for a new file.
    #[error("the directory is full")]
    DirectoryFull,
    /// The file descriptor table has no free slot left.
    #[error("the file descriptor table is full")]
    FdtFull,
    /// No directory entry matches the requested name.
    #[error("file not found: {0:?}")]
    NotFound(String),
    /// `fd` is out of range or does not refer to an open file.
    #[error("invalid file descriptor")]
    InvalidHandle,
    /// A seek target, or the read/write head, fell outside `[0, size]`.
    #[error("position outside the file's bounds")]
    InvalidPosition,
    /// The write would grow the file past [`MAX_FILE_SIZE`].
    #[error("write would exceed the maximum file size of {MAX_FILE_SIZE} bytes")]
    QuotaExceeded,
    /// The free-block bitmap does not have enough zero bits to satisfy the request.
    #[error("not enough free data blocks")]
    OutOfSpace,
    /// A block address fell outside the data-block region during a free.
    #[error("block address {0} is outside the data-block region")]
    BlockOutOfRange(u32),
    /// The disk image is smaller than the geometry it is expected to hold.
    #[error("disk image is too small for its declared geometry")]
    DiskTooSmall,
    /// The superblock's magic number did not match; the image is not a SimpleFS disk.
    #[error("not a SimpleFS disk image")]
    BadMagic,
    /// A block count requested from the resolver exceeds the direct+indirect addressing limit.
    #[error("requested block index exceeds the addressing limit")]
    AddressingLimit,
}

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, Error>;
