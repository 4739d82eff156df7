//! Filesystem access used by the block-storage, PLD and RS-485 probes.

use std::io::{Read, Seek, Write};
use std::path::Path;

use super::Result;

/// `f_type` magic of a JFFS2 filesystem (on-board flash)
pub const JFFS2_MAGIC: i64 = 0x72b6;
/// `f_type` magic of tmpfs (RAM)
pub const TMPFS_MAGIC: i64 = 0x0102_1994;
/// `f_type` magic of NFS
pub const NFS_MAGIC: i64 = 0x6969;

/// The subset of `struct statfs` the probes look at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct FsStats {
    pub fs_type: i64,
    pub block_size: u64,
    pub blocks: u64,
    pub blocks_available: u64,
}

impl FsStats {
    /// Value used to decide whether two paths sit on the same filesystem.
    ///
    /// Identical total and available block counts are taken to mean the
    /// same filesystem.
    pub fn fingerprint(&self) -> u128 {
        self.blocks as u128 * self.blocks_available as u128
    }

    /// True for filesystems that would pass a write/read test without
    /// proving anything about removable media.
    pub fn is_non_removable(&self) -> bool {
        matches!(self.fs_type, JFFS2_MAGIC | TMPFS_MAGIC | NFS_MAGIC)
    }

    /// Free space in MiB, rounded.
    pub fn available_mib(&self) -> u64 {
        (self.blocks_available * self.block_size + 512) / (1024 * 1024)
    }
}

/// What a path refers to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PathKind {
    Directory,
    Other,
}

/// A file opened for a write/read-back test.
pub trait ScratchFile: Read + Write + Seek + Send {
    /// Flush user-space buffers and wait for the data to reach the medium.
    fn sync_barrier(&mut self) -> std::io::Result<()>;
}

/// Filesystem operations
pub trait Filesystem: Send + Sync {
    /// Statistics of the filesystem containing `path`.
    fn statfs(&self, path: &Path) -> Result<FsStats>;

    /// Create (or truncate) `path` for reading and writing.
    fn create_scratch(&self, path: &Path) -> Result<Box<dyn ScratchFile>>;

    /// Delete `path`.
    fn remove(&self, path: &Path) -> Result<()>;

    /// Classify `path`; errors when it does not exist.
    fn path_kind(&self, path: &Path) -> Result<PathKind>;

    /// Read a sysfs-style text attribute, trailing newline stripped.
    fn read_attr(&self, path: &Path) -> Result<String>;

    /// Write a sysfs-style text attribute. The file must already exist.
    fn write_attr(&self, path: &Path, value: &str) -> Result<()>;
}
