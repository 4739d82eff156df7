//! Host filesystem access.

use std::ffi::CString;
use std::fs::{self, File, OpenOptions};
use std::io::Write;
use std::os::fd::AsRawFd;
use std::os::unix::ffi::OsStrExt;
use std::path::Path;

use crate::hw_trait::{Filesystem, FsStats, HwError, PathKind, Result, ScratchFile};
use crate::tracing::prelude::*;

impl ScratchFile for File {
    fn sync_barrier(&mut self) -> std::io::Result<()> {
        self.flush()?;
        self.sync_all()?;
        unsafe { libc::sync() };

        // Ask for the cached pages to be dropped so the read-back has to go
        // to the medium. Advisory only.
        let rc = unsafe { libc::posix_fadvise(self.as_raw_fd(), 0, 0, libc::POSIX_FADV_DONTNEED) };
        if rc != 0 {
            debug!(errno = rc, "posix_fadvise(DONTNEED) not honoured");
        }
        Ok(())
    }
}

/// The filesystem the process runs on.
#[derive(Debug, Default)]
pub struct HostFilesystem;

impl Filesystem for HostFilesystem {
    fn statfs(&self, path: &Path) -> Result<FsStats> {
        let c_path = CString::new(path.as_os_str().as_bytes()).map_err(|_| {
            HwError::InvalidParameter(format!("path contains NUL: {}", path.display()))
        })?;

        let mut raw: libc::statfs = unsafe { std::mem::zeroed() };
        syscall!(statfs(c_path.as_ptr(), &mut raw))?;

        // Field widths differ between architectures.
        #[allow(clippy::unnecessary_cast)]
        let stats = FsStats {
            fs_type: raw.f_type as i64,
            block_size: raw.f_bsize as u64,
            blocks: raw.f_blocks as u64,
            blocks_available: raw.f_bavail as u64,
        };
        Ok(stats)
    }

    fn create_scratch(&self, path: &Path) -> Result<Box<dyn ScratchFile>> {
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(true)
            .open(path)?;
        Ok(Box::new(file))
    }

    fn remove(&self, path: &Path) -> Result<()> {
        fs::remove_file(path)?;
        Ok(())
    }

    fn path_kind(&self, path: &Path) -> Result<PathKind> {
        let meta = fs::metadata(path)?;
        Ok(if meta.is_dir() {
            PathKind::Directory
        } else {
            PathKind::Other
        })
    }

    fn read_attr(&self, path: &Path) -> Result<String> {
        let text = fs::read_to_string(path)?;
        Ok(text.trim_end_matches('\n').to_string())
    }

    fn write_attr(&self, path: &Path, value: &str) -> Result<()> {
        let mut file = OpenOptions::new().write(true).open(path)?;
        file.write_all(value.as_bytes())?;
        Ok(())
    }
}
