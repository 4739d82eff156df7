//! Removable block storage (USB stick, SD card).
//!
//! Writes 8 KiB to `<mount>/test`, pushes it to the medium and reads it
//! back. Two kinds of setup would pass that test without a card present, so
//! they are ruled out first:
//!
//! - nothing is mounted and the path sits on the root filesystem;
//! - the path is on on-board flash (JFFS2), RAM (tmpfs) or NFS.
//!
//! The first fails immediately. The second is given one more attempt after
//! a settle interval, for an automounter that is still catching up.

use std::io::{self, Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

use async_trait::async_trait;

use super::{OrFail, Probe, ProbeFailure};
use crate::config::{ProbeDefaults, ProbeTiming};
use crate::error::{Band, ErrorCode};
use crate::hw_trait::{Filesystem, ScratchFile};
use crate::platform::Platform;
use crate::tracing::prelude::*;

const PATTERN_BYTE: u8 = 0xAA;
const PATTERN_LEN: usize = 8192;
const SCRATCH_NAME: &str = "test";

pub struct BlockProbe {
    mount: PathBuf,
    root_reference: PathBuf,
    timing: ProbeTiming,
}

impl BlockProbe {
    pub fn new(mount: impl Into<PathBuf>, defaults: &ProbeDefaults, timing: ProbeTiming) -> Self {
        Self {
            mount: mount.into(),
            root_reference: defaults.root_reference.clone(),
            timing,
        }
    }

    fn write_read_back(&self, fs: &dyn Filesystem) -> Result<(), ProbeFailure> {
        let path = self.mount.join(SCRATCH_NAME);
        let file = fs
            .create_scratch(&path)
            .or_fail(ErrorCode::FdNoOpen, format_args!("creating {}", path.display()))?;
        let mut scratch = Scratch {
            fs,
            path: &path,
            file: Some(file),
        };
        let file = scratch.file();

        let pattern = [PATTERN_BYTE; PATTERN_LEN];
        file.write_all(&pattern)
            .or_fail(ErrorCode::FdNoWrite, "writing test pattern")?;
        file.sync_barrier()
            .or_fail(ErrorCode::FdNoWrite, "syncing test pattern")?;

        file.seek(SeekFrom::Start(0))
            .or_fail(ErrorCode::FdNoRead, "rewinding test file")?;
        let mut back = [0u8; PATTERN_LEN];
        let n = read_full(file, &mut back).or_fail(ErrorCode::FdNoRead, "reading test pattern")?;
        if n != PATTERN_LEN {
            return Err(ProbeFailure::new(
                ErrorCode::FdNoRead,
                format!("read back {n} of {PATTERN_LEN} bytes"),
            ));
        }

        if let Some(offset) = back.iter().position(|&b| b != PATTERN_BYTE) {
            return Err(ProbeFailure::new(
                ErrorCode::BufCmpFail,
                format!(
                    "read/write mismatch at offset {offset}: wrote 0x{PATTERN_BYTE:02x}, read 0x{:02x}",
                    back[offset]
                ),
            ));
        }
        Ok(())
    }
}

/// Read until `buf` is full or end of file.
fn read_full(r: &mut dyn ScratchFile, buf: &mut [u8]) -> io::Result<usize> {
    let mut filled = 0;
    while filled < buf.len() {
        match r.read(&mut buf[filled..]) {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => {}
            Err(e) => return Err(e),
        }
    }
    Ok(filled)
}

/// The test file; closed and deleted when dropped.
struct Scratch<'a> {
    fs: &'a dyn Filesystem,
    path: &'a Path,
    file: Option<Box<dyn ScratchFile>>,
}

impl Scratch<'_> {
    fn file(&mut self) -> &mut dyn ScratchFile {
        match self.file.as_deref_mut() {
            Some(file) => file,
            None => unreachable!("scratch file taken before drop"),
        }
    }
}

impl Drop for Scratch<'_> {
    fn drop(&mut self) {
        drop(self.file.take());
        if let Err(e) = self.fs.remove(self.path) {
            warn!(path = %self.path.display(), error = %e, "Failed to delete test file");
        }
    }
}

#[async_trait]
impl Probe for BlockProbe {
    fn name(&self) -> &'static str {
        "block"
    }

    fn band(&self) -> Band {
        Band::Block
    }

    async fn run(&self, platform: &dyn Platform) -> Result<(), ProbeFailure> {
        let fs = platform.filesystem();

        for attempt in 1..=self.timing.block_attempts {
            let root = fs.statfs(&self.root_reference).or_fail(
                ErrorCode::BlockDev,
                format_args!("statfs {}", self.root_reference.display()),
            )?;
            let stats = fs.statfs(&self.mount).or_fail(
                ErrorCode::BlockDev,
                format_args!("statfs {}", self.mount.display()),
            )?;

            if stats.fingerprint() == root.fingerprint() {
                return Err(ProbeFailure::new(
                    ErrorCode::BlockNoMount,
                    format!("nothing mounted at {}", self.mount.display()),
                ));
            }

            if stats.is_non_removable() {
                debug!(
                    attempt,
                    fs_type = stats.fs_type,
                    "Mount point is not removable media yet"
                );
                if attempt < self.timing.block_attempts {
                    tokio::time::sleep(self.timing.block_settle).await;
                }
                continue;
            }

            debug!(
                mount = %self.mount.display(),
                free_mib = stats.available_mib(),
                "Testing block device"
            );
            return self.write_read_back(fs);
        }

        Err(ProbeFailure::new(
            ErrorCode::Timeout,
            format!(
                "{} is not on removable media after {} attempts",
                self.mount.display(),
                self.timing.block_attempts
            ),
        ))
    }
}
