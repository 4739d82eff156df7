//! SPI channel character device (`/dev/mcp3208`).

use std::fs::File;
use std::io;
use std::os::fd::AsRawFd;
use std::path::Path;

use super::{iow, open_rw, IoctlRequest};
use crate::hw_trait::{HwError, Result, SpiControl, SpiDevice};

const CLASS: u8 = 0x90;

/// Argument of the transfer command.
#[repr(C)]
struct Transfer {
    mosi: *const u8,
    miso: *mut u8,
    size: libc::ssize_t,
}

const CONFWRITE: IoctlRequest = iow::<u32>(CLASS, 0);
const XMIT: IoctlRequest = iow::<Transfer>(CLASS, 3);

/// An open SPI channel.
#[derive(Debug)]
pub struct SpiChar {
    file: File,
}

impl SpiChar {
    pub fn open(path: &Path) -> io::Result<Self> {
        Ok(Self {
            file: open_rw(path)?,
        })
    }
}

impl SpiDevice for SpiChar {
    fn configure(&mut self, control: SpiControl) -> Result<()> {
        let mut word = control.bits();
        syscall!(ioctl(
            self.file.as_raw_fd(),
            CONFWRITE as _,
            &mut word as *mut u32
        ))?;
        Ok(())
    }

    fn transfer(&mut self, mosi: &[u8], miso: &mut [u8]) -> Result<()> {
        if mosi.len() != miso.len() {
            return Err(HwError::InvalidParameter(format!(
                "SPI buffers differ in length: {} out, {} in",
                mosi.len(),
                miso.len()
            )));
        }
        let mut xfer = Transfer {
            mosi: mosi.as_ptr(),
            miso: miso.as_mut_ptr(),
            size: mosi.len() as libc::ssize_t,
        };
        syscall!(ioctl(
            self.file.as_raw_fd(),
            XMIT as _,
            &mut xfer as *mut Transfer
        ))?;
        Ok(())
    }
}
