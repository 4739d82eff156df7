//! GPIO port character device (`/dev/porta`, `/dev/indexed_atod`, ...).
//!
//! The driver takes a pointer to a 32-bit value for every data/index
//! command, even though the command numbers encode a one-byte size.

use std::fs::File;
use std::io;
use std::os::fd::AsRawFd;
use std::path::Path;

use super::{io as ioc_none, ior, iow, open_rw, IoctlRequest};
use crate::hw_trait::{GpioPort, Result};

const CLASS: u8 = 0x80;

const DATAREAD: IoctlRequest = ior::<u8>(CLASS, 1);
const DATAWRITE: IoctlRequest = iow::<u8>(CLASS, 1);
const INDEXWRITE: IoctlRequest = iow::<u8>(CLASS, 2);
const LOCK: IoctlRequest = ioc_none(CLASS, 6);
const UNLOCK: IoctlRequest = ioc_none(CLASS, 7);

/// An open GPIO port.
#[derive(Debug)]
pub struct GpioChar {
    file: File,
}

impl GpioChar {
    pub fn open(path: &Path) -> io::Result<Self> {
        Ok(Self {
            file: open_rw(path)?,
        })
    }

    fn command(&self, request: IoctlRequest, value: &mut u32) -> io::Result<()> {
        syscall!(ioctl(
            self.file.as_raw_fd(),
            request as _,
            value as *mut u32
        ))?;
        Ok(())
    }
}

impl GpioPort for GpioChar {
    fn read(&mut self) -> Result<u32> {
        let mut value = 0u32;
        self.command(DATAREAD, &mut value)?;
        Ok(value)
    }

    fn write(&mut self, value: u32) -> Result<()> {
        let mut value = value;
        self.command(DATAWRITE, &mut value)?;
        Ok(())
    }

    fn select_index(&mut self, index: u32) -> Result<()> {
        let mut index = index;
        self.command(INDEXWRITE, &mut index)?;
        Ok(())
    }

    fn lock(&mut self) -> Result<()> {
        syscall!(ioctl(self.file.as_raw_fd(), LOCK as _))?;
        Ok(())
    }

    fn unlock(&mut self) -> Result<()> {
        syscall!(ioctl(self.file.as_raw_fd(), UNLOCK as _))?;
        Ok(())
    }
}
