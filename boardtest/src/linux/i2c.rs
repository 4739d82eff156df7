//! i2c-dev bus device.
//!
//! The single-byte SMBus "write byte"/"read byte" transactions used by the
//! probes are plain one-byte `write(2)`/`read(2)` calls on an i2c-dev node
//! once `I2C_SLAVE` has selected the target.

use std::fs::File;
use std::io::{self, Read, Write};
use std::os::fd::AsRawFd;
use std::path::Path;

use super::{open_rw, IoctlRequest};
use crate::hw_trait::{HwError, I2cBus, I2cError, Result};

const I2C_SLAVE: IoctlRequest = 0x0703;

/// An open I2C adapter.
#[derive(Debug)]
pub struct I2cDev {
    file: File,
    addr: Option<u8>,
}

impl I2cDev {
    pub fn open(path: &Path) -> io::Result<Self> {
        Ok(Self {
            file: open_rw(path)?,
            addr: None,
        })
    }

    fn target(&self) -> Result<u8> {
        self.addr.ok_or(HwError::I2c(I2cError::NoAddress))
    }
}

impl I2cBus for I2cDev {
    fn set_slave(&mut self, addr: u8) -> Result<()> {
        syscall!(ioctl(
            self.file.as_raw_fd(),
            I2C_SLAVE as _,
            libc::c_ulong::from(addr)
        ))?;
        self.addr = Some(addr);
        Ok(())
    }

    fn write_byte(&mut self, byte: u8) -> Result<()> {
        let addr = self.target()?;
        match self.file.write(&[byte]) {
            Ok(1) => Ok(()),
            Ok(_) => Err(I2cError::NoAck(addr).into()),
            Err(e) => Err(I2cError::from_os(addr, e).into()),
        }
    }

    fn read_byte(&mut self) -> Result<u8> {
        let addr = self.target()?;
        let mut buf = [0u8; 1];
        match self.file.read(&mut buf) {
            Ok(1) => Ok(buf[0]),
            Ok(_) => Err(I2cError::NoAck(addr).into()),
            Err(e) => Err(I2cError::from_os(addr, e).into()),
        }
    }
}
