//! Linux implementations of the hardware traits.
//!
//! Each submodule wraps one kind of character device. Handles own their file
//! descriptor (`std::fs::File` or the serial stream), so dropping a handle
//! closes it exactly once.
//!
//! ## ioctl numbers
//!
//! The board drivers define their commands with the kernel's `_IOR`/`_IOW`
//! macros. [`ioc`] reproduces the generic encoding used on ARM and x86:
//!
//! ```text
//! bits 31..30  direction (1 = write, 2 = read)
//! bits 29..16  argument size
//! bits 15..8   driver class
//! bits  7..0   command number
//! ```

// Execute a libc call that reports failure with -1, turning it into an
// `io::Result` that keeps errno.
macro_rules! syscall {
    ($fn:ident($($arg:expr),* $(,)*)) => {{
        #[allow(unused_unsafe)]
        let res = unsafe { libc::$fn($($arg, )*) };
        if res == -1 {
            Err(std::io::Error::last_os_error())
        } else {
            Ok(res)
        }
    }};
}

pub mod fs;
pub mod gpio;
pub mod i2c;
pub mod pwm;
pub mod rtc;
pub mod serial;
pub mod spi;

use std::fs::{File, OpenOptions};
use std::path::Path;

use crate::hw_trait::{
    Filesystem, GpioPort, I2cBus, Pwm, Result, Rtc, SerialConfig, SerialLine, SpiDevice,
    SystemClock,
};
use crate::platform::Platform;
use crate::tracing::prelude::*;

pub(crate) type IoctlRequest = libc::c_ulong;

const IOC_NONE: IoctlRequest = 0;
const IOC_WRITE: IoctlRequest = 1;
const IOC_READ: IoctlRequest = 2;

/// Encode an ioctl request number.
pub(crate) const fn ioc(dir: IoctlRequest, class: u8, nr: u8, size: usize) -> IoctlRequest {
    (dir << 30)
        | ((size as IoctlRequest & 0x3fff) << 16)
        | ((class as IoctlRequest) << 8)
        | nr as IoctlRequest
}

/// `_IO(class, nr)`
pub(crate) const fn io(class: u8, nr: u8) -> IoctlRequest {
    ioc(IOC_NONE, class, nr, 0)
}

/// `_IOR(class, nr, T)`
pub(crate) const fn ior<T>(class: u8, nr: u8) -> IoctlRequest {
    ioc(IOC_READ, class, nr, std::mem::size_of::<T>())
}

/// `_IOW(class, nr, T)`
pub(crate) const fn iow<T>(class: u8, nr: u8) -> IoctlRequest {
    ioc(IOC_WRITE, class, nr, std::mem::size_of::<T>())
}

/// Open a device node read/write.
pub(crate) fn open_rw(path: &Path) -> std::io::Result<File> {
    OpenOptions::new().read(true).write(true).open(path)
}

/// Open a device node write-only.
pub(crate) fn open_wo(path: &Path) -> std::io::Result<File> {
    OpenOptions::new().write(true).open(path)
}

/// [`Platform`] backed by the running Linux kernel.
#[derive(Debug, Default)]
pub struct LinuxPlatform {
    fs: fs::HostFilesystem,
}

impl LinuxPlatform {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Platform for LinuxPlatform {
    fn open_gpio(&self, path: &Path) -> Result<Box<dyn GpioPort>> {
        trace!(device = %path.display(), "Opening GPIO port");
        Ok(Box::new(gpio::GpioChar::open(path)?))
    }

    fn open_i2c(&self, path: &Path) -> Result<Box<dyn I2cBus>> {
        trace!(device = %path.display(), "Opening I2C bus");
        Ok(Box::new(i2c::I2cDev::open(path)?))
    }

    fn open_spi(&self, path: &Path) -> Result<Box<dyn SpiDevice>> {
        trace!(device = %path.display(), "Opening SPI channel");
        Ok(Box::new(spi::SpiChar::open(path)?))
    }

    fn open_serial(&self, path: &Path, config: &SerialConfig) -> Result<Box<dyn SerialLine>> {
        trace!(device = %path.display(), baud = config.baud_rate, "Opening serial port");
        Ok(Box::new(serial::TtyLine::open(path, config)?))
    }

    fn open_rtc(&self, path: &Path) -> Result<Box<dyn Rtc>> {
        trace!(device = %path.display(), "Opening RTC");
        Ok(Box::new(rtc::RtcDev::open(path)?))
    }

    fn open_pwm(&self, path: &Path) -> Result<Box<dyn Pwm>> {
        trace!(device = %path.display(), "Opening PWM channel");
        Ok(Box::new(pwm::PwmChar::open(path)?))
    }

    fn system_clock(&self) -> Box<dyn SystemClock> {
        Box::new(rtc::HostClock)
    }

    fn filesystem(&self) -> &dyn Filesystem {
        &self.fs
    }
}
