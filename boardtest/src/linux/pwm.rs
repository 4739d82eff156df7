//! PWM channel character device.

use std::fs::File;
use std::io;
use std::os::fd::AsRawFd;
use std::path::Path;

use super::{iow, open_wo, IoctlRequest};
use crate::hw_trait::{Pwm, Result};

const WIDTHUSWRITE: IoctlRequest = iow::<u8>(0xA0, 1);

/// A PWM channel opened write-only.
#[derive(Debug)]
pub struct PwmChar {
    file: File,
}

impl PwmChar {
    pub fn open(path: &Path) -> io::Result<Self> {
        Ok(Self {
            file: open_wo(path)?,
        })
    }
}

impl Pwm for PwmChar {
    fn write_width_us(&mut self, width_us: u32) -> Result<()> {
        let mut width = width_us;
        syscall!(ioctl(
            self.file.as_raw_fd(),
            WIDTHUSWRITE as _,
            &mut width as *mut u32
        ))?;
        Ok(())
    }
}
