//! Device acquisition.
//!
//! Probes never touch the OS directly. They ask a [`Platform`] to open the
//! handles they need and to hand out the ambient resources (system clock,
//! filesystem) they observe. [`crate::linux::LinuxPlatform`] backs this with
//! character devices; tests back it with fakes.
//!
//! Every `open_*` call returns an owned handle. The handle is closed when it
//! is dropped, so a probe that returns, on any path, has released everything
//! it opened.

use std::path::Path;

use crate::hw_trait::{
    Filesystem, GpioPort, I2cBus, Pwm, Result, Rtc, SerialConfig, SerialLine, SpiDevice,
    SystemClock,
};

pub trait Platform: Send + Sync {
    /// Open a GPIO character device read/write.
    fn open_gpio(&self, path: &Path) -> Result<Box<dyn GpioPort>>;

    /// Open an i2c-dev bus device.
    fn open_i2c(&self, path: &Path) -> Result<Box<dyn I2cBus>>;

    /// Open an SPI character device. The channel is not configured yet.
    fn open_spi(&self, path: &Path) -> Result<Box<dyn SpiDevice>>;

    /// Open a tty and apply `config` before returning.
    fn open_serial(&self, path: &Path, config: &SerialConfig) -> Result<Box<dyn SerialLine>>;

    /// Open an RTC device.
    fn open_rtc(&self, path: &Path) -> Result<Box<dyn Rtc>>;

    /// Open a PWM channel write-only.
    fn open_pwm(&self, path: &Path) -> Result<Box<dyn Pwm>>;

    /// Handle on the host wall clock.
    fn system_clock(&self) -> Box<dyn SystemClock>;

    /// The host filesystem.
    fn filesystem(&self) -> &dyn Filesystem;
}
