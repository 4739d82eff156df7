//! Hardware abstraction layer traits.
//!
//! This module defines the transaction primitives (GPIO, I2C, SPI, serial,
//! RTC, PWM, system clock, filesystem) that probes are built from. Each
//! primitive performs exactly one OS transaction against an already-open
//! handle. Primitives never retry and never open or close handles; both are
//! the probe's job.
//!
//! Implementations live in [`crate::linux`] for real boards. Tests supply
//! their own.

pub mod adc;
pub mod clock;
pub mod fs;
pub mod gpio;
pub mod i2c;
pub mod pwm;
pub mod rtc;
pub mod serial;
pub mod spi;

// Re-export traits
pub use adc::{Adc, AdcChannel};
pub use clock::SystemClock;
pub use fs::{Filesystem, FsStats, PathKind, ScratchFile};
pub use gpio::GpioPort;
pub use i2c::{I2cBus, I2cError};
pub use pwm::Pwm;
pub use rtc::Rtc;
pub use serial::{FlowControl, Parity, Readiness, SerialConfig, SerialLine, StopBits};
pub use spi::{SpiControl, SpiDevice};

/// Common error type for hardware operations
#[derive(Debug, thiserror::Error)]
pub enum HwError {
    /// I/O error from the underlying device; carries the OS errno
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// I2C bus error
    #[error(transparent)]
    I2c(#[from] I2cError),

    /// Invalid parameter or argument
    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    /// Other hardware-specific error
    #[error("Hardware error: {0}")]
    Other(String),
}

impl HwError {
    /// The raw OS error code behind this failure, when there is one.
    pub fn raw_os_error(&self) -> Option<i32> {
        match self {
            HwError::Io(e) => e.raw_os_error(),
            HwError::I2c(I2cError::Os { source, .. }) => source.raw_os_error(),
            _ => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, HwError>;
