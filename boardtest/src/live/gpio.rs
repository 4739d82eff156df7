//! GPIO line sessions.
//!
//! The GPO session walks a single set bit from the least significant output
//! to the most significant one and wraps, so the operator can watch each
//! LED light in turn. The GPI session shows the input register while the
//! operator toggles switches.

use std::path::PathBuf;
use std::time::Duration;

use super::render::Screen;
use super::{LiveSession, Sampler};
use crate::config::ProbeTiming;
use crate::error::{Band, ErrorCode};
use crate::hw_trait::GpioPort;
use crate::params::{self, ParamError};
use crate::platform::Platform;
use crate::probe::{OrFail, ProbeFailure};
use crate::tracing::prelude::*;

const MAX_BITS: u8 = 32;

pub struct GpoSession {
    device: PathBuf,
    bits: u8,
    interval: Duration,
}

impl GpoSession {
    /// `bits` is the port width, 1 to 32.
    pub fn new(
        device: impl Into<PathBuf>,
        bits: &str,
        timing: &ProbeTiming,
    ) -> Result<Self, ParamError> {
        let bits = params::in_range("bit width", params::parse_int(bits)?, 1, MAX_BITS.into())?;
        Ok(Self {
            device: device.into(),
            bits: bits as u8,
            interval: timing.gpo_interval,
        })
    }
}

struct WalkingBit {
    port: Box<dyn GpioPort>,
    bits: u8,
    next: u8,
}

impl Sampler for WalkingBit {
    fn screen(&self) -> Screen {
        Screen::new("Watch each output turn on in order\npress any key when done")
    }

    fn sample(&mut self) -> Result<String, ProbeFailure> {
        let bit = self.next;
        let value = 1u32 << bit;
        self.port
            .write(value)
            .or_fail(ErrorCode::GpioNoWrite, format_args!("writing 0x{value:x}"))?;
        self.next = (bit + 1) % self.bits;
        Ok(format!("bit {bit:>2}  0x{value:08x}"))
    }
}

impl LiveSession for GpoSession {
    fn name(&self) -> &'static str {
        "gpo"
    }

    fn band(&self) -> Band {
        Band::Gpio
    }

    fn interval(&self) -> Duration {
        self.interval
    }

    fn start(&self, platform: &dyn Platform) -> Result<Box<dyn Sampler>, ProbeFailure> {
        let port = platform
            .open_gpio(&self.device)
            .or_fail(ErrorCode::FdNoOpen, format_args!("opening {}", self.device.display()))?;
        debug!(device = %self.device.display(), bits = self.bits, "Walking outputs");
        Ok(Box::new(WalkingBit {
            port,
            bits: self.bits,
            next: 0,
        }))
    }
}

pub struct GpiSession {
    device: PathBuf,
    interval: Duration,
}

impl GpiSession {
    pub fn new(device: impl Into<PathBuf>, timing: &ProbeTiming) -> Self {
        Self {
            device: device.into(),
            interval: timing.gpi_interval,
        }
    }
}

struct InputMonitor {
    port: Box<dyn GpioPort>,
}

impl Sampler for InputMonitor {
    fn screen(&self) -> Screen {
        Screen::new("press any key to return to the menu")
    }

    fn sample(&mut self) -> Result<String, ProbeFailure> {
        Ok(match self.port.read() {
            Ok(value) => format!("{value:>4}  0x{value:08x}"),
            Err(e) => {
                trace!(error = %e, "GPI read failed");
                format!("{:>4}  {:10}", "--", "")
            }
        })
    }
}

impl LiveSession for GpiSession {
    fn name(&self) -> &'static str {
        "gpi"
    }

    fn band(&self) -> Band {
        Band::Gpio
    }

    fn interval(&self) -> Duration {
        self.interval
    }

    fn start(&self, platform: &dyn Platform) -> Result<Box<dyn Sampler>, ProbeFailure> {
        let mut port = platform
            .open_gpio(&self.device)
            .or_fail(ErrorCode::FdNoOpen, format_args!("opening {}", self.device.display()))?;
        let value = port
            .read()
            .or_fail(ErrorCode::GpioNoRead, format_args!("reading {}", self.device.display()))?;
        debug!(device = %self.device.display(), "GPI initial value 0x{value:x}");
        Ok(Box::new(InputMonitor { port }))
    }
}
