//! GPIO port read-back.
//!
//! The test fixture jumpers the port to a known level pattern; the probe
//! reads the whole data register and compares.

use std::path::PathBuf;

use async_trait::async_trait;

use super::{OrFail, Probe, ProbeFailure};
use crate::config::ProbeDefaults;
use crate::error::{Band, ErrorCode};
use crate::params::{self, ParamError};
use crate::platform::Platform;
use crate::tracing::prelude::*;

pub struct GpioProbe {
    device: PathBuf,
    pattern: u32,
}

impl GpioProbe {
    /// `pattern` accepts C integer prefixes and must fit the 32-bit register.
    pub fn new(
        device: Option<PathBuf>,
        pattern: Option<&str>,
        defaults: &ProbeDefaults,
    ) -> Result<Self, ParamError> {
        let pattern = match pattern {
            Some(arg) => params::in_range("pattern", params::parse_int(arg)?, 0, u32::MAX.into())?
                as u32,
            None => defaults.gpio_pattern,
        };
        Ok(Self {
            device: device.unwrap_or_else(|| defaults.gpio_device.clone()),
            pattern,
        })
    }
}

#[async_trait]
impl Probe for GpioProbe {
    fn name(&self) -> &'static str {
        "gpio"
    }

    fn band(&self) -> Band {
        Band::Gpio
    }

    async fn run(&self, platform: &dyn Platform) -> Result<(), ProbeFailure> {
        let mut port = platform
            .open_gpio(&self.device)
            .or_fail(ErrorCode::FdNoOpen, format_args!("opening {}", self.device.display()))?;
        let value = port
            .read()
            .or_fail(ErrorCode::FdNoRead, format_args!("reading {}", self.device.display()))?;
        debug!(device = %self.device.display(), "GPIO port read 0x{value:x}");

        if value != self.pattern {
            return Err(ProbeFailure::new(
                ErrorCode::GpioBadValue,
                format!("read 0x{value:x}, expected 0x{:x}", self.pattern),
            ));
        }
        Ok(())
    }
}
