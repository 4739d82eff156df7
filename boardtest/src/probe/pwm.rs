//! PWM output.

use std::path::PathBuf;

use async_trait::async_trait;

use super::{OrFail, Probe, ProbeFailure};
use crate::config::ProbeDefaults;
use crate::error::{Band, ErrorCode};
use crate::platform::Platform;

/// Opens the PWM channel and writes one pulse width. The output itself is
/// checked by the operator or the fixture.
pub struct PwmProbe {
    device: PathBuf,
    width_us: u32,
}

impl PwmProbe {
    pub fn new(device: Option<PathBuf>, defaults: &ProbeDefaults) -> Self {
        Self {
            device: device.unwrap_or_else(|| defaults.pwm_device.clone()),
            width_us: defaults.pwm_width_us,
        }
    }
}

#[async_trait]
impl Probe for PwmProbe {
    fn name(&self) -> &'static str {
        "pwm"
    }

    fn band(&self) -> Band {
        Band::Pwm
    }

    async fn run(&self, platform: &dyn Platform) -> Result<(), ProbeFailure> {
        let mut pwm = platform
            .open_pwm(&self.device)
            .or_fail(ErrorCode::FdNoOpen, format_args!("opening {}", self.device.display()))?;
        pwm.write_width_us(self.width_us).or_fail(
            ErrorCode::PwmNoWidthWrite,
            format_args!("writing {} us width", self.width_us),
        )
    }
}
