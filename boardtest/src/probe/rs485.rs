//! RS-485 transmit.
//!
//! Switches the UART transceiver into automatic direction control and
//! pushes a burst of bytes onto the bus. Nothing is read back; the far end
//! of the fixture checks what arrives.
//!
//! The direction switch is a GPIO data-register write on `/dev/rtsctl` by
//! default. Boards whose kernel exposes it as a sysfs attribute instead are
//! handled by [`Rs485Control::Attribute`].

use std::path::PathBuf;

use async_trait::async_trait;

use super::ambient::{Attribute, Restore};
use super::{OrFail, Probe, ProbeFailure};
use crate::config::{ProbeDefaults, Rs485Control};
use crate::error::{Band, ErrorCode};
use crate::hw_trait::{self, GpioPort, Parity, SerialConfig};
use crate::platform::Platform;
use crate::tracing::prelude::*;

const BAUD_RATE: u32 = 9600;
const BURST_BYTE: u8 = 0x0F;
const BURST_LEN: usize = 1024;

pub struct Rs485Probe {
    device: PathBuf,
    control: Rs485Control,
    restore_direction: bool,
}

/// Puts the direction mode back when restoration is configured.
enum DirectionGuard<'a> {
    Port(Restore<Box<dyn GpioPort>>),
    Attribute(Restore<Attribute<'a>>),
}

impl DirectionGuard<'_> {
    fn finish(self) -> hw_trait::Result<()> {
        match self {
            DirectionGuard::Port(guard) => guard.finish(),
            DirectionGuard::Attribute(guard) => guard.finish(),
        }
    }
}

impl Rs485Probe {
    pub fn new(device: Option<PathBuf>, defaults: &ProbeDefaults) -> Self {
        Self {
            device: device.unwrap_or_else(|| defaults.rs485_device.clone()),
            control: defaults.rs485_control.clone(),
            restore_direction: defaults.rs485_restore_direction,
        }
    }

    fn enable_direction<'a>(
        &'a self,
        platform: &'a dyn Platform,
    ) -> Result<Option<DirectionGuard<'a>>, ProbeFailure> {
        let failed = |what: &str| format!("{what} {}", self.control.path().display());

        match &self.control {
            Rs485Control::Port { device, value } => {
                let mut port = platform
                    .open_gpio(device)
                    .or_fail(ErrorCode::Rs485Init, failed("opening"))?;
                let saved = if self.restore_direction {
                    Some(port.read().or_fail(ErrorCode::Rs485Init, failed("reading"))?)
                } else {
                    None
                };
                port.write(*value)
                    .or_fail(ErrorCode::Rs485Init, failed(&format!("writing 0x{value:x} to")))?;
                debug!(control = %device.display(), value, "Auto-direction enabled");
                Ok(saved.map(|saved| DirectionGuard::Port(Restore::new(port, saved))))
            }
            Rs485Control::Attribute { path, value } => {
                let fs = platform.filesystem();
                let saved = if self.restore_direction {
                    Some(fs.read_attr(path).or_fail(ErrorCode::Rs485Init, failed("reading"))?)
                } else {
                    None
                };
                let text = format!("0x{value:x}");
                fs.write_attr(path, &text)
                    .or_fail(ErrorCode::Rs485Init, failed(&format!("writing {text} to")))?;
                debug!(control = %path.display(), value = %text, "Auto-direction enabled");
                Ok(saved.map(|saved| {
                    DirectionGuard::Attribute(Restore::new(Attribute { fs, path }, saved))
                }))
            }
        }
    }
}

#[async_trait]
impl Probe for Rs485Probe {
    fn name(&self) -> &'static str {
        "rs485"
    }

    fn band(&self) -> Band {
        Band::Rs485
    }

    async fn run(&self, platform: &dyn Platform) -> Result<(), ProbeFailure> {
        let config = SerialConfig::raw_8n1(BAUD_RATE).with_parity(Parity::Odd);
        let mut line = platform
            .open_serial(&self.device, &config)
            .or_fail(ErrorCode::Rs485Init, format_args!("opening {}", self.device.display()))?;

        let guard = self.enable_direction(platform)?;

        line.clear()
            .or_fail(ErrorCode::Rs485Init, format_args!("flushing {}", self.device.display()))?;
        line.write_all(&[BURST_BYTE; BURST_LEN]).await.or_fail(
            ErrorCode::FdNoWrite,
            format_args!("writing {BURST_LEN} bytes to {}", self.device.display()),
        )?;

        if let Some(guard) = guard {
            guard.finish().or_fail(
                ErrorCode::Rs485Init,
                format_args!("restoring {}", self.control.path().display()),
            )?;
        }
        Ok(())
    }
}
