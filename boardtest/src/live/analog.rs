//! Continuous A/D readout.
//!
//! The fixture wires a potentiometer to each input; the operator turns them
//! and watches the readings follow.

use std::path::PathBuf;
use std::time::Duration;

use super::render::{self, Screen};
use super::{LiveSession, Sampler};
use crate::config::{ProbeDefaults, ProbeTiming};
use crate::error::{Band, ErrorCode};
use crate::hw_trait::{Adc, AdcChannel};
use crate::params::{self, ParamError};
use crate::peripheral::{mcp3208, IndexedAtod, Mcp3208};
use crate::platform::Platform;
use crate::probe::{OrFail, ProbeFailure};
use crate::tracing::prelude::*;

const PROMPT: &str = "Turn the pots and watch each channel's reading\n\
                      press any key to return to the menu";

/// Largest channel count of the indexed A/D mux.
const INDEXED_MAX_CHANNELS: u8 = 32;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Converter {
    /// On-chip converter behind the indexed GPIO driver
    IndexedAtod,
    /// MCP3208 on an SPI channel
    Mcp3208,
}

impl Converter {
    fn column(self) -> &'static str {
        match self {
            Converter::IndexedAtod => "V",
            Converter::Mcp3208 => "P",
        }
    }
}

pub struct AnalogSession {
    converter: Converter,
    device: PathBuf,
    channels: u8,
    interval: Duration,
}

fn channel_count(arg: Option<&str>, default: u8, max: u8) -> Result<u8, ParamError> {
    match arg {
        Some(arg) => {
            let count = params::parse_int(arg)?;
            Ok(params::in_range("channel count", count, 1, max.into())? as u8)
        }
        None => Ok(default),
    }
}

impl AnalogSession {
    pub fn indexed_atod(
        device: Option<PathBuf>,
        channels: Option<&str>,
        defaults: &ProbeDefaults,
        timing: &ProbeTiming,
    ) -> Result<Self, ParamError> {
        Ok(Self {
            converter: Converter::IndexedAtod,
            device: device.unwrap_or_else(|| defaults.atod_device.clone()),
            channels: channel_count(channels, defaults.atod_channels, INDEXED_MAX_CHANNELS)?,
            interval: timing.analog_interval,
        })
    }

    pub fn mcp3208(
        device: Option<PathBuf>,
        channels: Option<&str>,
        defaults: &ProbeDefaults,
        timing: &ProbeTiming,
    ) -> Result<Self, ParamError> {
        Ok(Self {
            converter: Converter::Mcp3208,
            device: device.unwrap_or_else(|| defaults.mcp3208_device.clone()),
            channels: channel_count(channels, defaults.mcp3208_channels, mcp3208::CHANNELS)?,
            interval: timing.analog_interval,
        })
    }

    fn open(&self, platform: &dyn Platform) -> Result<Box<dyn Adc>, ProbeFailure> {
        let opening = format!("opening {}", self.device.display());
        Ok(match self.converter {
            Converter::IndexedAtod => {
                let port = platform
                    .open_gpio(&self.device)
                    .or_fail(ErrorCode::FdNoOpen, opening)?;
                Box::new(IndexedAtod::new(port))
            }
            Converter::Mcp3208 => {
                let spi = platform
                    .open_spi(&self.device)
                    .or_fail(ErrorCode::FdNoOpen, opening)?;
                let adc = Mcp3208::new(spi).or_fail(
                    ErrorCode::SpiFail,
                    format_args!("configuring {}", self.device.display()),
                )?;
                Box::new(adc)
            }
        })
    }
}

struct AnalogSampler {
    adc: Box<dyn Adc>,
    converter: Converter,
    channels: u8,
}

impl Sampler for AnalogSampler {
    fn screen(&self) -> Screen {
        Screen::new(PROMPT).with_columns(self.converter.column(), self.channels)
    }

    fn sample(&mut self) -> Result<String, ProbeFailure> {
        let values: Vec<_> = (0..self.channels)
            .map(|channel| match self.adc.read_raw(AdcChannel(channel)) {
                Ok(value) => Some(u32::from(value)),
                Err(e) => {
                    trace!(channel, error = %e, "A/D read failed");
                    None
                }
            })
            .collect();
        Ok(render::row(&values))
    }
}

impl LiveSession for AnalogSession {
    fn name(&self) -> &'static str {
        match self.converter {
            Converter::IndexedAtod => "analog-gpio",
            Converter::Mcp3208 => "analog-mcp3208",
        }
    }

    fn band(&self) -> Band {
        Band::Analog
    }

    fn interval(&self) -> Duration {
        self.interval
    }

    fn start(&self, platform: &dyn Platform) -> Result<Box<dyn Sampler>, ProbeFailure> {
        let adc = self.open(platform)?;
        debug!(
            device = %self.device.display(),
            channels = self.channels,
            "A/D converter open"
        );
        Ok(Box::new(AnalogSampler {
            adc,
            converter: self.converter,
            channels: self.channels,
        }))
    }
}
