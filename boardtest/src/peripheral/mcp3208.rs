//! MCP3208 8-channel, 12-bit SPI A/D converter driver.
//!
//! A conversion is one 3-byte full-duplex transfer. The outgoing frame
//! carries the start bit, the single-ended flag and the channel address:
//!
//! ```text
//! byte 0: 0 0 0 0 0 START SGL D2
//! byte 1: D1 D0 x x x x x x
//! byte 2: x x x x x x x x
//! ```
//!
//! The result is clocked back in the low nibble of byte 1 (bits 11..8) and
//! all of byte 2 (bits 7..0).

use crate::hw_trait::{Adc, AdcChannel, HwError, Result, SpiControl, SpiDevice};
use crate::tracing::prelude::*;

/// Number of single-ended inputs
pub const CHANNELS: u8 = 8;

const START: u8 = 0x04;
const SINGLE_ENDED: u8 = 0x02;

/// Outgoing frame that requests a single-ended conversion of `channel`.
pub fn frame(channel: u8) -> [u8; 3] {
    [((channel >> 2) & 1) | START | SINGLE_ENDED, channel << 6, 0]
}

/// Extract the 12-bit result from a response frame.
pub fn decode(miso: &[u8; 3]) -> u16 {
    (u16::from(miso[1] & 0x0F) << 8) | u16::from(miso[2])
}

/// MCP3208 driver
pub struct Mcp3208<S: SpiDevice> {
    spi: S,
}

impl<S: SpiDevice> Mcp3208<S> {
    /// Configure the channel for 8-bit words, SPI mode 0.
    pub fn new(mut spi: S) -> Result<Self> {
        spi.configure(SpiControl::EIGHT_BIT)?;
        debug!("MCP3208 channel configured");
        Ok(Self { spi })
    }
}

impl<S: SpiDevice> Adc for Mcp3208<S> {
    fn read_raw(&mut self, channel: AdcChannel) -> Result<u16> {
        if channel.0 >= CHANNELS {
            return Err(HwError::InvalidParameter(format!(
                "MCP3208 has no channel {}",
                channel.0
            )));
        }

        let mosi = frame(channel.0);
        let mut miso = [0u8; 3];
        self.spi.transfer(&mosi, &mut miso)?;
        let value = decode(&miso);
        trace!(channel = channel.0, value, "MCP3208 conversion");
        Ok(value)
    }
}
