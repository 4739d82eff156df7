//! ADC hardware abstraction trait.

use super::Result;

/// ADC channel identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AdcChannel(pub u8);

/// ADC abstraction for reading analog values
pub trait Adc: Send {
    /// Read the raw conversion result of a channel.
    fn read_raw(&mut self, channel: AdcChannel) -> Result<u16>;
}
