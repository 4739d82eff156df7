//! SPI hardware abstraction trait.

use bitflags::bitflags;

use super::Result;

bitflags! {
    /// Channel configuration word understood by the SPI character driver.
    ///
    /// The word-size flags are mutually exclusive.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct SpiControl: u32 {
        const CPHA = 0x01;
        const CPOL = 0x02;
        const EIGHT_BIT = 0x04;
        const TEN_BIT = 0x08;
        const TWELVE_BIT = 0x10;
        const SIXTEEN_BIT = 0x20;
    }
}

/// SPI channel abstraction
pub trait SpiDevice: Send {
    /// Apply a channel configuration (word size, clock mode).
    fn configure(&mut self, control: SpiControl) -> Result<()>;

    /// Full-duplex transfer: clock out `mosi` while filling `miso`.
    ///
    /// Both buffers must be the same length.
    fn transfer(&mut self, mosi: &[u8], miso: &mut [u8]) -> Result<()>;
}

impl<T: SpiDevice + ?Sized> SpiDevice for Box<T> {
    fn configure(&mut self, control: SpiControl) -> Result<()> {
        (**self).configure(control)
    }

    fn transfer(&mut self, mosi: &[u8], miso: &mut [u8]) -> Result<()> {
        (**self).transfer(mosi, miso)
    }
}
