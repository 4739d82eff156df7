//! On-chip A/D converter behind the indexed GPIO driver.
//!
//! Writing a channel number to the index register selects the mux input;
//! the data register then holds that channel's last conversion.

use crate::hw_trait::{Adc, AdcChannel, GpioPort, HwError, Result};

pub struct IndexedAtod<G: GpioPort> {
    port: G,
}

impl<G: GpioPort> IndexedAtod<G> {
    pub fn new(port: G) -> Self {
        Self { port }
    }
}

impl<G: GpioPort> Adc for IndexedAtod<G> {
    fn read_raw(&mut self, channel: AdcChannel) -> Result<u16> {
        let raw = self.port.read_index(channel.0.into())?;
        u16::try_from(raw)
            .map_err(|_| HwError::Other(format!("A/D channel {} read 0x{raw:x}", channel.0)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Default)]
    struct MuxedPort {
        index: u32,
        ops: Vec<&'static str>,
    }

    impl GpioPort for MuxedPort {
        fn read(&mut self) -> Result<u32> {
            self.ops.push("read");
            Ok(100 + self.index)
        }

        fn write(&mut self, _value: u32) -> Result<()> {
            unreachable!()
        }

        fn select_index(&mut self, index: u32) -> Result<()> {
            self.ops.push("index");
            self.index = index;
            Ok(())
        }

        fn lock(&mut self) -> Result<()> {
            Ok(())
        }

        fn unlock(&mut self) -> Result<()> {
            Ok(())
        }
    }

    #[test]
    fn test_selects_then_reads() {
        let mut adc = IndexedAtod::new(MuxedPort::default());
        assert_eq!(adc.read_raw(AdcChannel(2)).unwrap(), 102);
        assert_eq!(adc.port.ops, ["index", "read"]);
    }
}
