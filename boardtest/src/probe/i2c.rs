//! I2C register read-back.
//!
//! Selects a slave, writes a register pointer, reads one or two bytes (most
//! significant first) and compares with the expected value. All arguments
//! are hexadecimal. The length of the expected value as typed decides how
//! many bytes are read.

use std::path::PathBuf;

use async_trait::async_trait;

use super::{OrFail, Probe, ProbeFailure};
use crate::error::{Band, ErrorCode};
use crate::params::{self, ExpectedRegister, ParamError};
use crate::platform::Platform;
use crate::tracing::prelude::*;

/// Highest 7-bit address
const MAX_ADDRESS: u64 = 0x7F;

pub struct I2cReadProbe {
    bus: PathBuf,
    address: u8,
    register: u8,
    expected: ExpectedRegister,
}

impl I2cReadProbe {
    /// Parse the operator's arguments; nothing is opened here.
    pub fn new(
        bus: impl Into<PathBuf>,
        address: &str,
        register: &str,
        expected: &str,
    ) -> Result<Self, ParamError> {
        let address = params::in_range("address", params::parse_hex(address)?, 0, MAX_ADDRESS)?;
        let register = params::in_range("register", params::parse_hex(register)?, 0, 0xFF)?;
        Ok(Self {
            bus: bus.into(),
            address: address as u8,
            register: register as u8,
            expected: expected.parse()?,
        })
    }
}

#[async_trait]
impl Probe for I2cReadProbe {
    fn name(&self) -> &'static str {
        "i2c-read"
    }

    fn band(&self) -> Band {
        Band::I2c
    }

    async fn run(&self, platform: &dyn Platform) -> Result<(), ProbeFailure> {
        let mut bus = platform
            .open_i2c(&self.bus)
            .or_fail(ErrorCode::FdNoOpen, format_args!("opening {}", self.bus.display()))?;

        bus.set_slave(self.address).or_fail(
            ErrorCode::I2cNoDevice,
            format_args!("selecting address 0x{:02x}", self.address),
        )?;
        bus.write_byte(self.register).or_fail(
            ErrorCode::I2cNoWrite,
            format_args!("requesting register 0x{:02x}", self.register),
        )?;

        let mut value: u16 = 0;
        for _ in 0..self.expected.width.bytes() {
            let byte = bus.read_byte().or_fail(
                ErrorCode::I2cNoRead,
                format_args!("reading register 0x{:02x}", self.register),
            )?;
            value = (value << 8) | u16::from(byte);
        }
        debug!(
            address = self.address,
            register = self.register,
            "I2C register read 0x{value:x}"
        );

        if value != self.expected.value {
            return Err(ProbeFailure::new(
                ErrorCode::I2cMismatch,
                format!(
                    "register 0x{:02x} of 0x{:02x} is 0x{value:x}, expected 0x{:x}",
                    self.register, self.address, self.expected.value
                ),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{assert_in_band, FakePlatform};

    fn platform_with_device() -> FakePlatform {
        let platform = FakePlatform::new();
        {
            let mut i2c = platform.i2c.lock().unwrap();
            i2c.present = Some(0x48);
            i2c.registers.insert(0x01, vec![0x12, 0x34]);
        }
        platform
    }

    async fn run(platform: &FakePlatform, addr: &str, reg: &str, expected: &str) -> ErrorCode {
        let probe = I2cReadProbe::new("/dev/i2c-0", addr, reg, expected).unwrap();
        match probe.run(platform).await {
            Ok(()) => ErrorCode::Success,
            Err(failure) => {
                assert_in_band(probe.band(), failure.code);
                failure.code
            }
        }
    }

    #[test]
    fn test_arguments_are_validated_up_front() {
        assert!(I2cReadProbe::new("/dev/i2c-0", "48", "01", "12").is_ok());
        assert!(matches!(
            I2cReadProbe::new("/dev/i2c-0", "80", "01", "12"),
            Err(ParamError::OutOfRange { .. })
        ));
        assert!(matches!(
            I2cReadProbe::new("/dev/i2c-0", "48", "100", "12"),
            Err(ParamError::OutOfRange { .. })
        ));
        assert!(matches!(
            I2cReadProbe::new("/dev/i2c-0", "48", "01", "123"),
            Err(ParamError::BadWidth(_))
        ));
    }

    #[tokio::test]
    async fn test_one_and_two_byte_reads() {
        let platform = platform_with_device();
        assert_eq!(run(&platform, "0x48", "01", "12").await, ErrorCode::Success);
        assert_eq!(run(&platform, "48", "1", "1234").await, ErrorCode::Success);
        assert_eq!(run(&platform, "48", "01", "1235").await, ErrorCode::I2cMismatch);
        // Four characters with the prefix still read a word: 0x1234 != 0x12.
        assert_eq!(run(&platform, "48", "01", "0x12").await, ErrorCode::I2cMismatch);
        assert!(platform.handles.balanced());
    }

    #[tokio::test]
    async fn test_failure_codes_per_step() {
        let platform = FakePlatform::new().missing("/dev/i2c-0");
        assert_eq!(run(&platform, "48", "01", "12").await, ErrorCode::FdNoOpen);

        let platform = platform_with_device();
        assert_eq!(run(&platform, "49", "01", "12").await, ErrorCode::I2cNoDevice);

        platform.i2c.lock().unwrap().fail_pointer_write = true;
        assert_eq!(run(&platform, "48", "01", "12").await, ErrorCode::I2cNoWrite);

        let platform = platform_with_device();
        platform.i2c.lock().unwrap().fail_read = true;
        assert_eq!(run(&platform, "48", "01", "12").await, ErrorCode::I2cNoRead);
        assert!(platform.handles.balanced());
    }
}
