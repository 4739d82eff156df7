//! I2C hardware abstraction trait.

use super::Result;

/// I2C-specific errors
#[derive(Debug, thiserror::Error)]
pub enum I2cError {
    /// No acknowledgment from device
    #[error("No acknowledgment from device at address 0x{0:02x}")]
    NoAck(u8),

    /// Bus arbitration lost
    #[error("Bus arbitration lost")]
    ArbitrationLost,

    /// A transfer was attempted before any slave address was set
    #[error("No slave address selected")]
    NoAddress,

    /// Any other failure reported by the adapter driver
    #[error("I2C transfer with 0x{addr:02x} failed: {source}")]
    Os {
        addr: u8,
        #[source]
        source: std::io::Error,
    },
}

impl I2cError {
    /// Classify an errno returned by the i2c-dev driver.
    pub fn from_os(addr: u8, source: std::io::Error) -> Self {
        match source.raw_os_error() {
            Some(libc::ENXIO) | Some(libc::EREMOTEIO) => I2cError::NoAck(addr),
            Some(libc::EAGAIN) => I2cError::ArbitrationLost,
            _ => I2cError::Os { addr, source },
        }
    }
}

/// I2C bus abstraction.
///
/// The slave address is a separate, sticky step: once set, every following
/// single-byte transfer goes to that address.
pub trait I2cBus: Send {
    /// Select the 7-bit slave address used by subsequent transfers.
    fn set_slave(&mut self, addr: u8) -> Result<()>;

    /// Write one byte (typically a register pointer).
    fn write_byte(&mut self, byte: u8) -> Result<()>;

    /// Read one byte.
    fn read_byte(&mut self) -> Result<u8>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_errno_classification() {
        let err = I2cError::from_os(0x48, std::io::Error::from_raw_os_error(libc::ENXIO));
        assert!(matches!(err, I2cError::NoAck(0x48)));

        let err = I2cError::from_os(0x48, std::io::Error::from_raw_os_error(libc::EAGAIN));
        assert!(matches!(err, I2cError::ArbitrationLost));

        let err = I2cError::from_os(0x48, std::io::Error::from_raw_os_error(libc::EIO));
        assert!(matches!(err, I2cError::Os { addr: 0x48, .. }));
    }
}
