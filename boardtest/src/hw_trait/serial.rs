//! Serial UART abstraction trait.

use async_trait::async_trait;
use std::time::Duration;

use super::Result;

/// Parity setting
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Parity {
    None,
    Odd,
    Even,
}

/// Number of stop bits
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopBits {
    One,
    Two,
}

/// How the line handles modem control signals
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlowControl {
    /// Ignore modem control lines (CLOCAL)
    Local,
    /// RTS/CTS hardware handshake
    Hardware,
}

/// Line discipline applied when a port is opened.
///
/// Ports are always put in raw mode with eight data bits.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SerialConfig {
    pub baud_rate: u32,
    pub parity: Parity,
    pub stop_bits: StopBits,
    pub flow_control: FlowControl,
}

impl SerialConfig {
    /// Raw 8-N-1 with local mode at the given speed.
    pub fn raw_8n1(baud_rate: u32) -> Self {
        Self {
            baud_rate,
            parity: Parity::None,
            stop_bits: StopBits::One,
            flow_control: FlowControl::Local,
        }
    }

    pub fn with_parity(mut self, parity: Parity) -> Self {
        self.parity = parity;
        self
    }

    pub fn with_flow_control(mut self, flow_control: FlowControl) -> Self {
        self.flow_control = flow_control;
        self
    }
}

/// Result of waiting for inbound data.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Readiness {
    /// Data is waiting to be read
    Ready,
    /// The ceiling elapsed with nothing received
    Idle,
}

/// An open, configured serial line.
#[async_trait]
pub trait SerialLine: Send {
    /// Discard input received but not yet read and output not yet sent.
    fn clear(&mut self) -> Result<()>;

    /// Write all of `data`.
    async fn write_all(&mut self, data: &[u8]) -> Result<()>;

    /// Block until inbound data is available or `ceiling` elapses.
    ///
    /// Errors are reported separately from the "nothing arrived" case.
    async fn wait_readable(&mut self, ceiling: Duration) -> Result<Readiness>;

    /// Fill `buf` completely.
    async fn read_exact(&mut self, buf: &mut [u8]) -> Result<()>;
}
