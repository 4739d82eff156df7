//! tty serial line backed by `tokio-serial`.
//!
//! Readiness is detected by reading: [`SerialLine::wait_readable`] pulls
//! whatever has arrived into a pending buffer, and the next
//! [`SerialLine::read_exact`] drains that buffer before touching the port.

use std::io;
use std::path::Path;
use std::time::Duration;

use async_trait::async_trait;
use bytes::{Buf, BytesMut};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio_serial::{ClearBuffer, SerialPort, SerialPortBuilderExt, SerialStream};

use crate::hw_trait::{
    FlowControl, HwError, Parity, Readiness, Result, SerialConfig, SerialLine, StopBits,
};
use crate::tracing::prelude::*;

const READ_CHUNK: usize = 256;

fn parity(parity: Parity) -> tokio_serial::Parity {
    match parity {
        Parity::None => tokio_serial::Parity::None,
        Parity::Odd => tokio_serial::Parity::Odd,
        Parity::Even => tokio_serial::Parity::Even,
    }
}

fn stop_bits(stop_bits: StopBits) -> tokio_serial::StopBits {
    match stop_bits {
        StopBits::One => tokio_serial::StopBits::One,
        StopBits::Two => tokio_serial::StopBits::Two,
    }
}

fn flow_control(flow: FlowControl) -> tokio_serial::FlowControl {
    match flow {
        FlowControl::Local => tokio_serial::FlowControl::None,
        FlowControl::Hardware => tokio_serial::FlowControl::Hardware,
    }
}

/// An open, configured tty.
pub struct TtyLine {
    stream: SerialStream,
    pending: BytesMut,
}

impl std::fmt::Debug for TtyLine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TtyLine")
            .field("pending", &self.pending.len())
            .finish_non_exhaustive()
    }
}

impl TtyLine {
    /// Open `path` in raw mode with eight data bits and `config` applied.
    ///
    /// Must be called from within a tokio runtime.
    pub fn open(path: &Path, config: &SerialConfig) -> Result<Self> {
        let stream = tokio_serial::new(path.to_string_lossy(), config.baud_rate)
            .data_bits(tokio_serial::DataBits::Eight)
            .parity(parity(config.parity))
            .stop_bits(stop_bits(config.stop_bits))
            .flow_control(flow_control(config.flow_control))
            .open_native_async()
            .map_err(io::Error::from)?;

        Ok(Self {
            stream,
            pending: BytesMut::with_capacity(READ_CHUNK),
        })
    }
}

#[async_trait]
impl SerialLine for TtyLine {
    fn clear(&mut self) -> Result<()> {
        self.pending.clear();
        self.stream
            .clear(ClearBuffer::All)
            .map_err(io::Error::from)?;
        Ok(())
    }

    async fn write_all(&mut self, data: &[u8]) -> Result<()> {
        self.stream.write_all(data).await?;
        self.stream.flush().await?;
        Ok(())
    }

    async fn wait_readable(&mut self, ceiling: Duration) -> Result<Readiness> {
        if !self.pending.is_empty() {
            return Ok(Readiness::Ready);
        }

        self.pending.reserve(READ_CHUNK);
        match tokio::time::timeout(ceiling, self.stream.read_buf(&mut self.pending)).await {
            Err(_) => Ok(Readiness::Idle),
            Ok(Ok(0)) => Err(HwError::Io(io::ErrorKind::UnexpectedEof.into())),
            Ok(Ok(n)) => {
                trace!(bytes = n, "Serial data ready");
                Ok(Readiness::Ready)
            }
            Ok(Err(e)) => Err(e.into()),
        }
    }

    async fn read_exact(&mut self, buf: &mut [u8]) -> Result<()> {
        let buffered = self.pending.len().min(buf.len());
        buf[..buffered].copy_from_slice(&self.pending[..buffered]);
        self.pending.advance(buffered);

        if buffered < buf.len() {
            self.stream.read_exact(&mut buf[buffered..]).await?;
        }
        Ok(())
    }
}
