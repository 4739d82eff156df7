//! UART loopback.
//!
//! Port A's TX is wired to port B's RX and vice versa (or a single port has
//! a loopback plug, in which case A and B are the same). A fixed message is
//! sent A→B and, when the ports differ, B→A.

use std::path::{Path, PathBuf};

use async_trait::async_trait;

use super::{OrFail, Probe, ProbeFailure};
use crate::config::ProbeTiming;
use crate::error::{Band, ErrorCode};
use crate::hw_trait::{Readiness, SerialConfig, SerialLine};
use crate::platform::Platform;
use crate::tracing::prelude::*;

/// Sent in each direction, terminating NUL included.
pub const MESSAGE: &[u8; 32] = b"hello serial port how are you??\0";

const BAUD_RATE: u32 = 115_200;

pub struct SerialProbe {
    port_a: PathBuf,
    port_b: PathBuf,
    timing: ProbeTiming,
}

impl SerialProbe {
    /// `port_b` defaults to `port_a` (loopback plug).
    pub fn new(port_a: impl Into<PathBuf>, port_b: Option<PathBuf>, timing: ProbeTiming) -> Self {
        let port_a = port_a.into();
        Self {
            port_b: port_b.unwrap_or_else(|| port_a.clone()),
            port_a,
            timing,
        }
    }

    fn cross_wired(&self) -> bool {
        self.port_a != self.port_b
    }

    fn open(
        &self,
        platform: &dyn Platform,
        path: &Path,
        config: &SerialConfig,
    ) -> Result<Box<dyn SerialLine>, ProbeFailure> {
        let mut line = platform
            .open_serial(path, config)
            .or_fail(ErrorCode::FdNoOpen, format_args!("opening {}", path.display()))?;
        // Bytes left in the FIFO by an earlier run would be read as the reply.
        line.clear()
            .or_fail(ErrorCode::FdNoOpen, format_args!("flushing {}", path.display()))?;
        Ok(line)
    }

    async fn send(&self, tx: &mut dyn SerialLine, from: &Path) -> Result<(), ProbeFailure> {
        tx.write_all(MESSAGE)
            .await
            .or_fail(ErrorCode::SerialWrite, format_args!("writing {}", from.display()))
    }

    async fn receive(&self, rx: &mut dyn SerialLine, at: &Path) -> Result<(), ProbeFailure> {
        let ready = rx
            .wait_readable(self.timing.serial_ready_ceiling)
            .await
            .or_fail(ErrorCode::SerialPoll, format_args!("polling {}", at.display()))?;
        if ready == Readiness::Idle {
            return Err(ProbeFailure::new(
                ErrorCode::SerialPoll,
                format!(
                    "nothing received on {} within {:?}",
                    at.display(),
                    self.timing.serial_ready_ceiling
                ),
            ));
        }

        // Let the rest of the message arrive.
        tokio::time::sleep(self.timing.serial_settle).await;

        let mut buf = [0u8; MESSAGE.len()];
        match tokio::time::timeout(self.timing.serial_read_timeout, rx.read_exact(&mut buf)).await
        {
            Ok(result) => {
                result.or_fail(ErrorCode::SerialRead, format_args!("reading {}", at.display()))?
            }
            Err(_) => {
                return Err(ProbeFailure::new(
                    ErrorCode::SerialRead,
                    format!("short read on {}", at.display()),
                ))
            }
        }

        if &buf != MESSAGE {
            return Err(ProbeFailure::new(
                ErrorCode::BufCmpFail,
                format!(
                    "{} received {:?}",
                    at.display(),
                    String::from_utf8_lossy(&buf)
                ),
            ));
        }
        trace!(port = %at.display(), "Message received intact");
        Ok(())
    }
}

#[async_trait]
impl Probe for SerialProbe {
    fn name(&self) -> &'static str {
        "serial"
    }

    fn band(&self) -> Band {
        Band::Serial
    }

    async fn run(&self, platform: &dyn Platform) -> Result<(), ProbeFailure> {
        let config = SerialConfig::raw_8n1(BAUD_RATE);

        let mut b = if self.cross_wired() {
            Some(self.open(platform, &self.port_b, &config)?)
        } else {
            None
        };
        let mut a = self.open(platform, &self.port_a, &config)?;

        self.send(a.as_mut(), &self.port_a).await?;
        match b.as_mut() {
            Some(b) => {
                self.receive(b.as_mut(), &self.port_b).await?;
                debug!("First direction passed");

                self.send(b.as_mut(), &self.port_b).await?;
                self.receive(a.as_mut(), &self.port_a).await?;
            }
            None => self.receive(a.as_mut(), &self.port_a).await?,
        }
        Ok(())
    }
}
