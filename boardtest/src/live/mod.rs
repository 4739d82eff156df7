//! Operator-driven live sessions.
//!
//! Unlike a [`Probe`](crate::probe::Probe), a live session has no verdict of
//! its own. It opens a device, then samples it on a fixed interval and shows
//! the result until the operator stops it, who decides pass or fail by
//! looking at the board. The session still ends in an [`ErrorCode`]: success
//! when stopped, or the failure that ended it early.
//!
//! Sampling is driven by [`ticks`], an infinite stream that yields
//! immediately and then once per interval, and ends when its
//! [`CancellationToken`] is cancelled.

pub mod analog;
pub mod gpio;
pub mod render;

use std::io::Write;
use std::pin::pin;
use std::time::Duration;

use futures::stream::{self, Stream};
use tokio_stream::StreamExt;
use tokio_util::sync::CancellationToken;

use crate::error::{Band, ErrorCode};
use crate::platform::Platform;
use crate::probe::{self, OrFail, ProbeFailure, ProbeReport};
use crate::tracing::prelude::*;

pub use analog::AnalogSession;
pub use gpio::{GpiSession, GpoSession};
pub use render::{DisplayMode, Renderer, Screen};

/// An open device being sampled.
pub trait Sampler: Send {
    /// Text shown around the samples.
    fn screen(&self) -> Screen;

    /// Take one sample and format it as a display row. An error ends the
    /// session.
    fn sample(&mut self) -> Result<String, ProbeFailure>;
}

/// A live diagnostic session.
pub trait LiveSession: Send + Sync {
    /// Short name, as used on the command line.
    fn name(&self) -> &'static str;

    fn band(&self) -> Band;

    /// Time between samples.
    fn interval(&self) -> Duration;

    /// Open the device(s) and prepare to sample.
    fn start(&self, platform: &dyn Platform) -> Result<Box<dyn Sampler>, ProbeFailure>;
}

/// Yields the tick number now, then every `interval`, until `stop` is
/// cancelled.
pub fn ticks(interval: Duration, stop: CancellationToken) -> impl Stream<Item = u64> + Send {
    stream::unfold((0u64, stop), move |(n, stop)| async move {
        if n > 0 {
            tokio::select! {
                biased;
                _ = stop.cancelled() => return None,
                _ = tokio::time::sleep(interval) => {}
            }
        } else if stop.is_cancelled() {
            return None;
        }
        Some((n, (n + 1, stop)))
    })
}

fn emit(out: &mut (dyn Write + Send), text: &str) -> Result<(), ProbeFailure> {
    if text.is_empty() {
        return Ok(());
    }
    out.write_all(text.as_bytes())
        .and_then(|()| out.flush())
        .or_fail(ErrorCode::FdNoWrite, "writing to the display")
}

async fn drive(
    session: &dyn LiveSession,
    platform: &dyn Platform,
    mode: DisplayMode,
    stop: CancellationToken,
    out: &mut (dyn Write + Send),
) -> Result<(), ProbeFailure> {
    let mut sampler = session.start(platform)?;
    let mut renderer = Renderer::new(mode, sampler.screen());
    emit(out, &renderer.preamble())?;

    let mut ticks = pin!(ticks(session.interval(), stop));
    let mut taken = 0u64;
    let outcome = loop {
        if ticks.next().await.is_none() {
            break Ok(());
        }
        let row = match sampler.sample() {
            Ok(row) => row,
            Err(failure) => break Err(failure),
        };
        taken += 1;
        if let Err(failure) = emit(out, &renderer.frame(&row)) {
            break Err(failure);
        }
    };

    debug!(session = session.name(), samples = taken, "Live session stopped");
    emit(out, renderer.epilogue())?;
    outcome
}

/// Run `session` until `stop` is cancelled and report its outcome.
pub async fn execute(
    session: &dyn LiveSession,
    platform: &dyn Platform,
    mode: DisplayMode,
    stop: CancellationToken,
    out: &mut (dyn Write + Send),
) -> ProbeReport {
    debug!(session = session.name(), %mode, "Starting live session");
    let outcome = drive(session, platform, mode, stop, out).await;
    probe::conclude(session.name(), session.band(), outcome)
}
