//! Restoration of state a probe does not own.
//!
//! Some probes have to perturb machine-wide state to do their job: the RTC
//! probe steps the system clock, and the RS-485 probe can be told to put the
//! transceiver direction mode back. [`Restore`] captures the original value up front and
//! puts it back when the guard goes away, whatever path the probe takes out
//! of its body.
//!
//! ```ignore
//! let saved = clock.now()?;
//! let mut clock = Restore::new(clock, saved);
//! clock.target().set(TEST_TIME)?;   // an early `?` still restores
//! clock.finish()?;                  // the success path sees restore errors
//! ```

use std::fmt;
use std::path::Path;

use time::{OffsetDateTime, PrimitiveDateTime};

use crate::hw_trait::{Filesystem, GpioPort, Result, Rtc, SystemClock};
use crate::tracing::prelude::*;

/// A piece of state that can be put back to a captured value.
pub trait Ambient {
    type Value: fmt::Debug;

    /// Name used in log messages.
    fn describe(&self) -> &'static str;

    fn restore(&mut self, value: &Self::Value) -> Result<()>;
}

impl Ambient for Box<dyn SystemClock> {
    type Value = OffsetDateTime;

    fn describe(&self) -> &'static str {
        "system clock"
    }

    fn restore(&mut self, value: &OffsetDateTime) -> Result<()> {
        self.set(*value)
    }
}

impl Ambient for Box<dyn Rtc> {
    type Value = PrimitiveDateTime;

    fn describe(&self) -> &'static str {
        "RTC"
    }

    fn restore(&mut self, value: &PrimitiveDateTime) -> Result<()> {
        self.set_time(*value)
    }
}

impl Ambient for Box<dyn GpioPort> {
    type Value = u32;

    fn describe(&self) -> &'static str {
        "control port"
    }

    fn restore(&mut self, value: &u32) -> Result<()> {
        self.write(*value)
    }
}

/// A text attribute such as a sysfs control file.
pub struct Attribute<'a> {
    pub fs: &'a dyn Filesystem,
    pub path: &'a Path,
}

impl Ambient for Attribute<'_> {
    type Value = String;

    fn describe(&self) -> &'static str {
        "control attribute"
    }

    fn restore(&mut self, value: &String) -> Result<()> {
        self.fs.write_attr(self.path, value)
    }
}

/// Puts `target` back to `saved` on drop or on [`Restore::finish`].
pub struct Restore<A: Ambient> {
    target: Option<A>,
    saved: A::Value,
}

impl<A: Ambient> Restore<A> {
    pub fn new(target: A, saved: A::Value) -> Self {
        Self {
            target: Some(target),
            saved,
        }
    }

    /// The guarded resource, for use while the guard is armed.
    pub fn target(&mut self) -> &mut A {
        // `target` is only taken by `finish` and `drop`, which consume the
        // guard.
        match self.target.as_mut() {
            Some(target) => target,
            None => unreachable!("restore guard used after finish"),
        }
    }

    /// Restore now and report the outcome.
    pub fn finish(mut self) -> Result<()> {
        match self.target.take() {
            Some(mut target) => {
                let result = target.restore(&self.saved);
                match &result {
                    Ok(()) => debug!(saved = ?self.saved, "Restored {}", target.describe()),
                    Err(e) => error!(saved = ?self.saved, error = %e, "Failed to restore {}", target.describe()),
                }
                result
            }
            None => Ok(()),
        }
    }
}

impl<A: Ambient> Drop for Restore<A> {
    fn drop(&mut self) {
        if let Some(mut target) = self.target.take() {
            match target.restore(&self.saved) {
                Ok(()) => debug!(saved = ?self.saved, "Restored {} on early exit", target.describe()),
                Err(e) => error!(saved = ?self.saved, error = %e, "Failed to restore {}", target.describe()),
            }
        }
    }
}
