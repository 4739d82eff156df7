//! Host wall-clock abstraction trait.
//!
//! The system clock is not owned by any probe. A probe that changes it must
//! put it back; see [`crate::probe::ambient`].

use time::OffsetDateTime;

use super::Result;

/// Host time-of-day
pub trait SystemClock: Send {
    /// Current wall-clock time.
    fn now(&self) -> Result<OffsetDateTime>;

    /// Step the wall clock to `time`. Usually needs CAP_SYS_TIME.
    fn set(&mut self, time: OffsetDateTime) -> Result<()>;
}
