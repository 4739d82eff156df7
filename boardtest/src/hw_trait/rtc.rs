//! Real-time clock abstraction trait.

use time::PrimitiveDateTime;

use super::Result;

/// Battery-backed RTC.
///
/// The RTC keeps broken-down calendar time with no zone attached; by
/// convention it holds UTC.
pub trait Rtc: Send {
    /// Read the current RTC time.
    fn read_time(&mut self) -> Result<PrimitiveDateTime>;

    /// Set the RTC time.
    fn set_time(&mut self, time: PrimitiveDateTime) -> Result<()>;
}
