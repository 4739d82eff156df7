//! PWM abstraction trait.

use super::Result;

/// PWM output channel
pub trait Pwm: Send {
    /// Set the high time of each period, in microseconds.
    fn write_width_us(&mut self, width_us: u32) -> Result<()>;
}
