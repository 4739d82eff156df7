//! GPIO hardware abstraction trait.
//!
//! Ports on these boards are exposed as a single data register plus an
//! index register. Indexed peripherals (e.g. the on-chip A/D mux) are read by
//! writing a channel number to the index register first and then reading the
//! data register, which is two separate transactions.

use super::Result;

/// GPIO port abstraction
pub trait GpioPort: Send {
    /// Read the whole data register.
    fn read(&mut self) -> Result<u32>;

    /// Write the whole data register.
    fn write(&mut self, value: u32) -> Result<()>;

    /// Write the index register.
    fn select_index(&mut self, index: u32) -> Result<()>;

    /// Take the driver's port lock.
    fn lock(&mut self) -> Result<()>;

    /// Release the driver's port lock.
    fn unlock(&mut self) -> Result<()>;

    /// Select `index`, then read the data register.
    fn read_index(&mut self, index: u32) -> Result<u32> {
        self.select_index(index)?;
        self.read()
    }

    /// Select `index`, then write `value` to the data register.
    fn write_index(&mut self, index: u32, value: u32) -> Result<()> {
        self.select_index(index)?;
        self.write(value)
    }
}

impl<T: GpioPort + ?Sized> GpioPort for Box<T> {
    fn read(&mut self) -> Result<u32> {
        (**self).read()
    }

    fn write(&mut self, value: u32) -> Result<()> {
        (**self).write(value)
    }

    fn select_index(&mut self, index: u32) -> Result<()> {
        (**self).select_index(index)
    }

    fn lock(&mut self) -> Result<()> {
        (**self).lock()
    }

    fn unlock(&mut self) -> Result<()> {
        (**self).unlock()
    }
}
