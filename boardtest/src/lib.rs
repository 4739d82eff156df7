//! Hardware conformance probes for embedded single-board computers.
//!
//! Each probe exercises one on-board peripheral through its Linux device
//! node and reduces the outcome to a single [`error::ErrorCode`], zero when
//! the hardware validated. Probes are built from the one-transaction
//! primitives in [`hw_trait`], reach devices through a [`platform::Platform`],
//! and restore any machine-wide state they disturb before returning.

pub mod config;
pub mod error;
pub mod hw_trait;
pub mod linux;
pub mod live;
pub mod params;
pub mod peripheral;
pub mod platform;
pub mod probe;
pub mod tracing;

#[cfg(test)]
mod testing;
