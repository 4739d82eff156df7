//! Drivers for the A/D front ends read by the analog sessions.

pub mod indexed_atod;
pub mod mcp3208;

pub use indexed_atod::IndexedAtod;
pub use mcp3208::Mcp3208;
