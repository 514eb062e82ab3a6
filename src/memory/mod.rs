//! Memory regions backing ring buffers

pub mod config;
pub mod regions;

pub use config::{BackingType, RingConfig};
pub use regions::SharedMemoryRegion;
