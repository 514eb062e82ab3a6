//! Fixed-capacity ring buffer with reserve/submit semantics

pub mod buffer;
pub mod consumer;
pub mod layout;
pub mod stats;


// Re-export main types for convenience
pub use buffer::{Reservation, RingBuffer};
pub use consumer::{RingConsumer, RingItem};
pub use stats::{RingStats, RingStatsSnapshot};
