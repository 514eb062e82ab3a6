//! # ringprobe - ring buffer event-emission probe
//!
//! A probe harness that validates a ring-buffer event pipeline: an entry
//! point takes a single `magic` argument, publishes `{magic, !magic}` into a
//! fixed-capacity ring buffer and reports `0` on success or `42` when the ring
//! has no room. A consumer reads the records back in submission order and
//! checks the integrity pair.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────┐ reserve/submit ┌──────────────────────────┐ next/wait ┌──────────────┐
//! │ EmitProgram  │ ─────────────▶ │ RingBuffer (mapped mem)  │ ────────▶ │ RingConsumer │
//! │  + HashTable │                │ control hdr │ data area  │           │              │
//! └──────────────┘                └──────────────────────────┘           └──────────────┘
//! ```
//!
//! ```no_run
//! use std::sync::Arc;
//! use ringprobe::{EmitArgs, EmitProgram, HashTable, RingBuffer};
//!
//! let ring = Arc::new(RingBuffer::new(4096)?);
//! let program = EmitProgram::new(ring.clone(), Arc::new(HashTable::default()));
//! assert_eq!(program.run(&EmitArgs::new(0)), 0);
//!
//! let mut consumer = ring.consumer()?;
//! let event = consumer.next_event().unwrap()?;
//! assert!(event.is_intact());
//! # Ok::<(), ringprobe::RingprobeError>(())
//! ```

pub mod channel;
pub mod codec;
pub mod error;
pub mod event;
pub mod maps;
pub mod memory;
pub mod program;
pub mod ringbuf;
pub mod sync;

// Main API re-exports
pub use channel::RingChannel;
pub use error::{Result, RingprobeError};
pub use event::{EmitArgs, Event};
pub use maps::{BoundedMap, HashTable, UpdateMode};
pub use memory::{BackingType, RingConfig, SharedMemoryRegion};
pub use program::{EmitProgram, EmitStatus, EMIT_NO_SPACE, EMIT_OK};
pub use ringbuf::{Reservation, RingBuffer, RingConsumer, RingItem, RingStatsSnapshot};
pub use sync::{EventNotifier, SyncError, SyncResult};

// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Default configuration constants
pub mod config {
    pub use crate::ringbuf::layout::{DATA_OFFSET, RECORD_ALIGNMENT, RECORD_HEADER_SIZE};

    /// Default ring capacity in bytes
    pub const DEFAULT_RING_CAPACITY: usize = 4096;

    /// Smallest ring that can hold a record
    pub const MIN_RING_CAPACITY: usize = 16;

    /// Default number of side table entries
    pub const DEFAULT_MAP_MAX_ENTRIES: usize = 42;

    /// Attempts at the producer lock before a reservation gives up
    pub const PRODUCER_SPIN_LIMIT: u32 = 1 << 14;
}
