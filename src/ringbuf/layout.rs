//! Binary layout of a ring region
//!
//! ```text
//! offset 0            DATA_OFFSET                         DATA_OFFSET + capacity
//! ┌───────────────────┬──────────────────────────────────────────────┐
//! │ RingControl       │ data area: [hdr|payload|pad] [hdr|payload]…  │
//! └───────────────────┴──────────────────────────────────────────────┘
//! ```
//!
//! Positions in the control header are free-running byte counters; the data
//! offset of a position is `pos & (capacity - 1)`.

use std::sync::atomic::{AtomicU32, AtomicU64};

use crate::error::{Result, RingprobeError};

/// "RINGPROB" in ASCII
pub const RING_MAGIC: u64 = 0x5249_4E47_5052_4F42;

/// Layout version written at creation and checked on open
pub const LAYOUT_VERSION: u32 = 1;

/// Offset of the data area from the start of the region
pub const DATA_OFFSET: usize = 256;

/// Size of the header preceding every record
pub const RECORD_HEADER_SIZE: usize = 8;

/// Records start on this boundary
pub const RECORD_ALIGNMENT: usize = 8;

/// Record reserved but not yet submitted or discarded
pub const BUSY_BIT: u32 = 1 << 31;

/// Record to be skipped by the consumer
pub const DISCARD_BIT: u32 = 1 << 30;

/// Payload length bits of the header length word
pub const LEN_MASK: u32 = !(BUSY_BIT | DISCARD_BIT);

const CACHE_LINE_SIZE: usize = 64;

/// Control header at the start of every ring region
#[repr(C)]
pub struct RingControl {
    /// Magic number for validation
    pub magic: u64,
    /// Layout version
    pub version: u32,
    _reserved: u32,
    /// Data area size in bytes
    pub capacity: u64,
    /// Serializes producers across every handle on the region
    pub producer_lock: AtomicU32,
    _pad0: [u8; CACHE_LINE_SIZE - 28],
    /// Bytes released by the consumer
    pub consumer_pos: AtomicU64,
    _pad1: [u8; CACHE_LINE_SIZE - 8],
    /// Bytes handed out to producers
    pub producer_pos: AtomicU64,
    _pad2: [u8; CACHE_LINE_SIZE - 8],
}

const _: () = assert!(std::mem::size_of::<RingControl>() == 3 * CACHE_LINE_SIZE);
const _: () = assert!(std::mem::size_of::<RingControl>() <= DATA_OFFSET);
const _: () = assert!(DATA_OFFSET % RECORD_ALIGNMENT == 0);

impl RingControl {
    /// Fresh header for a ring of `capacity` bytes
    pub fn new(capacity: usize) -> Self {
        Self {
            magic: RING_MAGIC,
            version: LAYOUT_VERSION,
            _reserved: 0,
            capacity: capacity as u64,
            producer_lock: AtomicU32::new(0),
            _pad0: [0; CACHE_LINE_SIZE - 28],
            consumer_pos: AtomicU64::new(0),
            _pad1: [0; CACHE_LINE_SIZE - 8],
            producer_pos: AtomicU64::new(0),
            _pad2: [0; CACHE_LINE_SIZE - 8],
        }
    }

    /// Validate magic, version and capacity of an existing header
    pub fn validate(&self, capacity: usize) -> Result<()> {
        if self.magic != RING_MAGIC {
            return Err(RingprobeError::layout(format!(
                "bad magic {:#x}",
                self.magic
            )));
        }
        if self.version != LAYOUT_VERSION {
            return Err(RingprobeError::layout(format!(
                "unsupported layout version {}",
                self.version
            )));
        }
        if self.capacity != capacity as u64 {
            return Err(RingprobeError::layout(format!(
                "capacity {} does not match expected {}",
                self.capacity, capacity
            )));
        }
        Ok(())
    }
}

/// Header preceding each record in the data area
#[repr(C)]
pub struct RecordHeader {
    /// Payload length plus `BUSY_BIT`/`DISCARD_BIT`
    pub len: AtomicU32,
    pub reserved: AtomicU32,
}

const _: () = assert!(std::mem::size_of::<RecordHeader>() == RECORD_HEADER_SIZE);

/// Bytes a record with `len` payload bytes occupies in the data area
pub const fn record_size(len: usize) -> usize {
    (len + RECORD_HEADER_SIZE + RECORD_ALIGNMENT - 1) & !(RECORD_ALIGNMENT - 1)
}
