//! Ring buffer statistics tracking

use std::sync::atomic::{AtomicU64, Ordering};

use serde::Serialize;

/// Per-handle ring counters
#[derive(Debug, Default)]
pub struct RingStats {
    /// Reservations granted
    pub reserved: AtomicU64,
    /// Records made visible to the consumer
    pub submitted: AtomicU64,
    /// Reservations given back without publishing
    pub discarded: AtomicU64,
    /// Reservations refused for lack of space or lock contention
    pub rejected: AtomicU64,
    /// Records released by the consumer
    pub consumed: AtomicU64,
}

impl RingStats {
    pub fn record_reserved(&self) {
        self.reserved.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_submitted(&self) {
        self.submitted.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_discarded(&self) {
        self.discarded.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_rejected(&self) {
        self.rejected.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_consumed(&self) {
        self.consumed.fetch_add(1, Ordering::Relaxed);
    }

    /// Copy the counters out
    pub fn snapshot(&self) -> RingStatsSnapshot {
        RingStatsSnapshot {
            reserved: self.reserved.load(Ordering::Relaxed),
            submitted: self.submitted.load(Ordering::Relaxed),
            discarded: self.discarded.load(Ordering::Relaxed),
            rejected: self.rejected.load(Ordering::Relaxed),
            consumed: self.consumed.load(Ordering::Relaxed),
        }
    }
}

/// Point-in-time copy of [`RingStats`]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct RingStatsSnapshot {
    pub reserved: u64,
    pub submitted: u64,
    pub discarded: u64,
    pub rejected: u64,
    pub consumed: u64,
}

impl RingStatsSnapshot {
    /// Reservations neither submitted nor discarded yet
    pub fn in_flight(&self) -> u64 {
        self.reserved
            .saturating_sub(self.submitted + self.discarded)
    }
}
