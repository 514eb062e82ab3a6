//! Fixed-capacity byte ring with reserve/submit publication

use std::{
    ops::{Deref, DerefMut},
    ptr::NonNull,
    sync::atomic::{AtomicBool, Ordering},
    time::Duration,
};

use log::{debug, trace, warn};

use crate::{
    channel::RingChannel,
    config::PRODUCER_SPIN_LIMIT,
    error::{Result, RingprobeError},
    memory::{RingConfig, SharedMemoryRegion},
    sync::{EventNotifier, SpinLock},
};

use super::{
    consumer::RingConsumer,
    layout::{
        record_size, RecordHeader, RingControl, BUSY_BIT, DATA_OFFSET, DISCARD_BIT,
        RECORD_HEADER_SIZE,
    },
    stats::{RingStats, RingStatsSnapshot},
};

/// Longest a consumer sleeps without rescanning when wakeups may be missed
const RESCAN_INTERVAL: Duration = Duration::from_millis(1);

/// Multi-producer, single-consumer ring of variable-length records
///
/// Producers [`reserve`](RingBuffer::reserve) a byte range, fill it and
/// [`submit`](Reservation::submit) it. Until submit the record header carries
/// the busy bit and the consumer stops in front of it, so a reader sees either
/// the whole record or nothing.
#[derive(Debug)]
pub struct RingBuffer {
    region: SharedMemoryRegion,
    control: NonNull<RingControl>,
    data: NonNull<u8>,
    capacity: usize,
    mask: usize,
    spin_budget: u32,
    notifier: Option<EventNotifier>,
    stats: RingStats,
    /// Set while a `RingConsumer` for this handle is alive
    consumer_taken: AtomicBool,
}

impl RingBuffer {
    /// Create an anonymous ring of `capacity` bytes
    pub fn new(capacity: usize) -> Result<Self> {
        Self::with_config(RingConfig::new("events", capacity))
    }

    /// Create or open a ring as described by `config`
    pub fn with_config(config: RingConfig) -> Result<Self> {
        let region = SharedMemoryRegion::new(&config)?;
        let base = region.base();

        let control = base.cast::<RingControl>();
        if config.create {
            unsafe { std::ptr::write(control.as_ptr(), RingControl::new(config.capacity)) };
            debug!(
                "created ring '{}' with {} bytes of {} storage",
                config.name,
                config.capacity,
                config.backing_type.name()
            );
        } else {
            unsafe { control.as_ref() }.validate(config.capacity)?;
            debug!("opened ring '{}' ({} bytes)", config.name, config.capacity);
        }

        let data = unsafe { NonNull::new_unchecked(base.as_ptr().add(DATA_OFFSET)) };

        let notifier = if config.notifications {
            Some(EventNotifier::new()?)
        } else {
            None
        };

        Ok(Self {
            region,
            control,
            data,
            capacity: config.capacity,
            mask: config.capacity - 1,
            spin_budget: PRODUCER_SPIN_LIMIT,
            notifier,
            stats: RingStats::default(),
            consumer_taken: AtomicBool::new(false),
        })
    }

    /// Limit how often `reserve` retries a contended producer lock
    pub fn with_spin_budget(mut self, budget: u32) -> Self {
        self.spin_budget = budget;
        self
    }

    pub(crate) fn control(&self) -> &RingControl {
        unsafe { self.control.as_ref() }
    }

    pub(crate) fn header(&self, offset: usize) -> &RecordHeader {
        debug_assert!(offset + RECORD_HEADER_SIZE <= self.capacity);
        unsafe { &*(self.data.as_ptr().add(offset) as *const RecordHeader) }
    }

    pub(crate) fn payload(&self, offset: usize, len: usize) -> *mut u8 {
        debug_assert!(offset + RECORD_HEADER_SIZE + len <= self.capacity);
        unsafe { self.data.as_ptr().add(offset + RECORD_HEADER_SIZE) }
    }

    pub(crate) fn offset_of(&self, pos: u64) -> usize {
        pos as usize & self.mask
    }

    /// Data area size in bytes
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Largest payload a single reservation can hold
    pub fn max_record_len(&self) -> usize {
        self.capacity - RECORD_HEADER_SIZE
    }

    /// Bytes between consumer and producer positions
    pub fn used(&self) -> usize {
        let control = self.control();
        let prod = control.producer_pos.load(Ordering::Acquire);
        let cons = control.consumer_pos.load(Ordering::Acquire);
        prod.wrapping_sub(cons) as usize
    }

    /// Free bytes, headers and padding included
    pub fn available(&self) -> usize {
        self.capacity - self.used()
    }

    /// Check if nothing is reserved or waiting to be consumed
    pub fn is_empty(&self) -> bool {
        self.used() == 0
    }

    /// Reserve `len` payload bytes
    ///
    /// Never blocks: fails with [`RingprobeError::InsufficientSpace`] when the
    /// record does not fit and with [`RingprobeError::Concurrency`] when the
    /// producer lock stays contended for the whole spin budget.
    pub fn reserve(&self, len: usize) -> Result<Reservation<'_>> {
        if len > self.max_record_len() {
            self.stats.record_rejected();
            warn!(
                "reservation of {} bytes exceeds ring maximum {}",
                len,
                self.max_record_len()
            );
            return Err(RingprobeError::insufficient_space(len, self.max_record_len()));
        }

        let total = record_size(len);
        let control = self.control();

        let lock = SpinLock::new(&control.producer_lock, self.spin_budget);
        let _guard = lock.try_lock().map_err(|e| {
            self.stats.record_rejected();
            warn!("producer lock unavailable: {}", e);
            RingprobeError::concurrency(e.to_string())
        })?;

        let cons = control.consumer_pos.load(Ordering::Acquire);
        let prod = control.producer_pos.load(Ordering::Relaxed);
        let offset = self.offset_of(prod);

        // A record never straddles the end of the data area
        let tail = self.capacity - offset;
        let padding = if total > tail { tail } else { 0 };

        let free = self.capacity - prod.wrapping_sub(cons) as usize;
        if padding + total > free {
            self.stats.record_rejected();
            warn!(
                "ring full: {} bytes requested, {} free ({} padding)",
                total, free, padding
            );
            return Err(RingprobeError::insufficient_space(
                total,
                free.saturating_sub(padding),
            ));
        }

        if padding > 0 {
            let pad = self.header(offset);
            pad.reserved.store(0, Ordering::Relaxed);
            pad.len
                .store((padding - RECORD_HEADER_SIZE) as u32 | DISCARD_BIT, Ordering::Relaxed);
        }

        let record_offset = self.offset_of(prod + padding as u64);
        let header = self.header(record_offset);
        header.reserved.store(0, Ordering::Relaxed);
        header.len.store(len as u32 | BUSY_BIT, Ordering::Relaxed);

        // Publishes the busy header (and padding) together with the new position
        control
            .producer_pos
            .store(prod + (padding + total) as u64, Ordering::Release);

        self.stats.record_reserved();
        trace!("reserved {} bytes at offset {}", len, record_offset);

        Ok(Reservation {
            ring: self,
            offset: record_offset,
            len,
            done: false,
        })
    }

    /// Clear the busy bit of a reserved record, optionally marking it discarded
    fn commit(&self, offset: usize, len: usize, discard: bool) {
        let mut word = len as u32;
        if discard {
            word |= DISCARD_BIT;
        }
        self.header(offset).len.store(word, Ordering::Release);

        if discard {
            self.stats.record_discarded();
            trace!("discarded record at offset {}", offset);
        } else {
            self.stats.record_submitted();
            trace!("submitted {} bytes at offset {}", len, offset);
        }

        if let Some(notifier) = &self.notifier {
            if let Err(e) = notifier.notify() {
                warn!("failed to wake consumer: {}", e);
            }
        }
    }

    /// Take the consumer handle for this ring
    ///
    /// Only one consumer may exist per handle at a time.
    pub fn consumer(&self) -> Result<RingConsumer<'_>> {
        if self
            .consumer_taken
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return Err(RingprobeError::concurrency("ring already has a consumer"));
        }
        Ok(RingConsumer::new(self))
    }

    pub(crate) fn release_consumer(&self) {
        self.consumer_taken.store(false, Ordering::Release);
    }

    /// Block until this handle's notifier fires or `timeout` passes
    ///
    /// Submits through other handles of a file-backed ring do not reach this
    /// handle's notifier, so those rings wake up every `RESCAN_INTERVAL` to
    /// rescan the shared positions.
    pub(crate) fn wait_for_notification(&self, timeout: Option<Duration>) -> Result<bool> {
        let rescan = |t: Option<Duration>| t.map_or(RESCAN_INTERVAL, |t| t.min(RESCAN_INTERVAL));

        match &self.notifier {
            Some(notifier) if self.region.is_file_backed() => {
                Ok(notifier.wait(Some(rescan(timeout)))?)
            }
            Some(notifier) => Ok(notifier.wait(timeout)?),
            None => {
                std::thread::sleep(rescan(timeout));
                Ok(false)
            }
        }
    }

    pub(crate) fn stats_ref(&self) -> &RingStats {
        &self.stats
    }

    /// Counters for this handle
    pub fn stats(&self) -> RingStatsSnapshot {
        self.stats.snapshot()
    }

    /// The notifier woken on every submit, if enabled
    pub fn notifier(&self) -> Option<&EventNotifier> {
        self.notifier.as_ref()
    }

    /// Backing region of this ring
    pub fn region(&self) -> &SharedMemoryRegion {
        &self.region
    }

    /// Flush file-backed rings to disk
    pub fn flush(&self) -> Result<()> {
        self.region.flush()
    }
}

// Shared state is only touched through atomics or exclusively reserved ranges.
unsafe impl Send for RingBuffer {}
unsafe impl Sync for RingBuffer {}

/// Exclusive claim on `len` bytes of the ring
///
/// Dropping a reservation without submitting it discards the record.
#[must_use = "a reservation is discarded unless it is submitted"]
#[derive(Debug)]
pub struct Reservation<'a> {
    ring: &'a RingBuffer,
    offset: usize,
    len: usize,
    done: bool,
}

impl<'a> Reservation<'a> {
    /// Publish the record to the consumer
    pub fn submit(mut self) {
        self.done = true;
        self.ring.commit(self.offset, self.len, false);
    }

    /// Give the record back; the consumer skips it
    pub fn discard(mut self) {
        self.done = true;
        self.ring.commit(self.offset, self.len, true);
    }

    /// Offset of the record header in the data area
    pub fn offset(&self) -> usize {
        self.offset
    }
}

impl Deref for Reservation<'_> {
    type Target = [u8];

    fn deref(&self) -> &[u8] {
        unsafe { std::slice::from_raw_parts(self.ring.payload(self.offset, self.len), self.len) }
    }
}

impl DerefMut for Reservation<'_> {
    fn deref_mut(&mut self) -> &mut [u8] {
        unsafe {
            std::slice::from_raw_parts_mut(self.ring.payload(self.offset, self.len), self.len)
        }
    }
}

impl Drop for Reservation<'_> {
    fn drop(&mut self) {
        if !self.done {
            self.ring.commit(self.offset, self.len, true);
        }
    }
}

impl RingChannel for RingBuffer {
    type Slot<'a> = Reservation<'a>;

    fn reserve(&self, len: usize) -> Result<Reservation<'_>> {
        RingBuffer::reserve(self, len)
    }

    fn submit(&self, slot: Reservation<'_>) {
        slot.submit();
    }

    fn discard(&self, slot: Reservation<'_>) {
        slot.discard();
    }

    fn capacity(&self) -> usize {
        self.capacity
    }
}
