//! Consumer side of the ring: ordered reads and waiting for data

use std::{
    ops::Deref,
    sync::atomic::Ordering,
    time::{Duration, Instant},
};

use log::warn;
use serde::de::DeserializeOwned;

use crate::{
    codec,
    error::{Result, RingprobeError},
    event::Event,
};

use super::{
    buffer::RingBuffer,
    layout::{record_size, BUSY_BIT, DISCARD_BIT, LEN_MASK, RECORD_HEADER_SIZE},
};

/// What the consumer found at its current position
enum Head {
    Empty,
    Busy,
    Skip { next_pos: u64 },
    Record { offset: usize, len: usize, next_pos: u64 },
    /// Header length runs past the producer position or the data area
    Corrupt { offset: usize, len: usize },
}

/// Single reader of a ring
///
/// Records come out in submission order. Discarded records and padding are
/// skipped; a record still being written stops the scan until it is submitted.
#[derive(Debug)]
pub struct RingConsumer<'a> {
    ring: &'a RingBuffer,
}

impl<'a> RingConsumer<'a> {
    pub(crate) fn new(ring: &'a RingBuffer) -> Self {
        Self { ring }
    }

    fn head(&self) -> Head {
        let control = self.ring.control();
        let cons = control.consumer_pos.load(Ordering::Relaxed);
        let prod = control.producer_pos.load(Ordering::Acquire);
        if cons == prod {
            return Head::Empty;
        }

        let offset = self.ring.offset_of(cons);
        let word = self.ring.header(offset).len.load(Ordering::Acquire);
        if word & BUSY_BIT != 0 {
            return Head::Busy;
        }

        let len = (word & LEN_MASK) as usize;
        let size = record_size(len);
        if size as u64 > prod.wrapping_sub(cons)
            || offset + RECORD_HEADER_SIZE + len > self.ring.capacity()
        {
            return Head::Corrupt { offset, len };
        }

        let next_pos = cons + size as u64;
        if word & DISCARD_BIT != 0 {
            Head::Skip { next_pos }
        } else {
            Head::Record {
                offset,
                len,
                next_pos,
            }
        }
    }

    fn advance(&self, next_pos: u64) {
        self.ring
            .control()
            .consumer_pos
            .store(next_pos, Ordering::Release);
    }

    /// Take the next submitted record, if any
    ///
    /// The record's space is released when the returned item is dropped.
    /// Fails with [`RingprobeError::Layout`] when the record header at the
    /// consumer position does not describe a record inside the ring; the
    /// position is left unchanged.
    pub fn try_next(&mut self) -> Result<Option<RingItem<'_>>> {
        loop {
            match self.head() {
                Head::Empty | Head::Busy => return Ok(None),
                Head::Skip { next_pos } => self.advance(next_pos),
                Head::Corrupt { offset, len } => return Err(self.corrupt_error(offset, len)),
                Head::Record {
                    offset,
                    len,
                    next_pos,
                } => {
                    let data = unsafe {
                        std::slice::from_raw_parts(self.ring.payload(offset, len), len)
                    };
                    return Ok(Some(RingItem {
                        consumer: self,
                        data,
                        next_pos,
                    }));
                }
            }
        }
    }

    /// Take the next submitted record, if any
    ///
    /// Stops in front of a corrupt record header as if it were still busy;
    /// use [`try_next`](RingConsumer::try_next) to see the error.
    #[allow(clippy::should_implement_trait)]
    pub fn next(&mut self) -> Option<RingItem<'_>> {
        let ring = self.ring;
        match self.try_next() {
            Ok(item) => item,
            Err(e) => {
                warn!("ring '{}' unreadable: {}", ring.region().name(), e);
                None
            }
        }
    }

    fn corrupt_error(&self, offset: usize, len: usize) -> RingprobeError {
        RingprobeError::layout(format!(
            "record at offset {} claims {} bytes, ring holds {} of {} bytes",
            offset,
            len,
            self.ring.used(),
            self.ring.capacity()
        ))
    }

    /// Check whether `next` would make progress right now
    pub fn is_readable(&self) -> bool {
        matches!(self.head(), Head::Skip { .. } | Head::Record { .. })
    }

    /// Wait until a record may be readable or `timeout` expires
    ///
    /// Returns `true` if the ring is readable on return. `None` waits forever.
    /// A corrupt record header at the consumer position is an error.
    pub fn wait(&mut self, timeout: Option<Duration>) -> Result<bool> {
        let deadline = timeout.map(|t| Instant::now() + t);

        loop {
            match self.head() {
                Head::Skip { .. } | Head::Record { .. } => return Ok(true),
                Head::Corrupt { offset, len } => return Err(self.corrupt_error(offset, len)),
                Head::Empty | Head::Busy => {}
            }

            let remaining = match deadline {
                Some(deadline) => {
                    let now = Instant::now();
                    if now >= deadline {
                        return Ok(false);
                    }
                    Some(deadline - now)
                }
                None => None,
            };

            self.ring.wait_for_notification(remaining)?;
        }
    }

    /// Decode and release the next record as an [`Event`]
    pub fn next_event(&mut self) -> Option<Result<Event>> {
        match self.try_next() {
            Ok(item) => item.map(|item| item.event()),
            Err(e) => Some(Err(e)),
        }
    }

    /// Copy out and release every record currently readable
    pub fn drain(&mut self) -> Vec<Vec<u8>> {
        let mut records = Vec::new();
        while let Some(item) = self.next() {
            records.push(item.to_vec());
        }
        records
    }

    /// Decode and release every event currently readable
    pub fn drain_events(&mut self) -> Result<Vec<Event>> {
        let mut events = Vec::new();
        while let Some(event) = self.next_event() {
            events.push(event?);
        }
        Ok(events)
    }
}

impl Drop for RingConsumer<'_> {
    fn drop(&mut self) {
        self.ring.release_consumer();
    }
}

/// A submitted record borrowed from the ring
#[derive(Debug)]
pub struct RingItem<'c> {
    consumer: &'c RingConsumer<'c>,
    data: &'c [u8],
    next_pos: u64,
}

impl RingItem<'_> {
    /// Decode the record into `T`
    pub fn decode<T: DeserializeOwned>(&self) -> Result<T> {
        codec::decode(self.data)
    }

    /// Decode the record as an [`Event`]
    pub fn event(&self) -> Result<Event> {
        Event::decode(self.data)
    }
}

impl Deref for RingItem<'_> {
    type Target = [u8];

    fn deref(&self) -> &[u8] {
        self.data
    }
}

impl Drop for RingItem<'_> {
    fn drop(&mut self) {
        self.consumer.advance(self.next_pos);
        self.consumer.ring.stats_ref().record_consumed();
    }
}
