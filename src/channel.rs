//! Producer-side capability of a ring channel
//!
//! The emit program only needs to reserve, fill and publish a slot, so it is
//! written against this trait instead of a concrete ring.

use std::ops::DerefMut;

use crate::error::Result;

/// Reserve/submit interface of a ring buffer
pub trait RingChannel {
    /// Writable view of a reserved byte range
    type Slot<'a>: DerefMut<Target = [u8]>
    where
        Self: 'a;

    /// Claim exactly `len` bytes, failing immediately if they are not available
    fn reserve(&self, len: usize) -> Result<Self::Slot<'_>>;

    /// Publish a filled slot to the consumer
    fn submit(&self, slot: Self::Slot<'_>);

    /// Give a slot back without publishing it
    fn discard(&self, slot: Self::Slot<'_>);

    /// Total byte capacity of the channel
    fn capacity(&self) -> usize;
}
