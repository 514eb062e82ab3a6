//! Event record and emit arguments shared between producer and consumer

use serde::{Deserialize, Serialize};

use crate::{
    codec,
    error::{Result, RingprobeError},
};

/// Fixed-layout record published by the emit program
///
/// Field order and widths are part of the wire contract: `magic` first, then
/// `inverse_magic`, both 64-bit in native byte order, 16 bytes total.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Event {
    /// Value supplied by the caller
    pub magic: u64,
    /// Bitwise complement of `magic`
    pub inverse_magic: u64,
}

const _: () = assert!(std::mem::size_of::<Event>() == Event::SIZE);

impl Event {
    /// Size of one encoded event in bytes
    pub const SIZE: usize = 16;

    /// Build the integrity pair for `magic`
    pub fn from_magic(magic: u64) -> Self {
        Self {
            magic,
            inverse_magic: !magic,
        }
    }

    /// Check that `inverse_magic` is the exact complement of `magic`
    pub fn is_intact(&self) -> bool {
        self.inverse_magic == !self.magic
    }

    /// Write the event into the front of `buf`
    pub fn encode_into(&self, buf: &mut [u8]) -> Result<()> {
        codec::encode_into(self, buf).map(|_| ())
    }

    /// Read an event from raw record bytes
    pub fn decode(bytes: &[u8]) -> Result<Self> {
        codec::decode(bytes)
    }
}

impl std::fmt::Display for Event {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{{magic: {:#018x}, inverse_magic: {:#018x}}}",
            self.magic, self.inverse_magic
        )
    }
}

/// Invocation argument of the emit program
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct EmitArgs {
    pub magic: u64,
}

impl EmitArgs {
    /// Size of the raw argument context in bytes
    pub const SIZE: usize = 8;

    pub fn new(magic: u64) -> Self {
        Self { magic }
    }

    /// Decode arguments from a raw context buffer
    pub fn from_context(ctx: &[u8]) -> Result<Self> {
        if ctx.len() < Self::SIZE {
            return Err(RingprobeError::invalid_parameter(
                "context",
                format!("expected at least {} bytes, got {}", Self::SIZE, ctx.len()),
            ));
        }
        codec::decode(ctx)
    }

    /// Encode arguments as a raw context buffer
    pub fn to_context(&self) -> Vec<u8> {
        self.magic.to_ne_bytes().to_vec()
    }
}

impl From<u64> for EmitArgs {
    fn from(magic: u64) -> Self {
        Self::new(magic)
    }
}
