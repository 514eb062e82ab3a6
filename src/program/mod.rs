//! Invocation entry points publishing into a ring channel

pub mod emit;

pub use emit::EmitProgram;

/// Status returned when the event was submitted
pub const EMIT_OK: u32 = 0;

/// Status returned when the ring had no room for the event
pub const EMIT_NO_SPACE: u32 = 42;

/// Outcome of one emit invocation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EmitStatus {
    Submitted,
    NoSpace,
}

impl EmitStatus {
    /// Integer status code seen by the caller
    pub fn code(self) -> u32 {
        match self {
            EmitStatus::Submitted => EMIT_OK,
            EmitStatus::NoSpace => EMIT_NO_SPACE,
        }
    }

    /// Map a status code back, if it is one the program returns
    pub fn from_code(code: u32) -> Option<Self> {
        match code {
            EMIT_OK => Some(EmitStatus::Submitted),
            EMIT_NO_SPACE => Some(EmitStatus::NoSpace),
            _ => None,
        }
    }
}

impl From<EmitStatus> for u32 {
    fn from(status: EmitStatus) -> u32 {
        status.code()
    }
}
