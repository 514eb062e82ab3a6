//! Synchronization primitives for the ring buffer
//!
//! - eventfd/mio notifications so a consumer can sleep until a record is submitted
//! - a bounded spin lock living inside the shared control header

pub mod notify;
pub mod spin;

pub use notify::{EventNotifier, NotificationStats};
pub use spin::{SpinGuard, SpinLock};

/// Synchronization error types
#[derive(Debug, Clone, PartialEq)]
pub enum SyncError {
    /// Lock still held after the spin budget was spent
    LockContended { attempts: u32 },
    /// Notification system failure
    NotificationFailed,
}

impl std::fmt::Display for SyncError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SyncError::LockContended { attempts } => {
                write!(f, "Lock contended after {} attempts", attempts)
            }
            SyncError::NotificationFailed => write!(f, "Notification system failed"),
        }
    }
}

impl std::error::Error for SyncError {}

/// Result type for synchronization operations
pub type SyncResult<T> = Result<T, SyncError>;
