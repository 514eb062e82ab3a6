//! Bounded spin lock over a word in shared memory

use std::sync::atomic::{AtomicU32, Ordering};

use super::{SyncError, SyncResult};

const UNLOCKED: u32 = 0;
const LOCKED: u32 = 1;

/// Spin lock view over an `AtomicU32` owned by someone else
///
/// The lock word lives in the ring's control header so that every handle
/// mapping the same region serializes on it. Acquisition never sleeps: after
/// `budget` failed attempts it gives up.
#[derive(Debug, Clone, Copy)]
pub struct SpinLock<'a> {
    word: &'a AtomicU32,
    budget: u32,
}

impl<'a> SpinLock<'a> {
    pub fn new(word: &'a AtomicU32, budget: u32) -> Self {
        Self {
            word,
            budget: budget.max(1),
        }
    }

    /// Try to take the lock, spinning at most `budget` times
    pub fn try_lock(&self) -> SyncResult<SpinGuard<'a>> {
        for _ in 0..self.budget {
            if self
                .word
                .compare_exchange_weak(UNLOCKED, LOCKED, Ordering::Acquire, Ordering::Relaxed)
                .is_ok()
            {
                return Ok(SpinGuard { word: self.word });
            }
            std::hint::spin_loop();
        }

        Err(SyncError::LockContended {
            attempts: self.budget,
        })
    }

    /// Check whether the lock is currently held
    pub fn is_locked(&self) -> bool {
        self.word.load(Ordering::Relaxed) == LOCKED
    }
}

/// Releases the lock on drop
#[derive(Debug)]
pub struct SpinGuard<'a> {
    word: &'a AtomicU32,
}

impl Drop for SpinGuard<'_> {
    fn drop(&mut self) {
        self.word.store(UNLOCKED, Ordering::Release);
    }
}
