//! Consumer wakeups using eventfd and mio
//!
//! Producers bump an eventfd counter after each submit; a consumer blocks in a
//! mio `Poll` on that eventfd until the counter becomes non-zero or a timeout
//! expires. The counter is drained on wakeup, so several submits collapse into
//! one wakeup and the consumer rescans the ring.

use std::{
    io::ErrorKind,
    os::fd::{AsRawFd, OwnedFd, RawFd},
    sync::{
        atomic::{AtomicBool, AtomicU64, Ordering},
        Mutex,
    },
    time::Duration,
};

use log::warn;
use mio::{unix::SourceFd, Events, Interest, Poll, Token};
use nix::{
    errno::Errno,
    sys::eventfd::{eventfd, EfdFlags},
    unistd::{read, write},
};

use super::{SyncError, SyncResult};

/// Token for eventfd events in mio
const EVENTFD_TOKEN: Token = Token(0);

/// eventfd-backed notifier
#[derive(Debug)]
pub struct EventNotifier {
    event_fd: OwnedFd,
    /// Poll instance with the eventfd registered (mutable access needs the lock)
    poll: Mutex<Poll>,
    enabled: AtomicBool,
    notify_count: AtomicU64,
    wait_count: AtomicU64,
}

impl EventNotifier {
    /// Create a new notifier
    pub fn new() -> SyncResult<Self> {
        let event_fd = eventfd(0, EfdFlags::EFD_CLOEXEC | EfdFlags::EFD_NONBLOCK)
            .map_err(|_| SyncError::NotificationFailed)?;

        let poll = Poll::new().map_err(|_| SyncError::NotificationFailed)?;
        let fd = event_fd.as_raw_fd();
        poll.registry()
            .register(&mut SourceFd(&fd), EVENTFD_TOKEN, Interest::READABLE)
            .map_err(|_| SyncError::NotificationFailed)?;

        Ok(Self {
            event_fd,
            poll: Mutex::new(poll),
            enabled: AtomicBool::new(true),
            notify_count: AtomicU64::new(0),
            wait_count: AtomicU64::new(0),
        })
    }

    /// Wake a waiting consumer
    pub fn notify(&self) -> SyncResult<()> {
        if !self.enabled.load(Ordering::Relaxed) {
            return Ok(());
        }

        self.notify_count.fetch_add(1, Ordering::Relaxed);

        let value: u64 = 1;
        match write(self.event_fd.as_raw_fd(), &value.to_ne_bytes()) {
            Ok(_) => Ok(()),
            // Counter saturated; a wakeup is already pending
            Err(Errno::EAGAIN) => Ok(()),
            Err(e) => {
                warn!("eventfd notify failed: {}", e);
                Err(SyncError::NotificationFailed)
            }
        }
    }

    /// Block until notified or until `timeout` passes
    ///
    /// Returns `true` when a notification was consumed and `false` on timeout
    /// or interruption.
    pub fn wait(&self, timeout: Option<Duration>) -> SyncResult<bool> {
        self.wait_count.fetch_add(1, Ordering::Relaxed);

        let mut poll = self.poll.lock().map_err(|_| SyncError::NotificationFailed)?;
        let mut events = Events::with_capacity(1);

        match poll.poll(&mut events, timeout) {
            Ok(()) => {}
            Err(e) if e.kind() == ErrorKind::Interrupted => return Ok(false),
            Err(_) => return Err(SyncError::NotificationFailed),
        }

        for event in events.iter() {
            if event.token() == EVENTFD_TOKEN && event.is_readable() {
                self.drain();
                return Ok(true);
            }
        }

        Ok(false)
    }

    /// Reset the eventfd counter so the next notify produces a new edge
    fn drain(&self) {
        let mut buf = [0u8; 8];
        let _ = read(self.event_fd.as_raw_fd(), &mut buf);
    }

    /// Get the file descriptor for external polling
    pub fn event_fd(&self) -> RawFd {
        self.event_fd.as_raw_fd()
    }

    /// Enable or disable notifications
    pub fn set_enabled(&self, enabled: bool) {
        self.enabled.store(enabled, Ordering::Relaxed);
    }

    /// Check if notifications are enabled
    pub fn is_enabled(&self) -> bool {
        self.enabled.load(Ordering::Relaxed)
    }

    /// Get notification statistics
    pub fn stats(&self) -> NotificationStats {
        NotificationStats {
            notify_count: self.notify_count.load(Ordering::Relaxed),
            wait_count: self.wait_count.load(Ordering::Relaxed),
            enabled: self.is_enabled(),
        }
    }
}

/// Statistics for event notifications
#[derive(Debug, Clone)]
pub struct NotificationStats {
    /// Number of notifications sent
    pub notify_count: u64,
    /// Number of waits performed
    pub wait_count: u64,
    /// Whether notifications are currently enabled
    pub enabled: bool,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::{sync::Arc, thread};

    #[test]
    fn test_wait_times_out_without_notify() {
        let notifier = EventNotifier::new().unwrap();
        let woke = notifier.wait(Some(Duration::from_millis(10))).unwrap();
        assert!(!woke);
    }

    #[test]
    fn test_pending_notify_wakes_next_wait() {
        let notifier = EventNotifier::new().unwrap();
        notifier.notify().unwrap();
        notifier.notify().unwrap();

        assert!(notifier.wait(Some(Duration::from_secs(1))).unwrap());
        // Both notifies collapsed into one wakeup
        assert!(!notifier.wait(Some(Duration::from_millis(10))).unwrap());

        let stats = notifier.stats();
        assert_eq!(stats.notify_count, 2);
        assert_eq!(stats.wait_count, 2);
    }

    #[test]
    fn test_cross_thread_wakeup() {
        let notifier = Arc::new(EventNotifier::new().unwrap());

        let waiter = {
            let notifier = notifier.clone();
            thread::spawn(move || notifier.wait(Some(Duration::from_secs(5))).unwrap())
        };

        thread::sleep(Duration::from_millis(20));
        notifier.notify().unwrap();
        assert!(waiter.join().unwrap());
    }

    #[test]
    fn test_disabled_notifier_is_silent() {
        let notifier = EventNotifier::new().unwrap();
        notifier.set_enabled(false);
        notifier.notify().unwrap();

        assert!(!notifier.wait(Some(Duration::from_millis(10))).unwrap());
        assert_eq!(notifier.stats().notify_count, 0);
    }
}
