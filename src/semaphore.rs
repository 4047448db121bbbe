//! Counting semaphore used for every directed wake-up channel in the protocol.
//!
//! The channel contract is that of an OS counting semaphore: a signal with
//! no waiter banks a permit, and every permit satisfies exactly one future
//! wait. [`Semaphore`] reproduces those semantics on a mutex/condvar pair so
//! the same contract holds in-process:
//!
//! - [`post`](Semaphore::post) never loses a signal, even with no waiter parked;
//! - [`wait`](Semaphore::wait) consumes exactly one permit, tolerating spurious
//!   condvar wakeups;
//! - release order among parked waiters is unspecified (the protocol depends
//!   only on counts, never on which waiter ran first).
//!
//! There is no timeout variant. A waiter that never receives its permit blocks
//! forever; the protocol treats the participant set as closed and complete.
//!
//! # Failure model
//!
//! [`close`](Semaphore::close) retires the channel: every parked waiter wakes
//! with [`RendezvousError::ChannelClosed`] and every later operation fails the
//! same way. This is the in-process rendition of a semaphore operation failing
//! at the OS boundary, which the protocol treats as fatal, and it is what lets
//! a test harness tear down a wedged simulation instead of hanging.

use crate::error::RendezvousError;
use crate::sync::{Condvar, Mutex};

#[derive(Debug)]
struct Permits {
    available: u32,
    closed: bool,
}

/// A loss-free counting semaphore with a named identity for error reports.
#[derive(Debug)]
pub struct Semaphore {
    name: &'static str,
    permits: Mutex<Permits>,
    wakeup: Condvar,
}

impl Semaphore {
    /// Creates a semaphore with zero permits.
    ///
    /// The name identifies the channel in [`RendezvousError::ChannelClosed`]
    /// and in trace output; each channel in the protocol has exactly one.
    #[must_use]
    pub fn new(name: &'static str) -> Self {
        Self {
            name,
            permits: Mutex::new(Permits {
                available: 0,
                closed: false,
            }),
            wakeup: Condvar::new(),
        }
    }

    /// The channel name this semaphore was created with.
    #[must_use]
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Banks one permit and wakes at most one parked waiter.
    pub fn post(&self) -> Result<(), RendezvousError> {
        let mut permits = self.permits.lock();
        if permits.closed {
            return Err(RendezvousError::ChannelClosed { channel: self.name });
        }
        permits.available += 1;
        drop(permits);
        self.wakeup.notify_one();
        Ok(())
    }

    /// Blocks until a permit is available, then consumes it.
    pub fn wait(&self) -> Result<(), RendezvousError> {
        let mut permits = self.permits.lock();
        loop {
            if permits.closed {
                return Err(RendezvousError::ChannelClosed { channel: self.name });
            }
            if permits.available > 0 {
                permits.available -= 1;
                return Ok(());
            }
            permits = self.wakeup.wait(permits);
        }
    }

    /// Retires the channel. All parked and future waiters observe
    /// [`RendezvousError::ChannelClosed`]; banked permits are discarded.
    ///
    /// Closing an already-closed semaphore is a no-op.
    pub fn close(&self) {
        let mut permits = self.permits.lock();
        permits.closed = true;
        drop(permits);
        self.wakeup.notify_all();
    }

    /// Number of banked permits right now. Diagnostic only: the value may be
    /// stale by the time the caller looks at it.
    #[must_use]
    pub fn available(&self) -> u32 {
        self.permits.lock().available
    }
}
