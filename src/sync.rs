//! Synchronization primitives abstraction for loom testing compatibility.
//!
//! This module provides a unified interface to the mutex/condvar pair the
//! protocol is built on, working with both production code (using
//! `parking_lot` for performance) and loom tests (using `loom::sync` for
//! model checking).
//!
//! # Usage
//!
//! Import from this module instead of directly from `parking_lot` or `std::sync`:
//!
//! ```ignore
//! // Instead of:
//! use parking_lot::{Condvar, Mutex};
//! use std::sync::Arc;
//!
//! // Use:
//! use crate::sync::{Arc, Condvar, Mutex};
//! ```
//!
//! # Loom Testing
//!
//! Run loom tests from the isolated `loom-tests/` crate:
//! ```bash
//! cd loom-tests
//! RUSTFLAGS="--cfg loom" cargo test --release
//! ```
//!
//! The two backends expose slightly different APIs (`loom` mirrors `std` with
//! poisoning, `parking_lot` does not poison; `parking_lot::Condvar::wait`
//! borrows the guard while loom's consumes and returns it). [`Mutex`] and
//! [`Condvar`] here normalize both to the `parking_lot` shape so protocol
//! code is written once.

#[cfg(loom)]
mod inner {
    pub use loom::sync::Arc;
    pub use loom::thread;

    /// Yield to the loom scheduler. This is important for testing spin-loops
    /// and other constructs that assume fair scheduling.
    #[inline]
    #[allow(dead_code)] // May not be used in all loom tests
    pub fn yield_now() {
        loom::thread::yield_now();
    }

    /// Mutex facade over `loom::sync::Mutex`.
    ///
    /// Loom mutexes poison on panic like `std`; our models never panic while
    /// holding a lock, so poisoning is treated as unreachable.
    #[derive(Debug)]
    pub struct Mutex<T>(loom::sync::Mutex<T>);

    pub use loom::sync::MutexGuard;

    impl<T> Mutex<T> {
        pub fn new(value: T) -> Self {
            Self(loom::sync::Mutex::new(value))
        }

        #[allow(clippy::unwrap_used)] // loom models never poison (no panics under lock)
        pub fn lock(&self) -> MutexGuard<'_, T> {
            self.0.lock().unwrap()
        }
    }

    /// Condvar facade over `loom::sync::Condvar`.
    #[derive(Debug)]
    pub struct Condvar(loom::sync::Condvar);

    impl Condvar {
        pub fn new() -> Self {
            Self(loom::sync::Condvar::new())
        }

        #[allow(clippy::unwrap_used)] // loom models never poison (no panics under lock)
        pub fn wait<'a, T>(&self, guard: MutexGuard<'a, T>) -> MutexGuard<'a, T> {
            self.0.wait(guard).unwrap()
        }

        pub fn notify_one(&self) {
            self.0.notify_one();
        }

        pub fn notify_all(&self) {
            self.0.notify_all();
        }
    }
}

/// In production, use parking_lot for performance
#[cfg(not(loom))]
mod inner {
    pub use std::sync::Arc;
    #[allow(unused_imports)] // Used for loom compatibility abstraction
    pub use std::thread;

    /// No-op in production - only meaningful under loom
    #[inline]
    #[allow(dead_code)] // Used via loom compatibility abstraction in tests
    pub fn yield_now() {
        std::thread::yield_now();
    }

    /// Mutex facade over `parking_lot::Mutex` (no poisoning).
    #[derive(Debug, Default)]
    pub struct Mutex<T>(parking_lot::Mutex<T>);

    pub use parking_lot::MutexGuard;

    impl<T> Mutex<T> {
        pub fn new(value: T) -> Self {
            Self(parking_lot::Mutex::new(value))
        }

        pub fn lock(&self) -> MutexGuard<'_, T> {
            self.0.lock()
        }
    }

    /// Condvar facade over `parking_lot::Condvar`.
    ///
    /// Takes and returns the guard by value so the call site reads the same
    /// under both backends.
    #[derive(Debug, Default)]
    pub struct Condvar(parking_lot::Condvar);

    impl Condvar {
        pub fn new() -> Self {
            Self(parking_lot::Condvar::new())
        }

        pub fn wait<'a, T>(&self, guard: MutexGuard<'a, T>) -> MutexGuard<'a, T> {
            let mut guard = guard;
            self.0.wait(&mut guard);
            guard
        }

        pub fn notify_one(&self) {
            self.0.notify_one();
        }

        pub fn notify_all(&self) {
            self.0.notify_all();
        }
    }
}

// Re-export at module level for convenience
pub(crate) use inner::*;

/// Run a loom model test. Under loom, this explores all possible
/// thread interleavings. In production, it just runs the closure once.
#[cfg(loom)]
#[allow(dead_code)] // Available for loom tests in tests/ or loom-tests/
pub fn model<F>(f: F)
where
    F: Fn() + Sync + Send + 'static,
{
    loom::model(f);
}

/// In production, just run the closure once
#[cfg(not(loom))]
#[allow(dead_code)] // Available for production code that wants loom-compatible testing
pub fn model<F>(f: F)
where
    F: FnOnce(),
{
    f();
}
