//! The arena: one mutex-guarded shared segment plus the channel set.
//!
//! Every participant holds an `Arc<Arena>`; it plays the role a process-shared
//! memory mapping would, with raw access replaced by a guarded scope.
//! [`Arena::with_state`] is the only way to touch
//! [`SharedState`]: lock, run the closure, publish a snapshot if the closure
//! dirtied the segment, unlock. No channel operation is possible inside the
//! scope because the channels are only reachable through
//! [`Arena::channels`], outside the lock — the "never hold the mutex across
//! an unbounded wait" rule is structural rather than disciplinary.

use crate::channels::ChannelSet;
use crate::observer::StateObserver;
use crate::state::SharedState;
use crate::sync::{Arc, Mutex};
use crate::SimulationConfig;

/// Shared segment, channel set and state logger of one simulation.
///
/// The observer is held in a plain `std::sync::Arc`: it is logging, not
/// protocol state, and stays outside the loom-modeled primitives.
pub struct Arena {
    state: Mutex<SharedState>,
    channels: ChannelSet,
    observer: std::sync::Arc<dyn StateObserver>,
}

impl std::fmt::Debug for Arena {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Arena")
            .field("channels", &self.channels)
            .finish_non_exhaustive()
    }
}

impl Arena {
    /// Creates the arena for one simulation run.
    #[must_use]
    pub fn new(config: &SimulationConfig, observer: std::sync::Arc<dyn StateObserver>) -> Arc<Self> {
        Arc::new(Self {
            state: Mutex::new(SharedState::new(
                config.quotas,
                config.num_goalies,
                config.num_players,
            )),
            channels: ChannelSet::new(),
            observer,
        })
    }

    /// Runs `f` with exclusive access to the shared segment.
    ///
    /// If the closure changed an observable phase, the observer receives a
    /// consistency snapshot before the lock is released, so the recorded
    /// sequence is the exact mutation order.
    pub fn with_state<R>(&self, f: impl FnOnce(&mut SharedState) -> R) -> R {
        let mut state = self.state.lock();
        let result = f(&mut state);
        if state.take_dirty() {
            let snapshot = state.snapshot();
            self.observer.record(&snapshot);
        }
        result
    }

    /// The wake-up channels. Only reachable outside [`with_state`] scopes.
    #[must_use]
    pub fn channels(&self) -> &ChannelSet {
        &self.channels
    }

    /// Retires every channel, unblocking all parked participants with a fatal
    /// error. Used by the harness to tear down a simulation that cannot
    /// complete; a healthy run never calls this before the match ends.
    pub fn close(&self) {
        tracing::debug!("closing arena channels");
        self.channels.close_all();
    }
}
