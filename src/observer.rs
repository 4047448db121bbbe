//! Append-only state logging for the rendezvous.
//!
//! Every critical region that changes an observable phase ends by handing the
//! full status table to a logger. The contract is a trait: the arena invokes
//! [`StateObserver::record`] with a consistent snapshot, still under the
//! protocol mutex, so the recorded sequence is a total order of the
//! simulation's observable states. Observers must therefore be cheap and must
//! never block on protocol channels.
//!
//! Three implementations cover the usual needs:
//!
//! - [`TracingObserver`] logs each snapshot through `tracing` (the default);
//! - [`CollectingObserver`] accumulates snapshots for tests to assert on;
//! - [`NullObserver`] discards everything (benchmarks, quiet runs).

use crate::state::StateSnapshot;
use parking_lot::Mutex;

/// Accepts a full snapshot of the shared status table, in mutation order.
///
/// Called with the protocol mutex held; implementations must not wait on any
/// rendezvous channel or re-enter the arena.
pub trait StateObserver: Send + Sync {
    /// Records one snapshot. Failures are the observer's own problem: the
    /// protocol has no structured error path back from logging, so logger
    /// trouble stays out-of-band.
    fn record(&self, snapshot: &StateSnapshot);
}

impl std::fmt::Debug for dyn StateObserver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("StateObserver")
    }
}

/// Logs every snapshot at `debug` level via `tracing`.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingObserver;

impl StateObserver for TracingObserver {
    fn record(&self, snapshot: &StateSnapshot) {
        tracing::debug!(
            goalies_arrived = snapshot.goalies_arrived,
            players_arrived = snapshot.players_arrived,
            goalies_free = snapshot.goalies_free,
            players_free = snapshot.players_free,
            teams_formed = snapshot.teams_formed,
            referee = ?snapshot.referee,
            goalies = ?snapshot.goalies,
            players = ?snapshot.players,
            "state"
        );
    }
}

/// Collects every snapshot for later inspection. Intended for tests.
#[derive(Debug, Default)]
pub struct CollectingObserver {
    snapshots: Mutex<Vec<StateSnapshot>>,
}

impl CollectingObserver {
    /// Creates an empty collector.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// All snapshots recorded so far, in mutation order.
    #[must_use]
    pub fn snapshots(&self) -> Vec<StateSnapshot> {
        self.snapshots.lock().clone()
    }

    /// Number of snapshots recorded so far.
    #[must_use]
    pub fn len(&self) -> usize {
        self.snapshots.lock().len()
    }

    /// Whether nothing has been recorded yet.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.snapshots.lock().is_empty()
    }

    /// The most recent snapshot, if any.
    #[must_use]
    pub fn last(&self) -> Option<StateSnapshot> {
        self.snapshots.lock().last().cloned()
    }
}

impl StateObserver for CollectingObserver {
    fn record(&self, snapshot: &StateSnapshot) {
        self.snapshots.lock().push(snapshot.clone());
    }
}

/// Discards every snapshot.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullObserver;

impl StateObserver for NullObserver {
    fn record(&self, _snapshot: &StateSnapshot) {}
}

#[cfg(all(test, not(loom)))]
mod tests {
    use super::*;
    use crate::state::{EntityPhase, RefereePhase};

    fn snapshot(teams: u32) -> StateSnapshot {
        StateSnapshot {
            goalies: vec![EntityPhase::Idle; 2],
            players: vec![EntityPhase::Idle; 10],
            referee: RefereePhase::Idle,
            goalies_arrived: 0,
            players_arrived: 0,
            goalies_free: 0,
            players_free: 0,
            teams_formed: teams,
        }
    }

    #[test]
    fn collecting_observer_keeps_order() {
        let observer = CollectingObserver::new();
        assert!(observer.is_empty());
        observer.record(&snapshot(0));
        observer.record(&snapshot(1));
        let seen = observer.snapshots();
        assert_eq!(seen.len(), 2);
        assert_eq!(seen[0].teams_formed, 0);
        assert_eq!(seen[1].teams_formed, 1);
        assert_eq!(observer.last().map(|s| s.teams_formed), Some(1));
    }

    #[test]
    fn null_observer_accepts_anything() {
        NullObserver.record(&snapshot(7));
    }

    #[cfg(feature = "json")]
    #[test]
    fn snapshot_serializes_to_json() {
        let json = snapshot(2).to_json().unwrap();
        assert!(json.contains("\"teams_formed\":2"));
    }
}
