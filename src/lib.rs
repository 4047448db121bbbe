//! # pitch-rendezvous
//!
//! A multi-party rendezvous protocol, written as a library: independent
//! entities (field players, goalies, a referee) arrive asynchronously,
//! self-organize into two fixed-size teams, and run through a scripted match
//! lifecycle — coordinated purely through one mutex-guarded shared segment
//! and a fixed set of counting-semaphore channels. No messages, no queues of
//! commands; just counters, phases, and directed wakeups.
//!
//! The interesting part is team formation: entities race to update shared
//! counters, and whichever entity's registration tips both per-role quotas
//! over their thresholds becomes the *arbiter* for that team — it reserves
//! the slots, hands the fresh team id to each waiting member one
//! acknowledgment at a time, and reports the team to the referee. The
//! arbiter role is acquired dynamically inside a single critical section;
//! there is no leader process and no election.
//!
//! # Quick start
//!
//! ```
//! use pitch_rendezvous::SimulationBuilder;
//! use std::time::Duration;
//!
//! let report = SimulationBuilder::new()
//!     .with_quotas(1, 5)
//!     .with_population(2, 10)
//!     .with_max_arrival_delay(Duration::ZERO)
//!     .with_match_duration(Duration::ZERO)
//!     .start()
//!     .unwrap()
//!     .run()
//!     .unwrap();
//!
//! assert_eq!(report.teams_formed, 2);
//! assert_eq!(report.late_count(), 0);
//! ```
//!
//! # Failure model
//!
//! Closed world: every participant runs to completion, no timeouts, no crash
//! tolerance. The only runtime failure the protocol recognizes is a channel
//! operation failing ([`RendezvousError::ChannelClosed`]), and that is always
//! fatal to the participant that observes it.

#![forbid(unsafe_code)]
#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]

use std::time::Duration;

pub use arena::Arena;
pub use builder::{Simulation, SimulationBuilder, SimulationReport};
pub use entity::Entity;
pub use error::RendezvousError;
pub use observer::{CollectingObserver, NullObserver, StateObserver, TracingObserver};
pub use referee::{Referee, TEAMS_PER_MATCH};
pub use state::{EntityPhase, RefereePhase, StateSnapshot};

pub mod arena;
#[doc(hidden)]
pub mod builder;
pub mod channels;
pub mod entity;
#[doc(hidden)]
pub mod error;
mod formation;
#[doc(hidden)]
pub mod observer;
#[doc(hidden)]
pub mod referee;
pub mod rng;
pub mod semaphore;
#[doc(hidden)]
pub mod state;
#[doc(hidden)]
pub mod sync;

/// A formed team's identifier.
///
/// Ids are dense: the `k` teams of a run are exactly `0, 1, ..., k-1`,
/// strictly in reservation order, never reused or skipped. An entity that
/// arrives too late for either team has no id at all (`Option::None` at the
/// API surface), rather than a sentinel value.
///
/// # Type Safety
///
/// `TeamId` is a newtype wrapper around `u32` so team identifiers cannot be
/// confused with the formation counters they are derived from.
#[derive(
    Debug,
    Copy,
    Clone,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Default,
    serde::Serialize,
    serde::Deserialize,
)]
pub struct TeamId(u32);

impl TeamId {
    /// Creates a `TeamId` from a raw index.
    #[inline]
    #[must_use]
    pub const fn new(id: u32) -> Self {
        TeamId(id)
    }

    /// Returns the underlying `u32` value.
    #[inline]
    #[must_use]
    pub const fn as_u32(self) -> u32 {
        self.0
    }
}

impl std::fmt::Display for TeamId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u32> for TeamId {
    #[inline]
    fn from(value: u32) -> Self {
        TeamId(value)
    }
}

impl From<TeamId> for u32 {
    #[inline]
    fn from(team: TeamId) -> Self {
        team.0
    }
}

/// The two field roles the formation quotas count separately.
///
/// The referee is not a [`Role`]: it never joins a team and never contributes
/// to a quota.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    /// Guards the goal; typically one per team.
    Goalie,
    /// Plays the field; typically several per team.
    FieldPlayer,
}

impl Role {
    /// Short lowercase label, used for thread names and log fields.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Role::Goalie => "goalie",
            Role::FieldPlayer => "player",
        }
    }
}

/// Per-team slot quotas for both roles.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub struct Quotas {
    /// Goalies required to complete one team.
    pub goalies: u32,
    /// Field players required to complete one team.
    pub players: u32,
}

impl Quotas {
    /// Creates a quota pair.
    #[inline]
    #[must_use]
    pub const fn new(goalies: u32, players: u32) -> Self {
        Self { goalies, players }
    }

    /// The quota counted against one role.
    #[inline]
    #[must_use]
    pub const fn for_role(self, role: Role) -> u32 {
        match role {
            Role::Goalie => self.goalies,
            Role::FieldPlayer => self.players,
        }
    }

    /// Total entities rostered on one team.
    #[inline]
    #[must_use]
    pub const fn team_size(self) -> u32 {
        self.goalies + self.players
    }
}

/// Validated parameters of one simulation run.
///
/// Normally produced by [`SimulationBuilder`]; constructible directly for
/// tests that drive the arena by hand.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct SimulationConfig {
    /// Per-team quotas.
    pub quotas: Quotas,
    /// Goalies to spawn.
    pub num_goalies: usize,
    /// Field players to spawn.
    pub num_players: usize,
    /// Upper bound of the uniform arrival delay; zero disables jitter.
    pub max_arrival_delay: Duration,
    /// Modeled duration between kickoff and the match-end signal.
    pub match_duration: Duration,
}

impl SimulationConfig {
    /// A config with the given quotas and populations and no modeled delays.
    #[must_use]
    pub const fn new(quotas: Quotas, num_goalies: usize, num_players: usize) -> Self {
        Self {
            quotas,
            num_goalies,
            num_players,
            max_arrival_delay: Duration::ZERO,
            match_duration: Duration::ZERO,
        }
    }
}

#[cfg(all(test, not(loom)))]
mod tests {
    use super::*;

    #[test]
    fn team_id_roundtrip() {
        let team = TeamId::new(3);
        assert_eq!(team.as_u32(), 3);
        assert_eq!(u32::from(team), 3);
        assert_eq!(TeamId::from(3u32), team);
        assert_eq!(format!("{team}"), "3");
    }

    #[test]
    fn team_id_ordering_matches_u32() {
        assert!(TeamId::new(0) < TeamId::new(1));
        assert_eq!(TeamId::new(2), TeamId::new(2));
    }

    #[test]
    fn quotas_for_role() {
        let quotas = Quotas::new(1, 5);
        assert_eq!(quotas.for_role(Role::Goalie), 1);
        assert_eq!(quotas.for_role(Role::FieldPlayer), 5);
        assert_eq!(quotas.team_size(), 6);
    }

    #[test]
    fn role_labels() {
        assert_eq!(Role::Goalie.label(), "goalie");
        assert_eq!(Role::FieldPlayer.label(), "player");
    }

    #[test]
    fn config_defaults_to_zero_delays() {
        let config = SimulationConfig::new(Quotas::new(1, 5), 2, 10);
        assert_eq!(config.max_arrival_delay, Duration::ZERO);
        assert_eq!(config.match_duration, Duration::ZERO);
    }
}
