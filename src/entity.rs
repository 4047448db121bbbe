//! The entity state-machine driver: one goalie or field player's life cycle.
//!
//! An entity's whole run is four phases, each a short critical region on the
//! arena followed by at most one blocking channel wait:
//!
//! 1. [`arrive`](Entity::arrive) — announce, then a random travel delay;
//! 2. [`constitute_team`](Entity::constitute_team) — the formation protocol
//!    ([`formation`](crate::formation));
//! 3. [`wait_referee`](Entity::wait_referee) — kickoff gate, then echo
//!    readiness back to the referee;
//! 4. [`play_until_end`](Entity::play_until_end) — match-end gate, then done.
//!
//! A late entity skips phases 3 and 4 entirely. Any channel error aborts the
//! run immediately; there is no mechanism to rejoin a half-run match.

use std::time::Duration;

use crate::arena::Arena;
use crate::error::RendezvousError;
use crate::formation;
use crate::rng::Pcg32;
use crate::state::EntityPhase;
use crate::sync::Arc;
use crate::{Role, TeamId};

/// One field participant: a goalie or a field player.
#[derive(Debug)]
pub struct Entity {
    id: usize,
    role: Role,
    arena: Arc<Arena>,
    max_arrival_delay: Duration,
    rng: Pcg32,
}

impl Entity {
    /// Creates an entity with identity `id` within its role's population.
    ///
    /// The id is validated against the arena's phase table up front; an
    /// invalid identity must fail before any protocol state is touched.
    pub fn new(
        id: usize,
        role: Role,
        arena: Arc<Arena>,
        max_arrival_delay: Duration,
        seed: u64,
    ) -> Result<Self, RendezvousError> {
        let population = arena.with_state(|st| st.population(role));
        if id >= population {
            return Err(RendezvousError::InvalidEntityId {
                id,
                max: population.saturating_sub(1),
            });
        }
        Ok(Self {
            id,
            role,
            arena,
            max_arrival_delay,
            rng: Pcg32::seed_from_u64(seed),
        })
    }

    /// This entity's identity index.
    #[must_use]
    pub fn id(&self) -> usize {
        self.id
    }

    /// This entity's role.
    #[must_use]
    pub fn role(&self) -> Role {
        self.role
    }

    /// The full life cycle. Returns the team played for, or `None` if late.
    pub fn run(&mut self) -> Result<Option<TeamId>, RendezvousError> {
        self.arrive();
        match self.constitute_team()? {
            Some(team) => {
                self.wait_referee(team)?;
                self.play_until_end(team)?;
                Ok(Some(team))
            }
            None => Ok(None),
        }
    }

    /// Announces arrival, then models travel time with a bounded random delay.
    ///
    /// The delay is pure scheduling perturbation: it shuffles arrival
    /// interleavings so the formation protocol gets exercised under varied
    /// orders, and contributes nothing to correctness.
    pub fn arrive(&mut self) {
        let (role, id) = (self.role, self.id);
        self.arena
            .with_state(|st| st.set_phase(role, id, EntityPhase::Arriving));
        let max = u32::try_from(self.max_arrival_delay.as_millis()).unwrap_or(u32::MAX);
        if max > 0 {
            let jitter = self.rng.gen_range(max + 1);
            std::thread::sleep(Duration::from_millis(u64::from(jitter)));
        }
    }

    /// The team-constitution phase; see [`formation`](crate::formation).
    pub fn constitute_team(&self) -> Result<Option<TeamId>, RendezvousError> {
        formation::constitute_team(&self.arena, self.role, self.id)
    }

    /// Parks at the kickoff gate, then echoes readiness back to the referee.
    ///
    /// Two-phase barrier: the referee releases the gate once per rostered
    /// entity and then drains one `ready` acknowledgment per entity before
    /// declaring the match started.
    pub fn wait_referee(&self, team: TeamId) -> Result<(), RendezvousError> {
        let (role, id) = (self.role, self.id);
        self.arena
            .with_state(|st| st.set_phase(role, id, EntityPhase::WaitingStart(team)));
        let channels = self.arena.channels();
        channels.kickoff.wait()?;
        channels.ready.post()?;
        Ok(())
    }

    /// Plays until the referee releases the match-end gate.
    pub fn play_until_end(&self, team: TeamId) -> Result<(), RendezvousError> {
        let (role, id) = (self.role, self.id);
        self.arena
            .with_state(|st| st.set_phase(role, id, EntityPhase::Playing(team)));
        self.arena.channels().match_over.wait()?;
        Ok(())
    }
}

#[cfg(all(test, not(loom)))]
mod tests {
    use super::*;
    use crate::observer::CollectingObserver;
    use crate::{Quotas, SimulationConfig};
    use std::thread;

    fn arena(observer: Arc<CollectingObserver>) -> Arc<Arena> {
        let config = SimulationConfig::new(Quotas::new(1, 1), 1, 1);
        Arena::new(&config, observer)
    }

    #[test]
    fn invalid_identity_is_rejected_before_protocol_state() {
        let observer = Arc::new(CollectingObserver::new());
        let arena = arena(observer.clone());
        let err = Entity::new(5, Role::Goalie, arena, Duration::ZERO, 0).unwrap_err();
        assert_eq!(err, RendezvousError::InvalidEntityId { id: 5, max: 0 });
        assert!(observer.is_empty(), "no state was touched");
    }

    #[test]
    fn arrive_publishes_arriving_phase() {
        let observer = Arc::new(CollectingObserver::new());
        let arena = arena(observer.clone());
        let mut goalie = Entity::new(0, Role::Goalie, arena, Duration::ZERO, 0).unwrap();
        goalie.arrive();
        let last = observer.last().unwrap();
        assert_eq!(last.goalies[0], EntityPhase::Arriving);
    }

    #[test]
    fn kickoff_gate_echoes_readiness() {
        let observer = Arc::new(CollectingObserver::new());
        let arena = arena(observer);
        let goalie = Entity::new(0, Role::Goalie, arena.clone(), Duration::ZERO, 0).unwrap();
        let team = TeamId::new(0);

        let gate = thread::spawn(move || goalie.wait_referee(team));
        arena.channels().kickoff.post().unwrap();
        gate.join().unwrap().unwrap();
        // Readiness echoed exactly once.
        assert_eq!(arena.channels().ready.available(), 1);
        arena.with_state(|st| {
            assert_eq!(st.phase(Role::Goalie, 0), EntityPhase::WaitingStart(team));
        });
    }

    #[test]
    fn play_until_end_blocks_on_match_over() {
        let observer = Arc::new(CollectingObserver::new());
        let arena = arena(observer);
        let goalie = Entity::new(0, Role::Goalie, arena.clone(), Duration::ZERO, 0).unwrap();
        let team = TeamId::new(0);

        let playing = thread::spawn(move || goalie.play_until_end(team));
        thread::sleep(Duration::from_millis(20));
        assert!(!playing.is_finished(), "must hold until the end signal");
        arena.channels().match_over.post().unwrap();
        playing.join().unwrap().unwrap();
    }
}
