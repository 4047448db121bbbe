//! The referee: the match lifecycle's barrier keeper.
//!
//! The referee never forms teams; it drives the two gates the entities park
//! at. Its channel contract is exact counts, drained fully before any phase
//! advance — one short of the roster on either barrier and the whole
//! simulation deadlocks, which is the accepted failure mode of the model:
//!
//! 1. wait on `referee_wait_teams` once per team (two teams);
//! 2. post `kickoff` once per rostered entity, then drain the same number of
//!    `ready` acknowledgments before the match counts as started;
//! 3. referee the match for the modeled duration;
//! 4. post `match_over` once per rostered entity.

use std::time::Duration;

use crate::arena::Arena;
use crate::error::RendezvousError;
use crate::state::RefereePhase;
use crate::sync::Arc;

/// Number of teams a match needs; the protocol handles exactly this many.
pub const TEAMS_PER_MATCH: u32 = 2;

/// The referee driver.
#[derive(Debug)]
pub struct Referee {
    arena: Arc<Arena>,
    match_duration: Duration,
}

impl Referee {
    /// Creates the referee for one match.
    #[must_use]
    pub fn new(arena: Arc<Arena>, match_duration: Duration) -> Self {
        Self {
            arena,
            match_duration,
        }
    }

    /// Entities rostered across both teams, i.e. the exact number of permits
    /// each gate must see.
    fn roster_size(&self) -> u32 {
        let quotas = self.arena.with_state(|st| st.quotas());
        TEAMS_PER_MATCH * (quotas.goalies + quotas.players)
    }

    /// The full match lifecycle.
    pub fn run(&self) -> Result<(), RendezvousError> {
        self.wait_for_teams()?;
        self.start_match()?;
        self.play();
        self.end_match()?;
        Ok(())
    }

    /// Blocks until both teams have reported formation.
    pub fn wait_for_teams(&self) -> Result<(), RendezvousError> {
        self.arena
            .with_state(|st| st.set_referee_phase(RefereePhase::WaitingTeams));
        for _ in 0..TEAMS_PER_MATCH {
            self.arena.channels().referee_wait_teams.wait()?;
        }
        Ok(())
    }

    /// Releases every entity past the kickoff gate, then collects every
    /// readiness acknowledgment before declaring the match started.
    pub fn start_match(&self) -> Result<(), RendezvousError> {
        self.arena
            .with_state(|st| st.set_referee_phase(RefereePhase::StartingMatch));
        let roster = self.roster_size();
        let channels = self.arena.channels();
        for _ in 0..roster {
            channels.kickoff.post()?;
        }
        for _ in 0..roster {
            channels.ready.wait()?;
        }
        tracing::debug!(roster, "match started");
        Ok(())
    }

    /// Referees for the modeled match duration.
    pub fn play(&self) {
        self.arena
            .with_state(|st| st.set_referee_phase(RefereePhase::Refereeing));
        if !self.match_duration.is_zero() {
            std::thread::sleep(self.match_duration);
        }
    }

    /// Releases every entity past the match-end gate.
    pub fn end_match(&self) -> Result<(), RendezvousError> {
        self.arena
            .with_state(|st| st.set_referee_phase(RefereePhase::EndingMatch));
        let roster = self.roster_size();
        for _ in 0..roster {
            self.arena.channels().match_over.post()?;
        }
        self.arena
            .with_state(|st| st.set_referee_phase(RefereePhase::MatchOver));
        tracing::debug!("match over");
        Ok(())
    }
}
