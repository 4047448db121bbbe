//! The fixed set of single-purpose wake-up channels the protocol runs on.
//!
//! One channel per hand-off, never multiplexed:
//!
//! | channel              | posted by              | waited on by             |
//! |----------------------|------------------------|--------------------------|
//! | `players_wait_team`  | arbiter                | field players waiting    |
//! | `goalies_wait_team`  | arbiter                | goalies waiting          |
//! | `member_registered`  | each released member   | arbiter (one per release)|
//! | `referee_wait_teams` | arbiter (once per team)| referee (twice)          |
//! | `kickoff`            | referee (per entity)   | every rostered entity    |
//! | `ready`              | each released entity   | referee (per entity)     |
//! | `match_over`         | referee (per entity)   | every playing entity     |
//!
//! The protocol mutex is not here; it lives in [`Arena`](crate::arena::Arena)
//! and is never held across a wait on any of these.

use crate::semaphore::Semaphore;
use crate::Role;

/// All directed channels of one simulation, created together, closed together.
#[derive(Debug)]
pub struct ChannelSet {
    /// Arbiter → waiting field players: a team slot is yours.
    pub players_wait_team: Semaphore,
    /// Arbiter → waiting goalies: a team slot is yours.
    pub goalies_wait_team: Semaphore,
    /// Released member → arbiter: registration acknowledged, release the next.
    pub member_registered: Semaphore,
    /// Arbiter → referee: one team fully formed.
    pub referee_wait_teams: Semaphore,
    /// Referee → entities: kickoff gate.
    pub kickoff: Semaphore,
    /// Entity → referee: past the kickoff gate, ready to play.
    pub ready: Semaphore,
    /// Referee → entities: match-end gate.
    pub match_over: Semaphore,
}

impl ChannelSet {
    /// Creates the full set with zero permits everywhere.
    #[must_use]
    pub fn new() -> Self {
        Self {
            players_wait_team: Semaphore::new("players_wait_team"),
            goalies_wait_team: Semaphore::new("goalies_wait_team"),
            member_registered: Semaphore::new("member_registered"),
            referee_wait_teams: Semaphore::new("referee_wait_teams"),
            kickoff: Semaphore::new("kickoff"),
            ready: Semaphore::new("ready"),
            match_over: Semaphore::new("match_over"),
        }
    }

    /// The team-call channel for one role.
    #[must_use]
    pub fn wait_team(&self, role: Role) -> &Semaphore {
        match role {
            Role::Goalie => &self.goalies_wait_team,
            Role::FieldPlayer => &self.players_wait_team,
        }
    }

    /// Retires every channel, waking all parked waiters with
    /// [`ChannelClosed`](crate::RendezvousError::ChannelClosed).
    pub fn close_all(&self) {
        self.players_wait_team.close();
        self.goalies_wait_team.close();
        self.member_registered.close();
        self.referee_wait_teams.close();
        self.kickoff.close();
        self.ready.close();
        self.match_over.close();
    }
}

impl Default for ChannelSet {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(all(test, not(loom)))]
mod tests {
    use super::*;

    #[test]
    fn wait_team_routes_by_role() {
        let channels = ChannelSet::new();
        assert_eq!(channels.wait_team(Role::Goalie).name(), "goalies_wait_team");
        assert_eq!(
            channels.wait_team(Role::FieldPlayer).name(),
            "players_wait_team"
        );
    }

    #[test]
    fn close_all_retires_every_channel() {
        let channels = ChannelSet::new();
        channels.close_all();
        assert!(channels.kickoff.post().is_err());
        assert!(channels.match_over.wait().is_err());
        assert!(channels.member_registered.post().is_err());
    }
}
