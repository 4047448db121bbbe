//! The shared state segment all participants mutate under the arena mutex.
//!
//! Per-entity phase tables, the formation counters the arbiter decision
//! reads, and the team-id allocator, laid out the way a memory-mapped shared
//! segment would be. Nothing in this module synchronizes by itself; every
//! access goes through
//! [`Arena::with_state`](crate::arena::Arena::with_state), which holds the one
//! protocol mutex for the duration of the closure.
//!
//! The pair of per-role call queues ([`SharedState::enqueue_calls`] /
//! [`SharedState::take_call`]) exists because publishing a freshly claimed
//! team id by letting woken waiters re-read the live allocator counter
//! mis-assigns members when two teams are in hand-off at once. The queues
//! make the hand-off slot explicit: the arbiter enqueues one id per member
//! it will release, and each woken member consumes exactly one entry for its
//! role. Counts per team and per role then balance under any interleaving.

use std::collections::VecDeque;

use serde::Serialize;

use crate::{Quotas, Role, TeamId};

/// Lifecycle phase of a field entity (goalie or field player).
///
/// `ARRIVING → {WAITING_TEAM | FORMING_TEAM | LATE} → WAITING_START → PLAYING`.
/// The last two phases are team-tagged; the team travels as a payload.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityPhase {
    /// Not yet started.
    #[default]
    Idle,
    /// The entity has announced itself and is travelling to the pitch.
    Arriving,
    /// Registered as free, parked until some arbiter calls it into a team.
    WaitingTeam,
    /// This entity's registration tipped both quotas: it is the arbiter.
    FormingTeam,
    /// Arrived after both teams' slots were claimable; takes no further part.
    Late,
    /// Rostered, parked at the kickoff gate.
    WaitingStart(TeamId),
    /// Playing, parked at the match-end gate.
    Playing(TeamId),
}

impl EntityPhase {
    /// The team this phase is tagged with, if any.
    #[must_use]
    pub fn team(self) -> Option<TeamId> {
        match self {
            EntityPhase::WaitingStart(team) | EntityPhase::Playing(team) => Some(team),
            _ => None,
        }
    }
}

/// Lifecycle phase of the referee.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RefereePhase {
    /// Not yet started.
    #[default]
    Idle,
    /// Parked until both teams have reported formation.
    WaitingTeams,
    /// Releasing the kickoff gate and draining readiness acknowledgments.
    StartingMatch,
    /// Match in progress.
    Refereeing,
    /// Releasing the match-end gate.
    EndingMatch,
    /// Simulation over.
    MatchOver,
}

/// The shared segment: phase tables, formation counters, team-id allocator.
///
/// All mutation happens through the methods below, inside the arena's guarded
/// scope. Setters mark the state dirty so the arena publishes a snapshot to
/// the observer when the scope closes; every critical region that changes an
/// observable phase ends with a published snapshot.
#[derive(Debug)]
pub struct SharedState {
    quotas: Quotas,
    goalie_phase: Vec<EntityPhase>,
    player_phase: Vec<EntityPhase>,
    referee_phase: RefereePhase,
    goalies_arrived: u32,
    players_arrived: u32,
    goalies_free: u32,
    players_free: u32,
    next_team_id: u32,
    goalie_calls: VecDeque<TeamId>,
    player_calls: VecDeque<TeamId>,
    dirty: bool,
}

impl SharedState {
    /// Creates the segment for the given populations, everything idle.
    #[must_use]
    pub fn new(quotas: Quotas, num_goalies: usize, num_players: usize) -> Self {
        Self {
            quotas,
            goalie_phase: vec![EntityPhase::Idle; num_goalies],
            player_phase: vec![EntityPhase::Idle; num_players],
            referee_phase: RefereePhase::Idle,
            goalies_arrived: 0,
            players_arrived: 0,
            goalies_free: 0,
            players_free: 0,
            next_team_id: 0,
            goalie_calls: VecDeque::new(),
            player_calls: VecDeque::new(),
            dirty: false,
        }
    }

    /// Per-team quotas this simulation was configured with.
    #[must_use]
    pub fn quotas(&self) -> Quotas {
        self.quotas
    }

    /// Sets one entity's phase and marks the segment for snapshot publication.
    pub fn set_phase(&mut self, role: Role, id: usize, phase: EntityPhase) {
        match role {
            Role::Goalie => self.goalie_phase[id] = phase,
            Role::FieldPlayer => self.player_phase[id] = phase,
        }
        self.dirty = true;
    }

    /// Number of entities of this role in the simulation.
    #[must_use]
    pub fn population(&self, role: Role) -> usize {
        match role {
            Role::Goalie => self.goalie_phase.len(),
            Role::FieldPlayer => self.player_phase.len(),
        }
    }

    /// Current phase of one entity.
    #[must_use]
    pub fn phase(&self, role: Role, id: usize) -> EntityPhase {
        match role {
            Role::Goalie => self.goalie_phase[id],
            Role::FieldPlayer => self.player_phase[id],
        }
    }

    /// Sets the referee's phase and marks the segment for snapshot publication.
    pub fn set_referee_phase(&mut self, phase: RefereePhase) {
        self.referee_phase = phase;
        self.dirty = true;
    }

    /// Registers one arrival: bumps the role's arrived counter and its free
    /// counter in the same breath, before the caller's late check. A late
    /// entity's free increment is deliberately never rolled back; the
    /// conservation accounting in the tests relies on that.
    pub fn register_arrival(&mut self, role: Role) {
        match role {
            Role::Goalie => {
                self.goalies_arrived += 1;
                self.goalies_free += 1;
            }
            Role::FieldPlayer => {
                self.players_arrived += 1;
                self.players_free += 1;
            }
        }
    }

    /// Monotone count of entities of this role that have begun constitution.
    #[must_use]
    pub fn arrived(&self, role: Role) -> u32 {
        match role {
            Role::Goalie => self.goalies_arrived,
            Role::FieldPlayer => self.players_arrived,
        }
    }

    /// Entities of this role registered as free and not yet reserved.
    #[must_use]
    pub fn free(&self, role: Role) -> u32 {
        match role {
            Role::Goalie => self.goalies_free,
            Role::FieldPlayer => self.players_free,
        }
    }

    /// Whether both role quotas are currently met.
    ///
    /// Only meaningful under the mutex: the caller that observes `true` is the
    /// unique arbiter for the team it goes on to reserve, because the free
    /// counters are only ever mutated inside the same critical sections.
    #[must_use]
    pub fn team_complete(&self) -> bool {
        self.goalies_free >= self.quotas.goalies && self.players_free >= self.quotas.players
    }

    /// Reserves one full team's slots and claims the next dense team id.
    ///
    /// Must only be called by the entity that just observed
    /// [`team_complete`](Self::team_complete) in the same critical section.
    /// Decrements both free counters by their full quotas in one atomic block.
    pub fn reserve_team(&mut self) -> TeamId {
        debug_assert!(self.team_complete(), "reserve_team without met quotas");
        self.goalies_free -= self.quotas.goalies;
        self.players_free -= self.quotas.players;
        let team = TeamId::new(self.next_team_id);
        self.next_team_id += 1;
        self.dirty = true;
        team
    }

    /// Publishes `count` hand-off entries for waiting members of `role`.
    ///
    /// Each entry is consumed by exactly one woken waiter via
    /// [`take_call`](Self::take_call); entries are enqueued before the arbiter
    /// posts the first release, so no waiter can wake before its id exists.
    pub fn enqueue_calls(&mut self, role: Role, team: TeamId, count: u32) {
        let queue = match role {
            Role::Goalie => &mut self.goalie_calls,
            Role::FieldPlayer => &mut self.player_calls,
        };
        for _ in 0..count {
            queue.push_back(team);
        }
    }

    /// Consumes one hand-off entry for `role`.
    ///
    /// Returns `None` only if the protocol is broken (a waiter woke without a
    /// matching reservation); callers escalate that to an internal error.
    pub fn take_call(&mut self, role: Role) -> Option<TeamId> {
        match role {
            Role::Goalie => self.goalie_calls.pop_front(),
            Role::FieldPlayer => self.player_calls.pop_front(),
        }
    }

    /// Number of teams whose ids have been claimed so far.
    #[must_use]
    pub fn teams_formed(&self) -> u32 {
        self.next_team_id
    }

    /// Clears and returns the dirty flag; the arena calls this once per
    /// guarded scope to decide whether to publish a snapshot.
    pub(crate) fn take_dirty(&mut self) -> bool {
        std::mem::take(&mut self.dirty)
    }

    /// Full consistency snapshot of the segment for the state logger.
    #[must_use]
    pub fn snapshot(&self) -> StateSnapshot {
        StateSnapshot {
            goalies: self.goalie_phase.clone(),
            players: self.player_phase.clone(),
            referee: self.referee_phase,
            goalies_arrived: self.goalies_arrived,
            players_arrived: self.players_arrived,
            goalies_free: self.goalies_free,
            players_free: self.players_free,
            teams_formed: self.next_team_id,
        }
    }
}

/// An owned, serializable copy of the whole status table, taken under the
/// mutex and handed to the [`StateObserver`](crate::observer::StateObserver)
/// in mutation order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StateSnapshot {
    /// Phase of every goalie, indexed by id.
    pub goalies: Vec<EntityPhase>,
    /// Phase of every field player, indexed by id.
    pub players: Vec<EntityPhase>,
    /// Phase of the referee.
    pub referee: RefereePhase,
    /// Goalies that have begun team constitution.
    pub goalies_arrived: u32,
    /// Field players that have begun team constitution.
    pub players_arrived: u32,
    /// Goalies registered free and not yet reserved.
    pub goalies_free: u32,
    /// Field players registered free and not yet reserved.
    pub players_free: u32,
    /// Team ids claimed so far; ids are dense, so this is also the next id.
    pub teams_formed: u32,
}

impl StateSnapshot {
    /// Serializes the snapshot as a JSON string.
    #[cfg(feature = "json")]
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}

#[cfg(all(test, not(loom)))]
mod tests {
    use super::*;

    fn state() -> SharedState {
        SharedState::new(Quotas::new(1, 5), 2, 10)
    }

    #[test]
    fn arrivals_bump_both_counters() {
        let mut st = state();
        st.register_arrival(Role::Goalie);
        st.register_arrival(Role::FieldPlayer);
        st.register_arrival(Role::FieldPlayer);
        assert_eq!(st.arrived(Role::Goalie), 1);
        assert_eq!(st.free(Role::Goalie), 1);
        assert_eq!(st.arrived(Role::FieldPlayer), 2);
        assert_eq!(st.free(Role::FieldPlayer), 2);
    }

    #[test]
    fn team_complete_requires_both_quotas() {
        let mut st = state();
        for _ in 0..5 {
            st.register_arrival(Role::FieldPlayer);
        }
        assert!(!st.team_complete(), "no goalie yet");
        st.register_arrival(Role::Goalie);
        assert!(st.team_complete());
    }

    #[test]
    fn reserve_team_claims_dense_ids_and_drains_quotas() {
        let mut st = state();
        for _ in 0..2 {
            st.register_arrival(Role::Goalie);
        }
        for _ in 0..10 {
            st.register_arrival(Role::FieldPlayer);
        }
        assert_eq!(st.reserve_team(), TeamId::new(0));
        assert_eq!(st.free(Role::Goalie), 1);
        assert_eq!(st.free(Role::FieldPlayer), 5);
        assert_eq!(st.reserve_team(), TeamId::new(1));
        assert_eq!(st.free(Role::Goalie), 0);
        assert_eq!(st.free(Role::FieldPlayer), 0);
        assert_eq!(st.teams_formed(), 2);
    }

    #[test]
    fn call_queue_hands_each_entry_once_per_role() {
        let mut st = state();
        let team = TeamId::new(0);
        st.enqueue_calls(Role::FieldPlayer, team, 2);
        st.enqueue_calls(Role::Goalie, TeamId::new(1), 1);
        assert_eq!(st.take_call(Role::FieldPlayer), Some(team));
        assert_eq!(st.take_call(Role::Goalie), Some(TeamId::new(1)));
        assert_eq!(st.take_call(Role::FieldPlayer), Some(team));
        assert_eq!(st.take_call(Role::FieldPlayer), None);
        assert_eq!(st.take_call(Role::Goalie), None);
    }

    #[test]
    fn dirty_flag_set_by_phase_mutation_only() {
        let mut st = state();
        assert!(!st.take_dirty());
        st.register_arrival(Role::Goalie);
        // Counter math alone is not observable; phases are what the logger records.
        assert!(!st.take_dirty());
        st.set_phase(Role::Goalie, 0, EntityPhase::Arriving);
        assert!(st.take_dirty());
        assert!(!st.take_dirty());
    }

    #[test]
    fn snapshot_reflects_segment() {
        let mut st = state();
        st.set_phase(Role::Goalie, 1, EntityPhase::Late);
        st.set_referee_phase(RefereePhase::WaitingTeams);
        st.register_arrival(Role::Goalie);
        let snap = st.snapshot();
        assert_eq!(snap.goalies[1], EntityPhase::Late);
        assert_eq!(snap.referee, RefereePhase::WaitingTeams);
        assert_eq!(snap.goalies_arrived, 1);
        assert_eq!(snap.teams_formed, 0);
    }

    #[test]
    fn phase_team_tag() {
        assert_eq!(EntityPhase::Playing(TeamId::new(1)).team(), Some(TeamId::new(1)));
        assert_eq!(EntityPhase::WaitingTeam.team(), None);
    }
}
