//! Simulation harness: builder, thread spawning, and the end-of-run report.
//!
//! The harness is the plumbing around the protocol, not the protocol: it
//! stands in for per-entity processes and bootstrap scripts.
//! One OS thread per entity plus one for the referee, all sharing
//! the arena through an `Arc`, joined to completion. Exit status semantics
//! carry over — a thread's result says whether the participant ran cleanly,
//! never which team it ended up on; team outcomes live in the report.

use std::time::Duration;

use smallvec::SmallVec;

use crate::arena::Arena;
use crate::entity::Entity;
use crate::error::RendezvousError;
use crate::observer::{StateObserver, TracingObserver};
use crate::referee::{Referee, TEAMS_PER_MATCH};
use crate::state::StateSnapshot;
use crate::sync::Arc;
use crate::{Quotas, Role, SimulationConfig, TeamId};

/// The [`SimulationBuilder`] assembles and validates a full rendezvous run.
///
/// After setting all appropriate values, use [`start`](Self::start) to
/// consume the builder and obtain a runnable [`Simulation`].
#[must_use = "SimulationBuilder must be consumed by calling start()"]
#[derive(Debug)]
pub struct SimulationBuilder {
    quotas: Quotas,
    num_goalies: usize,
    num_players: usize,
    max_arrival_delay: Duration,
    match_duration: Duration,
    seed: u64,
    observer: std::sync::Arc<dyn StateObserver>,
}

impl Default for SimulationBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl SimulationBuilder {
    /// Starts from the classic configuration: one goalie and five field
    /// players per team, exactly two teams' worth of each role, light
    /// arrival jitter and a short match.
    pub fn new() -> Self {
        Self {
            quotas: Quotas::new(1, 5),
            num_goalies: 2,
            num_players: 10,
            max_arrival_delay: Duration::from_millis(20),
            match_duration: Duration::from_millis(50),
            seed: 0,
            observer: std::sync::Arc::new(TracingObserver),
        }
    }

    /// Per-team quotas for both roles.
    pub fn with_quotas(mut self, goalies_per_team: u32, players_per_team: u32) -> Self {
        self.quotas = Quotas::new(goalies_per_team, players_per_team);
        self
    }

    /// Number of goalies and field players to spawn. Entities beyond two
    /// teams' worth of a role will end up late.
    pub fn with_population(mut self, num_goalies: usize, num_players: usize) -> Self {
        self.num_goalies = num_goalies;
        self.num_players = num_players;
        self
    }

    /// Upper bound of the uniform random arrival delay. Zero disables the
    /// perturbation entirely, which makes small tests fast and focused.
    pub fn with_max_arrival_delay(mut self, delay: Duration) -> Self {
        self.max_arrival_delay = delay;
        self
    }

    /// Modeled match duration between kickoff and the end signal.
    pub fn with_match_duration(mut self, duration: Duration) -> Self {
        self.match_duration = duration;
        self
    }

    /// Seed for the arrival-jitter generators; each entity derives its own
    /// stream from this, so a seed pins down one interleaving pressure.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    /// State logger receiving every consistency snapshot.
    pub fn with_observer(mut self, observer: std::sync::Arc<dyn StateObserver>) -> Self {
        self.observer = observer;
        self
    }

    /// Validates the configuration and builds the arena.
    ///
    /// A configuration that cannot form two full teams is rejected here:
    /// with no timeouts anywhere in the protocol, an underpopulated run
    /// would simply block forever.
    pub fn start(self) -> Result<Simulation, RendezvousError> {
        if self.quotas.goalies == 0 || self.quotas.players == 0 {
            return Err(RendezvousError::InvalidConfig {
                info: "per-team quotas must be nonzero".to_owned(),
            });
        }
        let needed_goalies = (TEAMS_PER_MATCH * self.quotas.goalies) as usize;
        let needed_players = (TEAMS_PER_MATCH * self.quotas.players) as usize;
        if self.num_goalies < needed_goalies || self.num_players < needed_players {
            return Err(RendezvousError::InvalidConfig {
                info: format!(
                    "population {}g/{}p cannot fill two teams of {}g/{}p",
                    self.num_goalies, self.num_players, self.quotas.goalies, self.quotas.players
                ),
            });
        }

        let config = SimulationConfig {
            quotas: self.quotas,
            num_goalies: self.num_goalies,
            num_players: self.num_players,
            max_arrival_delay: self.max_arrival_delay,
            match_duration: self.match_duration,
        };
        let arena = Arena::new(&config, self.observer);
        Ok(Simulation {
            config,
            arena,
            seed: self.seed,
        })
    }
}

/// A validated, ready-to-run rendezvous simulation.
#[derive(Debug)]
pub struct Simulation {
    config: SimulationConfig,
    arena: Arc<Arena>,
    seed: u64,
}

impl Simulation {
    /// The arena shared by all participants. Exposed for tests that want to
    /// observe channels or inject extra participants.
    #[must_use]
    pub fn arena(&self) -> &Arc<Arena> {
        &self.arena
    }

    /// Spawns every participant, runs the match to completion, and reports.
    ///
    /// If any participant fails, the arena is closed so the remaining ones
    /// unblock with [`ChannelClosed`](RendezvousError::ChannelClosed), and
    /// the first error is returned after all threads have been joined.
    pub fn run(self) -> Result<SimulationReport, RendezvousError> {
        let referee = Referee::new(self.arena.clone(), self.config.match_duration);
        let referee_handle = spawn_thread("referee".to_owned(), move || referee.run())?;

        let mut entity_handles = Vec::new();
        for (role, population) in [
            (Role::Goalie, self.config.num_goalies),
            (Role::FieldPlayer, self.config.num_players),
        ] {
            for id in 0..population {
                let mut entity = Entity::new(
                    id,
                    role,
                    self.arena.clone(),
                    self.config.max_arrival_delay,
                    entity_seed(self.seed, role, id),
                )?;
                let handle = spawn_thread(format!("{}-{id}", role.label()), move || entity.run())?;
                entity_handles.push((role, id, handle));
            }
        }

        let mut goalie_teams = vec![None; self.config.num_goalies];
        let mut player_teams = vec![None; self.config.num_players];
        let mut first_error: Option<RendezvousError> = None;

        for (role, id, handle) in entity_handles {
            match join_thread(handle) {
                Ok(team) => match role {
                    Role::Goalie => goalie_teams[id] = team,
                    Role::FieldPlayer => player_teams[id] = team,
                },
                Err(err) => {
                    tracing::warn!(?role, id, %err, "participant failed");
                    if first_error.is_none() {
                        first_error = Some(err);
                        // Unblock everyone still parked so the join loop ends.
                        self.arena.close();
                    }
                }
            }
        }

        if let Err(err) = join_thread(referee_handle) {
            tracing::warn!(%err, "referee failed");
            first_error.get_or_insert(err);
        }

        if let Some(err) = first_error {
            return Err(err);
        }

        let final_snapshot = self.arena.with_state(|st| st.snapshot());
        Ok(SimulationReport {
            goalie_teams,
            player_teams,
            teams_formed: final_snapshot.teams_formed,
            final_snapshot,
        })
    }
}

/// Mixes an entity's identity into the run seed so each entity jitters on its
/// own deterministic stream.
fn entity_seed(seed: u64, role: Role, id: usize) -> u64 {
    let role_bit = match role {
        Role::Goalie => 0u64,
        Role::FieldPlayer => 1u64 << 32,
    };
    seed ^ role_bit ^ (id as u64).wrapping_mul(0x9E37_79B9_7F4A_7C15)
}

fn spawn_thread<R: Send + 'static>(
    name: String,
    f: impl FnOnce() -> R + Send + 'static,
) -> Result<std::thread::JoinHandle<R>, RendezvousError> {
    std::thread::Builder::new()
        .name(name)
        .spawn(f)
        .map_err(|err| RendezvousError::Internal {
            context: format!("failed to spawn participant thread: {err}"),
        })
}

fn join_thread<R>(handle: std::thread::JoinHandle<Result<R, RendezvousError>>) -> Result<R, RendezvousError> {
    handle.join().map_err(|_| RendezvousError::Internal {
        context: "participant thread panicked".to_owned(),
    })?
}

/// Outcome of one completed simulation run.
#[derive(Debug, Clone)]
pub struct SimulationReport {
    /// Team each goalie played for, by id; `None` means it arrived late.
    pub goalie_teams: Vec<Option<TeamId>>,
    /// Team each field player played for, by id; `None` means it arrived late.
    pub player_teams: Vec<Option<TeamId>>,
    /// Number of teams formed; team ids are exactly `0..teams_formed`.
    pub teams_formed: u32,
    /// The shared segment as it stood after the match ended.
    pub final_snapshot: StateSnapshot,
}

impl SimulationReport {
    /// Ids of the entities rostered on `team`, as `(role, id)` pairs.
    #[must_use]
    pub fn roster(&self, team: TeamId) -> SmallVec<[(Role, usize); 8]> {
        let goalies = self
            .goalie_teams
            .iter()
            .enumerate()
            .filter(|(_, t)| **t == Some(team))
            .map(|(id, _)| (Role::Goalie, id));
        let players = self
            .player_teams
            .iter()
            .enumerate()
            .filter(|(_, t)| **t == Some(team))
            .map(|(id, _)| (Role::FieldPlayer, id));
        goalies.chain(players).collect()
    }

    /// Number of entities that arrived late and sat the match out.
    #[must_use]
    pub fn late_count(&self) -> usize {
        self.goalie_teams
            .iter()
            .chain(&self.player_teams)
            .filter(|team| team.is_none())
            .count()
    }
}

#[cfg(all(test, not(loom)))]
mod tests {
    use super::*;

    #[test]
    fn builder_rejects_zero_quota() {
        let err = SimulationBuilder::new().with_quotas(0, 5).start().unwrap_err();
        assert!(matches!(err, RendezvousError::InvalidConfig { .. }));
    }

    #[test]
    fn builder_rejects_underpopulated_run() {
        let err = SimulationBuilder::new()
            .with_quotas(1, 5)
            .with_population(1, 10)
            .start()
            .unwrap_err();
        assert!(matches!(err, RendezvousError::InvalidConfig { .. }));
    }

    #[test]
    fn builder_accepts_exact_two_team_population() {
        assert!(SimulationBuilder::new()
            .with_quotas(2, 3)
            .with_population(4, 6)
            .start()
            .is_ok());
    }

    #[test]
    fn entity_seeds_are_distinct_per_identity() {
        let a = entity_seed(1, Role::Goalie, 0);
        let b = entity_seed(1, Role::Goalie, 1);
        let c = entity_seed(1, Role::FieldPlayer, 0);
        assert_ne!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn report_roster_and_late_count() {
        let report = SimulationReport {
            goalie_teams: vec![Some(TeamId::new(0)), Some(TeamId::new(1)), None],
            player_teams: vec![Some(TeamId::new(0)), Some(TeamId::new(1))],
            teams_formed: 2,
            final_snapshot: StateSnapshot {
                goalies: vec![],
                players: vec![],
                referee: crate::state::RefereePhase::MatchOver,
                goalies_arrived: 3,
                players_arrived: 2,
                goalies_free: 1,
                players_free: 0,
                teams_formed: 2,
            },
        };
        let roster = report.roster(TeamId::new(0));
        assert_eq!(roster.as_slice(), &[(Role::Goalie, 0), (Role::FieldPlayer, 0)]);
        assert_eq!(report.late_count(), 1);
    }
}
