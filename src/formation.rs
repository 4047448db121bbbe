//! Team formation: the dynamically-acquired arbiter and the serialized hand-off.
//!
//! Every entity runs [`constitute_team`] exactly once. The decision — late,
//! wait, or form — is taken in a single critical section, which is the whole
//! tie-break: the free counters are only ever mutated under the arena mutex,
//! so at most one entity can observe both quotas met before the reservation
//! empties them again. There is no leader election; the arbiter is whichever
//! entity's registration tipped the threshold.
//!
//! The hand-off is deliberately one-at-a-time. The arbiter posts a single
//! team call, then blocks until that member acknowledges registration before
//! posting the next, so the released count and the reserved quota can never
//! diverge, spurious wakeups included. The acknowledgment channel is shared
//! by all formations; only counts matter, so an arbiter consuming an
//! acknowledgment triggered by the other team's member is harmless.

use crate::arena::Arena;
use crate::error::RendezvousError;
use crate::state::EntityPhase;
use crate::{Role, TeamId};

/// What the quota check decided for one entity, computed under the mutex and
/// acted on outside it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Decision {
    /// Both teams' slots already claimable before this entity registered.
    Late,
    /// Quotas not met yet; park on the role's team-call channel.
    Wait,
    /// This entity tipped both quotas: reserve, release, notify the referee.
    Form {
        team: TeamId,
        goalies_to_call: u32,
        players_to_call: u32,
    },
}

/// The team-constitution phase of the entity state machine.
///
/// Returns the assigned team, or `None` for a late entity. Late entities are
/// guaranteed to return without ever touching a channel.
pub(crate) fn constitute_team(
    arena: &Arena,
    role: Role,
    id: usize,
) -> Result<Option<TeamId>, RendezvousError> {
    let decision = arena.with_state(|st| {
        st.register_arrival(role);
        let quotas = st.quotas();

        // The late rule is deliberately literal: an entity is late once its
        // own role's arrival count exceeds two teams' worth, regardless of
        // how far either formation has actually progressed.
        if st.arrived(role) > 2 * quotas.for_role(role) {
            st.set_phase(role, id, EntityPhase::Late);
            return Decision::Late;
        }

        if st.team_complete() {
            st.set_phase(role, id, EntityPhase::FormingTeam);
            let team = st.reserve_team();
            // The arbiter fills one slot of its own role itself.
            let goalies_to_call = quotas.goalies - u32::from(role == Role::Goalie);
            let players_to_call = quotas.players - u32::from(role == Role::FieldPlayer);
            st.enqueue_calls(Role::Goalie, team, goalies_to_call);
            st.enqueue_calls(Role::FieldPlayer, team, players_to_call);
            Decision::Form {
                team,
                goalies_to_call,
                players_to_call,
            }
        } else {
            st.set_phase(role, id, EntityPhase::WaitingTeam);
            Decision::Wait
        }
    });

    match decision {
        Decision::Late => {
            tracing::debug!(?role, id, "late, leaving");
            Ok(None)
        }
        Decision::Wait => {
            let channels = arena.channels();
            channels.wait_team(role).wait()?;
            let team = arena
                .with_state(|st| st.take_call(role))
                .ok_or(RendezvousError::Internal {
                    context: format!("{role:?} {id} woke with no pending team call"),
                })?;
            channels.member_registered.post()?;
            tracing::debug!(?role, id, team = team.as_u32(), "joined team");
            Ok(Some(team))
        }
        Decision::Form {
            team,
            goalies_to_call,
            players_to_call,
        } => {
            tracing::debug!(
                ?role,
                id,
                team = team.as_u32(),
                players_to_call,
                goalies_to_call,
                "forming team"
            );
            let channels = arena.channels();
            for _ in 0..players_to_call {
                channels.players_wait_team.post()?;
                channels.member_registered.wait()?;
            }
            for _ in 0..goalies_to_call {
                channels.goalies_wait_team.post()?;
                channels.member_registered.wait()?;
            }
            channels.referee_wait_teams.post()?;
            Ok(Some(team))
        }
    }
}

#[cfg(all(test, not(loom)))]
mod tests {
    use super::*;
    use crate::observer::NullObserver;
    use crate::sync::Arc;
    use crate::{Quotas, SimulationConfig};
    use std::thread;
    use std::time::Duration;

    fn arena(quotas: Quotas, goalies: usize, players: usize) -> Arc<Arena> {
        let config = SimulationConfig::new(quotas, goalies, players);
        Arena::new(&config, Arc::new(NullObserver))
    }

    /// Parks `n` waiters of `role` in background threads and gives them time
    /// to register before the arbiter runs.
    fn park_waiters(
        arena: &Arc<Arena>,
        role: Role,
        ids: std::ops::Range<usize>,
    ) -> Vec<thread::JoinHandle<Result<Option<TeamId>, RendezvousError>>> {
        let handles: Vec<_> = ids
            .map(|id| {
                let arena = arena.clone();
                thread::spawn(move || constitute_team(&arena, role, id))
            })
            .collect();
        thread::sleep(Duration::from_millis(30));
        handles
    }

    #[test]
    fn tipping_entity_forms_and_releases_waiters() {
        let arena = arena(Quotas::new(1, 2), 1, 2);
        let players = park_waiters(&arena, Role::FieldPlayer, 0..2);

        // The goalie's registration tips both quotas.
        let team = constitute_team(&arena, Role::Goalie, 0).unwrap();
        assert_eq!(team, Some(TeamId::new(0)));

        for handle in players {
            assert_eq!(handle.join().unwrap().unwrap(), Some(TeamId::new(0)));
        }

        // One formation reported to the referee.
        assert_eq!(arena.channels().referee_wait_teams.available(), 1);
        arena.with_state(|st| {
            assert_eq!(st.free(Role::Goalie), 0);
            assert_eq!(st.free(Role::FieldPlayer), 0);
            assert_eq!(st.teams_formed(), 1);
        });
    }

    #[test]
    fn player_arbiter_calls_goalie_in() {
        let arena = arena(Quotas::new(1, 2), 1, 2);
        let goalie = park_waiters(&arena, Role::Goalie, 0..1);
        let first_player = park_waiters(&arena, Role::FieldPlayer, 0..1);

        // The second player tips the quota and arbitrates.
        let team = constitute_team(&arena, Role::FieldPlayer, 1).unwrap();
        assert_eq!(team, Some(TeamId::new(0)));

        for handle in goalie.into_iter().chain(first_player) {
            assert_eq!(handle.join().unwrap().unwrap(), Some(TeamId::new(0)));
        }
    }

    #[test]
    fn third_goalie_is_late_and_touches_no_channel() {
        let arena = arena(Quotas::new(1, 1), 3, 2);

        for round in 0..2usize {
            let player = park_waiters(&arena, Role::FieldPlayer, round..round + 1);
            let team = constitute_team(&arena, Role::Goalie, round).unwrap();
            assert_eq!(team, Some(TeamId::new(round as u32)));
            for handle in player {
                handle.join().unwrap().unwrap();
            }
        }

        // Both teams claimed; the third goalie must bail out synchronously.
        let late = constitute_team(&arena, Role::Goalie, 2).unwrap();
        assert_eq!(late, None);
        arena.with_state(|st| {
            assert_eq!(st.phase(Role::Goalie, 2), EntityPhase::Late);
            // Its free increment is never rolled back.
            assert_eq!(st.free(Role::Goalie), 1);
        });
        // No stray permits beyond the two referee notifications.
        assert_eq!(arena.channels().referee_wait_teams.available(), 2);
        assert_eq!(arena.channels().goalies_wait_team.available(), 0);
        assert_eq!(arena.channels().member_registered.available(), 0);
    }

    #[test]
    fn team_ids_are_dense_across_two_formations() {
        let arena = arena(Quotas::new(1, 2), 2, 4);

        let first_waiters = park_waiters(&arena, Role::FieldPlayer, 0..2);
        let first = constitute_team(&arena, Role::Goalie, 0).unwrap();
        for handle in first_waiters {
            handle.join().unwrap().unwrap();
        }

        let second_waiters = park_waiters(&arena, Role::FieldPlayer, 2..4);
        let second = constitute_team(&arena, Role::Goalie, 1).unwrap();
        for handle in second_waiters {
            handle.join().unwrap().unwrap();
        }

        assert_eq!(first, Some(TeamId::new(0)));
        assert_eq!(second, Some(TeamId::new(1)));
    }
}
