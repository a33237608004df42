// Nomination turn order: linear and snake rotation over the draft order.

use serde::{Deserialize, Serialize};

use super::state::{DraftState, TeamState};

/// Which rotation policy the league uses for nomination turns.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DraftOrderMode {
    /// Every round proceeds 1→N.
    Linear,
    /// Odd rounds proceed 1→N, even rounds N→1.
    Snake,
}

/// Map a (round, cursor) position to an index into the draft-order-sorted
/// team list. `cursor` is the 0-based step within the round.
fn seat_index(round: u32, cursor: usize, num_teams: usize, mode: DraftOrderMode) -> usize {
    match mode {
        DraftOrderMode::Linear => cursor,
        DraftOrderMode::Snake => {
            if round % 2 == 1 {
                cursor
            } else {
                num_teams - 1 - cursor
            }
        }
    }
}

/// Whether a team may be handed the nomination turn.
fn eligible(team: &TeamState, skip_offline: bool) -> bool {
    team.remaining_slots() > 0 && (team.online || !skip_offline)
}

/// Select the first nominator at draft start. Resets the rotation cursor to
/// the top of round 1 and skips ineligible teams.
pub fn first_nominator(
    state: &mut DraftState,
    mode: DraftOrderMode,
    skip_offline: bool,
) -> Option<String> {
    state.round = 1;
    state.cursor = 0;

    let num_teams = state.teams.len();
    if num_teams == 0 || !state.teams.iter().any(|t| eligible(t, skip_offline)) {
        state.current_nominator = None;
        return None;
    }

    let idx = seat_index(state.round, state.cursor, num_teams, mode);
    if eligible(&state.teams[idx], skip_offline) {
        state.current_nominator = Some(state.teams[idx].team_id.clone());
        return state.current_nominator.clone();
    }
    advance_turn(state, mode, skip_offline)
}

/// Advance the nomination turn to the next eligible team.
///
/// Called only after a nomination fully resolves (sale or admin
/// force-resolve), never mid-bidding. Teams with no remaining roster slots
/// are skipped; with `skip_offline` set, offline teams are skipped too.
///
/// Returns `None` and clears `current_nominator` when no eligible nominator
/// exists. The caller decides whether that means the draft is complete (all
/// rosters full) or stalled awaiting admin action (only skipped teams have
/// open slots).
pub fn advance_turn(
    state: &mut DraftState,
    mode: DraftOrderMode,
    skip_offline: bool,
) -> Option<String> {
    let num_teams = state.teams.len();
    if num_teams == 0 || !state.teams.iter().any(|t| eligible(t, skip_offline)) {
        state.current_nominator = None;
        return None;
    }

    // At least one team is eligible, so this loop terminates.
    loop {
        state.cursor += 1;
        if state.cursor >= num_teams {
            state.cursor = 0;
            state.round += 1;
        }
        let idx = seat_index(state.round, state.cursor, num_teams, mode);
        if eligible(&state.teams[idx], skip_offline) {
            state.current_nominator = Some(state.teams[idx].team_id.clone());
            return state.current_nominator.clone();
        }
    }
}
