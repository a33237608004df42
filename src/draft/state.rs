// Authoritative draft session state: phase, teams, nomination, pick history.

use std::collections::{BTreeSet, HashMap};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::warn;

use super::position::Position;
use super::roster::Roster;

/// Draft lifecycle phase. Forms a closed state machine: no action is
/// accepted outside its declared source phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    Pre,
    Nominating,
    Bidding,
    Paused,
    Complete,
}

/// The state of a single team during the draft.
///
/// `budget_spent` / `budget_remaining` are a projection of the pick history;
/// they are mutated only by [`DraftState::record_pick`] and
/// [`DraftState::unrecord_player`] so they cannot drift from the picks list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TeamState {
    pub team_id: String,
    pub name: String,
    /// Nomination order assignment, 1..N, unique per league.
    pub draft_order: u32,
    pub roster: Roster,
    pub budget_spent: u32,
    pub budget_remaining: u32,
    /// Whether a human owner can connect for this team. Offline teams
    /// participate identically but act only via admin.
    pub online: bool,
}

impl TeamState {
    /// Remaining roster slots to fill.
    pub fn remaining_slots(&self) -> usize {
        self.roster.empty_slots()
    }

    /// The highest amount this team may legally bid right now.
    pub fn max_bid(&self) -> u32 {
        self.roster.max_bid(self.budget_remaining)
    }
}

/// One accepted bid. Append-only audit trail; removed only by admin undo.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BidRecord {
    pub team_id: String,
    pub amount: u32,
    pub at: DateTime<Utc>,
}

/// The currently active nomination. At most one exists per league.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Nomination {
    pub player_id: String,
    pub player_name: String,
    pub position: Position,
    pub nominated_by: String,
    pub current_bid: u32,
    pub current_bidder: String,
    pub started_at: DateTime<Utc>,
    /// Full bid history including the nominator's seed bid at index 0.
    pub bids: Vec<BidRecord>,
}

/// A completed assignment of a player to a team.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DraftPick {
    /// Sequential pick number (1-indexed).
    pub pick_number: u32,
    pub team_id: String,
    pub player_id: String,
    pub player_name: String,
    pub position: Position,
    pub price: u32,
    /// Pre-declared keeper assignment, applied before nominations begin.
    #[serde(default)]
    pub keeper: bool,
}

/// The complete authoritative state of one league's draft.
///
/// Mutated only through the sequencer, the resolution engine, or the admin
/// controller; the session coordinator never touches fields directly.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DraftState {
    pub league_id: String,
    pub phase: Phase,
    /// The phase to restore on admin resume. Set only while `Paused`.
    pub resume_phase: Option<Phase>,
    /// Teams sorted by `draft_order`.
    pub teams: Vec<TeamState>,
    /// All completed picks in order.
    pub picks: Vec<DraftPick>,
    pub nomination: Option<Nomination>,
    /// Countdown deadline, when a countdown is running.
    pub clock_ends_at: Option<DateTime<Utc>>,
    /// Monotonically increasing counter identifying the current countdown.
    /// Bumped whenever a countdown starts or is cancelled (new bid, pause,
    /// undo, reset); expiry commands carrying a stale generation are
    /// discarded, so a superseded timer can never fire a sale.
    pub countdown_generation: u64,
    /// Team currently on the clock to nominate, when `phase == Nominating`.
    pub current_nominator: Option<String>,
    /// 1-based nomination round, drives snake direction.
    pub round: u32,
    /// 0-based position within the current round's nomination sequence.
    pub cursor: usize,
    /// Team/user IDs currently attached to the room.
    pub connected: BTreeSet<String>,
}

impl DraftState {
    /// Create a fresh pre-draft state.
    ///
    /// `teams` is a list of (team_id, name, draft_order, online); teams are
    /// sorted by draft order so the sequencer can index them directly.
    pub fn new(
        league_id: &str,
        teams: Vec<(String, String, u32, bool)>,
        budget: u32,
        roster_config: &HashMap<String, usize>,
    ) -> Self {
        let mut team_states: Vec<TeamState> = teams
            .into_iter()
            .map(|(id, name, draft_order, online)| TeamState {
                team_id: id,
                name,
                draft_order,
                roster: Roster::new(roster_config),
                budget_spent: 0,
                budget_remaining: budget,
                online,
            })
            .collect();

        team_states.sort_by_key(|t| t.draft_order);

        DraftState {
            league_id: league_id.to_string(),
            phase: Phase::Pre,
            resume_phase: None,
            teams: team_states,
            picks: Vec::new(),
            nomination: None,
            clock_ends_at: None,
            countdown_generation: 0,
            current_nominator: None,
            round: 1,
            cursor: 0,
            connected: BTreeSet::new(),
        }
    }

    /// Look up a team by ID.
    pub fn team(&self, team_id: &str) -> Option<&TeamState> {
        self.teams.iter().find(|t| t.team_id == team_id)
    }

    /// Mutable team lookup.
    pub fn team_mut(&mut self, team_id: &str) -> Option<&mut TeamState> {
        self.teams.iter_mut().find(|t| t.team_id == team_id)
    }

    /// Whether a player has already been drafted in this league.
    pub fn is_drafted(&self, player_id: &str) -> bool {
        self.picks.iter().any(|p| p.player_id == player_id)
    }

    /// Whether every team's roster is full.
    pub fn all_rosters_full(&self) -> bool {
        self.teams.iter().all(|t| t.remaining_slots() == 0)
    }

    /// Record a completed pick: deduct the winning team's budget, place the
    /// player on its roster, and append to the pick history.
    ///
    /// Callers must have validated budget and roster capacity; a placement
    /// failure here indicates a logic defect and is logged, not swallowed.
    pub fn record_pick(&mut self, mut pick: DraftPick) {
        pick.pick_number = self.picks.len() as u32 + 1;

        let Some(team) = self.teams.iter_mut().find(|t| t.team_id == pick.team_id) else {
            warn!(team_id = %pick.team_id, "record_pick for unknown team, dropping");
            return;
        };

        team.budget_spent += pick.price;
        team.budget_remaining = team.budget_remaining.saturating_sub(pick.price);
        if !team
            .roster
            .add_player(&pick.player_id, &pick.player_name, pick.position, pick.price)
        {
            warn!(
                team_id = %pick.team_id,
                player_id = %pick.player_id,
                "no open roster slot for validated pick"
            );
        }

        self.picks.push(pick);
    }

    /// Remove a drafted player, refunding the team's budget and freeing the
    /// roster slot. Returns the removed pick. Used by admin reset when
    /// discarding non-keeper picks.
    pub fn unrecord_player(&mut self, player_id: &str) -> Option<DraftPick> {
        let idx = self.picks.iter().position(|p| p.player_id == player_id)?;
        let pick = self.picks.remove(idx);

        if let Some(team) = self.teams.iter_mut().find(|t| t.team_id == pick.team_id) {
            team.budget_spent = team.budget_spent.saturating_sub(pick.price);
            team.budget_remaining += pick.price;
            team.roster.remove_player(player_id);
        }

        // Renumber the remaining history so pick numbers stay dense.
        for (i, p) in self.picks.iter_mut().enumerate() {
            p.pick_number = i as u32 + 1;
        }

        Some(pick)
    }

    /// Rebuild team budgets and rosters by replaying a pick history.
    ///
    /// Used for cold-start hydration: budgets and rosters are always a
    /// deterministic function of the picks, so replaying them reconstructs
    /// the full per-team view.
    pub fn restore_from_picks(&mut self, picks: Vec<DraftPick>, budget: u32, roster_config: &HashMap<String, usize>) {
        for team in &mut self.teams {
            team.budget_spent = 0;
            team.budget_remaining = budget;
            team.roster = Roster::new(roster_config);
        }
        self.picks.clear();
        self.nomination = None;
        self.clock_ends_at = None;

        for pick in picks {
            self.record_pick(pick);
        }
    }

    /// Total spent across all teams.
    pub fn total_spent(&self) -> u32 {
        self.teams.iter().map(|t| t.budget_spent).sum()
    }
}
